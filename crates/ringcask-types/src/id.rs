//! Fixed-width opaque key identifiers.

use std::fmt;

/// Width of an [`Identifier`] in bytes.
///
/// The source spec treats this as a deployment parameter (64 is typical);
/// ringcask fixes it at compile time rather than threading it through every
/// call as a runtime argument.
pub const ID_LEN: usize = 64;

/// A fixed-width opaque key, compared bytewise.
///
/// Ordering is lexicographic, which is what ring placement relies on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(pub [u8; ID_LEN]);

impl Identifier {
    pub const ZERO: Identifier = Identifier([0u8; ID_LEN]);

    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Builds an identifier from a slice, padding with zeros or truncating
    /// as needed. Intended for tests and CLI input, not the on-disk path.
    pub fn from_slice_lossy(slice: &[u8]) -> Self {
        let mut buf = [0u8; ID_LEN];
        let n = slice.len().min(ID_LEN);
        buf[..n].copy_from_slice(&slice[..n]);
        Self(buf)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier(")?;
        for b in &self.0[..8.min(self.0.len())] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "…)")
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; ID_LEN]> for Identifier {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        let a = Identifier::from_slice_lossy(&[0x01]);
        let b = Identifier::from_slice_lossy(&[0x02]);
        assert!(a < b);
    }

    #[test]
    fn lossy_pads_with_zero() {
        let id = Identifier::from_slice_lossy(&[0xff]);
        assert_eq!(id.0[0], 0xff);
        assert_eq!(id.0[1], 0x00);
    }
}
