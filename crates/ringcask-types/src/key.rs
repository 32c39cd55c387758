//! Composite blob keys: an [`Identifier`] plus a one-byte kind discriminator.

use crate::id::Identifier;

/// Discriminates the two log kinds a blob can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BlobKind {
    Data = 0,
    History = 1,
}

impl BlobKind {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Data),
            1 => Some(Self::History),
            _ => None,
        }
    }
}

/// `Identifier ⧺ kind`. Unique key into the [`Index`](crate) hash table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey {
    pub id: Identifier,
    pub kind: BlobKind,
}

impl CompositeKey {
    pub fn new(id: Identifier, kind: BlobKind) -> Self {
        Self { id, kind }
    }

    pub fn data(id: Identifier) -> Self {
        Self::new(id, BlobKind::Data)
    }

    pub fn history(id: Identifier) -> Self {
        Self::new(id, BlobKind::History)
    }
}
