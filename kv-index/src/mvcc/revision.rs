use serde_derive::{Deserialize, Serialize};

/// A revision identifies one write in the append-only log of the store.
///
/// `main` is the revision of the transaction that performed the write and
/// grows monotonically across the whole store. `sub` orders the writes within
/// a single transaction, starting from zero. Revisions compare
/// lexicographically on `(main, sub)`; the zero revision marks a key that has
/// never been written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision {
    /// The main revision of the transaction holding this write.
    pub main: i64,
    /// The ordinal of this write within its transaction.
    pub sub: i64,
}

impl Revision {
    /// The zero revision, smaller than every real revision.
    pub const ZERO: Revision = Revision { main: 0, sub: 0 };

    pub fn new(main: i64, sub: i64) -> Self {
        Revision { main, sub }
    }

    /// Whether this is the zero sentinel, i.e. no write has happened.
    pub fn is_zero(&self) -> bool {
        *self == Revision::ZERO
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.main, self.sub)
    }
}
