use serde_derive::{Deserialize, Serialize};

/// The result type used throughout the index.
pub type CResult<T> = std::result::Result<T, Error>;

/// Index errors. Every error is local and synchronous and is recovered by the
/// caller; a failed operation never leaves an index partially mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    /// The queried revision is not visible: it was never written, it falls in
    /// the gap between a tombstone and the next creation of the key, or the
    /// key was deleted at that point.
    #[error("mvcc: revision not found")]
    RevisionNotFound,

    /// An unrecoverable internal problem, e.g. a poisoned lock or a restore
    /// of a key that already holds in-memory history.
    #[error("internal error: {0}")]
    Internal(String),
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Error::Internal(format!("lock poisoned: {err}"))
    }
}
