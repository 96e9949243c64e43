//! `kv-index` is the multi-version key index of a distributed kv storage.
//! For every user key it records the full history of revisions at which the
//! key was written or deleted, and answers point-in-time reads, range-since
//! queries and compaction queries against that history. It is the piece that
//! turns an append-only revision log into a queryable multi-version store.
//!
//! The index is purely in-memory and synchronous: values live in a backing
//! store addressed by revision, and the index only tells callers which
//! revision to fetch. Compaction reports the set of revisions that must stay
//! live in the backing store.
//!
//! ## Getting started
//!
//! ```rust
//! use kv_index::error::CResult;
//! use kv_index::mvcc::revision::Revision;
//! use kv_index::mvcc::tree_index::TreeIndex;
//!
//! fn main() {
//!     run().unwrap();
//! }
//!
//! fn run() -> CResult<()> {
//!     let index = TreeIndex::new();
//!
//!     // Two writes and a delete of key "b".
//!     index.put(b"b", Revision::new(2, 0))?;
//!     index.put(b"b", Revision::new(3, 0))?;
//!     index.tombstone(b"b", Revision::new(5, 0))?;
//!
//!     // Key "a" stays live.
//!     index.put(b"a", Revision::new(4, 0))?;
//!
//!     // Point-in-time reads walk the history.
//!     let got = index.get(b"b", 3)?;
//!     assert_eq!(got.modified, Revision::new(3, 0));
//!     assert_eq!(got.ver, 2);
//!     assert!(index.get(b"b", 5).is_err());
//!
//!     // Compacting above the tombstone drops b entirely; only a's latest
//!     // write must be retained in the backing store.
//!     let keep = index.compact(6)?;
//!     assert!(keep.contains(&Revision::new(4, 0)));
//!     assert_eq!(index.len()?, 1);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod mvcc;
