//! The multi-version index over the keys of the storage engine.
//!
//! Every write to the store happens at a [`revision::Revision`], a logical
//! timestamp handed out by the surrounding transaction layer. The index keeps
//! one [`key_index::KeyIndex`] per user key, recording the revisions at which
//! the key was written or deleted, and the [`tree_index::TreeIndex`] arranges
//! those records in an ordered key space for point and range queries.
//!
//! None of the types here perform I/O or synchronize internally beyond the
//! single lock in `TreeIndex`; the caller serializes access per key.

pub mod key_index;
pub mod revision;
pub mod tree_index;

use std::collections::HashSet;

use crate::mvcc::revision::Revision;

/// The set of revisions that must stay live in the backing store after a
/// compaction. The set is owned by the caller; key indexes only insert into
/// it, so one set can be shared across a whole compaction pass.
pub type KeepSet = HashSet<Revision>;
