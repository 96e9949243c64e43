use bytes::Bytes;
use log::{error, warn};
use serde_derive::{Deserialize, Serialize};

use crate::error::{CResult, Error};
use crate::mvcc::revision::Revision;
use crate::mvcc::KeepSet;

/// A generation is one contiguous life of a key: every revision from its
/// (re)creation up to and including the tombstone that deletes it. The
/// generation of a key that has never been deleted is still open and holds no
/// tombstone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Generation {
    /// The number of writes the generation has seen, the closing tombstone
    /// included. `restore` installs the persisted count verbatim.
    pub(crate) ver: i64,
    /// The revision at which the generation began: the first put after the
    /// previous tombstone, or the first put to the key ever.
    pub(crate) created: Revision,
    /// The revisions of the generation, strictly increasing. In a closed
    /// generation the last element is the tombstone.
    pub(crate) revs: Vec<Revision>,
}

impl Generation {
    /// True when the generation holds no revisions. The placeholder appended
    /// after a tombstone is always empty.
    pub fn is_empty(&self) -> bool {
        self.revs.is_empty()
    }

    /// Walks the revisions from the newest to the oldest and returns the
    /// largest index at which `pred` is false, or None when it holds for
    /// every element. The scan stops at the first hit, so with a predicate
    /// like `rev.main > at` this finds the newest revision at or below a
    /// bound in one pass.
    pub(crate) fn walk(&self, pred: impl Fn(&Revision) -> bool) -> Option<usize> {
        self.revs.iter().rposition(|rev| !pred(rev))
    }
}

/// The metadata a point-in-time lookup returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexGet {
    /// The revision that last set the key, as of the queried revision.
    pub modified: Revision,
    /// The creation revision of the generation the key lived in.
    pub created: Revision,
    /// The version of the key at the queried revision. The first put of a
    /// generation is version 1.
    pub ver: i64,
}

/// The revision history of a single user key.
///
/// The history is a list of generations, oldest first. Each generation ends
/// with a tombstone, except the last one, which is either still open (the key
/// is live) or an empty placeholder recording that the key is currently
/// deleted. A put appends to the open generation, creating one if needed; a
/// tombstone closes it and appends the placeholder.
///
/// For example, a key written at revisions 1.0 and 2.0, deleted at 4.0 and
/// written once more at 6.0 holds:
///
/// ```text
/// generation 1: 6.0
/// generation 0: 1.0, 2.0, 4.0(t)
/// ```
///
/// Compaction at a revision removes every older revision that can no longer
/// be read and reports the revisions that stay reachable, so the caller can
/// pin them in the backing store. Compacting the example at 5 removes
/// generation 0 entirely:
///
/// ```text
/// generation 1: 6.0
/// ```
///
/// A key index whose whole history has been compacted away reports
/// `is_empty()`, and the owning key space drops it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyIndex {
    /// The user key. Never mutated after construction.
    pub(crate) key: Bytes,
    /// The revision of the most recent write or tombstone; zero if none.
    pub(crate) modified: Revision,
    /// The lifecycle history, oldest first.
    pub(crate) generations: Vec<Generation>,
}

impl KeyIndex {
    pub fn new(key: impl Into<Bytes>) -> Self {
        KeyIndex { key: key.into(), ..KeyIndex::default() }
    }

    /// The user key this index describes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The revision of the most recent write or tombstone, zero if the key
    /// has never been written.
    pub fn modified(&self) -> Revision {
        self.modified
    }

    /// The less-than relation of the ordered key space: lexicographic
    /// comparison of the raw key bytes.
    pub fn less(&self, other: &KeyIndex) -> bool {
        self.key < other.key
    }

    /// Records a write of the key at `rev`, opening a new generation when the
    /// previous one was closed by a tombstone.
    ///
    /// # Panics
    ///
    /// Revisions must arrive in strictly increasing order; handing the index
    /// a stale revision means the surrounding store is corrupt, and the call
    /// panics.
    pub fn put(&mut self, rev: Revision) {
        if rev <= self.modified {
            error!(
                "'put' with an unexpected smaller revision (given: {}, modified: {})",
                rev, self.modified
            );
            panic!("'put' with an unexpected smaller revision: {} <= {}", rev, self.modified);
        }
        if self.generations.is_empty() {
            self.generations.push(Generation::default());
        }
        let g = self.generations.last_mut().expect("generations is non-empty");
        if g.revs.is_empty() {
            // the first write after a tombstone (re)creates the key
            g.created = rev;
        }
        g.revs.push(rev);
        g.ver += 1;
        self.modified = rev;
    }

    /// Deletes the key at `rev`: the tombstone closes the current generation,
    /// and an empty placeholder generation is appended after it. Tombstoning
    /// a key that is already deleted, or was never written, fails with
    /// `RevisionNotFound`.
    pub fn tombstone(&mut self, rev: Revision) -> CResult<()> {
        if self.generations.last().map_or(true, |g| g.is_empty()) {
            warn!("'tombstone' on a key with no live generation (key: {:?}, rev: {})", self.key, rev);
            return Err(Error::RevisionNotFound);
        }
        self.put(rev);
        self.generations.push(Generation::default());
        Ok(())
    }

    /// Point-in-time read of the key's metadata: the revision that last set
    /// it at or before `at_rev` (compared by main revision), the creation
    /// revision of the containing generation, and the version the key had at
    /// that point. The version steps down by one for every revision walked
    /// back from the generation's newest.
    pub fn get(&self, at_rev: i64) -> CResult<IndexGet> {
        let g = self.find_generation(at_rev).ok_or(Error::RevisionNotFound)?;
        // find_generation never yields a generation whose tombstone lies at
        // or below at_rev, so the revision found here cannot be a tombstone
        let i = g.walk(|rev| rev.main > at_rev).ok_or(Error::RevisionNotFound)?;
        Ok(IndexGet {
            modified: g.revs[i],
            created: g.created,
            ver: g.ver - (g.revs.len() - i - 1) as i64,
        })
    }

    /// Finds the generation whose revision span covers `at_rev`. None when
    /// `at_rev` precedes the first recorded write, falls in the gap between a
    /// tombstone and the next creation, or lies at or beyond the tombstone of
    /// a deleted key.
    pub(crate) fn find_generation(&self, at_rev: i64) -> Option<&Generation> {
        let last = self.generations.len().checked_sub(1)?;
        for (cg, g) in self.generations.iter().enumerate().rev() {
            if g.revs.is_empty() {
                continue;
            }
            if cg != last {
                // a closed generation does not cover its tombstone revision
                if let Some(tomb) = g.revs.last() {
                    if tomb.main <= at_rev {
                        return None;
                    }
                }
            }
            if g.revs[0].main <= at_rev {
                return Some(g);
            }
        }
        None
    }

    /// Every revision of the key with a main revision at or above `rev`, in
    /// ascending order. When one transaction wrote the key more than once,
    /// only the last of those writes is reported; the earlier ones were never
    /// externally visible.
    pub fn since(&self, rev: i64) -> Vec<Revision> {
        let since = Revision::new(rev, 0);
        let mut start = 0;
        for (gi, g) in self.generations.iter().enumerate().rev() {
            if g.is_empty() {
                continue;
            }
            start = gi;
            if since > g.created {
                break;
            }
        }

        let mut revs: Vec<Revision> = Vec::new();
        for g in &self.generations[start..] {
            for &r in &g.revs {
                if r < since {
                    continue;
                }
                match revs.last_mut() {
                    // an intra-transaction overwrite supersedes the earlier
                    // write at the same main revision
                    Some(last) if last.main == r.main => *last = r,
                    _ => revs.push(r),
                }
            }
        }
        revs
    }

    /// Removes every revision obsoleted by a compaction at `at_rev` and
    /// records the revisions that must stay live in `keep`. The newest
    /// revision at or below the watermark survives as long as it is readable;
    /// a tombstone survives only while it is the key's final state. The last
    /// generation (open or placeholder) is always preserved and `modified` is
    /// untouched.
    pub fn compact(&mut self, at_rev: i64, keep: &mut KeepSet) {
        if self.generations.is_empty() {
            return;
        }
        let (mut gen_idx, survivor) = self.compact_target(at_rev);
        let superseded = self.generations[gen_idx + 1..].iter().any(|g| !g.is_empty());
        let g = &mut self.generations[gen_idx];
        if let Some(i) = survivor {
            keep.insert(g.revs[i]);
            g.revs.drain(..i);
            // the survivor is the closing tombstone: once the key has been
            // created again the whole generation is dead weight
            if g.revs.len() == 1 && superseded {
                keep.remove(&g.revs[0]);
                gen_idx += 1;
            }
        }
        self.generations.drain(..gen_idx);
    }

    /// Computes, without mutating, exactly the keep set that `compact` at
    /// `at_rev` would produce. The caller stages backing-store pinning with
    /// it before running the real compaction.
    pub fn keep(&self, at_rev: i64, keep: &mut KeepSet) {
        if self.generations.is_empty() {
            return;
        }
        let (gen_idx, survivor) = self.compact_target(at_rev);
        let superseded = self.generations[gen_idx + 1..].iter().any(|g| !g.is_empty());
        let g = &self.generations[gen_idx];
        if let Some(i) = survivor {
            // a tombstone superseded by a newer generation keeps nothing
            if i == g.revs.len() - 1 && superseded {
                return;
            }
            keep.insert(g.revs[i]);
        }
    }

    /// Locates the compaction target: the oldest generation not wholly
    /// obsolete at `at_rev`, and the index of the surviving revision within
    /// it (None when every revision of the target is above the watermark).
    fn compact_target(&self, at_rev: i64) -> (usize, Option<usize>) {
        let mut gen_idx = 0;
        while gen_idx < self.generations.len() - 1 {
            if let Some(tomb) = self.generations[gen_idx].revs.last() {
                if tomb.main >= at_rev {
                    break;
                }
            }
            gen_idx += 1;
        }
        let survivor = self.generations[gen_idx].walk(|rev| rev.main > at_rev);
        (gen_idx, survivor)
    }

    /// Rebuilds a key index from persisted metadata, installing a single open
    /// generation that holds only the latest revision. The revisions between
    /// `created` and `modified` are not materialized and cannot be read back.
    ///
    /// # Panics
    ///
    /// Panics when the index already holds history.
    pub fn restore(&mut self, created: Revision, modified: Revision, ver: i64) {
        if !self.generations.is_empty() {
            error!("'restore' on a key index with existing history (key: {:?})", self.key);
            panic!("'restore' on a key index with existing history");
        }
        self.modified = modified;
        self.generations.push(Generation { ver, created, revs: vec![modified] });
    }

    /// Rebuilds a key index whose latest persisted write is a deletion: one
    /// closed generation holding only the tombstone, followed by the empty
    /// placeholder. The unknown earlier history collapses into the tombstone,
    /// so `created` and `ver` are taken from it.
    pub fn restore_tombstone(&mut self, rev: Revision) {
        self.restore(rev, rev, 1);
        self.generations.push(Generation::default());
    }

    /// True when the whole history has been compacted away: a single empty
    /// placeholder generation and no recorded writes. The owning key space
    /// uses this to decide when the key can be evicted.
    pub fn is_empty(&self) -> bool {
        self.generations.len() == 1
            && self.generations[0].is_empty()
            && self.generations[0].ver == 0
    }
}
