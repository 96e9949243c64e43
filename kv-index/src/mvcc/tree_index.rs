use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use bytes::Bytes;
use log::info;

use crate::error::{CResult, Error};
use crate::mvcc::key_index::{IndexGet, KeyIndex};
use crate::mvcc::revision::Revision;
use crate::mvcc::KeepSet;

/// The ordered key space of the multi-version store: maps every user key to
/// the index of its revision history, in lexicographic byte order.
///
/// The tree takes a single writer lock for mutations and a shared lock for
/// reads; the key indexes themselves are unsynchronized, as the lock already
/// serializes access to them. Lock poisoning surfaces as `Error::Internal`.
pub struct TreeIndex {
    tree: RwLock<BTreeMap<Bytes, KeyIndex>>,
}

impl TreeIndex {
    pub fn new() -> Self {
        TreeIndex { tree: RwLock::new(BTreeMap::new()) }
    }

    /// Records a put of `key` at `rev`, creating the key's index on its first
    /// write. Revisions must be handed in in increasing order per key.
    pub fn put(&self, key: &[u8], rev: Revision) -> CResult<()> {
        let mut tree = self.tree.write()?;
        match tree.get_mut(key) {
            Some(ki) => ki.put(rev),
            None => {
                let key = Bytes::copy_from_slice(key);
                let mut ki = KeyIndex::new(key.clone());
                ki.put(rev);
                tree.insert(key, ki);
            }
        }
        Ok(())
    }

    /// Closes the current generation of `key` at `rev`. Fails with
    /// `RevisionNotFound` when the key is unknown or already deleted.
    pub fn tombstone(&self, key: &[u8], rev: Revision) -> CResult<()> {
        let mut tree = self.tree.write()?;
        let ki = tree.get_mut(key).ok_or(Error::RevisionNotFound)?;
        ki.tombstone(rev)
    }

    /// Point-in-time read of a single key's metadata at `at_rev`.
    pub fn get(&self, key: &[u8], at_rev: i64) -> CResult<IndexGet> {
        let tree = self.tree.read()?;
        let ki = tree.get(key).ok_or(Error::RevisionNotFound)?;
        ki.get(at_rev)
    }

    /// Every key in `[key, end)` visible at `at_rev`, paired with the
    /// revision that last set it. A `None` end addresses the single key.
    pub fn range(
        &self,
        key: &[u8],
        end: Option<&[u8]>,
        at_rev: i64,
    ) -> CResult<(Vec<Bytes>, Vec<Revision>)> {
        let tree = self.tree.read()?;
        let mut keys = Vec::new();
        let mut revs = Vec::new();
        match end {
            None => {
                if let Some(ki) = tree.get(key) {
                    if let Ok(got) = ki.get(at_rev) {
                        keys.push(ki.key.clone());
                        revs.push(got.modified);
                    }
                }
            }
            Some(end) if end <= key => {}
            Some(end) => {
                let bounds = (Bound::Included(key), Bound::Excluded(end));
                for (k, ki) in tree.range::<[u8], _>(bounds) {
                    if let Ok(got) = ki.get(at_rev) {
                        keys.push(k.clone());
                        revs.push(got.modified);
                    }
                }
            }
        }
        Ok((keys, revs))
    }

    /// The union of `since(rev)` over every key in `[key, end)`, ordered by
    /// revision. With a `None` end the single key's history is returned.
    pub fn range_since(&self, key: &[u8], end: Option<&[u8]>, rev: i64) -> CResult<Vec<Revision>> {
        let tree = self.tree.read()?;
        match end {
            None => Ok(tree.get(key).map(|ki| ki.since(rev)).unwrap_or_default()),
            Some(end) if end <= key => Ok(Vec::new()),
            Some(end) => {
                let bounds = (Bound::Included(key), Bound::Excluded(end));
                let mut revs = Vec::new();
                for (_, ki) in tree.range::<[u8], _>(bounds) {
                    revs.extend(ki.since(rev));
                }
                revs.sort();
                Ok(revs)
            }
        }
    }

    /// Compacts every key index at `at_rev`, evicting keys whose whole
    /// history was removed, and returns the set of revisions the backing
    /// store must retain.
    pub fn compact(&self, at_rev: i64) -> CResult<KeepSet> {
        info!("compacting key index tree at revision {at_rev}");
        let mut keep = KeepSet::new();
        let mut tree = self.tree.write()?;
        tree.retain(|_, ki| {
            ki.compact(at_rev, &mut keep);
            !ki.is_empty()
        });
        Ok(keep)
    }

    /// The keep set a compaction at `at_rev` would produce, computed without
    /// mutating any key index.
    pub fn keep(&self, at_rev: i64) -> CResult<KeepSet> {
        let mut keep = KeepSet::new();
        let tree = self.tree.read()?;
        for ki in tree.values() {
            ki.keep(at_rev, &mut keep);
        }
        Ok(keep)
    }

    /// Reinstalls a key from persisted metadata during recovery. Fails when
    /// the key already has in-memory history.
    pub fn restore(
        &self,
        key: &[u8],
        created: Revision,
        modified: Revision,
        ver: i64,
    ) -> CResult<()> {
        self.install(key, |ki| ki.restore(created, modified, ver))
    }

    /// Reinstalls a key whose latest persisted write is a tombstone.
    pub fn restore_tombstone(&self, key: &[u8], rev: Revision) -> CResult<()> {
        self.install(key, |ki| ki.restore_tombstone(rev))
    }

    fn install(&self, key: &[u8], restore: impl FnOnce(&mut KeyIndex)) -> CResult<()> {
        let mut tree = self.tree.write()?;
        if tree.contains_key(key) {
            return Err(Error::Internal(format!("restore of an already indexed key {key:?}")));
        }
        let key = Bytes::copy_from_slice(key);
        let mut ki = KeyIndex::new(key.clone());
        restore(&mut ki);
        tree.insert(key, ki);
        Ok(())
    }

    /// The number of keys currently indexed.
    pub fn len(&self) -> CResult<usize> {
        Ok(self.tree.read()?.len())
    }

    /// Whether no key is currently indexed.
    pub fn is_empty(&self) -> CResult<bool> {
        Ok(self.tree.read()?.is_empty())
    }
}

impl Default for TreeIndex {
    fn default() -> Self {
        TreeIndex::new()
    }
}
