//! Alias map over primitive keys (union-find with path compression).
//!
//! Invariants:
//! - A key absent from `parent` is its own representative.
//! - The representative of a set is its smallest key, so earlier patches
//!   (GID ascending, then local index) absorb later ones.
//! - After `canonicalize`, every alias source points directly at its
//!   representative.

use std::collections::BTreeMap;

use crate::pool::PrimKey;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasMap {
    parent: BTreeMap<PrimKey, PrimKey>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Representative of `key`, compressing the path on the way.
    pub fn find(&mut self, key: PrimKey) -> PrimKey {
        let root = self.resolve(key);
        let mut cur = key;
        while let Some(next) = self.parent.get(&cur).copied() {
            if next == root {
                break;
            }
            self.parent.insert(cur, root);
            cur = next;
        }
        root
    }

    /// Representative of `key` without mutating the map.
    pub fn resolve(&self, key: PrimKey) -> PrimKey {
        let mut cur = key;
        while let Some(&next) = self.parent.get(&cur) {
            cur = next;
        }
        cur
    }

    /// Merge the sets of `a` and `b`. Returns false if they were already joined.
    pub fn union(&mut self, a: PrimKey, b: PrimKey) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent.insert(child, root);
        true
    }

    /// Point every alias source straight at its representative.
    pub fn canonicalize(&mut self) {
        let keys: Vec<PrimKey> = self.parent.keys().copied().collect();
        for k in keys {
            let root = self.resolve(k);
            self.parent.insert(k, root);
        }
    }

    /// True if `key` has been merged into another key.
    #[inline]
    pub fn is_alias(&self, key: PrimKey) -> bool {
        self.parent.contains_key(&key)
    }

    /// (source, target) pairs in source order. Targets are representatives
    /// once `canonicalize` has run.
    pub fn sources(&self) -> impl Iterator<Item = (PrimKey, PrimKey)> + '_ {
        self.parent.iter().map(|(&s, &t)| (s, t))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
