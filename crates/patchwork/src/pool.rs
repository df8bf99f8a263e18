//! Primitive arena grouped into patches.
//!
//! Why this layout
//! - Primitives live in one contiguous `Vec`; a `BTreeMap<Gid, Vec<usize>>`
//!   indexes them per patch. Patches iterate by GID ascending and primitives
//!   by insertion order, which makes every stage deterministic.
//! - A primitive is addressed by `PrimKey { gid, lid }` where `lid` is its
//!   position inside the patch.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::geom::Primitive;
use crate::tags::Gid;

/// (patch id, local index inside the patch).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PrimKey {
    pub gid: Gid,
    pub lid: usize,
}

impl PrimKey {
    #[inline]
    pub fn new(gid: Gid, lid: usize) -> Self {
        Self { gid, lid }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatchPool {
    prims: Vec<Primitive>,
    patches: BTreeMap<Gid, Vec<usize>>,
}

impl PatchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups primitives by their own GID tag.
    pub fn from_primitives(prims: impl IntoIterator<Item = Primitive>) -> Self {
        let mut pool = Self::new();
        for p in prims {
            pool.push(p);
        }
        pool
    }

    /// Appends `prim` to patch `gid` and returns its key.
    pub fn add(&mut self, gid: Gid, prim: Primitive) -> PrimKey {
        let slot = self.prims.len();
        self.prims.push(prim);
        let members = self.patches.entry(gid).or_default();
        members.push(slot);
        PrimKey::new(gid, members.len() - 1)
    }

    /// Appends `prim` to the patch named by its GID tag.
    pub fn push(&mut self, prim: Primitive) -> PrimKey {
        let gid = prim.gid();
        self.add(gid, prim)
    }

    /// Total number of primitives.
    #[inline]
    pub fn len(&self) -> usize {
        self.prims.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }

    /// Number of patches.
    #[inline]
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Patch ids in ascending order.
    pub fn gids(&self) -> impl Iterator<Item = Gid> + '_ {
        self.patches.keys().copied()
    }

    /// True if `gid` names a patch holding at least one primitive.
    pub fn has_primitives(&self, gid: Gid) -> bool {
        self.patches.get(&gid).is_some_and(|m| !m.is_empty())
    }

    /// Primitives of one patch in insertion order (empty for unknown GIDs).
    pub fn patch(&self, gid: Gid) -> impl Iterator<Item = &Primitive> + '_ {
        self.patches
            .get(&gid)
            .into_iter()
            .flatten()
            .map(move |&slot| &self.prims[slot])
    }

    pub fn get(&self, key: PrimKey) -> Option<&Primitive> {
        let slot = *self.patches.get(&key.gid)?.get(key.lid)?;
        self.prims.get(slot)
    }

    /// Patches in GID order, each with its primitives in insertion order.
    pub fn patches(&self) -> impl Iterator<Item = (Gid, Vec<&Primitive>)> + '_ {
        self.patches
            .iter()
            .map(move |(&gid, slots)| (gid, slots.iter().map(|&s| &self.prims[s]).collect()))
    }

    /// Every primitive with its key, GID ascending then insertion order.
    ///
    /// This is the flat order used to index solver variables.
    pub fn iter(&self) -> impl Iterator<Item = (PrimKey, &Primitive)> + '_ {
        self.patches.iter().flat_map(move |(&gid, slots)| {
            slots
                .iter()
                .enumerate()
                .map(move |(lid, &s)| (PrimKey::new(gid, lid), &self.prims[s]))
        })
    }
}
