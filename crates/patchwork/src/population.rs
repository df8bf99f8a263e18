//! Patch populations: GID → indices of the points assigned to that patch.

use std::collections::BTreeMap;

use crate::geom::Point;
use crate::tags::Gid;

/// Derived index; rebuild whenever point GIDs change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopulationIndex {
    members: BTreeMap<Gid, Vec<usize>>,
}

impl PopulationIndex {
    /// Groups point indices by GID (unassigned and orphaned points included
    /// under their negative ids).
    pub fn build(points: &[Point]) -> Self {
        let mut members: BTreeMap<Gid, Vec<usize>> = BTreeMap::new();
        for (pid, p) in points.iter().enumerate() {
            members.entry(p.gid()).or_default().push(pid);
        }
        Self { members }
    }

    /// Point indices of `gid` in ascending order (empty if none).
    pub fn members(&self, gid: Gid) -> &[usize] {
        self.members.get(&gid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of points assigned to `gid`.
    #[inline]
    pub fn size(&self, gid: Gid) -> usize {
        self.members(gid).len()
    }
}
