//! Typed tags carried by points and primitives.
//!
//! The known keys (GID, DIR_GID, PID) are plain fields; ad hoc integer
//! attributes go into a small ordered string map. Missing values read as
//! [`UNSET`].

use std::collections::BTreeMap;

/// Patch / direction-class identifier.
pub type Gid = i32;

/// Value of a tag that was never assigned.
pub const UNSET: Gid = -1;
/// GID of a point whose patch has no surviving primitive.
pub const ORPHAN: Gid = -2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tags {
    /// Owning patch.
    pub gid: Gid,
    /// Direction class (primitives only; points keep `UNSET` unless known).
    pub dir_gid: Gid,
    /// Stable point index (points only).
    pub pid: i32,
    extra: BTreeMap<String, i32>,
}

impl Default for Tags {
    fn default() -> Self {
        Self {
            gid: UNSET,
            dir_gid: UNSET,
            pid: UNSET,
            extra: BTreeMap::new(),
        }
    }
}

impl Tags {
    #[inline]
    pub fn new(gid: Gid, dir_gid: Gid) -> Self {
        Self {
            gid,
            dir_gid,
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = pid;
        self
    }

    /// Stores an extension attribute.
    pub fn set_extra(&mut self, key: impl Into<String>, value: i32) {
        self.extra.insert(key.into(), value);
    }

    /// Reads an extension attribute, `UNSET` when missing.
    pub fn extra(&self, key: &str) -> i32 {
        self.extra.get(key).copied().unwrap_or(UNSET)
    }

    /// Iterates extension attributes in key order.
    pub fn extras(&self) -> impl Iterator<Item = (&str, i32)> {
        self.extra.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
