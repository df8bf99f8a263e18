//! Point and primitive types.

use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::tags::{Gid, Tags};

/// Below this norm a direction is treated as degenerate.
pub(crate) const DIR_EPS: f64 = 1e-12;

/// Oriented sample from the input cloud.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub pos: Vector3<f64>,
    pub tags: Tags,
}

impl Point {
    /// Point at `pos` owned by patch `gid`; `pid` is its index in the cloud.
    pub fn new(pos: Vector3<f64>, gid: Gid, pid: i32) -> Self {
        Self {
            pos,
            tags: Tags::new(gid, crate::tags::UNSET).with_pid(pid),
        }
    }

    #[inline]
    pub fn gid(&self) -> Gid {
        self.tags.gid
    }

    #[inline]
    pub fn set_gid(&mut self, gid: Gid) {
        self.tags.gid = gid;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// Infinite line through `pos` along `dir`.
    Line,
    /// Plane through `pos` with normal `dir`.
    Plane,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Plane => "plane",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Some(Self::Line),
            "plane" => Some(Self::Plane),
            _ => None,
        }
    }
}

/// Line or plane with patch tags.
///
/// Invariants:
/// - `dir` is unit length unless it was constructed from a zero vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub pos: Vector3<f64>,
    pub dir: Vector3<f64>,
    pub tags: Tags,
}

impl Primitive {
    pub fn new(kind: PrimitiveKind, pos: Vector3<f64>, dir: Vector3<f64>, tags: Tags) -> Self {
        let norm = dir.norm();
        let dir = if norm > DIR_EPS { dir / norm } else { dir };
        Self {
            kind,
            pos,
            dir,
            tags,
        }
    }

    pub fn line(pos: Vector3<f64>, dir: Vector3<f64>, gid: Gid, dir_gid: Gid) -> Self {
        Self::new(PrimitiveKind::Line, pos, dir, Tags::new(gid, dir_gid))
    }

    pub fn plane(pos: Vector3<f64>, normal: Vector3<f64>, gid: Gid, dir_gid: Gid) -> Self {
        Self::new(PrimitiveKind::Plane, pos, normal, Tags::new(gid, dir_gid))
    }

    #[inline]
    pub fn gid(&self) -> Gid {
        self.tags.gid
    }

    #[inline]
    pub fn dir_gid(&self) -> Gid {
        self.tags.dir_gid
    }

    /// Orthogonal distance from `p` to the line or plane.
    pub fn distance_to(&self, p: &Vector3<f64>) -> f64 {
        let d = p - self.pos;
        match self.kind {
            PrimitiveKind::Line => (d - self.dir * d.dot(&self.dir)).norm(),
            PrimitiveKind::Plane => d.dot(&self.dir).abs(),
        }
    }

    /// New primitive at this one's position, oriented like `donor` rotated by
    /// `angle` about `axis`. Tagged with this GID and the donor's DIR_GID.
    ///
    /// Returns `None` when the kinds differ (a line cannot receive a normal).
    pub fn generate_from(
        &self,
        donor: &Primitive,
        axis: &Unit<Vector3<f64>>,
        angle: f64,
    ) -> Option<Primitive> {
        if self.kind != donor.kind {
            return None;
        }
        let dir = Rotation3::from_axis_angle(axis, angle) * donor.dir;
        Some(Primitive::new(
            self.kind,
            self.pos,
            dir,
            Tags::new(self.tags.gid, donor.tags.dir_gid),
        ))
    }
}

/// Some unit vector orthogonal to `v` (v non-zero).
pub(crate) fn any_perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let a = v.abs();
    let e = if a.x <= a.y && a.x <= a.z {
        Vector3::x()
    } else if a.y <= a.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    v.cross(&e).normalize()
}
