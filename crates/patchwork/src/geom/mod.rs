//! Oriented points and line/plane primitives.
//!
//! Purpose
//! - Hold the geometry the pipeline reasons about: tagged points and oriented
//!   primitives (lines in the xy-plane or planes in R³, both stored in R³).
//! - Provide the three pluggable strategies the stages consume: angle matching
//!   against a discrete angle set, point/primitive distance, and extents.
//!
//! Conventions
//! - Directions are stored unit length (line direction, plane normal).
//! - Angles are radians; angle sets are built from generators in degrees.
//! - Tolerances are fixed constants in `types` (no per-call juggling).

mod angle;
mod distance;
mod extent;
mod types;

pub use angle::{
    angle_in_rad, angle_set_from_generators, pair_axis, AngleMatch, DiscreteAngleMatcher,
};
pub use distance::{OrthogonalDistance, PointPrimitiveDistance};
pub use extent::extent;
pub use types::{Point, Primitive, PrimitiveKind};
