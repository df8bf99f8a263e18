//! Candidate generation and patch consolidation for primitive fitting.
//!
//! Pipeline (one iteration)
//! - `population`: group point indices by their patch id (GID).
//! - `candidates`: cross every primitive pair and synthesize new candidates that
//!   combine one patch's position with another patch's direction class.
//! - `select`: round the external solver's solution and keep chosen candidates.
//! - `adopt`: reassign points whose patch lost all primitives during selection.
//! - `merge`: alias adjacent, parallel primitives sharing a direction class and
//!   rewrite point GIDs to the surviving patch.
//!
//! API Policy
//! - Every stage is synchronous and deterministic: patches iterate by GID
//!   ascending, primitives by insertion order.
//! - Stages log through `tracing`; the caller installs the subscriber.
//! - Strategies (angle matching, point/primitive distance, patch distance) are
//!   passed as trait objects so tests can swap in mocks.

pub mod adopt;
pub mod candidates;
pub mod config;
pub mod error;
pub mod geom;
pub mod merge;
pub mod pool;
pub mod population;
pub mod select;
pub mod tags;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::Error;
pub use nalgebra::Vector3 as Vec3;

/// Common exports for pipeline callers.
pub mod prelude {
    pub use crate::adopt::{adopt, orphan_gids, AdoptReport};
    pub use crate::candidates::{generate, GenerateParams, GenerateReport, SmallMode};
    pub use crate::config::PipelineConfig;
    pub use crate::error::Error;
    pub use crate::geom::{
        angle_in_rad, angle_set_from_generators, AngleMatch, DiscreteAngleMatcher,
        OrthogonalDistance, Point, PointPrimitiveDistance, Primitive, PrimitiveKind,
    };
    pub use crate::merge::{merge, AliasMap, EndpointDistance, MergeParams, MergeReport, PatchDistance};
    pub use crate::pool::{PatchPool, PrimKey};
    pub use crate::population::PopulationIndex;
    pub use crate::select::{select_from_solution, solve_and_select, MiqpSolver, QpProblem};
    pub use crate::tags::{Gid, Tags, ORPHAN, UNSET};
    pub use nalgebra::Vector3 as Vec3;
}
