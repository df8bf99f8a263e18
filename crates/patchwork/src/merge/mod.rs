//! Merge adjacent, parallel primitives that share a direction class.
//!
//! Purpose
//! - After adoption, several patches often describe the same physical line or
//!   plane. Two primitives merge when their extents come within
//!   `adjacency_mult * scale`, they carry the same DIR_GID and their directions
//!   differ by less than `parallel_limit`.
//!
//! Why a union-find
//! - Merges chain (A~B, B~C). The alias map resolves every key to a single
//!   representative, flattened before output, so patch GIDs on points never
//!   point at a key that was itself merged away.
//!
//! Rounds
//! - Once B merges into A, B's points count towards A's extent, which may now
//!   reach a third patch. Pairing repeats over the surviving keys until a
//!   round joins nothing, so merging the output again finds no new alias.
//!
//! Output
//! - The pool keeps every primitive that is not an alias source.
//! - Points whose GID belongs to an alias source move to its representative's GID.

mod alias;

pub use alias::AliasMap;

use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geom::{angle_in_rad, extent, Point, Primitive};
use crate::pool::{PatchPool, PrimKey};
use crate::population::PopulationIndex;
use crate::tags::Gid;

/// Patch/patch distance strategy over primitive extents.
pub trait PatchDistance {
    fn eval(&self, a: &[Vector3<f64>], b: &[Vector3<f64>]) -> f64;
}

/// Minimum endpoint-to-endpoint distance; infinite if either extent is empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct EndpointDistance;

impl PatchDistance for EndpointDistance {
    fn eval(&self, a: &[Vector3<f64>], b: &[Vector3<f64>]) -> f64 {
        a.iter()
            .flat_map(|x| b.iter().map(move |y| (x - y).norm()))
            .fold(f64::INFINITY, f64::min)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeParams {
    /// Inlier distance for extents; also the unit of the adjacency threshold.
    pub scale: f64,
    /// Maximum angle (radians) between merged directions.
    pub parallel_limit: f64,
    /// Extents closer than `adjacency_mult * scale` are adjacent.
    pub adjacency_mult: f64,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            scale: 0.05,
            parallel_limit: 0.08,
            adjacency_mult: 3.0,
        }
    }
}

impl MergeParams {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::invalid("scale must be positive"));
        }
        if !(self.parallel_limit.is_finite() && self.parallel_limit >= 0.0) {
            return Err(Error::invalid("parallel_limit must be non-negative"));
        }
        if !(self.adjacency_mult.is_finite() && self.adjacency_mult > 0.0) {
            return Err(Error::invalid("adjacency multiplier must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// (merged key, representative) pairs, flattened.
    pub aliases: Vec<(PrimKey, PrimKey)>,
    /// Primitives written to the output pool.
    pub kept: usize,
    /// Points whose GID differs from the input.
    pub rewritten_points: usize,
    /// Pairing rounds run; the last one joins nothing.
    pub rounds: usize,
}

/// Merge redundant primitives of `input` into `out` and rewrite point GIDs.
pub fn merge(
    out: &mut PatchPool,
    points: &mut [Point],
    input: &PatchPool,
    params: &MergeParams,
    patch_distance: &dyn PatchDistance,
) -> Result<MergeReport, Error> {
    let span = tracing::info_span!("merge", scale = params.scale, prims = input.len());
    let _enter = span.enter();

    params.validate()?;
    if !out.is_empty() {
        tracing::warn!(existing = out.len(), "output pool is not empty");
    }

    let keys: Vec<(PrimKey, &Primitive)> = input
        .iter()
        .inspect(|(key, prim)| {
            if prim.gid() != key.gid {
                tracing::warn!(patch = key.gid, tag = prim.gid(), "primitive GID tag disagrees with its patch");
            }
        })
        .collect();
    let before: Vec<Gid> = points.iter().map(Point::gid).collect();

    // Rounds run until a pass joins nothing. Each round sees the point GIDs
    // rewritten by the previous one, so grown extents get compared again.
    let limit = params.adjacency_mult * params.scale;
    let mut aliases = AliasMap::new();
    let mut report = MergeReport::default();
    loop {
        report.rounds += 1;
        let population = PopulationIndex::build(points);
        let survivors: Vec<(PrimKey, &Primitive, Vec<Vector3<f64>>)> = keys
            .iter()
            .filter(|(key, _)| !aliases.is_alias(*key))
            .map(|&(key, prim)| {
                let members = population.members(key.gid);
                let ids = (!members.is_empty()).then_some(members);
                (key, prim, extent(prim, points, ids, params.scale))
            })
            .collect();

        let mut joined = 0;
        for (i, (key0, prim0, ext0)) in survivors.iter().enumerate() {
            for (key1, prim1, ext1) in &survivors[i + 1..] {
                if prim0.dir_gid() != prim1.dir_gid() {
                    continue;
                }
                if angle_in_rad(&prim0.dir, &prim1.dir) >= params.parallel_limit {
                    continue;
                }
                let d = patch_distance.eval(ext0, ext1);
                if d < limit && aliases.union(*key0, *key1) {
                    tracing::debug!(?key0, ?key1, dir_gid = prim0.dir_gid(), dist = d, "merging");
                    joined += 1;
                }
            }
        }
        tracing::debug!(round = report.rounds, joined, "merge round");
        if joined == 0 {
            break;
        }
        aliases.canonicalize();
        retarget(points, &aliases);
    }

    report.aliases = aliases.sources().collect();
    for &(key, prim) in &keys {
        if !aliases.is_alias(key) {
            out.add(key.gid, prim.clone());
            report.kept += 1;
        }
    }
    report.rewritten_points = points
        .iter()
        .zip(&before)
        .filter(|(p, gid)| p.gid() != **gid)
        .count();

    tracing::info!(
        aliases = report.aliases.len(),
        kept = report.kept,
        rewritten = report.rewritten_points,
        "finished merging"
    );
    Ok(report)
}

/// Move points of every alias source GID to its representative's GID.
/// The first alias source of a GID (key order) decides.
fn retarget(points: &mut [Point], aliases: &AliasMap) {
    let mut target: BTreeMap<Gid, Gid> = BTreeMap::new();
    for (src, dst) in aliases.sources() {
        target.entry(src.gid).or_insert(dst.gid);
    }
    for p in points.iter_mut() {
        if let Some(&gid) = target.get(&p.gid()) {
            p.set_gid(gid);
        }
    }
}
