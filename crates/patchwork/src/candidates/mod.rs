//! Candidate generation: cross every primitive pair and synthesize new
//! primitives that reuse one patch's position with another's direction class.
//!
//! Traversal
//! - For patches `a <= c` (GID order), primitive `i` of `a` and `j` of `c`,
//!   with `j > i` when `a == c`: every unordered pair of distinct primitives is
//!   visited exactly once.
//!
//! Gating per pair
//! - Angle gate: the pair's angle must be within `angle_limit / angle_limit_div`
//!   of some allowed angle.
//! - Small-patch policy (`SmallMode`) adjusts the gate by patch population.
//! - Dedup: a patch receives each DIR_GID at most once; the first route wins.
//!
//! Orientation
//! - `add0` puts a primitive at `i` with `j`'s direction rotated by `-angle`,
//!   `add1` puts one at `j` with `i`'s direction rotated by `+angle`, both about
//!   the axis carrying `i` onto `j`. The candidate therefore sits at exactly
//!   `angle` from its donor.

mod params;

pub use params::{GenerateParams, SmallMode};

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::Error;
use crate::geom::{pair_axis, AngleMatch, Point, Primitive};
use crate::pool::PatchPool;
use crate::population::PopulationIndex;
use crate::tags::Gid;

/// Counts reported by [`generate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GenerateReport {
    /// Input primitives copied verbatim.
    pub copied: usize,
    /// Newly synthesized candidates.
    pub candidates: usize,
}

impl GenerateReport {
    #[inline]
    pub fn total(&self) -> usize {
        self.copied + self.candidates
    }
}

/// Fill `out` with the input primitives plus all admissible cross candidates.
///
/// `out` is expected to be empty; existing content is kept and logged.
/// Fails only on invalid parameters (negative population limit, empty angle
/// set, non-positive scale).
pub fn generate(
    out: &mut PatchPool,
    input: &PatchPool,
    points: &[Point],
    scale: f64,
    angles: &[f64],
    params: &GenerateParams,
    matcher: &dyn AngleMatch,
) -> Result<GenerateReport, Error> {
    let span = tracing::info_span!("generate", scale, patches = input.patch_count());
    let _enter = span.enter();

    if !out.is_empty() {
        tracing::warn!(existing = out.len(), "output pool is not empty");
    }
    params.validate()?;
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::invalid("scale must be positive"));
    }
    if angles.is_empty() {
        return Err(Error::invalid("angle set is empty"));
    }

    let population = PopulationIndex::build(points);
    let angle_limit = params.effective_angle_limit();
    let pop_limit = params.patch_population_limit as usize;
    let mut report = GenerateReport::default();

    // [gid] -> direction classes already present in the output
    let mut copied: BTreeMap<Gid, BTreeSet<Gid>> = BTreeMap::new();

    // Keep the input (and with it any previous selection) verbatim.
    for (key, prim) in input.iter() {
        if prim.gid() != key.gid {
            tracing::warn!(
                patch = key.gid,
                tag = prim.gid(),
                lid = key.lid,
                "primitive GID tag disagrees with its patch"
            );
        }
        out.add(prim.gid(), prim.clone());
        if !copied.entry(prim.gid()).or_default().insert(prim.dir_gid()) {
            tracing::warn!(
                gid = prim.gid(),
                dir_gid = prim.dir_gid(),
                "input repeats a (GID, DIR_GID) pair"
            );
        }
        report.copied += 1;
    }

    let patches: Vec<(Gid, Vec<&Primitive>)> = input.patches().collect();
    for (a, (gid_a, prims_a)) in patches.iter().enumerate() {
        for (i, &prim0) in prims_a.iter().enumerate() {
            for (gid_c, prims_c) in &patches[a..] {
                let start = if gid_c == gid_a { i + 1 } else { 0 };
                for &prim1 in prims_c.iter().skip(start) {
                    cross(
                        out,
                        &mut copied,
                        &mut report,
                        (prim0, prim1),
                        &population,
                        angles,
                        angle_limit,
                        pop_limit,
                        params.small_mode,
                        matcher,
                    );
                }
            }
        }
    }

    tracing::info!(
        copied = report.copied,
        candidates = report.candidates,
        total = report.total(),
        "finished generating"
    );
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn cross(
    out: &mut PatchPool,
    copied: &mut BTreeMap<Gid, BTreeSet<Gid>>,
    report: &mut GenerateReport,
    (prim0, prim1): (&Primitive, &Primitive),
    population: &PopulationIndex,
    angles: &[f64],
    angle_limit: f64,
    pop_limit: usize,
    small_mode: SmallMode,
    matcher: &dyn AngleMatch,
) {
    let (gid0, gid1) = (prim0.gid(), prim1.gid());
    let (angdiff, closest) = matcher
        .closest(prim0, prim1, angles)
        .unwrap_or((f64::INFINITY, 0));

    let close = angdiff < angle_limit;
    let (mut add0, mut add1) = (close, close);
    match small_mode {
        SmallMode::ReceiveAll => {
            add0 |= population.size(gid0) < pop_limit;
            add1 |= population.size(gid1) < pop_limit;
        }
        SmallMode::Ignore => {
            let both_large =
                population.size(gid0) >= pop_limit && population.size(gid1) >= pop_limit;
            add0 &= both_large;
            add1 &= both_large;
        }
        SmallMode::ReceiveSimilar => {}
    }

    let has = |gid: Gid, dir: Gid| copied.get(&gid).is_some_and(|s| s.contains(&dir));
    add0 &= !has(gid0, prim1.dir_gid());
    add1 &= !has(gid1, prim0.dir_gid());
    if !add0 && !add1 {
        return;
    }

    let Some(&angle) = angles.get(closest) else {
        tracing::warn!(closest, len = angles.len(), "angle matcher index out of range");
        return;
    };
    let axis = pair_axis(&prim0.dir, &prim1.dir);

    if add0 {
        if let Some(cand) = prim0.generate_from(prim1, &axis, -angle) {
            copied.entry(gid0).or_default().insert(cand.dir_gid());
            out.add(gid0, cand);
            report.candidates += 1;
        }
    }
    if add1 {
        if let Some(cand) = prim1.generate_from(prim0, &axis, angle) {
            copied.entry(gid1).or_default().insert(cand.dir_gid());
            out.add(gid1, cand);
            report.candidates += 1;
        }
    }
}
