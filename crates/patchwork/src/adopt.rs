//! Orphan point adoption.
//!
//! After selection some patches keep no primitive; their points are orphans.
//! Adoption reassigns them greedily:
//! - iteration 0: points explained by exactly one primitive (within `scale`)
//!   go to that primitive's patch; points explained by none are likely outliers;
//! - later iterations: nearest-neighbour propagation. The globally closest
//!   (orphan, assigned point) pair whose patch primitive explains the orphan
//!   wins, one assignment at a time. When propagation stalls, orphans that
//!   some primitive still explains go to the closest such primitive.
//!   Propagation alone leaves an explained orphan behind when no assigned
//!   point of an explaining patch is near it; the closest-primitive pass is
//!   what guarantees every explained orphan ends up adopted.
//!
//! The loop ends when an iteration after the first reassigns nothing. Points
//! left over keep `ORPHAN` and are reported, not corrected.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::Error;
use crate::geom::{Point, PointPrimitiveDistance};
use crate::pool::{PatchPool, PrimKey};
use crate::tags::{Gid, ORPHAN};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdoptReport {
    /// Points marked orphan before adoption.
    pub orphaned: usize,
    /// Points that received a new GID.
    pub reassigned: usize,
    /// Point indices still orphaned after convergence.
    pub remaining: Vec<usize>,
    /// Outer iterations run.
    pub iterations: usize,
}

/// GIDs referenced by points but holding no primitive in `pool`, with the
/// indices of the affected points.
pub fn orphan_gids(points: &[Point], pool: &PatchPool) -> (BTreeSet<Gid>, BTreeSet<usize>) {
    let mut gids = BTreeSet::new();
    let mut pids = BTreeSet::new();
    for (pid, p) in points.iter().enumerate() {
        if !pool.has_primitives(p.gid()) {
            gids.insert(p.gid());
            pids.insert(pid);
        }
    }
    (gids, pids)
}

/// Reassign points whose patch has no primitive in `pool`. Mutates GIDs in place.
pub fn adopt(
    points: &mut [Point],
    pool: &PatchPool,
    scale: f64,
    distance: &dyn PointPrimitiveDistance,
) -> Result<AdoptReport, Error> {
    let span = tracing::info_span!("adopt", scale, points = points.len());
    let _enter = span.enter();

    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::invalid("scale must be positive"));
    }

    let mut queue: Vec<usize> = Vec::new();
    for (pid, p) in points.iter_mut().enumerate() {
        if !pool.has_primitives(p.gid()) {
            p.set_gid(ORPHAN);
            queue.push(pid);
        }
    }
    let mut report = AdoptReport {
        orphaned: queue.len(),
        ..AdoptReport::default()
    };
    tracing::info!(orphans = queue.len(), "marked orphan points");

    let mut warned: BTreeSet<Gid> = BTreeSet::new();
    while !queue.is_empty() {
        let change = if report.iterations == 0 {
            resolve_unambiguous(points, &mut queue, pool, scale, distance)
        } else {
            propagate(points, &mut queue, pool, scale, distance, &mut warned)
                + resolve_nearest(points, &mut queue, pool, scale, distance)
        };
        report.iterations += 1;
        report.reassigned += change;
        tracing::debug!(iteration = report.iterations, change, left = queue.len(), "adoption pass");
        if change == 0 && report.iterations > 1 {
            break;
        }
    }

    if !queue.is_empty() {
        tracing::warn!(remaining = queue.len(), "points remain orphaned after adoption");
    }
    report.remaining = queue;
    tracing::info!(
        reassigned = report.reassigned,
        iterations = report.iterations,
        "finished adopting"
    );
    Ok(report)
}

/// Every primitive explaining `point` within `scale`, pool order.
fn adopters(
    point: &Point,
    pool: &PatchPool,
    scale: f64,
    distance: &dyn PointPrimitiveDistance,
) -> Vec<(PrimKey, f64)> {
    pool.iter()
        .map(|(key, prim)| (key, distance.eval(point, prim)))
        .filter(|&(_, d)| d < scale)
        .collect()
}

fn resolve_unambiguous(
    points: &mut [Point],
    queue: &mut Vec<usize>,
    pool: &PatchPool,
    scale: f64,
    distance: &dyn PointPrimitiveDistance,
) -> usize {
    let mut change = 0;
    queue.retain(|&pid| {
        let found = adopters(&points[pid], pool, scale, distance);
        tracing::debug!(pid, adopters = found.len(), "orphan candidates");
        match found.as_slice() {
            [] => {
                tracing::warn!(pid, "no primitive explains point, likely an outlier");
                true
            }
            [(key, _)] => {
                points[pid].set_gid(key.gid);
                change += 1;
                false
            }
            _ => true,
        }
    });
    change
}

fn propagate(
    points: &mut [Point],
    queue: &mut Vec<usize>,
    pool: &PatchPool,
    scale: f64,
    distance: &dyn PointPrimitiveDistance,
    warned: &mut BTreeSet<Gid>,
) -> usize {
    let mut change = 0;
    while !queue.is_empty() {
        // (distance, queue slot, adopting gid)
        let mut best: Option<(f64, usize, Gid)> = None;
        for (slot, &pid) in queue.iter().enumerate() {
            let orphan = &points[pid];
            for (pid2, other) in points.iter().enumerate() {
                let gid2 = other.gid();
                if pid2 == pid || gid2 < 0 {
                    continue;
                }
                let d = (orphan.pos - other.pos).norm();
                if best.is_some_and(|(bd, _, _)| d >= bd) {
                    continue;
                }
                let mut prims = pool.patch(gid2);
                let Some(first) = prims.next() else {
                    continue;
                };
                if prims.next().is_some() && warned.insert(gid2) {
                    tracing::warn!(gid = gid2, "patch holds several primitives, using the first");
                }
                if distance.eval(orphan, first) < scale {
                    best = Some((d, slot, gid2));
                }
            }
        }
        let Some((_, slot, gid)) = best else {
            break;
        };
        let pid = queue.remove(slot);
        points[pid].set_gid(gid);
        change += 1;
    }
    change
}

fn resolve_nearest(
    points: &mut [Point],
    queue: &mut Vec<usize>,
    pool: &PatchPool,
    scale: f64,
    distance: &dyn PointPrimitiveDistance,
) -> usize {
    let mut change = 0;
    queue.retain(|&pid| {
        let nearest = adopters(&points[pid], pool, scale, distance)
            .into_iter()
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match nearest {
            Some((key, _)) => {
                points[pid].set_gid(key.gid);
                change += 1;
                false
            }
            None => true,
        }
    });
    change
}
