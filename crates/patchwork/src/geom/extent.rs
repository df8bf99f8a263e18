//! Spatial extent of a primitive, supported by nearby points.
//!
//! - Lines: the two endpoints spanned by the inliers projected onto the line.
//! - Planes: the four corners of the inliers' bounding rectangle in the plane.
//!
//! Inliers are the candidate points lying closer than `scale` to the primitive.

use nalgebra::Vector3;

use super::types::{any_perpendicular, Point, Primitive, PrimitiveKind};

/// Extent of `prim` over `points[ids]` (all points when `ids` is `None`).
///
/// Returns an empty vector when no point supports the primitive.
pub fn extent(
    prim: &Primitive,
    points: &[Point],
    ids: Option<&[usize]>,
    scale: f64,
) -> Vec<Vector3<f64>> {
    let inliers: Vec<Vector3<f64>> = match ids {
        Some(ids) => ids
            .iter()
            .filter_map(|&i| points.get(i))
            .map(|p| p.pos)
            .filter(|p| prim.distance_to(p) < scale)
            .collect(),
        None => points
            .iter()
            .map(|p| p.pos)
            .filter(|p| prim.distance_to(p) < scale)
            .collect(),
    };
    if inliers.is_empty() {
        return Vec::new();
    }

    match prim.kind {
        PrimitiveKind::Line => {
            let (lo, hi) = span(&inliers, &prim.pos, &prim.dir);
            vec![prim.pos + prim.dir * lo, prim.pos + prim.dir * hi]
        }
        PrimitiveKind::Plane => {
            let u = any_perpendicular(&prim.dir);
            let v = prim.dir.cross(&u);
            let (u0, u1) = span(&inliers, &prim.pos, &u);
            let (v0, v1) = span(&inliers, &prim.pos, &v);
            vec![
                prim.pos + u * u0 + v * v0,
                prim.pos + u * u1 + v * v0,
                prim.pos + u * u1 + v * v1,
                prim.pos + u * u0 + v * v1,
            ]
        }
    }
}

fn span(points: &[Vector3<f64>], origin: &Vector3<f64>, axis: &Vector3<f64>) -> (f64, f64) {
    points
        .iter()
        .map(|p| (p - origin).dot(axis))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
            (lo.min(t), hi.max(t))
        })
}
