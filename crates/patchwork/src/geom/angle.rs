//! Discrete angle sets and primitive/primitive angle matching.

use nalgebra::{Unit, Vector3};

use super::types::{any_perpendicular, Primitive, DIR_EPS};

/// Unsigned angle between two directions in `[0, π]`.
#[inline]
pub fn angle_in_rad(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let na = a.norm().max(DIR_EPS);
    let nb = b.norm().max(DIR_EPS);
    (a.dot(b) / (na * nb)).clamp(-1.0, 1.0).acos()
}

/// Expand angle generators (degrees) into the discrete angle set (radians).
///
/// Each generator `g > 0` contributes `0, g, 2g, ...` below π; π itself is
/// always included. The result is sorted and free of near-duplicates.
pub fn angle_set_from_generators(generators_deg: &[f64]) -> Vec<f64> {
    use std::f64::consts::PI;
    const DEDUP_EPS: f64 = 1e-9;

    let mut angles = vec![0.0, PI];
    for &g in generators_deg {
        let step = g.to_radians();
        if !(step.is_finite() && step > DEDUP_EPS) {
            continue;
        }
        let mut k = 1.0;
        while k * step < PI - DEDUP_EPS {
            angles.push(k * step);
            k += 1.0;
        }
    }
    angles.sort_by(|a, b| a.total_cmp(b));
    angles.dedup_by(|a, b| (*a - *b).abs() < DEDUP_EPS);
    angles
}

/// Rotation axis carrying `a` onto `b` by their unsigned angle.
///
/// Falls back to `z` for (anti)parallel directions in the xy-plane, and to an
/// arbitrary perpendicular otherwise.
pub fn pair_axis(a: &Vector3<f64>, b: &Vector3<f64>) -> Unit<Vector3<f64>> {
    let c = a.cross(b);
    if c.norm() > 1e-9 {
        return Unit::new_normalize(c);
    }
    if a.z.abs() < 1e-9 || a.norm() < DIR_EPS {
        Vector3::z_axis()
    } else {
        Unit::new_normalize(any_perpendicular(a))
    }
}

/// Angle matching strategy used by candidate generation.
pub trait AngleMatch {
    /// Smallest distance between the pair's angle and an entry of `angles`,
    /// with the index of that entry. `None` when `angles` is empty.
    fn closest(&self, a: &Primitive, b: &Primitive, angles: &[f64]) -> Option<(f64, usize)>;
}

/// Matches the unsigned direction angle against each allowed angle.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscreteAngleMatcher;

impl AngleMatch for DiscreteAngleMatcher {
    fn closest(&self, a: &Primitive, b: &Primitive, angles: &[f64]) -> Option<(f64, usize)> {
        let theta = angle_in_rad(&a.dir, &b.dir);
        angles
            .iter()
            .enumerate()
            .map(|(k, &allowed)| ((theta - allowed).abs(), k))
            .min_by(|x, y| x.0.total_cmp(&y.0))
    }
}
