//! Seeded synthetic scenes shared by the integration tests.

#![allow(dead_code)]

use nalgebra::{vector, Vector3};
use patchwork::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Direction classes in degrees; the index is the DIR_GID.
pub const CLASSES_DEG: [f64; 4] = [0.0, 45.0, 90.0, 135.0];

pub fn dir_deg(deg: f64) -> Vector3<f64> {
    let r = deg.to_radians();
    vector![r.cos(), r.sin(), 0.0]
}

/// Points on y = `y` for x in [x0, x1], `n` samples, owned by `gid`.
pub fn segment(points: &mut Vec<Point>, gid: Gid, y: f64, x0: f64, x1: f64, n: usize) {
    for k in 0..n {
        let t = k as f64 / (n - 1) as f64;
        let pid = points.len() as i32;
        points.push(Point::new(vector![x0 + t * (x1 - x0), y, 0.0], gid, pid));
    }
}

pub struct Scene {
    pub points: Vec<Point>,
    pub pool: PatchPool,
}

/// `patches` noisy 2D line patches. Each patch has one primitive, sometimes a
/// second one of a different direction class; (GID, DIR_GID) pairs are unique.
pub fn random_scene(seed: u64, patches: usize, scale: f64) -> Scene {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::new();
    let mut prims = Vec::new();
    for gid in 0..patches as Gid {
        let class = rng.gen_range(0..CLASSES_DEG.len());
        let jitter = rng.gen_range(-0.004..0.004_f64).to_degrees();
        let dir = dir_deg(CLASSES_DEG[class] + jitter);
        let origin = vector![rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0), 0.0];
        let n = rng.gen_range(2..16);
        for _ in 0..n {
            let t = rng.gen_range(-1.0..1.0_f64);
            let normal = vector![-dir.y, dir.x, 0.0];
            let noise = rng.gen_range(-0.25..0.25) * scale;
            let pid = points.len() as i32;
            points.push(Point::new(origin + dir * t + normal * noise, gid, pid));
        }
        prims.push(Primitive::line(origin, dir, gid, class as Gid));
        if rng.gen_bool(0.3) {
            let other = (class + rng.gen_range(1..CLASSES_DEG.len())) % CLASSES_DEG.len();
            prims.push(Primitive::line(origin, dir_deg(CLASSES_DEG[other]), gid, other as Gid));
        }
    }
    Scene {
        points,
        pool: PatchPool::from_primitives(prims),
    }
}
