//! Merge scenarios on collinear segment scenes.

mod common;

use common::segment;
use nalgebra::{vector, Vector3};
use patchwork::prelude::*;

fn params() -> MergeParams {
    MergeParams {
        scale: 0.1,
        parallel_limit: 0.05,
        adjacency_mult: 3.0,
    }
}

#[test]
fn close_collinear_patches_merge_and_points_follow() {
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 11);
    segment(&mut points, 1, 0.0, 1.05, 2.0, 11); // gap 0.05 = 0.5 * scale
    let input = PatchPool::from_primitives([
        Primitive::line(vector![0.5, 0.0, 0.0], Vector3::x(), 0, 4),
        Primitive::line(vector![1.5, 0.0, 0.0], Vector3::x(), 1, 4),
    ]);
    let mut out = PatchPool::new();
    let report = merge(&mut out, &mut points, &input, &params(), &EndpointDistance).unwrap();
    assert_eq!(report.aliases, vec![(PrimKey::new(1, 0), PrimKey::new(0, 0))]);
    assert_eq!(report.kept, 1);
    assert_eq!(report.rewritten_points, 11);
    assert_eq!(out.len(), 1);
    assert!(out.has_primitives(0));
    assert!(points.iter().all(|p| p.gid() == 0));
}

#[test]
fn different_direction_class_or_angle_blocks_merge() {
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 11);
    segment(&mut points, 1, 0.0, 1.05, 2.0, 11);

    let other_class = PatchPool::from_primitives([
        Primitive::line(vector![0.5, 0.0, 0.0], Vector3::x(), 0, 4),
        Primitive::line(vector![1.5, 0.0, 0.0], Vector3::x(), 1, 5),
    ]);
    let mut out = PatchPool::new();
    let r = merge(&mut out, &mut points, &other_class, &params(), &EndpointDistance).unwrap();
    assert!(r.aliases.is_empty());
    assert_eq!(out, other_class);

    let tilted = PatchPool::from_primitives([
        Primitive::line(vector![0.5, 0.0, 0.0], Vector3::x(), 0, 4),
        Primitive::line(vector![1.5, 0.0, 0.0], vector![1.0, 0.2, 0.0], 1, 4),
    ]);
    let mut out = PatchPool::new();
    let r = merge(&mut out, &mut points, &tilted, &params(), &EndpointDistance).unwrap();
    assert!(r.aliases.is_empty());
}

#[test]
fn distant_patches_stay_apart() {
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 11);
    segment(&mut points, 1, 0.0, 1.5, 2.0, 11); // gap 0.5 = 5 * scale
    let input = PatchPool::from_primitives([
        Primitive::line(vector![0.5, 0.0, 0.0], Vector3::x(), 0, 4),
        Primitive::line(vector![1.5, 0.0, 0.0], Vector3::x(), 1, 4),
    ]);
    let mut out = PatchPool::new();
    let r = merge(&mut out, &mut points, &input, &params(), &EndpointDistance).unwrap();
    assert!(r.aliases.is_empty());
    assert_eq!(r.kept, 2);
    assert_eq!(points.iter().filter(|p| p.gid() == 1).count(), 11);
}

#[test]
fn adjacency_multiplier_widens_the_gap() {
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 11);
    segment(&mut points, 1, 0.0, 1.5, 2.0, 11);
    let input = PatchPool::from_primitives([
        Primitive::line(vector![0.5, 0.0, 0.0], Vector3::x(), 0, 4),
        Primitive::line(vector![1.5, 0.0, 0.0], Vector3::x(), 1, 4),
    ]);
    let wide = MergeParams {
        adjacency_mult: 6.0,
        ..params()
    };
    let mut out = PatchPool::new();
    let r = merge(&mut out, &mut points, &input, &wide, &EndpointDistance).unwrap();
    assert_eq!(r.aliases.len(), 1);
}

#[test]
fn grown_extent_reaches_the_next_patch_in_one_call() {
    // 1 sits 0.09 off the axis: close to 0 but 0.3036 from 2. Once 1's
    // points belong to 0, the extent of 0 ends at x = 2 and 2 is 0.29 away.
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 11);
    segment(&mut points, 1, 0.09, 1.05, 2.0, 11);
    segment(&mut points, 2, 0.0, 2.29, 3.0, 8);
    let input = PatchPool::from_primitives([
        Primitive::line(vector![0.5, 0.0, 0.0], Vector3::x(), 0, 0),
        Primitive::line(vector![1.5, 0.09, 0.0], Vector3::x(), 1, 0),
        Primitive::line(vector![2.5, 0.0, 0.0], Vector3::x(), 2, 0),
    ]);

    let mut once = PatchPool::new();
    let first = merge(&mut once, &mut points, &input, &params(), &EndpointDistance).unwrap();
    assert_eq!(
        first.aliases,
        vec![
            (PrimKey::new(1, 0), PrimKey::new(0, 0)),
            (PrimKey::new(2, 0), PrimKey::new(0, 0)),
        ]
    );
    assert_eq!(first.rounds, 3);
    assert_eq!(first.rewritten_points, 19);
    assert_eq!(once.len(), 1);
    assert!(points.iter().all(|p| p.gid() == 0));

    let snapshot = points.clone();
    let mut twice = PatchPool::new();
    let second = merge(&mut twice, &mut points, &once, &params(), &EndpointDistance).unwrap();
    assert!(second.aliases.is_empty());
    assert_eq!(second.rounds, 1);
    assert_eq!(twice, once);
    assert_eq!(points, snapshot);
}
