//! End-to-end scenarios over small hand-built scenes.

mod common;

use common::{dir_deg, segment};
use nalgebra::{vector, Vector3};
use patchwork::prelude::*;

fn merge_params() -> MergeParams {
    MergeParams {
        scale: 0.1,
        parallel_limit: 0.05,
        adjacency_mult: 3.0,
    }
}

fn x_line(x: f64, gid: Gid, dir_gid: Gid) -> Primitive {
    Primitive::line(vector![x, 0.0, 0.0], Vector3::x(), gid, dir_gid)
}

fn populations(small: usize, large: usize) -> Vec<Point> {
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, small);
    segment(&mut points, 1, 1.0, 0.0, 1.0, large);
    points
}

fn run_generate(input: &PatchPool, points: &[Point], mode: SmallMode) -> PatchPool {
    let params = GenerateParams {
        angle_limit: 0.08,
        angle_limit_div: 1.0,
        patch_population_limit: 5,
        small_mode: mode,
    };
    let angles = angle_set_from_generators(&[90.0]);
    let mut out = PatchPool::new();
    generate(&mut out, input, points, 0.05, &angles, &params, &DiscreteAngleMatcher).unwrap();
    out
}

fn dir_gids(pool: &PatchPool, gid: Gid) -> Vec<Gid> {
    pool.patch(gid).map(Primitive::dir_gid).collect()
}

#[test]
fn small_patch_gating_by_mode() {
    let points = populations(3, 10);

    // Orthogonal pair: admissible by angle.
    let ortho = PatchPool::from_primitives([
        Primitive::line(Vector3::zeros(), Vector3::x(), 0, 0),
        Primitive::line(Vector3::zeros(), Vector3::y(), 1, 1),
    ]);
    assert_eq!(run_generate(&ortho, &points, SmallMode::Ignore).len(), 2);
    let all = run_generate(&ortho, &points, SmallMode::ReceiveAll);
    assert_eq!(dir_gids(&all, 0), vec![0, 1]);
    assert_eq!(dir_gids(&all, 1), vec![1, 0]);
    assert_eq!(run_generate(&ortho, &points, SmallMode::ReceiveSimilar).len(), 4);

    // 40° pair: rejected by angle, only the small patch receives under ReceiveAll.
    let skew = PatchPool::from_primitives([
        Primitive::line(Vector3::zeros(), Vector3::x(), 0, 0),
        Primitive::line(Vector3::zeros(), dir_deg(40.0), 1, 1),
    ]);
    assert_eq!(run_generate(&skew, &points, SmallMode::Ignore).len(), 2);
    assert_eq!(run_generate(&skew, &points, SmallMode::ReceiveSimilar).len(), 2);
    let all = run_generate(&skew, &points, SmallMode::ReceiveAll);
    assert_eq!(dir_gids(&all, 0), vec![0, 1]);
    assert_eq!(dir_gids(&all, 1), vec![1]);
}

#[test]
fn half_scale_gap_merges_and_rewrites_points() {
    let params = MergeParams::default();
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 21);
    segment(&mut points, 1, 0.0, 1.0 + 0.5 * params.scale, 2.0, 21);
    let input = PatchPool::from_primitives([x_line(0.5, 0, 0), x_line(1.5, 1, 0)]);

    let mut out = PatchPool::new();
    let report = merge(&mut out, &mut points, &input, &params, &EndpointDistance).unwrap();
    assert_eq!(report.aliases, vec![(PrimKey::new(1, 0), PrimKey::new(0, 0))]);
    assert_eq!(report.rewritten_points, 21);
    assert_eq!(out.gids().collect::<Vec<_>>(), vec![0]);
    assert!(points.iter().all(|p| p.gid() == 0));
}

#[test]
fn aliases_resolve_transitively() {
    // 0 and 2 are not adjacent themselves; both reach 0 through 1.
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 11);
    segment(&mut points, 1, 0.0, 1.05, 2.0, 11);
    segment(&mut points, 2, 0.0, 2.05, 3.0, 11);
    let input = PatchPool::from_primitives([x_line(0.5, 0, 0), x_line(1.5, 1, 0), x_line(2.5, 2, 0)]);

    let mut out = PatchPool::new();
    let report = merge(&mut out, &mut points, &input, &merge_params(), &EndpointDistance).unwrap();
    assert_eq!(
        report.aliases,
        vec![
            (PrimKey::new(1, 0), PrimKey::new(0, 0)),
            (PrimKey::new(2, 0), PrimKey::new(0, 0)),
        ]
    );
    assert_eq!(out.len(), 1);
    assert!(points.iter().all(|p| p.gid() == 0));
}

#[test]
fn merging_twice_changes_nothing() {
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 11);
    segment(&mut points, 1, 0.0, 1.05, 2.0, 11);
    segment(&mut points, 2, 0.0, 2.05, 3.0, 11);
    segment(&mut points, 3, 0.0, 5.0, 6.0, 11);
    for k in 0..11 {
        let pid = points.len() as i32;
        points.push(Point::new(vector![0.5, 0.5 + 0.1 * k as f64, 0.0], 4, pid));
    }
    let input = PatchPool::from_primitives([
        x_line(0.5, 0, 0),
        x_line(1.5, 1, 0),
        x_line(2.5, 2, 0),
        x_line(5.5, 3, 0),
        Primitive::line(vector![0.5, 1.0, 0.0], Vector3::y(), 4, 1),
    ]);

    let mut once = PatchPool::new();
    let first = merge(&mut once, &mut points, &input, &merge_params(), &EndpointDistance).unwrap();
    assert_eq!(first.aliases.len(), 2);
    assert_eq!(once.gids().collect::<Vec<_>>(), vec![0, 3, 4]);

    let snapshot = points.clone();
    let mut twice = PatchPool::new();
    let second = merge(&mut twice, &mut points, &once, &merge_params(), &EndpointDistance).unwrap();
    assert!(second.aliases.is_empty());
    assert_eq!(second.rewritten_points, 0);
    assert_eq!(twice, once);
    assert_eq!(points, snapshot);
}

/// Picks a fixed subset, standing in for the external solver.
struct Fixed(Vec<f64>);

impl MiqpSolver for Fixed {
    fn solve(&mut self, _problem: &QpProblem) -> Result<Vec<f64>, Error> {
        Ok(self.0.clone())
    }
}

#[test]
fn one_iteration_end_to_end() {
    let scale = 0.1;
    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 11);
    segment(&mut points, 1, 0.0, 1.05, 2.0, 11);
    segment(&mut points, 2, 0.0, 2.05, 2.5, 5);
    // Patch 2 is small and was fitted with a wrong direction class.
    let input = PatchPool::from_primitives([
        x_line(0.5, 0, 0),
        x_line(1.5, 1, 0),
        Primitive::line(vector![2.3, 0.0, 0.0], dir_deg(40.0), 2, 1),
    ]);

    let cfg = PipelineConfig {
        scale,
        angle_limit: 0.08,
        angle_limit_div: 1.0,
        patch_population_limit: 10,
        small_mode: SmallMode::ReceiveAll,
        parallel_limit: 0.05,
        ..PipelineConfig::default()
    };
    cfg.validate().unwrap();

    let run = || -> Result<(PatchPool, AdoptReport, MergeReport, Vec<Point>), Error> {
        let mut points = points.clone();
        let mut candidates = PatchPool::new();
        let generated = generate(
            &mut candidates,
            &input,
            &points,
            cfg.scale,
            &cfg.angles(),
            &cfg.generate_params(),
            &DiscreteAngleMatcher,
        )?;
        assert_eq!(generated.candidates, 1);
        assert_eq!(dir_gids(&candidates, 2), vec![1, 0]);

        // Pool order: (0,0) (1,0) (2,0) (2,1). Drop patch 1 and the bad fit.
        let problem = QpProblem::new(candidates.len());
        let selected = solve_and_select(&mut Fixed(vec![1.0, 0.0, 0.0, 1.0]), &problem, &candidates)?;
        let adopted = adopt(&mut points, &selected, cfg.scale, &OrthogonalDistance)?;

        let mut merged = PatchPool::new();
        let report = merge(&mut merged, &mut points, &selected, &cfg.merge_params(), &EndpointDistance)?;
        Ok((merged, adopted, report, points))
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .finish();
    let (merged, adopted, report, points) = tracing::subscriber::with_default(subscriber, run).unwrap();

    assert_eq!(adopted.orphaned, 11);
    assert!(adopted.remaining.is_empty());
    assert_eq!(report.aliases, vec![(PrimKey::new(2, 0), PrimKey::new(0, 0))]);
    assert_eq!(merged.len(), 1);
    assert!(points.iter().all(|p| p.gid() == 0));
}

#[test]
fn config_file_drives_the_stages() {
    let cfg: PipelineConfig =
        serde_json::from_str(r#"{ "scale": 0.1, "patch_dist_limit_mult": 6.0, "small_mode": "ignore" }"#)
            .unwrap();
    assert_eq!(cfg.merge_params().adjacency_mult, 6.0);
    assert_eq!(cfg.generate_params().small_mode, SmallMode::Ignore);

    let mut points = Vec::new();
    segment(&mut points, 0, 0.0, 0.0, 1.0, 11);
    segment(&mut points, 1, 0.0, 1.5, 2.0, 11);
    let input = PatchPool::from_primitives([x_line(0.5, 0, 0), x_line(1.5, 1, 0)]);
    let mut out = PatchPool::new();
    let report = merge(&mut out, &mut points, &input, &cfg.merge_params(), &EndpointDistance).unwrap();
    assert_eq!(report.aliases.len(), 1);
}
