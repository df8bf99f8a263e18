use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use patchwork::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;

mod io;
mod provenance;

use provenance::{write_sidecar, Sidecar, StageRecord};

#[derive(Parser)]
#[command(name = "patchwork")]
#[command(about = "Candidate generation, selection and patch consolidation")]
struct Cmd {
    /// Log per-stage detail (DEBUG level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    action: Action,
}

/// `--config` file plus per-field overrides; flags win over the file.
#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// JSON pipeline configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    scale: Option<f64>,
    #[arg(long, global = true)]
    angle_limit: Option<f64>,
    #[arg(long, global = true)]
    angle_limit_div: Option<f64>,
    /// Angle generators in degrees, comma separated
    #[arg(long, global = true, value_delimiter = ',')]
    angle_gens: Option<Vec<f64>>,
    #[arg(long, global = true)]
    patch_population_limit: Option<i64>,
    /// ignore | receive-similar | receive-all (or 0/1/2)
    #[arg(long, global = true)]
    small_mode: Option<SmallMode>,
    #[arg(long, global = true)]
    patch_dist_limit_mult: Option<f64>,
    #[arg(long, global = true)]
    parallel_limit: Option<f64>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                let raw = std::fs::read(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_slice(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => PipelineConfig::default(),
        };
        if let Some(v) = self.scale {
            cfg.scale = v;
        }
        if let Some(v) = self.angle_limit {
            cfg.angle_limit = v;
        }
        if let Some(v) = self.angle_limit_div {
            cfg.angle_limit_div = v;
        }
        if let Some(v) = &self.angle_gens {
            cfg.angle_gens = v.clone();
        }
        if let Some(v) = self.patch_population_limit {
            cfg.patch_population_limit = v;
        }
        if let Some(v) = self.small_mode {
            cfg.small_mode = v;
        }
        if let Some(v) = self.patch_dist_limit_mult {
            cfg.patch_dist_limit_mult = v;
        }
        if let Some(v) = self.parallel_limit {
            cfg.parallel_limit = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Points plus their patch associations.
#[derive(Args, Debug, Clone)]
struct CloudArgs {
    #[arg(long)]
    points: PathBuf,
    #[arg(long)]
    assoc: PathBuf,
}

impl CloudArgs {
    fn load(&self) -> Result<Vec<Point>> {
        let mut points = io::read_points(&self.points)?;
        io::apply_associations(&mut points, &self.assoc)?;
        Ok(points)
    }
}

#[derive(Subcommand)]
enum Action {
    /// Cross primitives into a candidate pool `candidates_it<N>.csv`
    Generate {
        #[command(flatten)]
        cloud: CloudArgs,
        #[arg(long)]
        prims: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Keep the candidates chosen by an external solver
    Select {
        #[arg(long)]
        candidates: PathBuf,
        /// Table with a column `x`, one row per candidate
        #[arg(long)]
        solution: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Merge adjacent parallel patches, optionally adopting orphans first
    Merge {
        #[command(flatten)]
        cloud: CloudArgs,
        #[arg(long)]
        prims: PathBuf,
        #[arg(long)]
        out_prims: PathBuf,
        #[arg(long)]
        out_assoc: PathBuf,
        /// Reassign points of patches without primitives before merging
        #[arg(long)]
        adopt: bool,
    },
    /// Print a JSON summary of a primitive table
    Report {
        #[arg(long)]
        prims: PathBuf,
        /// With `--assoc`, also report orphaned patches
        #[arg(long, requires = "assoc")]
        points: Option<PathBuf>,
        #[arg(long, requires = "points")]
        assoc: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    let level = if cmd.verbose { Level::DEBUG } else { Level::INFO };
    SubscriberBuilder::default()
        .with_target(false)
        .with_max_level(level)
        .init();
    run(cmd)
}

fn run(cmd: Cmd) -> Result<()> {
    let cfg = cmd.config.resolve()?;
    tracing::debug!(?cfg, "resolved configuration");
    match cmd.action {
        Action::Generate {
            cloud,
            prims,
            out_dir,
        } => generate_cmd(&cfg, &cloud, &prims, &out_dir).map(|_| ()),
        Action::Select {
            candidates,
            solution,
            out,
        } => select_cmd(&candidates, &solution, &out),
        Action::Merge {
            cloud,
            prims,
            out_prims,
            out_assoc,
            adopt,
        } => merge_cmd(&cfg, &cloud, &prims, &out_prims, &out_assoc, adopt),
        Action::Report {
            prims,
            points,
            assoc,
        } => {
            let cloud = points.zip(assoc).map(|(points, assoc)| CloudArgs { points, assoc });
            report(&prims, cloud.as_ref())
        }
    }
}

fn generate_cmd(cfg: &PipelineConfig, cloud: &CloudArgs, prims: &Path, out_dir: &Path) -> Result<PathBuf> {
    let points = cloud.load()?;
    let input = io::read_primitives(prims)?;
    let mut out = PatchPool::new();
    let report = generate(
        &mut out,
        &input,
        &points,
        cfg.scale,
        &cfg.angles(),
        &cfg.generate_params(),
        &DiscreteAngleMatcher,
    )?;

    let out_path = out_dir.join(format!("candidates_it{}.csv", io::next_iteration(prims)));
    io::write_primitives(&out, &out_path)?;
    let sidecar = Sidecar::new(StageRecord::Generate { report: &report })
        .config(cfg)
        .input(&cloud.points)
        .input(&cloud.assoc)
        .input(prims);
    write_sidecar(&out_path, &sidecar)?;
    tracing::info!(out = %out_path.display(), "wrote candidates");
    Ok(out_path)
}

fn select_cmd(candidates: &Path, solution: &Path, out: &Path) -> Result<()> {
    let pool = io::read_primitives(candidates)?;
    let x = io::read_solution(solution)?;
    let selected = select_from_solution(&pool, &x)?;
    io::write_primitives(&selected, out)?;
    let sidecar = Sidecar::new(StageRecord::Select {
        candidates: pool.len(),
        selected: selected.len(),
    })
    .input(candidates)
    .input(solution);
    write_sidecar(out, &sidecar)?;
    Ok(())
}

fn merge_cmd(
    cfg: &PipelineConfig,
    cloud: &CloudArgs,
    prims: &Path,
    out_prims: &Path,
    out_assoc: &Path,
    with_adopt: bool,
) -> Result<()> {
    let mut points = cloud.load()?;
    let input = io::read_primitives(prims)?;

    let adopted = if with_adopt {
        Some(adopt(&mut points, &input, cfg.scale, &OrthogonalDistance)?)
    } else {
        None
    };

    let mut out = PatchPool::new();
    let merged = merge(&mut out, &mut points, &input, &cfg.merge_params(), &EndpointDistance)?;

    io::write_primitives(&out, out_prims)?;
    io::write_associations(&points, out_assoc)?;
    let sidecar = Sidecar::new(StageRecord::Merge {
        adopt: adopted.as_ref(),
        merge: &merged,
    })
    .config(cfg)
    .input(&cloud.points)
    .input(&cloud.assoc)
    .input(prims);
    for artifact in [out_prims, out_assoc] {
        write_sidecar(artifact, &sidecar)?;
    }
    Ok(())
}

/// Summary printed by `report`.
#[derive(Serialize)]
struct PoolSummary {
    code_rev: String,
    input: String,
    patches: usize,
    primitives: usize,
    kinds: BTreeMap<&'static str, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orphans: Option<OrphanSummary>,
}

#[derive(Serialize)]
struct OrphanSummary {
    points: usize,
    orphan_points: usize,
    orphan_gids: Vec<Gid>,
}

fn report(prims: &Path, cloud: Option<&CloudArgs>) -> Result<()> {
    let pool = io::read_primitives(prims)?;
    let mut kinds = BTreeMap::new();
    for (_, p) in pool.iter() {
        *kinds.entry(p.kind.as_str()).or_default() += 1;
    }
    let orphans = match cloud {
        Some(cloud) => {
            let points = cloud.load()?;
            let (gids, pids) = orphan_gids(&points, &pool);
            Some(OrphanSummary {
                points: points.len(),
                orphan_points: pids.len(),
                orphan_gids: gids.into_iter().collect(),
            })
        }
        None => None,
    };
    let summary = PoolSummary {
        code_rev: provenance::current_git_rev(),
        input: prims.to_string_lossy().into_owned(),
        patches: pool.patch_count(),
        primitives: pool.len(),
        kinds,
        orphans,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
