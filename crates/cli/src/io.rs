//! Table I/O for points, associations, primitives and solver solutions.
//!
//! Files are read through polars (`.csv` with a header row, or `.parquet`) and
//! written back in the same format chosen by extension.
//!
//! Formats
//! - points: `x,y[,z]`, row index = PID.
//! - associations: `pid,gid,dir_gid`, plus any further integer columns,
//!   which ride along on the point tags and are written back unchanged.
//! - primitives: `gid,dir_gid,kind,px,py,pz,dx,dy,dz`, `kind` in line|plane.
//! - solution: `x`, one row per candidate in pool iteration order.

use anyhow::{bail, Context, Result};
use patchwork::prelude::*;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;

fn is_parquet(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("parquet")
}

pub fn read_frame(path: &Path) -> Result<DataFrame> {
    let lf = if is_parquet(path) {
        LazyFrame::scan_parquet(path, ScanArgsParquet::default())
    } else {
        LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .finish()
    }
    .with_context(|| format!("opening {}", path.display()))?;
    let df = lf
        .collect()
        .with_context(|| format!("reading {}", path.display()))?;
    tracing::debug!(path = %path.display(), rows = df.height(), cols = df.width(), "read table");
    Ok(df)
}

pub fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    if is_parquet(path) {
        ParquetWriter::new(file).finish(df)?;
    } else {
        CsvWriter::new(file).include_header(true).finish(df)?;
    }
    tracing::debug!(path = %path.display(), rows = df.height(), "wrote table");
    Ok(())
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let s = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::Float64)?;
    s.f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.with_context(|| format!("null in column '{name}' at row {row}")))
        .collect()
}

fn i64_column(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let s = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::Int64)?;
    s.i64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.with_context(|| format!("null in column '{name}' at row {row}")))
        .collect()
}

fn gid_column(df: &DataFrame, name: &str) -> Result<Vec<Gid>> {
    i64_column(df, name)?
        .into_iter()
        .map(|v| Gid::try_from(v).with_context(|| format!("'{name}' value {v} out of range")))
        .collect()
}

/// Points with GID unset; PID = row index. A missing `z` column means 2D data.
pub fn read_points(path: &Path) -> Result<Vec<Point>> {
    let df = read_frame(path)?;
    let xs = f64_column(&df, "x")?;
    let ys = f64_column(&df, "y")?;
    let zs = if df.column("z").is_ok() {
        f64_column(&df, "z")?
    } else {
        vec![0.0; xs.len()]
    };
    let points = xs
        .into_iter()
        .zip(ys)
        .zip(zs)
        .enumerate()
        .map(|(pid, ((x, y), z))| Point::new(Vec3::new(x, y, z), UNSET, pid as i32))
        .collect::<Vec<_>>();
    tracing::info!(points = points.len(), "loaded points");
    Ok(points)
}

const ASSOC_COLUMNS: [&str; 3] = ["pid", "gid", "dir_gid"];

/// Apply `pid,gid,dir_gid` rows to `points`. Other columns are stored as
/// extra tags under their column name.
pub fn apply_associations(points: &mut [Point], path: &Path) -> Result<()> {
    let df = read_frame(path)?;
    let pids = i64_column(&df, "pid")?;
    let gids = gid_column(&df, "gid")?;
    let dir_gids = gid_column(&df, "dir_gid")?;
    let extras = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !ASSOC_COLUMNS.contains(&name.as_str()))
        .map(|name| gid_column(&df, &name).map(|values| (name, values)))
        .collect::<Result<Vec<_>>>()?;

    for (row, ((pid, gid), dir_gid)) in pids.into_iter().zip(gids).zip(dir_gids).enumerate() {
        let Some(p) = usize::try_from(pid).ok().and_then(|i| points.get_mut(i)) else {
            bail!("association for pid {pid} but only {} points", points.len());
        };
        p.tags.gid = gid;
        p.tags.dir_gid = dir_gid;
        for (name, values) in &extras {
            p.tags.set_extra(name.as_str(), values[row]);
        }
    }
    if !extras.is_empty() {
        tracing::debug!(columns = extras.len(), "carrying extra association columns");
    }
    Ok(())
}

/// Writes `pid,gid,dir_gid` and one column per extra tag found on any point.
pub fn write_associations(points: &[Point], path: &Path) -> Result<()> {
    let pid: Vec<i64> = (0..points.len() as i64).collect();
    let gid: Vec<Gid> = points.iter().map(|p| p.tags.gid).collect();
    let dir_gid: Vec<Gid> = points.iter().map(|p| p.tags.dir_gid).collect();
    let mut df = df!("pid" => pid, "gid" => gid, "dir_gid" => dir_gid)?;

    let names: BTreeSet<&str> = points.iter().flat_map(|p| p.tags.extras().map(|(k, _)| k)).collect();
    for name in names {
        let values: Vec<Gid> = points.iter().map(|p| p.tags.extra(name)).collect();
        df.with_column(Series::new(name.into(), values))?;
    }
    write_frame(&mut df, path)
}

pub fn read_primitives(path: &Path) -> Result<PatchPool> {
    let df = read_frame(path)?;
    let gids = gid_column(&df, "gid")?;
    let dir_gids = gid_column(&df, "dir_gid")?;
    let kinds = df
        .column("kind")
        .context("missing column 'kind'")?
        .cast(&DataType::String)?;
    let kinds = kinds.str()?;
    let [px, py, pz, dx, dy, dz] = ["px", "py", "pz", "dx", "dy", "dz"].map(|c| f64_column(&df, c));
    let (px, py, pz, dx, dy, dz) = (px?, py?, pz?, dx?, dy?, dz?);

    let mut pool = PatchPool::new();
    for (row, kind) in kinds.into_iter().enumerate() {
        let kind = kind
            .and_then(PrimitiveKind::parse)
            .with_context(|| format!("row {row}: kind must be 'line' or 'plane'"))?;
        let dir = Vec3::new(dx[row], dy[row], dz[row]);
        if dir.norm() < 1e-12 {
            bail!("row {row}: zero direction");
        }
        let pos = Vec3::new(px[row], py[row], pz[row]);
        pool.push(Primitive::new(kind, pos, dir, Tags::new(gids[row], dir_gids[row])));
    }
    tracing::info!(primitives = pool.len(), patches = pool.patch_count(), "loaded primitives");
    Ok(pool)
}

pub fn primitives_frame(pool: &PatchPool) -> Result<DataFrame> {
    let n = pool.len();
    let (mut gid, mut dir_gid, mut kind) = (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
    let [mut px, mut py, mut pz, mut dx, mut dy, mut dz] = std::array::from_fn(|_| Vec::with_capacity(n));
    for (key, p) in pool.iter() {
        gid.push(key.gid);
        dir_gid.push(p.dir_gid());
        kind.push(p.kind.as_str());
        px.push(p.pos.x);
        py.push(p.pos.y);
        pz.push(p.pos.z);
        dx.push(p.dir.x);
        dy.push(p.dir.y);
        dz.push(p.dir.z);
    }
    Ok(df!(
        "gid" => gid,
        "dir_gid" => dir_gid,
        "kind" => kind,
        "px" => px,
        "py" => py,
        "pz" => pz,
        "dx" => dx,
        "dy" => dy,
        "dz" => dz
    )?)
}

pub fn write_primitives(pool: &PatchPool, path: &Path) -> Result<()> {
    let mut df = primitives_frame(pool)?;
    write_frame(&mut df, path)
}

pub fn read_solution(path: &Path) -> Result<Vec<f64>> {
    f64_column(&read_frame(path)?, "x")
}

/// Iteration number for outputs derived from `input`: `..._it<k>...` gives
/// `k + 1`, anything else gives 1.
pub fn next_iteration(input: &Path) -> u32 {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.rmatch_indices("_it")
        .find_map(|(at, _)| {
            let digits: String = stem[at + 3..].chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        })
        .map_or(1, |k| k + 1)
}
