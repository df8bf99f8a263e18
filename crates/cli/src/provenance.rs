//! Provenance sidecars for every table the CLI writes.
//!
//! `<artifact>.provenance.json` records the code revision, the call site, the
//! resolved pipeline configuration, the input tables and the report of the
//! stage that produced the artifact, so a candidate or merge table can be
//! traced back to the run that made it.

use anyhow::{Context, Result};
use patchwork::prelude::*;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Command;

/// What a stage reports about its run; `stage` names the variant in JSON.
#[derive(Debug, Serialize)]
#[serde(tag = "stage", rename_all = "kebab-case")]
pub enum StageRecord<'a> {
    Generate {
        report: &'a GenerateReport,
    },
    Select {
        candidates: usize,
        selected: usize,
    },
    Merge {
        adopt: Option<&'a AdoptReport>,
        merge: &'a MergeReport,
    },
}

/// Everything a sidecar says about one run besides where it was written.
#[derive(Debug)]
pub struct Sidecar<'a> {
    config: Option<&'a PipelineConfig>,
    inputs: Vec<String>,
    record: StageRecord<'a>,
}

impl<'a> Sidecar<'a> {
    pub fn new(record: StageRecord<'a>) -> Self {
        Self {
            config: None,
            inputs: Vec::new(),
            record,
        }
    }

    pub fn config(mut self, cfg: &'a PipelineConfig) -> Self {
        self.config = Some(cfg);
        self
    }

    pub fn input<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inputs.push(path.as_ref().to_string_lossy().into_owned());
        self
    }
}

#[derive(Serialize)]
struct Callsite {
    file: &'static str,
    line: u32,
}

#[derive(Serialize)]
struct Document<'s, 'a> {
    code_rev: String,
    callsite: Callsite,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<&'a PipelineConfig>,
    inputs: &'s [String],
    outputs: [String; 1],
    #[serde(flatten)]
    record: &'s StageRecord<'a>,
}

/// Write `<artifact>.provenance.json` next to `artifact`.
#[track_caller]
pub fn write_sidecar<P: AsRef<Path>>(artifact: P, sidecar: &Sidecar<'_>) -> Result<PathBuf> {
    let artifact = artifact.as_ref();
    let provenance_path = provenance_path(artifact);
    if let Some(parent) = provenance_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating provenance dir {}", parent.display()))?;
        }
    }

    let caller = Location::caller();
    let doc = Document {
        code_rev: current_git_rev(),
        callsite: Callsite {
            file: caller.file(),
            line: caller.line(),
        },
        config: sidecar.config,
        inputs: &sidecar.inputs,
        outputs: [artifact.to_string_lossy().into_owned()],
        record: &sidecar.record,
    };
    fs::write(&provenance_path, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {}", provenance_path.display()))?;
    Ok(provenance_path)
}

fn provenance_path(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".provenance.json");
    artifact.with_file_name(name)
}

/// `GIT_COMMIT` (build time, then run time), else `HEAD` of the checkout this
/// binary was built from, else `"unknown"`.
pub fn current_git_rev() -> String {
    if let Some(rev) = option_env!("GIT_COMMIT").filter(|s| !s.is_empty()) {
        return rev.to_string();
    }
    if let Some(rev) = std::env::var("GIT_COMMIT").ok().filter(|s| !s.is_empty()) {
        return rev;
    }
    Command::new("git")
        .args(["-C", env!("CARGO_MANIFEST_DIR"), "rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
