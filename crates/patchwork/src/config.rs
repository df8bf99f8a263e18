//! Flat pipeline configuration as read from a JSON file.
//!
//! One struct covers every stage so a run can be described by a single file;
//! the stage parameter structs are derived from it.

use serde::{Deserialize, Serialize};

use crate::candidates::{GenerateParams, SmallMode};
use crate::error::Error;
use crate::geom::angle_set_from_generators;
use crate::merge::MergeParams;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Inlier distance shared by all stages.
    pub scale: f64,
    /// Angular gate numerator (radians).
    pub angle_limit: f64,
    pub angle_limit_div: f64,
    /// Angle generators in degrees, see [`angle_set_from_generators`].
    pub angle_gens: Vec<f64>,
    pub patch_population_limit: i64,
    pub small_mode: SmallMode,
    /// Merge adjacency threshold in units of `scale`.
    pub patch_dist_limit_mult: f64,
    /// Maximum angle (radians) between merged directions.
    pub parallel_limit: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let generate = GenerateParams::default();
        let merge = MergeParams::default();
        Self {
            scale: merge.scale,
            angle_limit: generate.angle_limit,
            angle_limit_div: generate.angle_limit_div,
            angle_gens: vec![90.0],
            patch_population_limit: generate.patch_population_limit,
            small_mode: generate.small_mode,
            patch_dist_limit_mult: merge.adjacency_mult,
            parallel_limit: merge.parallel_limit,
        }
    }
}

impl PipelineConfig {
    pub fn generate_params(&self) -> GenerateParams {
        GenerateParams {
            angle_limit: self.angle_limit,
            angle_limit_div: self.angle_limit_div,
            patch_population_limit: self.patch_population_limit,
            small_mode: self.small_mode,
        }
    }

    pub fn merge_params(&self) -> MergeParams {
        MergeParams {
            scale: self.scale,
            parallel_limit: self.parallel_limit,
            adjacency_mult: self.patch_dist_limit_mult,
        }
    }

    /// Discrete angle set in radians.
    pub fn angles(&self) -> Vec<f64> {
        angle_set_from_generators(&self.angle_gens)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::invalid("scale must be positive"));
        }
        self.generate_params().validate()?;
        self.merge_params().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stage_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.generate_params(), GenerateParams::default());
        assert_eq!(cfg.merge_params(), MergeParams::default());
        assert!(cfg.validate().is_ok());
        // 90° generator: {0, π/2, π}.
        assert_eq!(cfg.angles().len(), 3);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{ "scale": 0.2, "angle_gens": [45.0], "small_mode": "receive-all" }"#,
        )
        .unwrap();
        assert_eq!(cfg.scale, 0.2);
        assert_eq!(cfg.small_mode, SmallMode::ReceiveAll);
        assert_eq!(cfg.patch_population_limit, 10);
        assert_eq!(cfg.merge_params().scale, 0.2);
        assert_eq!(cfg.angles().len(), 5);

        let cfg: PipelineConfig = serde_json::from_str(r#"{ "small_mode": 0 }"#).unwrap();
        assert_eq!(cfg.small_mode, SmallMode::Ignore);
        assert!(serde_json::from_str::<PipelineConfig>(r#"{ "small_mode": 3 }"#).is_err());
        assert!(serde_json::from_str::<PipelineConfig>(r#"{ "small_mode": "never" }"#).is_err());
    }

    #[test]
    fn validate_rejects_negative_population_limit() {
        let cfg = PipelineConfig {
            patch_population_limit: -1,
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidParams { .. })));
    }
}
