//! Parameters of candidate generation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How patches below the population limit take part in generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "SmallModeRepr")]
pub enum SmallMode {
    /// Small patches neither receive nor donate directions.
    Ignore,
    /// Only the angle gate applies.
    #[default]
    ReceiveSimilar,
    /// Small patches receive every direction, similar or not.
    ReceiveAll,
}

impl SmallMode {
    /// Integer encoding used by older configs: 0 ignore, 1 receive-similar, 2 receive-all.
    pub fn from_index(i: i64) -> Option<Self> {
        match i {
            0 => Some(Self::Ignore),
            1 => Some(Self::ReceiveSimilar),
            2 => Some(Self::ReceiveAll),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::ReceiveSimilar => "receive-similar",
            Self::ReceiveAll => "receive-all",
        }
    }
}

/// Config files may name the mode or give its index.
#[derive(Deserialize)]
#[serde(untagged)]
enum SmallModeRepr {
    Index(i64),
    Name(String),
}

impl TryFrom<SmallModeRepr> for SmallMode {
    type Error = String;

    fn try_from(repr: SmallModeRepr) -> Result<Self, Self::Error> {
        match repr {
            SmallModeRepr::Index(i) => {
                Self::from_index(i).ok_or_else(|| format!("small mode index {i} not in 0..=2"))
            }
            SmallModeRepr::Name(name) => name.parse(),
        }
    }
}

impl fmt::Display for SmallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SmallMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase().replace('_', "-");
        if let Ok(i) = s.parse::<i64>() {
            return Self::from_index(i).ok_or_else(|| format!("small mode index {i} not in 0..=2"));
        }
        match s.as_str() {
            "ignore" => Ok(Self::Ignore),
            "receive-similar" => Ok(Self::ReceiveSimilar),
            "receive-all" => Ok(Self::ReceiveAll),
            other => Err(format!(
                "unknown small mode '{other}' (ignore | receive-similar | receive-all)"
            )),
        }
    }
}

/// Gating parameters for [`super::generate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateParams {
    /// Angular gate numerator (radians).
    pub angle_limit: f64,
    /// Angular gate divisor; the effective gate is `angle_limit / angle_limit_div`.
    pub angle_limit_div: f64,
    /// Patches with fewer points are "small". Must be non-negative.
    pub patch_population_limit: i64,
    pub small_mode: SmallMode,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            angle_limit: 0.08,
            angle_limit_div: 10.0,
            patch_population_limit: 10,
            small_mode: SmallMode::ReceiveSimilar,
        }
    }
}

impl GenerateParams {
    /// Effective angular gate in radians.
    #[inline]
    pub fn effective_angle_limit(&self) -> f64 {
        self.angle_limit / self.angle_limit_div
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.patch_population_limit < 0 {
            return Err(Error::invalid(
                "patch_population_limit must be >= 0 (population filtering is mandatory)",
            ));
        }
        if !(self.angle_limit_div.is_finite() && self.angle_limit_div > 0.0) {
            return Err(Error::invalid("angle_limit_div must be positive"));
        }
        if !self.angle_limit.is_finite() {
            return Err(Error::invalid("angle_limit must be finite"));
        }
        Ok(())
    }
}
