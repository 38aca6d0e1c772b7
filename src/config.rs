use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::physics::math::Scalar;
use crate::physics::octree::{
    DEFAULT_LEAF_THRESHOLD, DEFAULT_MAX_DEPTH, DEFAULT_STATISTICS_PARALLEL_DEPTH, DEFAULT_THETA,
    OctreeError, validate_theta,
};

const CONFIG_FILE_NAME: &str = "config.toml";
const ENVIRONMENT_PREFIX: &str = "OCTOFORCE";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub octree: OctreeConfig,
    pub simulation: SimulationParams,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct OctreeConfig {
    /// Points a leaf may hold before it splits.
    pub leaf_threshold: usize,
    /// Barnes-Hut opening angle.
    pub theta: Scalar,
    /// Leaves at this depth never split.
    pub max_depth: usize,
    /// Tree levels whose children are aggregated in parallel.
    pub statistics_parallel_depth: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            leaf_threshold: DEFAULT_LEAF_THRESHOLD,
            theta: DEFAULT_THETA,
            max_depth: DEFAULT_MAX_DEPTH,
            statistics_parallel_depth: DEFAULT_STATISTICS_PARALLEL_DEPTH,
        }
    }
}

impl OctreeConfig {
    pub fn validate(&self) -> Result<(), OctreeError> {
        if self.leaf_threshold == 0 {
            return Err(OctreeError::InvalidThreshold(self.leaf_threshold));
        }
        if self.max_depth == 0 {
            return Err(OctreeError::InvalidMaxDepth(self.max_depth));
        }
        validate_theta(self.theta)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PointDistribution {
    /// Uniform inside a ball.
    #[default]
    Ball,
    /// Uniform inside a flat disk in the `z = 1` plane.
    Disk,
    /// Uniform on the surface of a sphere.
    Shell,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimulationParams {
    pub body_count: usize,
    pub iterations: usize,
    pub initial_seed: Option<u64>,
    pub distribution: PointDistribution,
    /// Radius multiplier applied to `cbrt(body_count)`.
    pub radius_multiplier: Scalar,
    /// Weights are drawn as `exp(U(0, max_log_weight))`.
    pub max_log_weight: Scalar,
    pub time_step: Scalar,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            body_count: 1000,
            iterations: 10,
            initial_seed: None,
            distribution: PointDistribution::Ball,
            radius_multiplier: 40.0,
            max_log_weight: 6.0,
            time_step: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a file, falling back to defaults if the file doesn't exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => {
                info!("Config file {} not found. Using defaults.", path.display());
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "octoforce").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Defaults, overlaid by the user config file (if any), overlaid by
    /// `OCTOFORCE__SECTION__KEY` environment variables.
    pub fn load_from_user_config() -> Self {
        let path = Self::user_config_path();
        match Self::load_layered(path.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load user configuration: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn load_layered(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder
            .add_source(
                ::config::Environment::with_prefix(ENVIRONMENT_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
