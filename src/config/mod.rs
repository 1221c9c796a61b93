use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::native::NativeEngineConfig;

/// Lowest accepted curvature sensitivity
pub const SENSITIVITY_MIN: f64 = 0.1;
/// Highest accepted curvature sensitivity
pub const SENSITIVITY_MAX: f64 = 1.0;

/// Output density tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Low poly proxy (about 5k faces)
    Draft,
    /// Game ready (about 15k faces)
    #[default]
    Mid,
    /// Production / hero asset (about 50k faces)
    High,
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QualityTier::Draft => "draft",
            QualityTier::Mid => "mid",
            QualityTier::High => "high",
        };
        f.write_str(name)
    }
}

/// User options for one pipeline invocation.
///
/// Passed by value; nothing derived from it outlives the run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub quality: QualityTier,
    /// Derive the face budget from object size instead of a fixed count
    pub smart_budget: bool,
    /// Mark sharp edges as solver hints before solving
    pub detect_curvature: bool,
    /// 0.1 (only near right angles) to 1.0 (anything over 15°)
    pub curvature_sensitivity: f64,
    /// Relax and re-project after solving
    pub flow_polish: bool,
    /// Solver seed; `None` derives one from the clock so reruns vary
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityTier::Mid,
            smart_budget: true,
            detect_curvature: true,
            curvature_sensitivity: 0.5,
            flow_polish: true,
            seed: None,
        }
    }
}

impl Settings {
    /// Sensitivity forced into the accepted range (NaN falls back to the default)
    pub fn clamped_sensitivity(&self) -> f64 {
        clamp_sensitivity(self.curvature_sensitivity)
    }
}

pub fn clamp_sensitivity(sensitivity: f64) -> f64 {
    if sensitivity.is_nan() {
        return Settings::default().curvature_sensitivity;
    }
    sensitivity.clamp(SENSITIVITY_MIN, SENSITIVITY_MAX)
}

fn default_verbose() -> bool {
    false
}

/// Contents of a `quadify.toml` file
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub report: Option<PathBuf>,
    #[serde(default)]
    pub quality: Option<QualityTier>,
    #[serde(default)]
    pub smart_budget: Option<bool>,
    #[serde(default)]
    pub detect_curvature: Option<bool>,
    #[serde(default)]
    pub curvature_sensitivity: Option<f64>,
    #[serde(default)]
    pub flow_polish: Option<bool>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    #[serde(default)]
    pub engine: Option<NativeEngineConfig>,
}

impl FileConfig {
    pub fn load() -> Option<Self> {
        let config_paths = get_config_paths();

        for path in config_paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }

    /// Settings from this file, with defaults for anything not given
    pub fn settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            quality: self.quality.unwrap_or(defaults.quality),
            smart_budget: self.smart_budget.unwrap_or(defaults.smart_budget),
            detect_curvature: self.detect_curvature.unwrap_or(defaults.detect_curvature),
            curvature_sensitivity: self
                .curvature_sensitivity
                .unwrap_or(defaults.curvature_sensitivity),
            flow_polish: self.flow_polish.unwrap_or(defaults.flow_polish),
            seed: self.seed.or(defaults.seed),
        }
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("quadify.toml"));
    paths.push(PathBuf::from(".quadify.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("quadify").join("config.toml"));
        paths.push(config_dir.join("quadify.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".quadify.toml"));
        paths.push(home.join(".config").join("quadify").join("config.toml"));
    }

    paths
}
