//! YAML configuration for batch runs and control-surface queries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pf_batch::{AnalysisConstants, SweepRange};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub path: PathBuf,
    /// Kill an analysis that runs longer than this [s]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_s: Option<f64>,
}

impl SolverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_s.map(Duration::from_secs_f64)
    }
}

/// One batch of analyses and where its results are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub solver: SolverConfig,
    /// Store snapshot file
    pub store: PathBuf,
    pub subjects: Vec<String>,
    pub reynolds: SweepRange,
    pub alpha: SweepRange,
    #[serde(default)]
    pub constants: AnalysisConstants,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Parent of the per-batch working directories; the system temp dir if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

impl BatchConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.subjects.is_empty() {
            return Err(AppError::Config("no subjects listed".to_string()));
        }
        if let Some(blank) = self.subjects.iter().position(|s| s.trim().is_empty()) {
            return Err(AppError::Config(format!("subject #{} is blank", blank + 1)));
        }
        if let Some(t) = self.solver.timeout_s {
            if !(t.is_finite() && t > 0.0) {
                return Err(AppError::Config(format!(
                    "solver timeout must be positive, got {t}"
                )));
            }
        }
        if self.workers == Some(0) {
            return Err(AppError::Config("workers must be at least 1".to_string()));
        }
        self.reynolds
            .validate("reynolds")
            .and_then(|()| self.alpha.validate("alpha"))
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(())
    }

    /// Resolve relative paths against `base`.
    fn rebase(&mut self, base: &Path) {
        for path in [&mut self.solver.path, &mut self.store] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        if let Some(dir) = self.scratch_dir.as_mut().filter(|d| d.is_relative()) {
            *dir = base.join(&*dir);
        }
    }
}

/// One deflection state, naming its polars by canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeflectionStateDef {
    pub deflection: f64,
    #[serde(default)]
    pub pitch_offset: f64,
    pub curves: Vec<String>,
}

/// A control surface spanning two anchored deflection state sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSurfaceDef {
    pub pos_a: f64,
    pub pos_b: f64,
    pub side_a: Vec<DeflectionStateDef>,
    pub side_b: Vec<DeflectionStateDef>,
}

fn read(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load and validate a batch file. Relative paths inside it are taken
/// relative to the file's directory.
pub fn load_batch_config(path: &Path) -> AppResult<BatchConfig> {
    let mut config: BatchConfig = serde_yaml::from_str(&read(path)?)
        .map_err(|e| AppError::Config(format!("Failed to parse batch YAML: {e}")))?;
    config.validate()?;
    if let Some(base) = path.parent() {
        config.rebase(base);
    }
    Ok(config)
}

pub fn load_control_surface(path: &Path) -> AppResult<ControlSurfaceDef> {
    serde_yaml::from_str(&read(path)?)
        .map_err(|e| AppError::Config(format!("Failed to parse control surface YAML: {e}")))
}
