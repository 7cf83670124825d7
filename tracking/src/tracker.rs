use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Result, TrackingError};

/// Identity of a tracked run, as handed out by `Tracker::start_run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    /// Root location of the run's artifacts.
    pub artifact_uri: String,
}

impl RunInfo {
    /// The `runs:/` URI of an artifact directory logged under this run.
    pub fn model_uri(&self, artifact_path: &str) -> String {
        format!("runs:/{}/{}", self.run_id, artifact_path)
    }

    /// The storage location of an artifact directory logged under this run.
    pub fn artifact_location(&self, artifact_path: &str) -> String {
        format!(
            "{}/{}",
            self.artifact_uri.trim_end_matches('/'),
            artifact_path.trim_matches('/')
        )
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Finished,
    Failed,
    Killed,
}

/// Lifecycle stage of a registered model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    None,
    Staging,
    Production,
    Archived,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::None => "None",
            Stage::Staging => "Staging",
            Stage::Production => "Production",
            Stage::Archived => "Archived",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self> {
        // The registry compares stages case-insensitively.
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Stage::None),
            "staging" => Ok(Stage::Staging),
            "production" => Ok(Stage::Production),
            "archived" => Ok(Stage::Archived),
            _ => Err(TrackingError::Protocol(format!("unknown stage: {s}"))),
        }
    }
}

/// A registered model version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    pub stage: Stage,
    pub run_id: Option<String>,
    pub source: String,
}

/// A single file logged under an artifact directory of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Artifact directory relative to the run root, e.g. `model`.
    pub path: String,
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<String>, file_name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            contents,
        }
    }
}

/// Narrow interface over an experiment tracker and its model registry.
///
/// Every call is synchronous: it returns once the service acknowledged it.
/// Implementations never retry; the first failure is returned to the caller.
pub trait Tracker {
    /// Opens a new run under `experiment`, creating the experiment if needed.
    fn start_run(&mut self, experiment: &str) -> Result<RunInfo>;

    /// Sets string tags on the run. Existing keys are overwritten.
    fn set_tags(&mut self, run: &RunInfo, tags: &[(&str, String)]) -> Result<()>;

    /// Logs an immutable run parameter.
    fn log_param(&mut self, run: &RunInfo, key: &str, value: &str) -> Result<()>;

    /// Logs a metric value at step 0.
    fn log_metric(&mut self, run: &RunInfo, key: &str, value: f64) -> Result<()>;

    /// Uploads a file under the run's artifact root.
    fn log_artifact(&mut self, run: &RunInfo, artifact: &Artifact) -> Result<()>;

    /// Registers `runs:/<run_id>/<artifact_path>` under `model_name`, then moves
    /// the new version to `stage`, archiving the versions previously in that stage.
    ///
    /// # Returns
    /// The promoted version as reported by the registry.
    fn register_and_promote(
        &mut self,
        run: &RunInfo,
        artifact_path: &str,
        model_name: &str,
        stage: Stage,
    ) -> Result<ModelVersion>;

    /// Marks the run as terminated.
    fn end_run(&mut self, run: &RunInfo, status: RunStatus) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_parses_case_insensitively() {
        assert_eq!("production".parse::<Stage>().unwrap(), Stage::Production);
        assert_eq!("None".parse::<Stage>().unwrap(), Stage::None);
        assert!("live".parse::<Stage>().is_err());
    }

    #[test]
    fn run_uris() {
        let run = RunInfo {
            run_id: "abc".into(),
            experiment_id: "1".into(),
            artifact_uri: "mlflow-artifacts:/1/abc/artifacts/".into(),
        };
        assert_eq!(run.model_uri("model"), "runs:/abc/model");
        assert_eq!(
            run.artifact_location("model"),
            "mlflow-artifacts:/1/abc/artifacts/model"
        );
    }
}
