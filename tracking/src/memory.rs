use std::collections::BTreeMap;

use crate::{
    Result, TrackingError,
    tracker::{Artifact, ModelVersion, RunInfo, RunStatus, Stage, Tracker},
};

/// Everything logged under one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedRun {
    pub experiment: String,
    pub tags: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<Artifact>,
    pub status: Option<RunStatus>,
}

/// A tracker that keeps runs and the model registry in memory.
///
/// Registry semantics follow the remote service: versions are numbered from 1
/// per model name, and promoting with archiving moves every other version in
/// the target stage to `Archived`.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    experiments: BTreeMap<String, String>,
    runs: BTreeMap<String, RecordedRun>,
    registry: BTreeMap<String, Vec<ModelVersion>>,
    fail_on: Option<&'static str>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the named operation (e.g. `"log_metric"`) fail from now on.
    pub fn fail_on(&mut self, operation: &'static str) {
        self.fail_on = Some(operation);
    }

    pub fn run(&self, run_id: &str) -> Option<&RecordedRun> {
        self.runs.get(run_id)
    }

    pub fn runs(&self) -> impl Iterator<Item = (&String, &RecordedRun)> {
        self.runs.iter()
    }

    /// All versions registered under `name`, oldest first.
    pub fn versions(&self, name: &str) -> &[ModelVersion] {
        self.registry.get(name).map_or(&[][..], Vec::as_slice)
    }

    /// Newest version of `name` in each of `stages`.
    pub fn latest_versions(&self, name: &str, stages: &[Stage]) -> Vec<ModelVersion> {
        stages
            .iter()
            .filter_map(|stage| {
                self.versions(name)
                    .iter()
                    .rev()
                    .find(|v| v.stage == *stage)
                    .cloned()
            })
            .collect()
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.fail_on == Some(operation) {
            return Err(TrackingError::Api {
                endpoint: operation.to_string(),
                status: 503,
                code: Some("TEMPORARILY_UNAVAILABLE".into()),
                message: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn recorded(&mut self, run: &RunInfo) -> Result<&mut RecordedRun> {
        self.runs
            .get_mut(&run.run_id)
            .ok_or_else(|| TrackingError::Protocol(format!("unknown run {}", run.run_id)))
    }
}

impl Tracker for InMemoryTracker {
    fn start_run(&mut self, experiment: &str) -> Result<RunInfo> {
        self.check("start_run")?;

        let next_id = self.experiments.len().to_string();
        let experiment_id = self
            .experiments
            .entry(experiment.to_string())
            .or_insert(next_id)
            .clone();

        let run_id = format!("run-{:04}", self.runs.len());
        self.runs.insert(
            run_id.clone(),
            RecordedRun {
                experiment: experiment.to_string(),
                ..RecordedRun::default()
            },
        );

        Ok(RunInfo {
            artifact_uri: format!("memory:/{experiment_id}/{run_id}/artifacts"),
            run_id,
            experiment_id,
        })
    }

    fn set_tags(&mut self, run: &RunInfo, tags: &[(&str, String)]) -> Result<()> {
        self.check("set_tags")?;
        let recorded = self.recorded(run)?;
        for (key, value) in tags {
            recorded.tags.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    fn log_param(&mut self, run: &RunInfo, key: &str, value: &str) -> Result<()> {
        self.check("log_param")?;
        let recorded = self.recorded(run)?;
        // Params are immutable once logged.
        match recorded.params.get(key) {
            Some(existing) if existing != value => Err(TrackingError::Api {
                endpoint: "log_param".into(),
                status: 400,
                code: Some("INVALID_PARAMETER_VALUE".into()),
                message: format!("param {key} already logged as {existing}"),
            }),
            _ => {
                recorded.params.insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    fn log_metric(&mut self, run: &RunInfo, key: &str, value: f64) -> Result<()> {
        self.check("log_metric")?;
        self.recorded(run)?.metrics.insert(key.to_string(), value);
        Ok(())
    }

    fn log_artifact(&mut self, run: &RunInfo, artifact: &Artifact) -> Result<()> {
        self.check("log_artifact")?;
        self.recorded(run)?.artifacts.push(artifact.clone());
        Ok(())
    }

    fn register_and_promote(
        &mut self,
        run: &RunInfo,
        artifact_path: &str,
        model_name: &str,
        stage: Stage,
    ) -> Result<ModelVersion> {
        self.check("register_and_promote")?;

        let logged = self
            .recorded(run)?
            .artifacts
            .iter()
            .any(|a| a.path == artifact_path);
        if !logged {
            return Err(TrackingError::Protocol(format!(
                "nothing logged at {}",
                run.model_uri(artifact_path)
            )));
        }

        let versions = self.registry.entry(model_name.to_string()).or_default();
        let version = (versions.len() + 1).to_string();
        versions.push(ModelVersion {
            name: model_name.to_string(),
            version: version.clone(),
            stage: Stage::None,
            run_id: Some(run.run_id.clone()),
            source: run.artifact_location(artifact_path),
        });

        for v in versions.iter_mut() {
            if v.version == version {
                v.stage = stage;
            } else if v.stage == stage {
                v.stage = Stage::Archived;
            }
        }

        versions
            .iter()
            .find(|v| v.version == version)
            .cloned()
            .ok_or_else(|| TrackingError::Protocol(format!("version {version} vanished")))
    }

    fn end_run(&mut self, run: &RunInfo, status: RunStatus) -> Result<()> {
        self.check("end_run")?;
        self.recorded(run)?.status = Some(status);
        Ok(())
    }
}
