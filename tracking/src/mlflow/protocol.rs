//! Wire types of the MLflow REST API 2.0 (only the fields in use).

use serde::{Deserialize, Serialize};

use crate::tracker::{RunStatus, Stage};

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Any acknowledgement whose payload we ignore.
#[derive(Debug, Deserialize)]
pub struct Ack {}

#[derive(Debug, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetExperimentResponse {
    pub experiment: Experiment,
}

#[derive(Debug, Serialize)]
pub struct CreateExperiment<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreateExperimentResponse {
    pub experiment_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRun<'a> {
    pub experiment_id: &'a str,
    pub start_time: u64,
}

#[derive(Debug, Deserialize)]
pub struct WireRunInfo {
    pub run_id: String,
    pub experiment_id: String,
    pub artifact_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct WireRun {
    pub info: WireRunInfo,
}

#[derive(Debug, Deserialize)]
pub struct CreateRunResponse {
    pub run: WireRun,
}

#[derive(Debug, Serialize)]
pub struct SetTag<'a> {
    pub run_id: &'a str,
    pub key: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LogParam<'a> {
    pub run_id: &'a str,
    pub key: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LogMetric<'a> {
    pub run_id: &'a str,
    pub key: &'a str,
    pub value: f64,
    pub timestamp: u64,
    pub step: u64,
}

#[derive(Debug, Serialize)]
pub struct UpdateRun<'a> {
    pub run_id: &'a str,
    pub status: RunStatus,
    pub end_time: u64,
}

#[derive(Debug, Serialize)]
pub struct CreateRegisteredModel<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateModelVersion<'a> {
    pub name: &'a str,
    pub source: &'a str,
    pub run_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireModelVersion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelVersionResponse {
    pub model_version: WireModelVersion,
}

#[derive(Debug, Serialize)]
pub struct GetLatestVersions<'a> {
    pub name: &'a str,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Deserialize)]
pub struct GetLatestVersionsResponse {
    #[serde(default)]
    pub model_versions: Vec<WireModelVersion>,
}

#[derive(Debug, Serialize)]
pub struct TransitionStage<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub stage: Stage,
    pub archive_existing_versions: bool,
}
