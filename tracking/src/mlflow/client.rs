use std::{
    fmt,
    path::PathBuf,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use log::{debug, info};
use reqwest::RequestBuilder;
use serde::{Serialize, de::DeserializeOwned};
use tokio::runtime::{Builder, Runtime};

use super::protocol::*;
use crate::{
    Result, TrackingError,
    store::{self, ArtifactRoot},
    tracker::{Artifact, ModelVersion, RunInfo, RunStatus, Stage, Tracker},
};

const ALREADY_EXISTS: &str = "RESOURCE_ALREADY_EXISTS";
const DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Credentials attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Bearer(String),
    Basic { username: String, password: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Bearer(_) => f.write_str("Bearer(***)"),
            Auth::Basic { username, .. } => write!(f, "Basic({username}:***)"),
        }
    }
}

/// Connection settings for an MLflow tracking server.
#[derive(Debug, Clone)]
pub struct MlflowConfig {
    /// Base endpoint, e.g. `http://mlflow:5000`.
    pub tracking_uri: String,
    pub auth: Option<Auth>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long to wait for a new model version to leave `PENDING_REGISTRATION`.
    pub registration_timeout: Duration,
    /// Service-account key for `gs://` artifact roots.
    pub application_credentials: Option<PathBuf>,
}

impl MlflowConfig {
    pub fn new(tracking_uri: impl Into<String>) -> Self {
        Self {
            tracking_uri: tracking_uri.into(),
            auth: None,
            timeout: Duration::from_secs(30),
            registration_timeout: Duration::from_secs(300),
            application_credentials: None,
        }
    }
}

/// Blocking client for the MLflow tracking and model registry REST API.
///
/// It owns a current-thread runtime and blocks on every request, so callers
/// see a plain synchronous API.
pub struct MlflowClient {
    runtime: Runtime,
    http: reqwest::Client,
    base: String,
    auth: Option<Auth>,
    registration_timeout: Duration,
    application_credentials: Option<PathBuf>,
}

impl MlflowClient {
    /// Creates a new `MlflowClient`.
    ///
    /// # Errors
    /// Returns `TrackingError::UnsupportedTrackingUri` unless the URI is
    /// `http(s)://...`, or `TrackingError::Io` if the runtime cannot start.
    pub fn new(config: MlflowConfig) -> Result<Self> {
        let uri = config.tracking_uri.trim();
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(TrackingError::UnsupportedTrackingUri(uri.to_string()));
        }

        let runtime = Builder::new_current_thread().enable_all().build()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| TrackingError::Http {
                endpoint: "client".into(),
                source,
            })?;

        Ok(Self {
            runtime,
            http,
            base: uri.trim_end_matches('/').to_string(),
            auth: config.auth,
            registration_timeout: config.registration_timeout,
            application_credentials: config.application_credentials,
        })
    }

    /// Looks an experiment up by name and creates it when missing.
    ///
    /// # Returns
    /// The experiment id.
    pub fn experiment_id(&self, name: &str) -> Result<String> {
        let found = self.get::<GetExperimentResponse>(
            "experiments/get-by-name",
            &[("experiment_name", name)],
        );

        match found {
            Ok(resp) => Ok(resp.experiment.experiment_id),
            Err(e) if e.code() == Some(DOES_NOT_EXIST) => {
                info!("creating experiment {name}");
                let resp: CreateExperimentResponse =
                    self.post("experiments/create", &CreateExperiment { name })?;
                Ok(resp.experiment_id)
            }
            Err(e) => Err(e),
        }
    }

    /// Lists the newest version of `name` in each of `stages`.
    pub fn latest_versions(&self, name: &str, stages: &[Stage]) -> Result<Vec<ModelVersion>> {
        let resp: GetLatestVersionsResponse = self.post(
            "registered-models/get-latest-versions",
            &GetLatestVersions {
                name,
                stages: stages.to_vec(),
            },
        )?;

        resp.model_versions.into_iter().map(convert).collect()
    }

    /// Moves a version to `stage`.
    pub fn transition_stage(
        &self,
        name: &str,
        version: &str,
        stage: Stage,
        archive_existing_versions: bool,
    ) -> Result<ModelVersion> {
        let resp: ModelVersionResponse = self.post(
            "model-versions/transition-stage",
            &TransitionStage {
                name,
                version,
                stage,
                archive_existing_versions,
            },
        )?;

        convert(resp.model_version)
    }

    fn create_registered_model(&self, name: &str) -> Result<()> {
        match self.post::<_, Ack>("registered-models/create", &CreateRegisteredModel { name }) {
            Ok(_) => {
                info!("registered model {name} created");
                Ok(())
            }
            Err(e) if e.code() == Some(ALREADY_EXISTS) => {
                debug!("registered model {name} already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Polls a freshly created version until the registry reports it `READY`.
    fn wait_until_ready(&self, name: &str, version: &str) -> Result<()> {
        let deadline = Instant::now() + self.registration_timeout;

        loop {
            let resp: ModelVersionResponse = self.get(
                "model-versions/get",
                &[("name", name), ("version", version)],
            )?;

            match resp.model_version.status.as_deref() {
                None | Some("READY") => return Ok(()),
                Some("FAILED_REGISTRATION") => {
                    return Err(TrackingError::Protocol(format!(
                        "version {version} of {name} failed registration"
                    )));
                }
                Some(status) => {
                    if Instant::now() >= deadline {
                        return Err(TrackingError::Protocol(format!(
                            "version {version} of {name} still {status} after {:?}",
                            self.registration_timeout
                        )));
                    }
                    debug!("version {version} of {name} is {status}, waiting");
                    self.runtime.block_on(async { tokio::time::sleep(POLL_INTERVAL).await });
                }
            }
        }
    }

    /// Uploads through the tracking server's artifact proxy.
    fn upload_proxied(&self, path: &str, artifact: &Artifact) -> Result<()> {
        let url = format!("{}/api/2.0/mlflow-artifacts/artifacts/{path}", self.base);
        let req = self
            .http
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(artifact.contents.clone());

        self.execute::<Ack>("mlflow-artifacts/artifacts", req)?;
        info!("logged artifact {path} ({} bytes)", artifact.contents.len());
        Ok(())
    }

    /// Writes straight to a Google Cloud Storage bucket.
    fn upload_gcs(&self, bucket: &str, key: &str, artifact: &Artifact) -> Result<()> {
        let location = format!("gs://{bucket}/{key}");
        debug!("uploading {location}");

        let credentials = self.application_credentials.as_deref();
        let contents = artifact.contents.clone();
        self.runtime
            .block_on(async {
                let gcs = store::gcs(bucket, credentials)?;
                store::put(&gcs, key, contents).await
            })
            .map_err(|source| TrackingError::Storage {
                location: location.clone(),
                source,
            })?;

        info!("logged artifact {location} ({} bytes)", artifact.contents.len());
        Ok(())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/2.0/mlflow/{endpoint}", self.base)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(Auth::Bearer(token)) => req.bearer_auth(token),
            Some(Auth::Basic { username, password }) => req.basic_auth(username, Some(password)),
            None => req,
        }
    }

    fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.http.post(self.url(endpoint)).json(body);
        self.execute(endpoint, req)
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let req = self.http.get(self.url(endpoint)).query(query);
        self.execute(endpoint, req)
    }

    /// Sends a request and decodes either the payload or the MLflow error body.
    fn execute<T: DeserializeOwned>(&self, endpoint: &str, req: RequestBuilder) -> Result<T> {
        debug!(endpoint = endpoint; "sending request");
        let req = self.authorize(req);

        let (status, body) = self
            .runtime
            .block_on(async move {
                let resp = req.send().await?;
                let status = resp.status();
                let body = resp.text().await?;
                Ok::<_, reqwest::Error>((status, body))
            })
            .map_err(|source| TrackingError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if !status.is_success() {
            let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) => (err.error_code, err.message),
                Err(_) => (None, body),
            };
            return Err(TrackingError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                code,
                message,
            });
        }

        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body).map_err(|source| TrackingError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

impl Tracker for MlflowClient {
    fn start_run(&mut self, experiment: &str) -> Result<RunInfo> {
        let experiment_id = self.experiment_id(experiment)?;
        let resp: CreateRunResponse = self.post(
            "runs/create",
            &CreateRun {
                experiment_id: &experiment_id,
                start_time: now_ms(),
            },
        )?;

        let info = resp.run.info;
        info!(run_id = info.run_id.as_str(); "run started in experiment {experiment}");
        Ok(RunInfo {
            run_id: info.run_id,
            experiment_id: info.experiment_id,
            artifact_uri: info.artifact_uri,
        })
    }

    fn set_tags(&mut self, run: &RunInfo, tags: &[(&str, String)]) -> Result<()> {
        for (key, value) in tags {
            self.post::<_, Ack>(
                "runs/set-tag",
                &SetTag {
                    run_id: &run.run_id,
                    key,
                    value,
                },
            )?;
        }
        Ok(())
    }

    fn log_param(&mut self, run: &RunInfo, key: &str, value: &str) -> Result<()> {
        self.post::<_, Ack>(
            "runs/log-parameter",
            &LogParam {
                run_id: &run.run_id,
                key,
                value,
            },
        )?;
        Ok(())
    }

    fn log_metric(&mut self, run: &RunInfo, key: &str, value: f64) -> Result<()> {
        self.post::<_, Ack>(
            "runs/log-metric",
            &LogMetric {
                run_id: &run.run_id,
                key,
                value,
                timestamp: now_ms(),
                step: 0,
            },
        )?;
        Ok(())
    }

    fn log_artifact(&mut self, run: &RunInfo, artifact: &Artifact) -> Result<()> {
        let (path, file) = (artifact.path.as_str(), artifact.file_name.as_str());

        match ArtifactRoot::parse(&run.artifact_uri) {
            Some(ArtifactRoot::Proxied(root)) => {
                self.upload_proxied(&store::join(&[root, path, file]), artifact)
            }
            Some(ArtifactRoot::Gcs { bucket, prefix }) => {
                self.upload_gcs(bucket, &store::join(&[prefix, path, file]), artifact)
            }
            None => Err(TrackingError::UnsupportedArtifactUri(run.artifact_uri.clone())),
        }
    }

    fn register_and_promote(
        &mut self,
        run: &RunInfo,
        artifact_path: &str,
        model_name: &str,
        stage: Stage,
    ) -> Result<ModelVersion> {
        self.create_registered_model(model_name)?;

        let source = run.artifact_location(artifact_path);
        debug!("registering {} from {source}", run.model_uri(artifact_path));
        let created: ModelVersionResponse = self.post(
            "model-versions/create",
            &CreateModelVersion {
                name: model_name,
                source: &source,
                run_id: &run.run_id,
            },
        )?;
        let created = created.model_version;
        self.wait_until_ready(model_name, &created.version)?;

        let version = self
            .latest_versions(model_name, &[Stage::None])?
            .into_iter()
            .find(|v| v.run_id.as_deref() == Some(run.run_id.as_str()))
            .map(|v| v.version)
            .unwrap_or(created.version);

        let promoted = self.transition_stage(model_name, &version, stage, true)?;
        info!("version {} of {model_name} moved to {}", promoted.version, promoted.stage);
        Ok(promoted)
    }

    fn end_run(&mut self, run: &RunInfo, status: RunStatus) -> Result<()> {
        self.post::<_, Ack>(
            "runs/update",
            &UpdateRun {
                run_id: &run.run_id,
                status,
                end_time: now_ms(),
            },
        )?;
        Ok(())
    }
}

fn convert(wire: WireModelVersion) -> Result<ModelVersion> {
    let stage = match wire.current_stage.as_deref() {
        Some(stage) => stage.parse()?,
        None => Stage::None,
    };

    Ok(ModelVersion {
        name: wire.name,
        version: wire.version,
        stage,
        run_id: wire.run_id,
        source: wire.source,
    })
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_tracking_uri() {
        let err = MlflowClient::new(MlflowConfig::new("./mlruns")).err().unwrap();
        assert!(matches!(err, TrackingError::UnsupportedTrackingUri(_)));
    }

    #[test]
    fn auth_debug_hides_secrets() {
        let auth = Auth::Basic {
            username: "ci".into(),
            password: "hunter2".into(),
        };
        assert_eq!(format!("{auth:?}"), "Basic(ci:***)");
        assert_eq!(format!("{:?}", Auth::Bearer("t0k3n".into())), "Bearer(***)");
    }
}
