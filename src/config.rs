use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use log::info;
use tracking::{Auth, MlflowConfig};

use crate::error::ConfigError;

pub const DEFAULT_DATA_PATH: &str = "data/training/dvc_train.parquet";
pub const DEFAULT_EXPERIMENT: &str = "green-taxi-monitoring-project";
pub const DEFAULT_MODEL_NAME: &str = "green-taxi-ride-duration-project";
pub const DEFAULT_DEVELOPER: &str = "Victor Matekole";
pub const DEFAULT_DATASET: &str =
    "Defined in DVC/Git — Should provide the hash and details from DVC/Git";

/// Variable the artifact store client reads its credentials from.
pub const CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// How the process authenticates against the artifact store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Running inside the cloud; the platform provides credentials.
    Ambient,
    /// A service-account key file on disk.
    ServiceAccountKey(PathBuf),
}

impl Credentials {
    /// Checks the key file and exports it for Google clients that read
    /// `GOOGLE_APPLICATION_CREDENTIALS`. The tracking client also receives
    /// the path directly through `MlflowConfig::application_credentials`.
    ///
    /// # Errors
    /// `ConfigError::CredentialsNotFound` if the key file does not exist.
    pub fn apply(&self) -> Result<(), ConfigError> {
        let Credentials::ServiceAccountKey(path) = self else {
            return Ok(());
        };

        check_key(path)?;
        info!("using service account key {}", path.display());
        env::set_var(CREDENTIALS_VAR, path);
        Ok(())
    }
}

fn check_key(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::CredentialsNotFound(path.to_path_buf()))
    }
}

/// Everything a training run needs, read once at start-up.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub tracking: MlflowConfig,
    pub credentials: Credentials,
    pub data_path: PathBuf,
    pub experiment: String,
    pub model_name: String,
    /// Value of the `developer` tag.
    pub developer: String,
    /// Value of the `dataset` tag.
    pub dataset: String,
    /// Fraction of rows held out for evaluation.
    pub test_size: f64,
    /// Seed of the train/test shuffle.
    pub seed: u64,
}

impl TrainOptions {
    /// Options with the default names, ratio and seed.
    pub fn new(tracking: MlflowConfig, credentials: Credentials) -> Self {
        Self {
            tracking,
            credentials,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            experiment: DEFAULT_EXPERIMENT.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            developer: DEFAULT_DEVELOPER.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            test_size: 0.2,
            seed: 42,
        }
    }

    /// Reads the options from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the options through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    /// - `ConfigError::MissingVar` if `MLFLOW_TRACKING_URI` is unset, or if
    ///   `SA_KEY` is unset outside the cloud.
    /// - `ConfigError::InvalidVar` if `MLFLOW_HTTP_REQUEST_TIMEOUT` is not a
    ///   positive number of seconds, or if only half of the basic-auth pair
    ///   is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let uri = var("MLFLOW_TRACKING_URI").ok_or(ConfigError::MissingVar("MLFLOW_TRACKING_URI"))?;
        let mut tracking = MlflowConfig::new(uri);
        tracking.auth = auth(&var)?;
        if let Some(raw) = var("MLFLOW_HTTP_REQUEST_TIMEOUT") {
            tracking.timeout = timeout(&raw)?;
        }

        let credentials = if var("IN_GOOGLE_CLOUD").is_some() {
            Credentials::Ambient
        } else {
            let key = var("SA_KEY").ok_or(ConfigError::MissingVar("SA_KEY"))?;
            Credentials::ServiceAccountKey(PathBuf::from(key))
        };
        if let Credentials::ServiceAccountKey(key) = &credentials {
            tracking.application_credentials = Some(key.clone());
        }

        let mut options = Self::new(tracking, credentials);
        if let Some(path) = var("TRAINING_DATA_PATH") {
            options.data_path = PathBuf::from(path);
        }
        if let Some(name) = var("MLFLOW_EXPERIMENT_NAME") {
            options.experiment = name;
        }
        if let Some(name) = var("MLFLOW_MODEL_NAME") {
            options.model_name = name;
        }
        if let Some(developer) = var("MODEL_DEVELOPER") {
            options.developer = developer;
        }

        Ok(options)
    }
}

fn auth(var: &impl Fn(&str) -> Option<String>) -> Result<Option<Auth>, ConfigError> {
    if let Some(token) = var("MLFLOW_TRACKING_TOKEN") {
        return Ok(Some(Auth::Bearer(token)));
    }

    match (var("MLFLOW_TRACKING_USERNAME"), var("MLFLOW_TRACKING_PASSWORD")) {
        (Some(username), Some(password)) => Ok(Some(Auth::Basic { username, password })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::InvalidVar {
            name: "MLFLOW_TRACKING_PASSWORD",
            value: String::new(),
        }),
        (None, Some(_)) => Err(ConfigError::InvalidVar {
            name: "MLFLOW_TRACKING_USERNAME",
            value: String::new(),
        }),
    }
}

fn timeout(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidVar {
        name: "MLFLOW_HTTP_REQUEST_TIMEOUT",
        value: raw.to_string(),
    };

    let secs: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs_f64(secs))
}
