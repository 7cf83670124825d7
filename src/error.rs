use std::{error::Error, fmt, io, path::PathBuf};

use ml_core::MlError;
use polars::prelude::PolarsError;
use tracking::TrackingError;

/// Failures while reading the trip dataset.
#[derive(Debug)]
pub enum DataError {
    Io { path: PathBuf, source: io::Error },
    Parquet(PolarsError),
    /// A required column is absent from the file.
    MissingColumn(String),
    /// A timestamp column is not a datetime column.
    InvalidTimestamp(String),
    /// A feature column cannot be read as numbers.
    InvalidNumeric { column: String, source: PolarsError },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::Io { path, source } => write!(f, "cannot open {}: {source}", path.display()),
            DataError::Parquet(e) => write!(f, "cannot read parquet: {e}"),
            DataError::MissingColumn(name) => write!(f, "required column {name} is missing"),
            DataError::InvalidTimestamp(name) => {
                write!(f, "column {name} cannot be interpreted as a datetime")
            }
            DataError::InvalidNumeric { column, source } => {
                write!(f, "column {column} is not numeric: {source}")
            }
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataError::Io { source, .. } => Some(source),
            DataError::Parquet(e) => Some(e),
            DataError::InvalidNumeric { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PolarsError> for DataError {
    fn from(value: PolarsError) -> Self {
        Self::Parquet(value)
    }
}

/// Invalid or missing process configuration.
#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar { name: &'static str, value: String },
    /// The service-account key file does not exist.
    CredentialsNotFound(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(name) => write!(f, "environment variable {name} is not set"),
            ConfigError::InvalidVar { name, value } => {
                write!(f, "environment variable {name} has an invalid value: {value:?}")
            }
            ConfigError::CredentialsNotFound(path) => {
                write!(f, "credentials file {} does not exist", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

/// Everything that can stop a training run.
#[derive(Debug)]
pub enum PipelineError {
    Config(ConfigError),
    Data(DataError),
    Ml(MlError),
    Tracking(TrackingError),
    /// Too few rows survived preprocessing to split into train and test.
    EmptyDataset { kept: usize },
    /// A stored model does not match the fixed feature/target layout.
    SchemaMismatch(String),
    Serialize(serde_json::Error),
    Descriptor(serde_yaml::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "configuration error: {e}"),
            PipelineError::Data(e) => write!(f, "data error: {e}"),
            PipelineError::Ml(e) => write!(f, "training error: {e}"),
            PipelineError::Tracking(e) => write!(f, "tracking error: {e}"),
            PipelineError::EmptyDataset { kept } => {
                write!(f, "only {kept} row(s) left after preprocessing, need at least 2")
            }
            PipelineError::SchemaMismatch(msg) => write!(f, "model schema mismatch: {msg}"),
            PipelineError::Serialize(e) => write!(f, "cannot serialize model: {e}"),
            PipelineError::Descriptor(e) => write!(f, "cannot write model descriptor: {e}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Config(e) => Some(e),
            PipelineError::Data(e) => Some(e),
            PipelineError::Ml(e) => Some(e),
            PipelineError::Tracking(e) => Some(e),
            PipelineError::Serialize(e) => Some(e),
            PipelineError::Descriptor(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DataError> for PipelineError {
    fn from(value: DataError) -> Self {
        Self::Data(value)
    }
}

impl From<MlError> for PipelineError {
    fn from(value: MlError) -> Self {
        Self::Ml(value)
    }
}

impl From<TrackingError> for PipelineError {
    fn from(value: TrackingError) -> Self {
        Self::Tracking(value)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Descriptor(value)
    }
}
