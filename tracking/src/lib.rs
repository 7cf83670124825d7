//! Experiment tracking and model registry access.
//!
//! The [`Tracker`] trait is the only surface the training pipeline depends
//! on. [`MlflowClient`] talks to an MLflow server over its REST API, writing
//! artifacts through the server's proxy or straight to a `gs://` bucket, and
//! [`InMemoryTracker`] keeps everything in process.

mod error;
mod memory;
mod mlflow;
mod store;
mod tracker;

pub use error::{Result, TrackingError};
pub use memory::{InMemoryTracker, RecordedRun};
pub use mlflow::{Auth, MlflowClient, MlflowConfig};
pub use tracker::{Artifact, ModelVersion, RunInfo, RunStatus, Stage, Tracker};
