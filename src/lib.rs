//! Trains the green-taxi trip duration model and promotes it in the model
//! registry.
//!
//! The binary reads [`TrainOptions`] from the environment, loads the trips
//! with [`trips::load_trips`] and hands everything to [`pipeline::run`]
//! together with an MLflow-backed [`tracking::Tracker`].

pub mod artifact;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod trips;

pub use artifact::{ModelArtifact, ModelDescriptor};
pub use config::{Credentials, TrainOptions};
pub use error::{ConfigError, DataError, PipelineError};
pub use pipeline::{Evaluation, FitOutcome, TrainingReport, fit, run};
