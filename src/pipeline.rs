use chrono::Utc;
use log::{info, warn};
use ml_core::{Dataset, LinearRegression, Regressor, metrics, train_test_split};
use tracking::{Artifact, ModelVersion, RunInfo, RunStatus, Stage, Tracker};

use crate::{
    artifact::{ARTIFACT_FILE, ARTIFACT_PATH, MLMODEL_FILE, ModelArtifact, ModelDescriptor},
    config::TrainOptions,
    error::PipelineError,
    trips::{DropStats, FEATURES, ProcessedTrip, TARGET, TripRecord, preprocess},
};

/// Held-out scores of a fitted model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// A model fitted and scored locally, before anything is tracked.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub model: LinearRegression,
    pub evaluation: Evaluation,
    pub stats: DropStats,
    pub n_train: usize,
    pub n_test: usize,
}

/// What a completed training run produced.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub run: RunInfo,
    pub version: ModelVersion,
    pub evaluation: Evaluation,
    pub stats: DropStats,
    pub n_train: usize,
    pub n_test: usize,
}

/// Preprocesses `records`, splits them and fits the regression.
///
/// # Errors
/// `PipelineError::EmptyDataset` if fewer than two rows survive
/// preprocessing; `PipelineError::Ml` if fitting or scoring fails.
pub fn fit(options: &TrainOptions, records: &[TripRecord]) -> Result<FitOutcome, PipelineError> {
    let processed = preprocess(records);
    let stats = processed.stats;
    info!(
        seen = stats.seen, kept = stats.kept, dropped = stats.dropped();
        "preprocessed trips"
    );
    if stats.dropped() > 0 {
        info!(
            duration = stats.duration,
            passenger_count = stats.passenger_count,
            missing_feature = stats.missing_feature;
            "dropped {} of {} rows",
            stats.dropped(),
            stats.seen
        );
    }

    if processed.trips.len() < 2 {
        return Err(PipelineError::EmptyDataset { kept: stats.kept });
    }

    let dataset = to_dataset(&processed.trips)?;
    let split = train_test_split(dataset.len(), options.test_size, options.seed)?;
    let train = dataset.select(&split.train);
    let test = dataset.select(&split.test);
    info!(train = train.len(), test = test.len(); "split dataset");

    let mut model = LinearRegression::new();
    model.fit(train.x(), train.y())?;

    let predicted = model.predict(test.x())?;
    let evaluation = Evaluation {
        rmse: metrics::root_mean_squared_error(test.y(), predicted.view())?,
        mae: metrics::mean_absolute_error(test.y(), predicted.view())?,
        r2: metrics::r2_score(test.y(), predicted.view())?,
    };
    info!(rmse = evaluation.rmse, mae = evaluation.mae, r2 = evaluation.r2; "evaluated model");

    Ok(FitOutcome {
        model,
        evaluation,
        stats,
        n_train: train.len(),
        n_test: test.len(),
    })
}

/// Trains on `records`, tracks the run and promotes the new model version
/// to `Production`.
///
/// Nothing is tracked when fitting fails. Once a run has started, any
/// failure ends it as `FAILED` before the error is returned.
///
/// # Errors
/// Every failure is propagated; nothing is retried.
pub fn run(
    options: &TrainOptions,
    records: &[TripRecord],
    tracker: &mut dyn Tracker,
) -> Result<TrainingReport, PipelineError> {
    let outcome = fit(options, records)?;

    let run = tracker.start_run(&options.experiment)?;
    info!(run_id = run.run_id.as_str(), experiment = options.experiment.as_str(); "started run");

    match track(options, &outcome, &run, tracker) {
        Ok(version) => {
            tracker.end_run(&run, RunStatus::Finished)?;
            info!(
                model = version.name.as_str(), version = version.version.as_str();
                "promoted to {}", version.stage
            );
            Ok(TrainingReport {
                run,
                version,
                evaluation: outcome.evaluation,
                stats: outcome.stats,
                n_train: outcome.n_train,
                n_test: outcome.n_test,
            })
        }
        Err(e) => {
            if let Err(end) = tracker.end_run(&run, RunStatus::Failed) {
                warn!(run_id = run.run_id.as_str(); "could not mark run as failed: {end}");
            }
            Err(e)
        }
    }
}

fn track(
    options: &TrainOptions,
    outcome: &FitOutcome,
    run: &RunInfo,
    tracker: &mut dyn Tracker,
) -> Result<ModelVersion, PipelineError> {
    let features = serde_json::to_string(&FEATURES)?;
    tracker.set_tags(
        run,
        &[
            ("model", "linear regression".to_string()),
            ("developer", options.developer.clone()),
            ("dataset", options.dataset.clone()),
            ("features", features),
            ("target", TARGET.to_string()),
        ],
    )?;

    tracker.log_param(run, "test_size", &options.test_size.to_string())?;
    tracker.log_param(run, "random_state", &options.seed.to_string())?;
    tracker.log_param(run, "n_train", &outcome.n_train.to_string())?;
    tracker.log_param(run, "n_test", &outcome.n_test.to_string())?;

    let stats = &outcome.stats;
    let metrics = [
        ("rmse", outcome.evaluation.rmse),
        ("mae", outcome.evaluation.mae),
        ("r2", outcome.evaluation.r2),
        ("rows_dropped", stats.dropped() as f64),
        ("rows_dropped_duration", stats.duration as f64),
        ("rows_dropped_passenger_count", stats.passenger_count as f64),
        ("rows_dropped_missing_feature", stats.missing_feature as f64),
    ];
    for (key, value) in metrics {
        tracker.log_metric(run, key, value)?;
    }

    let model = ModelArtifact::from_model(&outcome.model)?;
    tracker.log_artifact(run, &Artifact::new(ARTIFACT_PATH, ARTIFACT_FILE, model.to_json()?))?;
    let descriptor = ModelDescriptor::new(&run.run_id, Utc::now())?;
    tracker.log_artifact(run, &Artifact::new(ARTIFACT_PATH, MLMODEL_FILE, descriptor.to_yaml()?))?;
    info!(uri = run.model_uri(ARTIFACT_PATH).as_str(); "logged model");

    Ok(tracker.register_and_promote(run, ARTIFACT_PATH, &options.model_name, Stage::Production)?)
}

fn to_dataset(trips: &[ProcessedTrip]) -> Result<Dataset, PipelineError> {
    let rows: Vec<Vec<f64>> = trips.iter().map(|t| t.features.to_vec()).collect();
    let y = trips.iter().map(|t| t.duration).collect();
    Ok(Dataset::from_rows(&rows, y)?)
}
