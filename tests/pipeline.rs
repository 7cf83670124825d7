use tracking::{InMemoryTracker, MlflowConfig, RunStatus, Stage};

use taxi_duration::{
    Credentials, ModelArtifact, ModelDescriptor, PipelineError, TrainOptions, pipeline,
    trips::{FEATURES, TripRecord},
};

const MINUTE_US: f64 = 60_000_000.0;
/// 2021-09-01T00:00:00Z in microseconds.
const SEPT_FIRST: i64 = 1_630_454_400_000_000;
const MODEL: &str = "green-taxi-ride-duration-project";

fn options() -> TrainOptions {
    TrainOptions::new(MlflowConfig::new("http://mlflow:5000"), Credentials::Ambient)
}

/// Trips whose duration is `2 * trip_distance + 5` minutes plus a small wobble.
fn synthetic_trips(n: usize) -> Vec<TripRecord> {
    (0..n)
        .map(|i| {
            let distance = 0.3 + (i % 23) as f64 * 0.9;
            let wobble = ((i * 37 % 11) as f64 - 5.0) * 0.05;
            let minutes = 2.0 * distance + 5.0 + wobble;
            let pickup = SEPT_FIRST + i as i64 * 600_000_000;
            TripRecord {
                pickup_us: Some(pickup),
                dropoff_us: Some(pickup + (minutes * MINUTE_US).round() as i64),
                pu_location_id: Some((1 + i * 7 % 265) as f64),
                do_location_id: Some((1 + i * 11 % 265) as f64),
                trip_distance: Some(distance),
                passenger_count: Some((1 + i % 4) as f64),
                fare_amount: Some(2.5 + (i % 13) as f64),
                total_amount: Some(3.0 + (i % 19) as f64),
            }
        })
        .collect()
}

#[test]
fn training_run_is_tracked_and_promoted() {
    let mut tracker = InMemoryTracker::new();
    let report = pipeline::run(&options(), &synthetic_trips(100), &mut tracker).unwrap();

    assert!(report.evaluation.rmse < 1.0, "rmse {}", report.evaluation.rmse);
    assert_eq!(report.n_test, 20);
    assert_eq!(report.n_train, 80);
    assert_eq!(report.version.stage, Stage::Production);

    let run = tracker.run(&report.run.run_id).unwrap();
    assert_eq!(run.experiment, "green-taxi-monitoring-project");
    assert_eq!(run.status, Some(RunStatus::Finished));

    assert_eq!(run.tags["model"], "linear regression");
    assert_eq!(run.tags["target"], "duration");
    assert_eq!(run.tags["developer"], "Victor Matekole");
    let features: Vec<String> = serde_json::from_str(&run.tags["features"]).unwrap();
    assert_eq!(features, FEATURES);

    assert_eq!(run.params["random_state"], "42");
    assert_eq!(run.params["test_size"], "0.2");
    assert_eq!(run.metrics["rmse"], report.evaluation.rmse);
    assert_eq!(run.metrics["rows_dropped"], 0.0);

    let files: Vec<_> = run
        .artifacts
        .iter()
        .map(|a| (a.path.as_str(), a.file_name.as_str()))
        .collect();
    assert_eq!(files, vec![("model", "model.json"), ("model", "MLmodel")]);

    let model = ModelArtifact::from_json(&run.artifacts[0].contents).unwrap();
    assert!((model.coefficients[2] - 2.0).abs() < 0.1);

    let descriptor = ModelDescriptor::from_yaml(&run.artifacts[1].contents).unwrap();
    assert_eq!(descriptor.run_id, report.run.run_id);
    assert_eq!(descriptor.flavors["linear_regression"].data, "model.json");
    let inputs = descriptor.signature.input_columns().unwrap();
    assert_eq!(inputs.len(), 6);

    let versions = tracker.versions(MODEL);
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].stage, Stage::Production);
    assert_eq!(versions[0].run_id.as_deref(), Some(report.run.run_id.as_str()));
}

#[test]
fn second_run_archives_the_first() {
    let mut tracker = InMemoryTracker::new();
    let first = pipeline::run(&options(), &synthetic_trips(100), &mut tracker).unwrap();
    let second = pipeline::run(&options(), &synthetic_trips(120), &mut tracker).unwrap();

    assert_ne!(first.run.run_id, second.run.run_id);

    let production = tracker.latest_versions(MODEL, &[Stage::Production]);
    assert_eq!(production.len(), 1);
    assert_eq!(production[0].version, second.version.version);

    let stages: Vec<_> = tracker.versions(MODEL).iter().map(|v| v.stage).collect();
    assert_eq!(stages, vec![Stage::Archived, Stage::Production]);
}

#[test]
fn dropped_rows_are_logged_as_metrics() {
    let mut records = synthetic_trips(60);
    records[0].dropoff_us = records[0].pickup_us.map(|p| p + 75 * 60_000_000);
    records[1].passenger_count = Some(0.0);
    records[2].passenger_count = None;
    records[3].total_amount = None;

    let mut tracker = InMemoryTracker::new();
    let report = pipeline::run(&options(), &records, &mut tracker).unwrap();
    let metrics = &tracker.run(&report.run.run_id).unwrap().metrics;

    assert_eq!(metrics["rows_dropped"], 4.0);
    assert_eq!(metrics["rows_dropped_duration"], 1.0);
    assert_eq!(metrics["rows_dropped_passenger_count"], 2.0);
    assert_eq!(metrics["rows_dropped_missing_feature"], 1.0);
    assert_eq!(report.n_train + report.n_test, 56);
}

#[test]
fn tracking_failure_marks_run_failed() {
    let mut tracker = InMemoryTracker::new();
    tracker.fail_on("register_and_promote");

    let err = pipeline::run(&options(), &synthetic_trips(100), &mut tracker).unwrap_err();
    assert!(matches!(err, PipelineError::Tracking(_)));

    let runs: Vec<_> = tracker.runs().collect();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].1.status, Some(RunStatus::Failed));
    assert!(tracker.versions(MODEL).is_empty());
}

#[test]
fn too_few_rows_never_start_a_run() {
    let mut records = synthetic_trips(3);
    records[0].passenger_count = Some(8.0);
    records[1].dropoff_us = None;

    let mut tracker = InMemoryTracker::new();
    let err = pipeline::run(&options(), &records, &mut tracker).unwrap_err();

    assert!(matches!(err, PipelineError::EmptyDataset { kept: 1 }));
    assert_eq!(tracker.runs().count(), 0);
}

#[test]
fn failed_start_is_propagated() {
    let mut tracker = InMemoryTracker::new();
    tracker.fail_on("start_run");

    let err = pipeline::run(&options(), &synthetic_trips(40), &mut tracker).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Tracking(ref e) if e.code() == Some("TEMPORARILY_UNAVAILABLE")
    ));
    assert_eq!(tracker.runs().count(), 0);
}
