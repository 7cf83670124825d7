use anyhow::Context;
use log::info;

use taxi_duration::{TrainOptions, pipeline, trips};
use tracking::MlflowClient;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = TrainOptions::from_env()?;
    options.credentials.apply()?;

    let records = trips::load_trips(&options.data_path)
        .with_context(|| format!("loading {}", options.data_path.display()))?;

    let mut client = MlflowClient::new(options.tracking.clone())
        .with_context(|| format!("connecting to {}", options.tracking.tracking_uri))?;
    let report = pipeline::run(&options, &records, &mut client)?;

    info!(
        run_id = report.run.run_id.as_str(),
        n_train = report.n_train,
        n_test = report.n_test;
        "rmse {:.4}, model {} version {} in {}",
        report.evaluation.rmse,
        report.version.name,
        report.version.version,
        report.version.stage
    );
    Ok(())
}
