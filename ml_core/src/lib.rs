mod data;
mod error;
mod linear;
pub mod metrics;
mod model;
mod split;

pub use data::Dataset;
pub use error::MlError;
pub use linear::LinearRegression;
pub use model::Regressor;
pub use split::{TrainTestSplit, test_len, train_test_split};
