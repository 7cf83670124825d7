mod client;
mod protocol;

pub use client::{Auth, MlflowClient, MlflowConfig};
