use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ml_core::{LinearRegression, MlError};
use serde::{Deserialize, Serialize};

use crate::{
    error::PipelineError,
    trips::{FEATURES, TARGET},
};

/// Directory the model is logged under inside a run.
pub const ARTIFACT_PATH: &str = "model";
/// File name of the serialized model inside `ARTIFACT_PATH`.
pub const ARTIFACT_FILE: &str = "model.json";
/// File name of the model descriptor inside `ARTIFACT_PATH`.
pub const MLMODEL_FILE: &str = "MLmodel";

const FLAVOR: &str = "linear_regression";
const LOADER_MODULE: &str = "taxi_duration.artifact";
const COLUMN_TYPE: &str = "double";

/// The serialized form of a fitted model.
///
/// Feature and target names travel with the weights so that inference input
/// can be checked against the layout the model was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub flavor: String,
    pub features: Vec<String>,
    pub target: String,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl ModelArtifact {
    /// Captures a fitted model.
    ///
    /// # Errors
    /// `MlError::NotFitted` if `model` has no coefficients yet, or a shape
    /// mismatch if their count differs from `FEATURES`.
    pub fn from_model(model: &LinearRegression) -> Result<Self, PipelineError> {
        let coefficients = model.coefficients().ok_or(MlError::NotFitted)?;
        if coefficients.len() != FEATURES.len() {
            return Err(MlError::ShapeMismatch {
                what: "coefficients",
                got: coefficients.len(),
                expected: FEATURES.len(),
            }
            .into());
        }

        Ok(Self {
            flavor: FLAVOR.to_string(),
            features: FEATURES.iter().map(|f| f.to_string()).collect(),
            target: TARGET.to_string(),
            coefficients: coefficients.to_vec(),
            intercept: model.intercept(),
        })
    }

    pub fn to_json(&self) -> Result<Vec<u8>, PipelineError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parses and validates a serialized model.
    pub fn from_json(bytes: &[u8]) -> Result<Self, PipelineError> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        artifact.check_schema()?;
        Ok(artifact)
    }

    fn check_schema(&self) -> Result<(), PipelineError> {
        if self.flavor != FLAVOR {
            return Err(PipelineError::SchemaMismatch(format!(
                "unknown flavor {}",
                self.flavor
            )));
        }
        if self.features.iter().map(String::as_str).ne(FEATURES) {
            return Err(PipelineError::SchemaMismatch(format!(
                "features {:?}, expected {FEATURES:?}",
                self.features
            )));
        }
        if self.target != TARGET {
            return Err(PipelineError::SchemaMismatch(format!(
                "target {}, expected {TARGET}",
                self.target
            )));
        }
        if self.coefficients.len() != self.features.len() {
            return Err(PipelineError::SchemaMismatch(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.features.len()
            )));
        }
        Ok(())
    }
}

/// The `MLmodel` file that makes the logged directory an MLflow model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub artifact_path: String,
    pub run_id: String,
    pub utc_time_created: String,
    pub flavors: BTreeMap<String, Flavor>,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    pub loader_module: String,
    /// Model file, relative to the model directory.
    pub data: String,
}

/// Column specs, each side a JSON list of `{"name", "type"}` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub inputs: String,
    pub outputs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ModelDescriptor {
    /// Describes the model logged by `run_id` at `created`.
    pub fn new(run_id: &str, created: DateTime<Utc>) -> Result<Self, PipelineError> {
        let flavor = Flavor {
            loader_module: LOADER_MODULE.to_string(),
            data: ARTIFACT_FILE.to_string(),
        };

        Ok(Self {
            artifact_path: ARTIFACT_PATH.to_string(),
            run_id: run_id.to_string(),
            utc_time_created: created.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            flavors: BTreeMap::from([(FLAVOR.to_string(), flavor)]),
            signature: Signature {
                inputs: columns(&FEATURES)?,
                outputs: columns(&[TARGET])?,
            },
        })
    }

    pub fn to_yaml(&self) -> Result<Vec<u8>, PipelineError> {
        Ok(serde_yaml::to_string(self)?.into_bytes())
    }

    pub fn from_yaml(bytes: &[u8]) -> Result<Self, PipelineError> {
        Ok(serde_yaml::from_slice(bytes)?)
    }
}

impl Signature {
    pub fn input_columns(&self) -> Result<Vec<ColumnSpec>, PipelineError> {
        Ok(serde_json::from_str(&self.inputs)?)
    }

    pub fn output_columns(&self) -> Result<Vec<ColumnSpec>, PipelineError> {
        Ok(serde_json::from_str(&self.outputs)?)
    }
}

fn columns(names: &[&str]) -> Result<String, PipelineError> {
    let specs: Vec<ColumnSpec> = names
        .iter()
        .map(|name| ColumnSpec {
            name: name.to_string(),
            kind: COLUMN_TYPE.to_string(),
        })
        .collect();
    Ok(serde_json::to_string(&specs)?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use ndarray::array;

    use super::*;

    fn artifact() -> ModelArtifact {
        let model =
            LinearRegression::from_parts(array![0.0, 0.0, 2.0, 0.5, 0.0, 0.0], 5.0);
        ModelArtifact::from_model(&model).unwrap()
    }

    #[test]
    fn json_keeps_layout_and_weights() {
        let saved = artifact();
        let parsed = ModelArtifact::from_json(&saved.to_json().unwrap()).unwrap();

        assert_eq!(parsed, saved);
        assert_eq!(parsed.target, "duration");
        assert_eq!(parsed.features[2], "trip_distance");
    }

    #[test]
    fn foreign_layouts_are_rejected() {
        let mut renamed = artifact();
        renamed.features[0] = "pickup_zone".into();
        let bytes = renamed.to_json().unwrap();
        assert!(matches!(
            ModelArtifact::from_json(&bytes),
            Err(PipelineError::SchemaMismatch(_))
        ));

        let mut short = artifact();
        short.coefficients.pop();
        let bytes = short.to_json().unwrap();
        assert!(matches!(
            ModelArtifact::from_json(&bytes),
            Err(PipelineError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn unfitted_model_cannot_be_saved() {
        let err = ModelArtifact::from_model(&LinearRegression::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Ml(MlError::NotFitted)));
    }

    #[test]
    fn descriptor_lists_flavor_and_signature() {
        let created = Utc.with_ymd_and_hms(2021, 10, 1, 9, 30, 0).unwrap();
        let descriptor = ModelDescriptor::new("r1", created).unwrap();
        let parsed = ModelDescriptor::from_yaml(&descriptor.to_yaml().unwrap()).unwrap();

        assert_eq!(parsed, descriptor);
        assert_eq!(parsed.artifact_path, "model");
        assert_eq!(parsed.run_id, "r1");
        assert_eq!(parsed.utc_time_created, "2021-10-01 09:30:00.000000");

        let flavor = &parsed.flavors["linear_regression"];
        assert_eq!(flavor.loader_module, "taxi_duration.artifact");
        assert_eq!(flavor.data, "model.json");

        let inputs = parsed.signature.input_columns().unwrap();
        let names: Vec<_> = inputs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, FEATURES);
        assert!(inputs.iter().all(|c| c.kind == "double"));

        let outputs = parsed.signature.output_columns().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "duration");
    }

    #[test]
    fn descriptor_yaml_uses_mlflow_keys() {
        let created = Utc.with_ymd_and_hms(2021, 10, 1, 9, 30, 0).unwrap();
        let yaml = ModelDescriptor::new("r1", created).unwrap().to_yaml().unwrap();
        let yaml = String::from_utf8(yaml).unwrap();

        for key in ["artifact_path:", "flavors:", "loader_module:", "signature:", "inputs:", "outputs:"] {
            assert!(yaml.contains(key), "{key} missing from\n{yaml}");
        }
    }
}
