// crates/kfpcli/src/pipeline_file.rs

use anyhow::{anyhow, bail, Context, Result};
use kfpcore::{Pipeline, Value};
use kfpnotebook::NotebookOpFactory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Pipeline definition as written by users.
///
/// `defaults` is merged under every step, so shared object-storage settings
/// and the image only have to be written once. Keys set on a step win.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub defaults: serde_json::Map<String, serde_json::Value>,
    pub steps: Vec<StepEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl PipelineFile {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid pipeline file {}", path.display()))
    }

    /// Build every step and wire dependencies. Fails on the first invalid
    /// step, naming it.
    pub fn compile(&self) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(self.name.clone());
        pipeline.description = self.description.clone();

        let mut wiring = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            let config = self.step_config(step);
            let label = config
                .get("name")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| format!("#{}", index + 1));

            let op = NotebookOpFactory
                .create(&config)
                .map_err(|e| anyhow!("Step {}: {}", label, e))?;
            wiring.push((op.name().to_string(), &step.after));
            pipeline.add_step(op)?;
        }

        for (name, upstreams) in wiring {
            for upstream in upstreams {
                pipeline.after(&name, upstream)?;
            }
        }

        pipeline.execution_order()?;
        Ok(pipeline)
    }

    fn step_config(&self, step: &StepEntry) -> HashMap<String, Value> {
        let mut merged = self.defaults.clone();
        for (key, value) in &step.params {
            merged.insert(key.clone(), value.clone());
        }
        merged
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect()
    }
}

/// Read a single op's parameters from a JSON object file
pub fn load_op_config(path: &Path) -> Result<HashMap<String, Value>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: serde_json::Value = serde_json::from_str(&json)?;

    match Value::from(parsed) {
        Value::Object(map) => Ok(map),
        other => bail!("Op file must be a JSON object, got {}", other.type_name()),
    }
}

/// Split `KEY=VALUE`
pub fn parse_env_pair(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", raw))?;
    if name.trim().is_empty() {
        bail!("Empty variable name in '{}'", raw);
    }
    Ok((name.trim().to_string(), value.to_string()))
}

pub fn example() -> PipelineFile {
    let defaults = serde_json::json!({
        "cos_endpoint": "http://minio-service:9000",
        "cos_bucket": "notebooks",
        "cos_directory": "example-run",
        "image": "jupyter/scipy-notebook:latest"
    });
    let steps = serde_json::json!([
        {
            "name": "load data",
            "notebook": "load_data.ipynb",
            "cos_dependencies_archive": "load_data.tar.gz",
            "pipeline_outputs": "data.csv"
        },
        {
            "name": "train",
            "notebook": "train.ipynb",
            "cos_dependencies_archive": "train.tar.gz",
            "pipeline_inputs": ["data.csv"],
            "pipeline_outputs": ["model.pkl"],
            "pipeline_envs": { "EPOCHS": "10" },
            "mem_request": 4,
            "after": ["load data"]
        }
    ]);

    PipelineFile {
        name: "Example notebook pipeline".to_string(),
        description: Some("Loads a dataset and trains a model on it".to_string()),
        defaults: match defaults {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
        steps: serde_json::from_value(steps).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn example_compiles_in_dependency_order() {
        let pipeline = example().compile().unwrap();
        assert_eq!(pipeline.steps.len(), 2);
        assert_eq!(pipeline.execution_order().unwrap(), vec!["load data", "train"]);

        let train = pipeline.find_step("train").unwrap();
        assert!(train.args[0].contains("--inputs \"data.csv\""));
        assert!(train.args[0].contains("--cos-bucket \"notebooks\""));
        assert_eq!(train.env_value("EPOCHS"), Some("10"));
    }

    #[test]
    fn example_round_trips_through_disk() {
        let json = serde_json::to_string_pretty(&example()).unwrap();
        let file = write_temp(&json);

        let loaded = PipelineFile::load(file.path()).unwrap();
        assert_eq!(loaded.steps.len(), 2);
        assert_eq!(loaded.steps[1].after, vec!["load data"]);
    }

    #[test]
    fn step_values_override_defaults() {
        let mut file = example();
        file.steps[0]
            .params
            .insert("image".to_string(), serde_json::json!("custom/image:1"));

        let pipeline = file.compile().unwrap();
        assert_eq!(pipeline.find_step("load data").unwrap().image, "custom/image:1");
        assert_eq!(pipeline.find_step("train").unwrap().image, "jupyter/scipy-notebook:latest");
    }

    #[test]
    fn invalid_step_is_named() {
        let mut file = example();
        file.steps[1].params.remove("notebook");

        let err = file.compile().unwrap_err().to_string();
        assert!(err.contains("train"), "{}", err);
        assert!(err.contains("notebook"), "{}", err);
    }

    #[test]
    fn unknown_upstream_fails() {
        let mut file = example();
        file.steps[1].after = vec!["ghost".to_string()];
        assert!(file.compile().is_err());
    }

    #[test]
    fn op_config_must_be_object() {
        let file = write_temp("[1, 2]");
        assert!(load_op_config(file.path()).is_err());

        let file = write_temp(r#"{"name": "x", "gpu_limit": 1}"#);
        let config = load_op_config(file.path()).unwrap();
        assert_eq!(config["gpu_limit"].as_f64(), Some(1.0));
    }

    #[test]
    fn env_pairs() {
        assert_eq!(parse_env_pair("A=1=2").unwrap(), ("A".to_string(), "1=2".to_string()));
        assert!(parse_env_pair("A").is_err());
        assert!(parse_env_pair("=1").is_err());
    }
}
