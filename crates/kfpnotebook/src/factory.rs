use crate::artifacts::ArtifactList;
use crate::notebook_op::{NotebookOp, NotebookOpBuilder};
use kfpcore::{OpError, Value};
use std::collections::HashMap;

/// Builds [`NotebookOp`]s from untyped configuration, e.g. a step entry in a
/// pipeline file. A key that is absent (or `null`) counts as omitted.
pub struct NotebookOpFactory;

/// Metadata about the parameters the factory understands
#[derive(Debug, Clone)]
pub struct OpMetadata {
    pub description: String,
    pub category: String,
    pub params: Vec<ParamDefinition>,
}

#[derive(Debug, Clone)]
pub struct ParamDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

const PARAMS: &[ParamDefinition] = &[
    ParamDefinition { name: "name", description: "Step name; letters, digits, spaces, '_' and '-', starting with a letter", required: true },
    ParamDefinition { name: "notebook", description: "Path of the notebook to execute", required: true },
    ParamDefinition { name: "cos_endpoint", description: "Object storage endpoint URL", required: true },
    ParamDefinition { name: "cos_bucket", description: "Object storage bucket", required: true },
    ParamDefinition { name: "cos_directory", description: "Working directory inside the bucket", required: true },
    ParamDefinition { name: "cos_dependencies_archive", description: "Archive holding the notebook's dependencies", required: true },
    ParamDefinition { name: "image", description: "Container image the notebook runs in", required: true },
    ParamDefinition { name: "bootstrap_script_url", description: "Bootstrapper script to download", required: false },
    ParamDefinition { name: "requirements_url", description: "Requirements file installed before the run", required: false },
    ParamDefinition { name: "pipeline_inputs", description: "Files consumed from upstream steps (string or array)", required: false },
    ParamDefinition { name: "pipeline_outputs", description: "Files produced for downstream steps (string or array)", required: false },
    ParamDefinition { name: "pipeline_envs", description: "Environment variables (object)", required: false },
    ParamDefinition { name: "cpu_request", description: "CPU request, e.g. \"500m\"", required: false },
    ParamDefinition { name: "mem_request", description: "Memory request in GB", required: false },
    ParamDefinition { name: "gpu_limit", description: "Number of GPUs", required: false },
    ParamDefinition { name: "emptydir_volume_size", description: "Size of the scratch workspace volume, e.g. \"20Gi\"", required: false },
];

impl NotebookOpFactory {
    pub fn op_type(&self) -> &str {
        "notebook.run"
    }

    pub fn metadata(&self) -> OpMetadata {
        OpMetadata {
            description: "Execute a Jupyter notebook in a container through the bootstrapper".to_string(),
            category: "notebook".to_string(),
            params: PARAMS.to_vec(),
        }
    }

    /// Create a validated op from configuration
    pub fn create(&self, config: &HashMap<String, Value>) -> Result<NotebookOp, OpError> {
        for key in config.keys() {
            if !PARAMS.iter().any(|p| p.name == key.as_str()) {
                tracing::warn!("Ignoring unknown notebook op parameter: {}", key);
            }
        }

        let mut builder = NotebookOpBuilder::new();

        if let Some(v) = text(config, "name")? {
            builder = builder.name(v);
        }
        if let Some(v) = text(config, "notebook")? {
            builder = builder.notebook(v);
        }
        if let Some(v) = text(config, "cos_endpoint")? {
            builder = builder.cos_endpoint(v);
        }
        if let Some(v) = text(config, "cos_bucket")? {
            builder = builder.cos_bucket(v);
        }
        if let Some(v) = text(config, "cos_directory")? {
            builder = builder.cos_directory(v);
        }
        if let Some(v) = text(config, "cos_dependencies_archive")? {
            builder = builder.cos_dependencies_archive(v);
        }
        if let Some(v) = text(config, "image")? {
            builder = builder.image(v);
        }
        if let Some(v) = text(config, "bootstrap_script_url")? {
            builder = builder.bootstrap_script_url(v);
        }
        if let Some(v) = text(config, "requirements_url")? {
            builder = builder.requirements_url(v);
        }
        if let Some(v) = artifacts(config, "pipeline_inputs")? {
            builder = builder.pipeline_inputs(v);
        }
        if let Some(v) = artifacts(config, "pipeline_outputs")? {
            builder = builder.pipeline_outputs(v);
        }
        if let Some(pairs) = env_pairs(config, "pipeline_envs")? {
            builder = builder.pipeline_envs(pairs);
        }
        if let Some(v) = text(config, "cpu_request")? {
            builder = builder.cpu_request(v);
        }
        if let Some(v) = number(config, "mem_request")? {
            builder = builder.mem_request(v);
        }
        if let Some(v) = number(config, "gpu_limit")? {
            if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
                return Err(OpError::invalid("gpu_limit", format!("expected a whole number, got {}", v)));
            }
            builder = builder.gpu_limit(v as u32);
        }
        if let Some(v) = text(config, "emptydir_volume_size")? {
            builder = builder.emptydir_volume_size(v);
        }

        builder.build()
    }
}

fn present<'a>(config: &'a HashMap<String, Value>, key: &str) -> Option<&'a Value> {
    config.get(key).filter(|v| !v.is_null())
}

fn wrong_type(key: &str, expected: &str, actual: &Value) -> OpError {
    OpError::invalid(key, format!("expected {}, got {}", expected, actual.type_name()))
}

fn text(config: &HashMap<String, Value>, key: &str) -> Result<Option<String>, OpError> {
    present(config, key)
        .map(|v| v.to_text().ok_or_else(|| wrong_type(key, "string", v)))
        .transpose()
}

fn number(config: &HashMap<String, Value>, key: &str) -> Result<Option<f64>, OpError> {
    present(config, key)
        .map(|v| match v {
            Value::Number(n) => Ok(*n),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| OpError::invalid(key, format!("expected a number, got {:?}", s))),
            other => Err(wrong_type(key, "number", other)),
        })
        .transpose()
}

fn artifacts(config: &HashMap<String, Value>, key: &str) -> Result<Option<ArtifactList>, OpError> {
    present(config, key)
        .map(|v| match v {
            Value::String(s) => Ok(ArtifactList::parse(s)),
            Value::Array(items) => {
                let names = items
                    .iter()
                    .map(|item| item.as_str().ok_or_else(|| wrong_type(key, "array of strings", item)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names.into_iter().collect())
            }
            other => Err(wrong_type(key, "string or array", other)),
        })
        .transpose()
}

fn env_pairs(config: &HashMap<String, Value>, key: &str) -> Result<Option<Vec<(String, String)>>, OpError> {
    present(config, key)
        .map(|v| {
            let map = v.as_object().ok_or_else(|| wrong_type(key, "object", v))?;
            // HashMap order is arbitrary; sort so the rendered env is stable
            let mut pairs = map
                .iter()
                .map(|(name, value)| {
                    value
                        .to_text()
                        .map(|text| (name.clone(), text))
                        .ok_or_else(|| wrong_type(key, "scalar values", value))
                })
                .collect::<Result<Vec<_>, _>>()?;
            pairs.sort();
            Ok(pairs)
        })
        .transpose()
}
