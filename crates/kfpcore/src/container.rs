use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Container execution specification for one pipeline step.
///
/// This is what pipeline authoring materializes into an executable step:
/// the image, the entrypoint command, the argument list, the environment and
/// the resource envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
            args: Vec::new(),
            env: Vec::new(),
            resources: Resources::default(),
            volume_mounts: Vec::new(),
        }
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set an environment variable, overwriting in place if the name exists.
    /// Returns the previous value.
    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.env.iter_mut().find(|var| var.name == name) {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value)),
            None => {
                self.env.push(EnvVar { name, value });
                None
            }
        }
    }

    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|var| var.name == name)
            .map(|var| var.value.as_str())
    }

    pub fn set_cpu_request(&mut self, cpu: impl Into<String>) {
        self.resources.requests.insert("cpu".to_string(), cpu.into());
    }

    pub fn set_memory_request(&mut self, memory: impl Into<String>) {
        self.resources.requests.insert("memory".to_string(), memory.into());
    }

    /// GPU limits are keyed by vendor, e.g. `nvidia.com/gpu`
    pub fn set_gpu_limit(&mut self, gpus: u32, vendor: &str) {
        self.resources
            .limits
            .insert(format!("{}.com/gpu", vendor), gpus.to_string());
    }

    pub fn add_volume_mount(&mut self, mount: VolumeMount) {
        self.volume_mounts.retain(|existing| existing.name != mount.name);
        self.volume_mounts.push(mount);
    }
}

/// Name/value pair exposed to the container process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resources {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

impl Resources {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.limits.is_empty()
    }
}

/// Scratch volume backed by an emptyDir, mounted into the container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    pub size_limit: Option<String>,
}
