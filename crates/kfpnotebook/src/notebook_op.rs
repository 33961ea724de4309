use crate::artifacts::ArtifactList;
use kfpcore::{ContainerSpec, OpError, VolumeMount};
use regex::Regex;
use std::path::Path;

pub const DEFAULT_BOOTSTRAP_SCRIPT_URL: &str =
    "https://raw.githubusercontent.com/elyra-ai/kfp-notebook/v0.9.1/etc/docker-scripts/bootstrapper.py";
pub const DEFAULT_REQUIREMENTS_URL: &str =
    "https://raw.githubusercontent.com/elyra-ai/kfp-notebook/v0.9.1/etc/requirements-elyra.txt";

/// Env variable selecting the GPU vendor for `gpu_limit`
pub const GPU_VENDOR_ENV: &str = "GPU_VENDOR";
pub const DEFAULT_GPU_VENDOR: &str = "nvidia";

pub const WORKSPACE_VOLUME_NAME: &str = "workspace";
pub const WORKSPACE_MOUNT_PATH: &str = "/workspace";

const CONTAINER_WORK_DIR: &str = "./jupyter-work-dir/";
const VALID_NAME: &str = r"^[A-Za-z][A-Za-z0-9\s_-]*$";

/// Collects the parameters of a [`NotebookOp`].
///
/// Nothing is checked until [`build`](Self::build); a parameter that was never
/// set counts as omitted.
#[derive(Debug, Clone, Default)]
pub struct NotebookOpBuilder {
    name: Option<String>,
    notebook: Option<String>,
    cos_endpoint: Option<String>,
    cos_bucket: Option<String>,
    cos_directory: Option<String>,
    cos_dependencies_archive: Option<String>,
    image: Option<String>,
    bootstrap_script_url: Option<String>,
    requirements_url: Option<String>,
    pipeline_inputs: ArtifactList,
    pipeline_outputs: ArtifactList,
    pipeline_envs: Vec<(String, String)>,
    cpu_request: Option<String>,
    mem_request: Option<f64>,
    gpu_limit: Option<u32>,
    emptydir_volume_size: Option<String>,
}

impl NotebookOpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn notebook(mut self, notebook: impl Into<String>) -> Self {
        self.notebook = Some(notebook.into());
        self
    }

    pub fn cos_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.cos_endpoint = Some(endpoint.into());
        self
    }

    pub fn cos_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.cos_bucket = Some(bucket.into());
        self
    }

    pub fn cos_directory(mut self, directory: impl Into<String>) -> Self {
        self.cos_directory = Some(directory.into());
        self
    }

    pub fn cos_dependencies_archive(mut self, archive: impl Into<String>) -> Self {
        self.cos_dependencies_archive = Some(archive.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn bootstrap_script_url(mut self, url: impl Into<String>) -> Self {
        self.bootstrap_script_url = Some(url.into());
        self
    }

    pub fn requirements_url(mut self, url: impl Into<String>) -> Self {
        self.requirements_url = Some(url.into());
        self
    }

    pub fn pipeline_inputs(mut self, inputs: impl Into<ArtifactList>) -> Self {
        self.pipeline_inputs = inputs.into();
        self
    }

    pub fn pipeline_outputs(mut self, outputs: impl Into<ArtifactList>) -> Self {
        self.pipeline_outputs = outputs.into();
        self
    }

    pub fn pipeline_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pipeline_envs.push((name.into(), value.into()));
        self
    }

    pub fn pipeline_envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.pipeline_envs
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Kubernetes CPU quantity, e.g. `"500m"` or `"2"`
    pub fn cpu_request(mut self, cpu: impl Into<String>) -> Self {
        self.cpu_request = Some(cpu.into());
        self
    }

    /// Memory request in GB
    pub fn mem_request(mut self, gigabytes: f64) -> Self {
        self.mem_request = Some(gigabytes);
        self
    }

    pub fn gpu_limit(mut self, gpus: u32) -> Self {
        self.gpu_limit = Some(gpus);
        self
    }

    /// Size limit of the scratch emptyDir volume, e.g. `"20Gi"`
    pub fn emptydir_volume_size(mut self, size: impl Into<String>) -> Self {
        self.emptydir_volume_size = Some(size.into());
        self
    }

    /// Validate every parameter and assemble the container spec.
    ///
    /// Checks run in a fixed order and the first violation is returned:
    /// omitted required parameters, then the step name, the notebook path,
    /// the object-storage fields, the image, and finally resources.
    pub fn build(self) -> Result<NotebookOp, OpError> {
        let notebook = require(self.notebook, "notebook")?;
        let cos_endpoint = require(self.cos_endpoint, "cos_endpoint")?;
        let cos_bucket = require(self.cos_bucket, "cos_bucket")?;
        let cos_directory = require(self.cos_directory, "cos_directory")?;
        let cos_dependencies_archive =
            require(self.cos_dependencies_archive, "cos_dependencies_archive")?;
        let name = require(self.name, "name")?;

        validate_name(&name)?;

        if notebook.trim().is_empty() {
            return Err(OpError::Construction(
                "You need to provide a notebook.".to_string(),
            ));
        }

        for (field, value) in [
            ("cos_endpoint", &cos_endpoint),
            ("cos_bucket", &cos_bucket),
            ("cos_directory", &cos_directory),
            ("cos_dependencies_archive", &cos_dependencies_archive),
        ] {
            if value.trim().is_empty() {
                return Err(OpError::invalid(field, "must not be empty"));
            }
        }

        let image = self
            .image
            .filter(|image| !image.trim().is_empty())
            .ok_or_else(|| OpError::invalid("image", "You need to provide an image."))?;

        let bootstrap_script_url = self
            .bootstrap_script_url
            .unwrap_or_else(|| DEFAULT_BOOTSTRAP_SCRIPT_URL.to_string());
        let requirements_url = self
            .requirements_url
            .unwrap_or_else(|| DEFAULT_REQUIREMENTS_URL.to_string());

        let mut container = ContainerSpec::new(name.clone(), image.clone()).with_command(["sh", "-c"]);
        for (env_name, env_value) in self.pipeline_envs {
            container.set_env(env_name, env_value);
        }

        if let Some(cpu) = self.cpu_request {
            if cpu.trim().is_empty() {
                return Err(OpError::invalid("cpu_request", "must not be empty"));
            }
            container.set_cpu_request(cpu.trim());
        }

        if let Some(gigabytes) = self.mem_request {
            if !gigabytes.is_finite() || gigabytes <= 0.0 {
                return Err(OpError::invalid(
                    "mem_request",
                    format!("expected a positive number of GB, got {}", gigabytes),
                ));
            }
            container.set_memory_request(format!("{}G", gigabytes));
        }

        if let Some(gpus) = self.gpu_limit {
            if gpus == 0 {
                return Err(OpError::invalid("gpu_limit", "expected at least one GPU"));
            }
            let vendor = container
                .env_value(GPU_VENDOR_ENV)
                .unwrap_or(DEFAULT_GPU_VENDOR)
                .to_string();
            container.set_gpu_limit(gpus, &vendor);
        }

        if let Some(size) = self.emptydir_volume_size {
            if size.trim().is_empty() {
                return Err(OpError::invalid("emptydir_volume_size", "must not be empty"));
            }
            container.add_volume_mount(VolumeMount {
                name: WORKSPACE_VOLUME_NAME.to_string(),
                mount_path: WORKSPACE_MOUNT_PATH.to_string(),
                size_limit: Some(size.trim().to_string()),
            });
        }

        let mut op = NotebookOp {
            name,
            notebook,
            cos_endpoint,
            cos_bucket,
            cos_directory,
            cos_dependencies_archive,
            image,
            bootstrap_script_url,
            requirements_url,
            pipeline_inputs: self.pipeline_inputs,
            pipeline_outputs: self.pipeline_outputs,
            container,
        };
        op.refresh_args();

        tracing::debug!("Constructed notebook op '{}' for {}", op.name, op.notebook);
        Ok(op)
    }
}

/// A validated pipeline step that runs one notebook through the bootstrapper.
///
/// The container arguments are derived state: every mutator that touches the
/// input or output lists re-renders them before returning, so
/// [`container`](Self::container) never shows a stale argument line.
#[derive(Debug, Clone, PartialEq)]
pub struct NotebookOp {
    name: String,
    notebook: String,
    cos_endpoint: String,
    cos_bucket: String,
    cos_directory: String,
    cos_dependencies_archive: String,
    image: String,
    bootstrap_script_url: String,
    requirements_url: String,
    pipeline_inputs: ArtifactList,
    pipeline_outputs: ArtifactList,
    container: ContainerSpec,
}

impl NotebookOp {
    pub fn builder() -> NotebookOpBuilder {
        NotebookOpBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notebook(&self) -> &str {
        &self.notebook
    }

    pub fn cos_endpoint(&self) -> &str {
        &self.cos_endpoint
    }

    pub fn cos_bucket(&self) -> &str {
        &self.cos_bucket
    }

    pub fn cos_directory(&self) -> &str {
        &self.cos_directory
    }

    pub fn cos_dependencies_archive(&self) -> &str {
        &self.cos_dependencies_archive
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn bootstrap_script_url(&self) -> &str {
        &self.bootstrap_script_url
    }

    pub fn requirements_url(&self) -> &str {
        &self.requirements_url
    }

    pub fn pipeline_inputs(&self) -> &ArtifactList {
        &self.pipeline_inputs
    }

    pub fn pipeline_outputs(&self) -> &ArtifactList {
        &self.pipeline_outputs
    }

    pub fn container(&self) -> &ContainerSpec {
        &self.container
    }

    pub fn into_container(self) -> ContainerSpec {
        self.container
    }

    /// File name of the notebook, without its directory
    pub fn notebook_name(&self) -> &str {
        Path::new(&self.notebook)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.notebook)
    }

    /// Executed copy of the notebook the bootstrapper uploads
    pub fn notebook_result(&self) -> String {
        format!("{}-output.ipynb", self.notebook_stem())
    }

    /// HTML rendering of the executed notebook
    pub fn notebook_html(&self) -> String {
        format!("{}.html", self.notebook_stem())
    }

    pub fn add_pipeline_inputs(&mut self, inputs: impl Into<ArtifactList>) {
        self.pipeline_inputs.extend(inputs);
        self.refresh_args();
        tracing::debug!("Step '{}' inputs: {}", self.name, self.pipeline_inputs);
    }

    pub fn add_pipeline_outputs(&mut self, outputs: impl Into<ArtifactList>) {
        self.pipeline_outputs.extend(outputs);
        self.refresh_args();
        tracing::debug!("Step '{}' outputs: {}", self.name, self.pipeline_outputs);
    }

    /// Last write wins; a new name goes to the end of `container().env`
    pub fn add_environment_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Some(previous) = self.container.set_env(name.clone(), value) {
            tracing::debug!("Step '{}' overwrote env {} (was {:?})", self.name, name, previous);
        }
    }

    fn notebook_stem(&self) -> &str {
        Path::new(&self.notebook)
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.notebook)
    }

    fn refresh_args(&mut self) {
        self.container.args = vec![self.render_command_line()];
    }

    fn render_command_line(&self) -> String {
        let mut parts = vec![
            format!("mkdir -p {dir} && cd {dir}", dir = CONTAINER_WORK_DIR),
            format!(
                "curl -H \"Cache-Control: no-cache\" -L {} --output bootstrapper.py",
                quote(&self.bootstrap_script_url)
            ),
            format!(
                "curl -H \"Cache-Control: no-cache\" -L {} --output requirements-elyra.txt",
                quote(&self.requirements_url)
            ),
            "python3 -m pip install packaging".to_string(),
            "python3 -m pip freeze > requirements-current.txt".to_string(),
        ];

        let mut bootstrap = vec![
            "python3 bootstrapper.py".to_string(),
            flag("--cos-endpoint", &self.cos_endpoint),
            flag("--cos-bucket", &self.cos_bucket),
            flag("--cos-directory", &self.cos_directory),
            flag("--cos-dependencies-archive", &self.cos_dependencies_archive),
            flag("--file", &self.notebook),
        ];
        if !self.pipeline_inputs.is_empty() {
            bootstrap.push(flag("--inputs", &self.pipeline_inputs.to_string()));
        }
        if !self.pipeline_outputs.is_empty() {
            bootstrap.push(flag("--outputs", &self.pipeline_outputs.to_string()));
        }
        parts.push(bootstrap.join(" "));

        parts.join(" && ")
    }
}

impl From<NotebookOp> for ContainerSpec {
    fn from(op: NotebookOp) -> Self {
        op.into_container()
    }
}

fn require(value: Option<String>, field: &str) -> Result<String, OpError> {
    value.ok_or_else(|| OpError::missing(field))
}

fn validate_name(name: &str) -> Result<(), OpError> {
    let pattern = Regex::new(VALID_NAME).map_err(|e| OpError::Construction(e.to_string()))?;
    if !pattern.is_match(name) {
        return Err(OpError::invalid(
            "name",
            format!(
                "Only letters, numbers, spaces, \"_\", and \"-\" are allowed in name. Must begin with a letter: {:?}",
                name
            ),
        ));
    }
    Ok(())
}

fn flag(name: &str, value: &str) -> String {
    format!("{} {}", name, quote(value))
}

/// Double-quote for `sh`, escaping the characters still special inside quotes
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
