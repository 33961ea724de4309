// crates/kfpcli/src/main.rs

mod pipeline_file;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kfpnotebook::{NotebookOpFactory, DEFAULT_BOOTSTRAP_SCRIPT_URL, DEFAULT_REQUIREMENTS_URL};
use pipeline_file::PipelineFile;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kfp-notebook")]
#[command(about = "Notebook pipeline step builder", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one op and print its container spec
    Render {
        /// Path to op parameters JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Extra pipeline input file (repeatable)
        #[arg(long = "input")]
        inputs: Vec<String>,

        /// Extra pipeline output file (repeatable)
        #[arg(long = "output")]
        outputs: Vec<String>,

        /// Extra environment variable as KEY=VALUE (repeatable)
        #[arg(long = "env")]
        envs: Vec<String>,
    },

    /// Build every step of a pipeline file and write the compiled pipeline
    Compile {
        /// Path to pipeline JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Where to write the compiled pipeline (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default bootstrap and requirements URLs
    Defaults,

    /// List the parameters a notebook op accepts
    Params,

    /// Create a new example pipeline file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "pipeline.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Render { file, inputs, outputs, envs } => {
            render_op(file, inputs, outputs, envs)?;
        }

        Commands::Compile { file, output } => {
            compile_pipeline(file, output)?;
        }

        Commands::Defaults => {
            println!("bootstrap_script_url: {}", DEFAULT_BOOTSTRAP_SCRIPT_URL);
            println!("requirements_url:     {}", DEFAULT_REQUIREMENTS_URL);
        }

        Commands::Params => {
            list_params();
        }

        Commands::Init { output } => {
            create_example_pipeline(output)?;
        }
    }

    Ok(())
}

fn render_op(file: PathBuf, inputs: Vec<String>, outputs: Vec<String>, envs: Vec<String>) -> Result<()> {
    tracing::debug!("Loading op parameters from {}", file.display());

    let config = pipeline_file::load_op_config(&file)?;
    let mut op = NotebookOpFactory.create(&config)?;

    if !inputs.is_empty() {
        op.add_pipeline_inputs(inputs);
    }
    if !outputs.is_empty() {
        op.add_pipeline_outputs(outputs);
    }
    for raw in &envs {
        let (name, value) = pipeline_file::parse_env_pair(raw)?;
        op.add_environment_variable(name, value);
    }

    println!("{}", serde_json::to_string_pretty(op.container())?);
    Ok(())
}

fn compile_pipeline(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let definition = PipelineFile::load(&file)?;
    let pipeline = definition.compile()?;
    let order = pipeline.execution_order()?;

    tracing::info!("Compiled '{}': {} steps, order: {}", pipeline.name, pipeline.steps.len(), order.join(" -> "));

    let json = serde_json::to_string_pretty(&pipeline)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("✨ Wrote compiled pipeline: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn list_params() {
    let metadata = NotebookOpFactory.metadata();

    println!("📦 {} ({})", NotebookOpFactory.op_type(), metadata.category);
    println!("   {}", metadata.description);
    println!();

    for param in &metadata.params {
        let marker = if param.required { "required" } else { "optional" };
        println!("  • {} [{}]", param.name, marker);
        println!("    {}", param.description);
    }
}

fn create_example_pipeline(output: PathBuf) -> Result<()> {
    let example = pipeline_file::example();

    let json = serde_json::to_string_pretty(&example)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example pipeline: {}", output.display());
    println!();
    println!("Compile it with:");
    println!("  kfp-notebook compile --file {}", output.display());

    Ok(())
}
