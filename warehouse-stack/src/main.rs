//! The data-warehouse stack synthesizer.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use structopt::StructOpt;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use warehouse_core::context::DeployContext;
use warehouse_core::pipeline::load_pipelines;
use warehouse_stack::config::Config;
use warehouse_stack::stack::{default_pipelines, synthesize};

/// Synthesize the data-warehouse CloudFormation template.
#[derive(StructOpt)]
#[structopt(name = "warehouse-synth")]
struct WarehouseSynth {
    /// Path to a YAML pipelines manifest; defaults to the built-in sample
    /// wiring.
    #[structopt(short = "f", long = "file")]
    file: Option<PathBuf>,
    /// Write the template to this path instead of stdout.
    #[structopt(short = "o", long = "output")]
    output: Option<PathBuf>,
    /// Template output format.
    #[structopt(long, default_value = "json")]
    format: Format,
    /// Enable debug logging.
    #[structopt(short)]
    verbose: bool,
}

enum Format {
    Json,
    Yaml,
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(val: &str) -> Result<Self> {
        match val {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => bail!("unknown format {:?}, expected json or yaml", other),
        }
    }
}

fn main() -> Result<()> {
    let cli = WarehouseSynth::from_args();

    // Initialize logging based on CLI config.
    let fmt_layer = fmt::layer().with_target(true);
    let filter_layer;
    let level_filter;
    if cli.verbose {
        filter_layer = EnvFilter::new("debug");
        level_filter = LevelFilter::DEBUG;
    } else {
        filter_layer = EnvFilter::new("info");
        level_filter = LevelFilter::INFO;
    }
    tracing_subscriber::registry().with(filter_layer).with(fmt_layer).with(level_filter).init();

    let config = Config::new()?;
    let context = DeployContext::from_env()?;
    tracing::info!(
        account = %context.aws_account_id,
        region = %context.aws_region,
        logical_name = %context.logical_name,
        "synthesizing data-warehouse stack",
    );

    let pipelines = match cli.file.or(config.pipelines_file) {
        Some(path) => {
            let manifest =
                fs::read_to_string(&path).with_context(|| format!("error reading pipelines manifest {:?}", path))?;
            load_pipelines(&manifest)?
        }
        None => default_pipelines(),
    };

    let template = synthesize(&context, &pipelines)?;
    let rendered = match cli.format {
        Format::Json => serde_json::to_string_pretty(&template).context("error serializing template to JSON")?,
        Format::Yaml => serde_yaml::to_string(&template).context("error serializing template to YAML")?,
    };

    match cli.output {
        Some(path) => {
            fs::write(&path, &rendered).with_context(|| format!("error writing template to {:?}", path))?;
            tracing::info!(path = %path.display(), "template written");
        }
        None => {
            let mut stdout = std::io::stdout();
            stdout.write_all(rendered.as_bytes()).context("error writing template to stdout")?;
            stdout.write_all(b"\n").context("error writing template to stdout")?;
        }
    }

    Ok(())
}
