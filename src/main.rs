//! apigw-sync CLI entrypoint
//! Parses command-line arguments and dispatches to the resolver or an
//! in-memory gateway dry run.
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use apigw_sync::application::{GatewayService, ImportRequest};
use apigw_sync::core::Settings;
use apigw_sync::gateway::Directories;
use apigw_sync::infrastructure::memory::InMemoryGateway;
use apigw_sync::infrastructure::openapi::FileDocumentLoader;
use apigw_sync::openapi::{ReferenceResolver, ResolutionMode};
use clap::{Parser, ValueEnum};
use serde_json::json;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apigw-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to <config dir>/apigw-sync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging; repeat for trace output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Inline every $ref of an OpenAPI document
    Resolve {
        /// Root document (JSON or YAML)
        file: PathBuf,
        /// Fail on the first unresolvable reference
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a document into an in-memory gateway and print the result
    Plan {
        /// OpenAPI or full API document
        file: PathBuf,
        /// Name for the new API
        #[arg(long)]
        api_name: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::Resolve {
            file,
            strict,
            format,
            output,
        } => resolve(settings, file, strict, format, output).await,
        Commands::Plan { file, api_name } => plan(settings, file, api_name).await,
    }
}

async fn resolve(
    settings: Settings,
    file: PathBuf,
    strict: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut options = settings.resolution;
    if strict {
        options.mode = ResolutionMode::Strict;
    }

    let resolver = ReferenceResolver::new(Arc::new(FileDocumentLoader::new()), options);
    let document = resolver
        .load(&file)
        .await
        .with_context(|| format!("Failed to resolve {}", file.display()))?;

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&document)?,
        OutputFormat::Yaml => serde_yaml::to_string(&document)?,
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Resolved document written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn plan(settings: Settings, file: PathBuf, api_name: Option<String>) -> anyhow::Result<()> {
    let gateway = Arc::new(InMemoryGateway::new());
    let service = GatewayService::new(
        Directories::from_gateway(gateway),
        Arc::new(FileDocumentLoader::new()),
        settings,
    );

    let response = service
        .import_file(ImportRequest {
            path: file.clone(),
            api_name,
        })
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;
    let endpoints = service
        .list_endpoints(&response.api.id)
        .await
        .context("Failed to list endpoints")?;

    info!(
        "Dry run created {} endpoint(s) on {}",
        endpoints.len(),
        response.api.name
    );
    let report = json!({
        "import": response,
        "endpoints": endpoints,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
