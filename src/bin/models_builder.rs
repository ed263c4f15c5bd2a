//! Models Builder CLI
//!
//! Generates C# models from a schema export.
//!
//! Usage:
//!   models-builder build --schema schema.json --clean
//!   models-builder status
//!   models-builder --config ./models-builder.toml models

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use models_builder::build::delete_generated_files;
use models_builder::{GeneratorSettings, JsonSchemaSource, ModelsBuilder, ModelsBuilderConfig, ModelsGenerator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "models-builder")]
#[command(about = "Generate strongly typed models from a content-type schema")]
#[command(version)]
struct Cli {
    /// Configuration file, layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate model files
    Build {
        /// Schema export (overrides source.schema_path)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Delete previously generated files first
        #[arg(long)]
        clean: bool,
    },

    /// Delete generated files from the models directory
    Clean,

    /// Show mode, out-of-date state and last build time
    Status,

    /// Print the normalized type models as JSON
    Models {
        /// Schema export (overrides source.schema_path)
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_builder(
    config: &ModelsBuilderConfig,
    schema: Option<PathBuf>,
) -> anyhow::Result<ModelsBuilder<JsonSchemaSource>> {
    let schema_path = schema.unwrap_or_else(|| config.source.schema_path.clone());
    let source = JsonSchemaSource::load(&schema_path)
        .with_context(|| format!("failed to load schema from {}", schema_path.display()))?;
    Ok(ModelsBuilder::new(ModelsGenerator::new(source, config.models.clone())))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ModelsBuilderConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Build { schema, clean } => {
            let builder = load_builder(&config, schema)?;
            let settings = GeneratorSettings {
                delete_generated_files: config.models.delete_generated_files || clean,
                ..builder.generator().default_settings()
            };
            let report = builder.build_models_with(&settings)?;

            for path in &report.deleted {
                println!("  - {}", path.display());
            }
            for path in &report.written {
                println!("  + {}", path.display());
            }
            println!(
                "Wrote {} model(s), deleted {}, skipped {} ignored type(s)",
                report.written.len(),
                report.deleted.len(),
                report.skipped.len()
            );
        }

        Commands::Clean => {
            let deleted = delete_generated_files(&config.models.models_path)?;
            println!("Deleted {} generated file(s)", deleted.len());
        }

        Commands::Status => {
            // status never reads the schema
            let source = JsonSchemaSource::new(Default::default());
            let builder = ModelsBuilder::new(ModelsGenerator::new(source, config.models.clone()));
            println!("{}", serde_json::to_string_pretty(&builder.status())?);
        }

        Commands::Models { schema } => {
            let builder = load_builder(&config, schema)?;
            let generator = builder.generator();
            let models = generator.get_models(&generator.default_settings())?;
            println!("{}", serde_json::to_string_pretty(&models.into_vec())?);
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
