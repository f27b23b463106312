use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use schema_diff::config::{self, Config, OutputFormat};
use schema_diff::utils::logging::init_logging;
use schema_diff::SchemaDiffClient;

/// Compare two SQL schema dumps and generate a migration script
#[derive(Debug, Parser)]
#[command(name = "schema_diff", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate the script that moves CURRENT towards TARGET
    Diff {
        /// Schema dump of the current (production) database
        #[arg(long)]
        current: PathBuf,

        /// Schema dump of the target (staging) database
        #[arg(long)]
        target: PathBuf,

        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the parsed schema model of a dump as JSON
    Parse {
        /// Schema dump to parse
        file: PathBuf,

        /// Write the model here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn write_output(text: &str, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => fs::write(&path, text)
            .with_context(|| format!("Failed to write output to {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_logging(&config.logging)?;

    let default_output = config.output.file.clone().map(PathBuf::from);
    let format = config.output.format;
    let client = SchemaDiffClient::new(config);

    match cli.command {
        Commands::Diff {
            current,
            target,
            output,
        } => {
            let script = client.diff_files(&current, &target).context(
                "An error occurred while processing the schemas; \
                 check that both files are valid schema dumps",
            )?;
            write_output(&script, output.or(default_output))?;
            tracing::info!("Script generated successfully");
        }

        Commands::Parse { file, output } => {
            let report = client.parse_file(&file)?;
            let json = match format {
                OutputFormat::Json => serde_json::to_string(&report)?,
                OutputFormat::Pretty => serde_json::to_string_pretty(&report)?,
            };
            write_output(&json, output.or(default_output))?;
        }
    }

    Ok(())
}
