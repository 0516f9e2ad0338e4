use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "calign")]
#[command(about = "Calendar session alignment CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate the canonical sessions for an asset class
    Sessions {
        /// Asset class (forex | crypto | equity)
        #[arg(long = "asset-class")]
        asset_class: String,

        /// First date, inclusive (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        start: String,

        /// Last date, inclusive
        #[arg(long)]
        end: String,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Print the session list as JSON instead of a summary
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Filter a CSV of bars, write it into a bundle and validate what was stored
    Ingest {
        #[arg(long = "asset-class")]
        asset_class: String,

        /// Dataset name recorded in the bundle index
        #[arg(long)]
        dataset: String,

        #[arg(long)]
        symbol: String,

        /// Input CSV (timestamp,open,high,low,close,volume)
        #[arg(long)]
        bars: PathBuf,

        /// Bundle root; receives <dataset>/<symbol>.csv and index.json
        #[arg(long)]
        out: PathBuf,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Fail on session mismatch regardless of configured strictness
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Pre-flight check: stored sessions vs canonical sessions for a dataset
    Validate {
        #[arg(long)]
        dataset: String,

        /// Bundle index written by `ingest`
        #[arg(long)]
        index: PathBuf,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Exit non-zero when validation fails
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Write the markdown mismatch report here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Sessions {
            asset_class,
            start,
            end,
            config_paths,
            json,
        } => commands::sessions::run(&asset_class, &start, &end, &config_paths, json),

        Commands::Ingest {
            asset_class,
            dataset,
            symbol,
            bars,
            out,
            start,
            end,
            config_paths,
            strict,
        } => commands::ingest::run(commands::ingest::IngestArgs {
            asset_class,
            dataset,
            symbol,
            bars,
            out,
            start,
            end,
            config_paths,
            strict,
        }),

        Commands::Validate {
            dataset,
            index,
            start,
            end,
            config_paths,
            strict,
            report,
        } => commands::validate::run(commands::validate::ValidateArgs {
            dataset,
            index,
            start,
            end,
            config_paths,
            strict,
            report,
        }),

        Commands::ConfigHash { paths } => {
            let loaded = calign_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
