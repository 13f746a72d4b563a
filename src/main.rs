use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use pca_coleta::clock::SystemClock;
use pca_coleta::collector::CollectionJob;
use pca_coleta::config::ResolvedConfig;
use pca_coleta::export;
use pca_coleta::models::Source;
use pca_coleta::store::{ConsolidationStore, JsonFileStore};

#[derive(Parser)]
#[command(name = "pca-coleta")]
#[command(about = "Collects annual procurement plans from the PGC and PNCP portals")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "pca-coleta.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Pgc,
    Pncp,
}

impl From<SourceArg> for Source {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Pgc => Source::Pgc,
            SourceArg::Pncp => Source::Pncp,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run a collection job: open the browser, wait for manual login,
    /// scrape the requested portals and consolidate
    Collect {
        /// Reference year of the procurement plan
        #[arg(long, default_value = "2025")]
        year: String,

        /// Collect a single portal instead of both
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
    },
    /// Consolidate pending raw batches into the canonical store
    Consolidate,
    /// Render canonical records of one portal as semicolon-separated values
    Export {
        #[arg(long, value_enum)]
        source: SourceArg,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let resolved = ResolvedConfig::load_or_default(&cli.config)?;

    match cli.command {
        Command::Collect { year, source } => {
            let sources: Vec<Source> = match source {
                Some(source) => vec![source.into()],
                None => vec![Source::Pgc, Source::Pncp],
            };

            let profile_dir = if resolved.config.session.launch_browser {
                Some(resolved.profile_dir()?)
            } else {
                None
            };
            let store = Arc::new(JsonFileStore::new(
                &resolved.data_dir,
                Arc::new(SystemClock),
            ));

            let job = CollectionJob::new(
                resolved.config.session.clone(),
                resolved.config.waits.clone(),
                resolved.config.scroll.clone(),
                profile_dir,
                store,
                Arc::new(SystemClock),
            )?;

            let report = job.run(&year, &sources).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Consolidate => {
            let store = JsonFileStore::new(&resolved.data_dir, Arc::new(SystemClock));
            let report = store.consolidate().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Export { source, output } => {
            let store = JsonFileStore::new(&resolved.data_dir, Arc::new(SystemClock));
            let records = store.canonical_records().await?;
            let csv = export::to_csv(source.into(), &records);
            match output {
                Some(path) => std::fs::write(&path, csv)?,
                None => print!("{csv}"),
            }
        }
        Command::Config => {
            println!("Config file: {}", cli.config.display());
            println!("Data directory: {}", resolved.data_dir.display());
            println!(
                "Debug endpoint: {}:{}",
                resolved.config.session.debug_host, resolved.config.session.debug_port
            );
            println!("Launch browser: {}", resolved.config.session.launch_browser);
        }
    }

    Ok(())
}
