use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use cvewatch::{
    blacklist::Blacklist,
    cache::Cache,
    config::Config,
    enrich::AvdDescriber,
    extractor::KeyExtractor,
    monitor::{Monitor, RunOptions},
    notify::DingTalkNotifier,
    output::{print_summary, print_tracked_table, OutputFormat},
    search::GitHubSearch,
    store::RecordStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cvewatch")]
#[command(
    author,
    version,
    about = "Track GitHub repositories that reference CVE identifiers"
)]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for repositories and record what changed since the last run
    Run {
        /// Search keyword (default from config: "CVE-20")
        #[arg(short, long)]
        query: Option<String>,

        /// Skip the per-CVE follow-up searches
        #[arg(long)]
        no_related: bool,

        /// Do not send notifications for new repositories
        #[arg(long)]
        no_notify: bool,

        /// Directory holding history files and logs
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// List tracked CVEs and their repository counts
    Status {
        /// Directory holding history files and logs
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear the description cache
    ClearCache,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cvewatch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Run {
            query,
            no_related,
            no_notify,
            data_dir,
            format,
        } => {
            let mut config = config;
            if let Some(query) = query {
                config.query = query;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if no_related {
                config.enable_related_query = false;
            }
            if no_notify {
                config.notify.enabled = false;
            }

            let format = OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))?;
            run_monitor(&config, format).await
        }
        Commands::Status { data_dir } => {
            let root = data_dir.unwrap_or(config.data_dir);
            let store = RecordStore::new(root);
            let entries = store
                .tracked()
                .with_context(|| format!("reading {}", store.root().display()))?;
            print_tracked_table(&entries)
        }
        Commands::Config { init, path } => handle_config(init, path, cli.config),
        Commands::ClearCache => {
            let cache = Cache::new();
            cache.clear()?;
            println!("Cache cleared.");
            Ok(())
        }
    }
}

async fn run_monitor(config: &Config, format: OutputFormat) -> Result<()> {
    let blacklist = match Blacklist::load(&config.blacklist_path()) {
        Ok(blacklist) => blacklist,
        Err(e) => {
            error!(error = %format!("{:#}", e), "ignoring unusable blacklist");
            Blacklist::default()
        }
    };
    info!(entries = blacklist.len(), "blacklist loaded");

    let extractor = KeyExtractor::for_today();
    let store = RecordStore::new(&config.data_dir);
    let search = GitHubSearch::new(&config.search);
    let notifier = DingTalkNotifier::new(
        &config.notify,
        config.message_limit,
        Box::new(AvdDescriber::with_cache(Cache::with_ttl_hours(
            config.cache_ttl_hours,
        ))),
    );

    let mut monitor = Monitor::new(&search, &blacklist, &extractor, &store);
    if config.notify.enabled {
        monitor = monitor.with_notifier(&notifier);
    } else {
        warn!("notifications disabled");
    }

    let options = RunOptions {
        query: config.query.clone(),
        related: config.enable_related_query,
        date: Local::now().date_naive(),
    };

    let progress = if format == OutputFormat::Table {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Searching for {}...", options.query));
        Some(pb)
    } else {
        None
    };

    let summary = monitor.run(&options).await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    print_summary(&summary, format)
}

fn handle_config(init: bool, show_path: bool, custom: Option<PathBuf>) -> Result<()> {
    let config_path = custom.unwrap_or_else(Config::config_path);

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save_to(&config_path)?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'cvewatch config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
