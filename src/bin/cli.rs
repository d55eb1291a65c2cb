//! nextbike scraper CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use nextbike::{
    error::Result,
    models::{Bike, City, Config, Country, EntityKind, Organization, ScrapeConfig, Station},
    pipeline::ScrapeScheduler,
    services::Session,
    storage::{SnapshotLogger, snapshot},
};

/// nextbike - live bike-sharing feed scraper
#[derive(Parser, Debug)]
#[command(
    name = "nextbike",
    version,
    about = "Scrape the nextbike live feed into timestamped snapshots"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "nextbike.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the feed once and print the selected entities
    Fetch {
        #[command(flatten)]
        selectors: Selectors,

        /// Print full JSON instead of one-line summaries
        #[arg(long)]
        json: bool,
    },

    /// Log the selected entities periodically until Ctrl-C
    Scrape {
        #[command(flatten)]
        selectors: Selectors,

        /// Seconds between the end of one cycle and the start of the next
        #[arg(long)]
        interval: Option<u64>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Load a snapshot file and print its summary
    Load {
        /// Entity kind stored in the file (country, organization, city, station, bike)
        #[arg(long)]
        kind: EntityKind,

        path: PathBuf,
    },

    /// Validate the configuration file
    Validate,
}

/// Selectors added on top of the configured ones.
#[derive(Args, Debug, Default)]
struct Selectors {
    /// Country code, e.g. DE
    #[arg(long = "country")]
    countries: Vec<String>,

    /// Organization name
    #[arg(long = "organization")]
    organizations: Vec<String>,

    /// City uid
    #[arg(long = "city")]
    cities: Vec<u64>,

    /// Station uid
    #[arg(long = "station")]
    stations: Vec<u64>,

    /// Bike number
    #[arg(long = "bike")]
    bikes: Vec<u64>,
}

impl Selectors {
    fn merge_into(self, mut scrape: ScrapeConfig) -> ScrapeConfig {
        scrape.country_codes.extend(self.countries);
        scrape.organization_names.extend(self.organizations);
        scrape.city_ids.extend(self.cities);
        scrape.station_ids.extend(self.stations);
        scrape.bike_ids.extend(self.bikes);
        scrape
    }
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Read the config file if there is one, defaults otherwise.
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        Ok(Config::default())
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(cli.verbose, &config.logging.level);

    if cli.config.exists() {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::info!("{} not found, using defaults", cli.config.display());
    }

    match cli.command {
        Command::Fetch { selectors, json } => {
            config.validate()?;
            let session = Session::http(&config.feed)?;
            let refresh = session.refresh().await?;
            log::info!("{}", refresh.graph.stats());

            // Only the command-line selectors apply to a one-shot fetch.
            let wanted = selectors.merge_into(ScrapeConfig::default());
            let selection = refresh.graph.select(&wanted);
            for (kind, id) in &selection.missing {
                log::warn!("No {} with id '{}' in the feed", kind, id);
            }
            for target in &selection.targets {
                if json {
                    let bytes = snapshot::to_snapshot_json(&target.entity)?;
                    print!("{}", String::from_utf8_lossy(&bytes));
                } else {
                    println!("{}", target.entity);
                }
            }
        }

        Command::Scrape {
            selectors,
            interval,
            once,
        } => {
            let mut config = config;
            config.scrape = selectors.merge_into(config.scrape);
            if let Some(interval) = interval {
                config.scrape.interval_secs = interval;
            }
            config.validate()?;

            if config.scrape.selector_count() == 0 {
                log::warn!("No entities selected, cycles will only refresh the feed");
            }

            let session = Arc::new(Session::http(&config.feed)?);
            let logger = SnapshotLogger::local(&config.storage.log_root);
            let scheduler = ScrapeScheduler::new(session, logger);
            log::info!("Writing snapshots to {}", config.storage.log_root.display());

            if once {
                let report = scheduler.run_once(&config.scrape).await;
                log::info!(
                    "Cycle done: {} written, {} already logged, {} failed",
                    report.written.len(),
                    report.already_logged.len(),
                    report.failures.len()
                );
                if let Some(reason) = report.skipped {
                    log::error!("Cycle skipped: {}", reason);
                }
                return Ok(());
            }

            let grace = Duration::from_secs(config.scrape.shutdown_grace_secs);
            let handle = scheduler.start(config.scrape);

            tokio::signal::ctrl_c().await?;
            log::info!("Interrupted, stopping after the running cycle...");

            let shutdown = handle.shutdown(grace).await;
            if shutdown.aborted {
                log::warn!("Running cycle aborted after {:?}", grace);
            }
            log::info!("Completed {} cycles", shutdown.cycles);
        }

        Command::Load { kind, path } => {
            let summary = match kind {
                EntityKind::Country => snapshot::load_snapshot_file::<Country>(&path)?.to_string(),
                EntityKind::Organization => {
                    snapshot::load_snapshot_file::<Organization>(&path)?.to_string()
                }
                EntityKind::City => snapshot::load_snapshot_file::<City>(&path)?.to_string(),
                EntityKind::Station => snapshot::load_snapshot_file::<Station>(&path)?.to_string(),
                EntityKind::Bike => snapshot::load_snapshot_file::<Bike>(&path)?.to_string(),
            };
            println!("{}", summary);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} selectors, every {}s, logging to {})",
                config.scrape.selector_count(),
                config.scrape.interval_secs,
                config.storage.log_root.display()
            );
        }
    }

    Ok(())
}
