use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hotel_aggregator::{
    Cache, CacheBackend, Config, ConfigOverrides, HotelResult, MetaSearchClient, MetaSearchConfig,
    ScraperRegistry, SearchCriteria, SearchResponse,
};

#[derive(Parser)]
#[command(
    name = "hotel-aggregator",
    version,
    about = "Search hotel availability across Booking.com, Hotels.com and Priceline"
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// RapidAPI key for the hosted provider APIs
    #[arg(long, global = true, env = "RAPIDAPI_KEY", hide_env_values = true)]
    rapidapi_key: Option<String>,

    /// Maximum platforms searched at the same time
    #[arg(long, global = true)]
    max_concurrent: Option<usize>,

    /// Delay before every outbound request, in milliseconds
    #[arg(long, global = true)]
    request_delay_ms: Option<u64>,

    /// Cache backend: sled, memory or disabled
    #[arg(long, global = true, value_parser = parse_backend)]
    cache_backend: Option<CacheBackend>,

    /// Directory of the sled cache
    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search all registered platforms, or the subset given with --platform
    Search {
        #[command(flatten)]
        query: SearchArgs,

        /// Platform to include (repeatable)
        #[arg(short, long = "platform")]
        platforms: Vec<String>,
    },

    /// Search a single platform
    SearchPlatform {
        /// Platform name, e.g. "booking"
        platform: String,

        #[command(flatten)]
        query: SearchArgs,
    },

    /// List the registered platforms
    Platforms,

    /// Print JSON Schemas of the request and response types
    Schema,
}

#[derive(Args)]
struct SearchArgs {
    /// City to search in
    #[arg(long)]
    city: String,

    /// Check-in date (YYYY-MM-DD)
    #[arg(long)]
    check_in: NaiveDate,

    /// Check-out date (YYYY-MM-DD)
    #[arg(long)]
    check_out: NaiveDate,

    #[arg(long, default_value_t = 2)]
    guests: u32,

    /// Case-insensitive hotel name substring
    #[arg(long)]
    hotel_name: Option<String>,

    /// Maximum price per night
    #[arg(long)]
    max_price: Option<f64>,

    /// Minimum rating on the 0-5 scale
    #[arg(long)]
    min_rating: Option<f64>,

    #[arg(long, default_value_t = false)]
    free_cancellation: bool,
}

impl SearchArgs {
    fn into_criteria(self, platforms: Vec<String>) -> SearchCriteria {
        let mut criteria = SearchCriteria::new(self.city, self.check_in, self.check_out);
        criteria.guests = self.guests;
        criteria.hotel_name = self.hotel_name;
        criteria.max_price = self.max_price;
        criteria.min_rating = self.min_rating;
        criteria.free_cancellation = self.free_cancellation;
        criteria.platforms = (!platforms.is_empty()).then_some(platforms);
        criteria
    }
}

#[derive(Serialize)]
struct PlatformInfo<'a> {
    name: &'a str,
    description: &'a str,
}

fn parse_backend(value: &str) -> std::result::Result<CacheBackend, String> {
    match value.to_ascii_lowercase().as_str() {
        "sled" => Ok(CacheBackend::Sled),
        "memory" => Ok(CacheBackend::Memory),
        "disabled" | "none" => Ok(CacheBackend::Disabled),
        other => Err(format!("unknown cache backend '{other}'")),
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json || !atty::is(atty::Stream::Stderr) {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to encode output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(&ConfigOverrides {
        rapidapi_key: cli.rapidapi_key.clone(),
        max_concurrent_requests: cli.max_concurrent,
        request_delay_ms: cli.request_delay_ms,
        cache_backend: cli.cache_backend,
        cache_path: cli.cache_path.clone(),
    });
    config.validate().context("Invalid configuration")?;

    init_logging(&cli.log_level, cli.json_logs)?;
    info!("Starting hotel-aggregator v{}", env!("CARGO_PKG_VERSION"));

    if matches!(cli.command, Commands::Schema) {
        return print_json(&serde_json::json!({
            "SearchCriteria": schemars::schema_for!(SearchCriteria),
            "SearchResponse": schemars::schema_for!(SearchResponse),
            "HotelResult": schemars::schema_for!(HotelResult),
        }));
    }

    let cache = Cache::from_config(&config.cache).await;
    let registry = Arc::new(
        ScraperRegistry::from_config(&config, cache.clone())
            .context("Failed to initialize platform adapters")?,
    );
    let client = MetaSearchClient::new(
        registry.clone(),
        MetaSearchConfig::from(&config.search),
    );

    let outcome = run(cli.command, &client).await;

    let failed = registry.close_all().await;
    if !failed.is_empty() {
        warn!("Some adapters failed to release: {}", failed.join(", "));
    }
    cache.disconnect().await;
    info!("Shutdown complete");

    outcome
}

async fn run(command: Commands, client: &MetaSearchClient) -> Result<()> {
    match command {
        Commands::Search { query, platforms } => {
            let criteria = query.into_criteria(platforms);
            criteria.validate()?;
            let response = client.search(&criteria).await?;
            print_json(&response)
        }
        Commands::SearchPlatform { platform, query } => {
            let criteria = query.into_criteria(Vec::new());
            criteria.validate()?;
            let response = client.search_platform(&platform, &criteria).await?;
            print_json(&response)
        }
        Commands::Platforms => {
            let registry = client.registry();
            let adapters = registry.get_all();
            let platforms: Vec<_> = adapters
                .iter()
                .map(|adapter| PlatformInfo {
                    name: adapter.name(),
                    description: adapter.description(),
                })
                .collect();
            print_json(&platforms)
        }
        Commands::Schema => Ok(()),
    }
}
