use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use rendezvous::history::HistoryItem;
use rendezvous::{
    Catalog, CatalogPlaceProvider, FjallStore, Location, LocationResolver, RendezvousConfig,
    SearchParams, SearchResult, Services, SharedProvider, SharedStore, VenueCategory,
};

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Find venues halfway between two locations", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for search history and preferences
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for venues around the midpoint of two locations
    Search {
        /// First location (address or "lat,lng")
        #[arg(long)]
        from: String,

        /// Second location (address or "lat,lng")
        #[arg(long)]
        to: String,

        /// Venue category, repeatable (defaults to the last selection)
        #[arg(short, long = "category")]
        categories: Vec<VenueCategory>,

        /// Search radius in meters
        #[arg(short, long)]
        radius: Option<u32>,

        /// Maximum number of venues to show
        #[arg(long)]
        max_results: Option<usize>,

        /// Place catalog (JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Suggest locations for a partial address
    Suggest {
        query: String,

        /// Prefer results near this location
        #[arg(long)]
        near: Option<String>,

        /// Place catalog (JSON)
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Inspect and manage past searches
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List past searches, newest first
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Find past searches by address or category
    Search { query: String },
    /// Most used locations and category combinations
    Frequent {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Delete one entry
    Remove { id: Uuid },
    /// Delete all entries
    Clear,
    /// Write the history to a JSON file
    Export { file: PathBuf },
    /// Merge entries from a JSON export
    Import { file: PathBuf },
}

fn init_logging(config: &RendezvousConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.logging.format == "compact" {
        builder.compact().init();
    } else {
        builder.pretty().init();
    }
}

fn catalog_provider(catalog: Option<&PathBuf>) -> Result<SharedProvider> {
    Ok(match catalog {
        Some(path) => Arc::new(CatalogPlaceProvider::load(path)?),
        None => Arc::new(CatalogPlaceProvider::new(Catalog::default())),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RendezvousConfig::load_from_path(cli.config.clone())?;
    if let Some(data_dir) = &cli.data_dir {
        config.history.data_dir = data_dir.to_string_lossy().into_owned();
    }
    init_logging(&config, cli.verbose);

    let data_dir = config.ensure_data_dir()?;
    let store: SharedStore = Arc::new(
        FjallStore::open(data_dir.join("store"))
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?,
    );

    let catalog = match &cli.command {
        Commands::Search { catalog, .. } | Commands::Suggest { catalog, .. } => Some(catalog),
        Commands::History { .. } => None,
    };
    let provider = catalog_provider(catalog)?;

    let mut services = Services::start(&config, provider, store).await?;
    let outcome = run(cli.command, &config, &services).await;
    services.shutdown();
    outcome
}

async fn run(command: Commands, config: &RendezvousConfig, services: &Services) -> Result<()> {
    match command {
        Commands::Search {
            from,
            to,
            categories,
            radius,
            max_results,
            json,
            ..
        } => {
            let categories: BTreeSet<VenueCategory> = if categories.is_empty() {
                services.preferences.get().await
            } else {
                categories.into_iter().collect()
            };

            let location1 = resolve(services, &from).await?;
            let location2 = resolve(services, &to).await?;

            let params = SearchParams::new(
                location1,
                location2,
                categories,
                radius.unwrap_or(config.search.default_radius_meters),
            )
            .with_max_results(max_results.unwrap_or(config.search.max_results));

            let result = services.search_and_record(&params).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let midpoint_name = services
                    .orchestrator
                    .provider()
                    .reverse_geocode(result.midpoint.latitude, result.midpoint.longitude)
                    .await;
                print_search_result(&params, &result, &midpoint_name);
            }
        }

        Commands::Suggest { query, near, .. } => {
            let bias = match near {
                Some(near) => Some(resolve(services, &near).await?),
                None => None,
            };
            let suggestions = services
                .orchestrator
                .get_location_suggestions(&query, bias.as_ref())
                .await;

            if suggestions.is_empty() {
                println!("No suggestions for '{query}'");
            }
            for suggestion in suggestions {
                println!("{} ({})", suggestion.label(), suggestion.format_coordinates());
            }
        }

        Commands::History { command } => run_history(command, services).await?,
    }

    Ok(())
}

async fn resolve(services: &Services, input: &str) -> Result<Location> {
    let orchestrator = &services.orchestrator;
    let location = LocationResolver::resolve(
        orchestrator.provider().as_ref(),
        orchestrator.retry_policy(),
        input,
    )
    .await
    .with_context(|| format!("Could not resolve location '{input}'"))?;
    debug!("'{}' resolved to {}", input, location.format_coordinates());
    Ok(location)
}

async fn run_history(command: HistoryCommands, services: &Services) -> Result<()> {
    let history = &services.history;

    match command {
        HistoryCommands::List { json } => {
            let items = history.list().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print_history(&items);
            }
        }

        HistoryCommands::Search { query } => print_history(&history.search(&query).await),

        HistoryCommands::Frequent { limit } => {
            println!("Frequent locations:");
            for entry in history.frequent_locations(limit).await {
                println!("  {:>3}x  {}", entry.count, entry.location.label());
            }
            println!("Frequent category combinations:");
            for entry in history.frequent_category_combinations(limit).await {
                let names: Vec<&str> = entry.categories.iter().map(|c| c.display_name()).collect();
                println!("  {:>3}x  {}", entry.count, names.join(", "));
            }
        }

        HistoryCommands::Remove { id } => {
            if history.remove(id).await? {
                println!("Removed {id}");
            } else {
                println!("No history entry with id {id}");
            }
        }

        HistoryCommands::Clear => {
            history.clear().await?;
            println!("History cleared");
        }

        HistoryCommands::Export { file } => {
            let snapshot = history.export().await;
            let content = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(&file, content)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            println!("Exported {} searches to {}", snapshot.items.len(), file.display());
        }

        HistoryCommands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            let report = history.import(value).await?;
            println!(
                "Imported {} searches ({} skipped), history now holds {}",
                report.accepted, report.skipped, report.total
            );
        }
    }

    Ok(())
}

fn print_history(items: &[HistoryItem]) {
    if items.is_empty() {
        println!("No searches yet");
        return;
    }
    for item in items {
        println!(
            "{}  {}  {}  [{} results]",
            item.id,
            item.timestamp.format("%Y-%m-%d %H:%M"),
            item.summary(),
            item.result_count
        );
    }
}

fn print_search_result(params: &SearchParams, result: &SearchResult, midpoint_name: &str) {
    println!(
        "Meeting point between {} and {}: {} ({})",
        params.location1.label(),
        params.location2.label(),
        midpoint_name,
        result.midpoint.format_coordinates()
    );

    if result.venues.is_empty() {
        println!("No venues found within {} m", params.radius_meters);
        return;
    }

    println!(
        "Showing {} of {} venues{}:",
        result.venues.len(),
        result.total_results,
        if result.from_cache { " (cached)" } else { "" }
    );
    for (index, venue) in result.venues.iter().enumerate() {
        println!(
            "{:>2}. {} - {} - {:.1}★ ({}) {}{}",
            index + 1,
            venue.name,
            venue.format_distance(),
            venue.rating,
            venue.rating_count,
            venue.format_price(),
            if venue.open_now { " open now" } else { "" }
        );
        if !venue.address.is_empty() {
            println!("    {}", venue.address);
        }
    }
}
