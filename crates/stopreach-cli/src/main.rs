use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stopreach_lib::{
    load_api_key, run, write_routes_csv, EnrichmentConfig, MapboxConfig, MapboxDirections, Store,
    TravelMode, UniformGrid,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Transit accessibility data pipeline")]
struct Cli {
    /// Path to the SQLite database.
    #[arg(long, default_value = "stopreach.sqlite3")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema.
    Init,
    /// Load addresses and/or stops from latitude,longitude CSV files.
    Load {
        /// CSV file of addresses to ingest.
        #[arg(long)]
        addresses: Option<PathBuf>,
        /// CSV file of stops to ingest.
        #[arg(long)]
        stops: Option<PathBuf>,
    },
    /// Generate a uniform address grid CSV over a bounding box.
    Grid {
        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        lat_min: f64,
        #[arg(long, allow_negative_numbers = true)]
        lat_max: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon_min: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon_max: f64,
        /// Degrees of latitude between grid rows.
        #[arg(long)]
        lat_step: f64,
        /// Degrees of longitude between grid columns.
        #[arg(long)]
        lon_step: f64,
    },
    /// Enrich unrouted addresses with distances to their nearest stops.
    Enrich {
        /// Directions API access token.
        #[arg(long, conflicts_with = "api_key_file")]
        api_key: Option<String>,
        /// File containing the directions API access token.
        #[arg(long)]
        api_key_file: Option<PathBuf>,
        /// Travel mode: walking, driving, or cycling.
        #[arg(long, default_value = "walking")]
        mode: String,
        /// Candidate stops to enrich per address.
        #[arg(long, default_value_t = 5)]
        stops_per_address: usize,
        /// Override the directions API host (for testing).
        #[arg(long, hide = true)]
        base_url: Option<String>,
    },
    /// Export persisted routes as a heat-map CSV.
    Export {
        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
        /// Keep only the minimum-distance route(s) per address.
        #[arg(long)]
        closest_only: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Init => handle_init(&cli.db),
        Command::Load { addresses, stops } => {
            handle_load(&cli.db, addresses.as_deref(), stops.as_deref())
        }
        Command::Grid {
            out,
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            lat_step,
            lon_step,
        } => handle_grid(&out, lat_min, lat_max, lon_min, lon_max, lat_step, lon_step),
        Command::Enrich {
            api_key,
            api_key_file,
            mode,
            stops_per_address,
            base_url,
        } => handle_enrich(
            &cli.db,
            api_key,
            api_key_file.as_deref(),
            &mode,
            stops_per_address,
            base_url,
        ),
        Command::Export { out, closest_only } => handle_export(&cli.db, &out, closest_only),
    }
}

fn handle_init(db: &Path) -> Result<()> {
    let store = Store::open(db)
        .with_context(|| format!("failed to open database at {}", db.display()))?;
    store.create_schema().context("failed to create schema")?;
    println!("Database ready at {}", db.display());
    Ok(())
}

fn handle_load(db: &Path, addresses: Option<&Path>, stops: Option<&Path>) -> Result<()> {
    if addresses.is_none() && stops.is_none() {
        bail!("nothing to load: pass --addresses and/or --stops");
    }
    let store = open_store(db)?;
    if let Some(path) = addresses {
        let count = store
            .load_addresses_csv(path)
            .with_context(|| format!("failed to load addresses from {}", path.display()))?;
        println!("Loaded {count} addresses");
    }
    if let Some(path) = stops {
        let count = store
            .load_stops_csv(path)
            .with_context(|| format!("failed to load stops from {}", path.display()))?;
        println!("Loaded {count} stops");
    }
    Ok(())
}

fn handle_grid(
    out: &Path,
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    lat_step: f64,
    lon_step: f64,
) -> Result<()> {
    let grid = UniformGrid::new(lat_min, lat_max, lon_min, lon_max, lat_step, lon_step)
        .context("invalid grid bounds")?;
    let file = File::create(out)
        .with_context(|| format!("failed to create output file {}", out.display()))?;
    let count = grid.write_csv(file).context("failed to write grid CSV")?;
    println!("Wrote {count} grid points to {}", out.display());
    Ok(())
}

fn handle_enrich(
    db: &Path,
    api_key: Option<String>,
    api_key_file: Option<&Path>,
    mode: &str,
    stops_per_address: usize,
    base_url: Option<String>,
) -> Result<()> {
    let key = match (api_key, api_key_file) {
        (Some(key), _) => key,
        (None, Some(path)) => load_api_key(path)
            .with_context(|| format!("failed to read api key from {}", path.display()))?,
        (None, None) => bail!("an api key is required: pass --api-key or --api-key-file"),
    };
    let mode: TravelMode = mode.parse().map_err(anyhow::Error::msg)?;

    let mut config = MapboxConfig::new(key);
    if let Some(base_url) = base_url {
        config = config.with_base_url(base_url);
    }
    let provider = MapboxDirections::new(config).context("failed to build directions client")?;

    let store = open_store(db)?;
    let enrichment = EnrichmentConfig {
        stops_per_address,
        mode,
    };
    let report = run(&store, &provider, &enrichment).context("enrichment run failed")?;

    println!(
        "Processed {} addresses: {} routes recorded, {} lookups failed",
        report.addresses_processed, report.routes_recorded, report.lookup_failures
    );
    if report.lookup_failures > 0 {
        println!("Failed addresses stay unrouted; rerun to pick them up.");
    }
    Ok(())
}

fn handle_export(db: &Path, out: &Path, closest_only: bool) -> Result<()> {
    let store = open_store(db)?;
    let file = File::create(out)
        .with_context(|| format!("failed to create output file {}", out.display()))?;
    let count = write_routes_csv(&store, file, closest_only).context("failed to export routes")?;
    println!("Exported {count} routes to {}", out.display());
    Ok(())
}

fn open_store(db: &Path) -> Result<Store> {
    Store::open_existing(db)
        .with_context(|| format!("failed to open database at {} (run `init` first?)", db.display()))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
