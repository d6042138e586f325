//! wikidata-areas CLI - scrape Wikidata area items into SQLite

use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wikidata_areas::sources::{build_client, SparqlIdSource, WikidataFetcher};
use wikidata_areas::{
    export_rows, AreaCollector, Database, ExportFormat, IdSource, ScrapeError, ScraperConfig,
    SqliteRowStore,
};

const DEFAULT_CONFIG: &str = "scraper.yaml";

#[derive(Parser)]
#[command(name = "wikidata-areas")]
#[command(version, about = "Scrape Wikidata area items into a SQLite table", long_about = None)]
struct Cli {
    /// YAML config file (scraper.yaml is used if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Table to save rows into
    #[arg(long, global = true)]
    table: Option<String>,

    /// Class whose instances are scraped
    #[arg(long, global = true)]
    target_class: Option<String>,

    /// Ids per entity API request (max 50)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape all items and upsert them into the database
    Run,

    /// Scrape all items and print the rows instead of saving them
    Dump {
        #[arg(short, long, value_enum, default_value = "ndjson")]
        format: DumpFormat,
    },

    /// Print the ids selected by the SPARQL query
    Ids,
}

#[derive(Clone, Copy, ValueEnum)]
enum DumpFormat {
    Ndjson,
    Json,
}

impl From<DumpFormat> for ExportFormat {
    fn from(format: DumpFormat) -> Self {
        match format {
            DumpFormat::Ndjson => ExportFormat::Ndjson,
            DumpFormat::Json => ExportFormat::JsonArray,
        }
    }
}

fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ScrapeError> {
    let config = load_config(&cli)?;

    let client = build_client(&config.user_agent, config.timeout())?;
    let id_source = SparqlIdSource::new(client.clone(), &config.sparql_endpoint, &config.target_class);
    let fetcher = WikidataFetcher::new(client, &config.wikidata_api, config.batch_size);

    match cli.command {
        Commands::Ids => {
            for id in id_source.fetch_ids()? {
                println!("{}", id);
            }
        }
        Commands::Dump { format } => {
            let rows = AreaCollector::new(id_source, fetcher).collect()?;
            export_rows(io::stdout().lock(), &rows, format.into())?;
        }
        Commands::Run => {
            let db = Database::new(&config.database_url)?;
            db.test_connection()?;
            let mut store = SqliteRowStore::new(db, &config.table);

            let summary = AreaCollector::new(id_source, fetcher).run(&mut store)?;
            info!(
                "Saved {} rows ({} ids) into {} table {}",
                summary.rows_saved, summary.ids, config.database_url, config.table
            );
        }
    }

    Ok(())
}

/// Defaults, then YAML file, then environment, then CLI flags.
fn load_config(cli: &Cli) -> Result<ScraperConfig, ScrapeError> {
    let mut config = match &cli.config {
        Some(path) => ScraperConfig::load_from_file(path)?,
        None if PathBuf::from(DEFAULT_CONFIG).exists() => ScraperConfig::load_from_file(DEFAULT_CONFIG)?,
        None => ScraperConfig::default(),
    }
    .apply_env()?;

    if let Some(url) = &cli.database_url {
        config.database_url = url.clone();
    }
    if let Some(table) = &cli.table {
        config.table = table.clone();
    }
    if let Some(class) = &cli.target_class {
        config.target_class = class.clone();
    }
    if let Some(size) = cli.batch_size {
        config.batch_size = size;
    }

    config.validate()?;
    Ok(config)
}
