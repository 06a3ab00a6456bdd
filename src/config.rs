use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub table_name: String,
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub scratch_dir: String,
    pub search_url: String,
    pub downloader_workers: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Item catalog API with image acquisition")]
pub struct Args {
    /// Host to bind to (overrides ITEM_CATALOG_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides ITEM_CATALOG_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// DynamoDB table holding item records (overrides ITEM_CATALOG_TABLE)
    #[arg(long)]
    pub table_name: Option<String>,

    /// S3 bucket holding item images (overrides ITEM_CATALOG_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// AWS region (overrides ITEM_CATALOG_REGION; falls back to the SDK chain)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom AWS endpoint, e.g. a local stack (overrides ITEM_CATALOG_ENDPOINT_URL)
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Scratch directory for downloaded image candidates (overrides ITEM_CATALOG_SCRATCH_DIR)
    #[arg(long)]
    pub scratch_dir: Option<String>,

    /// Image search endpoint (overrides ITEM_CATALOG_SEARCH_URL)
    #[arg(long)]
    pub search_url: Option<String>,

    /// Parallel image downloads per acquisition (overrides ITEM_CATALOG_DOWNLOADER_WORKERS)
    #[arg(long)]
    pub downloader_workers: Option<usize>,

    /// Create the item table and exit
    #[arg(long)]
    pub init: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the init flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("ITEM_CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("ITEM_CATALOG_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing ITEM_CATALOG_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading ITEM_CATALOG_PORT"),
        };
        let env_table = env::var("ITEM_CATALOG_TABLE").unwrap_or_else(|_| "items".into());
        let env_bucket =
            env::var("ITEM_CATALOG_BUCKET").unwrap_or_else(|_| "item-catalog-images".into());
        let env_region = env::var("ITEM_CATALOG_REGION").ok();
        let env_endpoint = env::var("ITEM_CATALOG_ENDPOINT_URL").ok();
        let env_scratch =
            env::var("ITEM_CATALOG_SCRATCH_DIR").unwrap_or_else(|_| "./data/scratch".into());
        let env_search = env::var("ITEM_CATALOG_SEARCH_URL")
            .unwrap_or_else(|_| "https://www.google.com/search?tbm=isch".into());
        let env_workers = match env::var("ITEM_CATALOG_DOWNLOADER_WORKERS") {
            Ok(value) => value.parse::<usize>().with_context(|| {
                format!("parsing ITEM_CATALOG_DOWNLOADER_WORKERS value `{}`", value)
            })?,
            Err(env::VarError::NotPresent) => 1,
            Err(err) => return Err(err).context("reading ITEM_CATALOG_DOWNLOADER_WORKERS"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            table_name: args.table_name.unwrap_or(env_table),
            bucket: args.bucket.unwrap_or(env_bucket),
            region: args.region.or(env_region),
            endpoint_url: args.endpoint_url.or(env_endpoint),
            scratch_dir: args.scratch_dir.unwrap_or(env_scratch),
            search_url: args.search_url.unwrap_or(env_search),
            downloader_workers: args.downloader_workers.unwrap_or(env_workers).max(1),
        };

        Ok((cfg, args.init))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
