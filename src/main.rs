use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType, TableStatus,
};
use axum::Router;
use item_catalog::{
    config::AppConfig,
    routes,
    services::{
        catalog_service::CatalogService, image_service::ImageService, link_service::S3LinkService,
    },
    state::AppState,
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const TABLE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const TABLE_POLL_ATTEMPTS: usize = 30;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + init flag ---
    let (cfg, init_only) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting item-catalog with config: {:?}", cfg);

    // --- Build AWS clients once, shared across all requests ---
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = cfg.region.clone() {
        loader = loader.region(Region::new(region));
    }
    let aws_cfg = loader.load().await;

    let mut table_config = aws_sdk_dynamodb::config::Builder::from(&aws_cfg);
    let mut storage_config = aws_sdk_s3::config::Builder::from(&aws_cfg);
    if let Some(endpoint) = &cfg.endpoint_url {
        table_config = table_config.endpoint_url(endpoint);
        storage_config = storage_config.endpoint_url(endpoint).force_path_style(true);
    }
    let table_client = aws_sdk_dynamodb::Client::from_conf(table_config.build());
    let storage_client = aws_sdk_s3::Client::from_conf(storage_config.build());

    // --- Bootstrap the item table ---
    ensure_table(&table_client, &cfg.table_name).await?;
    if init_only {
        tracing::info!("Table bootstrap complete.");
        return Ok(()); // exit after bootstrap
    }

    // --- Ensure scratch directory exists ---
    if !Path::new(&cfg.scratch_dir).exists() {
        fs::create_dir_all(&cfg.scratch_dir)?;
        tracing::info!("Created scratch directory at {}", cfg.scratch_dir);
    }

    // --- Initialize core services ---
    let links = Arc::new(S3LinkService::new(
        storage_client.clone(),
        cfg.bucket.clone(),
    ));
    let images = ImageService::new(
        storage_client,
        cfg.bucket.clone(),
        cfg.scratch_dir.clone(),
        cfg.search_url.clone(),
        cfg.downloader_workers,
    )?;
    let catalog = CatalogService::new(
        table_client,
        cfg.table_name.clone(),
        images,
        links.clone(),
    );
    let state = AppState {
        store: Arc::new(catalog),
        links,
    };

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the item table if it does not exist and wait until it is ACTIVE.
async fn ensure_table(client: &aws_sdk_dynamodb::Client, table_name: &str) -> Result<()> {
    match client.describe_table().table_name(table_name).send().await {
        Ok(_) => return Ok(()),
        Err(err)
            if err
                .as_service_error()
                .map(|service_err| service_err.is_resource_not_found_exception())
                .unwrap_or(false) => {}
        Err(err) => return Err(aws_sdk_dynamodb::Error::from(err).into()),
    }

    tracing::info!("Creating table {table_name}");
    client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("name")
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("name")
                .key_type(KeyType::Hash)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .map_err(aws_sdk_dynamodb::Error::from)?;

    for _ in 0..TABLE_POLL_ATTEMPTS {
        let described = client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        if described.table().and_then(|table| table.table_status())
            == Some(&TableStatus::Active)
        {
            return Ok(());
        }
        tokio::time::sleep(TABLE_POLL_INTERVAL).await;
    }
    anyhow::bail!("table `{table_name}` did not become active")
}
