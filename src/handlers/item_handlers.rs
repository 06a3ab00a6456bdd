//! HTTP handlers for the single-item and collection resources.
//!
//! Response shapes follow the store's wire contract: not-found and delete
//! outcomes are 200-shaped `{"message": ...}` bodies; only validation,
//! conflict, and internal failures carry non-200 statuses.

use crate::{
    errors::AppError,
    services::catalog_service::DeleteOutcome,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use tracing::{error, warn};

/// Lifetime of the presigned download link handed out by GET.
const DOWNLOAD_URL_TTL_SECS: u64 = 60;

/// Upper bound on the collection scan.
const SCAN_LIMIT: i32 = 100;

const PRICE_HELP: &str = "price cannot be left blank and must be a number";

/// GET `/item/{name}` — the item with its image exchanged for a signed
/// download URL. A failed presign degrades to a null URL.
pub async fn get_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let item = state.store.find_by_name(&name).await.map_err(|err| {
        error!("lookup for item `{name}` failed: {err}");
        AppError::internal("an error occurred fetching the item.")
    })?;

    let Some(item) = item else {
        return Ok(Json(json!({ "message": "item not found" })));
    };

    let download_url = match item.image.as_deref() {
        Some(key) => {
            state
                .links
                .issue_download_url(key, DOWNLOAD_URL_TTL_SECS)
                .await
        }
        None => None,
    };

    Ok(Json(json!({
        "name": item.name,
        "price": item.price,
        "download_url": download_url,
        "url_expires_in": DOWNLOAD_URL_TTL_SECS,
    })))
}

/// POST `/item/{name}` — create a new item. Conflicts on an existing name
/// before the body is even validated.
pub async fn create_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let existing = state.store.find_by_name(&name).await.map_err(|err| {
        error!("pre-insert lookup for item `{name}` failed: {err}");
        AppError::internal("an error occurred inserting the item.")
    })?;
    if existing.is_some() {
        return Err(AppError::bad_request(format!(
            "an item with name {name} already exists"
        )));
    }

    let price = parse_price(&payload)?;
    if let Err(err) = state.store.insert(&name, price).await {
        error!("inserting item `{name}` failed: {err}");
        return Err(AppError::internal("an error occurred inserting the item."));
    }

    Ok(Json(json!({ "name": name, "price": price })))
}

/// PUT `/item/{name}` — insert when absent, otherwise replace price and image.
pub async fn put_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let price = parse_price(&payload)?;

    let existing = state.store.find_by_name(&name).await.map_err(|err| {
        error!("pre-update lookup for item `{name}` failed: {err}");
        AppError::internal("an error occurred updating the item.")
    })?;

    match existing {
        None => {
            if let Err(err) = state.store.insert(&name, price).await {
                error!("inserting item `{name}` failed: {err}");
                return Err(AppError::internal("an error occurred inserting the item."));
            }
        }
        Some(_) => {
            if let Err(err) = state.store.update(&name, price).await {
                error!("updating item `{name}` failed: {err}");
                return Err(AppError::internal("an error occurred updating the item."));
            }
        }
    }

    Ok(Json(json!({ "name": name, "price": price })))
}

/// DELETE `/item/{name}` — every outcome is a 200-shaped message.
pub async fn delete_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.store.delete(&name).await.map_err(|err| {
        error!("deleting item `{name}` failed: {err}");
        AppError::internal("an error occurred deleting the item.")
    })?;

    let message = match outcome {
        DeleteOutcome::Deleted => "item deleted",
        DeleteOutcome::DeletedImageCleanupFailed => {
            "item deleted but there was an issue removing image from S3"
        }
        DeleteOutcome::NotFound => "item does not exist",
    };
    Ok(Json(json!({ "message": message })))
}

/// GET `/items` — up to [`SCAN_LIMIT`] records with image keys stripped.
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let mut records = state.store.scan_items(SCAN_LIMIT).await.map_err(|err| {
        error!("scanning items failed: {err}");
        AppError::internal("an error occurred fetching the items.")
    })?;

    if records.is_empty() {
        return Ok(Json(json!({ "message": "no items in the database found" })));
    }

    for record in &mut records {
        if let Some(fields) = record.as_object_mut() {
            if fields.remove("image").is_none() {
                let name = fields
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>");
                warn!("image does not exist for item {name}");
            }
        }
    }

    Ok(Json(Value::Array(records)))
}

/// Extract `price` from a request body. Numeric strings are coerced to
/// floats; anything else is a validation failure.
fn parse_price(payload: &Value) -> Result<f64, AppError> {
    match payload.get("price") {
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| AppError::bad_request(PRICE_HELP)),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::bad_request(PRICE_HELP)),
        _ => Err(AppError::bad_request(PRICE_HELP)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn parses_numbers_and_numeric_strings() {
        assert_eq!(parse_price(&json!({ "price": 49.99 })).unwrap(), 49.99);
        assert_eq!(parse_price(&json!({ "price": 10 })).unwrap(), 10.0);
        assert_eq!(parse_price(&json!({ "price": " 3.5 " })).unwrap(), 3.5);
    }

    #[test]
    fn rejects_missing_or_mistyped_price() {
        for payload in [
            json!({}),
            json!({ "price": null }),
            json!({ "price": true }),
            json!({ "price": "cheap" }),
            json!({ "price": [49.99] }),
        ] {
            let err = parse_price(&payload).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
        }
    }
}
