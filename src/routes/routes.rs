//! Defines routes for the item catalog API.
//!
//! ## Structure
//! - **Single-item resource**
//!   - `GET    /item/{name}` — fetch an item with a signed image download link
//!   - `POST   /item/{name}` — create an item (400 on duplicate name)
//!   - `PUT    /item/{name}` — create or replace price + image
//!   - `DELETE /item/{name}` — delete the item and its image
//!
//! - **Collection resource**
//!   - `GET    /items` — list up to 100 items, image keys stripped
//!
//! Health endpoints (`/healthz`, `/readyz`) are mounted at the root.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        item_handlers::{create_item, delete_item, get_item, list_items, put_item},
    },
    state::AppState,
};
use axum::{Router, routing::get};

/// Build and return the router for all catalog routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Single-item resource
        .route(
            "/item/{name}",
            get(get_item)
                .post(create_item)
                .put(put_item)
                .delete(delete_item),
        )
        // Collection resource
        .route("/items", get(list_items))
}
