//! Shared handler state: the store and link-issuer seams behind trait objects,
//! so tests can stand in fakes for the AWS-backed implementations.

use crate::services::{catalog_service::ItemStore, link_service::LinkIssuer};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub links: Arc<dyn LinkIssuer>,
}
