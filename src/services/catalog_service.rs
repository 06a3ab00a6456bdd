//! CatalogService — item CRUD against the DynamoDB table, orchestrating image
//! acquisition and link cleanup around each write.
//!
//! Image acquisition never fails a write: a failed pipeline stores a NULL
//! image attribute. Image *deletion* during update propagates, and during item
//! delete it downgrades the outcome instead of failing the delete.

use crate::{
    models::{
        attrs::{attrs_to_json, to_decimal_string},
        item::Item,
    },
    services::{image_service::ImageService, link_service::LinkIssuer},
};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("item `{0}` not found")]
    NotFound(String),
    #[error("item `{0}` is missing a required attribute")]
    MalformedRecord(String),
    #[error("item `{0}` has no stored image to replace")]
    MissingImage(String),
    #[error("removing stored image failed: {0}")]
    ImageCleanup(#[source] anyhow::Error),
    #[error(transparent)]
    Table(#[from] aws_sdk_dynamodb::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// How an item delete resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Record and image both removed.
    Deleted,
    /// Record removed, but the image object could not be (or had no key).
    DeletedImageCleanupFailed,
    /// No record existed under that name.
    NotFound,
}

/// Data-access seam over the item table.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Point lookup by name, decimal fields normalized to floats.
    async fn find_by_name(&self, name: &str) -> CatalogResult<Option<Item>>;

    /// Acquire an image and write a new record unconditionally. Callers check
    /// for existence first.
    async fn insert(&self, name: &str, price: f64) -> CatalogResult<()>;

    /// Delete the existing record's image, acquire a fresh one, and update
    /// exactly `price` and `image`. Fails when the record or its image key is
    /// missing, or when the image delete fails.
    async fn update(&self, name: &str, price: f64) -> CatalogResult<()>;

    /// Delete the record and, if it existed, its image.
    async fn delete(&self, name: &str) -> CatalogResult<DeleteOutcome>;

    /// Bounded scan over the table, each record normalized to JSON.
    async fn scan_items(&self, limit: i32) -> CatalogResult<Vec<Value>>;

    /// Table reachability, for readiness probing.
    async fn ping(&self) -> anyhow::Result<()>;
}

/// DynamoDB-backed [`ItemStore`].
#[derive(Clone)]
pub struct CatalogService {
    table: aws_sdk_dynamodb::Client,
    table_name: String,
    images: ImageService,
    links: Arc<dyn LinkIssuer>,
}

impl CatalogService {
    pub fn new(
        table: aws_sdk_dynamodb::Client,
        table_name: String,
        images: ImageService,
        links: Arc<dyn LinkIssuer>,
    ) -> Self {
        Self {
            table,
            table_name,
            images,
            links,
        }
    }

    fn name_key(name: &str) -> AttributeValue {
        AttributeValue::S(name.to_string())
    }

    /// Run the acquisition pipeline and encode its result the way the table
    /// stores it: the key as a string, or NULL when acquisition failed.
    async fn acquire_image_attr(&self, name: &str) -> AttributeValue {
        match self.images.acquire(name).await {
            Some(key) => AttributeValue::S(key),
            None => AttributeValue::Null(true),
        }
    }
}

#[async_trait]
impl ItemStore for CatalogService {
    async fn find_by_name(&self, name: &str) -> CatalogResult<Option<Item>> {
        let output = self
            .table
            .get_item()
            .table_name(&self.table_name)
            .key("name", Self::name_key(name))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        let Some(attrs) = output.item else {
            return Ok(None);
        };
        match Item::from_record(&attrs_to_json(&attrs)) {
            Some(item) => Ok(Some(item)),
            None => Err(CatalogError::MalformedRecord(name.to_string())),
        }
    }

    async fn insert(&self, name: &str, price: f64) -> CatalogResult<()> {
        let image = self.acquire_image_attr(name).await;
        let record = HashMap::from([
            ("name".to_string(), Self::name_key(name)),
            (
                "price".to_string(),
                AttributeValue::N(to_decimal_string(price)),
            ),
            ("image".to_string(), image),
        ]);

        self.table
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }

    async fn update(&self, name: &str, price: f64) -> CatalogResult<()> {
        let existing = self
            .find_by_name(name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        let old_key = existing
            .image
            .ok_or_else(|| CatalogError::MissingImage(name.to_string()))?;

        self.links
            .delete_object(&old_key)
            .await
            .map_err(CatalogError::ImageCleanup)?;

        let image = self.acquire_image_attr(name).await;
        self.table
            .update_item()
            .table_name(&self.table_name)
            .key("name", Self::name_key(name))
            .update_expression("SET price = :p, image = :i")
            .expression_attribute_values(":p", AttributeValue::N(to_decimal_string(price)))
            .expression_attribute_values(":i", image)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> CatalogResult<DeleteOutcome> {
        let output = self
            .table
            .delete_item()
            .table_name(&self.table_name)
            .key("name", Self::name_key(name))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        let Some(attrs) = output.attributes else {
            return Ok(DeleteOutcome::NotFound);
        };

        let image = attrs
            .get("image")
            .and_then(|attr| attr.as_s().ok())
            .cloned();
        let outcome = match image {
            Some(key) => match self.links.delete_object(&key).await {
                Ok(()) => DeleteOutcome::Deleted,
                Err(err) => {
                    warn!("item `{name}` deleted but image `{key}` was not: {err}");
                    DeleteOutcome::DeletedImageCleanupFailed
                }
            },
            None => {
                warn!("item `{name}` deleted but carried no image key to remove");
                DeleteOutcome::DeletedImageCleanupFailed
            }
        };
        Ok(outcome)
    }

    async fn scan_items(&self, limit: i32) -> CatalogResult<Vec<Value>> {
        let output = self
            .table
            .scan()
            .table_name(&self.table_name)
            .limit(limit)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        Ok(output.items().iter().map(attrs_to_json).collect())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.table
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }
}
