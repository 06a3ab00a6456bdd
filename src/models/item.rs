//! Represents a catalog item stored in the table.

use serde_json::Value;

/// A named catalog entry with a price and an optional stored image.
///
/// `name` is the partition key and uniquely identifies the record. `image`
/// holds the S3 key of the associated image, absent when acquisition failed
/// at write time. The key is never serialized out to API clients; reads
/// exchange it for a presigned download URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Unique item name (partition key).
    pub name: String,

    /// Price, normalized back from the table's decimal representation.
    pub price: f64,

    /// S3 object key of the item's image, if one was acquired.
    pub image: Option<String>,
}

impl Item {
    /// Rebuild an Item from a normalized table record.
    ///
    /// Returns None when `name` or `price` is missing or mistyped. A null or
    /// missing `image` attribute decodes as no image.
    pub fn from_record(record: &Value) -> Option<Self> {
        Some(Self {
            name: record.get("name")?.as_str()?.to_string(),
            price: record.get("price")?.as_f64()?,
            image: record
                .get("image")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
