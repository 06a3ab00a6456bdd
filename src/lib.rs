//! REST facade over a DynamoDB item table and an S3 image bucket.
//!
//! Items are named catalog entries with a price and an associated image pulled
//! from a web image search. Image keys are never exposed directly; reads hand
//! out short-lived presigned download links instead.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
