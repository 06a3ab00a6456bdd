//! Signed download links for stored images, and image deletion.
//!
//! Presigning swallows storage errors and degrades to `None`; a read must
//! never fail because a link could not be produced. Deletes propagate their
//! error so callers can report partial cleanup.

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;
use tracing::error;

#[async_trait]
pub trait LinkIssuer: Send + Sync {
    /// Produce a time-limited signed download URL for `key`, or None on any
    /// storage-client error.
    async fn issue_download_url(&self, key: &str, expires_in_secs: u64) -> Option<String>;

    /// Unconditionally delete the object under `key`. Does not verify prior
    /// existence.
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;

    /// Bucket reachability, for readiness probing.
    async fn ping(&self) -> anyhow::Result<()>;
}

/// S3-backed link issuer scoped to a single bucket.
#[derive(Clone)]
pub struct S3LinkService {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3LinkService {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl LinkIssuer for S3LinkService {
    async fn issue_download_url(&self, key: &str, expires_in_secs: u64) -> Option<String> {
        let presigned: anyhow::Result<String> = async {
            let config = PresigningConfig::expires_in(Duration::from_secs(expires_in_secs))?;
            let request = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .presigned(config)
                .await
                .map_err(aws_sdk_s3::Error::from)?;
            Ok(request.uri().to_string())
        }
        .await;

        match presigned {
            Ok(url) => Some(url),
            Err(err) => {
                error!("could not presign download for `{key}`: {err}");
                None
            }
        }
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;
        Ok(())
    }
}
