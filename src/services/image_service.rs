//! Image acquisition: search the web for an item name, download a handful of
//! candidates into a scratch directory, pick one, upload it to the bucket.
//!
//! Acquisition is strictly best-effort. Every failure path logs and resolves
//! to `None`; item writes proceed without an image rather than failing.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use futures::{StreamExt, stream};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use std::{collections::HashSet, path::PathBuf, time::Duration};
use tokio::fs;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// How many candidate images one acquisition downloads at most.
const MAX_CANDIDATES: usize = 5;

/// Fallback extension when the source URL path carries none we recognize.
const DEFAULT_EXTENSION: &str = "jpg";

const ALLOWED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "bmp", "tiff", "gif", "ppm", "pgm"];

/// Search pages refuse headless defaults; present a browser user agent.
const SEARCH_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_secs(5);
const VISIBILITY_POLL_ATTEMPTS: usize = 20;

lazy_static! {
    static ref IMAGE_URL: Regex =
        Regex::new(r#"https?://[^"'\\\s<>]+\.(?i:jpg|jpeg|png|bmp|tiff|gif|ppm|pgm)"#)
            .expect("image url pattern");
}

/// Acquires images for item names and stages them into the bucket.
#[derive(Clone)]
pub struct ImageService {
    storage: aws_sdk_s3::Client,
    bucket: String,
    http: reqwest::Client,
    scratch_dir: PathBuf,
    search_url: String,
    downloader_workers: usize,
}

impl ImageService {
    pub fn new(
        storage: aws_sdk_s3::Client,
        bucket: String,
        scratch_dir: impl Into<PathBuf>,
        search_url: String,
        downloader_workers: usize,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(SEARCH_USER_AGENT)
            .build()?;
        Ok(Self {
            storage,
            bucket,
            http,
            scratch_dir: scratch_dir.into(),
            search_url,
            downloader_workers: downloader_workers.max(1),
        })
    }

    /// Search for `item_name`, download up to [`MAX_CANDIDATES`] images, pick
    /// one at random and upload it. Returns the uploaded object key, or None
    /// when any stage of the pipeline fails.
    ///
    /// The scratch directory is cleared before returning regardless of
    /// outcome.
    pub async fn acquire(&self, item_name: &str) -> Option<String> {
        if let Err(err) = fs::create_dir_all(&self.scratch_dir).await {
            error!(
                "could not prepare scratch directory {}: {err}",
                self.scratch_dir.display()
            );
            return None;
        }

        let key = match self.crawl(item_name).await {
            Ok(downloaded) => {
                debug!("downloaded {downloaded} candidate image(s) for `{item_name}`");
                self.pick_and_upload().await
            }
            Err(err) => {
                warn!("image crawl for `{item_name}` failed: {err}");
                None
            }
        };

        self.clear_scratch().await;
        key
    }

    /// Fetch the search page and download every extracted candidate into the
    /// scratch directory, a bounded number in flight at once. Individual
    /// download failures are skipped; only a failed search itself is an error.
    async fn crawl(&self, term: &str) -> anyhow::Result<usize> {
        let body = self
            .http
            .get(&self.search_url)
            .query(&[("q", term)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let candidates = extract_image_urls(&body, MAX_CANDIDATES);
        if candidates.is_empty() {
            anyhow::bail!("no image candidates found for `{term}`");
        }

        let results: Vec<bool> = stream::iter(candidates)
            .map(|url| self.download_candidate(url))
            .buffer_unordered(self.downloader_workers)
            .collect()
            .await;

        Ok(results.into_iter().filter(|ok| *ok).count())
    }

    async fn download_candidate(&self, url: Url) -> bool {
        let filename = candidate_filename(&url, DEFAULT_EXTENSION);
        let target = self.scratch_dir.join(&filename);
        let fetched: anyhow::Result<()> = async {
            let bytes = self
                .http
                .get(url.clone())
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            fs::write(&target, &bytes).await?;
            Ok(())
        }
        .await;

        match fetched {
            Ok(()) => true,
            Err(err) => {
                debug!("discarding candidate {url}: {err}");
                false
            }
        }
    }

    /// Pick one downloaded file uniformly at random, over however many
    /// actually arrived (capped at [`MAX_CANDIDATES`]), and upload it under
    /// its filename as the object key.
    async fn pick_and_upload(&self) -> Option<String> {
        let mut candidates = match self.list_scratch().await {
            Ok(names) => names,
            Err(err) => {
                warn!("could not list scratch directory: {err}");
                return None;
            }
        };
        candidates.sort();
        candidates.truncate(MAX_CANDIDATES);

        if candidates.is_empty() {
            warn!("no candidate images were downloaded, aborting acquisition");
            return None;
        }

        let pick = candidates[random_index(candidates.len())].clone();
        match self.upload(&pick).await {
            Ok(()) => Some(pick),
            Err(err) => {
                warn!("uploading image `{pick}` failed: {err}");
                None
            }
        }
    }

    async fn upload(&self, filename: &str) -> anyhow::Result<()> {
        let path = self.scratch_dir.join(filename);
        let body = aws_sdk_s3::primitives::ByteStream::from_path(&path).await?;
        self.storage
            .put_object()
            .bucket(&self.bucket)
            .key(filename)
            .body(body)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;
        self.wait_until_visible(filename).await
    }

    /// Block until the uploaded object answers a head request, so the key is
    /// never written to the table before the bucket can serve it.
    async fn wait_until_visible(&self, key: &str) -> anyhow::Result<()> {
        for _ in 0..VISIBILITY_POLL_ATTEMPTS {
            match self
                .storage
                .head_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
            {
                Ok(_) => return Ok(()),
                Err(err)
                    if err
                        .as_service_error()
                        .map(|service_err| service_err.is_not_found())
                        .unwrap_or(false) =>
                {
                    tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
                }
                Err(err) => return Err(aws_sdk_s3::Error::from(err).into()),
            }
        }
        anyhow::bail!("object `{key}` did not become visible after upload")
    }

    async fn list_scratch(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.scratch_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn clear_scratch(&self) {
        let cleared: std::io::Result<()> = async {
            let mut entries = fs::read_dir(&self.scratch_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                fs::remove_file(entry.path()).await?;
            }
            Ok(())
        }
        .await;

        if let Err(err) = cleared {
            warn!(
                "could not clear scratch directory {}: {err}",
                self.scratch_dir.display()
            );
        }
    }
}

/// Pull up to `max` distinct candidate image URLs out of a search response
/// body, in order of appearance.
fn extract_image_urls(body: &str, max: usize) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for found in IMAGE_URL.find_iter(body) {
        if urls.len() == max {
            break;
        }
        let Ok(url) = Url::parse(found.as_str()) else {
            continue;
        };
        if seen.insert(url.to_string()) {
            urls.push(url);
        }
    }
    urls
}

/// Filename for a downloaded candidate: the URL path, base64-encoded with the
/// url-safe alphabet so the name is reversible and free of characters a
/// filesystem or key space would reject, plus a whitelisted extension.
fn candidate_filename(url: &Url, default_ext: &str) -> String {
    let path = url.path();
    let extension = match path.rsplit_once('.') {
        Some((_, ext)) if ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => ext,
        _ => default_ext,
    };
    format!("{}.{}", URL_SAFE_NO_PAD.encode(path.as_bytes()), extension)
}

// v4 ids are 122 bits of OS randomness; modulo over at most five candidates
// keeps the pick uniform.
fn random_index(len: usize) -> usize {
    debug_assert!(len > 0);
    (Uuid::new_v4().as_u128() % len as u128) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_keeps_whitelisted_extension() {
        let url = Url::parse("https://img.example.com/photos/chair.png").unwrap();
        assert!(candidate_filename(&url, "jpg").ends_with(".png"));
    }

    #[test]
    fn filename_extension_check_ignores_case() {
        let url = Url::parse("https://img.example.com/photos/chair.PNG").unwrap();
        assert!(candidate_filename(&url, "jpg").ends_with(".PNG"));
    }

    #[test]
    fn filename_falls_back_on_unknown_or_missing_extension() {
        let webp = Url::parse("https://img.example.com/photos/chair.webp").unwrap();
        assert!(candidate_filename(&webp, "jpg").ends_with(".jpg"));

        let bare = Url::parse("https://img.example.com/photos/chair").unwrap();
        assert!(candidate_filename(&bare, "jpg").ends_with(".jpg"));
    }

    #[test]
    fn filenames_are_unique_per_source_path_and_key_safe() {
        let one = Url::parse("https://a.example.com/x/one.jpg").unwrap();
        let two = Url::parse("https://a.example.com/x/two.jpg").unwrap();
        let name_one = candidate_filename(&one, "jpg");
        let name_two = candidate_filename(&two, "jpg");

        assert_ne!(name_one, name_two);
        for name in [&name_one, &name_two] {
            assert!(!name.contains('/'));
            assert!(!name.contains('+'));
            assert!(name.chars().all(|c| !c.is_control()));
        }
    }

    #[test]
    fn extracts_distinct_urls_in_order_up_to_cap() {
        let body = r#"
            <img src="https://cdn.example.com/a.jpg">
            <img src="https://cdn.example.com/a.jpg">
            "https://cdn.example.com/b.jpeg" and https://cdn.example.com/c.png
            <a href="https://cdn.example.com/page.html">not an image</a>
        "#;
        let urls = extract_image_urls(body, 2);
        assert_eq!(
            urls.iter().map(Url::as_str).collect::<Vec<_>>(),
            vec!["https://cdn.example.com/a.jpg", "https://cdn.example.com/b.jpeg"]
        );

        let all = extract_image_urls(body, MAX_CANDIDATES);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn random_index_stays_in_bounds() {
        for len in 1..=MAX_CANDIDATES {
            for _ in 0..100 {
                assert!(random_index(len) < len);
            }
        }
    }
}
