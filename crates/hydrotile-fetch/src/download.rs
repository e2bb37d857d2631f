//! Streaming HTTP downloader with throttled progress reporting.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::header::LOCATION;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::FetchError;

/// Username/password pair for credentialed products.
///
/// Shared read-only across all concurrent fetch tasks in a batch.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Downloader policy knobs. The original tooling relied on transport
/// defaults; here the timeout and redirect policy are explicit.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// TCP/TLS connection timeout. There is no whole-request timeout:
    /// tile bodies can take arbitrarily long to stream.
    pub connect_timeout: Duration,
    /// Redirect hop limit for the manual redirect walk.
    pub max_redirects: usize,
    /// Minimum interval between progress log lines.
    pub progress_interval: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            max_redirects: 10,
            progress_interval: Duration::from_secs(5),
        }
    }
}

/// Downloads one remote resource to a local path, streaming the body
/// in chunks so multi-gigabyte tiles never sit in memory.
///
/// Redirects are walked manually with credentials re-attached on every
/// hop. Credentialed archives (NASA Earthdata for SRTM) answer the
/// first GET with a redirect to a storage host that must also receive
/// the credentials, so the usual strip-auth-on-redirect behavior of
/// HTTP clients would dead-end at a 401.
#[derive(Debug)]
pub struct Downloader {
    client: reqwest::Client,
    credentials: Option<Credentials>,
    config: DownloaderConfig,
}

impl Downloader {
    /// Create a downloader with default configuration.
    pub fn new(credentials: Option<Credentials>) -> Result<Self, FetchError> {
        Self::with_config(credentials, DownloaderConfig::default())
    }

    /// Create a downloader with explicit configuration.
    pub fn with_config(
        credentials: Option<Credentials>,
        config: DownloaderConfig,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|source| FetchError::Client { source })?;

        Ok(Self {
            client,
            credentials,
            config,
        })
    }

    /// Fetch `source_url` to `target_path`, returning the byte count.
    ///
    /// The body streams into a sibling `.part` file that is renamed to
    /// `target_path` only once the transfer completes, so an
    /// interrupted download never leaves a truncated file at the final
    /// path. Non-success status and transport errors fail; the parent
    /// directory of `target_path` must already exist.
    pub async fn fetch(&self, source_url: &str, target_path: &Path) -> Result<u64, FetchError> {
        let mut response = self.request_following_redirects(source_url).await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                url: source_url.to_string(),
                status: response.status(),
            });
        }

        let part_path = scratch_path(target_path);
        match self.stream_body(&mut response, source_url, &part_path).await {
            Ok(progress) => {
                tokio::fs::rename(&part_path, target_path)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: target_path.to_path_buf(),
                        source,
                    })?;
                progress.finish(target_path);
                Ok(progress.downloaded)
            }
            Err(error) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(error)
            }
        }
    }

    async fn stream_body(
        &self,
        response: &mut reqwest::Response,
        source_url: &str,
        part_path: &Path,
    ) -> Result<ProgressReporter, FetchError> {
        let io_err = |source| FetchError::Io {
            path: part_path.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::create(part_path).await.map_err(io_err)?;

        let mut progress = ProgressReporter::new(
            source_url,
            response.content_length(),
            self.config.progress_interval,
        );

        while let Some(chunk) = response.chunk().await.map_err(|source| FetchError::Request {
            url: source_url.to_string(),
            source,
        })? {
            file.write_all(&chunk).await.map_err(io_err)?;
            progress.add(chunk.len() as u64);
        }

        file.sync_all().await.map_err(io_err)?;
        Ok(progress)
    }

    /// Issue a GET, re-attaching credentials on every redirect hop up
    /// to the configured limit.
    async fn request_following_redirects(
        &self,
        source_url: &str,
    ) -> Result<reqwest::Response, FetchError> {
        let mut url = source_url.to_string();

        for _hop in 0..=self.config.max_redirects {
            let mut request = self.client.get(&url);
            if let Some(credentials) = &self.credentials {
                request =
                    request.basic_auth(&credentials.username, Some(&credentials.password));
            }

            let response = request.send().await.map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

            if !response.status().is_redirection() {
                return Ok(response);
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| FetchError::BadRedirect { url: url.clone() })?;

            // Resolve relative Location targets against the current URL.
            let next = response
                .url()
                .join(location)
                .map_err(|_| FetchError::BadRedirect { url: url.clone() })?;
            debug!(from = %url, to = %next, "Following redirect");
            url = next.to_string();
        }

        Err(FetchError::TooManyRedirects {
            url: source_url.to_string(),
            limit: self.config.max_redirects,
        })
    }
}

/// In-progress transfer path for `target`, in the same directory so
/// the final rename stays on one filesystem.
fn scratch_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

/// Logs download progress no more often than the configured interval.
struct ProgressReporter {
    name: String,
    total: Option<u64>,
    downloaded: u64,
    last_report: Instant,
    interval: Duration,
}

impl ProgressReporter {
    fn new(source_url: &str, total: Option<u64>, interval: Duration) -> Self {
        let name = source_url
            .rsplit('/')
            .next()
            .unwrap_or(source_url)
            .to_string();
        Self {
            name,
            total,
            downloaded: 0,
            last_report: Instant::now(),
            interval,
        }
    }

    fn add(&mut self, bytes: u64) {
        self.downloaded += bytes;
        if self.last_report.elapsed() >= self.interval {
            self.last_report = Instant::now();
            match self.total {
                Some(total) if total > 0 => {
                    let percent = (self.downloaded as f64 / total as f64) * 100.0;
                    info!(
                        "{}: {} / {} bytes ({:.1}%) downloaded",
                        self.name, self.downloaded, total, percent
                    );
                }
                _ => info!("{}: {} bytes downloaded", self.name, self.downloaded),
            }
        }
    }

    fn finish(&self, target_path: &Path) {
        info!(
            "Download finished: {} ({} bytes) -> {}",
            self.name,
            self.downloaded,
            target_path.display()
        );
    }
}
