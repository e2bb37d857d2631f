//! Error types for the fetch subsystem.

use std::fmt;
use std::path::PathBuf;

use hydrotile_common::Product;
use thiserror::Error;

/// Errors fetching or verifying a single tile.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Could not construct HTTP client: {source}")]
    Client {
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// Transport-level failure issuing a request or reading the body.
    #[error("Request to {url} failed: {source}")]
    Request {
        /// The URL that failed.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("Server returned HTTP {status} for {url}")]
    HttpStatus {
        /// The URL that failed.
        url: String,
        /// The response status code.
        status: reqwest::StatusCode,
    },

    /// A redirect chain exceeded the hop limit.
    #[error("Too many redirects fetching {url} (limit {limit})")]
    TooManyRedirects {
        /// The originally requested URL.
        url: String,
        /// The configured hop limit.
        limit: usize,
    },

    /// A redirect response carried no usable Location header.
    #[error("Redirect from {url} carried no usable Location header")]
    BadRedirect {
        /// The URL that issued the redirect.
        url: String,
    },

    /// Local file I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Downloaded or cached content does not match its expected digest.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The file that failed verification.
        path: PathBuf,
        /// Expected hex digest.
        expected: String,
        /// Computed hex digest.
        actual: String,
    },

    /// A checksum manifest is missing or malformed.
    #[error("Could not read checksum manifest {path}: {reason}")]
    Manifest {
        /// Path to the manifest file.
        path: PathBuf,
        /// Why it could not be read.
        reason: String,
    },

    /// The product requires credentials and none were supplied.
    #[error("Product {product} requires credentials and none were supplied")]
    MissingCredentials {
        /// The product that was requested.
        product: Product,
    },

    /// A fetch task failed outside its own error handling.
    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

/// One tile's terminal failure within a batch.
#[derive(Debug)]
pub struct TileFailure {
    /// The tile that could not be fetched.
    pub tile_id: String,
    /// Why it failed.
    pub error: FetchError,
}

/// The fetch phase failed: at least one required tile could not be
/// fetched and verified. Carries every failed tile so the user can see
/// the complete damage in one pass; re-running is safe because verified
/// tiles are served from cache.
#[derive(Debug)]
pub struct BatchFetchError {
    /// Total tiles the batch attempted.
    pub attempted: usize,
    /// Every tile that ultimately failed.
    pub failures: Vec<TileFailure>,
}

impl fmt::Display for BatchFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} of {} tiles failed to fetch:",
            self.failures.len(),
            self.attempted
        )?;
        for failure in &self.failures {
            writeln!(f, "  {}: {}", failure.tile_id, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchFetchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_error_lists_every_failure() {
        let error = BatchFetchError {
            attempted: 3,
            failures: vec![
                TileFailure {
                    tile_id: "N47W123.hgt.zip".to_string(),
                    error: FetchError::HttpStatus {
                        url: "https://example.com/N47W123.hgt.zip".to_string(),
                        status: reqwest::StatusCode::NOT_FOUND,
                    },
                },
                TileFailure {
                    tile_id: "N48W123.hgt.zip".to_string(),
                    error: FetchError::ChecksumMismatch {
                        path: PathBuf::from("cache/srtm/N48W123.hgt.zip"),
                        expected: "aa".to_string(),
                        actual: "bb".to_string(),
                    },
                },
            ],
        };

        let message = error.to_string();
        assert!(message.contains("2 of 3 tiles failed"));
        assert!(message.contains("N47W123.hgt.zip"));
        assert!(message.contains("N48W123.hgt.zip"));
    }
}
