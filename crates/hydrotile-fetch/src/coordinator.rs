//! Concurrent fetch batches over the tile cache.

use std::path::PathBuf;
use std::sync::Arc;

use hydrotile_common::ProductConfig;
use hydrotile_index::TileRecord;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::cache::CacheStore;
use crate::checksum::{verify_file, ChecksumManifest};
use crate::download::{Credentials, Downloader};
use crate::error::{BatchFetchError, FetchError, TileFailure};

/// One tile's fetch work order. Owned exclusively by the task that
/// executes it and returned inside its [`FetchOutcome`].
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// The tile filename (cache key).
    pub tile_id: String,
    /// Where to fetch the tile from.
    pub source_url: String,
    /// Where the tile lands in the cache.
    pub target_path: PathBuf,
    /// Expected hex digest, when the product's manifest has one.
    pub expected_checksum: Option<String>,
}

/// How a tile ended up in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDisposition {
    /// Already cached (and verified, when a checksum was known); no
    /// network request was made.
    Cached,
    /// Downloaded fresh.
    Downloaded,
    /// A cached copy failed verification and was replaced.
    Redownloaded,
}

/// The terminal result of one tile's fetch task.
#[derive(Debug)]
pub struct FetchOutcome {
    /// The job that produced this outcome.
    pub job: DownloadJob,
    /// How the tile was satisfied.
    pub disposition: FetchDisposition,
}

/// Runs one fetch-and-verify task per required tile, concurrently, and
/// fails the batch loudly if any tile ultimately fails.
///
/// A failing tile never interrupts its siblings: every task runs to
/// completion, successes stay cached, and the batch error lists every
/// failure so a re-run only fetches what is still missing.
#[derive(Debug)]
pub struct FetchCoordinator {
    config: ProductConfig,
    cache: CacheStore,
    downloader: Arc<Downloader>,
}

impl FetchCoordinator {
    /// Create a coordinator for one product.
    ///
    /// Fails before any network activity if the product requires
    /// credentials and none were supplied. Creates the product's cache
    /// directory.
    pub fn new<P: AsRef<std::path::Path>>(
        config: &ProductConfig,
        cache_root: P,
        credentials: Option<Credentials>,
    ) -> Result<Self, FetchError> {
        if config.requires_credentials && credentials.is_none() {
            return Err(FetchError::MissingCredentials {
                product: config.product,
            });
        }

        let cache = CacheStore::new(cache_root, config.product);
        cache.ensure_dir().map_err(|source| FetchError::Io {
            path: cache.product_dir(),
            source,
        })?;

        // One session, shared read-only across all fetch tasks.
        let downloader = Arc::new(Downloader::new(credentials)?);

        Ok(Self {
            config: config.clone(),
            cache,
            downloader,
        })
    }

    /// The coordinator's cache store.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Build the jobs for a set of required tiles.
    pub fn plan<'a>(
        &self,
        tiles: impl IntoIterator<Item = &'a TileRecord>,
        manifest: Option<&ChecksumManifest>,
    ) -> Vec<DownloadJob> {
        tiles
            .into_iter()
            .map(|tile| DownloadJob {
                tile_id: tile.id.clone(),
                source_url: self.config.tile_url(&tile.id),
                target_path: self.cache.path_for(&tile.id),
                expected_checksum: manifest
                    .and_then(|m| m.expected_for(&tile.id))
                    .map(str::to_string),
            })
            .collect()
    }

    /// Fetch every job, one concurrent task per tile, then join.
    ///
    /// Returns all outcomes on success. If any tile ultimately failed,
    /// returns a [`BatchFetchError`] listing every failed tile; the
    /// pipeline must not proceed on an incomplete tile set.
    pub async fn fetch_all(
        &self,
        jobs: Vec<DownloadJob>,
    ) -> Result<Vec<FetchOutcome>, BatchFetchError> {
        let attempted = jobs.len();
        info!(
            "Fetching {} tiles for {}",
            attempted, self.config.product
        );

        let mut tasks = JoinSet::new();
        for job in jobs {
            let downloader = Arc::clone(&self.downloader);
            tasks.spawn(async move { fetch_one(downloader, job).await });
        }

        let mut outcomes = Vec::with_capacity(attempted);
        let mut failures = Vec::new();

        // Join barrier: the mosaic stage needs the complete tile set,
        // so every task runs to completion before we report.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((job, Ok(disposition))) => {
                    outcomes.push(FetchOutcome { job, disposition });
                }
                Ok((job, Err(fetch_error))) => {
                    error!("Tile {} failed: {}", job.tile_id, fetch_error);
                    failures.push(TileFailure {
                        tile_id: job.tile_id,
                        error: fetch_error,
                    });
                }
                Err(join_error) => {
                    failures.push(TileFailure {
                        tile_id: "<fetch task>".to_string(),
                        error: FetchError::TaskFailed(join_error.to_string()),
                    });
                }
            }
        }

        if failures.is_empty() {
            info!("All {} tiles cached and ready", attempted);
            Ok(outcomes)
        } else {
            Err(BatchFetchError {
                attempted,
                failures,
            })
        }
    }
}

/// Fetch and verify a single tile. Never panics; every failure comes
/// back as a typed error alongside the job that owned it.
async fn fetch_one(
    downloader: Arc<Downloader>,
    job: DownloadJob,
) -> (DownloadJob, Result<FetchDisposition, FetchError>) {
    let result = fetch_one_inner(&downloader, &job).await;
    (job, result)
}

async fn fetch_one_inner(
    downloader: &Downloader,
    job: &DownloadJob,
) -> Result<FetchDisposition, FetchError> {
    if job.target_path.exists() {
        let Some(expected) = &job.expected_checksum else {
            // Nothing to verify against; trust the cache.
            return Ok(FetchDisposition::Cached);
        };

        match verify_blocking(job.target_path.clone(), expected.clone()).await {
            Ok(()) => return Ok(FetchDisposition::Cached),
            Err(FetchError::ChecksumMismatch { .. }) => {
                // One self-heal attempt: discard the corrupt copy and
                // fetch again. A second mismatch is fatal.
                warn!(
                    "Cached tile {} failed verification; deleting and refetching",
                    job.tile_id
                );
                tokio::fs::remove_file(&job.target_path)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: job.target_path.clone(),
                        source,
                    })?;
                downloader.fetch(&job.source_url, &job.target_path).await?;
                verify_blocking(job.target_path.clone(), expected.clone()).await?;
                return Ok(FetchDisposition::Redownloaded);
            }
            Err(other) => return Err(other),
        }
    }

    downloader.fetch(&job.source_url, &job.target_path).await?;
    if let Some(expected) = &job.expected_checksum {
        if let Err(verify_error) =
            verify_blocking(job.target_path.clone(), expected.clone()).await
        {
            // Leave no corrupt file behind for a later run to trust.
            let _ = tokio::fs::remove_file(&job.target_path).await;
            return Err(verify_error);
        }
    }
    Ok(FetchDisposition::Downloaded)
}

/// Run the streaming digest off the async runtime's worker threads.
async fn verify_blocking(path: PathBuf, expected: String) -> Result<(), FetchError> {
    tokio::task::spawn_blocking(move || verify_file(&path, &expected))
        .await
        .map_err(|e| FetchError::TaskFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrotile_common::Product;

    fn test_config(requires_credentials: bool) -> ProductConfig {
        ProductConfig {
            product: Product::Srtm,
            catalog_path: PathBuf::from("data/srtm.json"),
            checksum_manifest_path: None,
            download_base_url: "https://example.com/tiles".to_string(),
            target_pixel_size: (0.000277777777778, -0.000277777777778),
            requires_credentials,
        }
    }

    fn tile(id: &str) -> TileRecord {
        TileRecord {
            id: id.to_string(),
            bounding_polygon: vec![
                (0.0, 0.0),
                (1.0, 0.0),
                (1.0, 1.0),
                (0.0, 1.0),
                (0.0, 0.0),
            ],
        }
    }

    #[test]
    fn test_missing_credentials_fails_before_any_network() {
        let root = tempfile::tempdir().unwrap();
        let err = FetchCoordinator::new(&test_config(true), root.path(), None).unwrap_err();
        assert!(matches!(err, FetchError::MissingCredentials { .. }));
    }

    #[test]
    fn test_plan_maps_tiles_to_jobs() {
        let root = tempfile::tempdir().unwrap();
        let coordinator =
            FetchCoordinator::new(&test_config(false), root.path(), None).unwrap();

        let tiles = vec![tile("N47W123.hgt.zip"), tile("N48W123.hgt.zip")];
        let jobs = coordinator.plan(tiles.iter(), None);

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].tile_id, "N47W123.hgt.zip");
        assert_eq!(
            jobs[0].source_url,
            "https://example.com/tiles/N47W123.hgt.zip"
        );
        assert_eq!(
            jobs[0].target_path,
            root.path().join("srtm").join("N47W123.hgt.zip")
        );
        assert!(jobs[0].expected_checksum.is_none());
    }

    #[test]
    fn test_new_creates_cache_dir() {
        let root = tempfile::tempdir().unwrap();
        let coordinator =
            FetchCoordinator::new(&test_config(false), root.path(), None).unwrap();
        assert!(coordinator.cache().product_dir().is_dir());
    }
}
