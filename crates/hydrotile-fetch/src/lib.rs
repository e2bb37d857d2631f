//! # hydrotile-fetch
//!
//! Populates the on-disk tile cache from remote archives: a streaming
//! HTTP downloader, streaming checksum verification, and a coordinator
//! that runs one fetch task per required tile and fails the batch loudly
//! if any tile ultimately cannot be fetched.
//!
//! The cache at `cache_root/<product>/<tile>` is append-only: nothing
//! here evicts or rewrites a verified tile, and a single writer per tile
//! is assumed (concurrent processes sharing a cache root are out of
//! contract).
//!
//! ## Example
//!
//! ```no_run
//! use hydrotile_fetch::{CacheStore, Credentials, FetchCoordinator};
//! # async fn run(config: hydrotile_common::ProductConfig,
//! #              tiles: Vec<hydrotile_index::TileRecord>) -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = FetchCoordinator::new(&config, "tile-cache", None)?;
//! let jobs = coordinator.plan(tiles.iter(), None);
//! let outcomes = coordinator.fetch_all(jobs).await?;
//! println!("{} tiles ready", outcomes.len());
//! # Ok(())
//! # }
//! ```

mod cache;
mod checksum;
mod coordinator;
mod download;
mod error;

pub use cache::CacheStore;
pub use checksum::{digest_file, verify_file, ChecksumManifest};
pub use coordinator::{DownloadJob, FetchCoordinator, FetchDisposition, FetchOutcome};
pub use download::{Credentials, Downloader, DownloaderConfig};
pub use error::{BatchFetchError, FetchError, TileFailure};
