//! Wires the subsystems into one end-to-end run: resolve the boundary,
//! query the catalog, fetch and verify the tiles, then drive the
//! pipeline over the cached set.

use std::path::{Path, PathBuf};

use hydrotile_common::{Boundary, SpatialInputError};
use hydrotile_fetch::{
    BatchFetchError, ChecksumManifest, Credentials, FetchCoordinator, FetchError,
};
use hydrotile_index::{CatalogError, TileIndex};
use hydrotile_pipeline::{GeoError, Geoprocessor, Pipeline, PipelineConfig, PipelineError};
use thiserror::Error;
use tracing::info;

use crate::args::Args;
use crate::products;
use crate::toolchain::ExternalToolchain;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Spatial(#[from] SpatialInputError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Batch(#[from] BatchFetchError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A boundary file existed but its extent could not be read.
    #[error("Could not read the extent of {path}: {source}")]
    BoundaryFile {
        path: PathBuf,
        #[source]
        source: GeoError,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve the boundary argument: an existing file is asked for its
/// extent, anything else is parsed as a literal.
fn resolve_boundary(raw: &str, toolchain: &ExternalToolchain) -> Result<Boundary, CliError> {
    let path = Path::new(raw);
    if path.exists() {
        let bounds = toolchain
            .bounding_box_of(path)
            .map_err(|source| CliError::BoundaryFile {
                path: path.to_path_buf(),
                source,
            })?;
        return Ok(Boundary::Box(bounds));
    }
    Ok(Boundary::parse_literal(raw)?)
}

pub async fn run(args: Args) -> Result<(), CliError> {
    std::fs::create_dir_all(&args.workspace).map_err(|source| CliError::Io {
        path: args.workspace.clone(),
        source,
    })?;

    let config = products::product_config(args.product, &args.data_dir);
    let index = TileIndex::load(&config.catalog_path)?;
    let toolchain = ExternalToolchain::new();

    let boundary = resolve_boundary(&args.boundary, &toolchain)?;
    let tiles: Vec<_> = match &boundary {
        Boundary::Global => index.all().collect(),
        Boundary::Box(bounds) => index.query(bounds).collect(),
    };
    info!(
        "{} of {} {} tiles intersect the boundary",
        tiles.len(),
        index.len(),
        args.product
    );

    let credentials = match (&args.username, &args.password) {
        (Some(username), Some(password)) => Some(Credentials {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    let coordinator = FetchCoordinator::new(&config, args.cache_dir(), credentials)?;
    let manifest = config
        .checksum_manifest_path
        .as_deref()
        .map(ChecksumManifest::load)
        .transpose()?;

    let jobs = coordinator.plan(tiles.iter().copied(), manifest.as_ref());
    // Tile order follows the catalog; keep it for the mosaic inputs.
    let tile_paths: Vec<PathBuf> = jobs.iter().map(|job| job.target_path.clone()).collect();
    coordinator.fetch_all(jobs).await?;

    let bounds = match boundary {
        Boundary::Box(bounds) => bounds,
        Boundary::Global => args.product.coverage(),
    };
    let pipeline = Pipeline::new(
        PipelineConfig {
            workspace: args.workspace.clone(),
            product: args.product,
            routing: args.routing_algorithm,
            target_epsg: args.target_epsg,
            bounds,
            pixel_size: config.target_pixel_size,
            tfa: args.tfa_range,
        },
        &toolchain,
    );
    let outcomes = pipeline.run(&tile_paths)?;

    for outcome in &outcomes {
        info!(
            "{}: {} ({:?})",
            outcome.stage,
            outcome.path.display(),
            outcome.execution
        );
    }
    Ok(())
}
