use std::path::PathBuf;

use clap::Parser;
use hydrotile_common::{Product, RoutingMethod, TfaRange};

/// Fetch terrain tiles for an area of interest and derive streams.
#[derive(Parser, Debug)]
#[command(name = "hydrotile", version, about)]
pub struct Args {
    /// Workspace directory for pipeline artifacts.
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Tile cache directory. Defaults to <workspace>/tile-cache.
    #[arg(long)]
    pub tile_cache_dir: Option<PathBuf>,

    /// Directory holding the per-product tile catalogs.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// EPSG code of the target projection.
    #[arg(long)]
    pub target_epsg: u32,

    /// Threshold flow accumulation values to extract streams for, as
    /// MIN:MAX:STEP. Example: 500:10000:200. Omit to skip stream
    /// extraction.
    #[arg(long)]
    pub tfa_range: Option<TfaRange>,

    /// Routing algorithm to use.
    #[arg(long, default_value = "d8")]
    pub routing_algorithm: RoutingMethod,

    /// Username for products that require authentication (SRTM).
    #[arg(long)]
    pub username: Option<String>,

    /// Password for products that require authentication (SRTM).
    #[arg(long)]
    pub password: Option<String>,

    /// The terrain product to use.
    pub product: Product,

    /// The area of interest: a path to a spatial file, a literal
    /// "BBOX::minx::miny::maxx::maxy", or "global" for every tile.
    pub boundary: String,
}

impl Args {
    /// The resolved tile cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.tile_cache_dir
            .clone()
            .unwrap_or_else(|| self.workspace.join("tile-cache"))
    }
}
