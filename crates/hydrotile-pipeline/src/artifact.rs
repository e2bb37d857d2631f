//! Deterministic artifact naming for pipeline stages.
//!
//! Every stage writes exactly one artifact whose filename encodes the
//! stage index, the product and (where it matters) the routing method
//! and threshold. The names are a pure function of the pipeline
//! parameters, which is what makes skip-on-exists resumability work:
//! a re-run with the same parameters derives the same paths.

use std::path::{Path, PathBuf};

use hydrotile_common::{Product, RoutingMethod};

/// Derives stage artifact paths inside one workspace.
#[derive(Debug, Clone)]
pub struct StageLayout {
    workspace: PathBuf,
    product: Product,
    routing: RoutingMethod,
    target_epsg: u32,
}

impl StageLayout {
    pub fn new<P: AsRef<Path>>(
        workspace: P,
        product: Product,
        routing: RoutingMethod,
        target_epsg: u32,
    ) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            product,
            routing,
            target_epsg,
        }
    }

    /// The workspace root.
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Stage 0: the virtual mosaic of all required tiles.
    pub fn mosaic(&self) -> PathBuf {
        self.workspace
            .join(format!("0_{}_mosaic.vrt", self.product.slug()))
    }

    /// Stage 1: the mosaic cropped and reprojected to the target CRS.
    pub fn warped(&self) -> PathBuf {
        self.workspace.join(format!(
            "1_{}_cropped_EPSG{}.tif",
            self.product.slug(),
            self.target_epsg
        ))
    }

    /// Stage 2: the sink-filled DEM.
    pub fn filled(&self) -> PathBuf {
        self.workspace
            .join(format!("2_{}_pitfilled.tif", self.product.slug()))
    }

    /// Stage 3: per-pixel flow direction.
    pub fn flow_direction(&self) -> PathBuf {
        self.workspace.join(format!(
            "3_{}_{}_flow_dir.tif",
            self.product.slug(),
            self.routing.slug()
        ))
    }

    /// Stage 4: accumulated upslope area.
    pub fn flow_accumulation(&self) -> PathBuf {
        self.workspace.join(format!(
            "4_{}_{}_flow_accumulation.tif",
            self.product.slug(),
            self.routing.slug()
        ))
    }

    /// Directory holding the per-threshold stream rasters.
    pub fn streams_dir(&self) -> PathBuf {
        self.workspace.join("streams")
    }

    /// Stage 5: the stream raster for one accumulation threshold.
    pub fn streams(&self, threshold: i64) -> PathBuf {
        self.streams_dir().join(format!(
            "tfa{}_{}_streams.tif",
            threshold,
            self.routing.slug()
        ))
    }
}
