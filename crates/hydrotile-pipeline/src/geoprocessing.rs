//! The seam between the pipeline and the external geoprocessing stack.
//!
//! Every raster operation the pipeline does not implement itself goes
//! through [`Geoprocessor`]. The orchestrator only sequences stages and
//! names artifacts; the actual mosaicking, warping and routing live in
//! whatever implements this trait. Stream extraction for D8 routing is
//! the one raster computation done locally, and it reads and writes
//! through [`BlockSource`] and [`BlockSink`] so the kernel never holds
//! a whole raster in memory.

use std::path::{Path, PathBuf};

use hydrotile_common::{BoundingBox, RoutingMethod};

use crate::error::GeoResult;

/// Block-wise read access to a single-band raster.
///
/// Blocks are the raster's native chunks, visited in index order from
/// `0` to `block_count() - 1`. Samples are widened to `f64` regardless
/// of the on-disk type.
pub trait BlockSource {
    /// The dataset this source reads from.
    fn path(&self) -> &Path;

    /// Raster width in pixels.
    fn width(&self) -> u32;

    /// Raster height in pixels.
    fn height(&self) -> u32;

    /// The band's nodata value, when one is declared.
    fn nodata(&self) -> Option<f64>;

    /// Number of blocks in the raster.
    fn block_count(&self) -> usize;

    /// Read block `index` as a flat sample buffer.
    fn read_block(&mut self, index: usize) -> GeoResult<Vec<f64>>;
}

/// Block-wise write access to a byte raster being created.
///
/// Blocks must arrive in the same order and shape the paired
/// [`BlockSource`] produced them.
pub trait BlockSink {
    /// Write the next block's samples.
    fn write_block(&mut self, samples: &[u8]) -> GeoResult<()>;

    /// Flush and close the raster.
    fn finish(self: Box<Self>) -> GeoResult<()>;
}

/// External raster operations the pipeline delegates.
pub trait Geoprocessor {
    /// Assemble tiles into a virtual mosaic at `target`.
    fn build_mosaic(&self, tile_paths: &[PathBuf], target: &Path) -> GeoResult<()>;

    /// Reproject and crop `source` to `bounds` in the CRS named by
    /// `target_epsg`, resampling bilinearly at `pixel_size`.
    fn warp(
        &self,
        source: &Path,
        target: &Path,
        bounds: &BoundingBox,
        target_epsg: u32,
        pixel_size: (f64, f64),
    ) -> GeoResult<()>;

    /// Fill hydrological sinks in the DEM at `source`.
    fn fill_sinks(&self, source: &Path, target: &Path, working_dir: &Path) -> GeoResult<()>;

    /// Compute per-pixel flow direction from a sink-filled DEM.
    fn flow_direction(
        &self,
        routing: RoutingMethod,
        filled_dem: &Path,
        target: &Path,
    ) -> GeoResult<()>;

    /// Accumulate upslope area. Both the filled DEM and the pointer
    /// raster are provided because accumulation tools differ in which
    /// one they take as input.
    fn flow_accumulation(
        &self,
        routing: RoutingMethod,
        filled_dem: &Path,
        flow_dir: &Path,
        target: &Path,
    ) -> GeoResult<()>;

    /// Extract an MFD stream network. MFD stream extraction needs both
    /// the accumulation and direction rasters, so it stays delegated.
    fn extract_streams_mfd(
        &self,
        flow_accum: &Path,
        flow_dir: &Path,
        threshold: f64,
        target: &Path,
    ) -> GeoResult<()>;

    /// The bounding box of an existing spatial dataset, in its own CRS.
    fn bounding_box_of(&self, dataset: &Path) -> GeoResult<BoundingBox>;

    /// Open a raster for block-wise reading.
    fn open_block_source(&self, raster: &Path) -> GeoResult<Box<dyn BlockSource>>;

    /// Create a byte raster at `target` with the shape and georeference
    /// of `like`, declaring `nodata`.
    fn create_block_sink(
        &self,
        like: &dyn BlockSource,
        target: &Path,
        nodata: u8,
    ) -> GeoResult<Box<dyn BlockSink>>;
}
