//! Staged hydrological terrain pipeline.
//!
//! Takes a complete, cached tile set and produces the hydrological
//! derivatives: a mosaic, a reprojected crop, a sink-filled DEM, flow
//! direction, flow accumulation, and per-threshold stream rasters.
//! Artifact names are deterministic and stages skip themselves when
//! their artifact already exists, so interrupted runs resume cheaply.
//!
//! Raster heavy lifting is delegated through the [`Geoprocessor`]
//! trait; only D8 stream classification is computed here.

mod artifact;
mod error;
mod geoprocessing;
mod orchestrator;
mod streams;

pub use artifact::StageLayout;
pub use error::{GeoError, GeoResult, PipelineError};
pub use geoprocessing::{BlockSink, BlockSource, Geoprocessor};
pub use orchestrator::{Pipeline, PipelineConfig, StageExecution, StageOutcome};
pub use streams::{classify_block, extract_streams_d8, STREAM_NODATA};
