//! # hydrotile-index
//!
//! Loads a DEM product's tile catalog and answers spatial-intersection
//! queries against a bounding box.
//!
//! A catalog is a JSON object mapping each tile filename to the closed
//! ring of (lon, lat) vertices bounding that tile. Catalogs are built
//! offline (one per product) and committed alongside the tool; loading
//! one validates every ring up front so a malformed catalog fails
//! immediately rather than mid-download.
//!
//! ## Example
//!
//! ```no_run
//! use hydrotile_common::BoundingBox;
//! use hydrotile_index::TileIndex;
//!
//! let index = TileIndex::load("data/srtm.json")?;
//! let bbox = BoundingBox::new(-124.53, 32.82, -113.71, 42.0)?;
//! for tile in index.query(&bbox) {
//!     println!("{}", tile.id);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod catalog;
mod error;
mod geom;

pub use catalog::{TileIndex, TileRecord};
pub use error::CatalogError;
