//! Error types for catalog loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading or validating a tile catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file is missing or unreadable.
    #[error("Could not read tile catalog {path}: {source}")]
    Io {
        /// Path to the catalog file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not valid JSON of the expected shape.
    #[error("Tile catalog {path} is malformed: {source}")]
    Malformed {
        /// Path to the catalog file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A tile's bounding polygon has too few vertices to be a ring.
    #[error("Tile {tile_id} has a degenerate bounding polygon ({vertices} vertices)")]
    DegeneratePolygon {
        /// The offending tile.
        tile_id: String,
        /// How many vertices the catalog supplied.
        vertices: usize,
    },

    /// A tile's bounding polygon does not close back on its first vertex.
    #[error("Tile {tile_id} has a non-closed bounding polygon")]
    OpenRing {
        /// The offending tile.
        tile_id: String,
    },
}
