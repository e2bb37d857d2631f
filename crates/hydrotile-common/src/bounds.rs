//! Bounding boxes and boundary specifications.

use std::str::FromStr;

use thiserror::Error;

/// Errors parsing a boundary specification.
#[derive(Debug, Error)]
pub enum SpatialInputError {
    /// The literal bounding box could not be parsed.
    #[error("Could not parse bounding box from {input:?}: {reason}")]
    UnparseableBounds {
        /// The offending input string.
        input: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The bounding box is inverted on at least one axis.
    #[error("Invalid bounding box: min ({min_x}, {min_y}) exceeds max ({max_x}, {max_y})")]
    InvertedBounds {
        /// Minimum x (west edge).
        min_x: f64,
        /// Minimum y (south edge).
        min_y: f64,
        /// Maximum x (east edge).
        max_x: f64,
        /// Maximum y (north edge).
        max_y: f64,
    },

    /// A boundary file exists but its extent could not be read.
    #[error("Could not read a bounding box from {path}: {reason}")]
    UnreadableFile {
        /// Path to the spatial file.
        path: String,
        /// Why the extent could not be read.
        reason: String,
    },
}

/// An axis-aligned bounding box in the catalog's coordinate reference
/// (geographic lon/lat for every built-in product).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum x (west edge).
    pub min_x: f64,
    /// Minimum y (south edge).
    pub min_y: f64,
    /// Maximum x (east edge).
    pub max_x: f64,
    /// Maximum y (north edge).
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a bounding box, rejecting inverted extents.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, SpatialInputError> {
        if min_x > max_x || min_y > max_y {
            return Err(SpatialInputError::InvertedBounds {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Check whether a point lies within the box, edges included.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// The four corners, counter-clockwise from the southwest.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ]
    }
}

/// A caller-supplied boundary: either an explicit bounding box or the
/// `global` shortcut which selects every tile in the catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Boundary {
    /// Restrict the run to tiles intersecting this box.
    Box(BoundingBox),
    /// Take every tile the product has.
    Global,
}

impl Boundary {
    /// Parse a literal boundary string.
    ///
    /// Accepts `global` (bypasses geometry entirely) or a bounding box
    /// in the form `BBOX::minx::miny::maxx::maxy`. Boundary *files* are
    /// resolved by the caller before reaching this type.
    pub fn parse_literal(input: &str) -> Result<Self, SpatialInputError> {
        if input.eq_ignore_ascii_case("global") {
            return Ok(Boundary::Global);
        }

        let stripped = input.strip_prefix("BBOX::").unwrap_or(input);
        let coords: Vec<f64> = stripped
            .split("::")
            .map(|part| f64::from_str(part.trim()))
            .collect::<Result<_, _>>()
            .map_err(|e| SpatialInputError::UnparseableBounds {
                input: input.to_string(),
                reason: e.to_string(),
            })?;

        if coords.len() != 4 {
            return Err(SpatialInputError::UnparseableBounds {
                input: input.to_string(),
                reason: format!("expected 4 coordinates, found {}", coords.len()),
            });
        }

        BoundingBox::new(coords[0], coords[1], coords[2], coords[3]).map(Boundary::Box)
    }
}
