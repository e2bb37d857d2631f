//! Tile catalog loading and querying.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hydrotile_common::BoundingBox;

use crate::error::CatalogError;
use crate::geom;

/// One catalog entry: a downloadable tile and its bounding polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    /// The tile's filename in the remote archive (also its cache key).
    pub id: String,
    /// Closed ring of (lon, lat) vertices bounding the tile.
    pub bounding_polygon: Vec<(f64, f64)>,
}

/// A product's tile catalog, loaded once and queried read-only.
///
/// Records keep the catalog's insertion order; `query` yields matches
/// in that order (not spatially sorted).
#[derive(Debug)]
pub struct TileIndex {
    records: Vec<TileRecord>,
}

impl TileIndex {
    /// Load and validate a catalog file.
    ///
    /// Fails if the file is missing, is not a JSON object of
    /// `filename -> [[lon, lat], …]`, or if any polygon is degenerate
    /// (fewer than four vertices) or does not close on its first
    /// vertex.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // serde_json's preserve_order feature keeps the object order,
        // which defines the query ordering contract.
        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                CatalogError::Malformed {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        let mut records = Vec::with_capacity(raw.len());
        for (id, value) in raw {
            let bounding_polygon: Vec<(f64, f64)> =
                serde_json::from_value(value).map_err(|source| CatalogError::Malformed {
                    path: path.to_path_buf(),
                    source,
                })?;

            // A closed triangle is the smallest legal ring.
            if bounding_polygon.len() < 4 {
                return Err(CatalogError::DegeneratePolygon {
                    tile_id: id,
                    vertices: bounding_polygon.len(),
                });
            }
            let first = bounding_polygon[0];
            let last = bounding_polygon[bounding_polygon.len() - 1];
            if first != last {
                return Err(CatalogError::OpenRing { tile_id: id });
            }

            records.push(TileRecord {
                id,
                bounding_polygon,
            });
        }

        Ok(Self { records })
    }

    /// Number of tiles in the catalog.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Tiles whose bounding polygon intersects `bbox`, in catalog
    /// order. Boundary-touching tiles are included. The iterator is
    /// lazy; re-querying re-scans the catalog.
    pub fn query<'a>(
        &'a self,
        bbox: &'a BoundingBox,
    ) -> impl Iterator<Item = &'a TileRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| geom::ring_intersects_bbox(&record.bounding_polygon, bbox))
    }

    /// Every tile in the catalog, bypassing geometry. Used for
    /// `global` runs.
    pub fn all(&self) -> impl Iterator<Item = &TileRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// A catalog of 1x1 degree tiles on a grid, like SRTM's layout.
    fn grid_catalog_json() -> String {
        let mut entries = Vec::new();
        for lon in [-123, -122, -121] {
            for lat in [47, 48] {
                let id = format!("N{lat}W{}.hgt.zip", -lon);
                let ring = format!(
                    "[[{lon}, {lat}], [{e}, {lat}], [{e}, {n}], [{lon}, {n}], [{lon}, {lat}]]",
                    e = lon + 1,
                    n = lat + 1,
                );
                entries.push(format!("\"{id}\": {ring}"));
            }
        }
        format!("{{{}}}", entries.join(", "))
    }

    fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_and_query_grid() {
        let file = write_catalog(&grid_catalog_json());
        let index = TileIndex::load(file.path()).unwrap();
        assert_eq!(index.len(), 6);

        // A box inside a single tile finds exactly that tile.
        let bbox = BoundingBox::new(-122.6, 47.3, -122.4, 47.7).unwrap();
        let hits: Vec<&str> = index.query(&bbox).map(|r| r.id.as_str()).collect();
        assert_eq!(hits, vec!["N47W123.hgt.zip"]);

        // A box spanning the -122 meridian finds tiles on both sides.
        let bbox = BoundingBox::new(-122.5, 47.3, -121.5, 47.7).unwrap();
        let hits: Vec<&str> = index.query(&bbox).map(|r| r.id.as_str()).collect();
        assert_eq!(hits, vec!["N47W123.hgt.zip", "N47W122.hgt.zip"]);
    }

    #[test]
    fn test_query_boundary_touch_included() {
        let file = write_catalog(&grid_catalog_json());
        let index = TileIndex::load(file.path()).unwrap();

        // Box whose west edge is exactly the -122 meridian: tiles west
        // of it touch at the boundary and must be included.
        let bbox = BoundingBox::new(-122.0, 47.2, -121.5, 47.8).unwrap();
        let hits: Vec<&str> = index.query(&bbox).map(|r| r.id.as_str()).collect();
        assert_eq!(hits, vec!["N47W123.hgt.zip", "N47W122.hgt.zip"]);
    }

    #[test]
    fn test_query_excludes_disjoint_tiles() {
        let file = write_catalog(&grid_catalog_json());
        let index = TileIndex::load(file.path()).unwrap();

        let bbox = BoundingBox::new(10.0, 10.0, 11.0, 11.0).unwrap();
        assert_eq!(index.query(&bbox).count(), 0);
    }

    #[test]
    fn test_query_is_restartable() {
        let file = write_catalog(&grid_catalog_json());
        let index = TileIndex::load(file.path()).unwrap();
        let bbox = BoundingBox::new(-123.0, 47.0, -121.0, 49.0).unwrap();

        let first: Vec<&str> = index.query(&bbox).map(|r| r.id.as_str()).collect();
        let second: Vec<&str> = index.query(&bbox).map(|r| r.id.as_str()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn test_all_bypasses_geometry() {
        let file = write_catalog(&grid_catalog_json());
        let index = TileIndex::load(file.path()).unwrap();
        assert_eq!(index.all().count(), index.len());
    }

    #[test]
    fn test_missing_catalog_is_io_error() {
        let err = TileIndex::load("/nonexistent/catalog.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let file = write_catalog("{\"tile.zip\": [[0, 0], [1, ");
        let err = TileIndex::load(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { .. }));
    }

    #[test]
    fn test_open_ring_rejected() {
        let file =
            write_catalog("{\"tile.zip\": [[0, 0], [1, 0], [1, 1], [0, 1]]}");
        let err = TileIndex::load(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::OpenRing { .. }));
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let file = write_catalog("{\"tile.zip\": [[0, 0], [1, 1], [0, 0]]}");
        let err = TileIndex::load(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::DegeneratePolygon { .. }));
    }
}
