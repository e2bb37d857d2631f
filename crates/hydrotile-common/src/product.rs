//! Supported DEM products and their configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::bounds::BoundingBox;

/// Error for an unrecognized product name.
#[derive(Debug, Error)]
#[error("Unknown DEM product {0:?} (expected one of: srtm, hydrosheds, gmted2010)")]
pub struct UnknownProductError(pub String);

/// The DEM products this tool knows how to assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    /// NASA SRTMGL1 1 arc-second tiles (requires Earthdata credentials).
    Srtm,
    /// HydroSHEDS v1 conditioned 3 arc-second continental rasters.
    HydroSheds,
    /// USGS GMTED2010 mean-statistic tiles.
    Gmted2010,
}

impl Product {
    /// Lowercase identifier used in cache layout and artifact names.
    pub const fn slug(&self) -> &'static str {
        match self {
            Product::Srtm => "srtm",
            Product::HydroSheds => "hydrosheds",
            Product::Gmted2010 => "gmted2010",
        }
    }

    /// The geographic extent the product's tiles cover. A `global`
    /// run warps to this extent, so the latitude band differs per
    /// product: SRTM and HydroSHEDS stop at 60N while GMTED2010
    /// reaches 84N.
    pub fn coverage(&self) -> BoundingBox {
        let (south, north) = match self {
            Product::Srtm => (-56.0, 60.0),
            Product::HydroSheds => (-56.0, 60.0),
            Product::Gmted2010 => (-70.0, 84.0),
        };
        BoundingBox {
            min_x: -180.0,
            min_y: south,
            max_x: 180.0,
            max_y: north,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Product {
    type Err = UnknownProductError;

    /// Case-insensitive parse of a product name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "srtm" => Ok(Product::Srtm),
            "hydrosheds" => Ok(Product::HydroSheds),
            "gmted2010" => Ok(Product::Gmted2010),
            other => Err(UnknownProductError(other.to_string())),
        }
    }
}

/// Everything the fetch and pipeline phases need to know about one
/// product. Constructed once (the CLI carries a built-in table) and
/// passed in explicitly rather than read from module-level constants.
#[derive(Debug, Clone)]
pub struct ProductConfig {
    /// Which product this configuration describes.
    pub product: Product,
    /// Path to the tile catalog JSON (tile filename -> bounding polygon).
    pub catalog_path: PathBuf,
    /// Optional path to a checksum manifest JSON (tile filename -> hex digest).
    pub checksum_manifest_path: Option<PathBuf>,
    /// Base URL the tile filename is appended to.
    pub download_base_url: String,
    /// Target pixel size for the reprojection stage, in target-CRS units.
    /// A per-product constant, not derived from the source rasters.
    pub target_pixel_size: (f64, f64),
    /// Whether downloads require username/password credentials.
    pub requires_credentials: bool,
}

impl ProductConfig {
    /// The download URL for one tile.
    pub fn tile_url(&self, tile_filename: &str) -> String {
        format!(
            "{}/{}",
            self.download_base_url.trim_end_matches('/'),
            tile_filename
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("SRTM".parse::<Product>().unwrap(), Product::Srtm);
        assert_eq!("srtm".parse::<Product>().unwrap(), Product::Srtm);
        assert_eq!(
            "HydroSHEDS".parse::<Product>().unwrap(),
            Product::HydroSheds
        );
        assert_eq!(
            "gmted2010".parse::<Product>().unwrap(),
            Product::Gmted2010
        );
        assert!("aster".parse::<Product>().is_err());
    }

    #[test]
    fn test_coverage_band_is_per_product() {
        let gmted = Product::Gmted2010.coverage();
        assert_eq!(gmted.max_y, 84.0);
        assert_eq!(gmted.min_y, -70.0);

        let srtm = Product::Srtm.coverage();
        assert_eq!(srtm.max_y, 60.0);
        assert_eq!(srtm.min_y, -56.0);
        assert_eq!((srtm.min_x, srtm.max_x), (-180.0, 180.0));
    }

    #[test]
    fn test_tile_url_joins_cleanly() {
        let config = ProductConfig {
            product: Product::Srtm,
            catalog_path: PathBuf::from("data/srtm.json"),
            checksum_manifest_path: None,
            download_base_url: "https://example.com/SRTMGL1.003/2000.02.11/".to_string(),
            target_pixel_size: (0.000277777777778, -0.000277777777778),
            requires_credentials: true,
        };
        assert_eq!(
            config.tile_url("N48W123.SRTMGL1.hgt.zip"),
            "https://example.com/SRTMGL1.003/2000.02.11/N48W123.SRTMGL1.hgt.zip"
        );
    }
}
