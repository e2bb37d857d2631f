//! The built-in product table.
//!
//! Each product names its tile catalog, where tiles download from, the
//! native pixel size the warp should preserve, and whether the archive
//! requires authentication. Catalogs live as JSON files under the data
//! directory, one per product, keyed by tile filename.

use std::path::Path;

use hydrotile_common::{Product, ProductConfig};

/// SRTM 1 arc-second, from the NASA Earthdata archive.
const SRTM_BASE_URL: &str = "https://e4ftl01.cr.usgs.gov/MEASURES/SRTMGL1.003/2000.02.11";

/// HydroSHEDS v1 conditioned DEM, 3 arc-second.
const HYDROSHEDS_BASE_URL: &str = "https://data.hydrosheds.org/file/hydrosheds-v1-con";

/// GMTED2010 7.5 arc-second global tiles.
const GMTED2010_BASE_URL: &str =
    "https://edcintl.cr.usgs.gov/downloads/sciweb1/shared/topo/downloads/GMTED/Global_tiles_GMTED";

const ARC_SECOND: f64 = 1.0 / 3600.0;

/// Build the configuration for one product.
///
/// The checksum manifest is optional: it is picked up when
/// `<data_dir>/<product>.sha256.json` exists and skipped otherwise.
pub fn product_config(product: Product, data_dir: &Path) -> ProductConfig {
    let catalog_path = data_dir.join(format!("{}.json", product.slug()));
    let manifest_path = data_dir.join(format!("{}.sha256.json", product.slug()));
    let checksum_manifest_path = manifest_path.exists().then_some(manifest_path);

    let (download_base_url, pixel, requires_credentials) = match product {
        Product::Srtm => (SRTM_BASE_URL, ARC_SECOND, true),
        Product::HydroSheds => (HYDROSHEDS_BASE_URL, 3.0 * ARC_SECOND, false),
        Product::Gmted2010 => (GMTED2010_BASE_URL, 7.5 * ARC_SECOND, false),
    };

    ProductConfig {
        product,
        catalog_path,
        checksum_manifest_path,
        download_base_url: download_base_url.to_string(),
        target_pixel_size: (pixel, -pixel),
        requires_credentials,
    }
}
