//! On-disk tile cache layout.

use std::path::{Path, PathBuf};

use hydrotile_common::Product;

/// Maps `(product, tile_id)` to a path under the cache root.
///
/// Layout is `cache_root/<product>/<tile_filename>`, matching the
/// remote archive's filenames so a cache can be inspected (or seeded)
/// by hand. The cache is append-only and unbounded; the caller is the
/// single writer for any given tile.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    product: Product,
}

impl CacheStore {
    /// Create a store rooted at `cache_root` for one product. No I/O.
    pub fn new<P: AsRef<Path>>(cache_root: P, product: Product) -> Self {
        Self {
            root: cache_root.as_ref().to_path_buf(),
            product,
        }
    }

    /// The product directory under the cache root.
    pub fn product_dir(&self) -> PathBuf {
        self.root.join(self.product.slug())
    }

    /// The cache path for one tile. Pure; performs no I/O.
    pub fn path_for(&self, tile_id: &str) -> PathBuf {
        self.product_dir().join(tile_id)
    }

    /// Whether a tile is present in the cache.
    ///
    /// Presence alone says nothing about integrity; the coordinator
    /// verifies checksummed tiles before trusting them.
    pub fn exists(&self, tile_id: &str) -> bool {
        self.path_for(tile_id).exists()
    }

    /// Create the product directory if it does not exist. Idempotent.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.product_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let store = CacheStore::new("/tmp/tile-cache", Product::Srtm);
        assert_eq!(
            store.path_for("N48W123.SRTMGL1.hgt.zip"),
            PathBuf::from("/tmp/tile-cache/srtm/N48W123.SRTMGL1.hgt.zip")
        );
    }

    #[test]
    fn test_exists_and_ensure_dir() {
        let root = tempfile::tempdir().unwrap();
        let store = CacheStore::new(root.path(), Product::HydroSheds);

        assert!(!store.exists("na_con_3s.zip"));

        store.ensure_dir().unwrap();
        // ensure_dir is idempotent.
        store.ensure_dir().unwrap();
        assert!(store.product_dir().is_dir());

        std::fs::write(store.path_for("na_con_3s.zip"), b"tile bytes").unwrap();
        assert!(store.exists("na_con_3s.zip"));
    }
}
