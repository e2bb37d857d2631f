//! Streaming content verification for cached tiles.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::FetchError;

/// Read size for streaming digests. Tiles can be gigabytes, so the
/// file is never loaded whole.
const BLOCK_SIZE: usize = 64 * 1024;

/// Compute the hex SHA-256 digest of a file, streaming block-wise.
pub fn digest_file(path: &Path) -> Result<String, FetchError> {
    let io_err = |source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut block = vec![0u8; BLOCK_SIZE];

    loop {
        let n = file.read(&mut block).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a file against an expected hex digest.
///
/// Returns [`FetchError::ChecksumMismatch`] carrying both digests when
/// the content does not match.
pub fn verify_file(path: &Path, expected: &str) -> Result<(), FetchError> {
    debug!(path = %path.display(), "Checksumming");
    let actual = digest_file(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(FetchError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    debug!(path = %path.display(), "Checksum verified");
    Ok(())
}

/// Known-good digests for a product's tiles, loaded from a JSON object
/// of `tile filename -> hex digest`. Tiles without an entry are fetched
/// without verification.
#[derive(Debug, Default)]
pub struct ChecksumManifest {
    entries: HashMap<String, String>,
}

impl ChecksumManifest {
    /// Load a manifest file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FetchError> {
        let path = path.as_ref();
        let manifest_err = |reason: String| FetchError::Manifest {
            path: path.to_path_buf(),
            reason,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| manifest_err(e.to_string()))?;
        let entries: HashMap<String, String> =
            serde_json::from_str(&contents).map_err(|e| manifest_err(e.to_string()))?;
        Ok(Self { entries })
    }

    /// The expected digest for a tile, if the manifest has one.
    pub fn expected_for(&self, tile_id: &str) -> Option<&str> {
        self.entries.get(tile_id).map(String::as_str)
    }

    /// Number of manifest entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // SHA-256 of the ASCII string "hello world".
    const HELLO_DIGEST: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_digest_known_value() {
        let file = write_temp(b"hello world");
        assert_eq!(digest_file(file.path()).unwrap(), HELLO_DIGEST);
    }

    #[test]
    fn test_digest_spans_block_boundary() {
        // Content longer than one read block digests identically to a
        // one-shot hash.
        let contents = vec![0xabu8; BLOCK_SIZE * 2 + 17];
        let file = write_temp(&contents);
        let expected = hex::encode(Sha256::digest(&contents));
        assert_eq!(digest_file(file.path()).unwrap(), expected);
    }

    #[test]
    fn test_verify_accepts_matching_and_uppercase() {
        let file = write_temp(b"hello world");
        verify_file(file.path(), HELLO_DIGEST).unwrap();
        verify_file(file.path(), &HELLO_DIGEST.to_uppercase()).unwrap();
    }

    #[test]
    fn test_verify_rejects_mismatch() {
        let file = write_temp(b"corrupted content");
        let err = verify_file(file.path(), HELLO_DIGEST).unwrap_err();
        match err {
            FetchError::ChecksumMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, HELLO_DIGEST);
                assert_ne!(actual, HELLO_DIGEST);
            }
            other => panic!("expected ChecksumMismatch, got {other}"),
        }
    }

    #[test]
    fn test_manifest_lookup() {
        let file = write_temp(
            br#"{"na_con_3s.zip": "02b0943bc1cafe714612ed193b38cbbe02b0943bc1cafe714612ed193b38cbbe"}"#,
        );
        let manifest = ChecksumManifest::load(file.path()).unwrap();
        assert_eq!(manifest.len(), 1);
        assert!(manifest.expected_for("na_con_3s.zip").is_some());
        assert!(manifest.expected_for("eu_con_3s.zip").is_none());
    }

    #[test]
    fn test_manifest_malformed() {
        let file = write_temp(b"[1, 2, 3]");
        assert!(matches!(
            ChecksumManifest::load(file.path()),
            Err(FetchError::Manifest { .. })
        ));
    }
}
