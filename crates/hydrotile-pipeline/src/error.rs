use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by geoprocessing collaborators.
///
/// Collaborators are external by nature (command-line tools, raster
/// codecs), so their failures arrive as boxed errors tagged with the
/// operation that produced them.
pub type GeoError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for [`crate::Geoprocessor`] operations.
pub type GeoResult<T> = Result<T, GeoError>;

/// Errors from running the staged pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A pipeline stage failed. The pipeline stops here; artifacts from
    /// earlier stages remain on disk and a re-run resumes after them.
    #[error("Pipeline stage '{stage}' failed: {source}")]
    Stage {
        /// The stage that failed, by artifact name.
        stage: String,
        /// The collaborator's error.
        #[source]
        source: GeoError,
    },

    /// Filesystem work in the workspace failed.
    #[error("Workspace I/O error at {path}: {source}")]
    Io {
        /// The offending path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Wrap a collaborator failure with the stage it belongs to.
    pub(crate) fn stage(stage: impl Into<String>, source: GeoError) -> Self {
        PipelineError::Stage {
            stage: stage.into(),
            source,
        }
    }
}
