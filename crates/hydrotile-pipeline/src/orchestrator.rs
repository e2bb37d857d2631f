//! Sequences the pipeline stages over one workspace.
//!
//! Stages run strictly in order; each one is skipped when its artifact
//! already exists, so a re-run after a partial failure resumes at the
//! first missing artifact.

use std::path::PathBuf;

use hydrotile_common::{BoundingBox, Product, RoutingMethod, TfaRange};
use tracing::{debug, info};

use crate::artifact::StageLayout;
use crate::error::{GeoResult, PipelineError};
use crate::geoprocessing::Geoprocessor;
use crate::streams::extract_streams_d8;

/// Everything the pipeline needs beyond the tile set itself.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Workspace directory for stage artifacts.
    pub workspace: PathBuf,
    /// The terrain product being processed.
    pub product: Product,
    /// Routing algorithm for flow direction and accumulation.
    pub routing: RoutingMethod,
    /// EPSG code of the target CRS.
    pub target_epsg: u32,
    /// Area of interest, in the source tiles' CRS.
    pub bounds: BoundingBox,
    /// Target pixel size for the warp, in target CRS units.
    pub pixel_size: (f64, f64),
    /// Accumulation thresholds to extract streams for. `None` skips
    /// stream extraction entirely.
    pub tfa: Option<TfaRange>,
}

/// Whether a stage did work or reused its artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExecution {
    /// The stage ran and created its artifact.
    Ran,
    /// The artifact already existed; the stage was skipped.
    Skipped,
}

/// One stage's result in a pipeline run.
#[derive(Debug)]
pub struct StageOutcome {
    /// Stage name, matching the artifact filename prefix.
    pub stage: String,
    /// Where the artifact lives.
    pub path: PathBuf,
    /// Whether the stage ran or was skipped.
    pub execution: StageExecution,
}

/// Drives one pipeline run.
pub struct Pipeline<'a> {
    config: PipelineConfig,
    layout: StageLayout,
    geo: &'a dyn Geoprocessor,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, geo: &'a dyn Geoprocessor) -> Self {
        let layout = StageLayout::new(
            &config.workspace,
            config.product,
            config.routing,
            config.target_epsg,
        );
        Self {
            config,
            layout,
            geo,
        }
    }

    /// The artifact layout this run derives its paths from.
    pub fn layout(&self) -> &StageLayout {
        &self.layout
    }

    /// Run every stage against the (complete) cached tile set.
    ///
    /// Returns one outcome per stage in execution order. Stops at the
    /// first failing stage; artifacts already produced stay on disk.
    pub fn run(&self, tile_paths: &[PathBuf]) -> Result<Vec<StageOutcome>, PipelineError> {
        std::fs::create_dir_all(&self.config.workspace).map_err(|source| PipelineError::Io {
            path: self.config.workspace.clone(),
            source,
        })?;

        let mut outcomes = Vec::new();

        let mosaic = self.layout.mosaic();
        outcomes.push(self.stage("mosaic", mosaic.clone(), || {
            self.geo.build_mosaic(tile_paths, &mosaic)
        })?);

        let warped = self.layout.warped();
        outcomes.push(self.stage("warp", warped.clone(), || {
            self.geo.warp(
                &mosaic,
                &warped,
                &self.config.bounds,
                self.config.target_epsg,
                self.config.pixel_size,
            )
        })?);

        let filled = self.layout.filled();
        outcomes.push(self.stage("fill sinks", filled.clone(), || {
            self.geo
                .fill_sinks(&warped, &filled, self.layout.workspace())
        })?);

        let flow_dir = self.layout.flow_direction();
        outcomes.push(self.stage("flow direction", flow_dir.clone(), || {
            self.geo
                .flow_direction(self.config.routing, &filled, &flow_dir)
        })?);

        let flow_accum = self.layout.flow_accumulation();
        outcomes.push(self.stage("flow accumulation", flow_accum.clone(), || {
            self.geo
                .flow_accumulation(self.config.routing, &filled, &flow_dir, &flow_accum)
        })?);

        if let Some(tfa) = &self.config.tfa {
            let streams_dir = self.layout.streams_dir();
            std::fs::create_dir_all(&streams_dir).map_err(|source| PipelineError::Io {
                path: streams_dir,
                source,
            })?;

            for threshold in tfa.values() {
                let target = self.layout.streams(threshold);
                let stage_name = format!("streams (tfa {threshold})");
                if target.exists() {
                    debug!("Artifact {} exists, skipping", target.display());
                    outcomes.push(StageOutcome {
                        stage: stage_name,
                        path: target,
                        execution: StageExecution::Skipped,
                    });
                    continue;
                }

                info!("Extracting streams at tfa {}", threshold);
                match self.config.routing {
                    RoutingMethod::D8 => {
                        extract_streams_d8(self.geo, &flow_accum, threshold, &target)?
                    }
                    RoutingMethod::Mfd => self
                        .geo
                        .extract_streams_mfd(&flow_accum, &flow_dir, threshold as f64, &target)
                        .map_err(|source| PipelineError::stage(stage_name.clone(), source))?,
                }
                outcomes.push(StageOutcome {
                    stage: stage_name,
                    path: target,
                    execution: StageExecution::Ran,
                });
            }
        }

        info!("Pipeline complete: {} stages", outcomes.len());
        Ok(outcomes)
    }

    /// Run one skip-on-exists stage.
    fn stage(
        &self,
        name: &str,
        artifact: PathBuf,
        execute: impl FnOnce() -> GeoResult<()>,
    ) -> Result<StageOutcome, PipelineError> {
        if artifact.exists() {
            debug!("Artifact {} exists, skipping {}", artifact.display(), name);
            return Ok(StageOutcome {
                stage: name.to_string(),
                path: artifact,
                execution: StageExecution::Skipped,
            });
        }

        info!("Running stage '{}' -> {}", name, artifact.display());
        execute().map_err(|source| PipelineError::stage(name, source))?;
        Ok(StageOutcome {
            stage: name.to_string(),
            path: artifact,
            execution: StageExecution::Ran,
        })
    }
}
