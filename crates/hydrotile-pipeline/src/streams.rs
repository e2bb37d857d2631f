//! Local D8 stream extraction.
//!
//! Classifies a flow-accumulation raster into a byte stream mask: a
//! pixel with accumulation strictly above the threshold is stream (1),
//! at or below is non-stream (0), and nodata stays nodata.

use std::path::Path;

use crate::error::{GeoResult, PipelineError};
use crate::geoprocessing::Geoprocessor;

/// Nodata value for stream rasters.
pub const STREAM_NODATA: u8 = 255;

/// Classify one block of flow-accumulation samples into the stream
/// mask, appending into `out`.
pub fn classify_block(samples: &[f64], nodata: Option<f64>, threshold: f64, out: &mut Vec<u8>) {
    out.reserve(samples.len());
    for &value in samples {
        let class = match nodata {
            Some(nodata_value) if value == nodata_value => STREAM_NODATA,
            _ if value <= threshold => 0,
            _ => 1,
        };
        out.push(class);
    }
}

/// Write the D8 stream raster for one threshold, block by block.
pub fn extract_streams_d8(
    geo: &dyn Geoprocessor,
    flow_accum: &Path,
    threshold: i64,
    target: &Path,
) -> Result<(), PipelineError> {
    extract_inner(geo, flow_accum, threshold, target)
        .map_err(|source| PipelineError::stage(format!("streams (tfa {threshold})"), source))
}

fn extract_inner(
    geo: &dyn Geoprocessor,
    flow_accum: &Path,
    threshold: i64,
    target: &Path,
) -> GeoResult<()> {
    let mut source = geo.open_block_source(flow_accum)?;
    let mut sink = geo.create_block_sink(source.as_ref(), target, STREAM_NODATA)?;

    let nodata = source.nodata();
    let threshold = threshold as f64;
    let mut mask = Vec::new();
    for index in 0..source.block_count() {
        let samples = source.read_block(index)?;
        mask.clear();
        classify_block(&samples, nodata, threshold, &mut mask);
        sink.write_block(&mask)?;
    }
    sink.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_marks_above_threshold_as_stream() {
        let mut out = Vec::new();
        classify_block(&[-9999.0, 5.0, 10.0, 15.0], Some(-9999.0), 10.0, &mut out);
        assert_eq!(out, vec![STREAM_NODATA, 0, 0, 1]);
    }

    #[test]
    fn test_classify_threshold_is_exclusive() {
        // A pixel exactly at the threshold is not a stream.
        let mut out = Vec::new();
        classify_block(&[500.0, 500.0001], Some(-1.0), 500.0, &mut out);
        assert_eq!(out, vec![0, 1]);
    }

    #[test]
    fn test_classify_without_declared_nodata() {
        let mut out = Vec::new();
        classify_block(&[0.0, 1000.0], None, 10.0, &mut out);
        assert_eq!(out, vec![0, 1]);
    }

    #[test]
    fn test_classify_appends_across_blocks() {
        let mut out = Vec::new();
        classify_block(&[20.0], Some(-1.0), 10.0, &mut out);
        classify_block(&[-1.0], Some(-1.0), 10.0, &mut out);
        assert_eq!(out, vec![1, STREAM_NODATA]);
    }
}
