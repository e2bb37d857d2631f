//! Concrete [`Geoprocessor`] backed by the GDAL command-line tools and
//! WhiteboxTools, plus TIFF block adapters for the local stream kernel.
//!
//! Everything here is a thin pass-through: build the command, run it,
//! surface stderr on failure. No raster math happens in this module
//! apart from widening TIFF samples to `f64`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::process::Command;

use hydrotile_common::{BoundingBox, RoutingMethod};
use hydrotile_pipeline::{BlockSink, BlockSource, GeoResult, Geoprocessor};
use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

/// The GDAL_NODATA ASCII tag.
const GDAL_NODATA_TAG: u16 = 42113;

/// GeoTIFF tags carried over from the flow-accumulation raster to the
/// stream raster, by value type.
const GEO_DOUBLE_TAGS: [u16; 4] = [33550, 33922, 34264, 34736];
const GEO_SHORT_TAGS: [u16; 1] = [34735];
const GEO_ASCII_TAGS: [u16; 1] = [34737];

/// WhiteboxTools (pointer, accumulation) tool names per routing
/// family. D-infinity is a distinct algorithm, not MFD, so the MFD
/// variant maps to the FD8 tools.
fn routing_tools(routing: RoutingMethod) -> (&'static str, &'static str) {
    match routing {
        RoutingMethod::D8 => ("D8Pointer", "D8FlowAccumulation"),
        RoutingMethod::Mfd => ("FD8Pointer", "FD8FlowAccumulation"),
    }
}

/// Shells out to `gdalbuildvrt`, `gdalwarp`, `gdalinfo`, `ogrinfo` and
/// `whitebox_tools`, which must be on `PATH`.
#[derive(Debug, Default)]
pub struct ExternalToolchain;

impl ExternalToolchain {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, mut command: Command) -> GeoResult<Vec<u8>> {
        debug!("Running {:?}", command);
        let program = command.get_program().to_string_lossy().into_owned();
        let output = command
            .output()
            .map_err(|e| format!("could not launch {program}: {e}"))?;
        if !output.status.success() {
            return Err(format!(
                "{program} failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }
        Ok(output.stdout)
    }

    fn whitebox(&self, tool: &str, args: &[(&str, &Path)]) -> GeoResult<()> {
        let mut command = Command::new("whitebox_tools");
        command.arg(format!("--run={tool}"));
        for (flag, path) in args {
            command.arg(format!("--{}={}", flag, path.display()));
        }
        self.run(command)?;
        Ok(())
    }

    fn raster_corners(&self, dataset: &Path) -> GeoResult<BoundingBox> {
        let mut command = Command::new("gdalinfo");
        command.arg("-json").arg(dataset);
        let info: serde_json::Value = serde_json::from_slice(&self.run(command)?)
            .map_err(|e| format!("unparseable gdalinfo output for {}: {e}", dataset.display()))?;

        let corner = |name: &str, axis: usize| -> GeoResult<f64> {
            info.get("cornerCoordinates")
                .and_then(|c| c.get(name))
                .and_then(|c| c.get(axis))
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| {
                    format!(
                        "gdalinfo output for {} lacks cornerCoordinates.{name}",
                        dataset.display()
                    )
                    .into()
                })
        };

        let (ulx, uly) = (corner("upperLeft", 0)?, corner("upperLeft", 1)?);
        let (lrx, lry) = (corner("lowerRight", 0)?, corner("lowerRight", 1)?);
        Ok(BoundingBox::new(
            ulx.min(lrx),
            uly.min(lry),
            ulx.max(lrx),
            uly.max(lry),
        )?)
    }

    fn vector_extent(&self, dataset: &Path) -> GeoResult<BoundingBox> {
        let mut command = Command::new("ogrinfo");
        command.arg("-json").arg(dataset);
        let info: serde_json::Value = serde_json::from_slice(&self.run(command)?)
            .map_err(|e| format!("unparseable ogrinfo output for {}: {e}", dataset.display()))?;

        let extent = info
            .get("layers")
            .and_then(|layers| layers.get(0))
            .and_then(|layer| layer.get("geometryFields"))
            .and_then(|fields| fields.get(0))
            .and_then(|field| field.get("extent"))
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| format!("no layer extent found in {}", dataset.display()))?;

        let coord = |axis: usize| -> GeoResult<f64> {
            extent
                .get(axis)
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| format!("bad extent in {}", dataset.display()).into())
        };
        Ok(BoundingBox::new(coord(0)?, coord(1)?, coord(2)?, coord(3)?)?)
    }
}

impl Geoprocessor for ExternalToolchain {
    fn build_mosaic(&self, tile_paths: &[PathBuf], target: &Path) -> GeoResult<()> {
        let mut command = Command::new("gdalbuildvrt");
        command.arg(target);
        command.args(tile_paths);
        self.run(command)?;
        Ok(())
    }

    fn warp(
        &self,
        source: &Path,
        target: &Path,
        bounds: &BoundingBox,
        target_epsg: u32,
        pixel_size: (f64, f64),
    ) -> GeoResult<()> {
        let mut command = Command::new("gdalwarp");
        command
            .arg("-t_srs")
            .arg(format!("EPSG:{target_epsg}"))
            .arg("-te")
            .arg(bounds.min_x.to_string())
            .arg(bounds.min_y.to_string())
            .arg(bounds.max_x.to_string())
            .arg(bounds.max_y.to_string())
            .arg("-tr")
            .arg(pixel_size.0.abs().to_string())
            .arg(pixel_size.1.abs().to_string())
            .arg("-r")
            .arg("bilinear")
            .arg(source)
            .arg(target);
        self.run(command)?;
        Ok(())
    }

    fn fill_sinks(&self, source: &Path, target: &Path, _working_dir: &Path) -> GeoResult<()> {
        self.whitebox("FillDepressions", &[("dem", source), ("output", target)])
    }

    fn flow_direction(
        &self,
        routing: RoutingMethod,
        filled_dem: &Path,
        target: &Path,
    ) -> GeoResult<()> {
        let (pointer_tool, _) = routing_tools(routing);
        self.whitebox(pointer_tool, &[("dem", filled_dem), ("output", target)])
    }

    fn flow_accumulation(
        &self,
        routing: RoutingMethod,
        filled_dem: &Path,
        flow_dir: &Path,
        target: &Path,
    ) -> GeoResult<()> {
        let (_, accumulation_tool) = routing_tools(routing);
        match routing {
            RoutingMethod::D8 => {
                // D8FlowAccumulation accepts the pointer raster
                // directly when told so with --pntr.
                let mut command = Command::new("whitebox_tools");
                command
                    .arg(format!("--run={accumulation_tool}"))
                    .arg(format!("--input={}", flow_dir.display()))
                    .arg(format!("--output={}", target.display()))
                    .arg("--pntr");
                self.run(command)?;
                Ok(())
            }
            // FD8FlowAccumulation only takes a DEM, so the MFD path
            // accumulates from the filled surface.
            RoutingMethod::Mfd => self.whitebox(
                accumulation_tool,
                &[("dem", filled_dem), ("output", target)],
            ),
        }
    }

    fn extract_streams_mfd(
        &self,
        flow_accum: &Path,
        _flow_dir: &Path,
        threshold: f64,
        target: &Path,
    ) -> GeoResult<()> {
        let mut command = Command::new("whitebox_tools");
        command
            .arg("--run=ExtractStreams")
            .arg(format!("--flow_accum={}", flow_accum.display()))
            .arg(format!("--threshold={threshold}"))
            .arg(format!("--output={}", target.display()));
        self.run(command)?;
        Ok(())
    }

    fn bounding_box_of(&self, dataset: &Path) -> GeoResult<BoundingBox> {
        // Rasters answer to gdalinfo; anything else is tried as a
        // vector dataset.
        match self.raster_corners(dataset) {
            Ok(bounds) => Ok(bounds),
            Err(_) => self.vector_extent(dataset),
        }
    }

    fn open_block_source(&self, raster: &Path) -> GeoResult<Box<dyn BlockSource>> {
        Ok(Box::new(TiffBlockSource::open(raster)?))
    }

    fn create_block_sink(
        &self,
        like: &dyn BlockSource,
        target: &Path,
        nodata: u8,
    ) -> GeoResult<Box<dyn BlockSink>> {
        let strips = like.block_count().max(1) as u32;
        let rows_per_strip = like.height().div_ceil(strips);
        let scratch = scratch_path(target);
        let writer = File::create(&scratch)
            .map_err(|e| format!("could not create {}: {e}", scratch.display()))?;
        Ok(Box::new(StreamRasterSink {
            georeference_from: like.path().to_path_buf(),
            target: target.to_path_buf(),
            scratch,
            writer: BufWriter::new(writer),
            written: 0,
            width: like.width(),
            height: like.height(),
            rows_per_strip,
            nodata,
        }))
    }
}

/// Strip-wise reader over a single-band TIFF, widening samples to f64.
pub struct TiffBlockSource {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    width: u32,
    height: u32,
    nodata: Option<f64>,
    strips: usize,
}

impl TiffBlockSource {
    pub fn open(path: &Path) -> GeoResult<Self> {
        let file =
            File::open(path).map_err(|e| format!("could not open {}: {e}", path.display()))?;
        let mut decoder = Decoder::new(BufReader::new(file))?;
        let (width, height) = decoder.dimensions()?;
        let strips = decoder.strip_count()? as usize;
        let nodata = decoder
            .get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA_TAG))
            .ok()
            .and_then(|raw| raw.trim_end_matches('\0').trim().parse().ok());

        Ok(Self {
            path: path.to_path_buf(),
            decoder,
            width,
            height,
            nodata,
            strips,
        })
    }
}

impl BlockSource for TiffBlockSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn block_count(&self) -> usize {
        self.strips
    }

    fn read_block(&mut self, index: usize) -> GeoResult<Vec<f64>> {
        Ok(widen(self.decoder.read_chunk(index as u32)?))
    }
}

fn widen(samples: DecodingResult) -> Vec<f64> {
    match samples {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    }
}

/// Writes a Gray8 stream raster, copying georeferencing from the
/// source it was shaped after.
///
/// Blocks spill to a sibling scratch file as they arrive, so the
/// classified raster is never held in memory whole. The TIFF encoder's
/// image writer borrows the encoder for its entire lifetime and cannot
/// live in the struct across `write_block` calls; `finish` instead
/// streams strips back out of the scratch file in one pass and then
/// removes it.
pub struct StreamRasterSink {
    georeference_from: PathBuf,
    target: PathBuf,
    scratch: PathBuf,
    writer: BufWriter<File>,
    written: u64,
    width: u32,
    height: u32,
    rows_per_strip: u32,
    nodata: u8,
}

impl StreamRasterSink {
    fn encode(&mut self) -> GeoResult<()> {
        self.writer
            .flush()
            .map_err(|e| format!("could not flush {}: {e}", self.scratch.display()))?;

        let expected = u64::from(self.width) * u64::from(self.height);
        if self.written != expected {
            return Err(format!(
                "stream raster {} got {} samples, expected {expected}",
                self.target.display(),
                self.written,
            )
            .into());
        }

        let classified = File::open(&self.scratch)
            .map_err(|e| format!("could not reopen {}: {e}", self.scratch.display()))?;
        let mut classified = BufReader::new(classified);

        let file = File::create(&self.target)
            .map_err(|e| format!("could not create {}: {e}", self.target.display()))?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
        let mut image = encoder.new_image::<colortype::Gray8>(self.width, self.height)?;
        image.rows_per_strip(self.rows_per_strip)?;

        copy_geo_tags(&self.georeference_from, &mut image)?;
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA_TAG), self.nodata.to_string().as_str())?;

        let samples_per_strip = (self.rows_per_strip as u64 * u64::from(self.width)).max(1);
        let mut strip = vec![0u8; samples_per_strip as usize];
        let mut remaining = expected;
        while remaining > 0 {
            let take = remaining.min(samples_per_strip) as usize;
            classified
                .read_exact(&mut strip[..take])
                .map_err(|e| format!("could not read {}: {e}", self.scratch.display()))?;
            image.write_strip(&strip[..take])?;
            remaining -= take as u64;
        }
        image.finish()?;
        Ok(())
    }
}

impl BlockSink for StreamRasterSink {
    fn write_block(&mut self, samples: &[u8]) -> GeoResult<()> {
        self.writer
            .write_all(samples)
            .map_err(|e| format!("could not write {}: {e}", self.scratch.display()))?;
        self.written += samples.len() as u64;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> GeoResult<()> {
        let result = self.encode();
        let _ = std::fs::remove_file(&self.scratch);
        result
    }
}

/// Scratch spill path next to `target`.
fn scratch_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

/// Copy the GeoTIFF georeferencing tags from `source` into the image
/// being encoded. Tags absent from the source are skipped.
fn copy_geo_tags<W: std::io::Write + std::io::Seek>(
    source: &Path,
    image: &mut tiff::encoder::ImageEncoder<'_, W, colortype::Gray8, tiff::encoder::TiffKindStandard>,
) -> GeoResult<()> {
    let file =
        File::open(source).map_err(|e| format!("could not open {}: {e}", source.display()))?;
    let mut decoder = Decoder::new(BufReader::new(file))?;

    for code in GEO_DOUBLE_TAGS {
        if let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(code))? {
            let doubles = value.into_f64_vec()?;
            image
                .encoder()
                .write_tag(Tag::Unknown(code), doubles.as_slice())?;
        }
    }
    for code in GEO_SHORT_TAGS {
        if let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(code))? {
            let shorts = value.into_u16_vec()?;
            image
                .encoder()
                .write_tag(Tag::Unknown(code), shorts.as_slice())?;
        }
    }
    for code in GEO_ASCII_TAGS {
        if let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(code))? {
            if let Value::Ascii(text) = value {
                image
                    .encoder()
                    .write_tag(Tag::Unknown(code), text.as_str())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::colortype::Gray32Float;

    fn write_float_tiff(path: &Path, width: u32, height: u32, samples: &[f32], nodata: f64) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(BufWriter::new(file)).unwrap();
        let mut image = encoder.new_image::<Gray32Float>(width, height).unwrap();
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA_TAG), nodata.to_string().as_str())
            .unwrap();
        image.write_data(samples).unwrap();
    }

    #[test]
    fn test_source_reads_samples_and_nodata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accum.tif");
        write_float_tiff(&path, 2, 2, &[-9999.0, 5.0, 10.0, 15.0], -9999.0);

        let mut source = TiffBlockSource::open(&path).unwrap();
        assert_eq!(source.width(), 2);
        assert_eq!(source.height(), 2);
        assert_eq!(source.nodata(), Some(-9999.0));

        let mut all = Vec::new();
        for index in 0..source.block_count() {
            all.extend(source.read_block(index).unwrap());
        }
        assert_eq!(all, vec![-9999.0, 5.0, 10.0, 15.0]);
    }

    #[test]
    fn test_sink_round_trips_stream_mask() {
        let dir = tempfile::tempdir().unwrap();
        let accum_path = dir.path().join("accum.tif");
        let streams_path = dir.path().join("streams.tif");
        write_float_tiff(&accum_path, 2, 2, &[-9999.0, 5.0, 10.0, 15.0], -9999.0);

        let toolchain = ExternalToolchain::new();
        let source = TiffBlockSource::open(&accum_path).unwrap();
        let mut sink = toolchain
            .create_block_sink(&source, &streams_path, 255)
            .unwrap();
        sink.write_block(&[255, 0]).unwrap();
        sink.write_block(&[0, 1]).unwrap();
        sink.finish().unwrap();

        // The spill file is gone once the raster is encoded.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 2, "unexpected leftovers: {names:?}");

        let mut written = TiffBlockSource::open(&streams_path).unwrap();
        assert_eq!(written.nodata(), Some(255.0));
        let mut all = Vec::new();
        for index in 0..written.block_count() {
            all.extend(written.read_block(index).unwrap());
        }
        assert_eq!(all, vec![255.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_sink_rejects_short_raster() {
        let dir = tempfile::tempdir().unwrap();
        let accum_path = dir.path().join("accum.tif");
        write_float_tiff(&accum_path, 2, 2, &[1.0, 2.0, 3.0, 4.0], -1.0);

        let toolchain = ExternalToolchain::new();
        let source = TiffBlockSource::open(&accum_path).unwrap();
        let streams_path = dir.path().join("streams.tif");
        let mut sink = toolchain
            .create_block_sink(&source, &streams_path, 255)
            .unwrap();
        sink.write_block(&[1, 0]).unwrap();
        assert!(sink.finish().is_err());

        // The failed sink cleans up after itself.
        assert!(!scratch_path(&streams_path).exists());
    }

    #[test]
    fn test_mfd_routing_maps_to_fd8_tools() {
        assert_eq!(
            routing_tools(RoutingMethod::Mfd),
            ("FD8Pointer", "FD8FlowAccumulation")
        );
        assert_eq!(
            routing_tools(RoutingMethod::D8),
            ("D8Pointer", "D8FlowAccumulation")
        );
    }
}
