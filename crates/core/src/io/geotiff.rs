//! GeoTIFF read/write
//!
//! Minimal georeferenced TIFF support for the pipeline's band formats:
//! single-band i8/i32/f32 with a GDAL nodata tag and pixel-scale/tiepoint
//! georeferencing, plus a multi-directory writer for the final mosaic.
//! Integer inputs of any width are widened on read; the pipeline never
//! writes anything wider than i32.

use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::core_types::raster::{GeoTransform, Raster};
use crate::error::RecoveryError;

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, RecoveryError> {
    let file = File::open(path).map_err(|e| RecoveryError::io(path, e))?;
    let decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| RecoveryError::Decode {
            path: path.to_path_buf(),
            source: e,
        })?
        .with_limits(Limits::unlimited());
    Ok(decoder)
}

fn read_transform<R: std::io::Read + Seek>(decoder: &mut Decoder<R>) -> GeoTransform {
    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)
        .ok()
        .flatten()
        .and_then(|v| v.into_f64_vec().ok());
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)
        .ok()
        .flatten()
        .and_then(|v| v.into_f64_vec().ok());

    match (scale, tiepoint) {
        (Some(s), Some(t)) if s.len() >= 2 && t.len() >= 5 => {
            GeoTransform::new(t[3], t[4], s[0], -s[1])
        }
        // Ungeoreferenced test fixtures fall back to a unit grid
        _ => GeoTransform::new(0.0, 0.0, 1.0, -1.0),
    }
}

fn read_nodata<R: std::io::Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse::<f64>().ok())
}

fn decode_error(path: &Path, source: tiff::TiffError) -> RecoveryError {
    RecoveryError::Decode {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a single-band raster as f32, widening integer sample formats.
///
/// # Errors
/// Fails when the file is missing, undecodable, or has an unsupported
/// sample format.
pub fn read_f32(path: &Path) -> Result<Raster<f32>, RecoveryError> {
    let mut decoder = open_decoder(path)?;
    let (width, height) = decoder.dimensions().map_err(|e| decode_error(path, e))?;
    let transform = read_transform(&mut decoder);
    let nodata = read_nodata(&mut decoder);

    let image = decoder.read_image().map_err(|e| decode_error(path, e))?;
    let values: Vec<f32> = match image {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => {
            return Err(RecoveryError::LayerAlignment {
                layer: path.display().to_string(),
                reason: "unsupported sample format".to_string(),
            })
        }
    };

    let data = Array2::from_shape_vec((height as usize, width as usize), values).map_err(|_| {
        RecoveryError::LayerAlignment {
            layer: path.display().to_string(),
            reason: "pixel count does not match declared dimensions".to_string(),
        }
    })?;
    Ok(Raster::new(data, transform, nodata.map(|n| n as f32)))
}

/// Read a single-band raster as i32, truncating floats toward zero.
///
/// # Errors
/// Same failure modes as [`read_f32`].
pub fn read_i32(path: &Path) -> Result<Raster<i32>, RecoveryError> {
    let f = read_f32(path)?;
    let nodata = f.nodata.map(|n| n as i32);
    let data = f.data.mapv(|v| if v.is_nan() { nodata.unwrap_or(0) } else { v as i32 });
    Ok(Raster::new(data, f.transform, nodata))
}

/// Read a single-band raster as i8.
///
/// # Errors
/// Same failure modes as [`read_f32`].
pub fn read_i8(path: &Path) -> Result<Raster<i8>, RecoveryError> {
    let f = read_f32(path)?;
    let nodata = f.nodata.map(|n| n as i8);
    let data = f
        .data
        .mapv(|v| if v.is_nan() { nodata.unwrap_or(0) } else { v as i8 });
    Ok(Raster::new(data, f.transform, nodata))
}

fn write_geo_tags<W: Write + Seek, C: colortype::ColorType>(
    image: &mut tiff::encoder::ImageEncoder<'_, W, C, tiff::encoder::TiffKindStandard>,
    transform: &GeoTransform,
    nodata: &str,
) -> Result<(), tiff::TiffError> {
    let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    image
        .encoder()
        .write_tag(Tag::GdalNodata, nodata)?;
    Ok(())
}

macro_rules! write_band_fn {
    ($name:ident, $t:ty, $color:ty) => {
        /// Write a single-band raster with georeferencing and nodata tags.
        ///
        /// # Errors
        /// Fails when the file cannot be created or encoded.
        pub fn $name(path: &Path, raster: &Raster<$t>) -> Result<(), RecoveryError> {
            let encode = |e| RecoveryError::Encode {
                path: path.to_path_buf(),
                source: e,
            };
            let file = File::create(path).map_err(|e| RecoveryError::io(path, e))?;
            let mut tiff = TiffEncoder::new(BufWriter::new(file)).map_err(encode)?;

            let (rows, cols) = raster.shape();
            let mut image = tiff
                .new_image::<$color>(cols as u32, rows as u32)
                .map_err(encode)?;
            let nodata_str = raster
                .nodata
                .map_or_else(String::new, |n| n.to_string());
            write_geo_tags(&mut image, &raster.transform, &nodata_str).map_err(encode)?;

            let flat: Vec<$t> = raster.data.iter().copied().collect();
            image.write_data(&flat).map_err(encode)?;
            Ok(())
        }
    };
}

write_band_fn!(write_i8, i8, colortype::GrayI8);
write_band_fn!(write_i32, i32, colortype::GrayI32);
write_band_fn!(write_f32, f32, colortype::Gray32Float);

/// Write several i8 bands into one multi-directory GeoTIFF; each directory
/// carries the band name in its `ImageDescription` tag.
///
/// # Errors
/// Fails when the file cannot be created or any band cannot be encoded.
pub fn write_multiband_i8(
    path: &Path,
    bands: &[(&str, &Array2<i8>)],
    transform: &GeoTransform,
    nodata: i8,
) -> Result<(), RecoveryError> {
    let encode = |e| RecoveryError::Encode {
        path: path.to_path_buf(),
        source: e,
    };
    let file = File::create(path).map_err(|e| RecoveryError::io(path, e))?;
    let mut tiff = TiffEncoder::new(BufWriter::new(file)).map_err(encode)?;

    for (name, data) in bands {
        let shape = data.shape();
        let (rows, cols) = (shape[0], shape[1]);
        let mut image = tiff
            .new_image::<colortype::GrayI8>(cols as u32, rows as u32)
            .map_err(encode)?;
        write_geo_tags(&mut image, transform, &nodata.to_string()).map_err(encode)?;
        image
            .encoder()
            .write_tag(Tag::ImageDescription, *name)
            .map_err(encode)?;
        let flat: Vec<i8> = data.iter().copied().collect();
        image.write_data(&flat).map_err(encode)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(name)
    }

    #[test]
    fn test_i8_roundtrip_with_tags() {
        let path = temp_path("recovery_io_i8_roundtrip.tif");
        let transform = GeoTransform::new(500.0, 4000.0, 30.0, -30.0);
        let data = Array2::from_shape_vec((2, 3), vec![1_i8, 0, -1, 127, -128, 5]).unwrap();
        let raster = Raster::new(data, transform, Some(-1_i8));

        write_i8(&path, &raster).unwrap();
        let back = read_i8(&path).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.data, raster.data);
        assert_eq!(back.nodata, Some(-1));
        assert_eq!(back.transform, transform);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_f32_roundtrip() {
        let path = temp_path("recovery_io_f32_roundtrip.tif");
        let transform = GeoTransform::new(0.0, 90.0, 30.0, -30.0);
        let data = Array2::from_shape_vec((2, 2), vec![0.25_f32, 0.5, -9999.0, 0.75]).unwrap();
        let raster = Raster::new(data.clone(), transform, Some(-9999.0));

        write_f32(&path, &raster).unwrap();
        let back = read_f32(&path).unwrap();
        assert_eq!(back.data, data);
        assert_eq!(back.nodata, Some(-9999.0));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_i32_sentinel_preserved() {
        let path = temp_path("recovery_io_i32_sentinel.tif");
        let transform = GeoTransform::new(0.0, 60.0, 30.0, -30.0);
        let data = Array2::from_shape_vec((1, 3), vec![12_i32, -9999, 40]).unwrap();
        let raster = Raster::new(data.clone(), transform, Some(-9999));

        write_i32(&path, &raster).unwrap();
        let back = read_i32(&path).unwrap();
        assert_eq!(back.data, data);
        assert_eq!(back.nodata, Some(-9999));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_multiband_reads_first_directory() {
        let path = temp_path("recovery_io_multiband.tif");
        let transform = GeoTransform::new(0.0, 60.0, 30.0, -30.0);
        let a = Array2::from_elem((2, 2), 3_i8);
        let b = Array2::from_elem((2, 2), 7_i8);
        write_multiband_i8(&path, &[("a", &a), ("b", &b)], &transform, -128).unwrap();

        // single-band readers see the first directory
        let back = read_i8(&path).unwrap();
        assert_eq!(back.data, a);

        let _ = std::fs::remove_file(&path);
    }
}
