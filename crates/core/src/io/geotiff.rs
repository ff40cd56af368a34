//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is carried by the
//! ModelPixelScale/ModelTiepoint tags, the CRS by an EPSG code in the
//! GeoKey directory, and no-data by the GDAL_NODATA ascii tag.

use crate::crs::{CrsKind, CRS};
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, Gray64Float};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tiff::ColorType;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Always write 32-bit floats, even for `f64` rasters
    pub force_f32: bool,
}

/// Read the first image of a single-band GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a single-band GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    if !matches!(decoder.colortype()?, ColorType::Gray(_)) {
        return Err(Error::UnsupportedDataType("Only single-band GeoTIFFs are supported".to_string()));
    }

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));

    if let Some(nodata) = read_nodata(&mut decoder) {
        apply_nodata(&mut raster, nodata);
    }

    Ok(raster)
}

fn cast_all<S, T>(buf: &[S]) -> Vec<T>
where
    S: num_traits::ToPrimitive + Copy + num_traits::NumCast,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    if keys.len() < 4 {
        return None;
    }

    let mut model_type = None;
    let mut geographic = None;
    let mut projected = None;
    for entry in keys[4..].chunks_exact(4) {
        // Only inline SHORT values (location 0) carry codes we understand
        if entry[1] != 0 {
            continue;
        }
        match entry[0] {
            GT_MODEL_TYPE_KEY => model_type = Some(entry[3]),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(entry[3]),
            PROJECTED_CS_TYPE_KEY => projected = Some(entry[3]),
            _ => {}
        }
    }

    let code = match model_type {
        Some(2) => geographic,
        _ => projected.or(geographic),
    }?;
    (code != USER_DEFINED).then(|| CRS::from_epsg(code as u32))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    let text = text.trim_matches(char::from(0)).trim();
    if text.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    text.parse().ok()
}

/// Float rasters get their sentinel replaced by NaN so downstream
/// algorithms only have to test `is_nan`.
fn apply_nodata<T: RasterElement>(raster: &mut Raster<T>, nodata: f64) {
    if T::is_float() {
        let sentinel = T::default_nodata();
        if !nodata.is_nan() {
            for v in raster.data_mut().iter_mut() {
                if v.to_f64().map_or(false, |x| (x - nodata).abs() < 1e-9 * nodata.abs().max(1.0)) {
                    *v = sentinel;
                }
            }
        }
        raster.set_nodata(Some(sentinel));
    } else if let Some(nd) = num_traits::cast(nodata) {
        raster.set_nodata(Some(nd));
    }
}

/// Write a Raster to a GeoTIFF file
///
/// `f64` rasters are written as 64-bit floats so that derived surfaces
/// survive a write/read cycle bit-for-bit; everything else as 32-bit float.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer, options.unwrap_or_default())?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();
    let wide = T::is_float() && std::mem::size_of::<T>() == 8 && !options.force_f32;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    let geokeys = geokey_directory(raster.crs());
    let nodata = nodata_text(raster);

    if wide {
        let data: Vec<f64> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f64::NAN))
            .collect();
        let mut image = encoder.new_image::<Gray64Float>(cols as u32, rows as u32)?;
        image.encoder().write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
        image.encoder().write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
        image.encoder().write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())?;
        if let Some(text) = &nodata {
            image.encoder().write_tag(Tag::GdalNodata, text.as_str())?;
        }
        image.write_data(&data)?;
    } else {
        let data: Vec<f32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
            .collect();
        let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
        image.encoder().write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
        image.encoder().write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
        image.encoder().write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())?;
        if let Some(text) = &nodata {
            image.encoder().write_tag(Tag::GdalNodata, text.as_str())?;
        }
        image.write_data(&data)?;
    }

    Ok(())
}

/// GeoKey directory: version 1.1.0 header followed by sorted key entries.
fn geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let mut entries: Vec<[u16; 4]> = Vec::new();
    let code = crs.and_then(|c| c.epsg()).and_then(|c| u16::try_from(c).ok());

    match (crs.map(|c| c.kind()), code) {
        (Some(CrsKind::Projected), Some(code)) => {
            entries.push([GT_MODEL_TYPE_KEY, 0, 1, 1]);
            entries.push([GT_RASTER_TYPE_KEY, 0, 1, 1]);
            entries.push([PROJECTED_CS_TYPE_KEY, 0, 1, code]);
        }
        (Some(CrsKind::Geographic), Some(code)) => {
            entries.push([GT_MODEL_TYPE_KEY, 0, 1, 2]);
            entries.push([GT_RASTER_TYPE_KEY, 0, 1, 1]);
            entries.push([GEOGRAPHIC_TYPE_KEY, 0, 1, code]);
        }
        _ => entries.push([GT_RASTER_TYPE_KEY, 0, 1, 1]),
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    keys
}

fn nodata_text<T: RasterElement>(raster: &Raster<T>) -> Option<String> {
    let nd = raster.nodata()?.to_f64()?;
    Some(if nd.is_nan() { "nan".to_string() } else { nd.to_string() })
}
