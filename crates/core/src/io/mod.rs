//! I/O operations for reading and writing geospatial data
//!
//! - GeoTIFF rasters (native `tiff` reader/writer with EPSG geokeys)
//! - GeoJSON feature collections (stream networks in, corridors out)

mod geojson;
mod geotiff;

pub use self::geojson::{read_geojson, read_geojson_str, to_geojson_string, write_geojson};
pub use self::geotiff::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffOptions,
};
