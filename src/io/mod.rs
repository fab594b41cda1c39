//! I/O collaborators: raster decoding and georeferenced raster access

pub mod geo;
pub mod loader;

pub use geo::{open_raster, raster_to_array, save_raster, GeoInfo, GeoRaster};
#[cfg(feature = "gdal")]
pub use loader::GdalLoader;
pub use loader::{ImageFileLoader, ImageLoader};
