//! Georeferenced raster I/O through GDAL.
//!
//! Tiles cut from a large scene keep their projection and affine transform
//! in [`GeoInfo`], so augmented or predicted tiles can be written back in
//! place. Without the `gdal` feature every entry point returns
//! [`TransformError::MissingCollaborator`].

use crate::types::{Image, TransformResult};
#[cfg(not(feature = "gdal"))]
use crate::types::TransformError;
use std::path::Path;

/// Spatial metadata of a raster
#[derive(Debug, Clone, PartialEq)]
pub struct GeoInfo {
    /// Columns
    pub xsize: usize,
    /// Rows
    pub ysize: usize,
    /// Bands
    pub count: usize,
    /// Projection as WKT
    pub projection: String,
    /// GDAL affine transform
    pub geo_transform: [f64; 6],
}

impl GeoInfo {
    /// Metadata describing `image` with the projection and transform of
    /// `self`.
    pub fn with_extent_of(&self, image: &Image) -> GeoInfo {
        let (rows, cols, bands) = image.dim();
        GeoInfo {
            xsize: cols,
            ysize: rows,
            count: bands,
            ..self.clone()
        }
    }
}

#[cfg(feature = "gdal")]
mod imp {
    use super::GeoInfo;
    use crate::types::{DataFormat, Image, TransformError, TransformResult};
    use gdal::raster::Buffer;
    use gdal::{Dataset, DriverManager};
    use ndarray::{Array3, Axis};
    use std::path::Path;

    /// Open handle on a raster dataset
    pub struct GeoRaster {
        pub(super) dataset: Dataset,
    }

    impl std::fmt::Debug for GeoRaster {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let (width, height) = self.dataset.raster_size();
            f.debug_struct("GeoRaster")
                .field("width", &width)
                .field("height", &height)
                .field("bands", &self.dataset.raster_count())
                .finish()
        }
    }

    pub fn open_raster(path: &Path) -> TransformResult<GeoRaster> {
        log::info!("Opening raster: {}", path.display());
        let dataset = Dataset::open(path)?;
        Ok(GeoRaster { dataset })
    }

    pub fn geo_info(raster: &GeoRaster) -> TransformResult<GeoInfo> {
        let (xsize, ysize) = raster.dataset.raster_size();
        Ok(GeoInfo {
            xsize,
            ysize,
            count: raster.dataset.raster_count().max(0) as usize,
            projection: raster.dataset.projection(),
            geo_transform: raster.dataset.geo_transform()?,
        })
    }

    pub fn raster_to_array(raster: &GeoRaster) -> TransformResult<(Image, GeoInfo)> {
        let info = geo_info(raster)?;
        let (width, height) = (info.xsize, info.ysize);
        log::debug!("Raster size: {}x{}x{}", height, width, info.count);

        // GDAL stores bands sequentially
        let mut data = Vec::with_capacity(width * height * info.count);
        for band in 1..=info.count {
            let rasterband = raster.dataset.rasterband(band as isize)?;
            let buffer =
                rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
            data.extend(buffer.data);
        }
        let chw = Array3::from_shape_vec((info.count, height, width), data).map_err(|e| {
            TransformError::shape("GeoRaster", format!("failed to reshape raster: {}", e))
        })?;
        Ok((DataFormat::Chw.to_hwc(chw), info))
    }

    pub fn save_raster(image: &Image, info: &GeoInfo, path: &Path) -> TransformResult<()> {
        log::info!("Saving raster: {}", path.display());
        let (rows, cols, bands) = image.dim();
        if (rows, cols) != (info.ysize, info.xsize) {
            return Err(TransformError::shape(
                "GeoRaster",
                format!(
                    "image is {}x{} but the metadata describes {}x{}",
                    rows, cols, info.ysize, info.xsize
                ),
            ));
        }

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut dataset = driver.create_with_band_type::<u8, _>(
            path,
            cols as isize,
            rows as isize,
            bands as isize,
        )?;
        if !info.projection.is_empty() {
            dataset.set_projection(&info.projection)?;
        }
        dataset.set_geo_transform(&info.geo_transform)?;

        for (b, band) in image.axis_iter(Axis(2)).enumerate() {
            let data: Vec<u8> = band.iter().map(|&v| v.round().clamp(0.0, 255.0) as u8).collect();
            let mut rasterband = dataset.rasterband(b as isize + 1)?;
            rasterband.write((0, 0), (cols, rows), &Buffer::new((cols, rows), data))?;
        }
        Ok(())
    }
}

#[cfg(feature = "gdal")]
pub use imp::{geo_info, GeoRaster};

/// Open a raster dataset.
pub fn open_raster(path: impl AsRef<Path>) -> TransformResult<GeoRaster> {
    #[cfg(feature = "gdal")]
    {
        imp::open_raster(path.as_ref())
    }
    #[cfg(not(feature = "gdal"))]
    {
        Err(missing(path.as_ref()))
    }
}

/// Read every band into a (row, column, band) array together with its
/// spatial metadata.
pub fn raster_to_array(raster: &GeoRaster) -> TransformResult<(Image, GeoInfo)> {
    #[cfg(feature = "gdal")]
    {
        imp::raster_to_array(raster)
    }
    #[cfg(not(feature = "gdal"))]
    {
        match *raster {}
    }
}

/// Write an image as an 8-bit GeoTIFF carrying `info`'s projection and
/// transform. Values are rounded and clamped to [0, 255].
pub fn save_raster(image: &Image, info: &GeoInfo, path: impl AsRef<Path>) -> TransformResult<()> {
    #[cfg(feature = "gdal")]
    {
        imp::save_raster(image, info, path.as_ref())
    }
    #[cfg(not(feature = "gdal"))]
    {
        let _ = (image, info);
        Err(missing(path.as_ref()))
    }
}

/// Raster handle placeholder; cannot be constructed without GDAL support.
#[cfg(not(feature = "gdal"))]
#[derive(Debug)]
pub enum GeoRaster {}

#[cfg(not(feature = "gdal"))]
fn missing(path: &Path) -> TransformError {
    TransformError::MissingCollaborator(format!(
        "GDAL support is not compiled in (enable the `gdal` feature) to access {}",
        path.display()
    ))
}
