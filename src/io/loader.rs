use crate::types::{DataFormat, Image, TransformError, TransformResult};
use image::{DynamicImage, ImageBuffer, Pixel};
use ndarray::{s, Array3};
use num_traits::AsPrimitive;
use std::path::Path;

/// Reads one raster from disk as a (row, column, band) `f32` array.
///
/// `layout` is only a hint for loaders of raw band arrays that cannot tell
/// interleaved from band-sequential storage on their own. Container formats
/// carry their own layout, so [`ImageFileLoader`] and `GdalLoader` ignore it.
/// `is_label` and `classes_num` let a loader post-process class maps.
pub trait ImageLoader: Send + Sync + std::fmt::Debug {
    fn read(
        &self,
        path: &Path,
        layout: DataFormat,
        is_label: bool,
        classes_num: usize,
    ) -> TransformResult<Image>;
}

/// Keep the first band of a label raster and clip binary change masks
/// stored as 0/255 down to 0/1.
pub fn prepare_label(image: Image, classes_num: usize) -> Image {
    let mut label = image.slice(s![.., .., ..1]).to_owned();
    if classes_num == 2 {
        label.mapv_inplace(|v| if v > 1.0 { 1.0 } else { v });
    }
    label
}

/// Widen an interleaved pixel buffer to an `f32` (row, column, band) array.
fn buffer_to_image<P>(buffer: &ImageBuffer<P, Vec<P::Subpixel>>) -> TransformResult<Image>
where
    P: Pixel,
    P::Subpixel: AsPrimitive<f32>,
{
    let (width, height) = buffer.dimensions();
    let channels = P::CHANNEL_COUNT as usize;
    let data: Vec<f32> = buffer.as_raw().iter().map(|&v| v.as_()).collect();
    Array3::from_shape_vec((height as usize, width as usize, channels), data).map_err(|e| {
        TransformError::shape(
            "ImageFileLoader",
            format!("failed to reshape decoded raster: {}", e),
        )
    })
}

/// Convert a decoded image without rescaling its values.
pub fn dynamic_to_image(decoded: DynamicImage) -> TransformResult<Image> {
    match decoded {
        DynamicImage::ImageLuma8(buffer) => buffer_to_image(&buffer),
        DynamicImage::ImageLumaA8(buffer) => buffer_to_image(&buffer),
        DynamicImage::ImageRgb8(buffer) => buffer_to_image(&buffer),
        DynamicImage::ImageRgba8(buffer) => buffer_to_image(&buffer),
        DynamicImage::ImageLuma16(buffer) => buffer_to_image(&buffer),
        DynamicImage::ImageLumaA16(buffer) => buffer_to_image(&buffer),
        DynamicImage::ImageRgb16(buffer) => buffer_to_image(&buffer),
        DynamicImage::ImageRgba16(buffer) => buffer_to_image(&buffer),
        DynamicImage::ImageRgb32F(buffer) => buffer_to_image(&buffer),
        DynamicImage::ImageRgba32F(buffer) => buffer_to_image(&buffer),
        other => buffer_to_image(&other.to_rgba32f()),
    }
}

/// Loader for common image containers (PNG, JPEG, TIFF, BMP) backed by the
/// `image` crate.
///
/// Decoded pixels are always interleaved, so `layout` does not apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileLoader;

impl ImageLoader for ImageFileLoader {
    fn read(
        &self,
        path: &Path,
        _layout: DataFormat,
        is_label: bool,
        classes_num: usize,
    ) -> TransformResult<Image> {
        log::debug!(
            "Reading {} from {}",
            if is_label { "label" } else { "image" },
            path.display()
        );
        let decoded = image::open(path)?;
        let image = dynamic_to_image(decoded)?;
        log::debug!("Decoded raster shape: {:?}", image.dim());

        if is_label {
            Ok(prepare_label(image, classes_num))
        } else {
            Ok(image)
        }
    }
}

/// Loader for any raster format GDAL can open (GeoTIFF, ENVI .img, ...).
#[cfg(feature = "gdal")]
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalLoader;

#[cfg(feature = "gdal")]
impl ImageLoader for GdalLoader {
    fn read(
        &self,
        path: &Path,
        _layout: DataFormat,
        is_label: bool,
        classes_num: usize,
    ) -> TransformResult<Image> {
        log::debug!("Reading {} through GDAL", path.display());
        let raster = crate::io::geo::open_raster(path)?;
        let (image, _) = crate::io::geo::raster_to_array(&raster)?;
        if is_label {
            Ok(prepare_label(image, classes_num))
        } else {
            Ok(image)
        }
    }
}
