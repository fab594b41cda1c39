use ndarray::{Array2, Array3};
use std::fmt;
use std::str::FromStr;

/// Multi-band image sample stack (row x column x band)
pub type Image = Array3<f32>;

/// Per-pixel class map (row x column)
pub type Label = Array2<i32>;

/// Label map as handed to the model after the final coercion
pub type LabelOutput = Array2<i64>;

/// Label value excluded from the loss, used to fill exposed label regions
pub const DEFAULT_IGNORE_VALUE: i32 = 255;

/// Image value used to fill exposed image regions (no ignore semantics)
pub const IMAGE_FILL_VALUE: f32 = 0.0;

/// Memory layout of raw multi-band arrays handed to a loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    /// Row, column, band
    #[default]
    Hwc,
    /// Band, row, column
    Chw,
}

impl DataFormat {
    /// Reorder a raw array in this layout into (row, column, band).
    pub fn to_hwc(self, array: Array3<f32>) -> Image {
        match self {
            DataFormat::Hwc => array,
            DataFormat::Chw => array.permuted_axes([1, 2, 0]).as_standard_layout().into_owned(),
        }
    }
}

impl FromStr for DataFormat {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HWC" => Ok(DataFormat::Hwc),
            "CHW" => Ok(DataFormat::Chw),
            other => Err(TransformError::config(
                "Compose",
                format!("data_format must be \"HWC\" or \"CHW\", got \"{}\"", other),
            )),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::Hwc => write!(f, "HWC"),
            DataFormat::Chw => write!(f, "CHW"),
        }
    }
}

/// One training unit: co-registered acquisitions in temporal order plus
/// the optional label maps.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub images: Vec<Image>,
    pub labels: Option<Vec<Label>>,
}

impl Sample {
    pub fn new(images: Vec<Image>, labels: Option<Vec<Label>>) -> Self {
        Self { images, labels }
    }

    /// Sample without label maps
    pub fn unlabeled(images: Vec<Image>) -> Self {
        Self { images, labels: None }
    }

    /// Check that every image and label share one non-empty (rows, cols)
    /// extent and return it.
    pub fn check_extent(&self, operator: &'static str) -> TransformResult<(usize, usize)> {
        let first = self
            .images
            .first()
            .ok_or_else(|| TransformError::shape(operator, "sample contains no images"))?;
        let (rows, cols, _) = first.dim();
        if rows == 0 || cols == 0 {
            return Err(TransformError::shape(
                operator,
                format!("image 0 has an empty {}x{} extent", rows, cols),
            ));
        }

        for (i, image) in self.images.iter().enumerate().skip(1) {
            let (r, c, _) = image.dim();
            if (r, c) != (rows, cols) {
                return Err(TransformError::shape(
                    operator,
                    format!(
                        "image {} is {}x{} but image 0 is {}x{}",
                        i, r, c, rows, cols
                    ),
                ));
            }
        }

        if let Some(labels) = &self.labels {
            for (i, label) in labels.iter().enumerate() {
                if label.dim() != (rows, cols) {
                    let (r, c) = label.dim();
                    return Err(TransformError::shape(
                        operator,
                        format!(
                            "label {} is {}x{} but the images are {}x{}",
                            i, r, c, rows, cols
                        ),
                    ));
                }
            }
        }

        Ok((rows, cols))
    }
}

/// Error types for sample transformation
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("{operator}: invalid configuration: {message}")]
    Configuration {
        operator: &'static str,
        message: String,
    },

    #[error("{operator}: shape error: {message}")]
    Shape {
        operator: &'static str,
        message: String,
    },

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Pipeline configuration parsing error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

impl TransformError {
    pub(crate) fn config(operator: &'static str, message: impl Into<String>) -> Self {
        TransformError::Configuration {
            operator,
            message: message.into(),
        }
    }

    pub(crate) fn shape(operator: &'static str, message: impl Into<String>) -> Self {
        TransformError::Shape {
            operator,
            message: message.into(),
        }
    }
}

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_format_parsing() {
        assert_eq!("HWC".parse::<DataFormat>().unwrap(), DataFormat::Hwc);
        assert_eq!("CHW".parse::<DataFormat>().unwrap(), DataFormat::Chw);

        let err = "NHWC".parse::<DataFormat>().unwrap_err();
        assert!(matches!(err, TransformError::Configuration { operator: "Compose", .. }));
        assert!(err.to_string().contains("NHWC"));
    }

    #[test]
    fn test_chw_to_hwc() {
        // 2 bands, 1 row, 3 columns
        let chw = Array3::from_shape_vec((2, 1, 3), vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0]).unwrap();
        let hwc = DataFormat::Chw.to_hwc(chw);

        assert_eq!(hwc.dim(), (1, 3, 2));
        assert_eq!(hwc[[0, 1, 0]], 2.0);
        assert_eq!(hwc[[0, 1, 1]], 20.0);
        assert!(hwc.is_standard_layout());
    }

    #[test]
    fn test_extent_mismatch() {
        let sample = Sample::new(
            vec![Image::zeros((4, 4, 3)), Image::zeros((4, 5, 3))],
            None,
        );
        let err = sample.check_extent("Resize").unwrap_err();
        assert!(matches!(err, TransformError::Shape { operator: "Resize", .. }));

        let sample = Sample::new(
            vec![Image::zeros((4, 4, 3))],
            Some(vec![Label::zeros((3, 4))]),
        );
        assert!(sample.check_extent("RandomFlip").is_err());

        let sample = Sample::new(
            vec![Image::zeros((4, 4, 3)), Image::zeros((4, 4, 1))],
            Some(vec![Label::zeros((4, 4))]),
        );
        assert_eq!(sample.check_extent("RandomFlip").unwrap(), (4, 4));
    }

    #[test]
    fn test_empty_extent_rejected() {
        for dim in [(0, 4, 3), (4, 0, 3), (0, 0, 1)] {
            let sample = Sample::unlabeled(vec![Image::zeros(dim)]);
            let err = sample.check_extent("Resize").unwrap_err();
            assert!(matches!(err, TransformError::Shape { operator: "Resize", .. }));
            assert!(err.to_string().contains("empty"));
        }
    }
}
