use crate::core::config::PipelineConfig;
use crate::core::rng::with_thread_rng;
use crate::core::transform::Transform;
use crate::io::loader::{ImageFileLoader, ImageLoader};
use crate::types::{
    DataFormat, Image, Label, LabelOutput, Sample, TransformError, TransformResult,
};
use ndarray::{ArrayD, Axis, Ix3};
use rand::RngCore;
use std::path::PathBuf;
use std::sync::Arc;

/// One acquisition handed to [`Compose`]
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Raster file read through the pipeline's loader
    Path(PathBuf),
    /// Array already in (row, column, band) order
    Array(Image),
    /// Array of unchecked dimensionality, laid out per the pipeline's
    /// [`DataFormat`]
    Dynamic(ArrayD<f32>),
}

impl From<Image> for ImageSource {
    fn from(image: Image) -> Self {
        ImageSource::Array(image)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

/// One label map handed to [`Compose`]
#[derive(Debug, Clone)]
pub enum LabelSource {
    Path(PathBuf),
    Array(Label),
}

impl From<Label> for LabelSource {
    fn from(label: Label) -> Self {
        LabelSource::Array(label)
    }
}

impl From<PathBuf> for LabelSource {
    fn from(path: PathBuf) -> Self {
        LabelSource::Path(path)
    }
}

impl From<&str> for LabelSource {
    fn from(path: &str) -> Self {
        LabelSource::Path(PathBuf::from(path))
    }
}

/// Augmented sample ready for the model
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOutput {
    pub images: Vec<Image>,
    /// Labels widened to `i64`, present when labels were supplied
    pub labels: Option<Vec<LabelOutput>>,
}

/// Ordered augmentation pipeline.
///
/// Resolves every input to an array (paths through the loader), runs the
/// operators in order on the whole sample and widens the labels to `i64`.
/// Built once and shared; `apply` may be called concurrently from several
/// threads.
#[derive(Debug, Clone)]
pub struct Compose {
    transforms: Arc<Vec<Box<dyn Transform>>>,
    data_format: DataFormat,
    classes_num: usize,
    loader: Arc<dyn ImageLoader>,
}

impl Compose {
    pub fn new(
        transforms: Vec<Box<dyn Transform>>,
        data_format: DataFormat,
        classes_num: usize,
    ) -> TransformResult<Self> {
        if classes_num == 0 {
            return Err(TransformError::config(
                "Compose",
                "classes_num should be at least 1",
            ));
        }
        log::info!(
            "Compose pipeline: [{}] ({}, {} classes)",
            transforms
                .iter()
                .map(|t| t.name())
                .collect::<Vec<_>>()
                .join(", "),
            data_format,
            classes_num
        );
        Ok(Self {
            transforms: Arc::new(transforms),
            data_format,
            classes_num,
            loader: Arc::new(ImageFileLoader),
        })
    }

    /// Build the operators and pipeline settings from a configuration.
    pub fn from_config(config: &PipelineConfig) -> TransformResult<Self> {
        let data_format = config.data_format.parse::<DataFormat>()?;
        Self::new(config.build_transforms()?, data_format, config.classes_num)
    }

    /// Replace the loader used for [`ImageSource::Path`] and
    /// [`LabelSource::Path`] inputs.
    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn data_format(&self) -> DataFormat {
        self.data_format
    }

    pub fn classes_num(&self) -> usize {
        self.classes_num
    }

    /// Operator names in application order
    pub fn transform_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run the pipeline with the calling thread's generator
    /// (see [`seed_thread_rng`](crate::core::rng::seed_thread_rng)).
    ///
    /// Inputs are loaded before the generator is taken, so only operator
    /// draws consume it.
    pub fn apply(
        &self,
        images: Vec<ImageSource>,
        labels: Option<Vec<LabelSource>>,
    ) -> TransformResult<ComposeOutput> {
        let sample = self.resolve(images, labels)?;
        let sample = with_thread_rng(|rng| self.run(sample, rng))?;
        Ok(Self::finish(sample))
    }

    /// Run the pipeline drawing every random quantity from `rng`.
    pub fn apply_with_rng<R: RngCore>(
        &self,
        images: Vec<ImageSource>,
        labels: Option<Vec<LabelSource>>,
        rng: &mut R,
    ) -> TransformResult<ComposeOutput> {
        let sample = self.resolve(images, labels)?;
        let sample = self.run(sample, rng)?;
        Ok(Self::finish(sample))
    }

    fn resolve(
        &self,
        images: Vec<ImageSource>,
        labels: Option<Vec<LabelSource>>,
    ) -> TransformResult<Sample> {
        let images = self.resolve_images(images)?;
        let labels = match labels {
            Some(labels) => Some(self.resolve_labels(labels)?),
            None => None,
        };
        Ok(Sample::new(images, labels))
    }

    fn finish(sample: Sample) -> ComposeOutput {
        ComposeOutput {
            images: sample.images,
            labels: sample
                .labels
                .map(|labels| labels.into_iter().map(|l| l.mapv(i64::from)).collect()),
        }
    }

    /// Apply every operator in order to an already resolved sample.
    pub fn run(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        log::debug!(
            "Augmenting sample with {} images, labels: {}",
            sample.images.len(),
            sample.labels.as_ref().map_or(0, |l| l.len())
        );
        for transform in self.transforms.iter() {
            sample = transform.apply(sample, rng)?;
        }
        Ok(sample)
    }

    fn resolve_image(&self, source: ImageSource) -> TransformResult<Image> {
        match source {
            ImageSource::Path(path) => {
                self.loader
                    .read(&path, self.data_format, false, self.classes_num)
            }
            ImageSource::Array(image) => Ok(image),
            ImageSource::Dynamic(array) => {
                let ndim = array.ndim();
                let array = array.into_dimensionality::<Ix3>().map_err(|_| {
                    TransformError::shape(
                        "Compose",
                        format!("image is not 3-dimensional (got {} dimensions)", ndim),
                    )
                })?;
                Ok(self.data_format.to_hwc(array))
            }
        }
    }

    fn resolve_label(&self, source: LabelSource) -> TransformResult<Label> {
        match source {
            LabelSource::Path(path) => {
                let raster = self
                    .loader
                    .read(&path, self.data_format, true, self.classes_num)?;
                Ok(raster.index_axis(Axis(2), 0).mapv(|v| v.round() as i32))
            }
            LabelSource::Array(label) => Ok(label),
        }
    }

    fn resolve_images(&self, images: Vec<ImageSource>) -> TransformResult<Vec<Image>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            images
                .into_par_iter()
                .map(|source| self.resolve_image(source))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            images
                .into_iter()
                .map(|source| self.resolve_image(source))
                .collect()
        }
    }

    fn resolve_labels(&self, labels: Vec<LabelSource>) -> TransformResult<Vec<Label>> {
        labels
            .into_iter()
            .map(|source| self.resolve_label(source))
            .collect()
    }
}
