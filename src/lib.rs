//! cdaug: sample augmentation for remote-sensing change detection
//!
//! A change-detection sample is a set of co-registered acquisitions of the
//! same scene plus optional per-pixel label maps. This crate applies a
//! configurable sequence of geometric, radiometric and cross-temporal
//! operators to such samples while keeping every image and label spatially
//! aligned:
//!
//! ```no_run
//! use cdaug::core::{Compose, FlipDirection, RandomFlip, Resize, TargetSize, Interpolation, Transform};
//! use cdaug::DataFormat;
//!
//! # fn main() -> cdaug::TransformResult<()> {
//! let transforms: Vec<Box<dyn Transform>> = vec![
//!     Box::new(Resize::new(TargetSize::Square(256), Interpolation::Linear)?),
//!     Box::new(RandomFlip::new(0.5, FlipDirection::Both)?),
//! ];
//! let pipeline = Compose::new(transforms, DataFormat::Hwc, 2)?;
//! let out = pipeline.apply(
//!     vec!["t1.png".into(), "t2.png".into()],
//!     Some(vec!["change.png".into()]),
//! )?;
//! assert_eq!(out.images.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    DataFormat, Image, Label, LabelOutput, Sample, TransformError, TransformResult,
    DEFAULT_IGNORE_VALUE, IMAGE_FILL_VALUE,
};

pub use crate::core::{Compose, ComposeOutput, ImageSource, LabelSource, PipelineConfig, Transform};
pub use io::{ImageFileLoader, ImageLoader};
