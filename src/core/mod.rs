//! Sample augmentation operators and the pipeline that runs them

pub mod band_math;
pub mod compose;
pub mod config;
pub mod filter;
pub mod geometric;
pub mod radiometric;
pub mod resample;
pub mod rng;
pub mod temporal;
pub mod transform;

// Re-export main types
pub use compose::{Compose, ComposeOutput, ImageSource, LabelSource};
pub use config::{PipelineConfig, TargetSizeSpec, TransformSpec};
pub use geometric::{
    FlipDirection, RandomEnlarge, RandomFlip, RandomNarrow, RandomRotate, Resize, TargetSize,
};
pub use radiometric::{
    BandRatio, BandScope, LaplacianMode, Normalize, RandomBlur, RandomColor, RandomFog,
    RandomRemoveBand, RandomSharpening, RandomSplicing, RandomStrip, SpectralIndex,
    StripDirection,
};
pub use resample::Interpolation;
pub use rng::{seed_thread_rng, with_thread_rng};
pub use temporal::{ExchangeTime, HistogramMatching};
pub use transform::Transform;
