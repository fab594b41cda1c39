//! Declarative pipeline configuration.
//!
//! A pipeline is described as JSON:
//!
//! ```json
//! {
//!   "data_format": "HWC",
//!   "classes_num": 2,
//!   "transforms": [
//!     { "kind": "Resize", "target_size": 256, "interp": "LINEAR" },
//!     { "kind": "RandomFlip", "prob": 0.5, "direction": "Both" },
//!     { "kind": "RandomColor", "img_do": [1] },
//!     { "kind": "NDVI", "r_band": 2, "nir_band": 3 }
//!   ]
//! }
//! ```
//!
//! Omitted parameters take the operator defaults. Enumerated options and
//! pairs are kept loose here and checked by [`TransformSpec::build`], so a bad
//! value is reported as a configuration error naming the operator.

use crate::core::geometric::{
    FlipDirection, RandomEnlarge, RandomFlip, RandomNarrow, RandomRotate, Resize, TargetSize,
};
use crate::core::radiometric::{
    BandRatio, BandScope, LaplacianMode, Normalize, RandomBlur, RandomColor, RandomFog,
    RandomRemoveBand, RandomSharpening, RandomSplicing, RandomStrip, StripDirection,
};
use crate::core::resample::Interpolation;
use crate::core::temporal::{ExchangeTime, HistogramMatching};
use crate::core::transform::{check_pair, Transform};
use crate::types::{TransformResult, DEFAULT_IGNORE_VALUE};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn half() -> f64 {
    0.5
}

fn tenth() -> f64 {
    0.1
}

fn default_ig_pix() -> i32 {
    DEFAULT_IGNORE_VALUE
}

fn default_rate_pair() -> Vec<f64> {
    vec![0.5, 0.5]
}

fn default_band_num() -> usize {
    3
}

fn default_img_do() -> Vec<usize> {
    vec![0, 1]
}

fn default_bit_num() -> u32 {
    8
}

fn default_ksize() -> usize {
    3
}

fn default_interp() -> String {
    "NEAREST".to_string()
}

fn default_flip_direction() -> String {
    "Both".to_string()
}

fn default_strip_direction() -> String {
    "Horizontal".to_string()
}

fn default_laplacian_mode() -> String {
    "8-1".to_string()
}

fn default_alpha_range() -> Vec<f64> {
    vec![0.8, 1.2]
}

fn default_beta_range() -> Vec<f64> {
    vec![-10.0, 10.0]
}

fn default_fog_range() -> Vec<f64> {
    vec![0.03, 0.28]
}

fn default_strip_rate() -> f64 {
    0.05
}

fn band_1() -> usize {
    1
}

fn band_2() -> usize {
    2
}

fn band_3() -> usize {
    3
}

fn band_4() -> usize {
    4
}

fn default_data_format() -> String {
    "HWC".to_string()
}

fn default_classes_num() -> usize {
    2
}

/// `target_size` of a resize: one side for a square, or `[width, height]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSizeSpec {
    Square(usize),
    Pair(Vec<usize>),
}

impl TargetSizeSpec {
    fn build(&self) -> TransformResult<TargetSize> {
        match self {
            TargetSizeSpec::Square(n) => Ok(TargetSize::Square(*n)),
            TargetSizeSpec::Pair(values) => {
                let (width, height) = check_pair("Resize", "target_size", values)?;
                Ok(TargetSize::Pair { width, height })
            }
        }
    }
}

/// One operator with its parameters, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TransformSpec {
    Resize {
        target_size: TargetSizeSpec,
        #[serde(default = "default_interp")]
        interp: String,
    },
    Normalize {
        mean: Vec<f64>,
        std: Vec<f64>,
        #[serde(default = "default_bit_num")]
        bit_num: u32,
        #[serde(default = "default_band_num")]
        band_num: usize,
    },
    RandomFlip {
        #[serde(default = "half")]
        prob: f64,
        #[serde(default = "default_flip_direction")]
        direction: String,
    },
    RandomRotate {
        #[serde(default = "half")]
        prob: f64,
        #[serde(default = "default_ig_pix")]
        ig_pix: i32,
    },
    RandomEnlarge {
        #[serde(default = "half")]
        prob: f64,
        #[serde(default = "default_rate_pair")]
        min_clip_rate: Vec<f64>,
    },
    RandomNarrow {
        #[serde(default = "half")]
        prob: f64,
        #[serde(default = "default_rate_pair")]
        min_size_rate: Vec<f64>,
        #[serde(default = "default_ig_pix")]
        ig_pix: i32,
    },
    RandomBlur {
        #[serde(default = "tenth")]
        prob: f64,
        #[serde(default = "default_ksize")]
        ksize: usize,
        #[serde(default = "default_band_num")]
        band_num: usize,
        #[serde(default = "default_img_do")]
        img_do: Vec<usize>,
    },
    RandomSharpening {
        #[serde(default = "tenth")]
        prob: f64,
        #[serde(default = "default_laplacian_mode")]
        laplacian_mode: String,
        #[serde(default = "default_band_num")]
        band_num: usize,
        #[serde(default = "default_img_do")]
        img_do: Vec<usize>,
    },
    RandomColor {
        #[serde(default = "half")]
        prob: f64,
        #[serde(default = "default_alpha_range")]
        alpha_range: Vec<f64>,
        #[serde(default = "default_beta_range")]
        beta_range: Vec<f64>,
        #[serde(default = "default_band_num")]
        band_num: usize,
        #[serde(default = "default_img_do")]
        img_do: Vec<usize>,
    },
    RandomStrip {
        #[serde(default = "half")]
        prob: f64,
        #[serde(default = "default_strip_rate")]
        strip_rate: f64,
        #[serde(default = "default_strip_direction")]
        direction: String,
        #[serde(default = "default_band_num")]
        band_num: usize,
        #[serde(default = "default_img_do")]
        img_do: Vec<usize>,
    },
    RandomFog {
        #[serde(default = "half")]
        prob: f64,
        #[serde(default = "default_fog_range")]
        fog_range: Vec<f64>,
        #[serde(default = "default_band_num")]
        band_num: usize,
        #[serde(default = "default_img_do")]
        img_do: Vec<usize>,
    },
    RandomSplicing {
        #[serde(default = "tenth")]
        prob: f64,
        #[serde(default = "default_strip_direction")]
        direction: String,
        #[serde(default = "default_band_num")]
        band_num: usize,
    },
    RandomRemoveBand {
        #[serde(default = "tenth")]
        prob: f64,
        #[serde(default)]
        kill_bands: Vec<usize>,
        #[serde(default)]
        keep_bands: Vec<usize>,
    },
    #[serde(rename = "NDVI")]
    Ndvi {
        #[serde(default = "band_2")]
        r_band: usize,
        #[serde(default = "band_3")]
        nir_band: usize,
    },
    #[serde(rename = "NDWI")]
    Ndwi {
        #[serde(default = "band_1")]
        g_band: usize,
        #[serde(default = "band_3")]
        nir_band: usize,
    },
    #[serde(rename = "NDBI")]
    Ndbi {
        #[serde(default = "band_3")]
        nir_band: usize,
        #[serde(default = "band_4")]
        mir_band: usize,
    },
    ExchangeTime {
        #[serde(default = "half")]
        prob: f64,
    },
    HistogramMatching {
        #[serde(default = "default_bit_num")]
        bit_num: u32,
        #[serde(default = "default_band_num")]
        band_num: usize,
    },
}

impl TransformSpec {
    /// Validate the parameters and construct the operator.
    pub fn build(&self) -> TransformResult<Box<dyn Transform>> {
        let transform: Box<dyn Transform> = match self {
            TransformSpec::Resize {
                target_size,
                interp,
            } => Box::new(Resize::new(
                target_size.build()?,
                interp.parse::<Interpolation>()?,
            )?),
            TransformSpec::Normalize {
                mean,
                std,
                bit_num,
                band_num,
            } => Box::new(Normalize::new(mean, std, *bit_num, *band_num)?),
            TransformSpec::RandomFlip { prob, direction } => Box::new(RandomFlip::new(
                *prob,
                direction.parse::<FlipDirection>()?,
            )?),
            TransformSpec::RandomRotate { prob, ig_pix } => {
                Box::new(RandomRotate::new(*prob, *ig_pix)?)
            }
            TransformSpec::RandomEnlarge {
                prob,
                min_clip_rate,
            } => Box::new(RandomEnlarge::new(*prob, min_clip_rate)?),
            TransformSpec::RandomNarrow {
                prob,
                min_size_rate,
                ig_pix,
            } => Box::new(RandomNarrow::new(*prob, min_size_rate, *ig_pix)?),
            TransformSpec::RandomBlur {
                prob,
                ksize,
                band_num,
                img_do,
            } => Box::new(RandomBlur::new(
                *prob,
                *ksize,
                BandScope::new(img_do.clone(), *band_num),
            )?),
            TransformSpec::RandomSharpening {
                prob,
                laplacian_mode,
                band_num,
                img_do,
            } => Box::new(RandomSharpening::new(
                *prob,
                laplacian_mode.parse::<LaplacianMode>()?,
                BandScope::new(img_do.clone(), *band_num),
            )?),
            TransformSpec::RandomColor {
                prob,
                alpha_range,
                beta_range,
                band_num,
                img_do,
            } => Box::new(RandomColor::new(
                *prob,
                alpha_range,
                beta_range,
                BandScope::new(img_do.clone(), *band_num),
            )?),
            TransformSpec::RandomStrip {
                prob,
                strip_rate,
                direction,
                band_num,
                img_do,
            } => Box::new(RandomStrip::new(
                *prob,
                *strip_rate,
                StripDirection::parse("RandomStrip", direction)?,
                BandScope::new(img_do.clone(), *band_num),
            )?),
            TransformSpec::RandomFog {
                prob,
                fog_range,
                band_num,
                img_do,
            } => Box::new(RandomFog::new(
                *prob,
                fog_range,
                BandScope::new(img_do.clone(), *band_num),
            )?),
            TransformSpec::RandomSplicing {
                prob,
                direction,
                band_num,
            } => Box::new(RandomSplicing::new(
                *prob,
                StripDirection::parse("RandomSplicing", direction)?,
                *band_num,
            )?),
            TransformSpec::RandomRemoveBand {
                prob,
                kill_bands,
                keep_bands,
            } => Box::new(RandomRemoveBand::new(
                *prob,
                kill_bands.clone(),
                keep_bands.clone(),
            )?),
            TransformSpec::Ndvi { r_band, nir_band } => {
                Box::new(BandRatio::ndvi(*r_band, *nir_band))
            }
            TransformSpec::Ndwi { g_band, nir_band } => {
                Box::new(BandRatio::ndwi(*g_band, *nir_band))
            }
            TransformSpec::Ndbi { nir_band, mir_band } => {
                Box::new(BandRatio::ndbi(*nir_band, *mir_band))
            }
            TransformSpec::ExchangeTime { prob } => Box::new(ExchangeTime::new(*prob)?),
            TransformSpec::HistogramMatching { bit_num, band_num } => {
                Box::new(HistogramMatching::new(*bit_num, *band_num)?)
            }
        };
        Ok(transform)
    }
}

/// Full pipeline description consumed by
/// [`Compose::from_config`](crate::core::Compose::from_config)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub transforms: Vec<TransformSpec>,
    /// `"HWC"` or `"CHW"`
    #[serde(default = "default_data_format")]
    pub data_format: String,
    #[serde(default = "default_classes_num")]
    pub classes_num: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transforms: Vec::new(),
            data_format: default_data_format(),
            classes_num: default_classes_num(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> TransformResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> TransformResult<Self> {
        let path = path.as_ref();
        log::info!("Loading pipeline configuration from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> TransformResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Construct every operator in order, stopping at the first invalid one.
    pub fn build_transforms(&self) -> TransformResult<Vec<Box<dyn Transform>>> {
        self.transforms.iter().map(TransformSpec::build).collect()
    }
}
