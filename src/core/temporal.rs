//! Operators that act across acquisition times.

use crate::core::band_math::histogram_match;
use crate::core::radiometric::check_bit_num;
use crate::core::rng::gate;
use crate::core::transform::{check_prob, Transform};
use crate::types::{Sample, TransformError, TransformResult};
use ndarray::Axis;
use rand::RngCore;

/// Swap the two acquisitions of a bi-temporal sample.
///
/// Samples with any other number of images pass through untouched; labels
/// are never modified (change maps are symmetric in time).
#[derive(Debug, Clone)]
pub struct ExchangeTime {
    prob: f64,
}

impl ExchangeTime {
    pub fn new(prob: f64) -> TransformResult<Self> {
        Ok(Self {
            prob: check_prob("ExchangeTime", prob)?,
        })
    }
}

impl Default for ExchangeTime {
    fn default() -> Self {
        Self { prob: 0.5 }
    }
}

impl Transform for ExchangeTime {
    fn name(&self) -> &'static str {
        "ExchangeTime"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        if sample.images.len() == 2 {
            log::debug!("ExchangeTime swapping acquisitions");
            sample.images.swap(0, 1);
        }
        Ok(sample)
    }
}

/// Match the histogram of every later acquisition to the first one, band by
/// band.
#[derive(Debug, Clone)]
pub struct HistogramMatching {
    bit_num: u32,
    band_num: usize,
}

impl HistogramMatching {
    pub fn new(bit_num: u32, band_num: usize) -> TransformResult<Self> {
        Ok(Self {
            bit_num: check_bit_num("HistogramMatching", bit_num)?,
            band_num,
        })
    }

    fn max_levels(&self) -> usize {
        1usize << self.bit_num
    }
}

impl Default for HistogramMatching {
    fn default() -> Self {
        Self {
            bit_num: 8,
            band_num: 3,
        }
    }
}

impl Transform for HistogramMatching {
    fn name(&self) -> &'static str {
        "HistogramMatching"
    }

    fn apply(&self, mut sample: Sample, _rng: &mut dyn RngCore) -> TransformResult<Sample> {
        for (i, image) in sample.images.iter().enumerate() {
            if image.dim().2 < self.band_num {
                return Err(TransformError::shape(
                    self.name(),
                    format!(
                        "image {} has {} bands but band_num is {}",
                        i,
                        image.dim().2,
                        self.band_num
                    ),
                ));
            }
        }

        let levels = self.max_levels();
        if let Some((reference, others)) = sample.images.split_first_mut() {
            for (i, image) in others.iter_mut().enumerate() {
                log::debug!(
                    "HistogramMatching image {} onto image 0 ({} bands, {} bit)",
                    i + 1,
                    self.band_num,
                    self.bit_num
                );
                for b in 0..self.band_num {
                    let matched = histogram_match(
                        image.index_axis(Axis(2), b),
                        reference.index_axis(Axis(2), b),
                        levels,
                    );
                    image.index_axis_mut(Axis(2), b).assign(&matched);
                }
            }
        }
        Ok(sample)
    }
}
