//! Geometric operators.
//!
//! Every operator here applies one spatial mapping to all images and all
//! labels of a sample, so pixel correspondence across acquisitions and
//! between images and labels is preserved. Images are resampled with the
//! requested kernel, labels always with nearest neighbour.

use crate::core::resample::{
    crop_image, crop_label, flip, pad_image_center, pad_label_center, resize_image,
    resize_label, rotate_image, rotate_label, Interpolation,
};
use crate::core::rng::{gate, uniform};
use crate::core::transform::{check_pair, check_prob, check_rate, Transform};
use crate::types::{
    Label, Sample, TransformError, TransformResult, DEFAULT_IGNORE_VALUE, IMAGE_FILL_VALUE,
};
use rand::{Rng, RngCore};
use std::fmt;
use std::str::FromStr;

fn map_labels(sample: &mut Sample, f: impl Fn(&Label) -> Label) {
    if let Some(labels) = sample.labels.as_mut() {
        for label in labels.iter_mut() {
            *label = f(label);
        }
    }
}

/// Output extent of [`Resize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSize {
    /// Square output of `n` x `n`
    Square(usize),
    /// Output `width` columns by `height` rows
    Pair { width: usize, height: usize },
}

impl TargetSize {
    /// (rows, cols)
    fn extent(&self) -> (usize, usize) {
        match *self {
            TargetSize::Square(n) => (n, n),
            TargetSize::Pair { width, height } => (height, width),
        }
    }
}

/// Resize every image and label to a fixed extent.
#[derive(Debug, Clone)]
pub struct Resize {
    target_size: TargetSize,
    interp: Interpolation,
}

impl Resize {
    pub fn new(target_size: TargetSize, interp: Interpolation) -> TransformResult<Self> {
        let (rows, cols) = target_size.extent();
        if rows == 0 || cols == 0 {
            return Err(TransformError::config(
                "Resize",
                format!("target_size must be positive, got {:?}", target_size),
            ));
        }
        Ok(Self {
            target_size,
            interp,
        })
    }
}

impl Transform for Resize {
    fn name(&self) -> &'static str {
        "Resize"
    }

    fn apply(&self, mut sample: Sample, _rng: &mut dyn RngCore) -> TransformResult<Sample> {
        sample.check_extent(self.name())?;
        let (rows, cols) = self.target_size.extent();
        log::debug!("Resize to {}x{} ({})", rows, cols, self.interp);

        for image in sample.images.iter_mut() {
            *image = resize_image(image, rows, cols, self.interp);
        }
        map_labels(&mut sample, |label| resize_label(label, rows, cols));
        Ok(sample)
    }
}

/// Mirror axis for [`RandomFlip`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlipDirection {
    /// Mirror columns (left-right)
    Horizontal,
    /// Mirror rows (up-down)
    Vertical,
    /// Mirror both axes
    #[default]
    Both,
}

impl FromStr for FlipDirection {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Horizontal" => Ok(FlipDirection::Horizontal),
            "Vertical" => Ok(FlipDirection::Vertical),
            "Both" => Ok(FlipDirection::Both),
            other => Err(TransformError::config(
                "RandomFlip",
                format!(
                    "direction should be Horizontal, Vertical or Both, got \"{}\"",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for FlipDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlipDirection::Horizontal => "Horizontal",
            FlipDirection::Vertical => "Vertical",
            FlipDirection::Both => "Both",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct RandomFlip {
    prob: f64,
    direction: FlipDirection,
}

impl RandomFlip {
    pub fn new(prob: f64, direction: FlipDirection) -> TransformResult<Self> {
        Ok(Self {
            prob: check_prob("RandomFlip", prob)?,
            direction,
        })
    }
}

impl Default for RandomFlip {
    fn default() -> Self {
        Self {
            prob: 0.5,
            direction: FlipDirection::Both,
        }
    }
}

impl Transform for RandomFlip {
    fn name(&self) -> &'static str {
        "RandomFlip"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        sample.check_extent(self.name())?;
        let (rows, cols) = match self.direction {
            FlipDirection::Horizontal => (false, true),
            FlipDirection::Vertical => (true, false),
            FlipDirection::Both => (true, true),
        };
        log::debug!("RandomFlip {}", self.direction);

        for image in sample.images.iter_mut() {
            *image = flip(image, rows, cols);
        }
        map_labels(&mut sample, |label| flip(label, rows, cols));
        Ok(sample)
    }
}

/// Random rotation by a whole-degree angle in [1, 89] about the image centre.
#[derive(Debug, Clone)]
pub struct RandomRotate {
    prob: f64,
    ig_pix: i32,
}

impl RandomRotate {
    pub fn new(prob: f64, ig_pix: i32) -> TransformResult<Self> {
        Ok(Self {
            prob: check_prob("RandomRotate", prob)?,
            ig_pix,
        })
    }
}

impl Default for RandomRotate {
    fn default() -> Self {
        Self {
            prob: 0.5,
            ig_pix: DEFAULT_IGNORE_VALUE,
        }
    }
}

impl Transform for RandomRotate {
    fn name(&self) -> &'static str {
        "RandomRotate"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        // The angle is drawn even when the gate rejects
        let angle = rng.random_range(1..=89u32) as f64;
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        sample.check_extent(self.name())?;
        log::debug!("RandomRotate by {} degrees", angle);

        for image in sample.images.iter_mut() {
            *image = rotate_image(image, angle, IMAGE_FILL_VALUE);
        }
        map_labels(&mut sample, |label| rotate_label(label, angle, self.ig_pix));
        Ok(sample)
    }
}

/// Crop a random window and stretch it back to the full extent.
#[derive(Debug, Clone)]
pub struct RandomEnlarge {
    prob: f64,
    /// Minimum window size as a fraction of (rows, cols)
    min_clip_rate: (f64, f64),
}

impl RandomEnlarge {
    pub fn new(prob: f64, min_clip_rate: &[f64]) -> TransformResult<Self> {
        let (rows, cols) = check_pair("RandomEnlarge", "min_clip_rate", min_clip_rate)?;
        Ok(Self {
            prob: check_prob("RandomEnlarge", prob)?,
            min_clip_rate: (
                check_rate("RandomEnlarge", "min_clip_rate", rows)?,
                check_rate("RandomEnlarge", "min_clip_rate", cols)?,
            ),
        })
    }
}

impl Default for RandomEnlarge {
    fn default() -> Self {
        Self {
            prob: 0.5,
            min_clip_rate: (0.5, 0.5),
        }
    }
}

impl Transform for RandomEnlarge {
    fn name(&self) -> &'static str {
        "RandomEnlarge"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        let (rows, cols) = sample.check_extent(self.name())?;
        let h_clip = ((self.min_clip_rate.0 * rows as f64).floor() as usize).clamp(1, rows.max(1));
        let w_clip = ((self.min_clip_rate.1 * cols as f64).floor() as usize).clamp(1, cols.max(1));
        let x = rng.random_range(0..=cols.saturating_sub(w_clip));
        let y = rng.random_range(0..=rows.saturating_sub(h_clip));
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        log::debug!(
            "RandomEnlarge window {}x{} at (row {}, col {})",
            h_clip,
            w_clip,
            y,
            x
        );

        for image in sample.images.iter_mut() {
            let window = crop_image(image, y, x, h_clip, w_clip);
            *image = resize_image(&window, rows, cols, Interpolation::Linear);
        }
        map_labels(&mut sample, |label| {
            resize_label(&crop_label(label, y, x, h_clip, w_clip), rows, cols)
        });
        Ok(sample)
    }
}

/// Shrink by a random factor and centre-pad back to the full extent.
#[derive(Debug, Clone)]
pub struct RandomNarrow {
    prob: f64,
    /// Minimum scale along (x = columns, y = rows)
    min_size_rate: (f64, f64),
    ig_pix: i32,
}

impl RandomNarrow {
    pub fn new(prob: f64, min_size_rate: &[f64], ig_pix: i32) -> TransformResult<Self> {
        let (x, y) = check_pair("RandomNarrow", "min_size_rate", min_size_rate)?;
        Ok(Self {
            prob: check_prob("RandomNarrow", prob)?,
            min_size_rate: (
                check_rate("RandomNarrow", "min_size_rate", x)?,
                check_rate("RandomNarrow", "min_size_rate", y)?,
            ),
            ig_pix,
        })
    }
}

impl Default for RandomNarrow {
    fn default() -> Self {
        Self {
            prob: 0.5,
            min_size_rate: (0.5, 0.5),
            ig_pix: DEFAULT_IGNORE_VALUE,
        }
    }
}

impl Transform for RandomNarrow {
    fn name(&self) -> &'static str {
        "RandomNarrow"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        let x_rate = uniform(rng, self.min_size_rate.0, 1.0);
        let y_rate = uniform(rng, self.min_size_rate.1, 1.0);
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        let (rows, cols) = sample.check_extent(self.name())?;
        let new_rows = ((rows as f64 * y_rate).floor() as usize).clamp(1, rows.max(1));
        let new_cols = ((cols as f64 * x_rate).floor() as usize).clamp(1, cols.max(1));
        log::debug!(
            "RandomNarrow to {}x{} (x_rate {:.3}, y_rate {:.3})",
            new_rows,
            new_cols,
            x_rate,
            y_rate
        );

        for image in sample.images.iter_mut() {
            let shrunk = resize_image(image, new_rows, new_cols, Interpolation::Linear);
            *image = pad_image_center(&shrunk, rows, cols, IMAGE_FILL_VALUE);
        }
        map_labels(&mut sample, |label| {
            let shrunk = resize_label(label, new_rows, new_cols);
            pad_label_center(&shrunk, rows, cols, self.ig_pix)
        });
        Ok(sample)
    }
}
