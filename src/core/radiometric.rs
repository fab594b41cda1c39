//! Radiometric operators.
//!
//! These change pixel values only; the spatial grid and the labels are never
//! touched. Most of them work on the leading `band_num` bands of the
//! acquisitions listed in `img_do`, so auxiliary bands (elevation, indices
//! appended earlier in the pipeline) can be carried through unchanged.

use crate::core::band_math::{band_statistics, normalized_difference, standardize};
use crate::core::filter::{correlate, filter_leading_bands, gaussian_kernel, separable_filter};
use crate::core::rng::{gate, uniform};
use crate::core::transform::{check_pair, check_prob, Transform};
use crate::types::{Image, Sample, TransformError, TransformResult};
use ndarray::{array, s, Array2, Axis};
use rand::seq::index;
use rand::{Rng, RngCore};
use std::fmt;
use std::str::FromStr;

/// Check that `image` has at least `band_num` bands.
fn check_bands(
    operator: &'static str,
    index: usize,
    image: &Image,
    band_num: usize,
) -> TransformResult<()> {
    let bands = image.dim().2;
    if bands < band_num {
        return Err(TransformError::shape(
            operator,
            format!(
                "image {} has {} bands but band_num is {}",
                index, bands, band_num
            ),
        ));
    }
    Ok(())
}

/// Which acquisitions and how many leading bands an operator affects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandScope {
    /// Temporal indices of the affected images
    pub img_do: Vec<usize>,
    /// Number of leading bands affected
    pub band_num: usize,
}

impl Default for BandScope {
    fn default() -> Self {
        Self {
            img_do: vec![0, 1],
            band_num: 3,
        }
    }
}

impl BandScope {
    pub fn new(img_do: Vec<usize>, band_num: usize) -> Self {
        Self { img_do, band_num }
    }

    fn covers(&self, index: usize) -> bool {
        self.img_do.contains(&index)
    }

    /// Images selected by `img_do`, with their temporal index, after
    /// checking their band count.
    fn selected<'a>(
        &'a self,
        operator: &'static str,
        images: &'a mut [Image],
    ) -> TransformResult<impl Iterator<Item = (usize, &'a mut Image)> + 'a> {
        for (i, image) in images.iter().enumerate() {
            if self.covers(i) {
                check_bands(operator, i, image, self.band_num)?;
            }
        }
        Ok(images
            .iter_mut()
            .enumerate()
            .filter(move |(i, _)| self.covers(*i)))
    }
}

const VALID_BIT_NUMS: [u32; 3] = [8, 16, 24];

pub(crate) fn check_bit_num(operator: &'static str, bit_num: u32) -> TransformResult<u32> {
    if !VALID_BIT_NUMS.contains(&bit_num) {
        return Err(TransformError::config(
            operator,
            format!(
                "{} is not an effective bit_num, bit_num should be one of 8, 16, 24",
                bit_num
            ),
        ));
    }
    Ok(bit_num)
}

/// Scale the leading bands to [0, 1] by bit depth, then standardize with
/// dataset statistics.
#[derive(Debug, Clone)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
    bit_num: u32,
}

impl Normalize {
    pub fn new(mean: &[f64], std: &[f64], bit_num: u32, band_num: usize) -> TransformResult<Self> {
        let bit_num = check_bit_num("Normalize", bit_num)?;
        if mean.len() != band_num || std.len() != band_num {
            return Err(TransformError::config(
                "Normalize",
                format!(
                    "band_num ({}) should be equal to len of mean ({}) and std ({})",
                    band_num,
                    mean.len(),
                    std.len()
                ),
            ));
        }
        if std.iter().any(|&s| s == 0.0) {
            return Err(TransformError::config(
                "Normalize",
                format!("std is invalid, it contains 0: {:?}", std),
            ));
        }
        Ok(Self {
            mean: mean.iter().map(|&m| m as f32).collect(),
            std: std.iter().map(|&s| s as f32).collect(),
            bit_num,
        })
    }

    fn band_num(&self) -> usize {
        self.mean.len()
    }
}

impl Transform for Normalize {
    fn name(&self) -> &'static str {
        "Normalize"
    }

    fn apply(&self, mut sample: Sample, _rng: &mut dyn RngCore) -> TransformResult<Sample> {
        let band_num = self.band_num();
        let min = vec![0.0f32; band_num];
        let max = vec![((1u64 << self.bit_num) - 1) as f32; band_num];

        for (i, image) in sample.images.iter_mut().enumerate() {
            check_bands(self.name(), i, image, band_num)?;
            standardize(image, &min, &max, &self.mean, &self.std);
        }
        Ok(sample)
    }
}

/// Gaussian blur of the leading bands.
#[derive(Debug, Clone)]
pub struct RandomBlur {
    prob: f64,
    ksize: usize,
    kernel: Vec<f32>,
    scope: BandScope,
}

impl RandomBlur {
    pub fn new(prob: f64, ksize: usize, scope: BandScope) -> TransformResult<Self> {
        if ksize == 0 || ksize % 2 == 0 {
            return Err(TransformError::config(
                "RandomBlur",
                format!("ksize should be a positive odd number, got {}", ksize),
            ));
        }
        Ok(Self {
            prob: check_prob("RandomBlur", prob)?,
            ksize,
            kernel: gaussian_kernel(ksize, 0.0),
            scope,
        })
    }
}

impl Default for RandomBlur {
    fn default() -> Self {
        Self {
            prob: 0.1,
            ksize: 3,
            kernel: gaussian_kernel(3, 0.0),
            scope: BandScope::default(),
        }
    }
}

impl Transform for RandomBlur {
    fn name(&self) -> &'static str {
        "RandomBlur"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        log::debug!("RandomBlur with ksize {}", self.ksize);
        for (_, image) in self.scope.selected(self.name(), &mut sample.images)? {
            filter_leading_bands(image, self.scope.band_num, |band| {
                separable_filter(band, &self.kernel)
            });
        }
        Ok(sample)
    }
}

/// Laplacian kernel used by [`RandomSharpening`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaplacianMode {
    /// 4-neighbour, centre weight 4 (`"4-1"`)
    FourOne,
    /// 8-neighbour, centre weight 8 (`"8-1"`)
    #[default]
    EightOne,
    /// 4-neighbour with positive diagonals (`"4-2"`)
    FourTwo,
}

impl LaplacianMode {
    pub fn kernel(self) -> Array2<f32> {
        match self {
            LaplacianMode::FourOne => array![[0.0, -1.0, 0.0], [-1.0, 4.0, -1.0], [0.0, -1.0, 0.0]],
            LaplacianMode::EightOne => {
                array![[-1.0, -1.0, -1.0], [-1.0, 8.0, -1.0], [-1.0, -1.0, -1.0]]
            }
            LaplacianMode::FourTwo => array![[1.0, -2.0, 1.0], [-2.0, 4.0, -2.0], [1.0, -2.0, 1.0]],
        }
    }
}

impl FromStr for LaplacianMode {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4-1" => Ok(LaplacianMode::FourOne),
            "8-1" => Ok(LaplacianMode::EightOne),
            "4-2" => Ok(LaplacianMode::FourTwo),
            other => Err(TransformError::config(
                "RandomSharpening",
                format!(
                    "laplacian_mode should be one of \"4-1\", \"8-1\", \"4-2\", got \"{}\"",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for LaplacianMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaplacianMode::FourOne => "4-1",
            LaplacianMode::EightOne => "8-1",
            LaplacianMode::FourTwo => "4-2",
        };
        write!(f, "{}", name)
    }
}

/// Laplacian sharpening: `band += 0.2 * (laplacian * band)`.
#[derive(Debug, Clone)]
pub struct RandomSharpening {
    prob: f64,
    mode: LaplacianMode,
    kernel: Array2<f32>,
    scope: BandScope,
}

impl RandomSharpening {
    pub fn new(prob: f64, mode: LaplacianMode, scope: BandScope) -> TransformResult<Self> {
        Ok(Self {
            prob: check_prob("RandomSharpening", prob)?,
            mode,
            kernel: mode.kernel(),
            scope,
        })
    }
}

impl Default for RandomSharpening {
    fn default() -> Self {
        Self {
            prob: 0.1,
            mode: LaplacianMode::EightOne,
            kernel: LaplacianMode::EightOne.kernel(),
            scope: BandScope::default(),
        }
    }
}

impl Transform for RandomSharpening {
    fn name(&self) -> &'static str {
        "RandomSharpening"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        log::debug!("RandomSharpening with laplacian {}", self.mode);
        for (_, image) in self.scope.selected(self.name(), &mut sample.images)? {
            filter_leading_bands(image, self.scope.band_num, |band| {
                let mut sharpened = correlate(band, &self.kernel);
                sharpened.zip_mut_with(&band, |response, &v| *response = v + 0.2 * *response);
                sharpened
            });
        }
        Ok(sample)
    }
}

/// Random contrast and brightness: `v' = alpha * v + beta`, unclamped.
#[derive(Debug, Clone)]
pub struct RandomColor {
    prob: f64,
    alpha_range: (f64, f64),
    beta_range: (f64, f64),
    scope: BandScope,
}

impl RandomColor {
    pub fn new(
        prob: f64,
        alpha_range: &[f64],
        beta_range: &[f64],
        scope: BandScope,
    ) -> TransformResult<Self> {
        Ok(Self {
            prob: check_prob("RandomColor", prob)?,
            alpha_range: check_pair("RandomColor", "alpha_range", alpha_range)?,
            beta_range: check_pair("RandomColor", "beta_range", beta_range)?,
            scope,
        })
    }
}

impl Default for RandomColor {
    fn default() -> Self {
        Self {
            prob: 0.5,
            alpha_range: (0.8, 1.2),
            beta_range: (-10.0, 10.0),
            scope: BandScope::default(),
        }
    }
}

impl Transform for RandomColor {
    fn name(&self) -> &'static str {
        "RandomColor"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        let alpha = uniform(rng, self.alpha_range.0, self.alpha_range.1) as f32;
        let beta = uniform(rng, self.beta_range.0, self.beta_range.1) as f32;
        log::debug!("RandomColor alpha {:.3}, beta {:.3}", alpha, beta);

        let band_num = self.scope.band_num;
        for (_, image) in self.scope.selected(self.name(), &mut sample.images)? {
            image
                .slice_mut(s![.., .., ..band_num])
                .mapv_inplace(|v| alpha * v + beta);
        }
        Ok(sample)
    }
}

/// Haze blended towards an airlight value, denser at the image centre.
#[derive(Debug, Clone)]
pub struct RandomFog {
    prob: f64,
    fog_range: (f64, f64),
    airlight: f32,
    scope: BandScope,
}

/// Airlight intensity of the fog model
pub const DEFAULT_AIRLIGHT: f32 = 127.5;

impl RandomFog {
    pub fn new(prob: f64, fog_range: &[f64], scope: BandScope) -> TransformResult<Self> {
        Ok(Self {
            prob: check_prob("RandomFog", prob)?,
            fog_range: check_pair("RandomFog", "fog_range", fog_range)?,
            airlight: DEFAULT_AIRLIGHT,
            scope,
        })
    }

    pub fn with_airlight(mut self, airlight: f32) -> Self {
        self.airlight = airlight;
        self
    }
}

impl Default for RandomFog {
    fn default() -> Self {
        Self {
            prob: 0.5,
            fog_range: (0.03, 0.28),
            airlight: DEFAULT_AIRLIGHT,
            scope: BandScope::default(),
        }
    }
}

/// Blend the leading bands towards `airlight` with transmission
/// `t = exp(-density * (sqrt(max(H, W)) - 0.04 * d))`, `d` being the distance
/// to the image centre.
fn add_fog(image: &mut Image, band_num: usize, density: f64, airlight: f32) {
    let (rows, cols, _) = image.dim();
    let size = (rows.max(cols) as f64).sqrt();
    let (cy, cx) = ((rows / 2) as f64, (cols / 2) as f64);

    for ((r, c, _), v) in image.slice_mut(s![.., .., ..band_num]).indexed_iter_mut() {
        let distance = ((r as f64 - cy).powi(2) + (c as f64 - cx).powi(2)).sqrt();
        let t = (-density * (size - 0.04 * distance)).exp() as f32;
        *v = *v * t + airlight * (1.0 - t);
    }
}

impl Transform for RandomFog {
    fn name(&self) -> &'static str {
        "RandomFog"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        let band_num = self.scope.band_num;
        for (i, image) in self.scope.selected(self.name(), &mut sample.images)? {
            let density = uniform(rng, self.fog_range.0, self.fog_range.1);
            log::debug!("RandomFog image {} density {:.3}", i, density);
            add_fog(image, band_num, density, self.airlight);
        }
        Ok(sample)
    }
}

/// Line orientation for [`RandomStrip`] and seam orientation for
/// [`RandomSplicing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StripDirection {
    /// Whole rows
    #[default]
    Horizontal,
    /// Whole columns
    Vertical,
}

impl StripDirection {
    pub(crate) fn parse(operator: &'static str, s: &str) -> TransformResult<Self> {
        match s {
            "Horizontal" => Ok(StripDirection::Horizontal),
            "Vertical" => Ok(StripDirection::Vertical),
            other => Err(TransformError::config(
                operator,
                format!(
                    "direction should be Horizontal or Vertical, got \"{}\"",
                    other
                ),
            )),
        }
    }

    fn axis(self) -> Axis {
        match self {
            StripDirection::Horizontal => Axis(0),
            StripDirection::Vertical => Axis(1),
        }
    }
}

impl FromStr for StripDirection {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StripDirection::parse("RandomStrip", s)
    }
}

impl fmt::Display for StripDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StripDirection::Horizontal => write!(f, "Horizontal"),
            StripDirection::Vertical => write!(f, "Vertical"),
        }
    }
}

/// Stripe noise: random whole rows or columns replaced by random values.
#[derive(Debug, Clone)]
pub struct RandomStrip {
    prob: f64,
    strip_rate: f64,
    direction: StripDirection,
    scope: BandScope,
}

impl RandomStrip {
    pub fn new(
        prob: f64,
        strip_rate: f64,
        direction: StripDirection,
        scope: BandScope,
    ) -> TransformResult<Self> {
        if !(0.0..=1.0).contains(&strip_rate) {
            return Err(TransformError::config(
                "RandomStrip",
                format!("strip_rate should be between 0 and 1, got {}", strip_rate),
            ));
        }
        Ok(Self {
            prob: check_prob("RandomStrip", prob)?,
            strip_rate,
            direction,
            scope,
        })
    }
}

impl Default for RandomStrip {
    fn default() -> Self {
        Self {
            prob: 0.5,
            strip_rate: 0.05,
            direction: StripDirection::Horizontal,
            scope: BandScope::default(),
        }
    }
}

impl Transform for RandomStrip {
    fn name(&self) -> &'static str {
        "RandomStrip"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        let band_num = self.scope.band_num;
        let axis = self.direction.axis();

        for (i, image) in self.scope.selected(self.name(), &mut sample.images)? {
            let length = image.len_of(axis);
            let strip_num = (self.strip_rate * length as f64).floor() as usize;
            let stats = band_statistics(image);
            let lines = index::sample(rng, length, strip_num.min(length));
            log::debug!(
                "RandomStrip image {}: {} {} lines",
                i,
                lines.len(),
                self.direction
            );

            for line in lines.iter() {
                let mut strip = image.index_axis_mut(axis, line);
                for (b, mut column) in strip.axis_iter_mut(Axis(1)).take(band_num).enumerate() {
                    let value = uniform(rng, stats[b].min as f64, stats[b].max as f64) as f32;
                    column.fill(value);
                }
            }
        }
        Ok(sample)
    }
}

/// Simulated mosaic seam: the part of each image past a random split gets
/// its own per-band gain and offset.
#[derive(Debug, Clone)]
pub struct RandomSplicing {
    prob: f64,
    direction: StripDirection,
    band_num: usize,
}

impl RandomSplicing {
    pub fn new(prob: f64, direction: StripDirection, band_num: usize) -> TransformResult<Self> {
        Ok(Self {
            prob: check_prob("RandomSplicing", prob)?,
            direction,
            band_num,
        })
    }
}

impl Default for RandomSplicing {
    fn default() -> Self {
        Self {
            prob: 0.1,
            direction: StripDirection::Horizontal,
            band_num: 3,
        }
    }
}

impl Transform for RandomSplicing {
    fn name(&self) -> &'static str {
        "RandomSplicing"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        let axis = self.direction.axis();

        for (i, image) in sample.images.iter_mut().enumerate() {
            check_bands(self.name(), i, image, self.band_num)?;
            let length = image.len_of(axis);
            if length < 2 {
                continue;
            }
            let split = rng.random_range(1..length);
            log::debug!("RandomSplicing image {} split at {}", i, split);

            let mut tail = match self.direction {
                StripDirection::Horizontal => image.slice_mut(s![split.., .., ..self.band_num]),
                StripDirection::Vertical => image.slice_mut(s![.., split.., ..self.band_num]),
            };
            for mut band in tail.axis_iter_mut(Axis(2)) {
                let gain = uniform(rng, 0.8, 1.2) as f32;
                let offset = uniform(rng, -10.0, 10.0) as f32;
                band.mapv_inplace(|v| gain * v + offset);
            }
        }
        Ok(sample)
    }
}

/// Zero whole bands across all acquisitions: every band in `kill_bands`
/// plus one drawn among the bands in neither list.
#[derive(Debug, Clone)]
pub struct RandomRemoveBand {
    prob: f64,
    kill_bands: Vec<usize>,
    keep_bands: Vec<usize>,
}

impl RandomRemoveBand {
    pub fn new(prob: f64, kill_bands: Vec<usize>, keep_bands: Vec<usize>) -> TransformResult<Self> {
        Ok(Self {
            prob: check_prob("RandomRemoveBand", prob)?,
            kill_bands,
            keep_bands,
        })
    }
}

impl Default for RandomRemoveBand {
    fn default() -> Self {
        Self {
            prob: 0.1,
            kill_bands: Vec::new(),
            keep_bands: Vec::new(),
        }
    }
}

impl Transform for RandomRemoveBand {
    fn name(&self) -> &'static str {
        "RandomRemoveBand"
    }

    fn apply(&self, mut sample: Sample, rng: &mut dyn RngCore) -> TransformResult<Sample> {
        if !gate(rng, self.prob) {
            return Ok(sample);
        }
        let bands = sample
            .images
            .first()
            .map(|image| image.dim().2)
            .ok_or_else(|| TransformError::shape(self.name(), "sample contains no images"))?;
        for (i, image) in sample.images.iter().enumerate() {
            if image.dim().2 != bands {
                return Err(TransformError::shape(
                    self.name(),
                    format!(
                        "image {} has {} bands but image 0 has {}",
                        i,
                        image.dim().2,
                        bands
                    ),
                ));
            }
        }

        let mut removed = Vec::new();
        let mut candidates = Vec::new();
        for band in 0..bands {
            if self.kill_bands.contains(&band) {
                removed.push(band);
            } else if !self.keep_bands.contains(&band) {
                candidates.push(band);
            }
        }
        if candidates.is_empty() {
            return Err(TransformError::shape(
                self.name(),
                format!(
                    "no band left to draw from {} bands (kill_bands {:?}, keep_bands {:?})",
                    bands, self.kill_bands, self.keep_bands
                ),
            ));
        }
        removed.push(candidates[rng.random_range(0..candidates.len())]);
        log::debug!("RandomRemoveBand zeroing bands {:?}", removed);

        for image in sample.images.iter_mut() {
            for &band in &removed {
                image.index_axis_mut(Axis(2), band).fill(0.0);
            }
        }
        Ok(sample)
    }
}

/// Normalized-difference spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralIndex {
    /// (NIR - R) / (NIR + R)
    Ndvi,
    /// (G - NIR) / (G + NIR)
    Ndwi,
    /// (MIR - NIR) / (MIR + NIR)
    Ndbi,
}

/// Appends a normalized-difference index as a trailing band of every image.
#[derive(Debug, Clone)]
pub struct BandRatio {
    index: SpectralIndex,
    minuend: usize,
    subtrahend: usize,
}

impl BandRatio {
    pub fn ndvi(r_band: usize, nir_band: usize) -> Self {
        Self {
            index: SpectralIndex::Ndvi,
            minuend: nir_band,
            subtrahend: r_band,
        }
    }

    pub fn ndwi(g_band: usize, nir_band: usize) -> Self {
        Self {
            index: SpectralIndex::Ndwi,
            minuend: g_band,
            subtrahend: nir_band,
        }
    }

    pub fn ndbi(nir_band: usize, mir_band: usize) -> Self {
        Self {
            index: SpectralIndex::Ndbi,
            minuend: mir_band,
            subtrahend: nir_band,
        }
    }

    pub fn index(&self) -> SpectralIndex {
        self.index
    }
}

impl Transform for BandRatio {
    fn name(&self) -> &'static str {
        match self.index {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Ndbi => "NDBI",
        }
    }

    fn apply(&self, mut sample: Sample, _rng: &mut dyn RngCore) -> TransformResult<Sample> {
        for image in sample.images.iter_mut() {
            *image = normalized_difference(image, self.minuend, self.subtrahend)?;
        }
        Ok(sample)
    }
}
