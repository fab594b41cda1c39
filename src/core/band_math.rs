use crate::types::{Image, TransformError, TransformResult};
use ndarray::{concatenate, Array2, ArrayView2, ArrayViewMut2, Axis, Zip};

/// Summary statistics of one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStatistics {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub std: f64,
}

/// Per-band min, max, mean and population standard deviation.
pub fn band_statistics(image: &Image) -> Vec<BandStatistics> {
    image
        .axis_iter(Axis(2))
        .map(|band| {
            let count = band.len().max(1) as f64;
            let (min, max) = band
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            let mean = band.iter().map(|&v| v as f64).sum::<f64>() / count;
            let variance = band
                .iter()
                .map(|&v| (v as f64 - mean) * (v as f64 - mean))
                .sum::<f64>()
                / count;
            BandStatistics {
                min,
                max,
                mean,
                std: variance.sqrt(),
            }
        })
        .collect()
}

/// Normalized difference `(a - b) / (a + b)` of two bands, appended as a new
/// trailing band. Pixels where `a + b == 0` are set to 0.
pub fn normalized_difference(
    image: &Image,
    band_a: usize,
    band_b: usize,
) -> TransformResult<Image> {
    let bands = image.dim().2;
    if band_a >= bands || band_b >= bands {
        return Err(TransformError::shape(
            "BandRatio",
            format!(
                "band indices ({}, {}) out of range for a {}-band image",
                band_a, band_b, bands
            ),
        ));
    }

    let a = image.index_axis(Axis(2), band_a);
    let b = image.index_axis(Axis(2), band_b);
    let ratio = Zip::from(&a).and(&b).map_collect(|&a, &b| {
        let sum = a + b;
        if sum == 0.0 {
            0.0
        } else {
            (a - b) / sum
        }
    });

    concatenate(Axis(2), &[image.view(), ratio.insert_axis(Axis(2)).view()])
        .map_err(|e| TransformError::shape("BandRatio", format!("failed to append band: {}", e)))
}

/// Linear rescale of a band from `[min, max]` to `[0, 1]`.
pub fn min_max_normalize(mut band: ArrayViewMut2<f32>, min: f32, max: f32) {
    let range = max - min;
    if range == 0.0 {
        band.fill(0.0);
        return;
    }
    band.mapv_inplace(|v| (v - min) / range);
}

/// Min-max scale then standardize the leading `mean.len()` bands:
/// `((v - min) / (max - min) - mean) / std`.
pub fn standardize(image: &mut Image, min: &[f32], max: &[f32], mean: &[f32], std: &[f32]) {
    for (b, mut band) in image
        .axis_iter_mut(Axis(2))
        .take(mean.len())
        .enumerate()
    {
        min_max_normalize(band.view_mut(), min[b], max[b]);
        band.mapv_inplace(|v| (v - mean[b]) / std[b]);
    }
}

fn quantize(value: f32, levels: usize) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value.round() as usize).min(levels - 1)
}

/// Cumulative distribution of a band over `levels` integer levels.
pub fn cumulative_distribution(band: ArrayView2<f32>, levels: usize) -> Vec<f64> {
    let mut histogram = vec![0u64; levels];
    for &v in band.iter() {
        histogram[quantize(v, levels)] += 1;
    }
    let total = band.len().max(1) as f64;
    let mut running = 0u64;
    histogram
        .into_iter()
        .map(|count| {
            running += count;
            running as f64 / total
        })
        .collect()
}

/// Lowest level whose CDF value is closest to `p`.
fn closest_level(cdf: &[f64], p: f64) -> usize {
    let idx = cdf.partition_point(|&c| c < p);
    if idx == 0 {
        return 0;
    }
    if idx == cdf.len() {
        return cdf.partition_point(|&c| c < cdf[idx - 1]);
    }
    if p - cdf[idx - 1] <= cdf[idx] - p {
        cdf.partition_point(|&c| c < cdf[idx - 1])
    } else {
        idx
    }
}

/// True when every finite value is a non-negative integer, so the band can
/// be binned on integer levels.
fn is_level_valued(band: ArrayView2<f32>) -> bool {
    band.iter()
        .filter(|v| v.is_finite())
        .all(|&v| v >= 0.0 && v.fract() == 0.0)
}

/// Sorted distinct finite values of a band with their cumulative frequency.
fn value_distribution(band: ArrayView2<f32>) -> (Vec<f32>, Vec<f64>) {
    let mut values: Vec<f32> = band.iter().copied().filter(|v| v.is_finite()).collect();
    values.sort_unstable_by(f32::total_cmp);
    let total = values.len().max(1) as f64;

    let mut distinct: Vec<f32> = Vec::new();
    let mut cdf: Vec<f64> = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        let p = (i + 1) as f64 / total;
        if distinct.last() == Some(&v) {
            if let Some(running) = cdf.last_mut() {
                *running = p;
            }
        } else {
            distinct.push(v);
            cdf.push(p);
        }
    }
    (distinct, cdf)
}

fn match_levels(
    source: ArrayView2<f32>,
    reference: ArrayView2<f32>,
    max_levels: usize,
) -> Array2<f32> {
    let observed = source
        .iter()
        .chain(reference.iter())
        .filter(|v| v.is_finite())
        .fold(0.0f32, |acc, &v| acc.max(v));
    let levels = ((observed.round() as usize).saturating_add(1)).clamp(1, max_levels.max(1));

    let source_cdf = cumulative_distribution(source, levels);
    let reference_cdf = cumulative_distribution(reference, levels);
    let lut: Vec<f32> = source_cdf
        .iter()
        .map(|&p| closest_level(&reference_cdf, p) as f32)
        .collect();

    source.mapv(|v| lut[quantize(v, levels)])
}

fn match_values(source: ArrayView2<f32>, reference: ArrayView2<f32>) -> Array2<f32> {
    let (source_values, source_cdf) = value_distribution(source);
    let (reference_values, reference_cdf) = value_distribution(reference);
    if source_values.is_empty() || reference_values.is_empty() {
        return source.to_owned();
    }

    let lut: Vec<f32> = source_cdf
        .iter()
        .map(|&p| reference_values[closest_level(&reference_cdf, p)])
        .collect();

    source.mapv(|v| {
        if !v.is_finite() {
            return v;
        }
        let idx = source_values.partition_point(|&d| d < v).min(lut.len() - 1);
        lut[idx]
    })
}

/// Histogram specification: remap `source` so its distribution follows
/// `reference`.
///
/// Bands holding non-negative integers are binned on levels `[0, L)` with
/// `L = min(max_levels, largest observed value + 1)`. Any other band (float
/// data after normalization, negative values) is matched over its sorted
/// distinct values instead, so nothing is rounded or clamped. Either way each
/// source value maps to the reference value with the closest cumulative
/// frequency, and non-finite values pass through.
pub fn histogram_match(
    source: ArrayView2<f32>,
    reference: ArrayView2<f32>,
    max_levels: usize,
) -> Array2<f32> {
    if is_level_valued(source) && is_level_valued(reference) {
        match_levels(source, reference, max_levels)
    } else {
        match_values(source, reference)
    }
}
