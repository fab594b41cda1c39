//! Windowed filtering on single bands.
//!
//! Borders are handled with reflect-101 extension (`dcb|abcd|cba`), so a
//! filtered band keeps its extent and no fill value leaks into the result.

use crate::types::Image;
use ndarray::{s, Array2, ArrayView2, Axis};

/// Reflect-101 index into `[0, len)`.
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let n = len as isize;
    let period = 2 * (n - 1);
    let mut i = index.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}

/// Sigma used for a Gaussian kernel of `ksize` taps when none is given.
pub fn default_sigma(ksize: usize) -> f64 {
    0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian kernel with `ksize` taps (odd).
pub fn gaussian_kernel(ksize: usize, sigma: f64) -> Vec<f32> {
    let sigma = if sigma > 0.0 { sigma } else { default_sigma(ksize) };
    let half = (ksize / 2) as f64;
    let weights: Vec<f64> = (0..ksize)
        .map(|i| {
            let x = i as f64 - half;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| (w / total) as f32).collect()
}

/// Separable filter: the same 1-D kernel along rows, then along columns.
pub fn separable_filter(band: ArrayView2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (rows, cols) = band.dim();
    let half = (kernel.len() / 2) as isize;

    let mut horizontal = Array2::<f32>::zeros((rows, cols));
    for i in 0..rows {
        for j in 0..cols {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let jj = reflect_101(j as isize + k as isize - half, cols);
                acc += w * band[[i, jj]];
            }
            horizontal[[i, j]] = acc;
        }
    }

    let mut output = Array2::<f32>::zeros((rows, cols));
    for i in 0..rows {
        for j in 0..cols {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let ii = reflect_101(i as isize + k as isize - half, rows);
                acc += w * horizontal[[ii, j]];
            }
            output[[i, j]] = acc;
        }
    }

    output
}

/// 2-D correlation of a band with an odd-sized kernel.
pub fn correlate(band: ArrayView2<f32>, kernel: &Array2<f32>) -> Array2<f32> {
    let (rows, cols) = band.dim();
    let (k_rows, k_cols) = kernel.dim();
    let half_r = (k_rows / 2) as isize;
    let half_c = (k_cols / 2) as isize;

    Array2::from_shape_fn((rows, cols), |(i, j)| {
        let mut acc = 0.0f32;
        for ((ki, kj), &w) in kernel.indexed_iter() {
            if w == 0.0 {
                continue;
            }
            let ii = reflect_101(i as isize + ki as isize - half_r, rows);
            let jj = reflect_101(j as isize + kj as isize - half_c, cols);
            acc += w * band[[ii, jj]];
        }
        acc
    })
}

/// Replace each of the first `band_num` bands with `filter(band)`.
///
/// Bands are independent, so with the `parallel` feature they are processed
/// on the rayon pool.
pub fn filter_leading_bands<F>(image: &mut Image, band_num: usize, filter: F)
where
    F: Fn(ArrayView2<f32>) -> Array2<f32> + Send + Sync,
{
    let band_num = band_num.min(image.dim().2);
    let mut bands = image.slice_mut(s![.., .., ..band_num]);

    #[cfg(feature = "parallel")]
    {
        use ndarray::parallel::prelude::*;
        bands
            .axis_iter_mut(Axis(2))
            .into_par_iter()
            .for_each(|mut band| {
                let filtered = filter(band.view());
                band.assign(&filtered);
            });
    }

    #[cfg(not(feature = "parallel"))]
    for mut band in bands.axis_iter_mut(Axis(2)) {
        let filtered = filter(band.view());
        band.assign(&filtered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array3};

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(-4, 1), 0);
    }

    #[test]
    fn test_gaussian_kernel_ksize3() {
        // sigma = 0.8 for a 3-tap kernel
        let kernel = gaussian_kernel(3, 0.0);
        assert_eq!(kernel.len(), 3);
        assert_abs_diff_eq!(kernel.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(kernel[0], 0.2384, epsilon = 1e-3);
        assert_abs_diff_eq!(kernel[1], 0.5232, epsilon = 1e-3);
        assert_eq!(kernel[0], kernel[2]);
    }

    #[test]
    fn test_blur_keeps_constant_band() {
        let band = Array2::from_elem((6, 5), 12.0f32);
        let blurred = separable_filter(band.view(), &gaussian_kernel(5, 0.0));
        for v in blurred.iter() {
            assert_abs_diff_eq!(*v, 12.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_laplacian_response() {
        let kernel = array![[0.0f32, -1.0, 0.0], [-1.0, 4.0, -1.0], [0.0, -1.0, 0.0]];
        let mut band = Array2::<f32>::zeros((5, 5));
        band[[2, 2]] = 1.0;
        let response = correlate(band.view(), &kernel);
        assert_eq!(response[[2, 2]], 4.0);
        assert_eq!(response[[1, 2]], -1.0);
        assert_eq!(response[[0, 0]], 0.0);

        let flat = Array2::from_elem((4, 4), 3.0f32);
        assert!(correlate(flat.view(), &kernel).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_filter_leading_bands_only() {
        let mut image = Array3::<f32>::zeros((5, 5, 4));
        image[[2, 2, 0]] = 9.0;
        image[[2, 2, 3]] = 9.0;
        filter_leading_bands(&mut image, 3, |band| {
            separable_filter(band, &gaussian_kernel(3, 0.0))
        });
        assert!(image[[2, 2, 0]] < 9.0);
        assert!(image[[2, 1, 0]] > 0.0);
        // Band 3 is beyond band_num and must be untouched
        assert_eq!(image[[2, 2, 3]], 9.0);
        assert_eq!(image[[2, 1, 3]], 0.0);
    }
}
