use crate::types::{Image, Label, TransformError};
use ndarray::{s, Array, Array2, Array3, Axis, Dimension};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Interpolation kernels for image resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    /// Nearest neighbour (source index = floor(dst * scale))
    #[default]
    Nearest,
    /// Bilinear, half-pixel centres
    Linear,
    /// Bicubic (a = -0.75)
    Cubic,
    /// Pixel-area averaging when shrinking, bilinear when enlarging
    Area,
    /// Lanczos with an 8-tap window
    Lanczos4,
}

impl FromStr for Interpolation {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEAREST" => Ok(Interpolation::Nearest),
            "LINEAR" => Ok(Interpolation::Linear),
            "CUBIC" => Ok(Interpolation::Cubic),
            "AREA" => Ok(Interpolation::Area),
            "LANCZOS4" => Ok(Interpolation::Lanczos4),
            other => Err(TransformError::config(
                "Resize",
                format!(
                    "interp should be one of NEAREST, LINEAR, CUBIC, AREA, LANCZOS4, got \"{}\"",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interpolation::Nearest => "NEAREST",
            Interpolation::Linear => "LINEAR",
            Interpolation::Cubic => "CUBIC",
            Interpolation::Area => "AREA",
            Interpolation::Lanczos4 => "LANCZOS4",
        };
        write!(f, "{}", name)
    }
}

/// Source taps (index, weight) contributing to each output position of one axis
type AxisTaps = Vec<Vec<(usize, f32)>>;

fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

fn nearest_indices(src: usize, dst: usize) -> Vec<usize> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|d| ((d as f64 * scale).floor() as usize).min(src - 1))
        .collect()
}

fn cubic_weight(x: f64) -> f64 {
    const A: f64 = -0.75;
    let x = x.abs();
    if x <= 1.0 {
        ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((A * x - 5.0 * A) * x + 8.0 * A) * x - 4.0 * A
    } else {
        0.0
    }
}

fn lanczos4_weight(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        return 1.0;
    }
    if x.abs() >= 4.0 {
        return 0.0;
    }
    let px = PI * x;
    4.0 * px.sin() * (px / 4.0).sin() / (px * px)
}

/// Windowed kernel taps around a half-pixel-centred source coordinate.
fn kernel_taps(
    src: usize,
    dst: usize,
    offsets: std::ops::RangeInclusive<isize>,
    kernel: fn(f64) -> f64,
) -> AxisTaps {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|d| {
            let fx = (d as f64 + 0.5) * scale - 0.5;
            let x0 = fx.floor();
            let t = fx - x0;
            let taps: Vec<(usize, f64)> = offsets
                .clone()
                .map(|k| (clamp_index(x0 as isize + k, src), kernel(t - k as f64)))
                .collect();
            let total: f64 = taps.iter().map(|&(_, w)| w).sum();
            taps.into_iter()
                .map(|(i, w)| (i, (w / total) as f32))
                .collect()
        })
        .collect()
}

fn area_taps(src: usize, dst: usize) -> AxisTaps {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src);
            (first..last)
                .filter_map(|i| {
                    let overlap = (end.min(i as f64 + 1.0) - start.max(i as f64)).max(0.0);
                    (overlap > 0.0).then(|| (i, (overlap / scale) as f32))
                })
                .collect()
        })
        .collect()
}

fn axis_taps(src: usize, dst: usize, interp: Interpolation) -> AxisTaps {
    match interp {
        Interpolation::Nearest => nearest_indices(src, dst)
            .into_iter()
            .map(|i| vec![(i, 1.0)])
            .collect(),
        Interpolation::Linear => kernel_taps(src, dst, 0..=1, |x| (1.0 - x.abs()).max(0.0)),
        Interpolation::Cubic => kernel_taps(src, dst, -1..=2, cubic_weight),
        Interpolation::Area if dst < src => area_taps(src, dst),
        Interpolation::Area => kernel_taps(src, dst, 0..=1, |x| (1.0 - x.abs()).max(0.0)),
        Interpolation::Lanczos4 => kernel_taps(src, dst, -3..=4, lanczos4_weight),
    }
}

/// Resize every band of an image to `height` x `width` (separable: rows,
/// then columns).
pub fn resize_image(image: &Image, height: usize, width: usize, interp: Interpolation) -> Image {
    let (rows, cols, bands) = image.dim();
    if (rows, cols) == (height, width) {
        return image.clone();
    }
    let row_taps = axis_taps(rows, height, interp);
    let col_taps = axis_taps(cols, width, interp);

    let mut vertical = Array3::<f32>::zeros((height, cols, bands));
    for (out_row, taps) in row_taps.iter().enumerate() {
        let mut dst = vertical.index_axis_mut(Axis(0), out_row);
        for &(in_row, weight) in taps {
            dst.scaled_add(weight, &image.index_axis(Axis(0), in_row));
        }
    }

    let mut output = Array3::<f32>::zeros((height, width, bands));
    for (out_col, taps) in col_taps.iter().enumerate() {
        let mut dst = output.index_axis_mut(Axis(1), out_col);
        for &(in_col, weight) in taps {
            dst.scaled_add(weight, &vertical.index_axis(Axis(1), in_col));
        }
    }

    output
}

/// Nearest-neighbour resize of a label map; never invents class values.
pub fn resize_label(label: &Label, height: usize, width: usize) -> Label {
    let (rows, cols) = label.dim();
    let row_idx = nearest_indices(rows, height);
    let col_idx = nearest_indices(cols, width);
    Array2::from_shape_fn((height, width), |(r, c)| label[[row_idx[r], col_idx[c]]])
}

/// Mirror the first two axes (rows, columns) of an image or label.
pub fn flip<A: Clone, D: Dimension>(array: &Array<A, D>, rows: bool, cols: bool) -> Array<A, D> {
    let mut view = array.view();
    if rows {
        view.invert_axis(Axis(0));
    }
    if cols {
        view.invert_axis(Axis(1));
    }
    view.to_owned()
}

/// Inverse rotation mapping: destination pixel -> source coordinate, for a
/// counter-clockwise rotation of `angle_deg` about the pixel-grid centre.
struct InverseRotation {
    cos: f64,
    sin: f64,
    cx: f64,
    cy: f64,
}

impl InverseRotation {
    fn new(rows: usize, cols: usize, angle_deg: f64) -> Self {
        let theta = angle_deg.to_radians();
        Self {
            cos: theta.cos(),
            sin: theta.sin(),
            cx: (cols as f64 - 1.0) / 2.0,
            cy: (rows as f64 - 1.0) / 2.0,
        }
    }

    fn source(&self, row: usize, col: usize) -> (f64, f64) {
        let dx = col as f64 - self.cx;
        let dy = row as f64 - self.cy;
        let sx = self.cos * dx - self.sin * dy + self.cx;
        let sy = self.sin * dx + self.cos * dy + self.cy;
        (sy, sx)
    }
}

/// Rotate an image about its centre keeping the canvas; bilinear sampling,
/// pixels mapped from outside the source take `fill`.
pub fn rotate_image(image: &Image, angle_deg: f64, fill: f32) -> Image {
    let (rows, cols, bands) = image.dim();
    let rotation = InverseRotation::new(rows, cols, angle_deg);
    let mut output = Array3::from_elem((rows, cols, bands), fill);

    let fetch = |r: isize, c: isize, b: usize| -> f64 {
        if r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols {
            image[[r as usize, c as usize, b]] as f64
        } else {
            fill as f64
        }
    };

    for row in 0..rows {
        for col in 0..cols {
            let (sy, sx) = rotation.source(row, col);
            let y0 = sy.floor();
            let x0 = sx.floor();
            if y0 < -1.0 || x0 < -1.0 || y0 >= rows as f64 || x0 >= cols as f64 {
                continue;
            }
            let (fy, fx) = (sy - y0, sx - x0);
            let (y0, x0) = (y0 as isize, x0 as isize);
            for b in 0..bands {
                let value = fetch(y0, x0, b) * (1.0 - fx) * (1.0 - fy)
                    + fetch(y0, x0 + 1, b) * fx * (1.0 - fy)
                    + fetch(y0 + 1, x0, b) * (1.0 - fx) * fy
                    + fetch(y0 + 1, x0 + 1, b) * fx * fy;
                output[[row, col, b]] = value as f32;
            }
        }
    }

    output
}

/// Rotate a label map with nearest-neighbour sampling; exposed pixels take
/// `fill` (the ignore value).
pub fn rotate_label(label: &Label, angle_deg: f64, fill: i32) -> Label {
    let (rows, cols) = label.dim();
    let rotation = InverseRotation::new(rows, cols, angle_deg);
    Array2::from_shape_fn((rows, cols), |(row, col)| {
        let (sy, sx) = rotation.source(row, col);
        let (r, c) = (sy.round(), sx.round());
        if r >= 0.0 && c >= 0.0 && r < rows as f64 && c < cols as f64 {
            label[[r as usize, c as usize]]
        } else {
            fill
        }
    })
}

/// Copy out the `height` x `width` window whose top-left corner is (`top`, `left`).
pub fn crop_image(image: &Image, top: usize, left: usize, height: usize, width: usize) -> Image {
    image
        .slice(s![top..top + height, left..left + width, ..])
        .to_owned()
}

pub fn crop_label(label: &Label, top: usize, left: usize, height: usize, width: usize) -> Label {
    label
        .slice(s![top..top + height, left..left + width])
        .to_owned()
}

/// Place an image in the centre of a `rows` x `cols` canvas filled with `fill`.
pub fn pad_image_center(image: &Image, rows: usize, cols: usize, fill: f32) -> Image {
    let (h, w, bands) = image.dim();
    let top = (rows - h) / 2;
    let left = (cols - w) / 2;
    let mut canvas = Array3::from_elem((rows, cols, bands), fill);
    canvas
        .slice_mut(s![top..top + h, left..left + w, ..])
        .assign(image);
    canvas
}

pub fn pad_label_center(label: &Label, rows: usize, cols: usize, fill: i32) -> Label {
    let (h, w) = label.dim();
    let top = (rows - h) / 2;
    let left = (cols - w) / 2;
    let mut canvas = Array2::from_elem((rows, cols), fill);
    canvas.slice_mut(s![top..top + h, left..left + w]).assign(label);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp(rows: usize, cols: usize, bands: usize) -> Image {
        Array3::from_shape_fn((rows, cols, bands), |(r, c, b)| (r * 100 + c * 10 + b) as f32)
    }

    #[test]
    fn test_interpolation_parsing() {
        assert_eq!("LANCZOS4".parse::<Interpolation>().unwrap(), Interpolation::Lanczos4);
        assert_eq!("AREA".parse::<Interpolation>().unwrap(), Interpolation::Area);
        assert!("BILINEAR".parse::<Interpolation>().is_err());
    }

    #[test]
    fn test_nearest_resize_picks_source_pixels() {
        let image = ramp(4, 4, 2);
        let resized = resize_image(&image, 2, 2, Interpolation::Nearest);
        assert_eq!(resized.dim(), (2, 2, 2));
        assert_eq!(resized[[0, 0, 0]], image[[0, 0, 0]]);
        assert_eq!(resized[[1, 1, 1]], image[[2, 2, 1]]);
    }

    #[test]
    fn test_area_resize_averages_blocks() {
        // Same expectation as a 2x2 multilook
        let data = Array3::from_shape_vec(
            (4, 4, 1),
            vec![
                1.0, 2.0, 3.0, 4.0,
                5.0, 6.0, 7.0, 8.0,
                9.0, 10.0, 11.0, 12.0,
                13.0, 14.0, 15.0, 16.0,
            ],
        )
        .unwrap();
        let resized = resize_image(&data, 2, 2, Interpolation::Area);
        assert_abs_diff_eq!(resized[[0, 0, 0]], 3.5, epsilon = 1e-5);
        assert_abs_diff_eq!(resized[[0, 1, 0]], 5.5, epsilon = 1e-5);
        assert_abs_diff_eq!(resized[[1, 0, 0]], 11.5, epsilon = 1e-5);
        assert_abs_diff_eq!(resized[[1, 1, 0]], 13.5, epsilon = 1e-5);
    }

    #[test]
    fn test_smooth_kernels_preserve_constants() {
        let image = Array3::from_elem((5, 7, 3), 42.0f32);
        for interp in [
            Interpolation::Linear,
            Interpolation::Cubic,
            Interpolation::Area,
            Interpolation::Lanczos4,
        ] {
            for (h, w) in [(10, 3), (3, 14), (5, 7)] {
                let resized = resize_image(&image, h, w, interp);
                assert_eq!(resized.dim(), (h, w, 3));
                for v in resized.iter() {
                    assert_abs_diff_eq!(*v, 42.0, epsilon = 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_linear_upscale_interpolates() {
        let data = Array3::from_shape_vec((1, 2, 1), vec![0.0, 10.0]).unwrap();
        let resized = resize_image(&data, 1, 4, Interpolation::Linear);
        // Half-pixel centres: -0.25 (clamped), 0.25, 0.75, 1.25 (clamped)
        let values: Vec<f32> = resized.iter().cloned().collect();
        assert_abs_diff_eq!(values[0], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(values[1], 2.5, epsilon = 1e-5);
        assert_abs_diff_eq!(values[2], 7.5, epsilon = 1e-5);
        assert_abs_diff_eq!(values[3], 10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_label_resize_keeps_classes() {
        let label = Array2::from_shape_fn((6, 6), |(r, c)| ((r + c) % 3) as i32);
        let resized = resize_label(&label, 9, 4);
        assert_eq!(resized.dim(), (9, 4));
        assert!(resized.iter().all(|v| (0..3).contains(v)));
    }

    #[test]
    fn test_flip_axes() {
        let label = Array2::from_shape_vec((2, 3), vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(flip(&label, false, true), Array2::from_shape_vec((2, 3), vec![3, 2, 1, 6, 5, 4]).unwrap());
        assert_eq!(flip(&label, true, false), Array2::from_shape_vec((2, 3), vec![4, 5, 6, 1, 2, 3]).unwrap());
        assert_eq!(flip(&label, true, true), Array2::from_shape_vec((2, 3), vec![6, 5, 4, 3, 2, 1]).unwrap());

        let image = ramp(3, 4, 2);
        let flipped = flip(&image, false, true);
        assert_eq!(flipped[[1, 0, 1]], image[[1, 3, 1]]);
    }

    #[test]
    fn test_rotation_fills_exposed_corners() {
        let image = Array3::from_elem((32, 32, 2), 7.0f32);
        let label = Array2::from_elem((32, 32), 1);

        let rotated = rotate_image(&image, 45.0, 0.0);
        let rotated_label = rotate_label(&label, 45.0, 255);

        for &(r, c) in &[(0, 0), (0, 31), (31, 0), (31, 31)] {
            assert_eq!(rotated[[r, c, 0]], 0.0);
            assert_eq!(rotated[[r, c, 1]], 0.0);
            assert_eq!(rotated_label[[r, c]], 255);
        }
        // The centre stays inside the source
        assert_abs_diff_eq!(rotated[[16, 16, 0]], 7.0, epsilon = 1e-4);
        assert_eq!(rotated_label[[16, 16]], 1);
    }

    #[test]
    fn test_quarter_turn_is_a_permutation() {
        let label = Array2::from_shape_fn((5, 5), |(r, c)| (r * 5 + c) as i32);
        let rotated = rotate_label(&label, 90.0, 255);
        assert!(rotated.iter().all(|&v| v != 255));
        let mut values: Vec<i32> = rotated.iter().cloned().collect();
        values.sort_unstable();
        assert_eq!(values, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_crop_and_pad_roundtrip_extent() {
        let image = ramp(6, 8, 3);
        let cropped = crop_image(&image, 1, 2, 3, 4);
        assert_eq!(cropped.dim(), (3, 4, 3));
        assert_eq!(cropped[[0, 0, 0]], image[[1, 2, 0]]);

        let padded = pad_image_center(&cropped, 6, 8, 0.0);
        assert_eq!(padded.dim(), (6, 8, 3));
        assert_eq!(padded[[0, 0, 0]], 0.0);
        assert_eq!(padded[[1, 2, 0]], image[[1, 2, 0]]);

        let label = Array2::from_elem((2, 2), 1);
        let padded_label = pad_label_center(&label, 4, 5, 255);
        assert_eq!(padded_label[[0, 0]], 255);
        assert_eq!(padded_label[[1, 1]], 1);
        assert_eq!(padded_label[[2, 2]], 1);
        assert_eq!(padded_label[[3, 4]], 255);
    }
}
