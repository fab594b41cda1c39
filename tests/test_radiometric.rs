use approx::assert_abs_diff_eq;
use cdaug::core::band_math::{band_statistics, normalized_difference};
use cdaug::core::{
    BandRatio, BandScope, ExchangeTime, HistogramMatching, LaplacianMode, Normalize, RandomBlur,
    RandomColor, RandomFog, RandomRemoveBand, RandomSharpening, RandomSplicing, RandomStrip,
    StripDirection, Transform,
};
use cdaug::{Image, Label, Sample};
use ndarray::{Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bitemporal(bands: usize) -> Sample {
    let t1 = Array3::from_shape_fn((12, 12, bands), |(r, c, b)| ((r * 12 + c + b * 17) % 256) as f32);
    let t2 = t1.mapv(|v| (v * 0.8 + 20.0).round());
    Sample::new(vec![t1, t2], Some(vec![Label::zeros((12, 12))]))
}

fn random_operators(prob: f64) -> Vec<Box<dyn Transform>> {
    vec![
        Box::new(RandomBlur::new(prob, 3, BandScope::default()).unwrap()),
        Box::new(RandomSharpening::new(prob, LaplacianMode::FourOne, BandScope::default()).unwrap()),
        Box::new(RandomColor::new(prob, &[0.8, 1.2], &[-10.0, 10.0], BandScope::default()).unwrap()),
        Box::new(RandomFog::new(prob, &[0.03, 0.28], BandScope::default()).unwrap()),
        Box::new(
            RandomStrip::new(prob, 0.2, StripDirection::Vertical, BandScope::default()).unwrap(),
        ),
        Box::new(RandomSplicing::new(prob, StripDirection::Horizontal, 3).unwrap()),
        Box::new(RandomRemoveBand::new(prob, vec![], vec![]).unwrap()),
        Box::new(ExchangeTime::new(prob).unwrap()),
    ]
}

#[test]
fn test_ndvi_of_constant_bands() {
    let mut image = Image::zeros((6, 6, 4));
    image.index_axis_mut(Axis(2), 1).fill(50.0);
    image.index_axis_mut(Axis(2), 3).fill(150.0);

    let mut rng = StdRng::seed_from_u64(0);
    let out = BandRatio::ndvi(1, 3)
        .apply(Sample::unlabeled(vec![image.clone(), image]), &mut rng)
        .unwrap();
    for image in &out.images {
        assert_eq!(image.dim(), (6, 6, 5));
        for &v in image.index_axis(Axis(2), 4).iter() {
            assert_abs_diff_eq!(v, 0.5, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_normalized_difference_zero_denominator() {
    let mut image = Image::zeros((2, 2, 2));
    image[[0, 0, 0]] = 3.0;
    image[[0, 0, 1]] = 1.0;
    let out = normalized_difference(&image, 0, 1).unwrap();
    assert_abs_diff_eq!(out[[0, 0, 2]], 0.5, epsilon = 1e-6);
    assert_eq!(out[[1, 1, 2]], 0.0);
}

#[test]
fn test_remove_band_policy() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let sample = Sample::unlabeled(vec![Image::ones((4, 4, 4)), Image::ones((4, 4, 4))]);
        let out = RandomRemoveBand::new(1.0, vec![0], vec![1])
            .unwrap()
            .apply(sample, &mut rng)
            .unwrap();

        for image in &out.images {
            let zeroed: Vec<bool> = image
                .axis_iter(Axis(2))
                .map(|band| band.iter().all(|&v| v == 0.0))
                .collect();
            assert!(zeroed[0]);
            assert!(!zeroed[1]);
            assert!(zeroed[2] ^ zeroed[3]);
        }
        // The same band is removed from every acquisition
        assert_eq!(out.images[0], out.images[1]);
    }
}

#[test]
fn test_histogram_matching_identical_images() {
    let image = Array3::from_shape_fn((16, 16, 3), |(r, c, b)| ((r * 16 + c) * (b + 1) % 256) as f32);
    let mut rng = StdRng::seed_from_u64(0);
    let out = HistogramMatching::new(8, 3)
        .unwrap()
        .apply(Sample::unlabeled(vec![image.clone(), image.clone()]), &mut rng)
        .unwrap();
    assert_eq!(out.images[0], image);
    assert_eq!(out.images[1], image);
}

#[test]
fn test_histogram_matching_keeps_float_images() {
    // Normalized imagery: fractional and negative values
    let image = Array3::from_shape_fn((4, 4, 3), |(r, c, b)| {
        (r * 4 + c) as f32 * 0.1 - 0.5 + b as f32 * 0.01
    });
    let mut rng = StdRng::seed_from_u64(0);
    let out = HistogramMatching::new(8, 3)
        .unwrap()
        .apply(Sample::unlabeled(vec![image.clone(), image.clone()]), &mut rng)
        .unwrap();
    assert_eq!(out.images[0], image);
    assert_eq!(out.images[1], image);
}

#[test]
fn test_histogram_matching_aligns_statistics() {
    let reference = Array3::from_shape_fn((32, 32, 3), |(r, c, _)| ((r * 32 + c) / 8) as f32);
    let darker = reference.mapv(|v| (v * 0.5).floor());
    let mut rng = StdRng::seed_from_u64(0);
    let out = HistogramMatching::new(8, 3)
        .unwrap()
        .apply(Sample::unlabeled(vec![reference.clone(), darker]), &mut rng)
        .unwrap();

    let expected = band_statistics(&reference);
    let matched = band_statistics(&out.images[1]);
    for (e, m) in expected.iter().zip(&matched) {
        assert!((e.mean - m.mean).abs() < 2.0, "{} vs {}", e.mean, m.mean);
        assert_eq!(e.max, m.max);
    }
}

#[test]
fn test_zero_probability_is_identity() {
    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        for op in random_operators(0.0) {
            let input = bitemporal(4);
            let out = op.apply(input.clone(), &mut rng).unwrap();
            assert_eq!(out, input, "{}", op.name());
        }
    }
}

#[test]
fn test_full_probability_keeps_labels_and_extent() {
    let mut rng = StdRng::seed_from_u64(99);
    for op in random_operators(1.0) {
        let input = bitemporal(4);
        let out = op.apply(input.clone(), &mut rng).unwrap();
        assert_ne!(out.images, input.images, "{}", op.name());
        assert_eq!(out.labels, input.labels, "{}", op.name());
        for image in &out.images {
            assert_eq!(image.dim(), (12, 12, 4), "{}", op.name());
        }
    }
}

#[test]
fn test_img_do_limits_affected_acquisitions() {
    let mut rng = StdRng::seed_from_u64(5);
    let input = bitemporal(3);
    let op = RandomColor::new(1.0, &[1.5, 1.5], &[5.0, 5.0], BandScope::new(vec![1], 3)).unwrap();
    let out = op.apply(input.clone(), &mut rng).unwrap();
    assert_eq!(out.images[0], input.images[0]);
    assert_eq!(out.images[1], input.images[1].mapv(|v| 1.5 * v + 5.0));
}

#[test]
fn test_normalize_by_bit_depth() {
    let mut rng = StdRng::seed_from_u64(0);
    let image = Image::from_elem((4, 4, 3), 65535.0);
    let op = Normalize::new(&[0.0, 0.5, 1.0], &[1.0, 0.5, 1.0], 16, 3).unwrap();
    let out = op.apply(Sample::unlabeled(vec![image]), &mut rng).unwrap();
    assert_abs_diff_eq!(out.images[0][[0, 0, 0]], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out.images[0][[0, 0, 1]], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out.images[0][[0, 0, 2]], 0.0, epsilon = 1e-6);
}
