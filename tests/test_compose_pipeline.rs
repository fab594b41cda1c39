use cdaug::core::resample::resize_label;
use cdaug::core::{
    seed_thread_rng, Compose, FlipDirection, ImageSource, Interpolation, PipelineConfig,
    RandomFlip, Resize, TargetSize, Transform,
};
use cdaug::{DataFormat, Image, Label, TransformError};
use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::{Array3, ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn textured_image(seed: usize) -> Image {
    Array3::from_shape_fn((256, 256, 3), |(r, c, b)| {
        ((r * 7 + c * 13 + b * 31 + seed) % 251) as f32
    })
}

fn textured_label() -> Label {
    Label::from_shape_fn((256, 256), |(r, c)| ((r / 16 + c / 32) % 2) as i32)
}

#[test]
fn test_resize_then_flip_keeps_correspondence() -> anyhow::Result<()> {
    init_logging();

    let transforms: Vec<Box<dyn Transform>> = vec![
        Box::new(Resize::new(TargetSize::Square(128), Interpolation::Nearest)?),
        Box::new(RandomFlip::new(1.0, FlipDirection::Horizontal)?),
    ];
    let compose = Compose::new(transforms, DataFormat::Hwc, 2)?;

    let label = textured_label();
    let out = compose.apply(
        vec![textured_image(0).into(), textured_image(1).into()],
        Some(vec![label.clone().into()]),
    )?;

    assert_eq!(out.images.len(), 2);
    for image in &out.images {
        assert_eq!(image.dim(), (128, 128, 3));
    }
    let labels = out.labels.expect("labels were supplied");
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].dim(), (128, 128));

    let resized = resize_label(&label, 128, 128);
    for c in 0..128 {
        assert_eq!(labels[0][[0, c]], resized[[0, 127 - c]] as i64);
    }
    Ok(())
}

#[test]
fn test_seeded_pipeline_is_reproducible() -> anyhow::Result<()> {
    init_logging();

    let config = PipelineConfig::from_json_str(
        r#"{
            "transforms": [
                { "kind": "RandomRotate", "prob": 0.7 },
                { "kind": "RandomEnlarge" },
                { "kind": "RandomColor", "prob": 1.0 },
                { "kind": "RandomStrip", "prob": 1.0, "strip_rate": 0.1 },
                { "kind": "ExchangeTime" }
            ]
        }"#,
    )?;
    let compose = Compose::from_config(&config)?;
    let images = || -> Vec<ImageSource> {
        vec![textured_image(3).into(), textured_image(4).into()]
    };

    seed_thread_rng(2024);
    let first = compose.apply(images(), Some(vec![textured_label().into()]))?;
    seed_thread_rng(2024);
    let second = compose.apply(images(), Some(vec![textured_label().into()]))?;
    assert_eq!(first, second);

    let mut rng = StdRng::seed_from_u64(2024);
    let third = compose.apply_with_rng(images(), Some(vec![textured_label().into()]), &mut rng)?;
    let mut rng = StdRng::seed_from_u64(2024);
    let fourth = compose.apply_with_rng(images(), Some(vec![textured_label().into()]), &mut rng)?;
    assert_eq!(third, fourth);
    Ok(())
}

#[test]
fn test_pipeline_shared_across_threads() -> anyhow::Result<()> {
    let compose = Compose::from_config(&PipelineConfig::from_json_str(
        r#"{ "transforms": [ { "kind": "RandomFlip" }, { "kind": "RandomBlur", "prob": 1.0 } ] }"#,
    )?)?;

    let handles: Vec<_> = (0..4)
        .map(|seed| {
            let compose = compose.clone();
            std::thread::spawn(move || {
                seed_thread_rng(seed);
                compose.apply(vec![Image::from_elem((16, 16, 3), 5.0).into()], None)
            })
        })
        .collect();
    for handle in handles {
        let out = handle.join().expect("worker panicked")?;
        assert_eq!(out.images[0].dim(), (16, 16, 3));
    }
    Ok(())
}

#[test]
fn test_samples_augmented_on_rayon_pool() -> anyhow::Result<()> {
    use rayon::prelude::*;

    init_logging();
    let compose = Compose::from_config(&PipelineConfig::from_json_str(
        r#"{ "transforms": [ { "kind": "RandomBlur", "prob": 1.0 }, { "kind": "RandomColor", "prob": 1.0 } ] }"#,
    )?)?;
    let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build()?;

    // Blur filters bands on the same pool, so workers steal other samples
    // while their generator is lent out
    let results: Vec<_> = pool.install(|| {
        (0..200)
            .into_par_iter()
            .map(|i| {
                let images: Vec<ImageSource> = (0..4)
                    .map(|t| Image::from_elem((64, 64, 3), (i + t) as f32).into())
                    .collect();
                compose.apply(images, None)
            })
            .collect()
    });

    assert_eq!(results.len(), 200);
    for out in results {
        let out = out?;
        assert_eq!(out.images.len(), 4);
        assert_eq!(out.images[0].dim(), (64, 64, 3));
    }
    Ok(())
}

#[test]
fn test_files_are_decoded_and_labels_clipped() -> anyhow::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;

    let t1 = dir.path().join("t1.png");
    let t2 = dir.path().join("t2.png");
    let mask = dir.path().join("mask.png");
    RgbImage::from_pixel(8, 6, Rgb([10, 20, 30])).save(&t1)?;
    RgbImage::from_pixel(8, 6, Rgb([40, 50, 60])).save(&t2)?;
    let mut change = GrayImage::new(8, 6);
    change.put_pixel(0, 0, Luma([255]));
    change.save(&mask)?;

    let compose = Compose::new(Vec::new(), DataFormat::Hwc, 2)?;
    let out = compose.apply(
        vec![t1.into(), t2.into()],
        Some(vec![mask.into()]),
    )?;
    assert_eq!(out.images[0].dim(), (6, 8, 3));
    assert_eq!(out.images[1][[5, 7, 2]], 60.0);

    let labels = out.labels.expect("labels were supplied");
    assert_eq!(labels[0].dim(), (6, 8));
    assert_eq!(labels[0][[0, 0]], 1);
    assert_eq!(labels[0][[1, 1]], 0);
    Ok(())
}

#[test]
fn test_mismatched_extents_are_rejected() -> anyhow::Result<()> {
    let transforms: Vec<Box<dyn Transform>> =
        vec![Box::new(Resize::new(TargetSize::Square(32), Interpolation::Linear)?)];
    let compose = Compose::new(transforms, DataFormat::Hwc, 2)?;

    let err = compose
        .apply(
            vec![Image::zeros((64, 64, 3)).into(), Image::zeros((64, 48, 3)).into()],
            None,
        )
        .unwrap_err();
    assert!(matches!(err, TransformError::Shape { operator: "Resize", .. }));

    let err = compose
        .apply(
            vec![Image::zeros((64, 64, 3)).into()],
            Some(vec![Label::zeros((32, 32)).into()]),
        )
        .unwrap_err();
    assert!(matches!(err, TransformError::Shape { .. }));
    Ok(())
}

#[test]
fn test_non_3d_dynamic_array_is_rejected() -> anyhow::Result<()> {
    let compose = Compose::new(Vec::new(), DataFormat::Hwc, 2)?;
    let volume = ArrayD::<f32>::zeros(IxDyn(&[2, 4, 4, 3]));
    let err = compose
        .apply(vec![ImageSource::Dynamic(volume)], None)
        .unwrap_err();
    assert!(matches!(err, TransformError::Shape { .. }));
    assert!(err.to_string().contains("3-dimensional"));
    Ok(())
}

#[test]
fn test_unknown_data_format_in_config() {
    let config = PipelineConfig {
        data_format: "NCHW".to_string(),
        ..PipelineConfig::default()
    };
    assert!(matches!(
        Compose::from_config(&config),
        Err(TransformError::Configuration { operator: "Compose", .. })
    ));
}
