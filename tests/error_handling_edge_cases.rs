//! Error handling and edge case testing
//!
//! Failures must surface as typed errors, happen before the segmentation
//! call where possible, and never leave partial outputs behind.

mod common;

use common::{file_count, quick_config, write_inputs, EllipseBackend, FailingBackend};
use scene_composite::{
    composite_files, segment_subject, AlphaMatteBackend, CompositeConfig, CompositeError,
    CompositePipeline, MaskFileBackend,
};
use std::sync::atomic::Ordering;
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_inputs_fail_before_segmentation() {
    let temp = TempDir::new().unwrap();
    let (subject, background) = write_inputs(temp.path(), (40, 40), (80, 60));
    let missing = temp.path().join("nowhere.jpg");
    let output_dir = temp.path().join("out");

    for (s, b) in [(&missing, &background), (&subject, &missing)] {
        let backend = EllipseBackend::new();
        let calls = backend.call_counter();
        let pipeline = CompositePipeline::new(quick_config(&output_dir), Box::new(backend)).unwrap();

        let err = pipeline.run_and_save(s, b).await.unwrap_err();
        assert!(matches!(err, CompositeError::MissingInputFile(ref p) if p == &missing));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
    assert!(!output_dir.exists());
}

#[tokio::test]
async fn test_unreadable_inputs_fail_before_segmentation() {
    let temp = TempDir::new().unwrap();
    let (subject, background) = write_inputs(temp.path(), (40, 40), (80, 60));
    let corrupt = temp.path().join("corrupt.jpg");
    std::fs::write(&corrupt, b"\xFF\xD8\xFF truncated jpeg").unwrap();

    for (s, b) in [(&corrupt, &background), (&subject, &corrupt)] {
        let backend = EllipseBackend::new();
        let calls = backend.call_counter();
        let pipeline =
            CompositePipeline::new(quick_config(&temp.path().join("out")), Box::new(backend)).unwrap();

        let err = pipeline.run(s, b).await.unwrap_err();
        assert!(matches!(err, CompositeError::UnreadableImage { .. }), "got {err}");
        assert!(err.to_string().contains("corrupt.jpg"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_segmentation_failure_writes_no_outputs() {
    let temp = TempDir::new().unwrap();
    let (subject, background) = write_inputs(temp.path(), (40, 40), (80, 60));
    let output_dir = temp.path().join("out");

    let backend = FailingBackend::new();
    let calls = backend.call_counter();
    let err = composite_files(&subject, &background, quick_config(&output_dir), Box::new(backend))
        .await
        .unwrap_err();

    assert!(matches!(err, CompositeError::Segmentation(_)));
    assert!(err.to_string().contains("matting service unavailable"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(file_count(&output_dir), 0);
}

#[tokio::test]
async fn test_invalid_parameters_fail_before_segmentation() {
    let temp = TempDir::new().unwrap();
    let (subject, background) = write_inputs(temp.path(), (40, 40), (80, 60));

    let mutations: [fn(&mut CompositeConfig); 10] = [
        |c| c.placement.scale = 0.0,
        |c| c.placement.scale = -1.5,
        |c| c.shadow.blur_kernel = 90,
        |c| c.shadow.opacity = 1.2,
        |c| c.light_direction.dx = 1.5,
        |c| {
            c.light_direction.dx = 1.0;
            c.light_direction.dy = 1.0;
        },
        |c| c.harmonization.mean_shift_gain = 0.0,
        |c| c.grain.std_dev = -0.1,
        |c| c.output.jpeg_quality = 101,
        |c| c.output.final_name = "final.gif".to_string(),
    ];

    for mutate in mutations {
        let mut config = quick_config(&temp.path().join("out"));
        mutate(&mut config);

        let backend = EllipseBackend::new();
        let calls = backend.call_counter();
        let err = composite_files(&subject, &background, config, Box::new(backend))
            .await
            .unwrap_err();
        assert!(err.is_invalid_parameter(), "got {err}");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_pre_cut_subject_without_alpha_is_segmentation_error() {
    let temp = TempDir::new().unwrap();
    let (subject, background) = write_inputs(temp.path(), (40, 40), (80, 60));

    let err = composite_files(
        &subject,
        &background,
        quick_config(&temp.path().join("out")),
        Box::new(AlphaMatteBackend::new()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CompositeError::Segmentation(_)));
}

#[tokio::test]
async fn test_mask_file_size_mismatch_is_dimension_error() {
    let temp = TempDir::new().unwrap();
    let (subject, _) = write_inputs(temp.path(), (40, 40), (80, 60));
    let mask_path = temp.path().join("mask.png");
    image::GrayImage::new(39, 40).save(&mask_path).unwrap();

    let bytes = std::fs::read(&subject).unwrap();
    let err = segment_subject(&MaskFileBackend::new(&mask_path), &bytes)
        .await
        .unwrap_err();
    assert!(matches!(err, CompositeError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn test_subject_off_canvas_completes_with_warning() {
    let temp = TempDir::new().unwrap();
    let (subject, background) = write_inputs(temp.path(), (40, 40), (80, 60));

    let mut config = quick_config(&temp.path().join("out"));
    config.placement.x = -500;
    config.grain.std_dev = 0.0;

    let pipeline = CompositePipeline::new(config, Box::new(EllipseBackend::new())).unwrap();
    let result = pipeline.run(&subject, &background).await.unwrap();

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.image, image::open(&background).unwrap().to_rgb8());
    assert_eq!(result.shadow.max_alpha(), 0.0);
}

#[test]
fn test_config_file_errors() {
    let temp = TempDir::new().unwrap();

    let malformed = temp.path().join("malformed.json");
    std::fs::write(&malformed, "{ placement: ").unwrap();
    assert!(matches!(
        CompositeConfig::from_json_file(&malformed),
        Err(CompositeError::Serialization(_))
    ));

    let out_of_range = temp.path().join("range.json");
    std::fs::write(&out_of_range, r#"{ "shadow": { "blur_kernel": 4, "opacity": 0.5 } }"#).unwrap();
    assert!(CompositeConfig::from_json_file(&out_of_range)
        .unwrap_err()
        .is_invalid_parameter());

    assert!(matches!(
        CompositeConfig::from_json_file(temp.path().join("absent.json")),
        Err(CompositeError::Io(_))
    ));
}

#[test]
fn test_unknown_strategy_in_config_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("strategy.json");
    std::fs::write(&path, r#"{ "harmonization": { "strategy": "histogram-match" } }"#).unwrap();
    assert!(matches!(
        CompositeConfig::from_json_file(&path),
        Err(CompositeError::Serialization(_))
    ));
}
