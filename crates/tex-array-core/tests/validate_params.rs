use image::{DynamicImage, RgbaImage};
use tex_array_core::prelude::*;
use tex_array_core::{TexArrayError, ValidationIssue};

fn image(w: u32, h: u32) -> SourceImage {
    SourceImage::new(
        format!("{w}x{h}"),
        DynamicImage::ImageRgba8(RgbaImage::new(w, h)),
    )
}

fn full_slots(n: usize) -> Vec<Option<SourceImage>> {
    (0..n).map(|_| Some(image(16, 16))).collect()
}

fn ready_config() -> PackConfig {
    PackConfig::builder()
        .with_resolution(Resolution::Px16)
        .array_size(ArraySize::Three)
        .format(PixelFormat::Rgba32)
        .build()
}

#[test]
fn all_settings_and_slots_present_is_ready() {
    let report = validate(&ready_config(), &full_slots(3));
    assert!(report.is_ready());
    assert!(report.first_issue().is_none());
    assert!(report.into_result().is_ok());
}

#[test]
fn unset_format_is_never_ready() {
    let cfg = PackConfig {
        format: PixelFormat::None,
        ..ready_config()
    };
    let report = validate(&cfg, &full_slots(3));
    assert!(!report.has_format);
    assert!(report.has_resolution && report.has_array_size);
    assert!(!report.is_ready());
    assert_eq!(report.first_issue(), Some(ValidationIssue::MissingFormat));
}

#[test]
fn uniform_mode_needs_only_x_resolution() {
    let cfg = PackConfig {
        same_xy_resolution: true,
        x_resolution: Resolution::Px16,
        y_resolution: Resolution::None,
        ..ready_config()
    };
    assert!(validate(&cfg, &full_slots(3)).has_resolution);
}

#[test]
fn independent_mode_needs_both_resolutions() {
    let cfg = PackConfig::builder()
        .with_resolutions(Resolution::Px16, Resolution::None)
        .array_size(ArraySize::Three)
        .format(PixelFormat::Rgba32)
        .build();
    let report = validate(&cfg, &full_slots(3));
    assert!(!report.has_resolution);
    assert_eq!(report.first_issue(), Some(ValidationIssue::MissingResolution));

    let cfg = PackConfig {
        y_resolution: Resolution::Px32,
        ..cfg
    };
    assert!(validate(&cfg, &full_slots(3)).has_resolution);
}

#[test]
fn unset_array_size_is_reported() {
    let cfg = PackConfig {
        array_size: ArraySize::None,
        ..ready_config()
    };
    let report = validate(&cfg, &full_slots(0));
    assert!(!report.has_array_size);
    assert!(!report.has_textures);
    match report.into_result() {
        Err(TexArrayError::Validation(ValidationIssue::MissingArraySize)) => {}
        other => panic!("Expected MissingArraySize, got {other:?}"),
    }
}

#[test]
fn missing_slot_is_reported_by_index() {
    let mut slots = full_slots(3);
    slots[1] = None;
    let report = validate(&ready_config(), &slots);
    assert!(report.settings_ready());
    assert!(!report.has_textures);
    assert_eq!(report.missing_slots, vec![1]);
    assert_eq!(
        report.first_issue(),
        Some(ValidationIssue::MissingSource { index: 1 })
    );
}

#[test]
fn wrong_slot_count_is_not_ready() {
    let report = validate(&ready_config(), &full_slots(2));
    assert!(!report.is_ready());
    assert_eq!(
        report.first_issue(),
        Some(ValidationIssue::SlotCountMismatch {
            expected: 3,
            actual: 2
        })
    );
}

#[test]
fn completeness_is_not_evaluated_before_settings() {
    let cfg = PackConfig {
        x_resolution: Resolution::None,
        ..ready_config()
    };
    let slots: Vec<Option<SourceImage>> = vec![None, None, None];
    let report = validate(&cfg, &slots);
    assert!(!report.has_textures);
    assert!(report.missing_slots.is_empty());
}

#[test]
fn validate_leaves_inputs_untouched() {
    let cfg = ready_config();
    let slots = full_slots(3);
    let before = cfg.clone();
    let _ = validate(&cfg, &slots);
    assert_eq!(cfg, before);
    assert!(slots.iter().all(Option::is_some));
}
