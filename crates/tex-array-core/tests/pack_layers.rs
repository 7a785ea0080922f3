use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use tex_array_core::prelude::*;
use tex_array_core::TexArrayError;

fn pattern(w: u32, h: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        Rgba([
            (x as u8).wrapping_mul(3).wrapping_add(seed),
            (y as u8).wrapping_mul(5),
            seed,
            255,
        ])
    })
}

fn src(key: &str, img: RgbaImage) -> SourceImage {
    SourceImage::new(key, DynamicImage::ImageRgba8(img))
}

fn rgba32_config(res: Resolution, size: ArraySize) -> PackConfig {
    PackConfig::builder()
        .with_resolution(res)
        .array_size(size)
        .format(PixelFormat::Rgba32)
        .build()
}

#[test]
fn mixed_sizes_copy_matching_layers_and_resample_the_rest() {
    let a = pattern(64, 64, 11);
    let b = RgbaImage::from_pixel(128, 128, Rgba([10, 20, 30, 255]));
    let c = pattern(64, 64, 97);
    let slots = vec![
        Some(src("a", a.clone())),
        Some(src("b", b)),
        Some(src("c", c.clone())),
    ];
    let cfg = rgba32_config(Resolution::Px64, ArraySize::Three);

    let mut packer = ArrayPacker::new();
    let array = packer.pack(&cfg, &slots).expect("pack");
    assert_eq!(packer.state(), PackerState::Idle);

    assert_eq!(array.layer_count(), 3);
    assert_eq!((array.width(), array.height()), (64, 64));
    assert_eq!(array.format(), PixelFormat::Rgba32);
    assert_eq!(array.mip_level_count(), 1);

    assert_eq!(array.layer_pixels(0), Some(a.as_raw().as_slice()));
    assert_eq!(array.layer_pixels(2), Some(c.as_raw().as_slice()));

    let layer1 = array.layer(1).expect("layer 1").base();
    assert_eq!((layer1.width, layer1.height), (64, 64));
    assert_eq!(layer1.data.len(), 64 * 64 * 4);
    for px in layer1.data.chunks_exact(4) {
        for (got, want) in px.iter().zip([10u8, 20, 30, 255]) {
            assert!(got.abs_diff(want) <= 1, "pixel {px:?}");
        }
    }
}

#[test]
fn every_layer_has_target_dimensions() {
    let sizes = [(8, 8), (300, 17), (1, 1), (64, 128)];
    let slots: Vec<Option<SourceImage>> = sizes
        .iter()
        .enumerate()
        .map(|(i, &(w, h))| Some(src(&format!("s{i}"), pattern(w, h, i as u8))))
        .collect();
    let cfg = rgba32_config(Resolution::Px32, ArraySize::Four);
    let array = ArrayPacker::new().pack(&cfg, &slots).expect("pack");
    assert_eq!(array.layer_count(), 4);
    for layer in array.layers() {
        let base = layer.base();
        assert_eq!((base.width, base.height), (32, 32));
        assert_eq!(base.data.len(), PixelFormat::Rgba32.image_size(32, 32));
    }
}

#[test]
fn independent_resolution_produces_non_square_layers() {
    let cfg = PackConfig::builder()
        .with_resolutions(Resolution::Px64, Resolution::Px16)
        .array_size(ArraySize::Two)
        .format(PixelFormat::Rgba32)
        .build();
    let images = vec![src("a", pattern(64, 16, 1)), src("b", pattern(20, 20, 2))];
    let array = pack_array(&cfg, &images).expect("pack");
    assert_eq!((array.width(), array.height()), (64, 16));
    assert_eq!(array.layer_pixels(0), Some(pattern(64, 16, 1).as_raw().as_slice()));
    let b = array.layer(1).expect("layer").base();
    assert_eq!((b.width, b.height), (64, 16));
}

#[test]
fn matching_source_is_copied_verbatim_into_narrow_format() {
    let rgb = RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8 * 7, y as u8 * 9, 42]));
    let cfg = PackConfig::builder()
        .with_resolution(Resolution::Px16)
        .array_size(ArraySize::One)
        .format(PixelFormat::Rgb24)
        .build();
    let images = vec![SourceImage::new("rgb", DynamicImage::ImageRgb8(rgb.clone()))];
    let array = pack_array(&cfg, &images).expect("pack");
    assert_eq!(array.layer_pixels(0), Some(rgb.as_raw().as_slice()));
}

#[test]
fn pack_accepts_borrowed_slots() {
    let a = src("a", pattern(8, 8, 3));
    let slots: Vec<Option<&SourceImage>> = vec![Some(&a)];
    let cfg = rgba32_config(Resolution::Px8, ArraySize::One);
    let array = ArrayPacker::new().pack(&cfg, &slots).expect("pack");
    assert_eq!(array.layer_pixels(0), Some(pattern(8, 8, 3).as_raw().as_slice()));
}

#[test]
fn incomplete_request_is_rejected_and_state_is_error() {
    let cfg = rgba32_config(Resolution::Px8, ArraySize::Two);
    let slots = vec![Some(src("a", pattern(8, 8, 0))), None];
    let mut packer = ArrayPacker::new();
    match packer.pack(&cfg, &slots) {
        Err(TexArrayError::IncompletePack(report)) => {
            assert_eq!(report.missing_slots, vec![1]);
        }
        other => panic!("Expected IncompletePack, got {other:?}"),
    }
    assert_eq!(packer.state(), PackerState::Error);

    // a later valid run starts over from Idle
    let slots = vec![Some(src("a", pattern(8, 8, 0))), Some(src("b", pattern(8, 8, 1)))];
    packer.pack(&cfg, &slots).expect("pack");
    assert_eq!(packer.state(), PackerState::Idle);
}

#[test]
fn unset_format_never_reaches_packing() {
    let cfg = PackConfig {
        format: PixelFormat::None,
        ..rgba32_config(Resolution::Px8, ArraySize::One)
    };
    let slots = vec![Some(src("a", pattern(8, 8, 0)))];
    let mut packer = ArrayPacker::new();
    assert!(matches!(
        packer.pack(&cfg, &slots),
        Err(TexArrayError::IncompletePack(_))
    ));
    assert_eq!(packer.targets().total_leases(), 0);
}

#[test]
fn float_format_keeps_full_precision_on_copy() {
    let cfg = PackConfig::builder()
        .with_resolution(Resolution::Px8)
        .array_size(ArraySize::One)
        .format(PixelFormat::RgbaFloat)
        .build();
    let img = image::Rgba32FImage::from_pixel(8, 8, Rgba([0.125, 0.5, 0.75, 1.0]));
    let images = vec![SourceImage::new("f", DynamicImage::ImageRgba32F(img))];
    let array = pack_array(&cfg, &images).expect("pack");
    let data = array.layer_pixels(0).expect("layer");
    assert_eq!(data.len(), 8 * 8 * 16);
    let first: Vec<f32> = data[..16]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    assert_eq!(first, vec![0.125, 0.5, 0.75, 1.0]);
}
