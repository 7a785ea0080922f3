use image::{DynamicImage, RgbaImage};
use tex_array_core::prelude::*;
use tex_array_core::TexArrayError;

fn src(key: &str, w: u32, h: u32) -> SourceImage {
    SourceImage::new(key, DynamicImage::ImageRgba8(RgbaImage::new(w, h)))
}

fn config(size: ArraySize) -> PackConfig {
    PackConfig::builder()
        .with_resolution(Resolution::Px8)
        .array_size(size)
        .format(PixelFormat::Rgba32)
        .build()
}

#[test]
fn lease_restores_previous_active_target() {
    let mut pool = TargetPool::new();
    let caller = pool.create_target();
    pool.set_active(Some(caller));
    {
        let target = pool.acquire(16, 16);
        assert_ne!(target.id(), caller);
        assert_eq!(target.dimensions(), (16, 16));
    }
    assert_eq!(pool.active(), Some(caller));
    assert_eq!(pool.leased(), 0);
    assert_eq!(pool.total_leases(), 1);
}

#[test]
fn blit_reads_back_target_dimensions() {
    let mut pool = TargetPool::new();
    let mut target = pool.acquire(8, 4);
    let out = target
        .blit(0, &DynamicImage::ImageRgba8(RgbaImage::new(33, 7)))
        .expect("blit");
    assert_eq!((out.width(), out.height()), (8, 4));
}

#[test]
fn no_lease_when_all_sources_match() {
    let slots = vec![Some(src("a", 8, 8)), Some(src("b", 8, 8))];
    let mut packer = ArrayPacker::new();
    packer.pack(&config(ArraySize::Two), &slots).expect("pack");
    assert_eq!(packer.targets().total_leases(), 0);
    assert_eq!(packer.targets().active(), None);
}

#[test]
fn lease_released_after_successful_resample() {
    let mut packer = ArrayPacker::new();
    let caller = packer.targets_mut().create_target();
    packer.targets_mut().set_active(Some(caller));

    let slots = vec![Some(src("a", 32, 32)), Some(src("b", 8, 8))];
    packer.pack(&config(ArraySize::Two), &slots).expect("pack");
    assert_eq!(packer.targets().active(), Some(caller));
    assert_eq!(packer.targets().leased(), 0);
    assert_eq!(packer.targets().total_leases(), 1);
}

#[test]
fn lease_released_when_resample_fails() {
    let mut packer = ArrayPacker::new();
    let caller = packer.targets_mut().create_target();
    packer.targets_mut().set_active(Some(caller));

    let slots = vec![Some(src("a", 16, 16)), Some(src("empty", 0, 0))];
    match packer.pack(&config(ArraySize::Two), &slots) {
        Err(TexArrayError::Resample { layer, .. }) => assert_eq!(layer, 1),
        other => panic!("Expected Resample error, got {other:?}"),
    }
    assert_eq!(packer.state(), PackerState::Error);
    assert_eq!(packer.targets().active(), Some(caller));
    assert_eq!(packer.targets().leased(), 0);
}
