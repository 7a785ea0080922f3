use image::DynamicImage;
use std::borrow::Borrow;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, trace};

use crate::config::PackConfig;
use crate::error::{Result, TexArrayError};
use crate::mipmap::generate_mip_chain;
use crate::model::{ArrayLayer, MipLevel, SourceImage, TextureArray};
use crate::persist::AssetSink;
use crate::resample::TargetPool;
use crate::validate::{ValidationIssue, validate};

/// Lifecycle of one pack run. A new run always starts from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackerState {
    Idle,
    Validating,
    Packing,
    Finalizing,
    Persisted,
    Error,
}

/// Runs validate → pack → finalize (→ persist) for one config at a time.
#[derive(Debug)]
pub struct ArrayPacker {
    state: PackerState,
    targets: TargetPool,
}

impl Default for ArrayPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayPacker {
    pub fn new() -> Self {
        Self::with_targets(TargetPool::new())
    }

    /// Packer that leases scratch targets from `targets`.
    pub fn with_targets(targets: TargetPool) -> Self {
        Self {
            state: PackerState::Idle,
            targets,
        }
    }

    pub fn state(&self) -> PackerState {
        self.state
    }

    pub fn targets(&self) -> &TargetPool {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut TargetPool {
        &mut self.targets
    }

    #[instrument(skip_all)]
    /// Packs `slots` into a finalized array. Returns to `Idle` on success and
    /// stays in `Error` on failure until the next call.
    ///
    /// Layer `i` is a verbatim copy of `slots[i]` when its dimensions already match
    /// the target, otherwise a bilinear resample of it.
    pub fn pack<S: Borrow<SourceImage>>(
        &mut self,
        config: &PackConfig,
        slots: &[Option<S>],
    ) -> Result<TextureArray> {
        let result = self.run(config, slots);
        self.set_state(match &result {
            Ok(_) => PackerState::Idle,
            Err(_) => PackerState::Error,
        });
        result
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    /// `pack`, then hand the finalized array to `sink`.
    pub fn pack_and_persist<S: Borrow<SourceImage>>(
        &mut self,
        config: &PackConfig,
        slots: &[Option<S>],
        sink: &dyn AssetSink,
        path: &Path,
    ) -> Result<TextureArray> {
        let result = self
            .run(config, slots)
            .and_then(|array| sink.persist(&array, path).map(|()| array));
        self.set_state(match &result {
            Ok(_) => PackerState::Persisted,
            Err(_) => PackerState::Error,
        });
        result
    }

    fn run<S: Borrow<SourceImage>>(
        &mut self,
        config: &PackConfig,
        slots: &[Option<S>],
    ) -> Result<TextureArray> {
        let start = Instant::now();
        self.set_state(PackerState::Idle);

        self.set_state(PackerState::Validating);
        let report = validate(config, slots);
        if !report.is_ready() {
            return Err(TexArrayError::IncompletePack(report));
        }
        let Some((width, height)) = config.target_dims() else {
            return Err(TexArrayError::IncompletePack(report));
        };

        self.set_state(PackerState::Packing);
        let working = pack_layers(&mut self.targets, config, width, height, slots)?;

        self.set_state(PackerState::Finalizing);
        let array = finalize(config, width, height, working)?;
        info!(
            layers = array.layer_count(),
            width,
            height,
            format = %config.format,
            mip_levels = array.mip_level_count(),
            bytes = array.byte_size(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "texture array finalized"
        );
        Ok(array)
    }

    fn set_state(&mut self, next: PackerState) {
        trace!(from = ?self.state, to = ?next, "packer state");
        self.state = next;
    }
}

/// Packs a fully populated list of images with a fresh packer.
pub fn pack_array(config: &PackConfig, images: &[SourceImage]) -> Result<TextureArray> {
    let slots: Vec<Option<&SourceImage>> = images.iter().map(Some).collect();
    ArrayPacker::new().pack(config, &slots)
}

/// Brings every source to the target size in the format's working precision.
/// The scratch target is leased only when some layer needs a resample and is
/// released before returning, including on error.
fn pack_layers<S: Borrow<SourceImage>>(
    targets: &mut TargetPool,
    config: &PackConfig,
    width: u32,
    height: u32,
    slots: &[Option<S>],
) -> Result<Vec<DynamicImage>> {
    let format = config.format;
    let needs_resample = slots
        .iter()
        .flatten()
        .any(|s| as_source(s).dimensions() != (width, height));
    let mut scratch = if needs_resample {
        Some(targets.acquire(width, height))
    } else {
        None
    };

    let mut layers = Vec::with_capacity(slots.len());
    for (index, slot) in slots.iter().enumerate() {
        let src = slot
            .as_ref()
            .map(as_source)
            .ok_or(TexArrayError::Validation(ValidationIssue::MissingSource { index }))?;
        let working = match scratch.as_mut() {
            Some(target) if src.dimensions() != (width, height) => {
                debug!(
                    layer = index,
                    key = %src.key,
                    from = ?src.dimensions(),
                    to = ?(width, height),
                    "resample layer"
                );
                format.to_working(&target.blit(index, &src.image)?)
            }
            _ => {
                debug!(layer = index, key = %src.key, "copy layer");
                format.to_working(&src.image)
            }
        };
        layers.push(working);
    }
    drop(scratch);
    Ok(layers)
}

fn as_source<S: Borrow<SourceImage>>(s: &S) -> &SourceImage {
    <S as Borrow<SourceImage>>::borrow(s)
}

fn finalize(
    config: &PackConfig,
    width: u32,
    height: u32,
    working: Vec<DynamicImage>,
) -> Result<TextureArray> {
    let format = config.format;
    let expected = format.image_size(width, height);
    let mut layers = Vec::with_capacity(working.len());
    for (index, img) in working.iter().enumerate() {
        let mips = if config.generate_mipmaps {
            generate_mip_chain(img, format)
        } else {
            vec![MipLevel {
                width: img.width(),
                height: img.height(),
                data: format.encode(img),
            }]
        };
        if mips[0].data.len() != expected {
            return Err(TexArrayError::Resample {
                layer: index,
                reason: format!(
                    "layer holds {} bytes, expected {}",
                    mips[0].data.len(),
                    expected
                ),
            });
        }
        layers.push(ArrayLayer { mips });
    }
    Ok(TextureArray::from_layers(
        width,
        height,
        format,
        config.generate_mipmaps,
        layers,
    ))
}
