use image::{DynamicImage, ImageReader, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::format::PixelFormat;

/// In-memory source for one layer (key + decoded image).
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub key: String,
    pub image: DynamicImage,
}

impl SourceImage {
    pub fn new(key: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            key: key.into(),
            image,
        }
    }

    /// Decodes an image file, keyed by its path.
    pub fn open(path: &Path) -> Result<Self> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let key = path.to_string_lossy().replace('\\', "/");
        Ok(Self { key, image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// One level of a layer's mip chain, tightly packed in the array's format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// One layer of the array; `mips[0]` is the full-resolution image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayLayer {
    pub mips: Vec<MipLevel>,
}

impl ArrayLayer {
    pub fn base(&self) -> &MipLevel {
        &self.mips[0]
    }
}

/// A finalized texture array: `layer_count` same-sized, same-format layers.
///
/// Built once by the packer (or decoded from an asset) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureArray {
    width: u32,
    height: u32,
    format: PixelFormat,
    mipmaps: bool,
    layers: Vec<ArrayLayer>,
}

impl TextureArray {
    pub(crate) fn from_layers(
        width: u32,
        height: u32,
        format: PixelFormat,
        mipmaps: bool,
        layers: Vec<ArrayLayer>,
    ) -> Self {
        Self {
            width,
            height,
            format,
            mipmaps,
            layers,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn has_mipmaps(&self) -> bool {
        self.mipmaps
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Mip levels per layer (1 without mip-maps).
    pub fn mip_level_count(&self) -> usize {
        self.layers.first().map(|l| l.mips.len()).unwrap_or(0)
    }

    pub fn layers(&self) -> &[ArrayLayer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&ArrayLayer> {
        self.layers.get(index)
    }

    /// Full-resolution bytes of layer `index`.
    pub fn layer_pixels(&self, index: usize) -> Option<&[u8]> {
        self.layers.get(index).map(|l| l.base().data.as_slice())
    }

    pub fn mip(&self, layer: usize, level: usize) -> Option<&MipLevel> {
        self.layers.get(layer).and_then(|l| l.mips.get(level))
    }

    /// Decodes level 0 of layer `index` into RGBA8 (for previews and export).
    pub fn layer_rgba8(&self, index: usize) -> Option<RgbaImage> {
        let base = self.layers.get(index)?.base();
        self.format
            .decode_rgba8(&base.data, base.width, base.height)
    }

    /// Total payload size over all layers and levels.
    pub fn byte_size(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|l| l.mips.iter())
            .map(|m| m.data.len())
            .sum()
    }

    pub fn meta(&self) -> ArrayMeta {
        ArrayMeta {
            schema_version: "1".into(),
            app: "tex-array".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            width: self.width,
            height: self.height,
            layers: self.layers.len(),
            format: self.format,
            mipmaps: self.mipmaps,
            mip_levels: self.mip_level_count(),
            bytes_per_pixel: self.format.bytes_per_pixel(),
        }
    }
}

/// Asset-level metadata, stored as the asset header and exported as sidecar JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArrayMeta {
    /// Header schema version; current: "1".
    pub schema_version: String,
    pub app: String,
    pub version: String,
    pub width: u32,
    pub height: u32,
    pub layers: usize,
    pub format: PixelFormat,
    pub mipmaps: bool,
    pub mip_levels: usize,
    pub bytes_per_pixel: usize,
}
