use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Uncompressed layer storage formats. `None` is the zero/unset value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    None,
    /// Alpha only, 8 bits.
    Alpha8,
    /// Red only, 8 bits.
    R8,
    /// Red only, 16 bits.
    R16,
    /// Red + green, 8 bits each.
    Rg16,
    /// Red, green, blue, 8 bits each.
    Rgb24,
    Rgba32,
    Argb32,
    Bgra32,
    /// RGBA, 16 bits per channel.
    Rgba64,
    /// Red only, 32-bit float.
    RFloat,
    /// RGBA, 32-bit float per channel.
    RgbaFloat,
}

/// Channel precision a format is resampled and mip-mapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    U8,
    U16,
    F32,
}

impl Precision {
    pub fn bytes_per_channel(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 11] = [
        Self::Alpha8,
        Self::R8,
        Self::R16,
        Self::Rg16,
        Self::Rgb24,
        Self::Rgba32,
        Self::Argb32,
        Self::Bgra32,
        Self::Rgba64,
        Self::RFloat,
        Self::RgbaFloat,
    ];

    pub fn is_set(self) -> bool {
        self != Self::None
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Alpha8 => "alpha8",
            Self::R8 => "r8",
            Self::R16 => "r16",
            Self::Rg16 => "rg16",
            Self::Rgb24 => "rgb24",
            Self::Rgba32 => "rgba32",
            Self::Argb32 => "argb32",
            Self::Bgra32 => "bgra32",
            Self::Rgba64 => "rgba64",
            Self::RFloat => "rfloat",
            Self::RgbaFloat => "rgbafloat",
        }
    }

    pub fn precision(self) -> Precision {
        match self {
            Self::R16 | Self::Rgba64 => Precision::U16,
            Self::RFloat | Self::RgbaFloat => Precision::F32,
            _ => Precision::U8,
        }
    }

    /// Stored channels as indices into RGBA, in storage order.
    pub fn channel_order(self) -> &'static [usize] {
        match self {
            Self::None => &[],
            Self::Alpha8 => &[3],
            Self::R8 | Self::R16 | Self::RFloat => &[0],
            Self::Rg16 => &[0, 1],
            Self::Rgb24 => &[0, 1, 2],
            Self::Rgba32 | Self::Rgba64 | Self::RgbaFloat => &[0, 1, 2, 3],
            Self::Argb32 => &[3, 0, 1, 2],
            Self::Bgra32 => &[2, 1, 0, 3],
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        self.channel_order().len() * self.precision().bytes_per_channel()
    }

    /// Size in bytes of one `width x height` image in this format (saturates on overflow).
    pub fn image_size(self, width: u32, height: u32) -> usize {
        (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(self.bytes_per_pixel())
    }

    /// Converts `img` into the RGBA buffer type this format is processed in.
    pub fn to_working(self, img: &DynamicImage) -> DynamicImage {
        match self.precision() {
            Precision::U8 => DynamicImage::ImageRgba8(img.to_rgba8()),
            Precision::U16 => DynamicImage::ImageRgba16(img.to_rgba16()),
            Precision::F32 => DynamicImage::ImageRgba32F(img.to_rgba32f()),
        }
    }

    /// Encodes a working image into tightly packed storage bytes.
    pub fn encode(self, working: &DynamicImage) -> Vec<u8> {
        let order = self.channel_order();
        let (w, h) = (working.width(), working.height());
        let mut out = Vec::with_capacity(self.image_size(w, h));
        match self.precision() {
            Precision::U8 => {
                let buf = working.to_rgba8();
                for px in buf.as_raw().chunks_exact(4) {
                    out.extend(order.iter().map(|&c| px[c]));
                }
            }
            Precision::U16 => {
                let buf = working.to_rgba16();
                for px in buf.as_raw().chunks_exact(4) {
                    for &c in order {
                        out.extend_from_slice(&px[c].to_le_bytes());
                    }
                }
            }
            Precision::F32 => {
                let buf = working.to_rgba32f();
                for px in buf.as_raw().chunks_exact(4) {
                    for &c in order {
                        out.extend_from_slice(&px[c].to_le_bytes());
                    }
                }
            }
        }
        out
    }

    /// Decodes storage bytes into RGBA8 for previews. Missing channels read as
    /// 0 (color) or 255 (alpha). Returns `None` when `data` has the wrong size.
    pub fn decode_rgba8(self, data: &[u8], width: u32, height: u32) -> Option<RgbaImage> {
        if !self.is_set() || data.len() != self.image_size(width, height) {
            return None;
        }
        let order = self.channel_order();
        let bpc = self.precision().bytes_per_channel();
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for px in data.chunks_exact(self.bytes_per_pixel()) {
            let mut out = [0u8, 0, 0, 255];
            for (slot, &c) in order.iter().enumerate() {
                let raw = &px[slot * bpc..(slot + 1) * bpc];
                out[c] = match self.precision() {
                    Precision::U8 => raw[0],
                    Precision::U16 => (u16::from_le_bytes([raw[0], raw[1]]) >> 8) as u8,
                    Precision::F32 => {
                        let v = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                        (v.clamp(0.0, 1.0) * 255.0).round() as u8
                    }
                };
            }
            rgba.extend_from_slice(&out);
        }
        RgbaImage::from_raw(width, height, rgba)
    }
}

impl FromStr for PixelFormat {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "alpha8" | "a8" => Ok(Self::Alpha8),
            "r8" => Ok(Self::R8),
            "r16" => Ok(Self::R16),
            "rg16" => Ok(Self::Rg16),
            "rgb24" => Ok(Self::Rgb24),
            "rgba32" => Ok(Self::Rgba32),
            "argb32" => Ok(Self::Argb32),
            "bgra32" => Ok(Self::Bgra32),
            "rgba64" => Ok(Self::Rgba64),
            "rfloat" | "r32f" => Ok(Self::RFloat),
            "rgbafloat" | "rgba32f" => Ok(Self::RgbaFloat),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
