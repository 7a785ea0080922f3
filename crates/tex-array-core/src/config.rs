use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::format::PixelFormat;

/// Allowed layer edge lengths. `None` is the unset sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Resolution {
    #[default]
    None,
    Px8,
    Px16,
    Px32,
    Px64,
    Px128,
    Px256,
    Px512,
    Px1024,
    Px2048,
}

impl Resolution {
    /// Every selectable resolution, smallest first.
    pub const ALL: [Resolution; 9] = [
        Self::Px8,
        Self::Px16,
        Self::Px32,
        Self::Px64,
        Self::Px128,
        Self::Px256,
        Self::Px512,
        Self::Px1024,
        Self::Px2048,
    ];

    /// Edge length in pixels; 0 when unset.
    pub fn pixels(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Px8 => 8,
            Self::Px16 => 16,
            Self::Px32 => 32,
            Self::Px64 => 64,
            Self::Px128 => 128,
            Self::Px256 => 256,
            Self::Px512 => 512,
            Self::Px1024 => 1024,
            Self::Px2048 => 2048,
        }
    }

    pub fn from_pixels(px: u32) -> Option<Self> {
        match px {
            0 => Some(Self::None),
            _ => Self::ALL.into_iter().find(|r| r.pixels() == px),
        }
    }

    pub fn is_set(self) -> bool {
        self != Self::None
    }
}

impl TryFrom<u32> for Resolution {
    type Error = String;
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Self::from_pixels(v).ok_or_else(|| format!("unsupported resolution: {v}"))
    }
}

impl From<Resolution> for u32 {
    fn from(r: Resolution) -> u32 {
        r.pixels()
    }
}

impl FromStr for Resolution {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "none" {
            return Ok(Self::None);
        }
        let digits = s.strip_prefix("px").unwrap_or(&s);
        digits
            .parse::<u32>()
            .ok()
            .and_then(Self::from_pixels)
            .ok_or(())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            r => write!(f, "{}", r.pixels()),
        }
    }
}

/// Number of layers in the array (1..=8). `None` is the unset sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ArraySize {
    #[default]
    None,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

impl ArraySize {
    pub const MAX: usize = 8;

    pub fn layers(self) -> usize {
        match self {
            Self::None => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }

    pub fn from_layers(n: usize) -> Option<Self> {
        Some(match n {
            0 => Self::None,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Four,
            5 => Self::Five,
            6 => Self::Six,
            7 => Self::Seven,
            8 => Self::Eight,
            _ => return None,
        })
    }

    pub fn is_set(self) -> bool {
        self != Self::None
    }
}

impl TryFrom<u32> for ArraySize {
    type Error = String;
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Self::from_layers(v as usize).ok_or_else(|| format!("unsupported array size: {v}"))
    }
}

impl From<ArraySize> for u32 {
    fn from(a: ArraySize) -> u32 {
        a.layers() as u32
    }
}

impl FromStr for ArraySize {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "none" {
            return Ok(Self::None);
        }
        s.parse::<usize>()
            .ok()
            .and_then(Self::from_layers)
            .ok_or(())
    }
}

impl fmt::Display for ArraySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            a => write!(f, "{}", a.layers()),
        }
    }
}

/// Parameters for one texture-array pack.
/// Key notes:
///   - `same_xy_resolution` selects uniform mode, where only `x_resolution` is consulted
///   - every scalar must be set (non-`None`) before a pack may run; see `validate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackConfig {
    /// Layer width (and height in uniform mode).
    #[serde(default)]
    pub x_resolution: Resolution,
    /// Layer height in independent mode; ignored in uniform mode.
    #[serde(default)]
    pub y_resolution: Resolution,
    /// Uniform mode: use `x_resolution` for both axes.
    #[serde(default = "default_same_xy")]
    pub same_xy_resolution: bool,
    /// Number of layers.
    #[serde(default)]
    pub array_size: ArraySize,
    /// Storage format for every layer.
    #[serde(default)]
    pub format: PixelFormat,
    /// Build a full box-filtered mip chain for every layer.
    #[serde(default)]
    pub generate_mipmaps: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            x_resolution: Resolution::None,
            y_resolution: Resolution::None,
            same_xy_resolution: default_same_xy(),
            array_size: ArraySize::None,
            format: PixelFormat::None,
            generate_mipmaps: false,
        }
    }
}

fn default_same_xy() -> bool {
    true
}

impl PackConfig {
    /// Create a fluent builder for `PackConfig`.
    pub fn builder() -> PackConfigBuilder {
        PackConfigBuilder::new()
    }

    /// Effective (width, height) of the resolution selection, 0 for unset axes.
    pub fn resolution_pixels(&self) -> (u32, u32) {
        let x = self.x_resolution.pixels();
        if self.same_xy_resolution {
            (x, x)
        } else {
            (x, self.y_resolution.pixels())
        }
    }

    /// Target layer dimensions, or `None` while the resolution is incomplete.
    pub fn target_dims(&self) -> Option<(u32, u32)> {
        match self.resolution_pixels() {
            (0, _) | (_, 0) => None,
            dims => Some(dims),
        }
    }

    pub fn layer_count(&self) -> usize {
        self.array_size.layers()
    }
}

/// Builder for `PackConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackConfigBuilder {
    cfg: PackConfig,
}

impl PackConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackConfig::default(),
        }
    }
    /// Uniform mode: both axes use `r`.
    pub fn with_resolution(mut self, r: Resolution) -> Self {
        self.cfg.same_xy_resolution = true;
        self.cfg.x_resolution = r;
        self
    }
    /// Independent mode with separate width and height.
    pub fn with_resolutions(mut self, x: Resolution, y: Resolution) -> Self {
        self.cfg.same_xy_resolution = false;
        self.cfg.x_resolution = x;
        self.cfg.y_resolution = y;
        self
    }
    pub fn array_size(mut self, v: ArraySize) -> Self {
        self.cfg.array_size = v;
        self
    }
    pub fn format(mut self, v: PixelFormat) -> Self {
        self.cfg.format = v;
        self
    }
    pub fn mipmaps(mut self, v: bool) -> Self {
        self.cfg.generate_mipmaps = v;
        self
    }
    pub fn build(self) -> PackConfig {
        self.cfg
    }
}
