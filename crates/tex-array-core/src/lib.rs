//! Core library for packing individually authored images into a texture array.
//!
//! - Validation: `validate` checks resolution, array size, format and that every layer slot is filled
//! - Pipeline: `ArrayPacker::pack` copies or resamples each source into its layer, then builds mip chains
//! - Persistence: `FileSink` writes the asset container atomically below an asset root
//!
//! Quick example:
//! ```ignore
//! use image::ImageReader;
//! use tex_array_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let a = ImageReader::open("grass.png")?.decode()?;
//! let b = ImageReader::open("rock.png")?.decode()?;
//! let cfg = PackConfig::builder()
//!     .with_resolution(Resolution::Px256)
//!     .array_size(ArraySize::Two)
//!     .format(PixelFormat::Rgba32)
//!     .mipmaps(true)
//!     .build();
//! let slots = vec![Some(SourceImage::new("grass", a)), Some(SourceImage::new("rock", b))];
//! let sink = FileSink::new("Assets");
//! let array = ArrayPacker::new().pack_and_persist(&cfg, &slots, &sink, "terrain.texarray".as_ref())?;
//! println!("layers: {}", array.layer_count());
//! # Ok(()) }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod mipmap;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod resample;
pub mod validate;

pub use config::*;
pub use error::*;
pub use export::*;
pub use format::*;
pub use model::*;
pub use persist::*;
pub use pipeline::*;
pub use validate::*;

/// Convenience prelude for common types and functions.
/// Importing `tex_array_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{ArraySize, PackConfig, PackConfigBuilder, Resolution};
    pub use crate::format::PixelFormat;
    pub use crate::model::{ArrayLayer, ArrayMeta, MipLevel, SourceImage, TextureArray};
    pub use crate::persist::{AssetSink, FileSink};
    pub use crate::pipeline::{ArrayPacker, PackerState, pack_array};
    pub use crate::resample::{ScratchTarget, TargetId, TargetPool};
    pub use crate::validate::{PackRequest, SourceSlots, ValidationReport, validate};
    pub use crate::{decode_asset, encode_asset, read_asset, to_json_meta};
}
