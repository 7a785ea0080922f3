//! Texture-array asset container.
//!
//! Layout:
//! ```text
//! magic      8 bytes  "TEXARRAY"
//! version    u32 LE
//! header_len u32 LE
//! header     JSON `ArrayMeta`
//! payload    layer 0 mip 0, layer 0 mip 1, ..., layer N-1 mip M-1
//! ```

use serde_json::{Value, json};
use std::io::Write;
use std::path::Path;

use crate::config::{ArraySize, Resolution};
use crate::error::{Result, TexArrayError};
use crate::mipmap::{mip_level_count, next_mip_dims};
use crate::model::{ArrayLayer, ArrayMeta, MipLevel, TextureArray};

pub const ASSET_MAGIC: &[u8; 8] = b"TEXARRAY";
pub const ASSET_VERSION: u32 = 1;

/// Serialize `array` into the asset container.
pub fn encode_asset(array: &TextureArray) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(array.byte_size() + 256);
    write_asset(array, &mut out)?;
    Ok(out)
}

pub fn write_asset<W: Write>(array: &TextureArray, w: &mut W) -> Result<()> {
    let header =
        serde_json::to_vec(&array.meta()).map_err(|e| TexArrayError::Encode(e.to_string()))?;
    let header_len = u32::try_from(header.len())
        .map_err(|_| TexArrayError::Encode("asset header too large".into()))?;
    w.write_all(ASSET_MAGIC)?;
    w.write_all(&ASSET_VERSION.to_le_bytes())?;
    w.write_all(&header_len.to_le_bytes())?;
    w.write_all(&header)?;
    for layer in array.layers() {
        for mip in &layer.mips {
            w.write_all(&mip.data)?;
        }
    }
    Ok(())
}

/// Parse an asset container produced by `encode_asset`.
pub fn decode_asset(bytes: &[u8]) -> Result<TextureArray> {
    let invalid = |msg: &str| TexArrayError::InvalidAsset(msg.to_string());
    let rest = bytes
        .strip_prefix(ASSET_MAGIC.as_slice())
        .ok_or_else(|| invalid("bad magic"))?;
    let (version, rest) = read_u32(rest).ok_or_else(|| invalid("truncated header"))?;
    if version != ASSET_VERSION {
        return Err(TexArrayError::InvalidAsset(format!(
            "unsupported version {version}"
        )));
    }
    let (header_len, rest) = read_u32(rest).ok_or_else(|| invalid("truncated header"))?;
    let header_len = header_len as usize;
    if rest.len() < header_len {
        return Err(invalid("truncated header"));
    }
    let (header, mut payload) = rest.split_at(header_len);
    let meta: ArrayMeta =
        serde_json::from_slice(header).map_err(|e| TexArrayError::InvalidAsset(e.to_string()))?;

    if !meta.format.is_set() {
        return Err(invalid("format is not set"));
    }
    // same bounds `pack` enforces: 1..=8 layers at an enumerated resolution
    if !ArraySize::from_layers(meta.layers).is_some_and(ArraySize::is_set) {
        return Err(TexArrayError::InvalidAsset(format!(
            "layer count {} outside 1..={}",
            meta.layers,
            ArraySize::MAX
        )));
    }
    for px in [meta.width, meta.height] {
        if !Resolution::from_pixels(px).is_some_and(Resolution::is_set) {
            return Err(TexArrayError::InvalidAsset(format!(
                "unsupported resolution {}x{}",
                meta.width, meta.height
            )));
        }
    }
    let expected_levels = if meta.mipmaps {
        mip_level_count(meta.width, meta.height)
    } else {
        1
    };
    if meta.mip_levels != expected_levels {
        return Err(TexArrayError::InvalidAsset(format!(
            "mip level count {} does not match {}x{} (expected {})",
            meta.mip_levels, meta.width, meta.height, expected_levels
        )));
    }

    let mut layers = Vec::with_capacity(meta.layers);
    for _ in 0..meta.layers {
        let mut mips = Vec::with_capacity(expected_levels);
        let (mut w, mut h) = (meta.width, meta.height);
        for _ in 0..expected_levels {
            let size = meta.format.image_size(w, h);
            if payload.len() < size {
                return Err(invalid("truncated payload"));
            }
            let (data, tail) = payload.split_at(size);
            mips.push(MipLevel {
                width: w,
                height: h,
                data: data.to_vec(),
            });
            payload = tail;
            (w, h) = next_mip_dims(w, h);
        }
        layers.push(ArrayLayer { mips });
    }
    if !payload.is_empty() {
        return Err(TexArrayError::InvalidAsset(format!(
            "{} trailing bytes after payload",
            payload.len()
        )));
    }
    Ok(TextureArray::from_layers(
        meta.width,
        meta.height,
        meta.format,
        meta.mipmaps,
        layers,
    ))
}

pub fn read_asset(path: &Path) -> Result<TextureArray> {
    let bytes = std::fs::read(path)?;
    decode_asset(&bytes)
}

/// Sidecar metadata: `{ meta, layers: [{ index, mips: [{ level, w, h, bytes }] }] }`.
pub fn to_json_meta(array: &TextureArray) -> Value {
    let layers = array
        .layers()
        .iter()
        .enumerate()
        .map(|(index, layer)| {
            let mips: Vec<Value> = layer
                .mips
                .iter()
                .enumerate()
                .map(|(level, m)| {
                    json!({"level": level, "w": m.width, "h": m.height, "bytes": m.data.len()})
                })
                .collect();
            json!({"index": index, "mips": mips})
        })
        .collect::<Vec<_>>();
    json!({"meta": array.meta(), "layers": layers})
}

fn read_u32(bytes: &[u8]) -> Option<(u32, &[u8])> {
    let (head, tail) = bytes.split_first_chunk::<4>()?;
    Some((u32::from_le_bytes(*head), tail))
}
