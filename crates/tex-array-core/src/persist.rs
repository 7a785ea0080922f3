use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tracing::{info, warn};

use crate::error::{Result, TexArrayError};
use crate::export::{encode_asset, to_json_meta};
use crate::model::TextureArray;

/// Receives a finalized array and stores it at `path`.
pub trait AssetSink {
    fn persist(&self, array: &TextureArray, path: &Path) -> Result<()>;
}

/// Writes assets below `asset_root`. Writes are atomic: data goes to a temp
/// file next to the destination and is renamed into place, so a failed write
/// never leaves a partial asset behind. With a sidecar, a failed sidecar write
/// rolls the asset back: a previous asset at the same path is restored, a new
/// one is removed.
#[derive(Debug, Clone)]
pub struct FileSink {
    asset_root: PathBuf,
    sidecar: bool,
}

impl FileSink {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            sidecar: false,
        }
    }

    /// Also write `<asset>.json` metadata next to each asset.
    pub fn with_sidecar(mut self, v: bool) -> Self {
        self.sidecar = v;
        self
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Resolves `path` (relative paths are taken from the asset root) and rejects
    /// anything that does not name a file strictly inside the root.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let root = normalize(&self.asset_root)
            .ok_or_else(|| TexArrayError::persist(&self.asset_root, "invalid asset root"))?;
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        let dest = normalize(&joined)
            .ok_or_else(|| TexArrayError::persist(path, "path escapes the asset root"))?;
        if !dest.starts_with(&root) || dest == root {
            return Err(TexArrayError::persist(path, "path is outside the asset root"));
        }
        Ok(dest)
    }

    /// `path` relative to the asset root.
    pub fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        let dest = self.resolve(path)?;
        let root = normalize(&self.asset_root).unwrap_or_default();
        dest.strip_prefix(&root)
            .map(Path::to_path_buf)
            .map_err(|e| TexArrayError::persist(path, e))
    }
}

impl AssetSink for FileSink {
    fn persist(&self, array: &TextureArray, path: &Path) -> Result<()> {
        let dest = self.resolve(path)?;
        let parent = dest
            .parent()
            .ok_or_else(|| TexArrayError::persist(&dest, "no parent directory"))?;
        if !parent.is_dir() {
            return Err(TexArrayError::persist(
                &dest,
                format!("directory {} does not exist", parent.display()),
            ));
        }

        let asset = stage(parent, &encode_asset(array)?, &dest)?;
        let sidecar = if self.sidecar {
            let json = serde_json::to_vec_pretty(&to_json_meta(array))
                .map_err(|e| TexArrayError::Encode(e.to_string()))?;
            Some((stage(parent, &json, &dest)?, sidecar_path(&dest)))
        } else {
            None
        };

        // an existing asset is moved aside so a failed sidecar can restore it
        let backup = if sidecar.is_some() && dest.is_file() {
            let tmp = tempfile::Builder::new()
                .prefix(".texarray-backup")
                .tempfile_in(parent)
                .map_err(|e| TexArrayError::persist(&dest, e))?
                .into_temp_path();
            fs::rename(&dest, &tmp).map_err(|e| TexArrayError::persist(&dest, e))?;
            Some(tmp)
        } else {
            None
        };

        if let Err(e) = asset.persist(&dest) {
            restore(backup, &dest);
            return Err(TexArrayError::persist(&dest, e.error));
        }
        if let Some((tmp, json_path)) = sidecar {
            if let Err(e) = tmp.persist(&json_path) {
                if backup.is_some() {
                    restore(backup, &dest);
                } else if let Err(rm) = fs::remove_file(&dest) {
                    warn!(path = %dest.display(), error = %rm, "cannot remove asset after sidecar failure");
                }
                return Err(TexArrayError::persist(&json_path, e.error));
            }
        }
        info!(
            path = %dest.display(),
            layers = array.layer_count(),
            bytes = array.byte_size(),
            "texture array persisted"
        );
        Ok(())
    }
}

/// Moves a backed-up asset back to `dest`, replacing whatever is there.
fn restore(backup: Option<TempPath>, dest: &Path) {
    if let Some(b) = backup {
        if let Err(e) = b.persist(dest) {
            warn!(path = %dest.display(), error = %e.error, "cannot restore previous asset");
        }
    }
}

/// Writes `bytes` into a temp file in `dir`; the file is removed if dropped unpersisted.
fn stage(dir: &Path, bytes: &[u8], dest: &Path) -> Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| TexArrayError::persist(dest, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| TexArrayError::persist(dest, e))?;
    Ok(tmp)
}

pub fn sidecar_path(asset: &Path) -> PathBuf {
    let mut s: OsString = asset.as_os_str().to_owned();
    s.push(".json");
    PathBuf::from(s)
}

/// Lexical normalization: drops `.` and folds `..`. `None` if `..` climbs past the start.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}
