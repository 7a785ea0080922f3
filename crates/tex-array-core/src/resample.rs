//! Scratch targets used to resample layers to the array resolution.
//!
//! A `TargetPool` tracks which target is currently active. `acquire` leases a
//! scratch target and makes it active; dropping the lease restores whatever
//! was active before, on every exit path.

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::trace;

use crate::error::{Result, TexArrayError};

/// Filter used for every resample (bilinear).
pub const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

/// Active-target state plus lease accounting.
#[derive(Debug, Default)]
pub struct TargetPool {
    active: Option<TargetId>,
    next_id: u64,
    leased: usize,
    total_leases: u64,
}

impl TargetPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<TargetId> {
        self.active
    }

    /// Makes `id` active and returns the previously active target.
    pub fn set_active(&mut self, id: Option<TargetId>) -> Option<TargetId> {
        std::mem::replace(&mut self.active, id)
    }

    /// Registers a caller-owned target id.
    pub fn create_target(&mut self) -> TargetId {
        self.next_id += 1;
        TargetId(self.next_id)
    }

    /// Number of scratch targets currently leased.
    pub fn leased(&self) -> usize {
        self.leased
    }

    /// Number of leases handed out over the pool's lifetime.
    pub fn total_leases(&self) -> u64 {
        self.total_leases
    }

    /// Leases a `width x height` scratch target and makes it active.
    pub fn acquire(&mut self, width: u32, height: u32) -> ScratchTarget<'_> {
        let id = self.create_target();
        let previous = self.set_active(Some(id));
        self.leased += 1;
        self.total_leases += 1;
        trace!(?id, ?previous, width, height, "scratch target acquired");
        ScratchTarget {
            pool: self,
            id,
            previous,
            width,
            height,
        }
    }
}

/// Leased scratch target; released on drop.
pub struct ScratchTarget<'p> {
    pool: &'p mut TargetPool,
    id: TargetId,
    previous: Option<TargetId>,
    width: u32,
    height: u32,
}

impl ScratchTarget<'_> {
    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resamples `src` into the target and reads the result back.
    /// The read-back always has the target's dimensions and `src`'s color type.
    pub fn blit(&mut self, layer: usize, src: &DynamicImage) -> Result<DynamicImage> {
        if src.width() == 0 || src.height() == 0 {
            return Err(TexArrayError::Resample {
                layer,
                reason: "source image is empty".into(),
            });
        }
        self.pool.active = Some(self.id);
        let out = src.resize_exact(self.width, self.height, RESAMPLE_FILTER);
        if out.width() != self.width || out.height() != self.height {
            return Err(TexArrayError::Resample {
                layer,
                reason: format!(
                    "resample produced {}x{}, expected {}x{}",
                    out.width(),
                    out.height(),
                    self.width,
                    self.height
                ),
            });
        }
        Ok(out)
    }
}

impl Drop for ScratchTarget<'_> {
    fn drop(&mut self) {
        self.pool.active = self.previous;
        self.pool.leased -= 1;
        trace!(id = ?self.id, restored = ?self.previous, "scratch target released");
    }
}
