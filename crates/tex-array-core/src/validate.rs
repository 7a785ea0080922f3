//! Parameter validation and source-slot bookkeeping.
//!
//! `validate` is a pure predicate over a `PackConfig` and its slots. Slots are
//! sized by the config's array size; changing the array size always produces a
//! fresh, empty slot array.

use std::fmt;
use thiserror::Error;

use crate::config::{ArraySize, PackConfig};
use crate::error::{Result, TexArrayError};
use crate::model::SourceImage;

/// The first reason a request is not ready to pack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("texture resolution is not set")]
    MissingResolution,
    #[error("array size is not set")]
    MissingArraySize,
    #[error("pixel format is not set")]
    MissingFormat,
    #[error("expected {expected} source slots, got {actual}")]
    SlotCountMismatch { expected: usize, actual: usize },
    #[error("source image for layer {index} is missing")]
    MissingSource { index: usize },
}

/// Outcome of `validate`. Packing may proceed only when `is_ready()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub has_resolution: bool,
    pub has_array_size: bool,
    pub has_format: bool,
    /// Only evaluated once the three checks above pass.
    pub has_textures: bool,
    pub expected_slots: usize,
    pub supplied_slots: usize,
    /// Indices of empty slots (empty when completeness was not evaluated).
    pub missing_slots: Vec<usize>,
}

impl ValidationReport {
    /// Resolution, array size and format are all set.
    pub fn settings_ready(&self) -> bool {
        self.has_resolution && self.has_array_size && self.has_format
    }

    pub fn is_ready(&self) -> bool {
        self.settings_ready() && self.has_textures
    }

    pub fn first_issue(&self) -> Option<ValidationIssue> {
        if !self.has_resolution {
            return Some(ValidationIssue::MissingResolution);
        }
        if !self.has_array_size {
            return Some(ValidationIssue::MissingArraySize);
        }
        if !self.has_format {
            return Some(ValidationIssue::MissingFormat);
        }
        if self.supplied_slots != self.expected_slots {
            return Some(ValidationIssue::SlotCountMismatch {
                expected: self.expected_slots,
                actual: self.supplied_slots,
            });
        }
        self.missing_slots
            .first()
            .map(|&index| ValidationIssue::MissingSource { index })
    }

    pub fn into_result(self) -> Result<()> {
        match self.first_issue() {
            Some(issue) => Err(TexArrayError::Validation(issue)),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first_issue() {
            Some(issue) => write!(f, "{issue}"),
            None => f.write_str("ready"),
        }
    }
}

/// Checks that resolution, array size and format are set and that exactly
/// `array_size` populated source slots are supplied.
pub fn validate<S>(config: &PackConfig, slots: &[Option<S>]) -> ValidationReport {
    let has_resolution = if config.same_xy_resolution {
        config.x_resolution.is_set()
    } else {
        config.x_resolution.is_set() && config.y_resolution.is_set()
    };
    let has_array_size = config.array_size.is_set();
    let has_format = config.format.is_set();

    let mut report = ValidationReport {
        has_resolution,
        has_array_size,
        has_format,
        has_textures: false,
        expected_slots: config.layer_count(),
        supplied_slots: slots.len(),
        missing_slots: Vec::new(),
    };
    if report.settings_ready() {
        report.missing_slots = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect();
        report.has_textures =
            report.supplied_slots == report.expected_slots && report.missing_slots.is_empty();
    }
    report
}

/// Ordered source slots, one per layer.
#[derive(Debug, Clone, Default)]
pub struct SourceSlots {
    slots: Vec<Option<SourceImage>>,
}

impl SourceSlots {
    pub fn empty(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// Fully populated slots, in iteration order.
    pub fn from_images(images: impl IntoIterator<Item = SourceImage>) -> Self {
        Self {
            slots: images.into_iter().map(Some).collect(),
        }
    }

    /// Discards every slot and returns a fresh empty array of `len` slots.
    pub fn set_layer_count(self, len: usize) -> Self {
        Self::empty(len)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn get(&self, index: usize) -> Option<&SourceImage> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Stores `image` in slot `index`, returning the previous occupant.
    pub fn set(&mut self, index: usize, image: SourceImage) -> Result<Option<SourceImage>> {
        let len = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            TexArrayError::InvalidConfig(format!("slot {index} out of range (0..{len})"))
        })?;
        Ok(slot.replace(image))
    }

    pub fn clear(&mut self, index: usize) -> Option<SourceImage> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn as_slice(&self) -> &[Option<SourceImage>] {
        &self.slots
    }
}

/// Config plus slots, as collected by an interactive surface.
///
/// Changing the array size resets the slots; every other config change keeps them.
#[derive(Debug, Clone, Default)]
pub struct PackRequest {
    config: PackConfig,
    slots: SourceSlots,
}

impl PackRequest {
    pub fn new(config: PackConfig) -> Self {
        let slots = SourceSlots::empty(config.layer_count());
        Self { config, slots }
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    pub fn slots(&self) -> &SourceSlots {
        &self.slots
    }

    pub fn set_config(&mut self, config: PackConfig) {
        let resize = config.array_size != self.config.array_size;
        self.config = config;
        if resize {
            self.reset_slots();
        }
    }

    pub fn set_array_size(&mut self, size: ArraySize) {
        if size != self.config.array_size {
            self.config.array_size = size;
            self.reset_slots();
        }
    }

    pub fn set_source(&mut self, index: usize, image: SourceImage) -> Result<Option<SourceImage>> {
        self.slots.set(index, image)
    }

    pub fn validate(&self) -> ValidationReport {
        validate(&self.config, self.slots.as_slice())
    }

    pub fn into_parts(self) -> (PackConfig, SourceSlots) {
        (self.config, self.slots)
    }

    fn reset_slots(&mut self) {
        let slots = std::mem::take(&mut self.slots);
        self.slots = slots.set_layer_count(self.config.layer_count());
    }
}
