//! # Raster collaborators
//!
//! The core never touches raster pixels itself. Everything it needs from
//! the raster side of the world goes through the [`RasterLayer`],
//! [`ColorRamp`] and [`LegendView`] traits, so the same classification and
//! save logic works against a real GDAL/host binding or against
//! [`memory::InMemoryRaster`] in tests.
//!
//! - [`RasterLayer`]: per-band unique-value scan, no-data registration,
//!   renderer installation.
//! - [`ColorRamp`]: fallback colors for rows without table-supplied color.
//! - [`LegendView`]: the externally owned legend-node list the
//!   deduplicator reorders.

use std::path::Path;

use crate::error::Result;
use crate::model::Color;

pub mod memory;

/// One raw renderer class: a represented value, its visible label and its
/// assigned color.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassData {
    pub value: f64,
    pub label: String,
    pub color: Color,
}

impl ClassData {
    pub fn new(value: f64, label: impl Into<String>, color: Color) -> Self {
        Self {
            value,
            label: label.into(),
            color,
        }
    }
}

/// One discrete (non-interpolated) shader stop, keyed by the upper bound
/// of its range.
#[derive(Debug, Clone, PartialEq)]
pub struct RampShaderItem {
    pub value: f64,
    pub color: Color,
    pub label: String,
}

/// Replacement renderer installed by the classification engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererSpec {
    /// Discrete per-value classes (thematic tables).
    Paletted { band: usize, classes: Vec<ClassData> },
    /// Discrete ramp shader over continuous ranges (athematic tables).
    PseudoColor {
        band: usize,
        min: f64,
        max: f64,
        items: Vec<RampShaderItem>,
    },
}

/// Color source for classes and rows the table supplies no color for.
pub trait ColorRamp {
    /// Color at `fraction` in `[0, 1]`.
    fn color(&self, fraction: f64) -> Color;
}

/// Deterministic stand-in for the host's random ramp: well-spread colors
/// derived by hashing the fraction, stable across runs.
#[derive(Debug, Clone, Copy)]
pub struct RandomColorRamp {
    seed: u64,
}

impl RandomColorRamp {
    pub fn new() -> Self {
        Self { seed: 0x9e37_79b9 }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for RandomColorRamp {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorRamp for RandomColorRamp {
    fn color(&self, fraction: f64) -> Color {
        // splitmix64 over the fraction bits
        let mut z = self.seed ^ fraction.to_bits();
        z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        Color::rgb((z >> 16) as u8, (z >> 8) as u8, z as u8)
    }
}

/// The raster the classification engine drives.
pub trait RasterLayer {
    /// Path of the raster source file.
    fn source(&self) -> &Path;

    fn band_count(&self) -> usize;

    /// Raw per-value classes from the band's histogram/unique-value scan,
    /// colored from `ramp` and labelled with the value itself.
    fn class_data(&mut self, band: usize, ramp: &dyn ColorRamp) -> Result<Vec<ClassData>>;

    /// Add `value` to the band's no-data-value set.
    fn register_nodata(&mut self, band: usize, value: f64) -> Result<()>;

    fn set_renderer(&mut self, renderer: RendererSpec);

    fn renderer(&self) -> Option<&RendererSpec>;

    fn trigger_repaint(&mut self);
}

/// Externally owned legend-node list for one layer.
pub trait LegendView {
    fn row_count(&self) -> usize;

    /// Replace the display order; `order` holds source row indices.
    fn set_row_order(&mut self, order: &[usize]);

    fn set_row_label(&mut self, row: usize, label: &str);
}
