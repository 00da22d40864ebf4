//! Gallery geometry: choosing a grid for `n` equally sized tiles and turning
//! it into per-tile crop margins against the full capture frame.
//!
//! Everything here is pure and synchronous; callers may use it from any
//! context without coordination.

mod crop;
mod rect;
mod solver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crop::{CropCalculator, GalleryPlan};
pub use rect::crops_to_rects;
pub use solver::LayoutSolver;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("frame must have a positive size, got {width}x{height}")]
    InvalidFrame { width: f64, height: f64 },
    #[error("tile count must be at least 1")]
    InvalidTileCount,
    #[error("aspect ratio must be positive and finite, got {0}")]
    InvalidAspectRatio(f64),
    #[error("spacing must be non-negative and finite, got {0}")]
    InvalidSpacing(f64),
    #[error("size quantum must be positive, got {width}x{height}")]
    InvalidQuantum { width: u32, height: u32 },
    #[error("margins leave no room for a tile in a {width}x{height} frame")]
    MarginsExceedFrame { width: u32, height: u32 },
    #[error("no tile of at least one quantum fits {count} tiles into {width}x{height}")]
    FrameTooSmall { width: f64, height: f64, count: usize },
}

/// Size of a capture source in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Frame { Frame { width, height } }

    pub fn validate(self) -> Result<Frame, LayoutError> {
        if self.width == 0 || self.height == 0 {
            return Err(LayoutError::InvalidFrame {
                width: f64::from(self.width),
                height: f64::from(self.height),
            });
        }
        Ok(self)
    }

    pub fn width_f64(self) -> f64 { f64::from(self.width) }

    pub fn height_f64(self) -> f64 { f64::from(self.height) }
}

/// One candidate grid. `area` is the area of a single tile and is only
/// meaningful when comparing candidates for the same tile count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutDescription {
    pub cols: usize,
    pub rows: usize,
    pub box_width: f64,
    pub box_height: f64,
    pub area: f64,
}

/// Margins removed from each edge of a frame, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CropValues {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Absolute window inside a frame, equivalent to a [`CropValues`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RectValues {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
