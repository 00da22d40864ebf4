use tracing::debug;

use super::{CropValues, Frame, LayoutDescription, LayoutError, LayoutSolver};
use crate::common::config::CropSettings;

/// The grid chosen for a frame plus the vertical line it is centred on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryPlan {
    pub layout: LayoutDescription,
    pub center_v: f64,
}

/// Produces crop margins that isolate each tile of the upstream gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct CropCalculator {
    settings: CropSettings,
    solver: LayoutSolver,
}

impl Default for CropCalculator {
    fn default() -> Self { Self::new(CropSettings::default()) }
}

impl CropCalculator {
    pub fn new(settings: CropSettings) -> Self {
        let solver = LayoutSolver::from_settings(&settings);
        CropCalculator { settings, solver }
    }

    pub fn settings(&self) -> &CropSettings { &self.settings }

    /// Chooses the tile grid for `item_count` tiles (at least one).
    pub fn plan(&self, frame: Frame, item_count: usize) -> Result<GalleryPlan, LayoutError> {
        let frame = frame.validate()?;
        let s = &self.settings;
        if !(s.aspect_ratio > 0.0) || !s.aspect_ratio.is_finite() {
            return Err(LayoutError::InvalidAspectRatio(s.aspect_ratio));
        }
        let (width, height) = (frame.width_f64(), frame.height_f64());

        if item_count == 1 {
            // A lone tile is centred on the whole frame, not on the area inside
            // the margins.
            let box_width =
                width - (s.left_margin + s.right_margin + s.single_item_extra_margin);
            if box_width <= 0.0 {
                return Err(LayoutError::MarginsExceedFrame {
                    width: frame.width,
                    height: frame.height,
                });
            }
            let box_height = box_width / s.aspect_ratio;
            return Ok(GalleryPlan {
                layout: LayoutDescription {
                    cols: 1,
                    rows: 1,
                    box_width,
                    box_height,
                    area: box_width * box_height,
                },
                center_v: height / 2.0,
            });
        }

        let inner_width = width - s.left_margin - s.right_margin;
        let inner_height = height - s.top_margin - s.bottom_margin;
        if inner_width <= 0.0 || inner_height <= 0.0 {
            return Err(LayoutError::MarginsExceedFrame {
                width: frame.width,
                height: frame.height,
            });
        }
        let layout =
            self.solver.solve(inner_width, inner_height, item_count, s.aspect_ratio, s.spacing)?;
        Ok(GalleryPlan {
            layout,
            center_v: inner_height / 2.0 + s.top_margin,
        })
    }

    /// One crop per tile, in row-major tile order. Zero tiles give no crops.
    pub fn calculate(
        &self,
        frame: Frame,
        item_count: usize,
    ) -> Result<Vec<CropValues>, LayoutError> {
        if item_count == 0 {
            frame.validate()?;
            return Ok(Vec::new());
        }
        let GalleryPlan { layout, center_v } = self.plan(frame, item_count)?;
        debug!(?frame, item_count, ?layout, center_v, "gallery layout");

        let s = &self.settings;
        let (width, height) = (frame.width_f64(), frame.height_f64());
        let LayoutDescription {
            cols,
            rows,
            box_width,
            box_height,
            ..
        } = layout;

        // The last row may be short; it is centred on its own.
        let last_row = rows - 1;
        let last_row_cols = cols - (rows * cols - item_count);

        let col_height_sum = rows as f64 * box_height + s.spacing * (rows - 1) as f64;
        let push_down = if item_count >= s.push_down_threshold {
            s.push_down_offset
        } else {
            0.0
        };
        let first_top = center_v - col_height_sum / 2.0 + push_down;

        let crops = (0..item_count)
            .map(|i| {
                let col = i % cols;
                let row = i / cols;
                let row_size = if row == last_row { last_row_cols } else { cols };

                let row_width_sum = row_size as f64 * box_width + s.spacing * (row_size - 1) as f64;
                let h_margin = (width - row_width_sum) / 2.0;
                let left = h_margin + col as f64 * (box_width + s.spacing);
                let top = first_top + row as f64 * (box_height + s.spacing);

                CropValues {
                    left,
                    right: width - left - box_width,
                    top,
                    bottom: height - top - box_height,
                }
            })
            .collect();
        Ok(crops)
    }
}
