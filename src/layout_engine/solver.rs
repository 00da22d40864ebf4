use tracing::trace;

use super::{LayoutDescription, LayoutError};
use crate::common::config::CropSettings;

/// Finds the grid that gives every tile the largest area.
///
/// Tile sizes are snapped down to the configured quanta, which is what keeps
/// the computed crops on the same pixel boundaries the upstream renderer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSolver {
    pub width_quantum: u32,
    pub height_quantum: u32,
}

impl Default for LayoutSolver {
    fn default() -> Self {
        LayoutSolver {
            width_quantum: 16,
            height_quantum: 18,
        }
    }
}

impl LayoutSolver {
    pub fn from_settings(settings: &CropSettings) -> Self {
        LayoutSolver {
            width_quantum: settings.width_quantum,
            height_quantum: settings.height_quantum,
        }
    }

    /// Tries every column count from 1 to `tile_count` and keeps the first
    /// candidate with the strictly largest tile area.
    pub fn solve(
        &self,
        frame_width: f64,
        frame_height: f64,
        tile_count: usize,
        aspect_ratio: f64,
        spacing: f64,
    ) -> Result<LayoutDescription, LayoutError> {
        if !(frame_width > 0.0 && frame_height > 0.0)
            || !frame_width.is_finite()
            || !frame_height.is_finite()
        {
            return Err(LayoutError::InvalidFrame {
                width: frame_width,
                height: frame_height,
            });
        }
        if tile_count == 0 {
            return Err(LayoutError::InvalidTileCount);
        }
        if !(aspect_ratio > 0.0) || !aspect_ratio.is_finite() {
            return Err(LayoutError::InvalidAspectRatio(aspect_ratio));
        }
        if !(spacing >= 0.0) || !spacing.is_finite() {
            return Err(LayoutError::InvalidSpacing(spacing));
        }
        if self.width_quantum == 0 || self.height_quantum == 0 {
            return Err(LayoutError::InvalidQuantum {
                width: self.width_quantum,
                height: self.height_quantum,
            });
        }

        let mut best = LayoutDescription::default();
        for cols in 1..=tile_count {
            let candidate =
                self.candidate(frame_width, frame_height, tile_count, cols, aspect_ratio, spacing);
            trace!(?candidate, "layout candidate");
            if candidate.area > best.area {
                best = candidate;
            }
        }

        if best.cols == 0 {
            return Err(LayoutError::FrameTooSmall {
                width: frame_width,
                height: frame_height,
                count: tile_count,
            });
        }
        Ok(best)
    }

    fn candidate(
        &self,
        frame_width: f64,
        frame_height: f64,
        tile_count: usize,
        cols: usize,
        aspect_ratio: f64,
        spacing: f64,
    ) -> LayoutDescription {
        let rows = tile_count.div_ceil(cols);
        let wq = f64::from(self.width_quantum);
        let hq = f64::from(self.height_quantum);

        // Spacing between tiles is not available to the tiles themselves.
        let packed_width = frame_width - spacing * (cols - 1) as f64;
        let packed_height = frame_height - spacing * (rows - 1) as f64;
        let h_scale = packed_width / (cols as f64 * aspect_ratio);
        let v_scale = packed_height / rows as f64;

        let (box_width, box_height) = if h_scale <= v_scale {
            let width = snap(packed_width / cols as f64, wq);
            (width, snap(width / aspect_ratio, hq))
        } else {
            let height = snap(packed_height / rows as f64, hq);
            (snap(height * aspect_ratio, wq), height)
        };

        // Frames narrower than the spacing give negative sizes; they never win.
        let (box_width, box_height) = (box_width.max(0.0), box_height.max(0.0));
        LayoutDescription {
            cols,
            rows,
            box_width,
            box_height,
            area: box_width * box_height,
        }
    }
}

fn snap(value: f64, quantum: f64) -> f64 { (value / quantum).floor() * quantum }

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const ASPECT: f64 = 16.0 / 9.0;

    fn solve(width: f64, height: f64, count: usize) -> LayoutDescription {
        LayoutSolver::default().solve(width, height, count, ASPECT, 12.0).unwrap()
    }

    #[test]
    fn four_tiles_in_a_wide_frame_use_two_by_two() {
        let layout = solve(3788.0, 2184.0, 4);
        assert_eq!(layout, LayoutDescription {
            cols: 2,
            rows: 2,
            box_width: 1888.0,
            box_height: 1062.0,
            area: 1888.0 * 1062.0,
        });
    }

    #[test]
    fn picks_known_grids_for_common_counts() {
        let grids: Vec<(usize, usize, f64, f64)> = (1..=12)
            .map(|n| {
                let l = solve(3788.0, 2184.0, n);
                (l.cols, l.rows, l.box_width, l.box_height)
            })
            .collect();
        assert_eq!(grids, vec![
            (1, 1, 3776.0, 2124.0),
            (1, 2, 1920.0, 1080.0),
            (2, 2, 1888.0, 1062.0),
            (2, 2, 1888.0, 1062.0),
            (2, 3, 1280.0, 720.0),
            (2, 3, 1280.0, 720.0),
            (3, 3, 1248.0, 702.0),
            (3, 3, 1248.0, 702.0),
            (3, 3, 1248.0, 702.0),
            (3, 4, 928.0, 522.0),
            (3, 4, 928.0, 522.0),
            (3, 4, 928.0, 522.0),
        ]);
    }

    #[test]
    fn multi_tile_boxes_are_quantized() {
        for (width, height) in [(3788.0, 2184.0), (1868.0, 864.0), (1228.0, 504.0)] {
            for n in 2..=25 {
                let l = solve(width, height, n);
                assert_eq!(l.box_width % 16.0, 0.0, "{n} tiles in {width}x{height}");
                assert_eq!(l.box_height % 18.0, 0.0, "{n} tiles in {width}x{height}");
            }
        }
    }

    #[test]
    fn chosen_grid_is_the_first_area_maximum() {
        let solver = LayoutSolver::default();
        for n in 1..=25 {
            let best = solver.solve(3788.0, 2184.0, n, ASPECT, 12.0).unwrap();
            assert_eq!(best.rows, n.div_ceil(best.cols));
            for cols in 1..=n {
                let c = solver.candidate(3788.0, 2184.0, n, cols, ASPECT, 12.0);
                if cols < best.cols {
                    assert!(c.area < best.area, "{n} tiles: {cols} columns ties earlier");
                } else {
                    assert!(c.area <= best.area, "{n} tiles: {cols} columns is larger");
                }
            }
        }
    }

    #[test]
    fn best_grid_wastes_no_column() {
        for n in 1..=25 {
            let l = solve(3788.0, 2184.0, n);
            assert!(l.rows * (l.cols - 1) < n && n <= l.rows * l.cols, "{n} tiles: {l:?}");
        }
    }

    #[test]
    fn custom_quanta_are_respected() {
        let solver = LayoutSolver {
            width_quantum: 1,
            height_quantum: 1,
        };
        let l = solver.solve(1600.0, 900.0, 1, ASPECT, 0.0).unwrap();
        assert_eq!((l.box_width, l.box_height), (1600.0, 900.0));
    }

    #[test]
    fn rejects_invalid_inputs() {
        let solver = LayoutSolver::default();
        assert_eq!(
            solver.solve(0.0, 100.0, 1, ASPECT, 0.0),
            Err(LayoutError::InvalidFrame { width: 0.0, height: 100.0 })
        );
        assert_eq!(
            solver.solve(100.0, 100.0, 0, ASPECT, 0.0),
            Err(LayoutError::InvalidTileCount)
        );
        assert_eq!(
            solver.solve(100.0, 100.0, 1, 0.0, 0.0),
            Err(LayoutError::InvalidAspectRatio(0.0))
        );
        assert_eq!(
            solver.solve(100.0, 100.0, 1, ASPECT, -1.0),
            Err(LayoutError::InvalidSpacing(-1.0))
        );
        assert!(matches!(
            solver.solve(100.0, 100.0, 1, f64::NAN, 0.0),
            Err(LayoutError::InvalidAspectRatio(_))
        ));
        assert_eq!(
            LayoutSolver { width_quantum: 0, height_quantum: 18 }.solve(
                100.0, 100.0, 1, ASPECT, 0.0
            ),
            Err(LayoutError::InvalidQuantum { width: 0, height: 18 })
        );
    }

    #[test]
    fn tiny_frame_is_reported_instead_of_an_empty_grid() {
        assert_eq!(
            LayoutSolver::default().solve(10.0, 10.0, 3, ASPECT, 12.0),
            Err(LayoutError::FrameTooSmall { width: 10.0, height: 10.0, count: 3 })
        );
    }
}
