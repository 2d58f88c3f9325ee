//! Splits panels larger than the usable sheet area into a grid of pieces.

use tracing::debug;

use crate::types::{EPSILON, Panel, Rect};

/// Most pieces one panel may be tiled into.
pub const MAX_TILED_PIECES: usize = 10_000;

/// Returns `panels` with every oversize panel replaced by its grid pieces.
///
/// A panel passes through unchanged when it fits the usable area as drawn,
/// or rotated if it may rotate. Otherwise it becomes a
/// `ceil(width / usable_width) x ceil(height / usable_height)` grid whose
/// edge pieces carry the remainder, so the total area is unchanged. Pieces
/// are named `<id>-r<row>c<col>` (1-based) and inherit everything else.
pub fn tile(panels: &[Panel], usable_width: f64, usable_height: f64) -> Vec<Panel> {
    let usable = Rect::new(usable_width, usable_height);
    let mut out = Vec::with_capacity(panels.len());

    for panel in panels {
        let Some((cols, rows)) = grid_size(panel, &usable) else {
            out.push(panel.clone());
            continue;
        };
        debug!(
            panel = %panel.id,
            size = %panel.rect(),
            cols,
            rows,
            "tiling oversize panel"
        );

        for row in 0..rows {
            let h = segment(panel.height, usable_height, row, rows);
            for col in 0..cols {
                let w = segment(panel.width, usable_width, col, cols);
                let mut piece = panel.clone();
                piece.id = format!("{}-r{}c{}", panel.id, row + 1, col + 1);
                piece.width = w;
                piece.height = h;
                out.push(piece);
            }
        }
    }

    out
}

/// Number of pieces `panel` is tiled into on a sheet with the given usable
/// size. One for panels that pass through.
pub fn piece_count(panel: &Panel, usable_width: f64, usable_height: f64) -> usize {
    grid_size(panel, &Rect::new(usable_width, usable_height)).map_or(1, |(cols, rows)| cols.saturating_mul(rows))
}

/// Grid columns and rows for an oversize panel, `None` if it fits.
fn grid_size(panel: &Panel, usable: &Rect) -> Option<(usize, usize)> {
    let rect = panel.rect();
    if rect.fits_in(usable) || (panel.can_rotate() && rect.rotated().fits_in(usable)) {
        return None;
    }
    Some((grid_count(panel.width, usable.w), grid_count(panel.height, usable.h)))
}

fn grid_count(length: f64, usable: f64) -> usize {
    ((length - EPSILON) / usable).ceil().max(1.0) as usize
}

/// Size of grid cell `idx` of `count` along one axis.
fn segment(length: f64, usable: f64, idx: usize, count: usize) -> f64 {
    if idx + 1 < count {
        usable
    } else {
        length - usable * (count - 1) as f64
    }
}
