use serde::Serialize;

use crate::types::{EPSILON, Placement, Rect};

/// Unused axis-aligned region of a sheet, in sheet coordinates (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FreeRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FreeRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.w, self.h)
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    pub fn contains(&self, other: &FreeRect) -> bool {
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }

    pub fn intersects(&self, other: &FreeRect) -> bool {
        self.x < other.right() - EPSILON
            && other.x < self.right() - EPSILON
            && self.y < other.bottom() - EPSILON
            && other.y < self.bottom() - EPSILON
    }

    fn is_degenerate(&self) -> bool {
        self.w <= EPSILON || self.h <= EPSILON
    }
}

/// Candidate position for a piece inside one free rectangle.
#[derive(Debug, Clone, Copy)]
pub struct ScoredFit {
    pub free_idx: usize,
    pub rotated: bool,
    /// (short-side leftover, long-side leftover), lower is better.
    pub score: (f64, f64),
}

/// One stock sheet being filled.
#[derive(Debug, Clone)]
pub struct SheetBin {
    bounds: FreeRect,
    kerf: f64,
    pub free_rects: Vec<FreeRect>,
    pub placements: Vec<Placement>,
}

impl SheetBin {
    /// An empty sheet whose only free rectangle is the margin-trimmed area.
    pub fn new(usable: Rect, margin: f64, kerf: f64) -> Self {
        let bounds = FreeRect::new(margin, margin, usable.w, usable.h);
        Self {
            bounds,
            kerf,
            free_rects: vec![bounds],
            placements: Vec::new(),
        }
    }

    pub fn bounds(&self) -> FreeRect {
        self.bounds
    }

    pub fn used_area(&self) -> f64 {
        self.placements.iter().map(Placement::area).sum()
    }

    pub fn net_area(&self) -> f64 {
        self.bounds.area()
    }

    /// Used over net area, clamped so float overshoot never reads above 100%.
    pub fn utilization(&self) -> f64 {
        let net = self.net_area();
        if net <= 0.0 {
            return 0.0;
        }
        (self.used_area() / net).clamp(0.0, 1.0)
    }

    pub fn waste_area(&self) -> f64 {
        (self.net_area() - self.used_area()).max(0.0)
    }

    /// Best short-side fit over all free rectangles, ties broken by the long
    /// side, then by the first candidate found.
    pub fn find_best(&self, piece: Rect, allow_rotate: bool) -> Option<ScoredFit> {
        let mut best: Option<ScoredFit> = None;

        for (idx, free) in self.free_rects.iter().enumerate() {
            let free_rect = free.rect();
            let mut consider = |placed: Rect, rotated: bool| {
                if !placed.fits_in(&free_rect) {
                    return;
                }
                let score = Self::score(placed, free_rect);
                if best.is_none_or(|b| score < b.score) {
                    best = Some(ScoredFit {
                        free_idx: idx,
                        rotated,
                        score,
                    });
                }
            };

            consider(piece, false);
            if allow_rotate {
                consider(piece.rotated(), true);
            }
        }

        best
    }

    fn score(placed: Rect, free: Rect) -> (f64, f64) {
        let dw = (free.w - placed.w).max(0.0);
        let dh = (free.h - placed.h).max(0.0);
        (dw.min(dh), dw.max(dh))
    }

    /// Puts `piece` at the top-left corner of the chosen free rectangle and
    /// rebuilds the free list around it.
    pub fn place(&mut self, fit: ScoredFit, piece: Rect, panel_id: &str, instance: u32) -> Placement {
        let free = self.free_rects[fit.free_idx];
        let placed = if fit.rotated { piece.rotated() } else { piece };

        let placement = Placement {
            panel_id: panel_id.to_string(),
            instance,
            x: free.x,
            y: free.y,
            placed_width: placed.w,
            placed_height: placed.h,
            rotated: fit.rotated,
        };

        // The saw needs one kerf of clearance on every side of the piece.
        let occupied = FreeRect::new(
            placement.x - self.kerf,
            placement.y - self.kerf,
            placed.w + 2.0 * self.kerf,
            placed.h + 2.0 * self.kerf,
        );
        self.split(&occupied);
        self.prune();
        self.placements.push(placement.clone());

        placement
    }

    /// Replaces every free rectangle touching `occupied` with the strips
    /// to its right, below, left and above.
    fn split(&mut self, occupied: &FreeRect) {
        let mut next = Vec::with_capacity(self.free_rects.len() + 4);

        for free in self.free_rects.drain(..) {
            if !free.intersects(occupied) {
                next.push(free);
                continue;
            }

            let strips = [
                // Right
                FreeRect::new(occupied.right(), free.y, free.right() - occupied.right(), free.h),
                // Bottom
                FreeRect::new(free.x, occupied.bottom(), free.w, free.bottom() - occupied.bottom()),
                // Left
                FreeRect::new(free.x, free.y, occupied.x - free.x, free.h),
                // Top
                FreeRect::new(free.x, free.y, free.w, occupied.y - free.y),
            ];
            next.extend(strips.into_iter().filter(|s| !s.is_degenerate()));
        }

        self.free_rects = next;
    }

    /// Drops free rectangles contained in another one. Of two identical
    /// rectangles the earlier survives.
    fn prune(&mut self) {
        let mut i = 0;
        while i < self.free_rects.len() {
            let mut removed_i = false;
            let mut j = i + 1;
            while j < self.free_rects.len() {
                if self.free_rects[i].contains(&self.free_rects[j]) {
                    self.free_rects.remove(j);
                } else if self.free_rects[j].contains(&self.free_rects[i]) {
                    self.free_rects.remove(i);
                    removed_i = true;
                    break;
                } else {
                    j += 1;
                }
            }
            if !removed_i {
                i += 1;
            }
        }
    }
}
