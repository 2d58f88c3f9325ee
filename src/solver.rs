//! Packs panel copies onto identical stock sheets, one sheet sequence per
//! material class.
//!
//! Copies are offered in decreasing size order. Each copy goes to the free
//! rectangle, on any open sheet, that leaves the smallest short-side
//! leftover; a new sheet is opened only when nothing fits. The result is a
//! heuristic, not an optimum, but it is fully deterministic for a given
//! input order.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SortOrder;
use crate::error::{EstimateError, Result};
use crate::guillotine::{FreeRect, ScoredFit, SheetBin};
use crate::types::{MaterialClass, Panel, Placement, Rect, SheetSpec};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetLayout {
    /// 0-based position in the material's sheet sequence.
    pub index: usize,
    pub placements: Vec<Placement>,
    pub free_rects: Vec<FreeRect>,
    pub used_area: f64,
    pub utilization: f64,
    pub waste_area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialLayout {
    pub material: MaterialClass,
    pub sheets: Vec<SheetLayout>,
    pub used_area: f64,
    pub net_area: f64,
    pub utilization: f64,
}

impl MaterialLayout {
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NestingResult {
    pub sheet: SheetSpec,
    /// Ordered by material class.
    pub materials: Vec<MaterialLayout>,
}

impl NestingResult {
    pub fn layout(&self, material: &MaterialClass) -> Option<&MaterialLayout> {
        self.materials.iter().find(|m| &m.material == material)
    }

    pub fn sheet_count(&self, material: &MaterialClass) -> usize {
        self.layout(material).map_or(0, MaterialLayout::sheet_count)
    }

    pub fn total_sheets(&self) -> usize {
        self.materials.iter().map(MaterialLayout::sheet_count).sum()
    }
}

/// One physical copy of a panel awaiting placement.
#[derive(Debug, Clone, Copy)]
struct Piece<'a> {
    panel: &'a Panel,
    instance: u32,
}

impl Piece<'_> {
    fn rect(&self) -> Rect {
        self.panel.rect()
    }
}

pub struct Solver {
    sheet: SheetSpec,
    order: SortOrder,
}

impl Solver {
    pub fn new(sheet: SheetSpec, order: SortOrder) -> Self {
        Self { sheet, order }
    }

    /// Nests already-tiled `panels`. Every copy is placed or the call fails.
    pub fn solve(&self, panels: &[Panel]) -> Result<NestingResult> {
        self.sheet.validate()?;

        let mut by_material: BTreeMap<MaterialClass, Vec<&Panel>> = BTreeMap::new();
        for panel in panels {
            by_material.entry(panel.material).or_default().push(panel);
        }

        let materials = by_material
            .into_iter()
            .map(|(material, panels)| self.solve_material(material, &panels))
            .collect::<Result<Vec<_>>>()?;

        Ok(NestingResult {
            sheet: self.sheet,
            materials,
        })
    }

    fn solve_material(&self, material: MaterialClass, panels: &[&Panel]) -> Result<MaterialLayout> {
        let pieces = self.expand_panels(panels);
        let mut bins: Vec<SheetBin> = Vec::new();

        for piece in &pieces {
            let rect = piece.rect();
            let allow_rotate = piece.panel.can_rotate();

            let mut best: Option<(usize, ScoredFit)> = None;
            for (bi, bin) in bins.iter().enumerate() {
                if let Some(fit) = bin.find_best(rect, allow_rotate)
                    && best.is_none_or(|(_, b)| fit.score < b.score)
                {
                    best = Some((bi, fit));
                }
            }

            match best {
                Some((bi, fit)) => {
                    bins[bi].place(fit, rect, &piece.panel.id, piece.instance);
                }
                None => {
                    let mut bin = SheetBin::new(self.sheet.usable(), self.sheet.margin, self.sheet.kerf);
                    let fit = bin.find_best(rect, allow_rotate).ok_or_else(|| {
                        EstimateError::UnplaceablePanel {
                            id: piece.panel.id.clone(),
                            width: rect.w,
                            height: rect.h,
                            usable_width: self.sheet.usable_width(),
                            usable_height: self.sheet.usable_height(),
                        }
                    })?;
                    bin.place(fit, rect, &piece.panel.id, piece.instance);
                    debug!(material = %material, sheet = bins.len(), panel = %piece.panel.id, "opened sheet");
                    bins.push(bin);
                }
            }
        }

        let layout = self.bins_to_layout(material, bins);
        info!(
            material = %material,
            pieces = pieces.len(),
            sheets = layout.sheets.len(),
            utilization = layout.utilization,
            "nested material"
        );
        Ok(layout)
    }

    /// One entry per physical copy, sorted largest first. The sort is stable
    /// so equal-sized copies keep their input order.
    fn expand_panels<'a>(&self, panels: &[&'a Panel]) -> Vec<Piece<'a>> {
        let mut pieces: Vec<Piece<'a>> = panels
            .iter()
            .flat_map(|&panel| (0..panel.quantity).map(move |instance| Piece { panel, instance }))
            .collect();

        match self.order {
            SortOrder::Area => {
                pieces.sort_by(|a, b| b.rect().area().total_cmp(&a.rect().area()));
            }
            SortOrder::MaxSide => {
                pieces.sort_by(|a, b| b.rect().max_side().total_cmp(&a.rect().max_side()));
            }
        }
        pieces
    }

    fn bins_to_layout(&self, material: MaterialClass, bins: Vec<SheetBin>) -> MaterialLayout {
        let net_sheet = self.sheet.net_area();
        let sheets: Vec<SheetLayout> = bins
            .into_iter()
            .enumerate()
            .map(|(index, bin)| SheetLayout {
                index,
                used_area: bin.used_area(),
                utilization: bin.utilization(),
                waste_area: bin.waste_area(),
                placements: bin.placements,
                free_rects: bin.free_rects,
            })
            .collect();

        let used_area: f64 = sheets.iter().map(|s| s.used_area).sum();
        let net_area = net_sheet * sheets.len() as f64;
        let utilization = if net_area > 0.0 {
            (used_area / net_area).clamp(0.0, 1.0)
        } else {
            0.0
        };

        MaterialLayout {
            material,
            sheets,
            used_area,
            net_area,
            utilization,
        }
    }
}
