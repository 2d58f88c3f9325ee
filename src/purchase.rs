//! Rolls panels, layouts and finish areas up into priced purchase groups.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::info;

use crate::config::EstimatorConfig;
use crate::error::Result;
use crate::finish::{FinishSummary, FinishType};
use crate::geometry::{self, round_currency};
use crate::pricing::{PriceKey, PriceLookup, PriceResolver, Rate};
use crate::solver::NestingResult;
use crate::types::{BandClass, HardwareItem, MaterialClass, Panel};

/// Which face class a laminate group covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Outer,
    Inner,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardGroup {
    pub material: MaterialClass,
    /// sqft
    pub total_area: f64,
    pub sheet_count: usize,
    pub utilization_percent: f64,
    /// per sqft
    pub rate: Rate,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaminateGroup {
    pub face: Face,
    pub finish: FinishType,
    /// sqft
    pub area: f64,
    pub sheet_count: u32,
    /// per sqft
    pub rate: Rate,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeBandGroup {
    pub band_class: BandClass,
    /// metres, before wastage
    pub length_required: f64,
    pub rolls_needed: u32,
    /// per roll
    pub rate: Rate,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HardwareLine {
    pub name: String,
    pub qty: u32,
    pub rate: Rate,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdhesiveLine {
    pub bottle_count: u32,
    pub rate: Rate,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseRequirements {
    pub boards: Vec<BoardGroup>,
    pub laminates: Vec<LaminateGroup>,
    pub edge_bands: Vec<EdgeBandGroup>,
    pub hardware: Vec<HardwareLine>,
    pub adhesive: Option<AdhesiveLine>,
    pub total_cost: f64,
}

/// Groups everything into purchase units and prices each group.
///
/// `panels` are the untiled input panels; board sheet counts and
/// utilization come from `nesting`. Costs are rounded per group only.
pub fn aggregate<L: PriceLookup + ?Sized>(
    panels: &[Panel],
    hardware: &[HardwareItem],
    nesting: &NestingResult,
    finishes: &FinishSummary,
    config: &EstimatorConfig,
    lookup: &L,
) -> Result<PurchaseRequirements> {
    let board_sheet_sqft = nesting.sheet.billed_sqft(config.standard_sheet_sqft);
    let mut prices = PriceResolver::new(lookup, config.standard_sheet_sqft).with_board_sheet_sqft(board_sheet_sqft);

    let boards = board_groups(panels, nesting, board_sheet_sqft, &mut prices)?;
    let laminates = laminate_groups(finishes, config, &mut prices)?;
    let edge_bands = edge_band_groups(panels, config, &mut prices)?;
    let hardware = hardware_lines(hardware, &mut prices)?;

    let adhesive = if finishes.adhesive_bottles > 0 {
        let rate = prices.rate(&PriceKey::Adhesive)?;
        Some(AdhesiveLine {
            bottle_count: finishes.adhesive_bottles,
            rate,
            cost: round_currency(finishes.adhesive_bottles as f64 * rate.value),
        })
    } else {
        None
    };

    let total_cost = round_currency(
        boards.iter().map(|g| g.cost).sum::<f64>()
            + laminates.iter().map(|g| g.cost).sum::<f64>()
            + edge_bands.iter().map(|g| g.cost).sum::<f64>()
            + hardware.iter().map(|g| g.cost).sum::<f64>()
            + adhesive.as_ref().map_or(0.0, |a| a.cost),
    );

    info!(
        boards = boards.len(),
        laminates = laminates.len(),
        edge_bands = edge_bands.len(),
        hardware = hardware.len(),
        price_keys = prices.lookups(),
        total_cost,
        "priced purchase requirements"
    );

    Ok(PurchaseRequirements {
        boards,
        laminates,
        edge_bands,
        hardware,
        adhesive,
        total_cost,
    })
}

fn board_groups<L: PriceLookup + ?Sized>(
    panels: &[Panel],
    nesting: &NestingResult,
    sheet_sqft: f64,
    prices: &mut PriceResolver<'_, L>,
) -> Result<Vec<BoardGroup>> {
    let mut area_by_material: BTreeMap<MaterialClass, f64> = BTreeMap::new();
    for panel in panels {
        *area_by_material.entry(panel.material).or_default() += panel.total_area();
    }

    area_by_material
        .into_iter()
        .map(|(material, area)| {
            let layout = nesting.layout(&material);
            let sheet_count = layout.map_or(0, |l| l.sheet_count());
            let utilization_percent = layout.map_or(0.0, |l| (l.utilization * 100.0).min(100.0));
            let rate = prices.rate(&PriceKey::Board(material))?;
            Ok(BoardGroup {
                material,
                total_area: geometry::mm2_to_sqft(area),
                sheet_count,
                utilization_percent,
                rate,
                cost: round_currency(sheet_count as f64 * sheet_sqft * rate.value),
            })
        })
        .collect()
}

fn laminate_groups<L: PriceLookup + ?Sized>(
    finishes: &FinishSummary,
    config: &EstimatorConfig,
    prices: &mut PriceResolver<'_, L>,
) -> Result<Vec<LaminateGroup>> {
    let faces = [
        (Face::Outer, finishes.outer_finish, finishes.outer_area),
        (Face::Inner, FinishType::Laminate, finishes.inner_area),
    ];

    let mut groups = Vec::new();
    for (face, finish, area) in faces {
        if area <= 0.0 {
            continue;
        }
        let rate = prices.rate(&PriceKey::Finish(finish))?;
        let sheet_count = geometry::units_needed(area, config.standard_sheet_sqft);
        let billed_area = if finish.sold_by_sheet() {
            sheet_count as f64 * config.standard_sheet_sqft
        } else {
            area
        };
        groups.push(LaminateGroup {
            face,
            finish,
            area,
            sheet_count,
            rate,
            cost: round_currency(billed_area * rate.value),
        });
    }
    Ok(groups)
}

/// Rolls needed for `length_m` of tape plus the wastage allowance.
pub fn rolls_needed(length_m: f64, wastage: f64, roll_m: f64) -> u32 {
    geometry::units_needed(length_m * (1.0 + wastage), roll_m)
}

fn edge_band_groups<L: PriceLookup + ?Sized>(
    panels: &[Panel],
    config: &EstimatorConfig,
    prices: &mut PriceResolver<'_, L>,
) -> Result<Vec<EdgeBandGroup>> {
    let mut length_by_class: BTreeMap<BandClass, f64> = BTreeMap::new();
    for panel in panels {
        if let Some(band) = &panel.edge_band {
            *length_by_class.entry(band.class).or_default() +=
                panel.banded_length() * panel.quantity as f64;
        }
    }

    let mut groups = Vec::new();
    for (band_class, length_mm) in length_by_class {
        if length_mm <= 0.0 {
            continue;
        }
        let length_required = geometry::mm_to_m(length_mm);
        let rolls = rolls_needed(length_required, config.edge_band_wastage, config.edge_band_roll_m);
        let rate = prices.rate(&PriceKey::EdgeBand(band_class))?;
        groups.push(EdgeBandGroup {
            band_class,
            length_required,
            rolls_needed: rolls,
            rate,
            cost: round_currency(rolls as f64 * rate.value),
        });
    }
    Ok(groups)
}

/// Sums duplicate names, keeping first-seen order, and skips empty lines.
fn hardware_lines<L: PriceLookup + ?Sized>(
    items: &[HardwareItem],
    prices: &mut PriceResolver<'_, L>,
) -> Result<Vec<HardwareLine>> {
    let mut merged: Vec<(String, PriceKey, u32)> = Vec::new();
    let mut index: HashMap<PriceKey, usize> = HashMap::new();
    for item in items.iter().filter(|i| i.qty > 0) {
        let key = PriceKey::hardware(&item.name);
        match index.get(&key) {
            Some(&i) => merged[i].2 += item.qty,
            None => {
                index.insert(key.clone(), merged.len());
                merged.push((item.name.trim().to_string(), key, item.qty));
            }
        }
    }

    merged
        .into_iter()
        .map(|(name, key, qty)| {
            let rate = prices.rate(&key)?;
            Ok(HardwareLine {
                name,
                qty,
                rate,
                cost: round_currency(qty as f64 * rate.value),
            })
        })
        .collect()
}
