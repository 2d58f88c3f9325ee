use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EstimatorConfig;
use crate::error::{EstimateError, Result};
use crate::finish::{FinishSummary, FinishTopology, resolve_finishes};
use crate::pricing::PriceLookup;
use crate::purchase::{PurchaseRequirements, aggregate};
use crate::solver::{NestingResult, Solver};
use crate::templates::{PanelTemplate, UnitSpec};
use crate::tiler::{MAX_TILED_PIECES, piece_count, tile};
use crate::types::{Grain, HardwareItem, Panel, SheetSpec};

/// Everything one estimation call needs besides prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateRequest {
    #[serde(default)]
    pub panels: Vec<Panel>,
    #[serde(default)]
    pub hardware: Vec<HardwareItem>,
    #[serde(default)]
    pub sheet: SheetSpec,
    #[serde(default)]
    pub finish: FinishTopology,
    #[serde(default)]
    pub config: EstimatorConfig,
}

impl EstimateRequest {
    pub fn new(panels: Vec<Panel>) -> Self {
        Self {
            panels,
            ..Self::default()
        }
    }

    /// Appends a unit's panels and hardware. Returns `false`, adding
    /// nothing, if `template` does not handle the unit type.
    pub fn add_unit<T: PanelTemplate + ?Sized>(&mut self, template: &T, unit: &UnitSpec) -> bool {
        if !template.supports(unit.unit) {
            return false;
        }
        self.panels.extend(template.panels(unit));
        self.hardware.extend(template.hardware(unit));
        true
    }
}

/// Nesting layout, finish breakdown and priced purchase list of one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub nesting: NestingResult,
    pub finishes: FinishSummary,
    pub purchase: PurchaseRequirements,
}

/// Rejects invalid panels and duplicate ids before any work is done.
pub fn validate_panels(panels: &[Panel]) -> Result<()> {
    let mut seen = HashSet::with_capacity(panels.len());
    for panel in panels {
        panel.validate()?;
        if panel.grain != Grain::None && panel.allow_rotate {
            warn!(panel = %panel.id, "grain panel allows rotation, keeping it unrotated");
        }
        if !seen.insert(panel.id.as_str()) {
            return Err(EstimateError::InvalidPanel {
                id: panel.id.clone(),
                reason: "duplicate panel id".to_string(),
            });
        }
    }
    Ok(())
}

/// Rejects panels that would tile into an unreasonable number of pieces.
fn validate_tiling(panels: &[Panel], sheet: &SheetSpec) -> Result<()> {
    for panel in panels {
        let pieces = piece_count(panel, sheet.usable_width(), sheet.usable_height());
        if pieces > MAX_TILED_PIECES {
            return Err(EstimateError::InvalidPanel {
                id: panel.id.clone(),
                reason: format!("tiles into {} pieces, more than {}", pieces, MAX_TILED_PIECES),
            });
        }
    }
    Ok(())
}

/// Ids must stay unique once oversize panels are replaced by their pieces.
fn validate_tiled_ids(tiled: &[Panel]) -> Result<()> {
    let mut seen = HashSet::with_capacity(tiled.len());
    for piece in tiled {
        if !seen.insert(piece.id.as_str()) {
            return Err(EstimateError::InvalidPanel {
                id: piece.id.clone(),
                reason: "id collides with a piece of a tiled oversize panel".to_string(),
            });
        }
    }
    Ok(())
}

/// Tiles, nests, resolves finishes and prices one job.
///
/// Any error aborts the whole call; there are no partial results.
pub fn nest_and_price<L: PriceLookup + ?Sized>(request: &EstimateRequest, lookup: &L) -> Result<Estimate> {
    let EstimateRequest {
        panels,
        hardware,
        sheet,
        finish,
        config,
    } = request;

    config.validate()?;
    validate_panels(panels)?;
    sheet.validate()?;
    validate_tiling(panels, sheet)?;

    let tiled = tile(panels, sheet.usable_width(), sheet.usable_height());
    validate_tiled_ids(&tiled)?;
    let nesting = Solver::new(*sheet, config.order).solve(&tiled)?;
    let finishes = resolve_finishes(panels, finish, config);
    let purchase = aggregate(panels, hardware, &nesting, &finishes, config, lookup)?;

    info!(
        panels = panels.len(),
        pieces = tiled.len(),
        sheets = nesting.total_sheets(),
        total_cost = purchase.total_cost,
        "estimate complete"
    );

    Ok(Estimate {
        nesting,
        finishes,
        purchase,
    })
}
