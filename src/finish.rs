//! Decides which faces of each panel need an applied surface.
//!
//! Every panel has two faces. Room-facing faces take the chosen outer
//! finish, interior faces take a plain laminate, and hidden faces take
//! nothing:
//!
//! | Kind                                   | Face A | Face B                  |
//! |----------------------------------------|--------|-------------------------|
//! | shutter, door, drawer-front            | outer  | outer                   |
//! | side, loft-side                        | inner  | outer if exposed, else none |
//! | top, bottom, partition, shelf, loft-*  | inner  | none                    |
//! | back, loft-back                        | none   | none                    |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EstimatorConfig;
use crate::error::ParseError;
use crate::geometry;
use crate::types::{Panel, PanelKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishType {
    #[default]
    Laminate,
    Acrylic,
    Veneer,
    Paint,
    Membrane,
}

impl FinishType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishType::Laminate => "laminate",
            FinishType::Acrylic => "acrylic",
            FinishType::Veneer => "veneer",
            FinishType::Paint => "paint",
            FinishType::Membrane => "membrane",
        }
    }

    /// Laminate, acrylic and veneer are bought in whole sheets; paint and
    /// membrane are applied by area.
    pub fn sold_by_sheet(&self) -> bool {
        matches!(
            self,
            FinishType::Laminate | FinishType::Acrylic | FinishType::Veneer
        )
    }
}

impl FromStr for FinishType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "laminate" => Ok(FinishType::Laminate),
            "acrylic" => Ok(FinishType::Acrylic),
            "veneer" => Ok(FinishType::Veneer),
            "paint" | "pu" => Ok(FinishType::Paint),
            "membrane" => Ok(FinishType::Membrane),
            _ => Err(ParseError(format!("unknown finish type '{}'", s))),
        }
    }
}

impl fmt::Display for FinishType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finish class of one panel face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceFinish {
    Outer,
    Inner,
    None,
}

/// Board and finish choices that modulate the finish resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinishTopology {
    /// The whole job uses factory-finished boards.
    #[serde(default)]
    pub pre_laminated: bool,
    /// Finish applied to outer faces. Inner faces always take laminate.
    #[serde(default)]
    pub outer_finish: FinishType,
}

impl FinishTopology {
    pub fn new(outer_finish: FinishType) -> Self {
        Self {
            pre_laminated: false,
            outer_finish,
        }
    }

    pub fn pre_laminated() -> Self {
        Self {
            pre_laminated: true,
            outer_finish: FinishType::Laminate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelFinish {
    pub panel_id: String,
    pub kind: PanelKind,
    pub quantity: u32,
    pub faces: [FaceFinish; 2],
    /// sqft, all copies
    pub outer_area: f64,
    /// sqft, all copies
    pub inner_area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishSummary {
    pub outer_finish: FinishType,
    pub panels: Vec<PanelFinish>,
    pub outer_area: f64,
    pub inner_area: f64,
    pub laminated_area: f64,
    pub adhesive_bottles: u32,
    /// Panels whose kind has no face assignment; resolved as none/none.
    pub flagged: Vec<String>,
}

impl FinishSummary {
    fn empty(outer_finish: FinishType) -> Self {
        Self {
            outer_finish,
            panels: Vec::new(),
            outer_area: 0.0,
            inner_area: 0.0,
            laminated_area: 0.0,
            adhesive_bottles: 0,
            flagged: Vec::new(),
        }
    }
}

/// Face assignment for a panel kind, or `None` for kinds outside the table.
pub fn face_assignment(kind: &PanelKind, is_exposed_end: bool) -> Option<[FaceFinish; 2]> {
    use FaceFinish::{Inner, None as Bare, Outer};

    let faces = match kind {
        PanelKind::Shutter | PanelKind::Door | PanelKind::DrawerFront => [Outer, Outer],
        PanelKind::Side | PanelKind::LoftSide => {
            if is_exposed_end {
                [Inner, Outer]
            } else {
                [Inner, Bare]
            }
        }
        PanelKind::Top
        | PanelKind::Bottom
        | PanelKind::Partition
        | PanelKind::Shelf
        | PanelKind::LoftTop
        | PanelKind::LoftBottom
        | PanelKind::LoftShelf
        | PanelKind::LoftPartition => [Inner, Bare],
        PanelKind::Back | PanelKind::LoftBack => [Bare, Bare],
        PanelKind::Unmapped(_) => return None,
    };
    Some(faces)
}

/// Bottles of adhesive for `laminated_area` sqft of glued surface.
pub fn adhesive_bottles(laminated_area: f64, waste: f64, coverage_sqft: f64) -> u32 {
    geometry::units_needed(laminated_area * (1.0 + waste), coverage_sqft)
}

/// Classifies both faces of every panel and totals outer and inner area.
///
/// Pre-laminated jobs and panels cut from pre-laminated boards contribute
/// no area.
pub fn resolve_finishes(
    panels: &[Panel],
    topology: &FinishTopology,
    config: &EstimatorConfig,
) -> FinishSummary {
    let mut summary = FinishSummary::empty(topology.outer_finish);
    if topology.pre_laminated {
        debug!("pre-laminated job, no applied finish");
        return summary;
    }

    for panel in panels {
        let faces = if panel.material.board.is_pre_laminated() {
            [FaceFinish::None, FaceFinish::None]
        } else {
            match face_assignment(&panel.kind, panel.is_exposed_end) {
                Some(faces) => faces,
                None => {
                    warn!(panel = %panel.id, kind = %panel.kind, "no face assignment for panel kind, leaving unfinished");
                    summary.flagged.push(panel.id.clone());
                    [FaceFinish::None, FaceFinish::None]
                }
            }
        };

        let count = |target: FaceFinish| faces.iter().filter(|&&f| f == target).count() as f64;
        let area = geometry::mm2_to_sqft(panel.total_area());
        let outer_area = area * count(FaceFinish::Outer);
        let inner_area = area * count(FaceFinish::Inner);

        summary.outer_area += outer_area;
        summary.inner_area += inner_area;
        summary.panels.push(PanelFinish {
            panel_id: panel.id.clone(),
            kind: panel.kind.clone(),
            quantity: panel.quantity,
            faces,
            outer_area,
            inner_area,
        });
    }

    summary.laminated_area = summary.outer_area + summary.inner_area;
    summary.adhesive_bottles = adhesive_bottles(
        summary.laminated_area,
        config.adhesive_waste,
        config.adhesive_coverage_sqft,
    );
    debug!(
        outer = summary.outer_area,
        inner = summary.inner_area,
        bottles = summary.adhesive_bottles,
        "resolved finishes"
    );
    summary
}
