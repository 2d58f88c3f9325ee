//! Panel and hardware lists for whole furniture units.
//!
//! The estimator core only sees [`Panel`]s. A [`PanelTemplate`] turns a
//! parametric [`UnitSpec`] into those panels; callers with their own unit
//! types implement the trait without touching nesting or pricing.

use serde::{Deserialize, Serialize};

use crate::types::{BandClass, BandGrade, BoardType, HardwareItem, MaterialClass, Panel, PanelKind};

/// Gap left around each shutter or drawer front, in mm.
const FRONT_GAP: f64 = 3.0;
/// Shelves stand back from the front edge by this much, in mm.
const SHELF_SETBACK: f64 = 20.0;
/// Depth of the front and back top rails on a kitchen base, in mm.
const RAIL_DEPTH: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitType {
    Wardrobe,
    KitchenBase,
    Bookshelf,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoftSpec {
    pub height: f64,
    #[serde(default)]
    pub shutters: u32,
}

/// Parametric description of one furniture unit. Dimensions in mm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Prefix for generated panel ids.
    pub label: String,
    pub unit: UnitType,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub material: MaterialClass,
    #[serde(default)]
    pub back_material: Option<MaterialClass>,
    #[serde(default)]
    pub shutters: u32,
    #[serde(default)]
    pub drawers: u32,
    #[serde(default)]
    pub shelves: u32,
    #[serde(default)]
    pub exposed_left: bool,
    #[serde(default)]
    pub exposed_right: bool,
    #[serde(default)]
    pub loft: Option<LoftSpec>,
    #[serde(default)]
    pub edge_band: Option<BandClass>,
}

impl UnitSpec {
    fn thickness(&self) -> f64 {
        self.material.thickness_mm as f64
    }

    fn back(&self) -> MaterialClass {
        self.back_material
            .unwrap_or_else(|| MaterialClass::new(self.material.board, 8))
    }

    fn band(&self) -> BandClass {
        self.edge_band
            .unwrap_or_else(|| BandClass::new(BandGrade::Thin, 22))
    }

    fn id(&self, part: &str) -> String {
        format!("{}-{}", self.label, part)
    }
}

/// Builds the cut list for a furniture unit type.
pub trait PanelTemplate {
    fn supports(&self, unit: UnitType) -> bool;

    fn panels(&self, spec: &UnitSpec) -> Vec<Panel>;

    fn hardware(&self, spec: &UnitSpec) -> Vec<HardwareItem>;
}

/// Built-in wardrobe, kitchen base and bookshelf templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTemplates;

impl PanelTemplate for StandardTemplates {
    fn supports(&self, unit: UnitType) -> bool {
        matches!(
            unit,
            UnitType::Wardrobe | UnitType::KitchenBase | UnitType::Bookshelf
        )
    }

    fn panels(&self, spec: &UnitSpec) -> Vec<Panel> {
        let mut panels = carcass(spec);
        match spec.unit {
            UnitType::Wardrobe | UnitType::Bookshelf => {
                panels.extend(shutters(spec, PanelKind::Shutter, spec.width, spec.height, spec.shutters, "shutter"));
            }
            UnitType::KitchenBase => {
                if spec.drawers > 0 {
                    panels.extend(drawer_fronts(spec));
                } else {
                    panels.extend(shutters(spec, PanelKind::Door, spec.width, spec.height, spec.shutters, "door"));
                }
            }
        }
        if spec.unit == UnitType::Wardrobe
            && let Some(loft) = &spec.loft
        {
            panels.extend(loft_panels(spec, loft));
        }
        panels
    }

    fn hardware(&self, spec: &UnitSpec) -> Vec<HardwareItem> {
        let mut items = Vec::new();
        let mut fronts = spec.shutters;
        let mut hinges = spec.shutters * hinges_per_shutter(spec.height);
        let mut connectors = 8;

        if spec.unit == UnitType::KitchenBase && spec.drawers > 0 {
            fronts = spec.drawers;
            hinges = 0;
            items.push(HardwareItem::new("telescopic slide", spec.drawers));
        }
        if spec.unit == UnitType::Wardrobe
            && let Some(loft) = &spec.loft
        {
            fronts += loft.shutters;
            hinges += loft.shutters * hinges_per_shutter(loft.height);
            connectors += 8;
        }

        if hinges > 0 {
            items.push(HardwareItem::new("soft-close hinge", hinges));
        }
        if fronts > 0 {
            items.push(HardwareItem::new("handle", fronts));
        }
        if spec.unit == UnitType::Wardrobe && spec.shutters > 0 {
            items.push(HardwareItem::new("lock", 1));
            items.push(HardwareItem::new("wardrobe rail", 1));
            items.push(HardwareItem::new("rail bracket", 2));
        }
        if spec.shelves > 0 {
            items.push(HardwareItem::new("shelf support", spec.shelves * 4));
        }
        if spec.unit == UnitType::KitchenBase {
            items.push(HardwareItem::new("leg", 4));
        }
        items.push(HardwareItem::new("minifix", connectors));
        items
    }
}

fn hinges_per_shutter(height: f64) -> u32 {
    if height <= 900.0 {
        2
    } else if height <= 1600.0 {
        3
    } else {
        4
    }
}

fn carcass(spec: &UnitSpec) -> Vec<Panel> {
    let t = spec.thickness();
    let inner_width = spec.width - 2.0 * t;
    let band = spec.band();
    let mut panels = vec![
        Panel::new(spec.id("side-l"), PanelKind::Side, spec.depth, spec.height, spec.material)
            .exposed_end(spec.exposed_left)
            .with_edge_band(band, 1, 0),
        Panel::new(spec.id("side-r"), PanelKind::Side, spec.depth, spec.height, spec.material)
            .exposed_end(spec.exposed_right)
            .with_edge_band(band, 1, 0),
        Panel::new(spec.id("bottom"), PanelKind::Bottom, inner_width, spec.depth, spec.material)
            .with_edge_band(band, 1, 0),
    ];

    if spec.unit == UnitType::KitchenBase {
        panels.push(
            Panel::new(spec.id("rail"), PanelKind::Top, inner_width, RAIL_DEPTH, spec.material)
                .with_quantity(2)
                .with_edge_band(band, 1, 0),
        );
    } else {
        panels.push(
            Panel::new(spec.id("top"), PanelKind::Top, inner_width, spec.depth, spec.material)
                .with_edge_band(band, 1, 0),
        );
    }

    if spec.shelves > 0 {
        panels.push(
            Panel::new(spec.id("shelf"), PanelKind::Shelf, inner_width, spec.depth - SHELF_SETBACK, spec.material)
                .with_quantity(spec.shelves)
                .with_edge_band(band, 1, 0),
        );
    }

    panels.push(Panel::new(spec.id("back"), PanelKind::Back, spec.width, spec.height, spec.back()));
    panels
}

/// `count` equal fronts side by side across `width`.
fn shutters(spec: &UnitSpec, kind: PanelKind, width: f64, height: f64, count: u32, part: &str) -> Option<Panel> {
    if count == 0 {
        return None;
    }
    let w = width / count as f64 - FRONT_GAP;
    let h = height - FRONT_GAP;
    Some(
        Panel::new(spec.id(part), kind, w, h, spec.material)
            .with_quantity(count)
            .with_edge_band(spec.band(), 2, 2),
    )
}

/// Drawer fronts stacked over the full front.
fn drawer_fronts(spec: &UnitSpec) -> Option<Panel> {
    if spec.drawers == 0 {
        return None;
    }
    let h = spec.height / spec.drawers as f64 - FRONT_GAP;
    Some(
        Panel::new(spec.id("drawer-front"), PanelKind::DrawerFront, spec.width - FRONT_GAP, h, spec.material)
            .with_quantity(spec.drawers)
            .with_edge_band(spec.band(), 2, 2),
    )
}

fn loft_panels(spec: &UnitSpec, loft: &LoftSpec) -> Vec<Panel> {
    let t = spec.thickness();
    let inner_width = spec.width - 2.0 * t;
    let band = spec.band();
    let mut panels = vec![
        Panel::new(spec.id("loft-side-l"), PanelKind::LoftSide, spec.depth, loft.height, spec.material)
            .exposed_end(spec.exposed_left)
            .with_edge_band(band, 1, 0),
        Panel::new(spec.id("loft-side-r"), PanelKind::LoftSide, spec.depth, loft.height, spec.material)
            .exposed_end(spec.exposed_right)
            .with_edge_band(band, 1, 0),
        Panel::new(spec.id("loft-top"), PanelKind::LoftTop, inner_width, spec.depth, spec.material)
            .with_edge_band(band, 1, 0),
        Panel::new(spec.id("loft-bottom"), PanelKind::LoftBottom, inner_width, spec.depth, spec.material)
            .with_edge_band(band, 1, 0),
        Panel::new(spec.id("loft-back"), PanelKind::LoftBack, spec.width, loft.height, spec.back()),
    ];
    panels.extend(shutters(spec, PanelKind::Shutter, spec.width, loft.height, loft.shutters, "loft-shutter"));
    panels
}

impl Default for UnitSpec {
    fn default() -> Self {
        Self {
            label: "unit".to_string(),
            unit: UnitType::Wardrobe,
            width: 1200.0,
            height: 2100.0,
            depth: 560.0,
            material: MaterialClass::new(BoardType::Plywood, 18),
            back_material: None,
            shutters: 0,
            drawers: 0,
            shelves: 0,
            exposed_left: false,
            exposed_right: false,
            loft: None,
            edge_band: None,
        }
    }
}
