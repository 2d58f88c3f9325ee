use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, ParseError, Result};
use crate::geometry;

/// Tolerance for millimetre comparisons.
pub const EPSILON: f64 = 1e-6;

/// Longest side accepted for a panel, in mm.
pub const MAX_PANEL_DIMENSION: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    pub fn max_side(&self) -> f64 {
        self.w.max(self.h)
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w + EPSILON && self.h <= other.h + EPSILON
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Structural role of a panel inside a unit.
///
/// Unknown role names are kept verbatim in [`PanelKind::Unmapped`] so the
/// finish resolver can flag them instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PanelKind {
    Side,
    Top,
    Bottom,
    Shelf,
    Partition,
    Back,
    Shutter,
    Door,
    DrawerFront,
    LoftSide,
    LoftTop,
    LoftBottom,
    LoftShelf,
    LoftPartition,
    LoftBack,
    Unmapped(String),
}

impl PanelKind {
    pub fn as_str(&self) -> &str {
        match self {
            PanelKind::Side => "side",
            PanelKind::Top => "top",
            PanelKind::Bottom => "bottom",
            PanelKind::Shelf => "shelf",
            PanelKind::Partition => "partition",
            PanelKind::Back => "back",
            PanelKind::Shutter => "shutter",
            PanelKind::Door => "door",
            PanelKind::DrawerFront => "drawer-front",
            PanelKind::LoftSide => "loft-side",
            PanelKind::LoftTop => "loft-top",
            PanelKind::LoftBottom => "loft-bottom",
            PanelKind::LoftShelf => "loft-shelf",
            PanelKind::LoftPartition => "loft-partition",
            PanelKind::LoftBack => "loft-back",
            PanelKind::Unmapped(name) => name,
        }
    }
}

impl From<&str> for PanelKind {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "side" => PanelKind::Side,
            "top" => PanelKind::Top,
            "bottom" => PanelKind::Bottom,
            "shelf" => PanelKind::Shelf,
            "partition" => PanelKind::Partition,
            "back" => PanelKind::Back,
            "shutter" => PanelKind::Shutter,
            "door" => PanelKind::Door,
            "drawer-front" => PanelKind::DrawerFront,
            "loft-side" => PanelKind::LoftSide,
            "loft-top" => PanelKind::LoftTop,
            "loft-bottom" => PanelKind::LoftBottom,
            "loft-shelf" => PanelKind::LoftShelf,
            "loft-partition" => PanelKind::LoftPartition,
            "loft-back" => PanelKind::LoftBack,
            _ => PanelKind::Unmapped(s.to_string()),
        }
    }
}

impl From<String> for PanelKind {
    fn from(s: String) -> Self {
        PanelKind::from(s.as_str())
    }
}

impl From<PanelKind> for String {
    fn from(kind: PanelKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grain direction a panel must keep on the sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grain {
    #[default]
    None,
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoardType {
    Plywood,
    Mdf,
    Hdhmr,
    ParticleBoard,
    BlockBoard,
    PreLaminatedParticleBoard,
    PreLaminatedMdf,
}

impl BoardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardType::Plywood => "plywood",
            BoardType::Mdf => "mdf",
            BoardType::Hdhmr => "hdhmr",
            BoardType::ParticleBoard => "particle-board",
            BoardType::BlockBoard => "block-board",
            BoardType::PreLaminatedParticleBoard => "pre-laminated-particle-board",
            BoardType::PreLaminatedMdf => "pre-laminated-mdf",
        }
    }

    /// Factory-finished boards need no applied surface.
    pub fn is_pre_laminated(&self) -> bool {
        matches!(
            self,
            BoardType::PreLaminatedParticleBoard | BoardType::PreLaminatedMdf
        )
    }
}

impl FromStr for BoardType {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "plywood" | "ply" => Ok(BoardType::Plywood),
            "mdf" => Ok(BoardType::Mdf),
            "hdhmr" => Ok(BoardType::Hdhmr),
            "particle-board" | "particleboard" => Ok(BoardType::ParticleBoard),
            "block-board" | "blockboard" => Ok(BoardType::BlockBoard),
            "pre-laminated-particle-board" | "prelam-particle-board" => {
                Ok(BoardType::PreLaminatedParticleBoard)
            }
            "pre-laminated-mdf" | "prelam-mdf" => Ok(BoardType::PreLaminatedMdf),
            _ => Err(ParseError(format!("unknown board type '{}'", s))),
        }
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Board type qualified by thickness, written as `18mm plywood`.
///
/// Each material class is nested on its own sheet sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaterialClass {
    pub board: BoardType,
    pub thickness_mm: u16,
}

impl MaterialClass {
    pub fn new(board: BoardType, thickness_mm: u16) -> Self {
        Self {
            board,
            thickness_mm,
        }
    }
}

impl FromStr for MaterialClass {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (thickness, board) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| ParseError(format!("invalid material class '{}', expected '<n>mm <board>'", s)))?;
        let thickness_mm = thickness
            .trim_end_matches("mm")
            .parse::<u16>()
            .map_err(|_| ParseError(format!("invalid thickness in '{}'", s)))?;
        if thickness_mm == 0 {
            return Err(ParseError(format!("thickness must be non-zero in '{}'", s)));
        }
        Ok(Self {
            board: board.parse()?,
            thickness_mm,
        })
    }
}

impl TryFrom<String> for MaterialClass {
    type Error = ParseError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MaterialClass> for String {
    fn from(m: MaterialClass) -> Self {
        m.to_string()
    }
}

impl fmt::Display for MaterialClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mm {}", self.thickness_mm, self.board)
    }
}

/// Edge-band tape thickness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandGrade {
    /// 0.8mm
    Thin,
    /// 1.3mm
    Medium,
    /// 2mm
    Thick,
}

impl BandGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            BandGrade::Thin => "0.8",
            BandGrade::Medium => "1.3",
            BandGrade::Thick => "2",
        }
    }
}

/// Edge-band tape class, written as `0.8x22` (thickness x width in mm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BandClass {
    pub grade: BandGrade,
    pub width_mm: u16,
}

impl BandClass {
    pub fn new(grade: BandGrade, width_mm: u16) -> Self {
        Self { grade, width_mm }
    }
}

impl FromStr for BandClass {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (grade, width) = s
            .trim()
            .trim_end_matches("mm")
            .split_once('x')
            .ok_or_else(|| ParseError(format!("invalid band class '{}', expected TxW", s)))?;
        let grade = match grade.trim_end_matches("mm") {
            "0.8" => BandGrade::Thin,
            "1.3" => BandGrade::Medium,
            "2" | "2.0" => BandGrade::Thick,
            other => return Err(ParseError(format!("unsupported band thickness '{}'", other))),
        };
        let width_mm = width
            .parse::<u16>()
            .map_err(|_| ParseError(format!("invalid band width in '{}'", s)))?;
        Ok(Self { grade, width_mm })
    }
}

impl TryFrom<String> for BandClass {
    type Error = ParseError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BandClass> for String {
    fn from(b: BandClass) -> Self {
        b.to_string()
    }
}

impl fmt::Display for BandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.grade.as_str(), self.width_mm)
    }
}

/// Which edges of a panel receive edge banding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeBand {
    pub class: BandClass,
    #[serde(default)]
    pub long_edges: u8,
    #[serde(default)]
    pub short_edges: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub id: String,
    pub kind: PanelKind,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub material: MaterialClass,
    #[serde(default = "default_true")]
    pub allow_rotate: bool,
    #[serde(default)]
    pub grain: Grain,
    #[serde(default)]
    pub is_exposed_end: bool,
    #[serde(default)]
    pub edge_band: Option<EdgeBand>,
}

fn default_quantity() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Panel {
    pub fn new(
        id: impl Into<String>,
        kind: PanelKind,
        width: f64,
        height: f64,
        material: MaterialClass,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            width,
            height,
            quantity: 1,
            material,
            allow_rotate: true,
            grain: Grain::None,
            is_exposed_end: false,
            edge_band: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Grain-aligned panels never rotate.
    pub fn with_grain(mut self, grain: Grain) -> Self {
        self.grain = grain;
        if grain != Grain::None {
            self.allow_rotate = false;
        }
        self
    }

    pub fn with_rotation(mut self, allow_rotate: bool) -> Self {
        self.allow_rotate = allow_rotate;
        self
    }

    pub fn exposed_end(mut self, exposed: bool) -> Self {
        self.is_exposed_end = exposed;
        self
    }

    pub fn with_edge_band(mut self, class: BandClass, long_edges: u8, short_edges: u8) -> Self {
        self.edge_band = Some(EdgeBand {
            class,
            long_edges,
            short_edges,
        });
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }

    /// Area of one copy in mm².
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Area of all copies in mm².
    pub fn total_area(&self) -> f64 {
        self.area() * self.quantity as f64
    }

    /// A grain direction overrides `allow_rotate`.
    pub fn can_rotate(&self) -> bool {
        self.allow_rotate && self.grain == Grain::None
    }

    /// Banded edge length of one copy in mm.
    pub fn banded_length(&self) -> f64 {
        match &self.edge_band {
            Some(band) => geometry::banded_length(
                self.width,
                self.height,
                band.long_edges,
                band.short_edges,
            ),
            None => 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| EstimateError::InvalidPanel {
            id: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("panel id must not be empty".to_string()));
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(invalid(format!("width must be positive, got {}", self.width)));
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(invalid(format!("height must be positive, got {}", self.height)));
        }
        if self.width > MAX_PANEL_DIMENSION || self.height > MAX_PANEL_DIMENSION {
            return Err(invalid(format!(
                "{}x{} exceeds the {} mm limit per side",
                self.width, self.height, MAX_PANEL_DIMENSION
            )));
        }
        if self.quantity < 1 {
            return Err(invalid("quantity must be at least 1".to_string()));
        }
        if let Some(band) = &self.edge_band
            && (band.long_edges > 2 || band.short_edges > 2)
        {
            return Err(invalid(format!(
                "a panel has two long and two short edges, got {} long and {} short banded",
                band.long_edges, band.short_edges
            )));
        }
        Ok(())
    }
}

/// A named, quantified hardware line determined upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareItem {
    pub name: String,
    pub qty: u32,
}

impl HardwareItem {
    pub fn new(name: impl Into<String>, qty: u32) -> Self {
        Self {
            name: name.into(),
            qty,
        }
    }
}

/// Raw stock sheet and cutting process parameters, in mm.
///
/// `length` runs along the x axis of a layout, `width` along y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SheetSpec {
    pub length: f64,
    pub width: f64,
    #[serde(default)]
    pub kerf: f64,
    #[serde(default)]
    pub margin: f64,
}

impl Default for SheetSpec {
    fn default() -> Self {
        Self {
            length: 2440.0,
            width: 1220.0,
            kerf: 3.0,
            margin: 10.0,
        }
    }
}

impl SheetSpec {
    pub fn new(length: f64, width: f64, kerf: f64, margin: f64) -> Self {
        Self {
            length,
            width,
            kerf,
            margin,
        }
    }

    pub fn usable_width(&self) -> f64 {
        self.length - 2.0 * self.margin
    }

    pub fn usable_height(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    pub fn usable(&self) -> Rect {
        Rect::new(self.usable_width(), self.usable_height())
    }

    /// Billed area of one sheet in sqft. `standard_sqft` is the billed area
    /// of the default 2440x1220 stock; other sizes scale with their area.
    pub fn billed_sqft(&self, standard_sqft: f64) -> f64 {
        let standard = Self::default();
        standard_sqft * (self.length * self.width) / (standard.length * standard.width)
    }

    /// Sheet area minus the trimmed margins, in mm².
    pub fn net_area(&self) -> f64 {
        self.usable().area()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.length.is_finite() || !self.width.is_finite() || self.length <= 0.0 || self.width <= 0.0 {
            return Err(EstimateError::InvalidSheet(format!(
                "sheet dimensions must be positive, got {}x{}",
                self.length, self.width
            )));
        }
        if !self.kerf.is_finite() || self.kerf < 0.0 {
            return Err(EstimateError::InvalidSheet(format!(
                "kerf must not be negative, got {}",
                self.kerf
            )));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(EstimateError::InvalidSheet(format!(
                "margin must not be negative, got {}",
                self.margin
            )));
        }
        if self.usable_width() <= 0.0 || self.usable_height() <= 0.0 {
            return Err(EstimateError::InvalidSheet(format!(
                "margin {} leaves no usable area on a {}x{} sheet",
                self.margin, self.length, self.width
            )));
        }
        Ok(())
    }
}

/// One panel copy fitted onto a sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub panel_id: String,
    /// Copy index, 0-based, among the panel's `quantity` copies.
    pub instance: u32,
    pub x: f64,
    pub y: f64,
    pub placed_width: f64,
    pub placed_height: f64,
    pub rotated: bool,
}

impl Placement {
    pub fn area(&self) -> f64 {
        self.placed_width * self.placed_height
    }

    pub fn right(&self) -> f64 {
        self.x + self.placed_width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.placed_height
    }
}
