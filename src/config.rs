use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, ParseError, Result};

/// Order in which panel copies are offered to the nesting engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Descending area.
    #[default]
    Area,
    /// Descending longest side.
    MaxSide,
}

impl FromStr for SortOrder {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "area" => Ok(SortOrder::Area),
            "max-side" => Ok(SortOrder::MaxSide),
            _ => Err(ParseError(format!(
                "invalid sort order '{}', expected: area or max-side",
                s
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Area => f.write_str("area"),
            SortOrder::MaxSide => f.write_str("max-side"),
        }
    }
}

/// Constants used to turn nested and derived quantities into purchase units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub order: SortOrder,
    /// Area of one standard 8x4 sheet in sqft. Sizes laminate sheets and
    /// converts per-sheet product prices to per-sqft rates.
    pub standard_sheet_sqft: f64,
    /// Fixed wastage allowance on edge-band length.
    pub edge_band_wastage: f64,
    pub edge_band_roll_m: f64,
    /// Wastage allowance on glued area.
    pub adhesive_waste: f64,
    pub adhesive_coverage_sqft: f64,
}

impl EstimatorConfig {
    pub const DEFAULT_STANDARD_SHEET_SQFT: f64 = 32.0;
    pub const DEFAULT_EDGE_BAND_WASTAGE: f64 = 0.05;
    pub const DEFAULT_EDGE_BAND_ROLL_M: f64 = 50.0;
    pub const DEFAULT_ADHESIVE_WASTE: f64 = 0.10;
    pub const DEFAULT_ADHESIVE_COVERAGE_SQFT: f64 = 32.0;

    /// Rejects constants that would zero out or blow up purchase quantities.
    pub fn validate(&self) -> Result<()> {
        let per_unit = [
            ("standard_sheet_sqft", self.standard_sheet_sqft),
            ("edge_band_roll_m", self.edge_band_roll_m),
            ("adhesive_coverage_sqft", self.adhesive_coverage_sqft),
        ];
        for (name, value) in per_unit {
            if !value.is_finite() || value <= 0.0 {
                return Err(EstimateError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let wastage = [
            ("edge_band_wastage", self.edge_band_wastage),
            ("adhesive_waste", self.adhesive_waste),
        ];
        for (name, value) in wastage {
            if !value.is_finite() || value < 0.0 {
                return Err(EstimateError::InvalidConfig(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            order: SortOrder::Area,
            standard_sheet_sqft: Self::DEFAULT_STANDARD_SHEET_SQFT,
            edge_band_wastage: Self::DEFAULT_EDGE_BAND_WASTAGE,
            edge_band_roll_m: Self::DEFAULT_EDGE_BAND_ROLL_M,
            adhesive_waste: Self::DEFAULT_ADHESIVE_WASTE,
            adhesive_coverage_sqft: Self::DEFAULT_ADHESIVE_COVERAGE_SQFT,
        }
    }
}
