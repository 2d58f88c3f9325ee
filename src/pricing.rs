//! Rate resolution for every purchasable key.
//!
//! A rate is resolved through three tiers, in this order:
//!
//! 1. A configuration record with a linked product and real pricing
//!    enabled: the product's unit price. Finishes sold by the sheet are
//!    converted to a per-sqft rate over the standard sheet area, boards
//!    over the billed area of the stock sheet being nested.
//! 2. A configuration record with a custom price: that price.
//! 3. The built-in default rate table.
//!
//! Configuration records come from a caller-supplied [`PriceLookup`]. A key
//! that resolves at no tier is an error, never a zero rate. Negative or
//! non-finite prices in a record are skipped and the next tier is tried.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EstimateError, Result};
use crate::finish::FinishType;
use crate::types::{BandClass, BandGrade, BoardType, MaterialClass};

/// Anything that needs a rate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriceKey {
    /// Per sqft.
    Board(MaterialClass),
    /// Per sqft.
    Finish(FinishType),
    /// Per roll.
    EdgeBand(BandClass),
    /// Per piece, keyed by lowercase name.
    Hardware(String),
    /// Per bottle.
    Adhesive,
}

impl PriceKey {
    pub fn hardware(name: &str) -> Self {
        PriceKey::Hardware(normalize_name(name))
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceKey::Board(material) => write!(f, "board:{}", material),
            PriceKey::Finish(finish) => write!(f, "finish:{}", finish),
            PriceKey::EdgeBand(band) => write!(f, "edge-band:{}", band),
            PriceKey::Hardware(name) => write!(f, "hardware:{}", name),
            PriceKey::Adhesive => f.write_str("adhesive"),
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaleUnit {
    Sheet,
    SquareFoot,
    Piece,
    Roll,
    Bottle,
}

/// A real catalogue product a configuration record points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedProduct {
    #[serde(default)]
    pub name: String,
    pub unit_price: f64,
    pub unit: SaleUnit,
}

/// Configuration for one key, as stored by the surrounding application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(default)]
    pub linked_product: Option<LinkedProduct>,
    #[serde(default)]
    pub use_real_pricing: bool,
    #[serde(default)]
    pub custom_price: Option<f64>,
}

impl PriceRecord {
    pub fn linked(product: LinkedProduct) -> Self {
        Self {
            linked_product: Some(product),
            use_real_pricing: true,
            custom_price: None,
        }
    }

    pub fn custom(price: f64) -> Self {
        Self {
            custom_price: Some(price),
            ..Self::default()
        }
    }

    pub fn with_custom_price(mut self, price: f64) -> Self {
        self.custom_price = Some(price);
        self
    }
}

/// Configuration and linked-product lookup supplied by the caller.
///
/// Must be free of side effects; it is queried at most once per key per
/// estimation call.
pub trait PriceLookup {
    fn lookup(&self, key: &PriceKey) -> Option<PriceRecord>;
}

impl<F> PriceLookup for F
where
    F: Fn(&PriceKey) -> Option<PriceRecord>,
{
    fn lookup(&self, key: &PriceKey) -> Option<PriceRecord> {
        self(key)
    }
}

/// No configuration at all; every key falls through to the default table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPricing;

impl PriceLookup for DefaultPricing {
    fn lookup(&self, _key: &PriceKey) -> Option<PriceRecord> {
        None
    }
}

/// In-memory configuration records keyed by the key's text form, e.g.
/// `"board:18mm plywood"` or `"hardware:hinge"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceBook {
    records: HashMap<String, PriceRecord>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &PriceKey, record: PriceRecord) {
        self.records.insert(key.to_string(), record);
    }

    pub fn with(mut self, key: &PriceKey, record: PriceRecord) -> Self {
        self.insert(key, record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PriceLookup for PriceBook {
    fn lookup(&self, key: &PriceKey) -> Option<PriceRecord> {
        self.records.get(&key.to_string()).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateSource {
    LinkedProduct,
    Custom,
    Default,
}

/// A resolved unit rate and the tier it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rate {
    pub value: f64,
    pub source: RateSource,
}

const BOARD_THICKNESSES: [u16; 8] = [6, 8, 9, 12, 16, 18, 19, 25];
const BAND_WIDTHS: [u16; 5] = [19, 22, 25, 36, 45];

/// Built-in fallback rates.
pub fn default_rate(key: &PriceKey) -> Option<f64> {
    match key {
        PriceKey::Board(material) => {
            if !BOARD_THICKNESSES.contains(&material.thickness_mm) {
                return None;
            }
            // Per sqft at 18mm, scaled linearly by thickness.
            let base = match material.board {
                BoardType::Plywood => 95.0,
                BoardType::Mdf => 55.0,
                BoardType::Hdhmr => 75.0,
                BoardType::ParticleBoard => 40.0,
                BoardType::BlockBoard => 85.0,
                BoardType::PreLaminatedParticleBoard => 55.0,
                BoardType::PreLaminatedMdf => 70.0,
            };
            Some(base * material.thickness_mm as f64 / 18.0)
        }
        PriceKey::Finish(finish) => Some(match finish {
            FinishType::Laminate => 45.0,
            FinishType::Acrylic => 140.0,
            FinishType::Veneer => 110.0,
            FinishType::Paint => 65.0,
            FinishType::Membrane => 90.0,
        }),
        PriceKey::EdgeBand(band) => {
            if !BAND_WIDTHS.contains(&band.width_mm) {
                return None;
            }
            // Per roll, per mm of tape width.
            let per_mm = match band.grade {
                BandGrade::Thin => 16.0,
                BandGrade::Medium => 26.0,
                BandGrade::Thick => 40.0,
            };
            Some(per_mm * band.width_mm as f64)
        }
        PriceKey::Hardware(name) => match name.as_str() {
            "hinge" => Some(45.0),
            "soft-close hinge" => Some(120.0),
            "drawer slide" | "telescopic slide" => Some(350.0),
            "soft-close slide" => Some(900.0),
            "handle" => Some(150.0),
            "knob" => Some(60.0),
            "lock" => Some(180.0),
            "connector" => Some(8.0),
            "minifix" => Some(12.0),
            "shelf support" => Some(3.0),
            "wardrobe rail" => Some(250.0),
            "rail bracket" => Some(20.0),
            "leg" => Some(40.0),
            "gas lift" => Some(300.0),
            _ => None,
        },
        PriceKey::Adhesive => Some(450.0),
    }
}

fn valid_price(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Resolves rates for one estimation call, querying the lookup once per
/// distinct key. Never shared across calls.
pub struct PriceResolver<'a, L: PriceLookup + ?Sized> {
    lookup: &'a L,
    standard_sheet_sqft: f64,
    board_sheet_sqft: f64,
    cache: HashMap<PriceKey, Option<Rate>>,
}

impl<'a, L: PriceLookup + ?Sized> PriceResolver<'a, L> {
    pub fn new(lookup: &'a L, standard_sheet_sqft: f64) -> Self {
        Self {
            lookup,
            standard_sheet_sqft,
            board_sheet_sqft: standard_sheet_sqft,
            cache: HashMap::new(),
        }
    }

    /// Billed sqft of one stock board sheet, used to convert per-sheet
    /// board products. Defaults to the standard sheet area.
    pub fn with_board_sheet_sqft(mut self, sqft: f64) -> Self {
        self.board_sheet_sqft = sqft;
        self
    }

    pub fn rate(&mut self, key: &PriceKey) -> Result<Rate> {
        let rate = match self.cache.get(key) {
            Some(cached) => *cached,
            None => {
                let resolved = self.resolve(key);
                self.cache.insert(key.clone(), resolved);
                resolved
            }
        };
        rate.ok_or_else(|| EstimateError::PriceUnavailable {
            key: key.to_string(),
        })
    }

    fn resolve(&self, key: &PriceKey) -> Option<Rate> {
        if let Some(record) = self.lookup.lookup(key) {
            if record.use_real_pricing
                && let Some(product) = &record.linked_product
            {
                let value = self.convert(key, product);
                if valid_price(value) {
                    debug!(key = %key, product = %product.name, value, "linked product rate");
                    return Some(Rate {
                        value,
                        source: RateSource::LinkedProduct,
                    });
                }
                warn!(key = %key, product = %product.name, unit_price = product.unit_price, "ignoring invalid linked product price");
            }
            if let Some(value) = record.custom_price {
                if valid_price(value) {
                    debug!(key = %key, value, "custom rate");
                    return Some(Rate {
                        value,
                        source: RateSource::Custom,
                    });
                }
                warn!(key = %key, value, "ignoring invalid custom price");
            }
        }

        let rate = default_rate(key).map(|value| Rate {
            value,
            source: RateSource::Default,
        });
        debug!(key = %key, found = rate.is_some(), "default rate");
        rate
    }

    fn convert(&self, key: &PriceKey, product: &LinkedProduct) -> f64 {
        match key {
            PriceKey::Board(_) if product.unit == SaleUnit::Sheet => product.unit_price / self.board_sheet_sqft,
            PriceKey::Finish(_) if product.unit == SaleUnit::Sheet => product.unit_price / self.standard_sheet_sqft,
            _ => product.unit_price,
        }
    }

    /// Number of distinct keys queried so far.
    pub fn lookups(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ply18() -> PriceKey {
        PriceKey::Board(MaterialClass::new(BoardType::Plywood, 18))
    }

    fn sheet_product(price: f64) -> LinkedProduct {
        LinkedProduct {
            name: "BWP ply 8x4".to_string(),
            unit_price: price,
            unit: SaleUnit::Sheet,
        }
    }

    #[test]
    fn test_linked_product_wins_over_custom() {
        let book = PriceBook::new().with(
            &ply18(),
            PriceRecord::linked(sheet_product(3200.0)).with_custom_price(80.0),
        );
        let mut resolver = PriceResolver::new(&book, 32.0);
        let rate = resolver.rate(&ply18()).unwrap();
        assert_eq!(rate.source, RateSource::LinkedProduct);
        assert_eq!(rate.value, 100.0);
    }

    #[test]
    fn test_custom_wins_over_default() {
        let book = PriceBook::new().with(&ply18(), PriceRecord::custom(80.0));
        let mut resolver = PriceResolver::new(&book, 32.0);
        let rate = resolver.rate(&ply18()).unwrap();
        assert_eq!(rate, Rate { value: 80.0, source: RateSource::Custom });
    }

    #[test]
    fn test_linked_product_ignored_without_real_pricing() {
        let mut record = PriceRecord::linked(sheet_product(3200.0)).with_custom_price(80.0);
        record.use_real_pricing = false;
        let book = PriceBook::new().with(&ply18(), record);
        let mut resolver = PriceResolver::new(&book, 32.0);
        assert_eq!(resolver.rate(&ply18()).unwrap().source, RateSource::Custom);

        let mut record = PriceRecord::linked(sheet_product(3200.0));
        record.use_real_pricing = false;
        let book = PriceBook::new().with(&ply18(), record);
        let mut resolver = PriceResolver::new(&book, 32.0);
        assert_eq!(resolver.rate(&ply18()).unwrap().source, RateSource::Default);
    }

    #[test]
    fn test_default_table() {
        let mut resolver = PriceResolver::new(&DefaultPricing, 32.0);
        let rate = resolver.rate(&ply18()).unwrap();
        assert_eq!(rate, Rate { value: 95.0, source: RateSource::Default });

        let ply9 = PriceKey::Board(MaterialClass::new(BoardType::Plywood, 9));
        assert_eq!(resolver.rate(&ply9).unwrap().value, 47.5);

        let band = PriceKey::EdgeBand(BandClass::new(BandGrade::Thin, 22));
        assert_eq!(resolver.rate(&band).unwrap().value, 352.0);

        assert_eq!(resolver.rate(&PriceKey::hardware("  Soft-Close   Hinge")).unwrap().value, 120.0);
    }

    #[test]
    fn test_non_sheet_units_are_not_converted() {
        let hinge = PriceKey::hardware("hinge");
        let book = PriceBook::new().with(
            &hinge,
            PriceRecord::linked(LinkedProduct {
                name: "Hettich 110".to_string(),
                unit_price: 95.0,
                unit: SaleUnit::Piece,
            }),
        );
        let mut resolver = PriceResolver::new(&book, 32.0);
        assert_eq!(resolver.rate(&hinge).unwrap().value, 95.0);

        let laminate = PriceKey::Finish(FinishType::Laminate);
        let book = PriceBook::new().with(
            &laminate,
            PriceRecord::linked(LinkedProduct {
                name: "1mm suede".to_string(),
                unit_price: 50.0,
                unit: SaleUnit::SquareFoot,
            }),
        );
        let mut resolver = PriceResolver::new(&book, 32.0);
        assert_eq!(resolver.rate(&laminate).unwrap().value, 50.0);
    }

    #[test]
    fn test_missing_price_names_key() {
        let mut resolver = PriceResolver::new(&DefaultPricing, 32.0);
        let err = resolver.rate(&PriceKey::hardware("gold knob")).unwrap_err();
        assert_eq!(
            err,
            EstimateError::PriceUnavailable {
                key: "hardware:gold knob".to_string()
            }
        );

        let odd = PriceKey::Board(MaterialClass::new(BoardType::Mdf, 7));
        assert!(resolver.rate(&odd).is_err());
    }

    #[test]
    fn test_lookup_once_per_key() {
        let calls = Cell::new(0);
        let lookup = |_key: &PriceKey| -> Option<PriceRecord> {
            calls.set(calls.get() + 1);
            None
        };
        let mut resolver = PriceResolver::new(&lookup, 32.0);
        for _ in 0..3 {
            resolver.rate(&ply18()).unwrap();
            let _ = resolver.rate(&PriceKey::hardware("gold knob"));
        }
        assert_eq!(calls.get(), 2);
        assert_eq!(resolver.lookups(), 2);
    }

    #[test]
    fn test_invalid_prices_fall_through() {
        let record = PriceRecord::linked(sheet_product(-3200.0)).with_custom_price(80.0);
        let book = PriceBook::new().with(&ply18(), record);
        let mut resolver = PriceResolver::new(&book, 32.0);
        assert_eq!(resolver.rate(&ply18()).unwrap(), Rate { value: 80.0, source: RateSource::Custom });

        let book = PriceBook::new().with(&ply18(), PriceRecord::custom(f64::NAN));
        let mut resolver = PriceResolver::new(&book, 32.0);
        assert_eq!(resolver.rate(&ply18()).unwrap(), Rate { value: 95.0, source: RateSource::Default });

        let hinge = PriceKey::hardware("gold knob");
        let book = PriceBook::new().with(&hinge, PriceRecord::custom(-5.0));
        let mut resolver = PriceResolver::new(&book, 32.0);
        assert!(matches!(resolver.rate(&hinge), Err(EstimateError::PriceUnavailable { .. })));
    }

    #[test]
    fn test_board_sheet_product_uses_stock_area() {
        let laminate = PriceKey::Finish(FinishType::Laminate);
        let book = PriceBook::new()
            .with(&ply18(), PriceRecord::linked(sheet_product(3200.0)))
            .with(
                &laminate,
                PriceRecord::linked(LinkedProduct {
                    name: "1mm suede 8x4".to_string(),
                    unit_price: 1600.0,
                    unit: SaleUnit::Sheet,
                }),
            );
        let mut resolver = PriceResolver::new(&book, 32.0).with_board_sheet_sqft(50.0);
        assert_eq!(resolver.rate(&ply18()).unwrap().value, 64.0);
        assert_eq!(resolver.rate(&laminate).unwrap().value, 50.0);
    }

    #[test]
    fn test_price_book_from_json() {
        let book: PriceBook = serde_json::from_str(
            r#"{
                "board:18mm plywood": {"linked_product": {"unit_price": 3520, "unit": "sheet"}, "use_real_pricing": true},
                "hardware:hinge": {"custom_price": 60}
            }"#,
        )
        .unwrap();
        assert_eq!(book.len(), 2);
        let mut resolver = PriceResolver::new(&book, 32.0);
        assert_eq!(resolver.rate(&ply18()).unwrap().value, 110.0);
        assert_eq!(resolver.rate(&PriceKey::hardware("Hinge")).unwrap().value, 60.0);
    }
}
