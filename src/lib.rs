//! Furniture build estimation: nest panels onto stock sheets and price the
//! resulting purchase list.
//!
//! The pipeline for one call is
//! [`tiler`] → [`solver`] → [`finish`] → [`purchase`], driven by
//! [`estimate::nest_and_price`]. Everything is a pure function of the
//! request and the caller's [`pricing::PriceLookup`].

pub mod config;
pub mod error;
pub mod estimate;
pub mod finish;
pub mod geometry;
pub mod guillotine;
pub mod pricing;
pub mod purchase;
pub mod render;
pub mod solver;
pub mod templates;
pub mod tiler;
pub mod types;

pub use config::{EstimatorConfig, SortOrder};
pub use error::{EstimateError, Result};
pub use estimate::{Estimate, EstimateRequest, nest_and_price};
pub use finish::{FinishSummary, FinishTopology, FinishType};
pub use pricing::{PriceBook, PriceKey, PriceLookup, PriceRecord};
pub use purchase::PurchaseRequirements;
pub use solver::NestingResult;
pub use types::{HardwareItem, MaterialClass, Panel, PanelKind, SheetSpec};
