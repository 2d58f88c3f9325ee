use thiserror::Error;

/// Failures that abort an estimation call. No partial results are returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("invalid panel '{id}': {reason}")]
    InvalidPanel { id: String, reason: String },

    #[error("invalid sheet: {0}")]
    InvalidSheet(String),

    #[error("invalid estimator config: {0}")]
    InvalidConfig(String),

    /// A tiled piece still exceeds a fresh sheet. Indicates a tiling bug.
    #[error(
        "panel '{id}' ({width}x{height}) does not fit a fresh sheet with usable area {usable_width}x{usable_height}"
    )]
    UnplaceablePanel {
        id: String,
        width: f64,
        height: f64,
        usable_width: f64,
        usable_height: f64,
    },

    #[error("no price available for '{key}'")]
    PriceUnavailable { key: String },
}

pub type Result<T> = std::result::Result<T, EstimateError>;

/// Text-form parse failure for material, band and option names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub String);
