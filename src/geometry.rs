//! Unit conversions between layout millimetres and purchase units.

/// Square millimetres in one square foot.
pub const MM2_PER_SQFT: f64 = 92_903.04;

pub fn mm2_to_sqft(mm2: f64) -> f64 {
    mm2 / MM2_PER_SQFT
}

pub fn mm_to_m(mm: f64) -> f64 {
    mm / 1000.0
}

/// Length of the banded edges of a `w` x `h` panel.
pub fn banded_length(w: f64, h: f64, long_edges: u8, short_edges: u8) -> f64 {
    let long = w.max(h);
    let short = w.min(h);
    long * long_edges as f64 + short * short_edges as f64
}

/// Whole purchase units needed to cover `need`, each unit holding `per_unit`.
///
/// Quotients within 1e-9 of an integer are not bumped to the next unit.
pub fn units_needed(need: f64, per_unit: f64) -> u32 {
    if need <= 0.0 || per_unit <= 0.0 {
        return 0;
    }
    (need / per_unit - 1e-9).ceil().max(0.0) as u32
}

/// Rounds to the currency's smallest unit (1/100).
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
