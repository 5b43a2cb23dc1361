//! Editable input tables and the state manager that keeps them consistent.

/// Transport activity by year.
pub mod activity;
/// Year x fuel share matrix with derived totals.
pub mod fuel;
/// Session-scoped table state, edits and validation.
pub mod state;

pub use activity::ActivityVector;
pub use fuel::{FuelShareMatrix, WideRow};
pub use state::{TableSnapshot, TableStateManager, ValidationReport};

use crate::error::TableError;

/// Inclusive bounds for a fuel share cell, in percent.
pub const FUEL_SHARE_BOUNDS: (f64, f64) = (0.0, 100.0);
/// Inclusive bounds for an activity cell, in percent of the base year.
pub const ACTIVITY_BOUNDS: (f64, f64) = (0.0, 10_000.0);
/// Largest accepted deviation of a year's fuel total from 100 %.
pub const TOTAL_TOLERANCE: f64 = 0.01;

fn check_bounds(
    target: impl Into<String>,
    value: f64,
    bounds: (f64, f64),
) -> Result<f64, TableError> {
    let (min, max) = bounds;
    // NaN fails both comparisons and is rejected with the rest.
    if value >= min && value <= max {
        Ok(value)
    } else {
        Err(TableError::OutOfRange {
            target: target.into(),
            value,
            min,
            max,
        })
    }
}
