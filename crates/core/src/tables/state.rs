use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::{
    check_bounds, ActivityVector, FuelShareMatrix, ACTIVITY_BOUNDS, FUEL_SHARE_BOUNDS,
    TOTAL_TOLERANCE,
};
use crate::{
    error::TableError,
    models::{is_total_label, FuelKind, Year},
};

/// Default fuel split applied to every year.
pub const DEFAULT_FUEL_SPLIT: [(FuelKind, f64); 4] = [
    (FuelKind::Gasoline, 30.0),
    (FuelKind::Diesel, 40.0),
    (FuelKind::Electric, 20.0),
    (FuelKind::Biofuel, 10.0),
];
/// Default activity for every year but the last.
pub const DEFAULT_ACTIVITY: f64 = 100.0;
/// Default activity for the final year.
pub const DEFAULT_FINAL_ACTIVITY: f64 = 120.0;

/// Owns the two editable tables of one session.
///
/// Edits are checked at the boundary and either applied whole or rejected
/// with the previous state intact. Validation of the fuel totals is
/// advisory: it reports offending years but never blocks an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStateManager {
    fuel: FuelShareMatrix,
    activity: ActivityVector,
}

/// Immutable copy of both tables, safe to hand to another component.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    /// Fuel share matrix at the time of the snapshot.
    pub fuel: FuelShareMatrix,
    /// Activity vector at the time of the snapshot.
    pub activity: ActivityVector,
}

/// Result of checking that each year's fuel shares sum to 100 %.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    offending: Vec<Year>,
    totals: BTreeMap<Year, f64>,
}

impl ValidationReport {
    /// Years whose total deviates from 100 % by more than the tolerance, ascending.
    pub fn offending_years(&self) -> &[Year] {
        &self.offending
    }

    /// Totals the report was computed from.
    pub fn totals(&self) -> &BTreeMap<Year, f64> {
        &self.totals
    }

    /// Whether every year sums to 100 %.
    pub fn is_clean(&self) -> bool {
        self.offending.is_empty()
    }

    /// User-facing warning, or `None` when clean.
    pub fn warning(&self) -> Option<String> {
        if self.is_clean() {
            return None;
        }
        let details = self
            .offending
            .iter()
            .map(|year| match self.totals.get(year) {
                Some(total) => format!("{year} ({total:.2}%)"),
                None => year.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!("Fuel shares do not sum to 100% for: {details}"))
    }
}

impl Default for TableStateManager {
    fn default() -> Self {
        Self::initialize()
    }
}

impl TableStateManager {
    /// Fresh tables with the default split and activity path.
    pub fn initialize() -> Self {
        Self {
            fuel: FuelShareMatrix::uniform(&DEFAULT_FUEL_SPLIT),
            activity: ActivityVector::with_final(DEFAULT_ACTIVITY, DEFAULT_FINAL_ACTIVITY),
        }
    }

    /// Current fuel share matrix.
    pub fn fuel(&self) -> &FuelShareMatrix {
        &self.fuel
    }

    /// Current activity vector.
    pub fn activity(&self) -> &ActivityVector {
        &self.activity
    }

    /// Overwrite one fuel share cell and refresh that year's total.
    pub fn apply_fuel_edit(
        &mut self,
        year: i32,
        kind: FuelKind,
        value: f64,
    ) -> Result<(), TableError> {
        let year = Year::try_from(year)?;
        let value = check_bounds(format!("{kind} {year}"), value, FUEL_SHARE_BOUNDS)?;
        self.fuel.set(year, kind, value);
        debug!(%year, fuel = %kind, value, "fuel share edited");
        Ok(())
    }

    /// Overwrite one activity cell.
    pub fn apply_activity_edit(&mut self, year: i32, value: f64) -> Result<(), TableError> {
        let year = Year::try_from(year)?;
        let value = check_bounds(format!("activity {year}"), value, ACTIVITY_BOUNDS)?;
        self.activity.set(year, value);
        debug!(%year, value, "activity edited");
        Ok(())
    }

    /// Apply a block of labelled fuel rows from an editor.
    ///
    /// Rows and columns may arrive in any order or be partially absent; absent
    /// cells keep their value. A total row is ignored. Every cell is checked
    /// before anything is written, so a single bad cell rejects the block.
    pub fn apply_fuel_table<L: AsRef<str>>(
        &mut self,
        rows: &[(L, Vec<(i32, f64)>)],
    ) -> Result<usize, TableError> {
        let mut edits = Vec::new();
        for (label, cells) in rows {
            let label = label.as_ref();
            if is_total_label(label) {
                continue;
            }
            let kind: FuelKind = label.parse()?;
            for (year, value) in cells {
                let year = Year::try_from(*year)?;
                let value = check_bounds(format!("{kind} {year}"), *value, FUEL_SHARE_BOUNDS)?;
                edits.push((year, kind, value));
            }
        }
        for (year, kind, value) in &edits {
            self.fuel.set(*year, *kind, *value);
        }
        debug!(cells = edits.len(), "fuel table applied");
        Ok(edits.len())
    }

    /// Apply a row of activity cells from an editor, all or nothing.
    pub fn apply_activity_row(&mut self, cells: &[(i32, f64)]) -> Result<usize, TableError> {
        let edits = cells
            .iter()
            .map(|(year, value)| {
                let year = Year::try_from(*year)?;
                check_bounds(format!("activity {year}"), *value, ACTIVITY_BOUNDS)
                    .map(|value| (year, value))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (year, value) in &edits {
            self.activity.set(*year, *value);
        }
        debug!(cells = edits.len(), "activity row applied");
        Ok(edits.len())
    }

    /// Remove a year column from the fuel matrix, as an editor dropping it would.
    pub fn drop_fuel_year(&mut self, year: i32) -> Result<bool, TableError> {
        Ok(self.fuel.drop_year(Year::try_from(year)?))
    }

    /// Remove a year from the activity vector.
    pub fn drop_activity_year(&mut self, year: i32) -> Result<bool, TableError> {
        Ok(self.activity.drop_year(Year::try_from(year)?))
    }

    /// Recompute every year's total and cache the result on the matrix.
    pub fn recompute_totals(&mut self) -> BTreeMap<Year, f64> {
        self.fuel.refresh_totals();
        self.fuel.totals().clone()
    }

    /// Report years whose fuel shares do not sum to 100 %.
    pub fn validate(&self) -> ValidationReport {
        let totals = self.fuel.recompute_totals();
        let offending: Vec<Year> = totals
            .iter()
            .filter(|(_, total)| (**total - 100.0).abs() > TOTAL_TOLERANCE)
            .map(|(year, _)| *year)
            .collect();
        if !offending.is_empty() {
            warn!(years = ?offending, "fuel shares do not sum to 100%");
        }
        ValidationReport { offending, totals }
    }

    /// Deep copy of the current tables.
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            fuel: self.fuel.clone(),
            activity: self.activity.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::YEARS;

    fn year(value: i32) -> Year {
        Year::try_from(value).unwrap()
    }

    #[test]
    fn defaults_validate_clean() {
        let tables = TableStateManager::initialize();
        let report = tables.validate();
        assert!(report.is_clean());
        assert_eq!(report.warning(), None);
        for y in YEARS {
            assert_eq!(tables.fuel().share(y, FuelKind::Gasoline), Some(30.0));
            assert_eq!(tables.fuel().total(y), Some(100.0));
        }
        assert_eq!(tables.activity().value(year(2045)), Some(100.0));
        assert_eq!(tables.activity().value(year(2050)), Some(120.0));
    }

    #[test]
    fn totals_track_edits() {
        let mut tables = TableStateManager::initialize();
        let edits = [
            (2020, FuelKind::Gasoline, 12.5),
            (2020, FuelKind::Electric, 33.3),
            (2035, FuelKind::Biofuel, 0.7),
            (2050, FuelKind::Diesel, 99.9),
        ];
        for (y, kind, value) in edits {
            tables.apply_fuel_edit(y, kind, value).unwrap();
        }
        let totals = tables.recompute_totals();
        for y in YEARS {
            let expected: f64 = FuelKind::ALL
                .iter()
                .map(|kind| tables.fuel().share(y, *kind).unwrap())
                .sum();
            assert!((totals[&y] - expected).abs() < 1e-9);
            assert!((tables.fuel().total(y).unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_out_of_range_share() {
        let mut tables = TableStateManager::initialize();
        let err = tables
            .apply_fuel_edit(2020, FuelKind::Gasoline, 100.5)
            .unwrap_err();
        assert!(matches!(err, TableError::OutOfRange { value, .. } if value == 100.5));
        assert_eq!(tables.fuel().share(year(2020), FuelKind::Gasoline), Some(30.0));

        tables
            .apply_fuel_edit(2020, FuelKind::Gasoline, 100.0)
            .unwrap();
        assert_eq!(tables.fuel().share(year(2020), FuelKind::Gasoline), Some(100.0));

        assert!(tables.apply_fuel_edit(2020, FuelKind::Diesel, -0.1).is_err());
        assert!(tables
            .apply_fuel_edit(2020, FuelKind::Diesel, f64::NAN)
            .is_err());
    }

    #[test]
    fn rejects_unknown_year() {
        let mut tables = TableStateManager::initialize();
        assert_eq!(
            tables.apply_fuel_edit(2051, FuelKind::Gasoline, 10.0),
            Err(TableError::UnknownYear(2051))
        );
        assert_eq!(
            tables.apply_activity_edit(2019, 10.0),
            Err(TableError::UnknownYear(2019))
        );
        assert_eq!(tables, TableStateManager::initialize());
    }

    #[test]
    fn activity_bounds() {
        let mut tables = TableStateManager::initialize();
        tables.apply_activity_edit(2030, 10_000.0).unwrap();
        assert_eq!(tables.activity().value(year(2030)), Some(10_000.0));
        assert!(matches!(
            tables.apply_activity_edit(2030, 10_000.5),
            Err(TableError::OutOfRange { .. })
        ));
        assert!(tables.apply_activity_edit(2030, -1.0).is_err());
        assert_eq!(tables.activity().value(year(2030)), Some(10_000.0));
    }

    #[test]
    fn validation_flags_year_off_by_total() {
        let mut tables = TableStateManager::initialize();
        for (kind, value) in [
            (FuelKind::Gasoline, 50.0),
            (FuelKind::Diesel, 50.0),
            (FuelKind::Electric, 0.0),
            (FuelKind::Biofuel, 0.0),
        ] {
            tables.apply_fuel_edit(2030, kind, value).unwrap();
        }
        assert_eq!(tables.fuel().total(year(2030)), Some(100.0));
        assert!(!tables.validate().offending_years().contains(&year(2030)));

        tables
            .apply_fuel_edit(2030, FuelKind::Gasoline, 60.0)
            .unwrap();
        let report = tables.validate();
        assert_eq!(report.offending_years(), &[year(2030)]);
        assert_eq!(
            report.warning().as_deref(),
            Some("Fuel shares do not sum to 100% for: 2030 (110.00%)")
        );
        // Edits stay in place even though validation fails.
        assert_eq!(tables.fuel().share(year(2030), FuelKind::Gasoline), Some(60.0));
    }

    #[test]
    fn tolerance_allows_rounding_noise() {
        let mut tables = TableStateManager::initialize();
        tables
            .apply_fuel_edit(2040, FuelKind::Gasoline, 30.005)
            .unwrap();
        assert!(tables.validate().is_clean());
        tables
            .apply_fuel_edit(2040, FuelKind::Gasoline, 30.02)
            .unwrap();
        assert_eq!(tables.validate().offending_years(), &[year(2040)]);
    }

    #[test]
    fn fuel_table_applies_reordered_rows_and_skips_total() {
        let mut tables = TableStateManager::initialize();
        let rows = vec![
            ("Biofuel (%)", vec![(2050, 25.0), (2020, 5.0)]),
            ("Total (%)", vec![(2020, 999.0)]),
            ("electric", vec![(2050, 35.0)]),
        ];
        assert_eq!(tables.apply_fuel_table(&rows), Ok(3));
        assert_eq!(tables.fuel().share(year(2050), FuelKind::Biofuel), Some(25.0));
        assert_eq!(tables.fuel().share(year(2020), FuelKind::Biofuel), Some(5.0));
        assert_eq!(tables.fuel().share(year(2050), FuelKind::Electric), Some(35.0));
        // Untouched cells keep their previous value.
        assert_eq!(tables.fuel().share(year(2050), FuelKind::Diesel), Some(40.0));
        assert_eq!(tables.fuel().total(year(2050)), Some(130.0));
    }

    #[test]
    fn fuel_table_is_all_or_nothing() {
        let mut tables = TableStateManager::initialize();
        let before = tables.snapshot();

        let bad_value = vec![("Gasoline (%)", vec![(2020, 50.0), (2025, 101.0)])];
        assert!(matches!(
            tables.apply_fuel_table(&bad_value),
            Err(TableError::OutOfRange { .. })
        ));

        let bad_label = vec![
            ("Gasoline (%)", vec![(2020, 50.0)]),
            ("Hydrogen (%)", vec![(2020, 10.0)]),
        ];
        assert_eq!(
            tables.apply_fuel_table(&bad_label),
            Err(TableError::UnknownFuel("Hydrogen (%)".to_string()))
        );

        let bad_year = vec![("Diesel (%)".to_string(), vec![(2055, 10.0)])];
        assert_eq!(
            tables.apply_fuel_table(&bad_year),
            Err(TableError::UnknownYear(2055))
        );

        assert_eq!(tables.snapshot(), before);
    }

    #[test]
    fn activity_row_is_all_or_nothing() {
        let mut tables = TableStateManager::initialize();
        assert_eq!(tables.apply_activity_row(&[(2025, 110.0), (2030, 115.0)]), Ok(2));
        assert_eq!(tables.activity().value(year(2030)), Some(115.0));

        assert!(tables
            .apply_activity_row(&[(2035, 130.0), (2033, 10.0)])
            .is_err());
        assert_eq!(tables.activity().value(year(2035)), Some(100.0));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut tables = TableStateManager::initialize();
        let snapshot = tables.snapshot();
        tables
            .apply_fuel_edit(2020, FuelKind::Diesel, 0.0)
            .unwrap();
        tables.drop_activity_year(2045).unwrap();
        assert_eq!(snapshot.fuel.share(year(2020), FuelKind::Diesel), Some(40.0));
        assert_eq!(snapshot.activity.value(year(2045)), Some(100.0));
    }

    #[test]
    fn dropped_year_has_no_total_and_is_not_flagged() {
        let mut tables = TableStateManager::initialize();
        assert_eq!(tables.drop_fuel_year(2025), Ok(true));
        assert_eq!(tables.drop_fuel_year(2026), Err(TableError::UnknownYear(2026)));
        let totals = tables.recompute_totals();
        assert!(!totals.contains_key(&year(2025)));
        assert!(tables.validate().is_clean());
        assert_eq!(tables.fuel().missing_years(), vec![year(2025)]);
    }
}
