use std::collections::BTreeMap;

use crate::models::{FuelKind, Year, TOTAL_LABEL, YEARS};

/// Year x fuel share matrix, in percent.
///
/// Totals are derived and cached per year whenever a cell changes; they are
/// never accepted as input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuelShareMatrix {
    cells: BTreeMap<Year, BTreeMap<FuelKind, f64>>,
    totals: BTreeMap<Year, f64>,
}

/// One row of the wide (fuels as rows, years as columns) presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    /// Row label, e.g. `Gasoline (%)` or `Total (%)`.
    pub label: String,
    /// One entry per year in axis order; `None` where the cell is missing.
    pub values: Vec<Option<f64>>,
}

impl FuelShareMatrix {
    /// Matrix with the same split in every year.
    pub fn uniform(split: &[(FuelKind, f64)]) -> Self {
        let row: BTreeMap<FuelKind, f64> = split.iter().copied().collect();
        let mut matrix = Self {
            cells: YEARS.iter().map(|year| (*year, row.clone())).collect(),
            totals: BTreeMap::new(),
        };
        matrix.refresh_totals();
        matrix
    }

    /// Share for a single cell, if present.
    pub fn share(&self, year: Year, kind: FuelKind) -> Option<f64> {
        self.cells.get(&year).and_then(|row| row.get(&kind)).copied()
    }

    /// Cached total for a year, if the year has any cells.
    pub fn total(&self, year: Year) -> Option<f64> {
        self.totals.get(&year).copied()
    }

    /// Cached totals for every year present.
    pub fn totals(&self) -> &BTreeMap<Year, f64> {
        &self.totals
    }

    pub(crate) fn set(&mut self, year: Year, kind: FuelKind, value: f64) {
        self.cells.entry(year).or_default().insert(kind, value);
        self.refresh_total(year);
    }

    /// Remove a whole year column. Returns whether it was present.
    pub fn drop_year(&mut self, year: Year) -> bool {
        self.totals.remove(&year);
        self.cells.remove(&year).is_some()
    }

    /// Sum of the shares of every year present, in canonical fuel order.
    pub fn recompute_totals(&self) -> BTreeMap<Year, f64> {
        self.reindexed()
            .into_iter()
            .filter(|(year, _)| self.cells.contains_key(year))
            .map(|(year, shares)| (year, shares.iter().flatten().sum::<f64>()))
            .collect()
    }

    pub(crate) fn refresh_totals(&mut self) {
        self.totals = self.recompute_totals();
    }

    fn refresh_total(&mut self, year: Year) {
        match self.recompute_totals().get(&year) {
            Some(total) => {
                self.totals.insert(year, *total);
            }
            None => {
                self.totals.remove(&year);
            }
        }
    }

    /// Every year of the axis with its shares in canonical fuel order.
    pub fn reindexed(&self) -> Vec<(Year, [Option<f64>; 4])> {
        YEARS
            .iter()
            .map(|year| (*year, FuelKind::ALL.map(|kind| self.share(*year, kind))))
            .collect()
    }

    /// Years lacking the column entirely or any fuel cell within it.
    pub fn missing_years(&self) -> Vec<Year> {
        self.reindexed()
            .into_iter()
            .filter(|(_, shares)| shares.iter().any(Option::is_none))
            .map(|(year, _)| year)
            .collect()
    }

    /// Wide view: one row per fuel plus a trailing total row.
    pub fn wide_rows(&self) -> Vec<WideRow> {
        let mut rows: Vec<WideRow> = FuelKind::ALL
            .iter()
            .map(|kind| WideRow {
                label: kind.label().to_string(),
                values: YEARS.iter().map(|year| self.share(*year, *kind)).collect(),
            })
            .collect();
        rows.push(WideRow {
            label: TOTAL_LABEL.to_string(),
            values: YEARS.iter().map(|year| self.total(*year)).collect(),
        });
        rows
    }
}
