use std::collections::BTreeMap;

use crate::models::{Year, YEARS};

/// Transport activity per year, as a percentage of the base year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityVector {
    values: BTreeMap<Year, f64>,
}

impl ActivityVector {
    /// Same value for every year, with an override for the final year.
    pub fn with_final(base: f64, final_value: f64) -> Self {
        let mut values: BTreeMap<Year, f64> = YEARS.iter().map(|year| (*year, base)).collect();
        values.insert(Year::FINAL, final_value);
        Self { values }
    }

    /// Value for a year, if present.
    pub fn value(&self, year: Year) -> Option<f64> {
        self.values.get(&year).copied()
    }

    pub(crate) fn set(&mut self, year: Year, value: f64) {
        self.values.insert(year, value);
    }

    /// Remove a year column. Returns whether it was present.
    pub fn drop_year(&mut self, year: Year) -> bool {
        self.values.remove(&year).is_some()
    }

    /// Every year of the axis with its value, in ascending order.
    pub fn reindexed(&self) -> Vec<(Year, Option<f64>)> {
        YEARS.iter().map(|year| (*year, self.value(*year))).collect()
    }

    /// Years of the axis without a value.
    pub fn missing_years(&self) -> Vec<Year> {
        self.reindexed()
            .into_iter()
            .filter_map(|(year, value)| value.is_none().then_some(year))
            .collect()
    }
}
