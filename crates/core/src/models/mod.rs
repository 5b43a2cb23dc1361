//! Shared domain models: the year axis, fuel kinds and scalar selections.

use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// A modelled year. Only members of [`YEARS`] can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub struct Year(u16);

/// The fixed year axis shared by every table: 2020 to 2050 in 5-year steps.
pub const YEARS: [Year; 7] = [
    Year(2020),
    Year(2025),
    Year(2030),
    Year(2035),
    Year(2040),
    Year(2045),
    Year(2050),
];

impl Year {
    /// First modelled year; activity is expressed relative to it.
    pub const BASE: Year = YEARS[0];
    /// Last modelled year.
    pub const FINAL: Year = YEARS[YEARS.len() - 1];

    /// Numeric value of the year.
    pub const fn value(self) -> i32 {
        self.0 as i32
    }

    /// Position of the year on the canonical axis.
    pub fn index(self) -> usize {
        YEARS
            .iter()
            .position(|year| *year == self)
            .unwrap_or_default()
    }
}

impl TryFrom<i32> for Year {
    type Error = TableError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        YEARS
            .iter()
            .copied()
            .find(|year| year.value() == value)
            .ok_or(TableError::UnknownYear(value))
    }
}

impl From<Year> for i32 {
    fn from(year: Year) -> Self {
        year.value()
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary transport energy carriers tracked per year.
///
/// Declaration order is the canonical row order of the fuel table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelKind {
    /// Gasoline / petrol.
    Gasoline,
    /// Diesel.
    Diesel,
    /// Battery electric.
    Electric,
    /// Biofuels.
    Biofuel,
}

/// Label of the derived pseudo-row holding per-year sums.
pub const TOTAL_LABEL: &str = "Total (%)";

impl FuelKind {
    /// All fuel kinds in canonical order.
    pub const ALL: [FuelKind; 4] = [
        FuelKind::Gasoline,
        FuelKind::Diesel,
        FuelKind::Electric,
        FuelKind::Biofuel,
    ];

    /// Row label shown by editors.
    pub fn label(self) -> &'static str {
        match self {
            FuelKind::Gasoline => "Gasoline (%)",
            FuelKind::Diesel => "Diesel (%)",
            FuelKind::Electric => "Electric (%)",
            FuelKind::Biofuel => "Biofuel (%)",
        }
    }

    /// Wire key used in payloads (`"gasoline"`, ...).
    pub fn key(self) -> String {
        normalize_fuel_key(self.label())
    }
}

impl fmt::Display for FuelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for FuelKind {
    type Err = TableError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let key = normalize_fuel_key(label);
        FuelKind::ALL
            .into_iter()
            .find(|kind| kind.key() == key)
            .ok_or_else(|| TableError::UnknownFuel(label.to_string()))
    }
}

/// Lower-case a fuel row label and strip its unit suffix: `"Gasoline (%)"` -> `"gasoline"`.
pub fn normalize_fuel_key(label: &str) -> String {
    UNIT_SUFFIX_RE
        .replace(label.trim(), "")
        .trim()
        .to_lowercase()
}

/// Whether a row label names the derived total pseudo-row (`"Total"`, `"Total (%)"`, ...).
pub fn is_total_label(label: &str) -> bool {
    normalize_fuel_key(label) == "total"
}

static UNIT_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)$").expect("failed to compile unit suffix regex"));

/// Countries offered by the selector. The selection itself accepts any name.
pub const COUNTRIES: [&str; 8] = [
    "Australia",
    "China",
    "EU-27",
    "United States",
    "India",
    "Japan",
    "Brazil",
    "South Africa",
];

/// Policy scenario passed through to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scenario {
    /// Current policies continue.
    #[default]
    #[serde(rename = "Business-as-usual")]
    BusinessAsUsual,
    /// Full renewable supply.
    #[serde(rename = "100% renewables")]
    FullRenewables,
    /// IEA pathway.
    #[serde(rename = "IEA")]
    Iea,
}

impl Scenario {
    /// All scenarios in selector order.
    pub const ALL: [Scenario; 3] = [
        Scenario::BusinessAsUsual,
        Scenario::FullRenewables,
        Scenario::Iea,
    ];

    /// Label as sent on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Scenario::BusinessAsUsual => "Business-as-usual",
            Scenario::FullRenewables => "100% renewables",
            Scenario::Iea => "IEA",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Carbon budget expressed as a warming limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CarbonBudget {
    /// 1.5 °C.
    #[default]
    #[serde(rename = "1.5 °C")]
    OnePointFive,
    /// 1.6 °C.
    #[serde(rename = "1.6 °C")]
    OnePointSix,
    /// 1.7 °C.
    #[serde(rename = "1.7 °C")]
    OnePointSeven,
}

impl CarbonBudget {
    /// All budgets in selector order.
    pub const ALL: [CarbonBudget; 3] = [
        CarbonBudget::OnePointFive,
        CarbonBudget::OnePointSix,
        CarbonBudget::OnePointSeven,
    ];

    /// Label as sent on the wire.
    pub fn label(self) -> &'static str {
        match self {
            CarbonBudget::OnePointFive => "1.5 °C",
            CarbonBudget::OnePointSix => "1.6 °C",
            CarbonBudget::OnePointSeven => "1.7 °C",
        }
    }
}

impl fmt::Display for CarbonBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scalar choices made by the user. Never derived from table state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Country or region name.
    pub country: String,
    /// Policy scenario.
    pub scenario: Scenario,
    /// Carbon budget.
    pub carbon_budget: CarbonBudget,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            country: COUNTRIES[0].to_string(),
            scenario: Scenario::default(),
            carbon_budget: CarbonBudget::default(),
        }
    }
}
