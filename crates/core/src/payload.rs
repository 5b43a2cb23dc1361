//! Projection of session state into the `/v1/run` request body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{TableError, TableKind},
    models::{CarbonBudget, FuelKind, Scenario, Selection, Year},
    tables::{ActivityVector, FuelShareMatrix},
};

/// Request body consumed by the model backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPayload {
    /// Country or region name, verbatim from the selection.
    pub country: String,
    /// Scenario label.
    pub scenario: Scenario,
    /// `{year: {fuel: share}}` for every modelled year.
    pub transport_fuel_share: BTreeMap<Year, BTreeMap<String, f64>>,
    /// `{year: activity}` for every modelled year.
    pub transport_activity: BTreeMap<Year, f64>,
    /// Scalar inputs that are not part of the tables.
    pub other_inputs: OtherInputs,
}

/// Auxiliary scalar inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherInputs {
    /// Carbon budget label.
    pub carbon_budget: CarbonBudget,
}

/// Builds [`RunPayload`]s from a selection and reconciled tables.
pub struct PayloadBuilder;

impl PayloadBuilder {
    /// Reindex both tables onto the year axis and project them.
    ///
    /// Fails with [`TableError::IncompleteTable`] if either table lacks a year
    /// (or, for the fuel matrix, any fuel cell within a year). Nothing is
    /// filled in on the caller's behalf.
    pub fn build(
        selection: &Selection,
        fuel: &FuelShareMatrix,
        activity: &ActivityVector,
    ) -> Result<RunPayload, TableError> {
        let missing = fuel.missing_years();
        if !missing.is_empty() {
            return Err(TableError::IncompleteTable {
                table: TableKind::FuelShare,
                missing,
            });
        }
        let missing = activity.missing_years();
        if !missing.is_empty() {
            return Err(TableError::IncompleteTable {
                table: TableKind::Activity,
                missing,
            });
        }

        let transport_fuel_share: BTreeMap<Year, BTreeMap<String, f64>> = fuel
            .reindexed()
            .into_iter()
            .map(|(year, shares)| {
                let row: BTreeMap<String, f64> = FuelKind::ALL
                    .iter()
                    .zip(shares)
                    .filter_map(|(kind, share)| share.map(|share| (kind.key(), share)))
                    .collect();
                (year, row)
            })
            .collect();

        let transport_activity: BTreeMap<Year, f64> = activity
            .reindexed()
            .into_iter()
            .filter_map(|(year, value)| value.map(|value| (year, value)))
            .collect();

        debug!(country = %selection.country, scenario = %selection.scenario, "payload built");

        Ok(RunPayload {
            country: selection.country.clone(),
            scenario: selection.scenario,
            transport_fuel_share,
            transport_activity,
            other_inputs: OtherInputs {
                carbon_budget: selection.carbon_budget,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::YEARS, tables::TableStateManager};
    use serde_json::json;

    fn australia() -> Selection {
        Selection {
            country: "Australia".to_string(),
            scenario: Scenario::BusinessAsUsual,
            carbon_budget: CarbonBudget::OnePointFive,
        }
    }

    #[test]
    fn builds_default_payload() -> anyhow::Result<()> {
        let tables = TableStateManager::initialize();
        let payload = PayloadBuilder::build(&australia(), tables.fuel(), tables.activity())?;
        let value = serde_json::to_value(&payload)?;

        assert_eq!(value["country"], "Australia");
        assert_eq!(value["scenario"], "Business-as-usual");
        assert_eq!(
            value["transport_fuel_share"]["2020"],
            json!({"gasoline": 30.0, "diesel": 40.0, "electric": 20.0, "biofuel": 10.0})
        );
        assert_eq!(value["transport_activity"]["2050"], json!(120.0));
        assert_eq!(value["transport_activity"]["2045"], json!(100.0));
        assert_eq!(value["other_inputs"], json!({"carbon_budget": "1.5 °C"}));

        let years: Vec<Year> = payload.transport_fuel_share.keys().copied().collect();
        assert_eq!(years, YEARS.to_vec());
        let years: Vec<Year> = payload.transport_activity.keys().copied().collect();
        assert_eq!(years, YEARS.to_vec());
        assert!(payload
            .transport_fuel_share
            .values()
            .all(|row| row.len() == FuelKind::ALL.len() && !row.contains_key("total")));
        Ok(())
    }

    #[test]
    fn build_is_idempotent() -> anyhow::Result<()> {
        let mut tables = TableStateManager::initialize();
        tables.apply_fuel_edit(2035, FuelKind::Electric, 55.5)?;
        let first = PayloadBuilder::build(&australia(), tables.fuel(), tables.activity())?;
        let second = PayloadBuilder::build(&australia(), tables.fuel(), tables.activity())?;
        assert_eq!(first, second);
        assert_eq!(serde_json::to_string(&first)?, serde_json::to_string(&second)?);
        Ok(())
    }

    #[test]
    fn missing_activity_year_aborts_build() {
        let mut tables = TableStateManager::initialize();
        tables.drop_activity_year(2045).unwrap();
        let result = PayloadBuilder::build(&australia(), tables.fuel(), tables.activity());
        assert_eq!(
            result,
            Err(TableError::IncompleteTable {
                table: TableKind::Activity,
                missing: vec![Year::try_from(2045).unwrap()],
            })
        );
    }

    #[test]
    fn missing_fuel_year_aborts_build() {
        let mut tables = TableStateManager::initialize();
        tables.drop_fuel_year(2020).unwrap();
        tables.drop_fuel_year(2050).unwrap();
        match PayloadBuilder::build(&australia(), tables.fuel(), tables.activity()) {
            Err(TableError::IncompleteTable { table, missing }) => {
                assert_eq!(table, TableKind::FuelShare);
                assert_eq!(missing, vec![Year::BASE, Year::FINAL]);
            }
            other => panic!("expected incomplete fuel table, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_shares_still_build() -> anyhow::Result<()> {
        let mut tables = TableStateManager::initialize();
        tables.apply_fuel_edit(2030, FuelKind::Gasoline, 60.0)?;
        assert!(!tables.validate().is_clean());
        let payload = PayloadBuilder::build(&australia(), tables.fuel(), tables.activity())?;
        let year = Year::try_from(2030)?;
        assert_eq!(payload.transport_fuel_share[&year]["gasoline"], 60.0);
        Ok(())
    }
}
