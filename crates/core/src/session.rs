//! Per-session input state.

use crate::{
    error::TableError,
    models::Selection,
    payload::{PayloadBuilder, RunPayload},
    tables::{TableStateManager, ValidationReport},
};

/// Everything one user session edits: scalar selections and the two tables.
///
/// Sessions are plain owned values; nothing is shared between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSession {
    /// Country, scenario and carbon budget.
    pub selection: Selection,
    tables: TableStateManager,
}

impl InputSession {
    /// Session with default selection and tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with the given selection and default tables.
    pub fn with_selection(selection: Selection) -> Self {
        Self {
            selection,
            tables: TableStateManager::initialize(),
        }
    }

    /// Read access to the tables.
    pub fn tables(&self) -> &TableStateManager {
        &self.tables
    }

    /// Mutable access to the tables, for edit dispatch.
    pub fn tables_mut(&mut self) -> &mut TableStateManager {
        &mut self.tables
    }

    /// Advisory check of the fuel totals.
    pub fn validate(&self) -> ValidationReport {
        self.tables.validate()
    }

    /// Payload for the current state, or why it cannot be built.
    pub fn build_payload(&self) -> Result<RunPayload, TableError> {
        PayloadBuilder::build(&self.selection, self.tables.fuel(), self.tables.activity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarbonBudget, FuelKind, Scenario};

    #[test]
    fn sessions_are_isolated() {
        let mut first = InputSession::new();
        let second = InputSession::new();
        first
            .tables_mut()
            .apply_fuel_edit(2025, FuelKind::Gasoline, 70.0)
            .unwrap();
        first.selection.scenario = Scenario::Iea;
        assert_ne!(first, second);
        assert!(second.validate().is_clean());
        assert_eq!(second.selection.scenario, Scenario::BusinessAsUsual);
    }

    #[test]
    fn payload_carries_selection() {
        let session = InputSession::with_selection(Selection {
            country: "Japan".to_string(),
            scenario: Scenario::FullRenewables,
            carbon_budget: CarbonBudget::OnePointSeven,
        });
        let payload = session.build_payload().unwrap();
        assert_eq!(payload.country, "Japan");
        assert_eq!(payload.scenario, Scenario::FullRenewables);
        assert_eq!(payload.other_inputs.carbon_budget, CarbonBudget::OnePointSeven);
    }
}
