//! Error types surfaced by the table state and the backend client.

use std::fmt;

use thiserror::Error;

use crate::models::Year;

/// Which of the two editable tables an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Year x fuel share matrix.
    FuelShare,
    /// Transport activity by year.
    Activity,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::FuelShare => f.write_str("fuel share"),
            TableKind::Activity => f.write_str("transport activity"),
        }
    }
}

/// Structural failures raised while editing or projecting the input tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// An edit value falls outside the bounds of its column.
    #[error("{target} value {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Cell description, e.g. `gasoline 2030`.
        target: String,
        /// Rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// An edit references a year outside 2020-2050 in 5-year steps.
    #[error("year {0} is not one of the modelled years (2020-2050, step 5)")]
    UnknownYear(i32),
    /// A fuel row label that does not name a tracked fuel.
    #[error("unknown fuel row '{0}'")]
    UnknownFuel(String),
    /// A table is missing required years and cannot be projected.
    #[error("{table} table is missing years: {}", join_years(.missing))]
    IncompleteTable {
        /// Table that failed reconciliation.
        table: TableKind,
        /// Years absent from the table, ascending.
        missing: Vec<Year>,
    },
}

fn join_years(years: &[Year]) -> String {
    years
        .iter()
        .map(|year| year.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures talking to the model backend. Surfaced unmodified to the caller.
#[derive(Debug, Error)]
pub enum TransportFailure {
    /// The request never produced a response (connect error, timeout, ...).
    #[error("request to {url} failed: {source}")]
    Request {
        /// Target URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        /// Target URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },
}

impl TransportFailure {
    /// HTTP status, when the backend responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportFailure::Status { status, .. } => Some(*status),
            TransportFailure::Request { source, .. } => source.status().map(|s| s.as_u16()),
        }
    }

    /// Whether the request was abandoned because it hit its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportFailure::Request { source, .. } if source.is_timeout())
    }
}
