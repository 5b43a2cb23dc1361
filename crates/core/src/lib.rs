#![warn(clippy::all, missing_docs)]

//! Core domain logic for the transport inputs client.
//!
//! This crate hosts the input data model, the editable table state,
//! payload projection for the remote model runner, the HTTP client
//! used to reach it, and configuration handling used by the terminal
//! UI and any future frontends.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod payload;
pub mod session;
pub mod tables;

pub use client::{BackendClient, RunResponse};
pub use config::{AppConfig, EnvOverrides};
pub use error::{TableError, TableKind, TransportFailure};
pub use models::{CarbonBudget, FuelKind, Scenario, Selection, Year, YEARS};
pub use payload::{PayloadBuilder, RunPayload};
pub use session::InputSession;
pub use tables::{
    ActivityVector, FuelShareMatrix, TableSnapshot, TableStateManager, ValidationReport,
};
