//! Dune Query Service
//!
//! Maps configured query names to Dune query ids and typed parameters, runs the query
//! through the Dune execution API and writes the resulting table to a CSV file.

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod params;
pub mod registry;
pub mod service;


pub use client::{DuneClient, QueryExecutor};
pub use crate::config::ServiceConfig;
pub use error::{DuneQueryError, Result};
pub use models::{QueryRequest, QueryTable};
pub use params::{Parameter, ParameterFactory, ParameterKind, WireParam};
pub use registry::{QueryDefinition, QueryRegistry};
pub use service::DuneQueryService;
