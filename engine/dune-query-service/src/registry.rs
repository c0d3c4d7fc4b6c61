//! Named query definitions and lookup

use serde::{Deserialize, Serialize};

use crate::error::{DuneQueryError, Result};
use crate::params::{Parameter, WireParam};

/// A Dune query known by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub query_id: u64,
    pub query_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
}

impl QueryDefinition {
    pub fn new(query_id: u64, query_name: impl Into<String>) -> Self {
        Self {
            query_id,
            query_name: query_name.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Wire encoding of the configured parameters; absent parameters yield an empty list
    pub fn wire_parameters(&self) -> Vec<WireParam> {
        self.parameters
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(Parameter::to_wire_parameter)
            .collect()
    }
}

/// Ordered collection of query definitions.
///
/// Duplicate names are accepted; lookups resolve to the first definition added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRegistry {
    queries: Vec<QueryDefinition>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(queries: Vec<QueryDefinition>) -> Self {
        Self { queries }
    }

    pub fn add(&mut self, definition: QueryDefinition) {
        self.queries.push(definition);
    }

    /// Case-sensitive exact match on `query_name`
    pub fn find_by_name(&self, name: &str) -> Result<&QueryDefinition> {
        self.queries
            .iter()
            .find(|q| q.query_name == name)
            .ok_or_else(|| DuneQueryError::QueryNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryDefinition> {
        self.queries.iter()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
