use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::params::WireParam;

/// A query to execute: Dune query id plus its wire parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub query_id: u64,
    pub name: String,
    pub params: Vec<WireParam>,
}

impl QueryRequest {
    /// `key -> value` map used by the execute endpoint
    pub fn parameter_map(&self) -> Map<String, Value> {
        self.params
            .iter()
            .map(|p| (p.key.clone(), Value::String(p.value.clone())))
            .collect()
    }
}

/// Tabular query result, rows ordered by `columns`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build from Dune's row objects, picking cells in column order
    pub fn from_records(columns: Vec<String>, records: Vec<Map<String, Value>>) -> Self {
        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| record.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Request body for `POST /api/v1/query/{id}/execute`
#[derive(Debug, Serialize)]
pub struct ExecuteRequest {
    pub query_parameters: Map<String, Value>,
    pub performance: String,
}

/// Response from the execute endpoint
#[derive(Debug, Deserialize)]
pub struct ExecuteResponse {
    pub execution_id: String,
    pub state: ExecutionState,
}

/// Response from `GET /api/v1/execution/{id}/status`
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub execution_id: String,
    pub state: ExecutionState,
    #[serde(default)]
    pub queue_position: Option<u64>,
}

/// Response from `GET /api/v1/execution/{id}/results`
#[derive(Debug, Deserialize)]
pub struct ResultsResponse {
    pub execution_id: String,
    pub state: ExecutionState,
    #[serde(default)]
    pub result: Option<ExecutionResult>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Deserialize)]
pub struct ResultMetadata {
    pub column_names: Vec<String>,
    #[serde(default)]
    pub total_row_count: Option<u64>,
}

/// Error body returned by the Dune API
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Execution lifecycle states reported by Dune
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum ExecutionState {
    #[serde(rename = "QUERY_STATE_PENDING")]
    Pending,
    #[serde(rename = "QUERY_STATE_EXECUTING")]
    Executing,
    #[serde(rename = "QUERY_STATE_COMPLETED")]
    Completed,
    #[serde(rename = "QUERY_STATE_COMPLETED_PARTIAL")]
    CompletedPartial,
    #[serde(rename = "QUERY_STATE_FAILED")]
    Failed,
    #[serde(rename = "QUERY_STATE_CANCELLED")]
    Cancelled,
    #[serde(rename = "QUERY_STATE_EXPIRED")]
    Expired,
    #[serde(other)]
    Unknown,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionState::Pending | ExecutionState::Executing)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::CompletedPartial)
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionState::Pending => "QUERY_STATE_PENDING",
            ExecutionState::Executing => "QUERY_STATE_EXECUTING",
            ExecutionState::Completed => "QUERY_STATE_COMPLETED",
            ExecutionState::CompletedPartial => "QUERY_STATE_COMPLETED_PARTIAL",
            ExecutionState::Failed => "QUERY_STATE_FAILED",
            ExecutionState::Cancelled => "QUERY_STATE_CANCELLED",
            ExecutionState::Expired => "QUERY_STATE_EXPIRED",
            ExecutionState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}
