use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::client::{DuneClient, QueryExecutor};
use crate::config::{ExportConfig, ServiceConfig};
use crate::error::Result;
use crate::export::write_csv;
use crate::models::QueryRequest;
use crate::registry::{QueryDefinition, QueryRegistry};

/// Runs named queries against an executor and exports the results to CSV
pub struct DuneQueryService<E = DuneClient> {
    registry: QueryRegistry,
    executor: E,
    export: ExportConfig,
}

impl DuneQueryService<DuneClient> {
    /// Create a service backed by the Dune HTTP API
    pub fn new(registry: QueryRegistry, config: &ServiceConfig) -> Result<Self> {
        let client = DuneClient::new(config.dune.clone())?;
        Ok(Self::with_executor(registry, client, config))
    }
}

impl<E: QueryExecutor> DuneQueryService<E> {
    pub fn with_executor(registry: QueryRegistry, executor: E, config: &ServiceConfig) -> Self {
        Self {
            registry,
            executor,
            export: config.export.clone(),
        }
    }

    pub fn registry(&self) -> &QueryRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn get_query_params_by_name(&self, query_name: &str) -> Result<&QueryDefinition> {
        self.registry.find_by_name(query_name)
    }

    /// Execute `query_name` and write its results to `export_path`,
    /// or `<export_dir>/<query_name>.csv` when no path is given.
    ///
    /// Nothing is written unless the remote execution succeeds.
    pub async fn fetch_and_export_query(
        &self,
        query_name: &str,
        export_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let query = self.registry.find_by_name(query_name)?;
        let request = QueryRequest {
            query_id: query.query_id,
            name: query.query_name.clone(),
            params: query.wire_parameters(),
        };

        let table = match self.executor.run_query(&request).await {
            Ok(table) => table,
            Err(e) => {
                error!("Failed to run query {}: {}", query_name, e);
                return Err(e);
            }
        };

        let export_file = export_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.export.default_export_path(query_name));
        write_csv(&table, &export_file)?;

        info!(
            "Exported {} rows from {} to {}",
            table.row_count(),
            query_name,
            export_file.display()
        );
        Ok(export_file)
    }
}
