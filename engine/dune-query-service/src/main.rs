use anyhow::Context;
use dune_query_service::logging::initialize_logging;
use dune_query_service::{
    DuneQueryService, ParameterFactory, QueryDefinition, QueryRegistry, ServiceConfig,
};
use tracing::info;

fn default_registry() -> anyhow::Result<QueryRegistry> {
    Ok(QueryRegistry::with_definitions(vec![
        QueryDefinition::new(4732812, "dune_query_fees").with_parameters(vec![
            ParameterFactory::create(
                "pool_address",
                "0xebd5311bea1948e1441333976eadcfe5fbda777c",
                "text",
            )?,
        ]),
        QueryDefinition::new(4842271, "mint_burn"),
    ]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("Failed to load configuration")?;
    initialize_logging(&config.logging)?;

    info!("Starting Dune query service v{}", env!("CARGO_PKG_VERSION"));

    let service = DuneQueryService::new(default_registry()?, &config)
        .context("Failed to create Dune client")?;

    let path = service
        .fetch_and_export_query("mint_burn", None)
        .await
        .context("Failed to fetch and export mint_burn")?;

    info!("Done: {}", path.display());
    Ok(())
}
