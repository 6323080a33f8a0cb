use anyhow::{Context, Result};
use log::warn;

use super::CommandParams;

/// Show the schema configuration of one connector
pub(crate) async fn schemas(params: &CommandParams, connector_id: &str) -> Result<String> {
    let schemas = params
        .client
        .connector_schemas(connector_id, &params.cancel)
        .await
        .with_context(|| format!("Cannot fetch schemas of connector `{connector_id}`"))?;

    if schemas.is_none() {
        warn!("Server sent no schema configuration for connector {connector_id}");
    }
    params.formatter.schemas(connector_id, schemas.as_ref())
}
