use anyhow::{Context, Result};
use futures::TryStreamExt;
use fivetran_lib::models::Connector;
use log::info;

use super::CommandParams;

/// List the connectors of one group
pub(crate) async fn connectors(params: &CommandParams, group_id: &str) -> Result<String> {
    let connectors: Vec<Connector> = params
        .client
        .connectors(group_id, &params.cancel)?
        .try_collect()
        .await
        .with_context(|| format!("Cannot list connectors of group `{group_id}`"))?;

    info!("Found {} connectors in group {group_id}", connectors.len());
    params.formatter.connectors(&connectors)
}
