use anyhow::{Context, Result};
use futures::TryStreamExt;
use fivetran_lib::models::Group;
use log::info;

use super::CommandParams;

/// List all groups of the account
pub(crate) async fn groups(params: &CommandParams) -> Result<String> {
    let groups: Vec<Group> = params
        .client
        .groups(&params.cancel)
        .try_collect()
        .await
        .context("Cannot list groups")?;

    info!("Found {} groups", groups.len());
    params.formatter.groups(&groups)
}
