mod compact;
mod json;

pub(crate) use compact::Compact;
pub(crate) use json::Json;

use anyhow::Result;
use fivetran_lib::DispatchStats;
use fivetran_lib::models::{Connector, DataSchemas, Group};

/// Renders API records for the terminal
pub(crate) trait ListingFormatter {
    /// Format a list of groups
    fn groups(&self, groups: &[Group]) -> Result<String>;

    /// Format the connectors of one group
    fn connectors(&self, connectors: &[Connector]) -> Result<String>;

    /// Format the schema configuration of a connector. `None` means the
    /// server returned no configuration.
    fn schemas(&self, connector_id: &str, schemas: Option<&DataSchemas>) -> Result<String>;

    /// Format the request statistics of a run
    fn stats(&self, stats: &DispatchStats) -> Result<String>;
}
