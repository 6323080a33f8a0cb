//! Records returned by the Fivetran REST API.
//!
//! Only the fields we use are modelled; anything else in the payload is
//! ignored on decoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A group of connectors sharing one destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Creation timestamp as sent by the server (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A connector syncing one source into its group's destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    /// Unique identifier
    pub id: String,
    /// The group this connector belongs to
    pub group_id: String,
    /// Source type, e.g. `postgres` or `salesforce`
    pub service: String,
    /// Name of the destination schema
    #[serde(default, rename = "schema")]
    pub schema_name: String,
    /// Whether syncing is paused
    #[serde(default)]
    pub paused: bool,
    /// Minutes between syncs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_frequency: Option<u32>,
    /// Timestamp of the last successful sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succeeded_at: Option<String>,
    /// Timestamp of the last failed sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
}

/// Schema configuration of a connector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSchemas {
    /// Source schemas by name
    #[serde(default)]
    pub schemas: BTreeMap<String, Schema>,
    /// How new schema objects are handled, e.g. `ALLOW_ALL`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_change_handling: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name_in_destination: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name_in_destination: String,
    #[serde(default)]
    pub enabled: bool,
    /// Only present when the connector reports column-level configuration
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name_in_destination: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub hashed: bool,
}

impl DataSchemas {
    /// Number of enabled tables across all enabled schemas
    #[must_use]
    pub fn enabled_tables(&self) -> usize {
        self.schemas
            .values()
            .filter(|schema| schema.enabled)
            .flat_map(|schema| schema.tables.values())
            .filter(|table| table.enabled)
            .count()
    }
}
