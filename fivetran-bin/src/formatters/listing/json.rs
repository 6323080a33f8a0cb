use anyhow::{Context, Result};
use fivetran_lib::DispatchStats;
use fivetran_lib::models::{Connector, DataSchemas, Group};
use serde_json::json;

use super::ListingFormatter;

pub(crate) struct Json;

impl Json {
    pub(crate) const fn new() -> Self {
        Self {}
    }
}

impl ListingFormatter for Json {
    fn groups(&self, groups: &[Group]) -> Result<String> {
        serde_json::to_string_pretty(groups).context("Cannot format groups as JSON")
    }

    fn connectors(&self, connectors: &[Connector]) -> Result<String> {
        serde_json::to_string_pretty(connectors).context("Cannot format connectors as JSON")
    }

    fn schemas(&self, connector_id: &str, schemas: Option<&DataSchemas>) -> Result<String> {
        let output = json!({
            "connector_id": connector_id,
            "schema_config": schemas,
        });
        serde_json::to_string_pretty(&output).context("Cannot format schemas as JSON")
    }

    fn stats(&self, stats: &DispatchStats) -> Result<String> {
        serde_json::to_string_pretty(stats).context("Cannot format stats as JSON")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;

    #[test]
    fn test_groups_are_a_json_array() {
        let groups = vec![Group {
            id: "projected_sickle".to_string(),
            name: "Warehouse".to_string(),
            created_at: None,
        }];

        let output = Json::new().groups(&groups).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(
            value,
            json!([{ "id": "projected_sickle", "name": "Warehouse" }])
        );
    }

    #[test]
    fn test_missing_schema_config_is_null() {
        let output = Json::new().schemas("speak_margin", None).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(
            value,
            json!({ "connector_id": "speak_margin", "schema_config": null })
        );
    }

    #[test]
    fn test_stats() {
        let stats = DispatchStats {
            total_requests: 3,
            cache_hits: 2,
            ..DispatchStats::default()
        };

        let output = Json::new().stats(&stats).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["total_requests"], 3);
        assert_eq!(value["cache_hits"], 2);
    }
}
