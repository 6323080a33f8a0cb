use anyhow::Result;
use fivetran_lib::DispatchStats;
use fivetran_lib::models::{Connector, DataSchemas, Group};
use std::fmt::{self, Display};

use crate::formatters::color::{BOLD, BOLD_PINK, DIM, GREEN, NORMAL, PINK, YELLOW, color};

use super::ListingFormatter;

/// Sync state shown in front of each connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Paused,
    Failing,
    Ok,
}

impl SyncState {
    /// A connector is failing if its last failure is more recent than its
    /// last success. RFC 3339 timestamps in UTC compare chronologically as
    /// strings.
    fn of(connector: &Connector) -> Self {
        if connector.paused {
            return Self::Paused;
        }
        match (&connector.failed_at, &connector.succeeded_at) {
            (Some(failed), Some(succeeded)) if failed > succeeded => Self::Failing,
            (Some(_), None) => Self::Failing,
            _ => Self::Ok,
        }
    }
}

struct CompactGroups<'a>(&'a [Group]);

impl Display for CompactGroups<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in self.0 {
            color!(f, BOLD, "{}", group.id)?;
            write!(f, "  {}", group.name)?;
            if let Some(created_at) = &group.created_at {
                color!(f, DIM, " (created {})", created_at)?;
            }
            writeln!(f)?;
        }
        color!(f, NORMAL, "{} groups", self.0.len())
    }
}

struct CompactConnectors<'a>(&'a [Connector]);

impl Display for CompactConnectors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for connector in self.0 {
            match SyncState::of(connector) {
                SyncState::Ok => color!(f, GREEN, "{:<8}", "[ok]")?,
                SyncState::Failing => color!(f, PINK, "{:<8}", "[failing]")?,
                SyncState::Paused => color!(f, YELLOW, "{:<8}", "[paused]")?,
            }
            color!(f, BOLD, " {}", connector.id)?;
            write!(f, "  {} → {}", connector.service, connector.schema_name)?;
            if let Some(minutes) = connector.sync_frequency {
                color!(f, DIM, " every {}m", minutes)?;
            }
            writeln!(f)?;
        }
        color!(f, NORMAL, "{} connectors", self.0.len())
    }
}

struct CompactSchemas<'a> {
    connector_id: &'a str,
    schemas: Option<&'a DataSchemas>,
}

impl Display for CompactSchemas<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(config) = self.schemas else {
            return color!(
                f,
                YELLOW,
                "No schema configuration for connector {}",
                self.connector_id
            );
        };

        for (name, schema) in &config.schemas {
            let enabled = schema.tables.values().filter(|t| t.enabled).count();
            if schema.enabled {
                color!(f, BOLD, "{}", name)?;
            } else {
                color!(f, DIM, "{} (disabled)", name)?;
            }
            write!(f, " → {}", schema.name_in_destination)?;
            color!(
                f,
                DIM,
                " ({}/{} tables enabled)\n",
                enabled,
                schema.tables.len()
            )?;

            for (table_name, table) in &schema.tables {
                if table.enabled {
                    writeln!(f, "  {table_name} → {}", table.name_in_destination)?;
                } else {
                    color!(f, DIM, "  {} (disabled)\n", table_name)?;
                }
            }
        }

        write!(
            f,
            "{} schemas, {} tables enabled",
            config.schemas.len(),
            config.enabled_tables()
        )?;
        if let Some(handling) = &config.schema_change_handling {
            color!(f, DIM, " (schema changes: {})", handling)?;
        }
        Ok(())
    }
}

struct CompactStats<'a>(&'a DispatchStats);

impl Display for CompactStats<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.0;
        color!(f, NORMAL, "{}", stats.summary())?;

        let failures = stats.client_errors + stats.server_errors + stats.failed_requests;
        if failures > 0 {
            color!(f, BOLD_PINK, " {} failed", failures)?;
        }
        Ok(())
    }
}

pub(crate) struct Compact;

impl Compact {
    pub(crate) const fn new() -> Self {
        Self {}
    }
}

impl ListingFormatter for Compact {
    fn groups(&self, groups: &[Group]) -> Result<String> {
        Ok(CompactGroups(groups).to_string())
    }

    fn connectors(&self, connectors: &[Connector]) -> Result<String> {
        Ok(CompactConnectors(connectors).to_string())
    }

    fn schemas(&self, connector_id: &str, schemas: Option<&DataSchemas>) -> Result<String> {
        Ok(CompactSchemas {
            connector_id,
            schemas,
        }
        .to_string())
    }

    fn stats(&self, stats: &DispatchStats) -> Result<String> {
        Ok(CompactStats(stats).to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use fivetran_lib::models::{Schema, Table};
    use rstest::rstest;

    use super::*;

    fn connector(paused: bool, succeeded_at: Option<&str>, failed_at: Option<&str>) -> Connector {
        Connector {
            id: "speak_margin".to_string(),
            group_id: "projected_sickle".to_string(),
            service: "postgres".to_string(),
            schema_name: "pg_public".to_string(),
            paused,
            sync_frequency: Some(360),
            succeeded_at: succeeded_at.map(ToString::to_string),
            failed_at: failed_at.map(ToString::to_string),
        }
    }

    #[rstest]
    #[case(connector(false, Some("2024-01-02T00:00:00Z"), None), SyncState::Ok)]
    #[case(
        connector(false, Some("2024-01-02T00:00:00Z"), Some("2024-01-01T00:00:00Z")),
        SyncState::Ok
    )]
    #[case(
        connector(false, Some("2024-01-01T00:00:00Z"), Some("2024-01-02T00:00:00Z")),
        SyncState::Failing
    )]
    #[case(connector(false, None, Some("2024-01-02T00:00:00Z")), SyncState::Failing)]
    #[case(connector(true, None, Some("2024-01-02T00:00:00Z")), SyncState::Paused)]
    #[case(connector(false, None, None), SyncState::Ok)]
    fn test_sync_state(#[case] connector: Connector, #[case] expected: SyncState) {
        assert_eq!(SyncState::of(&connector), expected);
    }

    #[test]
    fn test_groups() {
        let groups = vec![
            Group {
                id: "projected_sickle".to_string(),
                name: "Warehouse".to_string(),
                created_at: Some("2024-01-01T00:00:00Z".to_string()),
            },
            Group {
                id: "decent_dropsy".to_string(),
                name: "Lake".to_string(),
                created_at: None,
            },
        ];

        let output = Compact::new().groups(&groups).unwrap();

        assert!(output.contains("projected_sickle  Warehouse"));
        assert!(output.contains("decent_dropsy  Lake"));
        assert!(output.ends_with("2 groups"));
    }

    #[test]
    fn test_connectors() {
        let output = Compact::new()
            .connectors(&[connector(true, None, None)])
            .unwrap();

        assert!(output.contains("[paused]"));
        assert!(output.contains("speak_margin  postgres → pg_public"));
        assert!(output.contains("every 360m"));
        assert!(output.ends_with("1 connectors"));
    }

    #[test]
    fn test_schemas() {
        let tables = BTreeMap::from([
            (
                "accounts".to_string(),
                Table {
                    name_in_destination: "accounts".to_string(),
                    enabled: true,
                    columns: BTreeMap::new(),
                },
            ),
            (
                "audit_log".to_string(),
                Table {
                    name_in_destination: "audit_log".to_string(),
                    enabled: false,
                    columns: BTreeMap::new(),
                },
            ),
        ]);
        let config = DataSchemas {
            schemas: BTreeMap::from([(
                "public".to_string(),
                Schema {
                    name_in_destination: "pg_public".to_string(),
                    enabled: true,
                    tables,
                },
            )]),
            schema_change_handling: Some("ALLOW_ALL".to_string()),
        };

        let output = Compact::new().schemas("speak_margin", Some(&config)).unwrap();

        assert!(output.contains("public → pg_public"));
        assert!(output.contains("(1/2 tables enabled)"));
        assert!(output.contains("  accounts → accounts"));
        assert!(output.contains("  audit_log (disabled)"));
        assert!(output.contains("1 schemas, 1 tables enabled"));
        assert!(output.contains("schema changes: ALLOW_ALL"));
    }

    #[test]
    fn test_missing_schema_config() {
        let output = Compact::new().schemas("speak_margin", None).unwrap();

        assert!(output.contains("No schema configuration for connector speak_margin"));
    }

    #[test]
    fn test_stats_mention_failures() {
        let stats = DispatchStats {
            total_requests: 2,
            successful_requests: 1,
            client_errors: 1,
            ..DispatchStats::default()
        };

        let output = Compact::new().stats(&stats).unwrap();

        assert!(output.starts_with("2 requests"));
        assert!(output.contains("1 failed"));
    }
}
