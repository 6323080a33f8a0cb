#[cfg(test)]
mod cli {
    use assert_cmd::{Command, cargo::cargo_bin_cmd};
    use http::StatusCode;
    use predicates::{
        prelude::PredicateBooleanExt,
        str::{contains, is_empty},
    };
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::{error::Error, fs, io::Write, path::Path};
    use tempfile::{NamedTempFile, tempdir};
    use test_utils::{mock_json_route, mock_server, page_body, throttling_mock_server};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{basic_auth, method, path, query_param, query_param_is_missing},
    };

    type Result<T> = std::result::Result<T, Box<dyn Error>>;

    /// The binary without any inherited environment, run in `dir` so that
    /// no stray `fivetran.toml` is picked up
    fn fivetran(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("fivetran");
        cmd.env_clear().current_dir(dir);
        cmd
    }

    /// The binary pointed at `server` with valid credentials
    fn fivetran_for(server: &MockServer, dir: &Path) -> Command {
        let mut cmd = fivetran(dir);
        cmd.arg("--base-url")
            .arg(format!("{}/v1/", server.uri()))
            .env("FIVETRAN_API_KEY", "key")
            .env("FIVETRAN_API_SECRET", "secret");
        cmd
    }

    #[test]
    fn test_help() {
        let dir = tempdir().unwrap();
        fivetran(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(contains("groups"))
            .stdout(contains("connectors"))
            .stdout(contains("schemas"));
    }

    #[test]
    fn test_missing_credentials() {
        let dir = tempdir().unwrap();
        fivetran(dir.path())
            .arg("groups")
            .assert()
            .failure()
            .code(3)
            .stdout(is_empty())
            .stderr(contains("API key cannot be empty"));
    }

    #[tokio::test]
    async fn test_groups() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/groups"))
            .and(basic_auth("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                page_body!([{"id": "projected_sickle", "name": "Warehouse"}]),
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir()?;
        fivetran_for(&server, dir.path())
            .arg("groups")
            .assert()
            .success()
            .stdout(contains("projected_sickle  Warehouse"))
            .stdout(contains("1 groups"));

        Ok(())
    }

    #[tokio::test]
    async fn test_groups_across_pages() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/groups"))
            .and(query_param("limit", "2"))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                page_body!(
                    [
                        {"id": "g1", "name": "One"},
                        {"id": "g2", "name": "Two"}
                    ],
                    "page2"
                ),
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/groups"))
            .and(query_param("cursor", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                page_body!([{"id": "g3", "name": "Three"}]),
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir()?;
        fivetran_for(&server, dir.path())
            .args(["groups", "--page-size", "2"])
            .assert()
            .success()
            .stdout(contains("g1  One"))
            .stdout(contains("g3  Three"))
            .stdout(contains("3 groups"));

        Ok(())
    }

    #[tokio::test]
    async fn test_connectors_as_json() -> Result<()> {
        let server = MockServer::start().await;
        mock_json_route!(
            server,
            "/v1/groups/projected_sickle/connectors",
            page_body!([{
                "id": "speak_margin",
                "group_id": "projected_sickle",
                "service": "postgres",
                "schema": "pg_public",
                "paused": true
            }])
        );

        let dir = tempdir()?;
        let output = fivetran_for(&server, dir.path())
            .args(["connectors", "projected_sickle", "--format", "json"])
            .output()?;

        assert!(output.status.success());
        let actual: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(
            actual,
            json!([{
                "id": "speak_margin",
                "group_id": "projected_sickle",
                "service": "postgres",
                "schema": "pg_public",
                "paused": true
            }])
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_schemas() -> Result<()> {
        let server = MockServer::start().await;
        let body = json!({
            "code": "Success",
            "data": {
                "schema_change_handling": "ALLOW_COLUMNS",
                "schemas": {
                    "public": {
                        "name_in_destination": "pg_public",
                        "enabled": true,
                        "tables": {
                            "accounts": {"name_in_destination": "accounts", "enabled": true},
                            "audit_log": {"name_in_destination": "audit_log", "enabled": false}
                        }
                    }
                }
            }
        });
        mock_json_route!(server, "/v1/connectors/speak_margin/schemas", body.to_string());

        let dir = tempdir()?;
        fivetran_for(&server, dir.path())
            .args(["schemas", "speak_margin"])
            .assert()
            .success()
            .stdout(contains("public → pg_public"))
            .stdout(contains("(1/2 tables enabled)"))
            .stdout(contains("1 schemas, 1 tables enabled"));

        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_status_exits_with_api_failure() -> Result<()> {
        let server = mock_server!(StatusCode::NOT_FOUND, set_body_string("No group"));

        let dir = tempdir()?;
        fivetran_for(&server, dir.path())
            .args(["connectors", "unknown"])
            .assert()
            .failure()
            .code(2)
            .stdout(is_empty())
            .stderr(contains("Cannot list connectors of group `unknown`"))
            .stderr(contains("404"));

        Ok(())
    }

    #[tokio::test]
    async fn test_blank_id_exits_with_api_failure() -> Result<()> {
        let server = MockServer::start().await;

        let dir = tempdir()?;
        fivetran_for(&server, dir.path())
            .args(["schemas", " "])
            .assert()
            .failure()
            .code(2)
            .stderr(contains("Connector ID cannot be empty"));

        Ok(())
    }

    #[tokio::test]
    async fn test_throttled_request_is_retried() -> Result<()> {
        let server = throttling_mock_server!(
            "/v1/groups",
            1,
            page_body!([{"id": "projected_sickle", "name": "Warehouse"}])
        );

        let dir = tempdir()?;
        fivetran_for(&server, dir.path())
            .args(["groups", "--stats"])
            .assert()
            .success()
            .stdout(contains("1 groups"))
            .stderr(contains("2 requests").and(contains("1 throttled")));

        Ok(())
    }

    #[tokio::test]
    async fn test_credentials_from_config_file() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/groups"))
            .and(basic_auth("file-key", "file-secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(page_body!([]), "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut config = NamedTempFile::new()?;
        writeln!(config, "base_url = \"{}/v1/\"", server.uri())?;
        writeln!(config, "api_key = \"file-key\"")?;
        writeln!(config, "api_secret = \"file-secret\"")?;

        let dir = tempdir()?;
        fivetran(dir.path())
            .arg("--config")
            .arg(config.path())
            .arg("groups")
            .assert()
            .success()
            .stdout(contains("0 groups"));

        Ok(())
    }

    #[tokio::test]
    async fn test_default_config_file() -> Result<()> {
        let server = MockServer::start().await;
        mock_json_route!(server, "/v1/groups", page_body!([]));

        let dir = tempdir()?;
        fs::write(
            dir.path().join("fivetran.toml"),
            format!(
                "base_url = \"{}/v1/\"\napi_key = \"key\"\napi_secret = \"secret\"\nformat = \"json\"\n",
                server.uri()
            ),
        )?;

        fivetran(dir.path())
            .arg("groups")
            .assert()
            .success()
            .stdout(contains("[]"));

        Ok(())
    }

    #[test]
    fn test_invalid_config_file() -> Result<()> {
        let mut config = NamedTempFile::new()?;
        writeln!(config, "max_concurency = 3")?;

        let dir = tempdir()?;
        fivetran(dir.path())
            .arg("--config")
            .arg(config.path())
            .arg("groups")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Cannot load configuration file"));

        Ok(())
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempdir().unwrap();
        fivetran(dir.path())
            .args(["--config", "does-not-exist.toml", "groups"])
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Cannot load configuration file"));
    }

    #[test]
    fn test_invalid_default_config() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("fivetran.toml"), "timeout = \"soon\"")?;

        fivetran(dir.path())
            .arg("groups")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Cannot load default configuration file"));

        Ok(())
    }
}
