use crate::verbosity::Verbosity;
use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand, builder::TypedValueParser};
use const_format::{concatcp, formatcp};
use fivetran_lib::ratelimit::{DEFAULT_CACHE_TTL, DEFAULT_MAX_CONCURRENCY, DEFAULT_RETRY_AFTER};
use fivetran_lib::{
    DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::{fs, path::PathBuf, time::Duration};
use strum::{Display, EnumIter, EnumString, VariantNames};

pub(crate) const FIVETRAN_CONFIG_FILE: &str = "fivetran.toml";

// clap wants `&str` defaults, serde wants functions returning owned values
const TIMEOUT_STR: &str = concatcp!(DEFAULT_TIMEOUT_SECS);
const MAX_CONCURRENCY_STR: &str = concatcp!(DEFAULT_MAX_CONCURRENCY);
const PAGE_SIZE_STR: &str = concatcp!(DEFAULT_PAGE_SIZE);
const CACHE_TTL_STR: &str = "1h";
const RETRY_AFTER_STR: &str = "60s";

// Shows the default config file while still telling apart whether the user
// passed one; only an explicitly given file has to exist.
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    FIVETRAN_CONFIG_FILE,
);

/// How listings are printed to stdout
#[derive(
    Debug,
    Deserialize,
    Default,
    Clone,
    Copy,
    Display,
    EnumIter,
    EnumString,
    VariantNames,
    PartialEq,
    Eq,
)]
#[non_exhaustive]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub(crate) enum OutputFormat {
    /// One line per item, colored when writing to a terminal
    #[default]
    Compact,
    /// Pretty-printed JSON
    Json,
}

/// What to fetch
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// List all groups of the account
    Groups,

    /// List the connectors of a group
    Connectors {
        /// ID of the group
        group_id: String,
    },

    /// Show the schema configuration of a connector
    Schemas {
        /// ID of the connector
        connector_id: String,
    },
}

/// Command-line client for the Fivetran REST API
#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct FivetranOptions {
    #[command(subcommand)]
    pub(crate) command: Command,

    /// Configuration file to use
    #[arg(short, long = "config", global = true, help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    base_url: String = DEFAULT_BASE_URL.to_string();
    timeout: u64 = DEFAULT_TIMEOUT_SECS;
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    max_concurrency: usize = DEFAULT_MAX_CONCURRENCY;
    cache_ttl: Duration = DEFAULT_CACHE_TTL;
    retry_after: Duration = DEFAULT_RETRY_AFTER;
    page_size: usize = DEFAULT_PAGE_SIZE;
    verbosity: Verbosity = Verbosity::default();
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// Settings shared by all subcommands.
///
/// Every field can come from the command line or from the configuration
/// file. Values given on the command line win.
#[derive(Parser, Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// Base URL of the API
    #[arg(long, global = true, env = "FIVETRAN_BASE_URL", default_value = DEFAULT_BASE_URL)]
    #[serde(default = "base_url")]
    pub(crate) base_url: String,

    /// API key
    #[arg(long, global = true, env = "FIVETRAN_API_KEY", hide_env_values = true)]
    #[serde(default)]
    pub(crate) api_key: Option<SecretString>,

    /// API secret
    #[arg(long, global = true, env = "FIVETRAN_API_SECRET", hide_env_values = true)]
    #[serde(default)]
    pub(crate) api_secret: Option<SecretString>,

    /// Request timeout in seconds
    #[arg(short, long, global = true, default_value = &TIMEOUT_STR)]
    #[serde(default = "timeout")]
    pub(crate) timeout: u64,

    /// User agent
    #[arg(short, long, global = true, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Maximum number of requests in flight. 0 means no limit
    #[arg(long, global = true, default_value = &MAX_CONCURRENCY_STR)]
    #[serde(default = "max_concurrency")]
    pub(crate) max_concurrency: usize,

    /// How long successful responses are reused within one run
    #[arg(
        long,
        global = true,
        value_parser = humantime::parse_duration,
        default_value = &CACHE_TTL_STR
    )]
    #[serde(default = "cache_ttl")]
    #[serde(with = "humantime_serde")]
    pub(crate) cache_ttl: Duration,

    /// How long to pause all requests after a 429 response without a
    /// usable Retry-After header
    #[arg(
        long,
        global = true,
        value_parser = humantime::parse_duration,
        default_value = &RETRY_AFTER_STR
    )]
    #[serde(default = "retry_after")]
    #[serde(with = "humantime_serde")]
    pub(crate) retry_after: Duration,

    /// Number of items requested per page
    #[arg(long, global = true, default_value = &PAGE_SIZE_STR)]
    #[serde(default = "page_size")]
    pub(crate) page_size: usize,

    /// Output format
    #[arg(
        short,
        long,
        global = true,
        default_value = "compact",
        value_parser = PossibleValuesParser::new(OutputFormat::VARIANTS)
            .map(|s| s.parse::<OutputFormat>().unwrap_or_default())
    )]
    #[serde(default)]
    pub(crate) format: OutputFormat,

    /// Print request statistics to stderr when done
    #[arg(long, global = true)]
    #[serde(default)]
    pub(crate) stats: bool,
}

impl Config {
    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        // SecretString doesn't implement Eq, so credentials are merged outside
        // of fold_in!
        if self.api_key.is_none() && toml.api_key.is_some() {
            self.api_key = toml.api_key;
        }
        if self.api_secret.is_none() && toml.api_secret.is_some() {
            self.api_secret = toml.api_secret;
        }

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..api_key,
                ..api_secret,

                // Keys with defaults to assign
                base_url: DEFAULT_BASE_URL,
                cache_ttl: DEFAULT_CACHE_TTL,
                format: OutputFormat::default(),
                max_concurrency: DEFAULT_MAX_CONCURRENCY,
                page_size: DEFAULT_PAGE_SIZE,
                retry_after: DEFAULT_RETRY_AFTER,
                stats: false,
                timeout: DEFAULT_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT,
                verbose: Verbosity::default(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn parse(args: &[&str]) -> FivetranOptions {
        FivetranOptions::try_parse_from(args).unwrap()
    }

    #[test]
    fn verify_app() {
        FivetranOptions::command().debug_assert();
    }

    #[test]
    fn test_string_defaults_match_library_defaults() {
        assert_eq!(
            humantime::parse_duration(CACHE_TTL_STR).unwrap(),
            DEFAULT_CACHE_TTL
        );
        assert_eq!(
            humantime::parse_duration(RETRY_AFTER_STR).unwrap(),
            DEFAULT_RETRY_AFTER
        );
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(parse(&["fivetran", "groups"]).command, Command::Groups);
        assert_eq!(
            parse(&["fivetran", "connectors", "group_1"]).command,
            Command::Connectors {
                group_id: "group_1".to_string()
            }
        );
        assert_eq!(
            parse(&["fivetran", "schemas", "conn_1"]).command,
            Command::Schemas {
                connector_id: "conn_1".to_string()
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let opts = parse(&[
            "fivetran",
            "groups",
            "--max-concurrency",
            "4",
            "--cache-ttl",
            "5m",
            "--format",
            "json",
        ]);

        assert_eq!(opts.config.max_concurrency, 4);
        assert_eq!(opts.config.cache_ttl, Duration::from_secs(300));
        assert_eq!(opts.config.format, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(FivetranOptions::try_parse_from(["fivetran", "groups", "-f", "xml"]).is_err());
    }

    #[test]
    fn test_cli_values_take_precedence_over_config_file() {
        let mut cli = parse(&["fivetran", "groups", "--page-size", "10"]).config;
        let toml: Config = toml::from_str(
            r#"
            page_size = 50
            max_concurrency = 8
            retry_after = "2m"
            "#,
        )
        .unwrap();

        cli.merge(toml);

        assert_eq!(cli.page_size, 10);
        assert_eq!(cli.max_concurrency, 8);
        assert_eq!(cli.retry_after, Duration::from_secs(120));
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_credentials_from_config_file() {
        let mut cli = Config::default();
        let toml: Config = toml::from_str(
            r#"
            api_key = "file-key"
            api_secret = "file-secret"
            "#,
        )
        .unwrap();

        cli.merge(toml);

        assert_eq!(cli.api_key.unwrap().expose_secret(), "file-key");
        assert_eq!(cli.api_secret.unwrap().expose_secret(), "file-secret");
    }

    #[test]
    fn test_cli_credentials_are_kept() {
        let mut cli = Config {
            api_key: Some(SecretString::from("cli-key".to_string())),
            ..Config::default()
        };
        let toml: Config = toml::from_str(r#"api_key = "file-key""#).unwrap();

        cli.merge(toml);

        assert_eq!(cli.api_key.unwrap().expose_secret(), "cli-key");
    }

    #[test]
    fn test_verbosity_from_config_file() {
        let mut cli = Config::default();
        let toml: Config = toml::from_str(r#"verbose = "debug""#).unwrap();

        cli.merge(toml);

        assert_eq!(cli.verbose.log_level(), log::Level::Debug);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_concurency = 3").unwrap();

        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        assert!(Config::load_from_file(Path::new("does/not/exist.toml")).is_err());
    }
}
