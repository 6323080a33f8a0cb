//! `fivetran` is a command-line client for the Fivetran REST API.
//!
//! The binary is a thin wrapper around fivetran-lib: it reads credentials and
//! settings from flags, environment variables and `fivetran.toml`, fetches the
//! requested records and prints them.
//!
//! List all groups of the account:
//!
//! ```sh
//! export FIVETRAN_API_KEY=... FIVETRAN_API_SECRET=...
//! fivetran groups
//! ```
//!
//! List the connectors of a group as JSON:
//!
//! ```sh
//! fivetran connectors projected_sickle --format json
//! ```
//!
//! Show which schemas and tables a connector syncs, with at most four
//! requests in flight:
//!
//! ```sh
//! fivetran schemas speak_margin --max-concurrency 4 --stats
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Error, Result, bail};
use clap::Parser;
use fivetran_lib::ErrorKind;
use formatters::log::init_logging;
use log::{error, warn};
#[cfg(feature = "native-tls")]
use openssl_sys as _; // required for vendored-openssl feature
use tokio_util::sync::CancellationToken;

mod client;
mod commands;
mod formatters;
mod options;
mod verbosity;

use crate::commands::CommandParams;
use crate::formatters::get_listing_formatter;
use crate::options::{Command, Config, FIVETRAN_CONFIG_FILE, FivetranOptions};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator.
    #[allow(unused)]
    UnexpectedFailure = 1,
    ApiFailure = 2,
    ConfigFile = 3,
    Interrupted = 130,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file, command-line- and environment variables
fn load_config() -> Result<FivetranOptions> {
    let mut opts = FivetranOptions::parse();

    init_logging(&opts.config.verbose);

    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // Without an explicit config file, the default one is used if it
        // exists. An invalid default file is still an error.
        let default_config = PathBuf::from(FIVETRAN_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }

    Ok(opts)
}

/// Set up runtime and call the entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error while loading config: {e}");
            exit(ExitCode::ConfigFile as i32);
        }
    };

    let client = match client::create(&opts.config) {
        Ok(client) => client,
        Err(e) => {
            error!("{e:#}");
            exit(ExitCode::ConfigFile as i32);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;

    match runtime.block_on(run(&opts, client)) {
        Err(e) if Some(io::ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// Check if the given error can be traced back to an `io::ErrorKind`
/// This is helpful for troubleshooting the root cause of an error.
/// Code is taken from the anyhow documentation.
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Map a failed command to its exit code.
///
/// Errors reported by the API client are expected failures; anything else
/// is passed on.
fn exit_code_for(error: Error) -> Result<ExitCode> {
    match error.downcast_ref::<ErrorKind>() {
        Some(ErrorKind::Cancelled) => {
            warn!("Interrupted");
            Ok(ExitCode::Interrupted)
        }
        Some(_) => {
            error!("{error:#}");
            Ok(ExitCode::ApiFailure)
        }
        None => Err(error),
    }
}

/// Run the subcommand given on the command line
async fn run(opts: &FivetranOptions, client: fivetran_lib::Client) -> Result<i32> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let params = CommandParams {
        client,
        formatter: get_listing_formatter(opts.config.format),
        cancel,
    };

    let output = match &opts.command {
        Command::Groups => commands::groups(&params).await,
        Command::Connectors { group_id } => commands::connectors(&params, group_id).await,
        Command::Schemas { connector_id } => commands::schemas(&params, connector_id).await,
    };

    if opts.config.stats {
        let stats = params.formatter.stats(&params.client.stats())?;
        writeln!(io::stderr(), "{stats}")?;
    }

    let exit_code = match output {
        Ok(output) => {
            writeln!(io::stdout(), "{output}")?;
            ExitCode::Success
        }
        Err(e) => exit_code_for(e)?,
    };

    Ok(exit_code as i32)
}
