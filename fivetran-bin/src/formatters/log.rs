use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

use crate::{formatters, verbosity::Verbosity};

/// Initialize the logging system with the given verbosity level.
///
/// Log messages go to stderr so they never mix with listings on stdout.
pub(crate) fn init_logging(verbose: &Verbosity) {
    // Base level for all modules, overridden by RUST_LOG if it's set
    let env = Env::default().filter_or("RUST_LOG", "warn");

    let mut builder = Builder::from_env(env);
    builder
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false);

    if std::env::var("RUST_LOG").is_err() {
        let level_filter = verbose.log_level_filter();

        // Dependencies stay at `warn` unless RUST_LOG says otherwise
        builder.filter_level(LevelFilter::Warn);
        builder
            .filter_module("fivetran", level_filter)
            .filter_module("fivetran_lib", level_filter);
    }

    builder.format(move |buf, record| {
        let level = record.level();
        let color = formatters::color::color_for_level(level);
        writeln!(
            buf,
            "{} {}",
            color.apply_to(format!("[{level}]")),
            record.args()
        )
    });

    builder.init();
}
