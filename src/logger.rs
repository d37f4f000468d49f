//! Logger setup for the packsmith binary.

use log::LevelFilter;

/// Initializes env_logger for the command line.
///
/// `verbose` raises packsmith's own messages to `Debug`; `RUST_LOG`, when
/// set, refines the levels further. Records carry no timestamp.
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("packsmith", level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(verbose)
        .init();
}
