//! Command-line interface implementation for packsmith.
//! Provides argument parsing and help text formatting using clap.

use clap::{CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments structure for packsmith.
#[derive(Parser, Debug)]
#[command(author, version, about = "packsmith: generate Packer templates from layered TOML configuration", long_about = None)]
pub struct Args {
    /// Names of builds defined in the builds file
    #[arg(value_name = "BUILD")]
    pub builds: Vec<String>,

    /// Generate the default template of a supported distro
    #[arg(short, long)]
    pub distro: Option<String>,

    /// Architecture override for --distro
    #[arg(long, requires = "distro")]
    pub arch: Option<String>,

    /// Image override for --distro
    #[arg(long, requires = "distro")]
    pub image: Option<String>,

    /// Release override for --distro
    #[arg(long, requires = "distro")]
    pub release: Option<String>,

    /// Build lists to expand into their builds
    #[arg(short, long, value_delimiter = ',')]
    pub lists: Vec<String>,

    /// Path to the application configuration file
    #[arg(short, long, env = "PACKSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not archive the prior contents of output directories
    #[arg(long)]
    pub no_archive: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// True when the arguments name at least one template to generate.
    pub fn has_requests(&self) -> bool {
        !self.builds.is_empty() || !self.lists.is_empty() || self.distro.is_some()
    }
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
///
/// # Exits
/// * With status code 1 if nothing to generate was requested
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    let args = Args::parse();
    if !args.has_requests() {
        let _ = Args::command()
            .help_template(
                r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
            )
            .print_help();
        std::process::exit(1);
    }
    args
}
