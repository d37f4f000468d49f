//! packsmith's main application entry point and orchestration logic.
//! Loads the configuration layers, builds the distro defaults and runs every
//! requested build.

use packsmith::{
    archive::{Archiver, TarArchiver},
    build::BuildDefinition,
    cli::{get_args, Args},
    config::{load_optional_toml, load_toml, AppConfig, BuildLists, Builds, Supported},
    error::{default_error_handler, PacksmithError, PacksmithResult},
    iso::Distro,
    logger::init_logger,
    processor::{BuildRequest, Processor},
    registry::DistroDefaults,
};

/// Main application entry point.
fn main() {
    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Turns the command line into build requests.
fn build_requests(args: &Args, lists: &BuildLists) -> PacksmithResult<Vec<BuildRequest>> {
    let mut requests = Vec::new();

    if let Some(distro) = &args.distro {
        let distro: Distro = distro.parse()?;
        requests.push(BuildRequest::Distro {
            distro,
            arch: args.arch.clone().unwrap_or_default(),
            image: args.image.clone().unwrap_or_default(),
            release: args.release.clone().unwrap_or_default(),
        });
    }

    let mut names: Vec<String> = Vec::new();
    for name in args.builds.iter().chain(lists.expand(&args.lists)?.iter()) {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    requests.extend(names.into_iter().map(BuildRequest::Named));
    Ok(requests)
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads the application settings and the layer files
/// 2. Builds the default template of every supported distro
/// 3. Generates each requested build, archiving prior output
/// 4. Reports the outcome; any failed build fails the run
fn run(args: Args) -> PacksmithResult<()> {
    let config = AppConfig::load(args.config.as_deref())?;

    let defaults: BuildDefinition = load_toml(config.defaults_path())?;
    let supported: Supported = load_toml(config.supported_path())?;
    let builds: Builds = load_optional_toml(config.builds_path())?;
    let lists: BuildLists = load_optional_toml(config.build_lists_path())?;

    let registry = DistroDefaults::new(&defaults, &supported, &config.delimiter)?;
    let requests = build_requests(&args, &lists)?;

    let archiver = TarArchiver::new();
    let archiver: Option<&dyn Archiver> = if config.archive_prior_build && !args.no_archive {
        Some(&archiver)
    } else {
        None
    };
    let processor = Processor::new(&registry, &supported, &builds).with_archiver(archiver);

    let report = processor.process_all(&requests);
    for path in &report.written {
        println!("Created: '{}'", path.display());
    }
    if !report.is_success() {
        return Err(PacksmithError::BatchError {
            failed: report.failed.len(),
            total: requests.len(),
        });
    }

    println!("Generated {} Packer template(s).", report.written.len());
    Ok(())
}
