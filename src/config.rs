//! Config handling

use tracing::log::LevelFilter;

use crate::cli::CliOptions;
use crate::client::ApiEndpoints;
use crate::error::JobError;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("reqwest", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Resolves the vendor endpoints from the CLI/env options.
pub fn endpoints_from(cli: &CliOptions) -> Result<ApiEndpoints, JobError> {
    ApiEndpoints::new(&cli.openai_base_url, &cli.gemini_base_url)
}

/// Candidate models from the CLI, or the defaults when none were given.
pub fn models_or_default(models: &[String], defaults: &[&str]) -> Vec<String> {
    let chosen: Vec<String> = models
        .iter()
        .map(|model| model.trim().to_string())
        .filter(|model| !model.is_empty())
        .collect();
    if chosen.is_empty() {
        defaults.iter().map(|model| model.to_string()).collect()
    } else {
        chosen
    }
}
