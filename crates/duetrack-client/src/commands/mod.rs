//! Command implementations.

pub mod config;
pub mod convert;
pub mod edit;
pub mod fetch;
pub mod list;
pub mod month;

use std::path::{Path, PathBuf};

use duetrack_core::{CourseRegistry, FormatOptions, OutputFormat, load_path};
use tracing::{debug, warn};

use crate::cli::Cli;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Settings shared by the commands.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: ClientConfig,
    /// Deadline file read and written by the commands.
    pub data_file: PathBuf,
    pub format: OutputFormat,
    pub options: FormatOptions,
}

impl Context {
    /// Combines the configuration with the command-line overrides.
    pub fn new(cli: &Cli, config: ClientConfig) -> Self {
        let data_file = cli
            .file
            .clone()
            .unwrap_or_else(|| config.storage.data_file());
        let options = config.display.to_format_options(cli.max_title_length);
        Self {
            data_file,
            format: cli.output_format(),
            options,
            config,
        }
    }

    pub fn load(&self) -> ClientResult<CourseRegistry> {
        load_registry(&self.data_file)
    }
}

/// Loads a deadline file.
///
/// A missing file or a file without records gives an empty registry. A file
/// whose records are all invalid is an error; invalid records next to valid
/// ones are logged and skipped.
pub fn load_registry(path: &Path) -> ClientResult<CourseRegistry> {
    if !path.exists() {
        debug!(path = %path.display(), "No deadline file yet");
        return Ok(CourseRegistry::new());
    }

    let report = load_path(path)?;
    if report.outcomes.is_empty() {
        return Ok(report.registry);
    }
    if !report.is_success() {
        return Err(ClientError::Input(format!(
            "{} holds no valid deadline ({} invalid records)",
            path.display(),
            report.skipped_count()
        )));
    }
    if report.is_partial() {
        warn!(
            path = %path.display(),
            loaded = report.loaded(),
            skipped = report.skipped_count(),
            "Some deadline records were skipped"
        );
    }
    Ok(report.registry)
}
