//! Per-file processing: policy, timing, and failure containment around one
//! [`ProjectFileModifier`] run.
//!
//! The processor is the recovery boundary of the pipeline. Malformed
//! documents and I/O failures are captured into the processing report and the
//! caller gets the original content back, so a single broken file never
//! aborts a watcher batch. Programming errors (state-machine misuse) panic
//! straight through.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::modifier::ProjectFileModifier;
use crate::paths;
use crate::registry::{ModuleRegistry, DEFAULT_SOURCE_DIRECTORY};
use crate::settings::SharpTidySettings;

pub const STYLECOP_PACKAGE_NAME: &str = "StyleCop.Analyzers";
pub const STYLECOP_PACKAGE_VERSION: &str = "1.1.1-beta.61";
pub const STYLECOP_UNSTABLE_PACKAGE_NAME: &str = "StyleCop.Analyzers.Unstable";
pub const STYLECOP_UNSTABLE_PACKAGE_VERSION: &str = "1.1.1.61";

pub const STYLECOP_INCLUDE_ASSETS: &str = "runtime; build; native; contentfiles; analyzers";
pub const STYLECOP_PRIVATE_ASSETS: &str = "all";

pub const STYLECOP_CONFIG_FILE_NAME: &str = "stylecop.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Processed,
    AlreadyProcessed,
    Failed,
}

/// One record per processing call, populated incrementally and consumed for
/// logging.
#[derive(Debug)]
pub struct ProcessingReport {
    pub project_file_path: String,
    pub module_directory: String,
    pub elapsed: Duration,
    pub outcome: ProcessingOutcome,
    pub error: Option<anyhow::Error>,
}

/// Everything a processing call needs from its surroundings.
pub struct ProcessorContext<'a> {
    pub project_root: &'a Path,
    pub registry: &'a dyn ModuleRegistry,
    pub settings: &'a SharpTidySettings,
}

/// Normalize one project file. Returns the report and the resulting content;
/// the content equals the input unless the outcome is
/// [`ProcessingOutcome::Processed`].
pub fn process_project_file(
    context: &ProcessorContext<'_>,
    path: &str,
    content: &str,
) -> (ProcessingReport, String) {
    let started = Instant::now();

    let mut report = ProcessingReport {
        project_file_path: path.to_string(),
        module_directory: String::new(),
        elapsed: Duration::ZERO,
        outcome: ProcessingOutcome::Failed,
        error: None,
    };

    let result = run_pipeline(context, path, content, &mut report);

    let content = match result {
        Ok((outcome, new_content)) => {
            report.outcome = outcome;
            new_content
        }
        Err(error) => {
            report.outcome = ProcessingOutcome::Failed;
            report.error = Some(error);
            content.to_string()
        }
    };

    report.elapsed = started.elapsed();

    if context.settings.verbose_logging || report.outcome == ProcessingOutcome::Failed {
        log_report(&report);
    }

    (report, content)
}

fn run_pipeline(
    context: &ProcessorContext<'_>,
    path: &str,
    content: &str,
    report: &mut ProcessingReport,
) -> Result<(ProcessingOutcome, String)> {
    let module_name = paths::file_name_without_extension(path);

    let module_directory = context
        .registry
        .module_directory(&module_name)
        .unwrap_or_else(|| DEFAULT_SOURCE_DIRECTORY.to_string());
    report.module_directory = module_directory.clone();

    let mut modifier = ProjectFileModifier::new(content)?;

    if modifier.is_already_processed() {
        return Ok((ProcessingOutcome::AlreadyProcessed, content.to_string()));
    }

    modifier.parse();

    if !context.settings.disable_analyzer_injection {
        let config_relative_path =
            paths::combine(&module_directory, STYLECOP_CONFIG_FILE_NAME);
        let config_path = context.project_root.join(&config_relative_path);

        // Live check on every run: dropping the config file in or out of the
        // module directory flips the policy on the next cycle.
        if config_path.is_file() {
            add_stylecop_packages(&mut modifier, &config_relative_path);
        } else {
            modifier.add_remove_analyzers_target();
        }
    }

    modifier.compose();

    let new_content = modifier
        .content()
        .context("failed to serialize project file document")?;

    Ok((ProcessingOutcome::Processed, new_content))
}

fn add_stylecop_packages(modifier: &mut ProjectFileModifier, config_relative_path: &str) {
    modifier.add_package_reference_item(
        STYLECOP_PACKAGE_NAME,
        STYLECOP_PACKAGE_VERSION,
        STYLECOP_INCLUDE_ASSETS,
        STYLECOP_PRIVATE_ASSETS,
    );
    modifier.add_package_reference_item(
        STYLECOP_UNSTABLE_PACKAGE_NAME,
        STYLECOP_UNSTABLE_PACKAGE_VERSION,
        STYLECOP_INCLUDE_ASSETS,
        STYLECOP_PRIVATE_ASSETS,
    );

    modifier.add_additional_file_item(config_relative_path);
}

fn log_report(report: &ProcessingReport) {
    match report.outcome {
        ProcessingOutcome::Processed => info!(
            "processed project file {} in {:?} (module directory: {})",
            report.project_file_path, report.elapsed, report.module_directory
        ),
        ProcessingOutcome::AlreadyProcessed => info!(
            "project file {} already processed; checking took {:?}",
            report.project_file_path, report.elapsed
        ),
        ProcessingOutcome::Failed => match &report.error {
            Some(error) => error!(
                "failed to process project file {} in {:?}: {error:#}",
                report.project_file_path, report.elapsed
            ),
            None => error!(
                "failed to process project file {} in {:?}",
                report.project_file_path, report.elapsed
            ),
        },
    }
}
