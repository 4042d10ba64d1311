use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sharptidy::processor::{process_project_file, ProcessingOutcome, ProcessorContext};
use sharptidy::registry::AssemblyDefinitionRegistry;
use sharptidy::settings::SharpTidySettings;
use sharptidy::watcher::ProjectFileChangeWatcher;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sharptidy")]
#[command(version)]
#[command(about = "Deterministic MSBuild project-file normalizer with StyleCop analyzer injection")]
struct Cli {
    /// Project root directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Log a processing report for every file, regardless of settings
    #[arg(long)]
    verbose: bool,

    /// Project files to process; defaults to every *.csproj directly under the root
    #[arg(value_name = "CSPROJ_PATHS")]
    files: Vec<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch the project root and reprocess project files as they change
    Watch,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let project_root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("failed to get current dir")?,
    };

    if matches!(cli.cmd, Some(Command::Watch)) {
        let watcher = ProjectFileChangeWatcher::start(project_root)?;
        eprintln!("Watching for project file changes; press Enter (or close stdin) to stop.");
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        watcher.stop();
        return Ok(());
    }

    let mut settings = SharpTidySettings::load(&project_root);
    if cli.verbose {
        settings.verbose_logging = true;
    }

    if settings.disable_cleanup {
        eprintln!("Project file cleanup is disabled in settings; nothing to do.");
        return Ok(());
    }

    let files = if cli.files.is_empty() {
        discover_project_files(&project_root)?
    } else {
        cli.files
    };

    if files.is_empty() {
        eprintln!("No project files found under {}", project_root.display());
        return Ok(());
    }

    let registry = AssemblyDefinitionRegistry::scan(&project_root);
    let context = ProcessorContext {
        project_root: &project_root,
        registry: &registry,
        settings: &settings,
    };

    let bar = (files.len() > 1).then(|| {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        bar
    });

    let mut processed = 0usize;
    let mut already_processed = 0usize;
    let mut failed = 0usize;

    for file in &files {
        let absolute_path = if file.is_absolute() {
            file.clone()
        } else {
            project_root.join(file)
        };

        if let Some(bar) = &bar {
            bar.set_message(
                absolute_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
        }

        match run_one(&context, &absolute_path) {
            Ok(ProcessingOutcome::Processed) => processed += 1,
            Ok(ProcessingOutcome::AlreadyProcessed) => already_processed += 1,
            Ok(ProcessingOutcome::Failed) => failed += 1,
            Err(error) => {
                failed += 1;
                tracing::error!("{}: {error:#}", absolute_path.display());
            }
        }

        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    eprintln!(
        "Processed {processed} file(s), {already_processed} already clean, {failed} failed."
    );

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn run_one(context: &ProcessorContext<'_>, absolute_path: &Path) -> Result<ProcessingOutcome> {
    let content = std::fs::read_to_string(absolute_path)
        .with_context(|| format!("failed to read {}", absolute_path.display()))?;

    let (report, new_content) =
        process_project_file(context, &absolute_path.to_string_lossy(), &content);

    if report.outcome == ProcessingOutcome::Processed {
        std::fs::write(absolute_path, new_content)
            .with_context(|| format!("failed to write {}", absolute_path.display()))?;
    }

    Ok(report.outcome)
}

/// Every `*.csproj` directly under the project root — the same set the
/// watcher observes.
fn discover_project_files(project_root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let entries = std::fs::read_dir(project_root)
        .with_context(|| format!("failed to list {}", project_root.display()))?;

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csproj") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
