//! Debounced watcher over the project's generated `.csproj` files.
//!
//! Raw notify events are coalesced into a pending-file set; every event
//! restarts the debounce window, and only when the window expires does the
//! consumer thread drain the set and reprocess each file. The set is swapped
//! out under the lock and processed outside it, so a slow batch never blocks
//! the event producer.
//!
//! The watcher is an explicitly owned object with a start/stop lifecycle;
//! the process entry point decides where the single instance lives.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::processor::{process_project_file, ProcessingOutcome, ProcessorContext};
use crate::registry::AssemblyDefinitionRegistry;
use crate::settings::SharpTidySettings;

/// Quiet period after the last change event before reprocessing runs.
pub const PROCESS_FILE_DELAY: Duration = Duration::from_millis(2500);

const PROJECT_FILE_EXTENSION: &str = "csproj";

enum WatcherSignal {
    Activity,
    Shutdown,
}

pub struct ProjectFileChangeWatcher {
    signal_tx: mpsc::Sender<WatcherSignal>,
    job_thread: Option<JoinHandle<()>>,

    // Dropping the notify watcher stops event delivery.
    _fs_watcher: RecommendedWatcher,
}

impl ProjectFileChangeWatcher {
    /// Watch `project_root` (non-recursively) for project-file changes with
    /// the standard debounce delay.
    pub fn start(project_root: PathBuf) -> Result<Self> {
        Self::start_with_delay(project_root, PROCESS_FILE_DELAY)
    }

    /// As [`ProjectFileChangeWatcher::start`], with a caller-chosen debounce
    /// window. Tests use short windows.
    pub fn start_with_delay(project_root: PathBuf, delay: Duration) -> Result<Self> {
        let pending_files = Arc::new(Mutex::new(HashSet::<String>::new()));
        let (signal_tx, signal_rx) = mpsc::channel();

        let producer_files = Arc::clone(&pending_files);
        let producer_tx = signal_tx.clone();

        let mut fs_watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    let is_delete = matches!(event.kind, EventKind::Remove(_));
                    let is_change = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    );
                    if !is_change {
                        return;
                    }

                    let mut touched = false;
                    {
                        let mut files = producer_files.lock();
                        for path in &event.paths {
                            if path.extension().and_then(|e| e.to_str())
                                != Some(PROJECT_FILE_EXTENSION)
                            {
                                continue;
                            }
                            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                                continue;
                            };
                            note_change(&mut files, name, is_delete);
                            touched = true;
                        }
                    }

                    // Nudge the consumer so the debounce window restarts.
                    if touched {
                        let _ = producer_tx.send(WatcherSignal::Activity);
                    }
                }
                Err(error) => warn!("file watcher error: {error}"),
            })
            .context("failed to create filesystem watcher")?;

        fs_watcher
            .watch(&project_root, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", project_root.display()))?;

        let job_files = Arc::clone(&pending_files);
        let job_root = project_root.clone();
        let job_thread = std::thread::Builder::new()
            .name("sharptidy-debounce".to_string())
            .spawn(move || debounce_loop(&job_root, &job_files, &signal_rx, delay))
            .context("failed to spawn debounce thread")?;

        info!("watching {} for project file changes", project_root.display());

        Ok(Self {
            signal_tx,
            job_thread: Some(job_thread),
            _fs_watcher: fs_watcher,
        })
    }

    /// Stop watching and wait for an in-flight batch to finish.
    pub fn stop(self) {
        // Drop runs the shutdown.
    }

    fn shutdown(&mut self) {
        let _ = self.signal_tx.send(WatcherSignal::Shutdown);
        if let Some(handle) = self.job_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProjectFileChangeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Record one raw change in the pending set. Deletes retract a pending file,
/// so a create-then-delete inside one window cancels out.
fn note_change(files: &mut HashSet<String>, name: &str, is_delete: bool) {
    if is_delete {
        files.remove(name);
    } else {
        files.insert(name.to_string());
    }
}

fn debounce_loop(
    project_root: &Path,
    pending_files: &Mutex<HashSet<String>>,
    signal_rx: &Receiver<WatcherSignal>,
    delay: Duration,
) {
    loop {
        // Sleep until the first event of a burst.
        match signal_rx.recv() {
            Ok(WatcherSignal::Activity) => {}
            Ok(WatcherSignal::Shutdown) | Err(_) => return,
        }

        // Every further event restarts the window; it only expires after a
        // full quiet period.
        loop {
            match signal_rx.recv_timeout(delay) {
                Ok(WatcherSignal::Activity) => continue,
                Ok(WatcherSignal::Shutdown) => return,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        // Swap the set out under the lock; process outside it.
        let batch: HashSet<String> = std::mem::take(&mut *pending_files.lock());
        process_batch(project_root, batch);
    }
}

fn process_batch(project_root: &Path, batch: HashSet<String>) {
    if batch.is_empty() {
        return;
    }

    let settings = SharpTidySettings::load(project_root);
    if settings.disable_cleanup {
        debug!("project file cleanup is disabled; skipping {} file(s)", batch.len());
        return;
    }

    let registry = AssemblyDefinitionRegistry::scan(project_root);
    let context = ProcessorContext {
        project_root,
        registry: &registry,
        settings: &settings,
    };

    for file_name in batch {
        // One file's failure never aborts the rest of the batch.
        if let Err(failure) = process_pending_file(&context, project_root, &file_name) {
            error!("failed to clean up project file {file_name}: {failure:#}");
        }
    }
}

fn process_pending_file(
    context: &ProcessorContext<'_>,
    project_root: &Path,
    file_name: &str,
) -> Result<()> {
    let absolute_path = project_root.join(file_name);

    let content = std::fs::read_to_string(&absolute_path)
        .with_context(|| format!("failed to read {}", absolute_path.display()))?;

    let (report, new_content) =
        process_project_file(context, &absolute_path.to_string_lossy(), &content);

    if report.outcome == ProcessingOutcome::Processed {
        std::fs::write(&absolute_path, new_content)
            .with_context(|| format!("failed to write {}", absolute_path.display()))?;
    }

    Ok(())
}
