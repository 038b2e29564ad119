//! Re-locating a manifest whenever it changes on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::app::locator::ApplicationNameLocator;
use crate::app::reconcile::{ReconcileSession, Reconciled};
use crate::domain::document::Document;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub path: PathBuf,
    /// Quiet period after the last filesystem event before a pass runs.
    pub debounce: Duration,
}

/// Drives reconcile passes for one manifest file.
pub struct ManifestWatcher {
    options: WatchOptions,
    session: ReconcileSession,
}

impl ManifestWatcher {
    pub fn new(options: WatchOptions, locator: ApplicationNameLocator) -> Self {
        Self {
            options,
            session: ReconcileSession::new(locator),
        }
    }

    /// Run one pass over the current file contents.
    pub fn pass(&mut self) -> Result<Reconciled> {
        let text = fs::read_to_string(&self.options.path)
            .with_context(|| format!("failed to read {}", self.options.path.display()))?;
        Ok(self.session.reconcile(&Document::new(text), None))
    }

    /// Block, calling `on_pass` for the initial pass and after every settled change.
    ///
    /// Returns when the watcher channel closes or `on_pass` fails.
    pub fn run(mut self, mut on_pass: impl FnMut(&Reconciled) -> Result<()>) -> Result<()> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(tx).context("failed to start file watcher")?;
        // Editors often replace the file, so watch the parent directory.
        let watched = watch_target(&self.options.path);
        watcher
            .watch(&watched, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", watched.display()))?;
        tracing::info!(path = %self.options.path.display(), "watching manifest");

        on_pass(&self.pass()?)?;

        while let Ok(event) = rx.recv() {
            if !self.is_relevant(event) {
                continue;
            }
            if !self.settle(&rx) {
                return Ok(());
            }
            match self.pass() {
                Ok(reconciled) => {
                    tracing::info!(
                        entries = reconciled.located.len(),
                        changed = !reconciled.diff.is_empty(),
                        "manifest changed"
                    );
                    on_pass(&reconciled)?;
                }
                // Deleted mid-save; the next event brings it back.
                Err(err) => tracing::warn!(error = %err, "skipping reconcile pass"),
            }
        }
        Ok(())
    }

    /// Wait until no relevant event has arrived for the debounce period.
    /// Unrelated events in the watched directory do not extend the wait.
    /// Returns `false` once the channel is closed.
    fn settle(&self, rx: &Receiver<notify::Result<Event>>) -> bool {
        let mut deadline = Instant::now() + self.options.debounce;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(event) => {
                    if self.is_relevant(event) {
                        deadline = Instant::now() + self.options.debounce;
                    }
                }
                Err(RecvTimeoutError::Timeout) => return true,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    fn is_relevant(&self, event: notify::Result<Event>) -> bool {
        match event {
            Ok(event) => is_relevant_event(&event, &self.options.path),
            Err(err) => {
                tracing::warn!(error = %err, "watch error");
                false
            }
        }
    }
}

fn watch_target(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_relevant_event(event: &Event, path: &Path) -> bool {
    let touches_content = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    );
    touches_content && event.paths.iter().any(|changed| same_file(changed, path))
}

fn same_file(changed: &Path, path: &Path) -> bool {
    if changed == path {
        return true;
    }
    match (changed.canonicalize(), path.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => changed.file_name().is_some() && changed.file_name() == path.file_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn only_content_events_for_the_manifest_count() {
        let path = Path::new("deploy/manifest.yml");
        assert!(is_relevant_event(
            &event(EventKind::Modify(ModifyKind::Any), path),
            path
        ));
        assert!(is_relevant_event(
            &event(EventKind::Create(CreateKind::File), path),
            path
        ));
        assert!(!is_relevant_event(
            &event(EventKind::Access(AccessKind::Any), path),
            path
        ));
        assert!(!is_relevant_event(
            &event(EventKind::Modify(ModifyKind::Any), Path::new("deploy/other.yml")),
            path
        ));
    }

    #[test]
    fn watches_parent_directory() {
        assert_eq!(watch_target(Path::new("manifest.yml")), PathBuf::from("."));
        assert_eq!(
            watch_target(Path::new("deploy/manifest.yml")),
            PathBuf::from("deploy")
        );
    }

    fn watcher_for(path: &Path, locator: ApplicationNameLocator) -> ManifestWatcher {
        ManifestWatcher::new(
            WatchOptions {
                path: path.to_path_buf(),
                debounce: Duration::from_millis(10),
            },
            locator,
        )
    }

    #[test]
    fn pinned_pass_selects_pinned_name_in_every_version() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("manifest.yml");
        fs::write(&path, "applications:\n- name: alpha\n- name: beta\n")?;

        let mut watcher = watcher_for(&path, ApplicationNameLocator::pinned("beta"));
        let first = watcher.pass()?;
        assert_eq!(first.located.selected().map(|e| e.name.as_str()), Some("beta"));

        fs::write(&path, "applications:\n- name: beta\n")?;
        let second = watcher.pass()?;
        assert_eq!(second.located.names(), vec!["beta"]);
        assert_eq!(second.diff.removed.len(), 2);
        Ok(())
    }

    #[test]
    fn pass_carries_selection_to_the_next_file_version() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("manifest.yml");
        fs::write(&path, "applications:\n- name: alpha\n- name: beta\n")?;

        let mut watcher = watcher_for(&path, ApplicationNameLocator::new());
        let first = watcher.pass()?;
        assert_eq!(first.located.selected().map(|e| e.name.as_str()), Some("alpha"));

        // alpha moves below a new first entry; an unpinned pass would
        // otherwise fall back to the first entry.
        fs::write(
            &path,
            "applications:\n- name: gamma\n- name: beta\n- name: alpha\n",
        )?;
        let second = watcher.pass()?;
        assert_eq!(second.located.names(), vec!["gamma", "beta", "alpha"]);
        assert_eq!(second.located.selected_index(), Some(2));
        Ok(())
    }

    #[test]
    fn unrelated_events_do_not_extend_the_quiet_period() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("manifest.yml");
        let noise = temp.path().join("build.log");
        let watcher = watcher_for(&path, ApplicationNameLocator::new());

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let writer = std::thread::spawn(move || {
            for _ in 0..50 {
                let sent = tx.send(Ok(event(EventKind::Modify(ModifyKind::Any), &noise)));
                if sent.is_err() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(2));
            }
        });

        let started = Instant::now();
        assert!(watcher.settle(&rx));
        assert!(started.elapsed() < Duration::from_millis(80));
        drop(rx);
        writer.join().expect("noise writer panicked");
        Ok(())
    }

    #[test]
    fn settle_reports_closed_channel() {
        let watcher = watcher_for(Path::new("manifest.yml"), ApplicationNameLocator::new());
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        drop(tx);
        assert!(!watcher.settle(&rx));
    }
}
