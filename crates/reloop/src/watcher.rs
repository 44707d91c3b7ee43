//! File system watcher that raises the [`ChangeSignal`] on source edits.
//!
//! Every non-excluded directory under the project root is registered with
//! `notify` individually (non-recursive), so excluded trees such as `build/`
//! never cost a watch descriptor and never produce events. Directories
//! created while the session runs are walked and registered as they appear.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};
use walkdir::WalkDir;

use crate::change::ChangeSignal;
use crate::error::Result;

/// Directories that never trigger a rebuild: build output, static assets,
/// templates, vendored dependencies and logs.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &["build", "static", "views", "vendor", "logs"];

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
enum DirRule {
    /// Matches any path component with this name
    Name(String),
    /// Matches a path relative to the root
    Prefix(PathBuf),
}

/// Exclusion predicate for the watch set.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    dirs: Vec<DirRule>,
    files: GlobSet,
    exact: Vec<PathBuf>,
}

impl WatchFilter {
    /// Build a filter rooted at `root` with the default exclusions plus the
    /// given directory names/prefixes and file globs.
    ///
    /// Directory entries containing a `/` are treated as prefixes relative to
    /// the root; bare names match at any depth. File globs are matched
    /// against both the file name and the path relative to the root.
    pub fn new<D, F>(root: impl AsRef<Path>, exclude_dirs: D, exclude_files: F) -> Result<Self>
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        let root = root.as_ref();
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        let mut dirs: Vec<DirRule> = DEFAULT_EXCLUDE_DIRS
            .iter()
            .map(|name| DirRule::Name((*name).to_string()))
            .collect();
        for entry in exclude_dirs {
            let entry = entry.as_ref().trim_matches('/');
            if entry.is_empty() {
                continue;
            }
            if entry.contains('/') {
                dirs.push(DirRule::Prefix(PathBuf::from(entry)));
            } else {
                dirs.push(DirRule::Name(entry.to_string()));
            }
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in exclude_files {
            builder.add(Glob::new(pattern.as_ref())?);
        }

        Ok(Self {
            root,
            dirs,
            files: builder.build()?,
            exact: Vec::new(),
        })
    }

    /// Exclude one specific file, typically the generated entry point that
    /// every rebuild rewrites. Relative paths are taken from the root.
    pub fn exclude_path(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let normalized: PathBuf = relative
            .components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect();
        self.exact.push(normalized);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }

    /// Whether a directory (and everything below it) is out of the watch set.
    pub fn is_excluded_dir(&self, path: &Path) -> bool {
        let Some(relative) = self.relative(path) else {
            return true;
        };
        self.excludes_relative_dir(relative)
    }

    fn excludes_relative_dir(&self, relative: &Path) -> bool {
        for component in relative.components() {
            let name = component.as_os_str().to_string_lossy();
            if is_hidden(&name) {
                return true;
            }
            let by_name = self
                .dirs
                .iter()
                .any(|rule| matches!(rule, DirRule::Name(n) if *n == name));
            if by_name {
                return true;
            }
        }
        self.dirs
            .iter()
            .any(|rule| matches!(rule, DirRule::Prefix(prefix) if relative.starts_with(prefix)))
    }

    /// Whether a change to this file should be ignored.
    pub fn is_excluded_file(&self, path: &Path) -> bool {
        let Some(relative) = self.relative(path) else {
            return true;
        };
        if let Some(parent) = relative.parent() {
            if self.excludes_relative_dir(parent) {
                return true;
            }
        }
        let Some(name) = relative.file_name() else {
            return true;
        };
        if is_hidden(&name.to_string_lossy()) {
            return true;
        }
        if self.exact.iter().any(|exact| exact == relative) {
            return true;
        }
        self.files.is_match(name) || self.files.is_match(relative)
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

/// Registered directories plus the OS watcher they are registered with.
struct WatchSet {
    watcher: RecommendedWatcher,
    filter: WatchFilter,
    watched: HashSet<PathBuf>,
    signal: ChangeSignal,
}

impl WatchSet {
    /// Register `dir` and every non-excluded directory below it.
    fn add_tree(&mut self, dir: &Path) {
        let filter = &self.filter;
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                !entry.file_type().is_dir() || !filter.is_excluded_dir(entry.path())
            });

        let mut added = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => added.push(entry.into_path()),
                Ok(_) => {}
                Err(err) => trace!(%err, "skipping unreadable path"),
            }
        }

        for path in added {
            if self.watched.contains(&path) {
                continue;
            }
            match self.watcher.watch(&path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    trace!(path = %path.display(), "watching directory");
                    self.watched.insert(path);
                }
                Err(err) => trace!(%err, path = %path.display(), "could not watch directory"),
            }
        }
    }

    fn handle(&mut self, event: Event) {
        match event.kind {
            EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_)) | EventKind::Other => {
                return;
            }
            _ => {}
        }

        let mut relevant = None;
        for path in &event.paths {
            if path.is_dir() {
                if self.filter.is_excluded_dir(path) {
                    continue;
                }
                if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))) {
                    self.add_tree(path);
                }
                relevant.get_or_insert(path.clone());
            } else {
                let gone = matches!(
                    event.kind,
                    EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
                ) && !path.exists();
                if gone {
                    self.watched.remove(path);
                    // A vanished path may have been an excluded directory
                    if self.filter.is_excluded_dir(path) {
                        continue;
                    }
                }
                if !self.filter.is_excluded_file(path) {
                    relevant.get_or_insert(path.clone());
                }
            }
        }

        if let Some(path) = relevant {
            if self.signal.raise() {
                info!(path = %path.display(), "change detected, rebuilding on next request");
            } else {
                debug!(path = %path.display(), "change already pending");
            }
        }
    }
}

/// Running watcher. Dropping it without [`FileWatcher::stop`] leaves the
/// event task to end when the runtime shuts down.
pub struct FileWatcher {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl FileWatcher {
    /// Register the initial watch set and start the event loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(filter: WatchFilter, signal: ChangeSignal) -> Result<Self> {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

        // notify calls back on its own thread, outside the runtime
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        let root = filter.root().to_path_buf();
        let mut set = WatchSet {
            watcher,
            filter,
            watched: HashSet::new(),
            signal,
        };
        set.add_tree(&root);
        info!(root = %root.display(), dirs = set.watched.len(), "watching for changes");

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    event = rx.recv() => match event {
                        Some(Ok(event)) => set.handle(event),
                        Some(Err(err)) => trace!(%err, "watcher error"),
                        None => break,
                    },
                }
            }
            debug!("file watcher stopped");
        });

        Ok(Self {
            stop: Some(stop_tx),
            task,
        })
    }

    /// End the event loop and release every OS watch.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(err) = (&mut self.task).await {
            debug!(%err, "watcher task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn filter(root: &Path) -> WatchFilter {
        WatchFilter::new(root, ["node_modules", "docs/generated"], ["*.md", "*_test.go"])
            .unwrap()
            .exclude_path("app/main_gen.go")
    }

    #[test]
    fn test_default_dirs_excluded() {
        let temp = TempDir::new().unwrap();
        let f = filter(temp.path());
        let root = f.root().to_path_buf();

        for name in DEFAULT_EXCLUDE_DIRS {
            assert!(f.is_excluded_dir(&root.join(name)), "{name} should be excluded");
        }
        assert!(f.is_excluded_dir(&root.join("app/vendor")));
        assert!(!f.is_excluded_dir(&root.join("app")));
        assert!(!f.is_excluded_dir(&root));
    }

    #[test]
    fn test_configured_dirs_and_prefixes() {
        let temp = TempDir::new().unwrap();
        let f = filter(temp.path());
        let root = f.root().to_path_buf();

        assert!(f.is_excluded_dir(&root.join("web/node_modules")));
        assert!(f.is_excluded_dir(&root.join("docs/generated/api")));
        assert!(!f.is_excluded_dir(&root.join("docs")));
        assert!(!f.is_excluded_dir(&root.join("generated")));
    }

    #[test]
    fn test_hidden_entries_excluded() {
        let temp = TempDir::new().unwrap();
        let f = filter(temp.path());
        let root = f.root().to_path_buf();

        assert!(f.is_excluded_dir(&root.join(".git")));
        assert!(f.is_excluded_file(&root.join("app/.main.go.swp")));
        assert!(f.is_excluded_file(&root.join(".git/HEAD")));
    }

    #[test]
    fn test_file_globs_and_generated_entry() {
        let temp = TempDir::new().unwrap();
        let f = filter(temp.path());
        let root = f.root().to_path_buf();

        assert!(f.is_excluded_file(&root.join("README.md")));
        assert!(f.is_excluded_file(&root.join("app/handler_test.go")));
        assert!(f.is_excluded_file(&root.join("app/main_gen.go")));
        assert!(f.is_excluded_file(&root.join("build/bin/blog")));
        assert!(!f.is_excluded_file(&root.join("app/handler.go")));
        assert!(!f.is_excluded_file(&root.join("main.go")));
    }

    #[test]
    fn test_exact_exclude_ignores_current_dir_components() {
        let temp = TempDir::new().unwrap();
        let f = WatchFilter::new(temp.path(), Vec::<String>::new(), Vec::<String>::new())
            .unwrap()
            .exclude_path("./app/./main_gen.go");
        let root = f.root().to_path_buf();

        assert!(f.is_excluded_file(&root.join("app/main_gen.go")));
        assert!(!f.is_excluded_file(&root.join("app/main.go")));
    }

    #[test]
    fn test_outside_root_is_excluded() {
        let temp = TempDir::new().unwrap();
        let f = filter(temp.path());
        assert!(f.is_excluded_file(Path::new("/etc/passwd")));
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        let temp = TempDir::new().unwrap();
        let err = WatchFilter::new(temp.path(), Vec::<String>::new(), ["a[b"]);
        assert!(err.is_err());
    }

    async fn raised_within(signal: &ChangeSignal, ms: u64) -> bool {
        tokio::time::timeout(Duration::from_millis(ms), signal.raised())
            .await
            .is_ok()
    }

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("app")).unwrap();
        fs::create_dir_all(temp.path().join("build/bin")).unwrap();
        fs::write(temp.path().join("app/handler.go"), "package app\n").unwrap();
        temp
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_output_write_is_ignored() {
        let temp = project();
        let signal = ChangeSignal::new();
        let watcher = FileWatcher::start(filter(temp.path()), signal.clone()).unwrap();

        fs::write(temp.path().join("build/bin/blog"), b"binary").unwrap();
        fs::write(temp.path().join("app/main_gen.go"), "package app\n").unwrap();
        assert!(!raised_within(&signal, 300).await);

        watcher.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_removing_excluded_dir_is_ignored() {
        let temp = project();
        fs::create_dir_all(temp.path().join("vendor/lib")).unwrap();
        let signal = ChangeSignal::new();
        let watcher = FileWatcher::start(filter(temp.path()), signal.clone()).unwrap();

        fs::remove_dir_all(temp.path().join("build")).unwrap();
        fs::rename(temp.path().join("vendor"), temp.path().join("app/.vendor.old")).unwrap();
        assert!(!raised_within(&signal, 300).await);

        watcher.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_source_write_raises_signal() {
        let temp = project();
        let signal = ChangeSignal::new();
        let watcher = FileWatcher::start(filter(temp.path()), signal.clone()).unwrap();

        fs::write(temp.path().join("app/handler.go"), "package app\n\nfunc X() {}\n").unwrap();
        assert!(raised_within(&signal, 2000).await);
        assert!(signal.take());

        watcher.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_new_directory_is_watched() {
        let temp = project();
        let signal = ChangeSignal::new();
        let watcher = FileWatcher::start(filter(temp.path()), signal.clone()).unwrap();

        fs::create_dir(temp.path().join("app/models")).unwrap();
        assert!(raised_within(&signal, 2000).await);
        signal.take();
        // Let any trailing events for the directory creation drain
        tokio::time::sleep(Duration::from_millis(200)).await;
        signal.take();

        fs::write(temp.path().join("app/models/user.go"), "package models\n").unwrap();
        assert!(raised_within(&signal, 2000).await);

        watcher.stop().await;
    }
}
