//! Watched path set and the change notification stream.
//!
//! The set is expanded once at startup: a file is watched as itself, a
//! directory contributes every entry reachable below it (the directory
//! included). Each entry is registered non-recursively, so files created
//! later are reported through their parent directory but are not added.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::error::WatcherError;

/// Simplified event kinds; only `Create` and `Write` trigger a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Create,
    Write,
    Other,
}

impl From<&EventKind> for ChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => ChangeKind::Create,
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                ChangeKind::Write
            }
            _ => ChangeKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn is_relevant(&self) -> bool {
        matches!(self.kind, ChangeKind::Create | ChangeKind::Write)
    }

    fn from_notify(event: Event) -> impl Iterator<Item = ChangeEvent> {
        let kind = ChangeKind::from(&event.kind);
        event
            .paths
            .into_iter()
            .map(move |path| ChangeEvent { path, kind })
    }
}

/// Sending half of a [`ChangeStream`].
pub type ChangeSender = mpsc::UnboundedSender<Result<ChangeEvent, WatcherError>>;

/// Absolute paths under observation. Immutable once expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    paths: BTreeSet<PathBuf>,
}

impl WatchSet {
    /// Expand `inputs` into concrete entries. Every input must exist.
    pub fn expand<P: AsRef<Path>>(inputs: &[P]) -> Result<Self, WatcherError> {
        let mut paths = BTreeSet::new();
        for input in inputs {
            let input = input.as_ref();
            let path_err = |source| WatcherError::Path {
                path: input.to_path_buf(),
                source,
            };
            let canonical = fs::canonicalize(input).map_err(path_err)?;
            let metadata = fs::metadata(&canonical).map_err(path_err)?;
            if !metadata.is_dir() {
                paths.insert(canonical);
                continue;
            }
            for entry in WalkDir::new(&canonical).sort_by_file_name() {
                let entry = entry.map_err(|source| WatcherError::Walk {
                    path: canonical.clone(),
                    source,
                })?;
                paths.insert(entry.into_path());
            }
        }
        Ok(Self { paths })
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Register every entry with the platform notifier.
    pub fn subscribe(&self) -> Result<ChangeStream, WatcherError> {
        let (tx, mut stream) = ChangeStream::channel();
        let mut watcher = recommended_watcher(move |event: notify::Result<Event>| match event {
            Ok(event) => {
                for change in ChangeEvent::from_notify(event) {
                    let _ = tx.send(Ok(change));
                }
            }
            Err(err) => {
                let _ = tx.send(Err(WatcherError::Notify(err)));
            }
        })?;

        for path in &self.paths {
            watcher.watch(path, RecursiveMode::NonRecursive)?;
            tracing::debug!(path = %path.display(), "watching path");
        }

        stream.watcher = Some(watcher);
        Ok(stream)
    }
}

/// Lazy, unbounded sequence of change notifications.
///
/// It never ends on its own. Once the notifier fails or closes, every
/// further read is an error.
pub struct ChangeStream {
    rx: mpsc::UnboundedReceiver<Result<ChangeEvent, WatcherError>>,
    watcher: Option<RecommendedWatcher>,
}

impl ChangeStream {
    /// A stream fed by hand instead of by a platform notifier.
    pub fn channel() -> (ChangeSender, ChangeStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, ChangeStream { rx, watcher: None })
    }

    /// Wait for the next notification.
    pub async fn next(&mut self) -> Result<ChangeEvent, WatcherError> {
        self.rx
            .recv()
            .await
            .unwrap_or(Err(WatcherError::ChannelClosed("change notifications")))
    }

    /// A notification that has already arrived, if any.
    pub fn try_next(&mut self) -> Result<Option<ChangeEvent>, WatcherError> {
        match self.rx.try_recv() {
            Ok(event) => event.map(Some),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(WatcherError::ChannelClosed("change notifications"))
            }
        }
    }

    /// Stop the notifier. Anything already queued can still be read.
    pub fn close(&mut self) {
        self.watcher = None;
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn only_create_and_data_writes_are_relevant() {
        let relevant = [
            EventKind::Create(CreateKind::File),
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            EventKind::Modify(ModifyKind::Any),
        ];
        for kind in relevant {
            assert!(ChangeEvent::new("/x", ChangeKind::from(&kind)).is_relevant(), "{kind:?}");
        }

        let ignored = [
            EventKind::Remove(RemoveKind::File),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            EventKind::Access(AccessKind::Read),
        ];
        for kind in ignored {
            assert!(!ChangeEvent::new("/x", ChangeKind::from(&kind)).is_relevant(), "{kind:?}");
        }
    }

    #[test]
    fn expand_walks_directories_and_keeps_files() {
        let dir = TempDir::new().expect("tempdir");
        let chart = dir.path().join("chart");
        fs::create_dir_all(chart.join("templates")).expect("mkdir");
        fs::write(chart.join("Chart.yaml"), "name: web\n").expect("write");
        fs::write(chart.join("templates/deployment.yaml"), "kind: x\n").expect("write");
        let values = dir.path().join("values.yaml");
        fs::write(&values, "replicas: 1\n").expect("write");

        let set = WatchSet::expand(&[chart.clone(), values.clone()]).expect("expand");
        let chart = fs::canonicalize(chart).expect("canonical");
        assert_eq!(set.len(), 5);
        assert!(set.contains(&chart));
        assert!(set.contains(&chart.join("templates")));
        assert!(set.contains(&chart.join("templates/deployment.yaml")));
        assert!(set.contains(&fs::canonicalize(values).expect("canonical")));
        assert!(set.paths().all(Path::is_absolute));
    }

    #[test]
    fn expand_fails_on_missing_path() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope");
        let err = WatchSet::expand(&[missing]).unwrap_err();
        assert!(matches!(err, WatcherError::Path { .. }), "got: {err}");
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn hand_fed_stream_reports_closure_as_error() {
        let (tx, mut stream) = ChangeStream::channel();
        tx.send(Ok(ChangeEvent::new("/a", ChangeKind::Write)))
            .expect("send");
        assert_eq!(
            stream.try_next().expect("open").map(|e| e.path),
            Some(PathBuf::from("/a"))
        );
        assert!(stream.try_next().expect("open").is_none());
        drop(tx);
        assert!(matches!(
            stream.next().await,
            Err(WatcherError::ChannelClosed(_))
        ));
    }

    #[tokio::test]
    async fn writing_a_watched_file_produces_a_relevant_event() {
        let dir = TempDir::new().expect("tempdir");
        let values = dir.path().join("values.yaml");
        fs::write(&values, "replicas: 1\n").expect("write");

        let set = WatchSet::expand(&[dir.path()]).expect("expand");
        let mut stream = set.subscribe().expect("subscribe");
        fs::write(&values, "replicas: 2\n").expect("rewrite");

        let relevant = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let event = stream.next().await.expect("event");
                if event.is_relevant() {
                    break event;
                }
            }
        })
        .await
        .expect("relevant event in time");
        assert!(relevant.path.ends_with("values.yaml"));
        stream.close();
    }
}
