use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::models::{ContestOracle, ContestSnapshot};

pub const SNAPSHOT_FILE_NAME: &str = "contest.json";

#[derive(Debug)]
pub enum SnapshotEvent {
    Loaded {
        generation: u64,
        snapshot: Box<ContestSnapshot>,
    },
    Failed {
        message: String,
    },
}

pub fn load_snapshot(path: &Path) -> Result<ContestSnapshot> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open snapshot '{}'", path.display()))?;
    let snapshot: ContestSnapshot = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse snapshot '{}'", path.display()))?;

    info!(
        "Loaded snapshot '{}': {} teams, {} problems, {} ranked",
        path.display(),
        snapshot.teams().len(),
        snapshot.problems().len(),
        snapshot.ranked_team_statuses().len()
    );
    Ok(snapshot)
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Polls the snapshot, sending it when the file changes.
///
/// The first poll always loads. The thread exits once the receiver is dropped.
pub fn spawn_snapshot_watcher(path: PathBuf, interval: Duration) -> Receiver<SnapshotEvent> {
    let (tx, rx) = mpsc::channel::<SnapshotEvent>();

    std::thread::spawn(move || {
        let mut watch = SnapshotWatch::new(path);
        loop {
            if let Some(event) = watch.poll()
                && tx.send(event).is_err()
            {
                debug!("Snapshot receiver closed, stopping watcher");
                return;
            }
            std::thread::sleep(interval);
        }
    });

    rx
}

/// Change tracking for one snapshot file.
///
/// Only a successful load records the modification time, so a file caught
/// mid-write is read again on the next poll.
struct SnapshotWatch {
    path: PathBuf,
    loaded_modified: Option<SystemTime>,
    generation: u64,
    last_failure: Option<String>,
}

impl SnapshotWatch {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            loaded_modified: None,
            generation: 0,
            last_failure: None,
        }
    }

    fn poll(&mut self) -> Option<SnapshotEvent> {
        let modified = modified_at(&self.path);
        if self.generation > 0 && modified.is_some() && modified == self.loaded_modified {
            return None;
        }

        match load_snapshot(&self.path) {
            Ok(snapshot) => {
                self.generation += 1;
                self.loaded_modified = modified;
                self.last_failure = None;
                Some(SnapshotEvent::Loaded {
                    generation: self.generation,
                    snapshot: Box::new(snapshot),
                })
            }
            Err(err) => {
                let message = format!("{err:#}");
                if self.last_failure.as_deref() == Some(message.as_str()) {
                    debug!("Snapshot still unreadable: {message}");
                    return None;
                }
                warn!("{message}");
                self.last_failure = Some(message.clone());
                Some(SnapshotEvent::Failed { message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "contest": { "title": "Spring Cup" },
        "teams": [ { "id": "1", "name": "Alpha" } ],
        "problems": [ { "id": "p1", "name": "Prob-1" } ],
        "ranking": [ { "team_id": "1", "rank": 1 } ]
    }"#;

    #[test]
    fn loads_a_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE_NAME);
        fs::write(&path, SNAPSHOT).unwrap();

        let snapshot = load_snapshot(&path).unwrap();
        assert_eq!(snapshot.contest().title, "Spring Cup");
        assert_eq!(snapshot.ranked_team_statuses().len(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snapshot(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to open snapshot"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE_NAME);
        fs::write(&path, "{ \"teams\": [] }").unwrap();
        let err = load_snapshot(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse snapshot"));
    }

    #[test]
    fn watcher_sends_first_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE_NAME);
        fs::write(&path, SNAPSHOT).unwrap();

        let rx = spawn_snapshot_watcher(path, Duration::from_millis(10));
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            SnapshotEvent::Loaded {
                generation,
                snapshot,
            } => {
                assert_eq!(generation, 1);
                assert_eq!(snapshot.contest().title, "Spring Cup");
            }
            SnapshotEvent::Failed { message } => panic!("unexpected failure: {message}"),
        }
    }

    #[test]
    fn unchanged_file_is_not_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE_NAME);
        fs::write(&path, SNAPSHOT).unwrap();

        let mut watch = SnapshotWatch::new(path);
        assert!(matches!(
            watch.poll(),
            Some(SnapshotEvent::Loaded { generation: 1, .. })
        ));
        assert!(watch.poll().is_none());
    }

    #[test]
    fn half_written_snapshot_is_retried_without_a_new_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE_NAME);
        fs::write(&path, SNAPSHOT).unwrap();
        let mut watch = SnapshotWatch::new(path.clone());
        assert!(matches!(watch.poll(), Some(SnapshotEvent::Loaded { .. })));

        fs::write(&path, "{ \"contest\": ").unwrap();
        let stamp = SystemTime::now() + Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(stamp)
            .unwrap();
        assert!(matches!(watch.poll(), Some(SnapshotEvent::Failed { .. })));
        assert!(watch.poll().is_none());

        fs::write(&path, SNAPSHOT).unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(stamp)
            .unwrap();
        match watch.poll() {
            Some(SnapshotEvent::Loaded { generation, .. }) => assert_eq!(generation, 2),
            other => panic!("expected a reload, got {other:?}"),
        }
    }

    #[test]
    fn watcher_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let rx = spawn_snapshot_watcher(
            dir.path().join(SNAPSHOT_FILE_NAME),
            Duration::from_millis(10),
        );
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            SnapshotEvent::Failed { .. }
        ));
    }
}
