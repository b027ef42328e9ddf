use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use calwatch_core::{Event, EventSet};
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Every event seen as of the last save, keyed by event id.
pub type Snapshot = BTreeMap<String, Event>;

/// Reduce an event set to a snapshot.
///
/// Duplicate ids collapse to a single entry and the last occurrence wins.
/// Providers are not expected to repeat ids, so this is an accepted
/// simplification rather than something to reconcile.
pub fn snapshot_from(events: &[Event]) -> Snapshot {
    events
        .iter()
        .map(|event| (event.id.clone(), event.clone()))
        .collect()
}

/// Events of `current` whose id is not a key of `previous`, in `current` order.
pub fn diff(current: &[Event], previous: &Snapshot) -> EventSet {
    current
        .iter()
        .filter(|event| !previous.contains_key(&event.id))
        .cloned()
        .collect()
}

/// File-backed snapshot of the previous cycle's events.
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the previous snapshot. Never fails.
    ///
    /// A missing file means first run. An unreadable or corrupt file is logged
    /// and treated as empty, so every current event counts as new once.
    pub fn load(&self) -> Snapshot {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot yet, starting empty");
                return Snapshot::new();
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "snapshot unreadable, starting empty"
                );
                return Snapshot::new();
            }
        };

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => {
                debug!(path = %self.path.display(), events = snapshot.len(), "snapshot loaded");
                snapshot
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "snapshot corrupt, starting empty"
                );
                Snapshot::new()
            }
        }
    }

    /// Events of `current` that were not in the stored snapshot.
    pub fn new_events(&self, current: &[Event]) -> EventSet {
        diff(current, &self.load())
    }

    /// Replace the stored snapshot with `current`.
    ///
    /// The file is written to a temporary sibling and renamed into place, so a
    /// reader never sees a partial snapshot. Missing parent directories are
    /// created. An empty `current` stores `{}`.
    pub fn save(&self, current: &[Event]) -> Result<(), StoreError> {
        let snapshot = snapshot_from(current);
        if snapshot.len() != current.len() {
            debug!(
                events = current.len(),
                collapsed = current.len() - snapshot.len(),
                "duplicate event ids collapsed"
            );
        }

        let json = serde_json::to_string_pretty(&snapshot)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.write_error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.write_error(e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.write_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;

        info!(path = %self.path.display(), events = snapshot.len(), "snapshot saved");
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
