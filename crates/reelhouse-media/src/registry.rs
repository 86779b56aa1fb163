//! In-memory media catalog.
//!
//! The [`Registry`] indexes entries both by id and by `(volume, relative
//! path)`. Both maps live in a single private [`Index`] behind one lock and
//! are only changed through `Index` methods that update them together, so a
//! reader can never observe one map without the other.
//!
//! [`Registry::scan`] reconciles one volume against the filesystem. The
//! directory walk runs without holding the lock; only the diff (read lock)
//! and the apply step (write lock) touch the index.

use parking_lot::RwLock;
use reelhouse_common::{
    paths::{category_for, display_name, is_media_file},
    EntryId, Error, Result, VolumeId,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::WalkDir;

/// One cataloged media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub id: EntryId,
    pub volume_id: VolumeId,
    /// Path relative to the volume root.
    pub path: PathBuf,
    pub name: String,
    pub category: String,
    /// Size in bytes when the file was discovered.
    pub size: u64,
}

impl Entry {
    /// Build an entry for a file at `path` (relative to its volume root),
    /// assigning a fresh id.
    pub fn new(volume_id: VolumeId, path: PathBuf, size: u64) -> Self {
        Self {
            id: EntryId::new(),
            name: display_name(&path),
            category: category_for(&path),
            volume_id,
            path,
            size,
        }
    }
}

/// Outcome of reconciling one volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl ScanSummary {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

impl std::ops::AddAssign for ScanSummary {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.removed += other.removed;
        self.unchanged += other.unchanged;
    }
}

type PathKey = (VolumeId, PathBuf);

#[derive(Debug, Default)]
struct Index {
    by_id: HashMap<EntryId, Entry>,
    by_path: HashMap<PathKey, EntryId>,
}

impl Index {
    /// Insert or overwrite `entry`, evicting whatever either map held for
    /// its id or its path.
    fn insert(&mut self, entry: Entry) {
        let key = (entry.volume_id.clone(), entry.path.clone());

        if let Some(previous) = self.by_path.get(&key).copied() {
            if previous != entry.id {
                self.by_id.remove(&previous);
            }
        }
        if let Some(stale) = self.by_id.get(&entry.id) {
            let stale_key = (stale.volume_id.clone(), stale.path.clone());
            if stale_key != key {
                self.by_path.remove(&stale_key);
            }
        }

        self.by_path.insert(key, entry.id);
        self.by_id.insert(entry.id, entry);
    }

    fn remove_path(&mut self, key: &PathKey) -> Option<Entry> {
        let id = self.by_path.remove(key)?;
        self.by_id.remove(&id)
    }

    /// Remove `key` only if it still maps to `expected`.
    fn remove_if_current(&mut self, key: &PathKey, expected: EntryId) -> bool {
        if self.by_path.get(key) != Some(&expected) {
            return false;
        }
        self.remove_path(key).is_some()
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        assert_eq!(self.by_id.len(), self.by_path.len());
        for (key, id) in &self.by_path {
            let entry = self.by_id.get(id).expect("path maps to missing id");
            assert_eq!((&entry.volume_id, &entry.path), (&key.0, &key.1));
        }
        for (id, entry) in &self.by_id {
            let key = (entry.volume_id.clone(), entry.path.clone());
            assert_eq!(self.by_path.get(&key), Some(id));
        }
    }
}

/// Concurrent dual-keyed catalog of media files.
#[derive(Debug, Default)]
pub struct Registry {
    index: RwLock<Index>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry`, replacing any entry at the same id or the same path.
    pub fn add(&self, entry: Entry) {
        self.index.write().insert(entry);
    }

    /// Remove the entry at `path` on `volume_id`, if any.
    pub fn remove(&self, volume_id: &VolumeId, path: &Path) -> Option<Entry> {
        let key = (volume_id.clone(), path.to_path_buf());
        self.index.write().remove_path(&key)
    }

    /// Look up an entry by id.
    pub fn get(&self, id: EntryId) -> Result<Entry> {
        if id.is_nil() {
            return Err(Error::not_found("nil id"));
        }
        self.index
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(id.to_string()))
    }

    /// Look up the id cataloged for `path` on `volume_id`.
    pub fn id_for_path(&self, volume_id: &VolumeId, path: &Path) -> Option<EntryId> {
        let key = (volume_id.clone(), path.to_path_buf());
        self.index.read().by_path.get(&key).copied()
    }

    /// Snapshot of all entries, ordered by name then id.
    pub fn list(&self) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self.index.read().by_id.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    pub fn len(&self) -> usize {
        self.index.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries cataloged for one volume.
    pub fn volume_len(&self, volume_id: &VolumeId) -> usize {
        self.index
            .read()
            .by_path
            .keys()
            .filter(|(volume, _)| volume == volume_id)
            .count()
    }

    /// Reconcile the catalog for `volume_id` with the files under `root`.
    ///
    /// Files that vanished are removed, new files are added with fresh ids,
    /// and files still present keep their entry untouched. Only a failure to
    /// read `root` itself is an error; unreadable entries below it are
    /// skipped.
    pub fn scan(&self, volume_id: &VolumeId, root: &Path) -> Result<ScanSummary> {
        let summary = self.scan_until(volume_id, root, &CancellationToken::new())?;
        Ok(summary.unwrap_or_default())
    }

    /// [`scan`](Self::scan), checking `cancel` before every directory entry.
    ///
    /// Returns `Ok(None)` when `cancel` fires during the walk. Nothing is
    /// applied in that case and the catalog for the volume is left as it was.
    pub fn scan_until(
        &self,
        volume_id: &VolumeId,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<ScanSummary>> {
        let Some(discovered) = walk_volume(root, cancel)? else {
            return Ok(None);
        };

        let (to_remove, to_add) = {
            let index = self.index.read();

            let to_remove: Vec<(PathKey, EntryId)> = index
                .by_path
                .iter()
                .filter(|((volume, path), _)| volume == volume_id && !discovered.contains_key(path))
                .map(|(key, id)| (key.clone(), *id))
                .collect();

            let to_add: Vec<(&PathBuf, u64)> = discovered
                .iter()
                .filter(|(path, _)| {
                    !index
                        .by_path
                        .contains_key(&(volume_id.clone(), (*path).clone()))
                })
                .map(|(path, size)| (path, *size))
                .collect();

            (to_remove, to_add)
        };

        let mut summary = ScanSummary {
            unchanged: discovered.len() - to_add.len(),
            ..ScanSummary::default()
        };

        if to_remove.is_empty() && to_add.is_empty() {
            return Ok(Some(summary));
        }

        let mut index = self.index.write();

        for (key, id) in &to_remove {
            if index.remove_if_current(key, *id) {
                summary.removed += 1;
            }
        }

        for (path, size) in to_add {
            let key = (volume_id.clone(), path.clone());
            if index.by_path.contains_key(&key) {
                // Someone else cataloged it between diff and apply
                continue;
            }
            index.insert(Entry::new(volume_id.clone(), path.clone(), size));
            summary.added += 1;
        }

        Ok(Some(summary))
    }
}

/// Walk `root` and collect admitted media files by relative path.
///
/// `None` means `cancel` fired before the walk finished.
fn walk_volume(root: &Path, cancel: &CancellationToken) -> Result<Option<HashMap<PathBuf, u64>>> {
    let mut files = HashMap::new();

    for entry in WalkDir::new(root).follow_links(false) {
        if cancel.is_cancelled() {
            debug!(root = ?root, "Walk cancelled");
            return Ok(None);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(std::io::Error::from(err).into()),
            Err(err) => {
                debug!(error = %err, "Skipping unreadable path during scan");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if !is_media_file(relative) {
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                debug!(path = ?relative, error = %err, "Skipping file without metadata");
                continue;
            }
        };
        if size == 0 {
            // Likely still being copied in
            continue;
        }

        files.insert(relative.to_path_buf(), size);
    }

    debug!(root = ?root, files = files.len(), "Walk complete");
    Ok(Some(files))
}
