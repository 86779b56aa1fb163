//! Mount points, resource opening and periodic rescans.

use crate::limiter::IoLimiter;
use crate::registry::{Entry, Registry, ScanSummary};
use crate::resolver;
use crate::resource::{Resource, ResourceMetadata, ResourceMode};
use reelhouse_common::{EntryId, Error, Result, VolumeId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How often the background rescanner reconciles every mount.
pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A root directory served under a volume id, with its own I/O limiter.
#[derive(Debug)]
pub struct MountPoint {
    id: VolumeId,
    root: PathBuf,
    limiter: IoLimiter,
}

impl MountPoint {
    pub fn new(id: impl Into<VolumeId>, root: impl Into<PathBuf>, max_io: usize) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            limiter: IoLimiter::new(max_io),
        }
    }

    pub fn id(&self) -> &VolumeId {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn limiter(&self) -> &IoLimiter {
        &self.limiter
    }
}

/// Public listing view of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFile {
    pub id: EntryId,
    pub name: String,
    pub category: String,
    pub size: u64,
}

impl From<Entry> for MediaFile {
    fn from(entry: Entry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            category: entry.category,
            size: entry.size,
        }
    }
}

/// Owns the catalog and the mount table, and opens resources.
#[derive(Debug)]
pub struct Manager {
    mode: ResourceMode,
    buffer_size: usize,
    registry: Registry,
    mounts: BTreeMap<VolumeId, MountPoint>,
    rescan_interval: Duration,
}

impl Manager {
    /// Build a manager over `mounts`. Volume ids must be unique and non-empty.
    pub fn new(
        mode: ResourceMode,
        buffer_size: usize,
        mounts: impl IntoIterator<Item = MountPoint>,
    ) -> Result<Self> {
        let mut table = BTreeMap::new();
        for mount in mounts {
            if mount.id.is_empty() {
                return Err(Error::invalid_input("volume id must not be empty"));
            }
            if table.contains_key(&mount.id) {
                return Err(Error::invalid_input(format!(
                    "duplicate volume id: {}",
                    mount.id
                )));
            }
            table.insert(mount.id.clone(), mount);
        }

        Ok(Self {
            mode,
            buffer_size: buffer_size.max(1),
            registry: Registry::new(),
            mounts: table,
            rescan_interval: DEFAULT_RESCAN_INTERVAL,
        })
    }

    pub fn with_rescan_interval(mut self, interval: Duration) -> Self {
        self.rescan_interval = interval;
        self
    }

    pub fn mode(&self) -> ResourceMode {
        self.mode
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn rescan_interval(&self) -> Duration {
        self.rescan_interval
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn mounts(&self) -> impl Iterator<Item = &MountPoint> {
        self.mounts.values()
    }

    /// Look up a mount point by volume id.
    pub fn mount(&self, id: &VolumeId) -> Result<&MountPoint> {
        self.mounts
            .get(id)
            .ok_or_else(|| Error::volume_not_found(id.as_str()))
    }

    /// Every cataloged file, ordered by name then id.
    pub fn list_files(&self) -> Vec<MediaFile> {
        self.registry.list().into_iter().map(MediaFile::from).collect()
    }

    pub fn get_entry(&self, id: EntryId) -> Result<Entry> {
        self.registry.get(id)
    }

    /// Open the file behind `entry` in the configured mode.
    ///
    /// The path is resolved inside the entry's mount root, so an entry whose
    /// path escapes the root fails with [`Error::PathOutsideRoot`] and no
    /// descriptor is ever opened outside of it. The caller is expected to hold
    /// a permit from the mount's limiter for as long as the resource lives.
    pub fn open_resource(&self, entry: &Entry) -> Result<Resource> {
        let mount = self.mount(&entry.volume_id)?;
        let file = resolver::open_in_root(mount.root(), &entry.path)?;

        let stat = file.metadata()?;
        if !stat.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file").into());
        }

        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = ResourceMetadata::new(name, stat.modified()?, stat.len());

        let resource = match self.mode {
            ResourceMode::Direct => Resource::direct(file, metadata),
            ResourceMode::Buffered => Resource::buffered(file, metadata, self.buffer_size),
        };

        tracing::trace!(id = %entry.id, mode = %self.mode, "Opened resource");
        Ok(resource)
    }

    /// Reconcile every mount once.
    pub fn scan_all(&self) -> ScanSummary {
        self.scan_all_until(&CancellationToken::new())
    }

    /// Reconcile every mount once, stopping as soon as `cancel` fires.
    ///
    /// The token is checked before each mount and throughout each walk. A
    /// failing mount is logged and skipped; it does not stop the others.
    pub fn scan_all_until(&self, cancel: &CancellationToken) -> ScanSummary {
        let mut total = ScanSummary::default();
        for mount in self.mounts.values() {
            if cancel.is_cancelled() {
                break;
            }
            match self.registry.scan_until(mount.id(), mount.root(), cancel) {
                Ok(Some(summary)) => {
                    if !summary.is_noop() {
                        tracing::info!(
                            volume = %mount.id(),
                            added = summary.added,
                            removed = summary.removed,
                            unchanged = summary.unchanged,
                            "Catalog updated"
                        );
                    }
                    total += summary;
                }
                Ok(None) => {
                    tracing::debug!(volume = %mount.id(), "Scan cancelled");
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        volume = %mount.id(),
                        root = %mount.root().display(),
                        "Scan failed: {e}"
                    );
                }
            }
        }
        total
    }

    /// Spawn the background rescanner.
    ///
    /// Scans immediately, then once per rescan interval, until `cancel`
    /// fires. Scans run on the blocking pool.
    pub fn start_scanning(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let period = manager.rescan_interval.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(
                interval_secs = manager.rescan_interval.as_secs(),
                "Rescanner started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let scan_manager = Arc::clone(&manager);
                let scan_cancel = cancel.clone();
                let result = tokio::task::spawn_blocking(move || {
                    scan_manager.scan_all_until(&scan_cancel)
                })
                .await;

                match result {
                    Ok(summary) if !summary.is_noop() => {
                        tracing::debug!(
                            added = summary.added,
                            removed = summary.removed,
                            total = manager.registry.len(),
                            "Rescan complete"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!("Rescan task failed: {e}"),
                }
            }

            tracing::info!("Rescanner stopped");
        })
    }
}
