//! Reelhouse-Media: the catalog and streaming engine behind reelhouse
//!
//! This crate discovers video files under configured mount roots, keeps an
//! in-memory catalog of them in sync with the filesystem, and opens them for
//! byte-range streaming while bounding concurrent disk I/O per mount.
//!
//! # Modules
//!
//! - `resolver` - Open a relative path strictly confined to a root directory
//! - `limiter` - Per-volume admission gate with cancellation
//! - `resource` - Direct and buffered seekable handles over an open file
//! - `registry` - Dual-keyed (id and path) catalog with filesystem reconciliation
//! - `manager` - Mount points, resource opening and the background rescanner
//!
//! # Architecture
//!
//! The [`Manager`] is the only type the serving layer needs. A request is
//! served by:
//!
//! 1. Looking up the entry by id ([`Manager::get_entry`])
//! 2. Acquiring an I/O slot on the entry's mount ([`IoLimiter::acquire`])
//! 3. Opening the file ([`Manager::open_resource`])
//! 4. Seeking and reading until done, then dropping the resource and the permit

pub mod limiter;
pub mod manager;
pub mod registry;
pub mod resolver;
pub mod resource;

pub use limiter::{IoLimiter, IoPermit};
pub use manager::{Manager, MediaFile, MountPoint, DEFAULT_RESCAN_INTERVAL};
pub use registry::{Entry, Registry, ScanSummary};
pub use resource::{BufferedResource, DirectResource, Resource, ResourceMetadata, ResourceMode};

pub use reelhouse_common::{EntryId, Error, Result, VolumeId};
