//! Confined path resolution.
//!
//! Opens a file given as a path relative to a mount root, refusing anything
//! that would leave the root: absolute paths, `..` segments climbing above it,
//! and symlinks pointing outside of it.
//!
//! Lexical escapes are rejected before the filesystem is touched, so a
//! rejected request never reveals whether its target exists. The remaining
//! components are then walked one at a time from the canonical root. Each
//! symlink met on the way is read and its target spliced into the walk, and
//! the walk fails as soon as it steps outside the root. A link pointing out of
//! the root is therefore rejected whether or not its target exists.

use reelhouse_common::{Error, Result};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Symlinks followed before giving up, as `ELOOP` would.
const MAX_SYMLINK_HOPS: usize = 40;

/// Open `relative` for reading, confined to `root`.
///
/// Fails with [`Error::PathOutsideRoot`] on any escape attempt. Every other
/// failure (missing file, permission denied, missing root) is returned as
/// [`Error::Io`] with its `ErrorKind` intact.
pub fn open_in_root(root: &Path, relative: &Path) -> Result<File> {
    let resolved = resolve_in_root(root, relative)?;
    Ok(File::open(resolved)?)
}

/// Resolve `relative` against `root` to a canonical path inside the root.
pub fn resolve_in_root(root: &Path, relative: &Path) -> Result<PathBuf> {
    let normalized = normalize_relative(relative)?;
    if normalized.as_os_str().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty relative path").into());
    }

    let root = root.canonicalize()?;
    walk_confined(&root, &normalized, relative)
}

/// Fold `.` and `..` lexically, failing if the path is absolute or climbs
/// above its starting point.
fn normalize_relative(relative: &Path) -> Result<PathBuf> {
    let mut normalized = PathBuf::new();

    for component in relative.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(Error::path_outside_root(relative));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::path_outside_root(relative));
            }
        }
    }

    Ok(normalized)
}

/// Walk `normalized` below the canonical `root`, expanding symlinks by hand.
///
/// `current` never contains a symlink, so `..` is a lexical pop. The walk may
/// pass through ancestors of the root (an absolute link target has to), but
/// any other position outside the root is an escape. Once a component is
/// missing the rest of the walk is lexical, which keeps the answer for an
/// escaping path the same whether or not its target exists.
fn walk_confined(root: &Path, normalized: &Path, relative: &Path) -> Result<PathBuf> {
    let mut pending: VecDeque<PathBuf> = normalized
        .components()
        .map(|c| PathBuf::from(c.as_os_str()))
        .collect();
    let mut current = root.to_path_buf();
    let mut hops = 0;
    let mut missing = false;

    while let Some(part) = pending.pop_front() {
        match part.components().next() {
            Some(Component::Normal(name)) => {
                let next = current.join(name);
                if !next.starts_with(root) && !root.starts_with(&next) {
                    return Err(Error::path_outside_root(relative));
                }
                current = next;
                if missing {
                    continue;
                }

                match fs::symlink_metadata(&current) {
                    Ok(meta) if meta.file_type().is_symlink() => {
                        hops += 1;
                        if hops > MAX_SYMLINK_HOPS {
                            return Err(io::Error::other("too many levels of symbolic links").into());
                        }
                        let target = fs::read_link(&current)?;
                        current.pop();
                        for component in target.components().rev() {
                            pending.push_front(PathBuf::from(component.as_os_str()));
                        }
                    }
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => missing = true,
                    Err(e) => return Err(e.into()),
                }
            }
            Some(Component::ParentDir) => {
                current.pop();
            }
            Some(Component::RootDir | Component::Prefix(_)) => current.push(&part),
            Some(Component::CurDir) | None => {}
        }
    }

    if !current.starts_with(root) {
        return Err(Error::path_outside_root(relative));
    }
    if missing {
        return Err(io::Error::new(io::ErrorKind::NotFound, "no such file").into());
    }

    Ok(current)
}
