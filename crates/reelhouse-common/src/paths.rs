//! Path utilities for the media catalog.
//!
//! The scanner admits files by extension and derives an entry's category from
//! the directory it sits in. Both rules live here so the catalog and any
//! consumer agree on them.

use std::path::{Component, Path};

/// Extensions admitted into the catalog, compared case-insensitively.
const MEDIA_EXTENSIONS: &[&str] = &["mp4", "m4v"];

/// Category of files that sit directly in a mount root.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Check if a path has an admitted media extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelhouse_common::paths::is_media_file;
///
/// assert!(is_media_file(Path::new("movie.mp4")));
/// assert!(is_media_file(Path::new("Shows/clip.M4V")));
/// assert!(!is_media_file(Path::new("movie.mkv")));
/// ```
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Get the list of admitted media extensions.
#[must_use]
pub fn media_extensions() -> &'static [&'static str] {
    MEDIA_EXTENSIONS
}

/// Derive the category of a file from its path relative to the mount root.
///
/// The category is the whole parent directory, relative to the root and
/// joined with `/`, or [`UNCATEGORIZED`] for files at the root.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelhouse_common::paths::category_for;
///
/// assert_eq!(category_for(Path::new("Action/movie.mp4")), "Action");
/// assert_eq!(category_for(Path::new("Shows/Season 1/e01.mp4")), "Shows/Season 1");
/// assert_eq!(category_for(Path::new("movie.mp4")), "Uncategorized");
/// ```
pub fn category_for(relative: &Path) -> String {
    let parts: Vec<_> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if parts.is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        parts.join("/")
    }
}

/// Display name of a media file: its file name without the extension.
pub fn display_name(relative: &Path) -> String {
    relative
        .file_stem()
        .or_else(|| relative.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
