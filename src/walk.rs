//! Serial directory walker: spec.md §4.4. Built on `ignore::Walk`, the
//! single-threaded counterpart to the `WalkParallel` the teacher drives in
//! `services/grep.rs`. Classifies every entry the walker yields so the
//! driver can apply `-r`/`-R`/`-d`/`-D` policy without re-stat'ing anything
//! the walker has already determined.

use std::path::{Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};

use crate::config::{Config, DevicePolicy, DirectoryPolicy};
use crate::exclude::Excluder;

/// One classified entry from a traversal, spec.md §4.4's "classifies each".
#[derive(Debug, Clone)]
pub enum WalkEntry {
    /// A regular file (or symlink-to-file when `follow_symlinks` is set).
    File(PathBuf),
    /// A directory seen in pre-order; under `-r`/`-R` the walker will recurse
    /// into it on its own, so this variant exists only for `-d skip`/`-d read`
    /// bookkeeping at the top level.
    PreOrderDir(PathBuf),
    /// A symlink that was not followed (`--no-follow`, the default).
    UnfollowedSymlink(PathBuf),
    /// A directory the walker refused to descend into because it was already
    /// on the current path (bind mount or symlink cycle).
    CycleDetected(PathBuf),
    /// A path that could not be `stat`-ed or read (permission denied, races
    /// with a concurrent delete).
    Unreadable(PathBuf, String),
}

/// Walks `root` according to `config`'s directory/device/symlink policy,
/// yielding one [`WalkEntry`] per path in the fixed order `ignore::Walk`
/// produces (spec.md §4.4: "yields entries in a fixed traversal order").
pub struct Walker {
    inner: ignore::Walk,
    recurse: bool,
    excluder: Excluder,
}

impl Walker {
    #[must_use]
    pub fn new(root: &Path, config: &Config, excluder: Excluder) -> Self {
        let recurse = config.directories == DirectoryPolicy::Recurse;
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .parents(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(config.follow_symlinks)
            .max_depth(if recurse { None } else { Some(1) });
        Self { inner: builder.build(), recurse, excluder }
    }
}

impl Iterator for Walker {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        loop {
            let result = self.inner.next()?;
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let message = err.to_string();
                    if message.to_ascii_lowercase().contains("loop") {
                        return Some(WalkEntry::CycleDetected(path));
                    }
                    return Some(WalkEntry::Unreadable(path, message));
                }
            };

            // The root itself is always visited first by `ignore::Walk`;
            // skip it here, the caller already knows the root.
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if self.excluder.skip(path, is_dir) {
                continue;
            }

            let file_type = entry.file_type();
            return Some(classify(&entry, file_type));
        }
    }
}

fn classify(entry: &DirEntry, file_type: Option<std::fs::FileType>) -> WalkEntry {
    let path = entry.path().to_path_buf();

    let Some(ft) = file_type else {
        return WalkEntry::Unreadable(path, "unknown file type".to_string());
    };

    if ft.is_symlink() {
        return WalkEntry::UnfollowedSymlink(path);
    }
    if ft.is_dir() {
        return WalkEntry::PreOrderDir(path);
    }
    WalkEntry::File(path)
}

/// Decides whether a classified entry should be opened and scanned at all,
/// applying the device-file policy on top of the walker's own classification
/// (spec.md §4.4's "Device files... honors `-D skip`/`-D read`").
#[must_use]
pub fn should_scan(path: &Path, devices: DevicePolicy) -> bool {
    if devices == DevicePolicy::Skip {
        if let Ok(meta) = std::fs::symlink_metadata(path) {
            use std::os::unix::fs::FileTypeExt;
            let ft = meta.file_type();
            if ft.is_block_device() || ft.is_char_device() || ft.is_fifo() || ft.is_socket() {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclude::Excluder;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walker_visits_nested_files_under_recurse() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("top.txt"), b"a").unwrap();
        fs::write(dir.path().join("sub/nested.txt"), b"b").unwrap();

        let mut config = Config::default();
        config.directories = DirectoryPolicy::Recurse;
        let excluder = Excluder::build(&config).unwrap();
        let walker = Walker::new(dir.path(), &config, excluder);

        let files: Vec<PathBuf> = walker
            .filter_map(|e| match e {
                WalkEntry::File(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn non_recursive_walk_skips_subdirectory_contents() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("top.txt"), b"a").unwrap();
        fs::write(dir.path().join("sub/nested.txt"), b"b").unwrap();

        let config = Config::default();
        let excluder = Excluder::build(&config).unwrap();
        let walker = Walker::new(dir.path(), &config, excluder);

        let files: Vec<PathBuf> = walker
            .filter_map(|e| match e {
                WalkEntry::File(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(files.len(), 1);
    }
}
