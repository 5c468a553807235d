//! Inclusion/exclusion filtering for the directory walker: spec.md §4.4's
//! `--include`/`--exclude`/`--exclude-from`/`--exclude-dir`. Built on
//! `ignore::overrides::OverrideBuilder`, the same glob engine the teacher
//! hands its `WalkBuilder` in `services/grep.rs` (there for `.gitignore`
//! semantics; here repurposed for grep's include/exclude glob lists, which
//! have inverted match-means-keep polarity from `.gitignore`'s
//! match-means-drop).

use std::fs;
use std::path::Path;

use ignore::overrides::{Override, OverrideBuilder};

use crate::config::Config;
use crate::error::Result;

/// Decides whether a walked path should be skipped before it is ever opened.
/// Cloneable so each parallel worker (spec.md §4.5) can hold its own copy
/// without sharing a lock across threads that otherwise do nothing else in
/// common.
#[derive(Clone)]
pub struct Excluder {
    /// `--include` globs, empty means "every file passes".
    include: Option<Override>,
    /// `--exclude`/`--exclude-from` globs.
    exclude: Option<Override>,
    /// `--exclude-dir` globs, checked only against directory basenames.
    exclude_dir: Option<Override>,
}

impl Excluder {
    /// Builds the three glob sets from `config`. Returns an error only when
    /// a glob itself fails to parse or an `--exclude-from` file can't be
    /// read (spec.md §7: a malformed filter is a fatal configuration error,
    /// not a suppressible per-file one).
    pub fn build(config: &Config) -> Result<Self> {
        let root = Path::new(".");

        let include = if config.include.is_empty() {
            None
        } else {
            Some(build_override(root, &config.include)?)
        };

        let mut exclude_patterns = config.exclude.clone();
        for file in &config.exclude_from {
            let contents = fs::read_to_string(file).map_err(|source| crate::error::GrepError::Io {
                path: file.clone(),
                source,
            })?;
            exclude_patterns.extend(contents.lines().filter(|l| !l.trim().is_empty()).map(str::to_string));
        }
        let exclude = if exclude_patterns.is_empty() { None } else { Some(build_override(root, &exclude_patterns)?) };

        let exclude_dir =
            if config.exclude_dir.is_empty() { None } else { Some(build_override(root, &config.exclude_dir)?) };

        Ok(Self { include, exclude, exclude_dir })
    }

    /// A no-op excluder admitting every path, used when no filters are set.
    #[must_use]
    pub fn none() -> Self {
        Self { include: None, exclude: None, exclude_dir: None }
    }

    /// True if `path` should be skipped outright.
    #[must_use]
    pub fn skip(&self, path: &Path, is_dir: bool) -> bool {
        if is_dir {
            if let Some(exclude_dir) = &self.exclude_dir {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if exclude_dir.matched(name, true).is_whitelist() {
                    return true;
                }
            }
            // `--include`/`--exclude` (without `-dir`) apply only to file
            // names in GNU grep; directories are never excluded by them so
            // recursion can continue past a directory whose own name
            // happens to match a file glob.
            return false;
        }

        if let Some(include) = &self.include {
            if !include.matched(path, false).is_whitelist() {
                return true;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.matched(path, false).is_whitelist() {
                return true;
            }
        }
        false
    }
}

fn build_override(root: &Path, patterns: &[String]) -> Result<Override> {
    let mut builder = OverrideBuilder::new(root);
    for pattern in patterns {
        builder.add(pattern).map_err(|e| {
            crate::error::GrepError::Compile(crate::error::CompileError::Bare { message: e.to_string() })
        })?;
    }
    builder.build().map_err(|e| {
        crate::error::GrepError::Compile(crate::error::CompileError::Bare { message: e.to_string() })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_glob_admits_only_matching_names() {
        let mut config = Config::default();
        config.include = vec!["*.rs".to_string()];
        let excluder = Excluder::build(&config).unwrap();
        assert!(!excluder.skip(Path::new("src/main.rs"), false));
        assert!(excluder.skip(Path::new("README.md"), false));
    }

    #[test]
    fn exclude_dir_glob_skips_matching_directory_names() {
        let mut config = Config::default();
        config.exclude_dir = vec!["target".to_string()];
        let excluder = Excluder::build(&config).unwrap();
        assert!(excluder.skip(Path::new("target"), true));
        assert!(!excluder.skip(Path::new("src"), true));
    }

    #[test]
    fn no_filters_admits_everything() {
        let excluder = Excluder::none();
        assert!(!excluder.skip(Path::new("anything.bin"), false));
    }
}
