//! `Config`: the closed option set described in spec.md §4.6, the single
//! record the CLI layer builds from argv and the matcher/scanner/walker/
//! driver consume thereafter. Generalizes the teacher's `SearchInput`/
//! `IndexInput` tool-argument structs (`tools/search.rs`) into one
//! process-wide configuration record.

use crate::dialect::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryPolicy {
    /// `-a`/`--text`: treat binary files as text.
    Text,
    /// Default: print a "Binary file X matches" synopsis.
    Binary,
    /// `-I`/`--binary-files=without-match`: skip binary files entirely.
    WithoutMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryPolicy {
    /// `-d read`: try to read a directory as if it were a file (and fail).
    Read,
    /// `-r`/`-R`/`-d recurse`: recurse into directories.
    Recurse,
    /// `-d skip`: silently skip directories (the default without `-r`).
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePolicy {
    /// `-D read`: open and read devices/FIFOs/sockets as regular files.
    Read,
    /// `-D skip`: silently skip them (the default).
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFiles {
    None,
    /// `-l`: list files containing a match.
    Matching,
    /// `-L`: list files containing no match.
    NonMatching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorWhen {
    Never,
    Always,
    Auto,
}

/// The full, closed option set. Every field here corresponds to one row of
/// spec.md §4.6's configuration table.
#[derive(Debug, Clone)]
pub struct Config {
    pub dialect: Dialect,
    pub case_fold: bool,
    pub word_match: bool,
    pub line_match: bool,
    pub invert: bool,
    pub max_count: Option<u64>,
    pub out_before: usize,
    pub out_after: usize,
    pub no_filename: bool,
    pub force_filename: bool,
    pub line_number: bool,
    pub byte_offset: bool,
    pub only_matching: bool,
    pub count_matches: bool,
    pub list_files: ListFiles,
    pub quiet: bool,
    pub exit_on_match: bool,
    pub binary_policy: BinaryPolicy,
    pub directories: DirectoryPolicy,
    pub devices: DevicePolicy,
    pub follow_symlinks: bool,
    pub label: String,
    pub null_data: bool,
    pub null_sep: bool,
    pub threads: usize,
    pub color: ColorWhen,
    pub line_buffered: bool,
    pub no_messages: bool,
    pub posixly_correct: bool,
    pub group_separator: String,
    /// `--include=GLOB`, repeatable; empty means "no restriction".
    pub include: Vec<String>,
    /// `--exclude=GLOB`, repeatable.
    pub exclude: Vec<String>,
    /// `--exclude-from=FILE`, repeatable; each file contributes one glob per line.
    pub exclude_from: Vec<std::path::PathBuf>,
    /// `--exclude-dir=GLOB`, repeatable; matched against directory basenames.
    pub exclude_dir: Vec<String>,
}

impl Config {
    /// Whether `done_on_match` is implied by the current selection mode
    /// (spec.md §4.6: `-l`/`-L`/`-q` stop scanning a file after the first
    /// decided verdict).
    #[must_use]
    pub fn done_on_match(&self) -> bool {
        self.quiet || self.exit_on_match || self.list_files != ListFiles::None
    }

    /// End-of-line byte used by the scanner: NUL in `--null-data` mode,
    /// `\n` otherwise.
    #[must_use]
    pub fn eol_byte(&self) -> u8 {
        if self.null_data { 0 } else { b'\n' }
    }

    /// Whether the parallel coordinator may be used for this invocation.
    /// Spec.md §4.6 + §9's resolved Open Question: any requested context,
    /// word-match (needs authoritative regex confirmation per narrowed
    /// line, which the bucket model doesn't thread trailing context
    /// through), or line-buffering falls back to the serial pipeline.
    #[must_use]
    pub fn parallel_eligible(&self) -> bool {
        self.threads > 1
            && self.out_before == 0
            && self.out_after == 0
            && !self.line_buffered
            && self.directories == DirectoryPolicy::Recurse
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: Dialect::Basic,
            case_fold: false,
            word_match: false,
            line_match: false,
            invert: false,
            max_count: None,
            out_before: 0,
            out_after: 0,
            no_filename: false,
            force_filename: false,
            line_number: false,
            byte_offset: false,
            only_matching: false,
            count_matches: false,
            list_files: ListFiles::None,
            quiet: false,
            exit_on_match: false,
            binary_policy: BinaryPolicy::Binary,
            directories: DirectoryPolicy::Skip,
            devices: DevicePolicy::Skip,
            follow_symlinks: false,
            label: "(standard input)".to_string(),
            null_data: false,
            null_sep: false,
            threads: 0,
            color: ColorWhen::Auto,
            line_buffered: false,
            no_messages: false,
            posixly_correct: false,
            group_separator: "--".to_string(),
            include: Vec::new(),
            exclude: Vec::new(),
            exclude_from: Vec::new(),
            exclude_dir: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_serial() {
        let cfg = Config::default();
        assert!(!cfg.parallel_eligible());
    }

    #[test]
    fn context_disables_parallel_eligibility() {
        let mut cfg = Config::default();
        cfg.threads = 8;
        cfg.directories = DirectoryPolicy::Recurse;
        assert!(cfg.parallel_eligible());
        cfg.out_after = 2;
        assert!(!cfg.parallel_eligible());
    }

    #[test]
    fn done_on_match_covers_list_and_quiet_modes() {
        let mut cfg = Config::default();
        assert!(!cfg.done_on_match());
        cfg.quiet = true;
        assert!(cfg.done_on_match());
    }
}
