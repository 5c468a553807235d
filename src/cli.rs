//! argv -> `Config` + `PatternSet` + path list: spec.md §6's CLI surface.
//! Built on `clap`'s derive API, the same crate and style the teacher's
//! `main.rs` uses for its `Cli`/`Subcommand` struct, generalized from one
//! subcommand per MCP tool into grep's single flat option set.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::{BinaryPolicy, Config, ColorWhen, DevicePolicy, DirectoryPolicy, ListFiles};
use crate::dialect::Dialect;
use crate::error::{GrepError, Result};
use crate::pattern::PatternSet;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DialectArg {
    Basic,
    Extended,
    Fixed,
    Awk,
    #[value(name = "gnu-awk")]
    GnuAwk,
    #[value(name = "posix-awk")]
    PosixAwk,
    Perl,
}

impl From<DialectArg> for Dialect {
    fn from(value: DialectArg) -> Self {
        match value {
            DialectArg::Basic => Dialect::Basic,
            DialectArg::Extended => Dialect::Extended,
            DialectArg::Fixed => Dialect::Fixed,
            // `awk`/`gnu-awk`/`posix-awk` share one translation pass; the
            // three-way split in GNU grep only changes which warnings are
            // fatal, not the compiled language (spec.md §7's pattern
            // warning handling, folded into `posixly_correct` instead).
            DialectArg::Awk | DialectArg::GnuAwk | DialectArg::PosixAwk => Dialect::Awk,
            DialectArg::Perl => Dialect::Perl,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ColorArg {
    Never,
    Always,
    Auto,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectoriesArg {
    Read,
    Recurse,
    Skip,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DevicesArg {
    Read,
    Skip,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BinaryFilesArg {
    Binary,
    Text,
    #[value(name = "without-match")]
    WithoutMatch,
}

/// spec.md §6's CLI surface, abbreviated to the options the core contract
/// actually consumes (command-line parsing itself is named an external
/// collaborator in spec.md §1, supplied here so the binary is runnable).
#[derive(Debug, Parser)]
#[command(name = "pargrep", version, about = "Parallel recursive regular-expression line searcher")]
pub struct Cli {
    /// Pattern to search for, unless `-e`/`-f` supplied one already.
    pub pattern: Option<String>,

    /// Files or directories to search; `-` or omitted reads standard input.
    pub files: Vec<PathBuf>,

    /// -E: extended regular expressions.
    #[arg(short = 'E', long = "extended-regexp", group = "dialect_flag")]
    pub extended: bool,
    /// -F: fixed strings.
    #[arg(short = 'F', long = "fixed-strings", group = "dialect_flag")]
    pub fixed: bool,
    /// -G: basic regular expressions (the default).
    #[arg(short = 'G', long = "basic-regexp", group = "dialect_flag")]
    pub basic: bool,
    /// -P: Perl-compatible regular expressions.
    #[arg(short = 'P', long = "perl-regexp", group = "dialect_flag")]
    pub perl: bool,
    #[arg(long = "dialect", value_enum)]
    pub dialect: Option<DialectArg>,

    /// -e PATTERN: add a pattern, repeatable.
    #[arg(short = 'e', long = "regexp", action = ArgAction::Append)]
    pub patterns: Vec<String>,
    /// -f FILE: read patterns from FILE, repeatable.
    #[arg(short = 'f', long = "file", action = ArgAction::Append)]
    pub pattern_files: Vec<PathBuf>,

    /// -i: case-insensitive.
    #[arg(short = 'i', long = "ignore-case")]
    pub ignore_case: bool,
    /// -v: invert match.
    #[arg(short = 'v', long = "invert-match")]
    pub invert_match: bool,
    /// -w: whole-word match.
    #[arg(short = 'w', long = "word-regexp")]
    pub word_regexp: bool,
    /// -x: whole-line match.
    #[arg(short = 'x', long = "line-regexp")]
    pub line_regexp: bool,

    /// -n: prefix selected lines with their line number.
    #[arg(short = 'n', long = "line-number")]
    pub line_number: bool,
    /// -b: prefix selected lines with their byte offset.
    #[arg(short = 'b', long = "byte-offset")]
    pub byte_offset: bool,
    /// -c: print only a count of selected lines per file.
    #[arg(short = 'c', long = "count")]
    pub count: bool,
    /// -H: always print a filename prefix.
    #[arg(short = 'H', long = "with-filename")]
    pub with_filename: bool,
    /// -h: never print a filename prefix.
    #[arg(short = 'h', long = "no-filename")]
    pub no_filename: bool,
    /// -l: print only names of files containing a match.
    #[arg(short = 'l', long = "files-with-matches")]
    pub list_matching: bool,
    /// -L: print only names of files not containing a match.
    #[arg(short = 'L', long = "files-without-match")]
    pub list_non_matching: bool,
    /// -q: suppress all output; exit status only.
    #[arg(short = 'q', long = "quiet", alias = "silent")]
    pub quiet: bool,
    /// -s: suppress error messages about nonexistent/unreadable files.
    #[arg(short = 's', long = "no-messages")]
    pub no_messages: bool,
    /// -o: print only the matched part of each line.
    #[arg(short = 'o', long = "only-matching")]
    pub only_matching: bool,

    /// -r: recurse into directories.
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,
    /// -R: recurse into directories, following symlinks.
    #[arg(short = 'R', long = "dereference-recursive")]
    pub dereference_recursive: bool,
    #[arg(short = 'd', long = "directories", value_enum)]
    pub directories: Option<DirectoriesArg>,
    #[arg(short = 'D', long = "devices", value_enum)]
    pub devices: Option<DevicesArg>,

    /// -A NUM: lines of trailing context.
    #[arg(short = 'A', long = "after-context", value_name = "NUM")]
    pub after_context: Option<usize>,
    /// -B NUM: lines of leading context.
    #[arg(short = 'B', long = "before-context", value_name = "NUM")]
    pub before_context: Option<usize>,
    /// -C NUM: lines of context (both sides); bare `-C` means 2.
    #[arg(short = 'C', long = "context", value_name = "NUM", num_args = 0..=1, default_missing_value = "2")]
    pub context: Option<usize>,

    /// -m NUM: stop after NUM selected lines per file.
    #[arg(short = 'm', long = "max-count", value_name = "NUM")]
    pub max_count: Option<u64>,

    /// -Z: separate filename from match with NUL.
    #[arg(short = 'Z', long = "null")]
    pub null_sep: bool,
    /// -z: lines are NUL-terminated instead of newline-terminated.
    #[arg(short = 'z', long = "null-data")]
    pub null_data: bool,

    /// -p NUM: requested worker thread count; 0 (the default) is serial.
    #[arg(short = 'p', long = "threads", value_name = "NUM", default_value_t = 0)]
    pub threads: usize,

    #[arg(long = "color", alias = "colour", value_enum, num_args = 0..=1, default_missing_value = "always")]
    pub color: Option<ColorArg>,

    #[arg(long = "binary-files", value_enum)]
    pub binary_files: Option<BinaryFilesArg>,
    /// -a: treat binary files as text.
    #[arg(short = 'a', long = "text")]
    pub text: bool,
    /// -I: skip binary files entirely.
    #[arg(short = 'I')]
    pub binary_without_match: bool,

    /// --label=NAME: fake file name used for standard input.
    #[arg(long = "label", default_value = "(standard input)")]
    pub label: String,

    #[arg(long = "line-buffered")]
    pub line_buffered: bool,

    #[arg(long = "include", action = ArgAction::Append)]
    pub include: Vec<String>,
    #[arg(long = "exclude", action = ArgAction::Append)]
    pub exclude: Vec<String>,
    #[arg(long = "exclude-from", action = ArgAction::Append)]
    pub exclude_from: Vec<PathBuf>,
    #[arg(long = "exclude-dir", action = ArgAction::Append)]
    pub exclude_dir: Vec<String>,

    #[arg(long = "group-separator", value_name = "STR")]
    pub group_separator: Option<String>,
    #[arg(long = "no-group-separator")]
    pub no_group_separator: bool,
}

impl Cli {
    /// Rewrites a `-NUM` digit-string argument (spec.md §6: "shorthand for
    /// `--context=NUM`") into `--context=NUM` before clap ever sees it,
    /// since clap's derive API has no concept of a bare numeric flag.
    #[must_use]
    pub fn preprocess_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
        let mut out = Vec::new();
        for arg in args {
            if arg.len() > 1 && arg.starts_with('-') && arg[1..].bytes().all(|b| b.is_ascii_digit()) {
                out.push(format!("--context={}", &arg[1..]));
            } else {
                out.push(arg);
            }
        }
        out
    }

    /// Builds the `Config`, the compiled `PatternSet`, and the path
    /// arguments from parsed CLI options. Pattern compilation itself is
    /// left to `CompiledMatcher::compile`; this just assembles the
    /// `PatternSet` per spec.md §3.
    pub fn into_parts(self) -> Result<(Config, PatternSet, Vec<PathBuf>)> {
        let mut patterns = PatternSet::new();
        for p in &self.patterns {
            patterns.add_command_line(p);
        }
        for file in &self.pattern_files {
            patterns.add_file(file)?;
        }
        if patterns.is_empty() {
            if let Some(p) = &self.pattern {
                patterns.add_command_line(p);
            }
        }

        let mut files = self.files.clone();
        if patterns.is_empty() {
            // No `-e`/`-f` given: the first positional argument is the
            // pattern itself, matching GNU grep's `pattern? file...`.
            if let Some(p) = self.pattern.clone() {
                patterns.add_command_line(&p);
            }
        } else if let Some(p) = self.pattern.clone() {
            // `-e`/`-f` already claimed a pattern; the bare positional
            // argument (if any) is actually the first file.
            files.insert(0, PathBuf::from(p));
        }

        let dialect = if self.fixed {
            Dialect::Fixed
        } else if self.extended {
            Dialect::Extended
        } else if self.perl {
            Dialect::Perl
        } else if let Some(d) = self.dialect {
            d.into()
        } else {
            Dialect::Basic
        };

        let recursive = self.recursive || self.dereference_recursive;
        let directories = match self.directories {
            Some(DirectoriesArg::Read) => DirectoryPolicy::Read,
            Some(DirectoriesArg::Recurse) => DirectoryPolicy::Recurse,
            Some(DirectoriesArg::Skip) => DirectoryPolicy::Skip,
            None if recursive => DirectoryPolicy::Recurse,
            None => DirectoryPolicy::Skip,
        };
        let devices = match self.devices {
            Some(DevicesArg::Read) => DevicePolicy::Read,
            Some(DevicesArg::Skip) | None => DevicePolicy::Skip,
        };

        let binary_policy = if self.text {
            BinaryPolicy::Text
        } else if self.binary_without_match {
            BinaryPolicy::WithoutMatch
        } else {
            match self.binary_files {
                Some(BinaryFilesArg::Binary) => BinaryPolicy::Binary,
                Some(BinaryFilesArg::Text) => BinaryPolicy::Text,
                Some(BinaryFilesArg::WithoutMatch) => BinaryPolicy::WithoutMatch,
                None => BinaryPolicy::Binary,
            }
        };

        let out_before = self.context.or(self.before_context).unwrap_or(0);
        let out_after = self.context.or(self.after_context).unwrap_or(0);

        let list_files = if self.list_matching {
            ListFiles::Matching
        } else if self.list_non_matching {
            ListFiles::NonMatching
        } else {
            ListFiles::None
        };

        let color = match self.color {
            Some(ColorArg::Never) => ColorWhen::Never,
            Some(ColorArg::Always) => ColorWhen::Always,
            Some(ColorArg::Auto) | None => ColorWhen::Auto,
        };

        let group_separator = if self.no_group_separator {
            String::new()
        } else {
            self.group_separator.unwrap_or_else(|| "--".to_string())
        };

        let threads = if self.threads > 0 {
            self.threads
        } else if recursive {
            std::thread::available_parallelism().map_or(1, |n| n.get()).min(6 * num_cpus_hint())
        } else {
            0
        };

        let config = Config {
            dialect,
            case_fold: self.ignore_case,
            word_match: self.word_regexp,
            line_match: self.line_regexp,
            invert: self.invert_match,
            max_count: self.max_count,
            out_before,
            out_after,
            no_filename: self.no_filename,
            force_filename: self.with_filename,
            line_number: self.line_number,
            byte_offset: self.byte_offset,
            only_matching: self.only_matching,
            count_matches: self.count,
            list_files,
            quiet: self.quiet,
            exit_on_match: self.quiet,
            binary_policy,
            directories,
            devices,
            follow_symlinks: self.dereference_recursive,
            label: self.label,
            null_data: self.null_data,
            null_sep: self.null_sep,
            threads,
            color,
            line_buffered: self.line_buffered,
            no_messages: self.no_messages,
            posixly_correct: std::env::var_os("POSIXLY_CORRECT").is_some(),
            group_separator,
            include: self.include,
            exclude: self.exclude,
            exclude_from: self.exclude_from,
            exclude_dir: self.exclude_dir,
        };

        if patterns.is_empty() {
            return Err(GrepError::Compile(crate::error::CompileError::Bare {
                message: "no pattern specified".to_string(),
            }));
        }

        Ok((config, patterns, files))
    }
}

fn num_cpus_hint() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_shorthand_rewrites_to_long_option() {
        let args = Cli::preprocess_args(["pargrep".to_string(), "-3".to_string(), "pat".to_string()]);
        assert_eq!(args, vec!["pargrep", "--context=3", "pat"]);
    }

    #[test]
    fn non_numeric_flags_pass_through_untouched() {
        let args = Cli::preprocess_args(["pargrep".to_string(), "-rn".to_string(), "pat".to_string()]);
        assert_eq!(args, vec!["pargrep", "-rn", "pat"]);
    }

    #[test]
    fn bare_positional_pattern_is_used_when_no_dash_e() {
        let cli = Cli::parse_from(["pargrep", "needle", "file.txt"]);
        let (_, patterns, files) = cli.into_parts().unwrap();
        assert_eq!(patterns.patterns()[0].text, "needle");
        assert_eq!(files, vec![PathBuf::from("file.txt")]);
    }

    #[test]
    fn dash_e_pattern_demotes_positional_to_a_file() {
        let cli = Cli::parse_from(["pargrep", "-e", "needle", "file.txt"]);
        let (_, patterns, files) = cli.into_parts().unwrap();
        assert_eq!(patterns.patterns()[0].text, "needle");
        assert_eq!(files, vec![PathBuf::from("file.txt")]);
    }

    #[test]
    fn context_flag_sets_both_before_and_after() {
        let cli = Cli::parse_from(["pargrep", "-C", "3", "needle"]);
        let (config, _, _) = cli.into_parts().unwrap();
        assert_eq!(config.out_before, 3);
        assert_eq!(config.out_after, 3);
    }
}
