//! Config & Driver: spec.md §4.6. Routes the CLI's path arguments to
//! either the serial (`walk.rs` + `scanner`) or parallel (`parallel/`)
//! pipeline, and owns the process exit-code contract of spec.md §6: `0`
//! if any line was selected, `1` if none, `2` on any unsuppressed error.
//!
//! Generalizes the teacher's `run_cli` dispatch in `main.rs` (which routes
//! a subcommand to one of `Indexer`/`SearchService`) into routing a path
//! argument to one of the two grep pipelines.

use std::io::Write;
use std::path::{Path, PathBuf};

use same_file::Handle;

use crate::config::{Config, DirectoryPolicy, ListFiles};
use crate::error::Result;
use crate::exclude::Excluder;
use crate::matcher::CompiledMatcher;
use crate::parallel;
use crate::printer::LinePrinter;
use crate::scanner::{LineEvent, LineSink, Scanner};
use crate::walk::{self, WalkEntry, Walker};

/// Aggregate result of a full invocation, spec.md §7: "Walker aggregates
/// per-entry status by conjunction"; the driver does the same across
/// files/targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOutcome {
    pub any_matched: bool,
    pub errseen: bool,
}

impl RunOutcome {
    /// Spec.md §6's exit-status contract, modulo `-q` masking handled by
    /// the caller (`-s`/`no_messages` only suppresses *messages*, not the
    /// error exit code itself, per spec.md §7).
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.errseen {
            2
        } else if self.any_matched {
            0
        } else {
            1
        }
    }
}

/// A sink that discards line bodies but remembers whether anything was
/// selected, used for `-q`/`-l`/`-L` where the body never needs rendering
/// (spec.md §4.6: these modes set `done_on_match`).
struct NullSink {
    matched: bool,
}

impl LineSink for NullSink {
    fn line(&mut self, event: LineEvent<'_>) -> Result<()> {
        if event.is_match {
            self.matched = true;
        }
        Ok(())
    }
    fn binary_matched(&mut self) -> Result<()> {
        self.matched = true;
        Ok(())
    }
    fn group_separator(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Counts selected lines without rendering them, for `-c`/`--count`
/// (spec.md §6's "Count mode"). Context lines emitted alongside a match
/// are not counted, matching GNU grep's `-c` + context behavior.
struct CountingSink {
    count: u64,
    binary_matched: bool,
}

impl LineSink for CountingSink {
    fn line(&mut self, event: LineEvent<'_>) -> Result<()> {
        if event.is_match {
            self.count += 1;
        }
        Ok(())
    }
    fn binary_matched(&mut self) -> Result<()> {
        self.binary_matched = true;
        Ok(())
    }
    fn group_separator(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Runs the full invocation for `paths` (empty means "read standard
/// input"), writing output to `out`.
pub fn run(
    paths: &[PathBuf],
    config: &Config,
    matcher: &CompiledMatcher,
    excluder: &Excluder,
    out: &mut impl Write,
) -> Result<RunOutcome> {
    let mut outcome = RunOutcome::default();

    if paths.is_empty() {
        process_stdin(config, matcher, out, &mut outcome)?;
        return Ok(outcome);
    }

    let show_filename = !config.no_filename && (config.force_filename || paths.len() > 1 || is_any_dir(paths, config));

    for path in paths {
        if config.exit_on_match && outcome.any_matched {
            break;
        }
        if path.as_os_str() == "-" {
            process_stdin(config, matcher, out, &mut outcome)?;
            continue;
        }

        let meta = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(source) => {
                report_io_error(config, path, source, &mut outcome);
                continue;
            }
        };

        if meta.is_dir() {
            process_directory(path, config, matcher, excluder, out, &mut outcome)?;
        } else {
            process_file(path, config, matcher, show_filename, out, &mut outcome)?;
        }
    }

    Ok(outcome)
}

fn is_any_dir(paths: &[PathBuf], config: &Config) -> bool {
    config.directories == DirectoryPolicy::Recurse
        && paths.iter().any(|p| std::fs::symlink_metadata(p).is_ok_and(|m| m.is_dir()))
}

fn process_directory(
    path: &Path,
    config: &Config,
    matcher: &CompiledMatcher,
    excluder: &Excluder,
    out: &mut impl Write,
    outcome: &mut RunOutcome,
) -> Result<()> {
    match config.directories {
        DirectoryPolicy::Skip => {
            if !config.no_messages {
                eprintln!("pargrep: {}: Is a directory", path.display());
            }
        }
        DirectoryPolicy::Read => {
            report_io_error(
                config,
                path,
                std::io::Error::from(std::io::ErrorKind::Unsupported),
                outcome,
            );
        }
        DirectoryPolicy::Recurse => {
            if config.parallel_eligible() {
                tracing::debug!(threads = config.threads, path = %path.display(), "dispatching to parallel coordinator");
                let any = parallel::run_parallel(path, config, matcher, excluder, out)?;
                outcome.any_matched |= any;
            } else {
                if config.threads > 1 {
                    tracing::debug!(
                        threads = config.threads,
                        out_before = config.out_before,
                        out_after = config.out_after,
                        line_buffered = config.line_buffered,
                        "context or line-buffering requested alongside threads > 1; falling back to the serial walker"
                    );
                }
                let walker = Walker::new(path, config, excluder.clone());
                for entry in walker {
                    if config.exit_on_match && outcome.any_matched {
                        break;
                    }
                    match entry {
                        WalkEntry::File(p) => {
                            if !walk::should_scan(&p, config.devices) {
                                continue;
                            }
                            process_file(&p, config, matcher, true, out, outcome)?;
                        }
                        WalkEntry::UnfollowedSymlink(_) | WalkEntry::PreOrderDir(_) => {}
                        WalkEntry::Unreadable(p, msg) => {
                            if !config.no_messages {
                                eprintln!("pargrep: {}: {}", p.display(), msg);
                            }
                            outcome.errseen = true;
                        }
                        WalkEntry::CycleDetected(p) => {
                            if !config.no_messages {
                                eprintln!("pargrep: {}: recursive directory loop", p.display());
                            }
                            outcome.errseen = true;
                        }
                        _ => {}
                    }
                }
            }
        }
    }
    Ok(())
}

/// Either a plain `Read` (standard input) or an open `File` that can take
/// the `SEEK_DATA` nul-skipping fast path (spec.md §4.3). Lets
/// `scan_with_mode`'s three sink branches share one `.run(...)` call site
/// instead of duplicating it per source type.
enum ScanSource<'a> {
    Plain(&'a mut dyn std::io::Read),
    File { file: &'a mut std::fs::File, skip_nuls: bool },
}

impl ScanSource<'_> {
    fn run(
        &mut self,
        scanner: &mut Scanner,
        matcher: &CompiledMatcher,
        config: &Config,
        sink: &mut dyn LineSink,
    ) -> Result<bool> {
        match self {
            ScanSource::Plain(reader) => scanner.run(reader, matcher, config, sink),
            ScanSource::File { file, skip_nuls } => scanner.run_file(file, *skip_nuls, matcher, config, sink),
        }
    }
}

fn process_file(
    path: &Path,
    config: &Config,
    matcher: &CompiledMatcher,
    show_filename: bool,
    out: &mut impl Write,
    outcome: &mut RunOutcome,
) -> Result<()> {
    if is_same_as_stdout(path) {
        if !config.no_messages {
            eprintln!("pargrep: input file is output");
        }
        outcome.errseen = true;
        return Ok(());
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(source) => {
            report_io_error(config, path, source, outcome);
            return Ok(());
        }
    };
    let label = path.to_string_lossy().into_owned();
    let mut scanner = Scanner::new(config);
    // Spec.md §4.3/§9's `skip_empty_lines` probe: safe to bulk-skip a NUL
    // run via SEEK_DATA only when an empty line wouldn't itself need to be
    // selected (and counted) individually.
    let skip_nuls = matcher.matches_empty_line() == config.invert;
    let mut source = ScanSource::File { file: &mut file, skip_nuls };

    scan_with_mode(&mut scanner, &mut source, matcher, config, Some(&label), show_filename, out, outcome)
}

fn process_stdin(
    config: &Config,
    matcher: &CompiledMatcher,
    out: &mut impl Write,
    outcome: &mut RunOutcome,
) -> Result<()> {
    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    let mut scanner = Scanner::new(config);
    let show_filename = !config.no_filename && config.force_filename;
    let mut source = ScanSource::Plain(&mut reader);
    scan_with_mode(&mut scanner, &mut source, matcher, config, Some(&config.label), show_filename, out, outcome)
}

#[allow(clippy::too_many_arguments)]
fn scan_with_mode(
    scanner: &mut Scanner,
    source: &mut ScanSource<'_>,
    matcher: &CompiledMatcher,
    config: &Config,
    label: Option<&str>,
    show_filename: bool,
    out: &mut impl Write,
    outcome: &mut RunOutcome,
) -> Result<()> {
    let display_label = label.unwrap_or(&config.label);

    if config.quiet || config.list_files != ListFiles::None {
        let mut sink = NullSink { matched: false };
        source.run(scanner, matcher, config, &mut sink)?;
        if sink.matched {
            outcome.any_matched = true;
        }
        match config.list_files {
            ListFiles::Matching if sink.matched => write_listed(out, display_label, config)?,
            ListFiles::NonMatching if !sink.matched => write_listed(out, display_label, config)?,
            _ => {}
        }
        return Ok(());
    }

    if config.count_matches {
        let mut sink = CountingSink { count: 0, binary_matched: false };
        source.run(scanner, matcher, config, &mut sink)?;
        if sink.count > 0 {
            outcome.any_matched = true;
        }
        if sink.binary_matched {
            writeln!(out, "Binary file {display_label} matches").map_err(crate::error::GrepError::Output)?;
        } else {
            if show_filename {
                write!(out, "{display_label}").map_err(crate::error::GrepError::Output)?;
                out.write_all(&[if config.null_sep { 0 } else { b':' }]).map_err(crate::error::GrepError::Output)?;
            }
            writeln!(out, "{}", sink.count).map_err(crate::error::GrepError::Output)?;
        }
        return Ok(());
    }

    let colors = (config.color == crate::config::ColorWhen::Always).then(crate::colorcap::ColorSpec::from_env);
    let only_matching_matcher = config.only_matching.then_some(matcher);
    let label_opt = show_filename.then_some(display_label);
    let mut printer = LinePrinter::new(out, label_opt, config, colors.as_ref(), only_matching_matcher);
    let any = source.run(scanner, matcher, config, &mut printer)?;
    if any {
        outcome.any_matched = true;
    }
    Ok(())
}

fn write_listed(out: &mut impl Write, label: &str, config: &Config) -> Result<()> {
    out.write_all(label.as_bytes()).map_err(crate::error::GrepError::Output)?;
    out.write_all(&[if config.null_sep { 0 } else { b'\n' }]).map_err(crate::error::GrepError::Output)
}

fn report_io_error(config: &Config, path: &Path, source: std::io::Error, outcome: &mut RunOutcome) {
    if !config.no_messages {
        eprintln!("pargrep: {}: {}", path.display(), source);
    }
    outcome.errseen = true;
}

/// Spec.md §4.4's "honors a same-inode-as-stdout check that aborts a file
/// if it is the program's own output" — relevant when stdout is
/// redirected into a file that also lies within the searched tree.
fn is_same_as_stdout(path: &Path) -> bool {
    let Ok(stdout_handle) = Handle::stdout() else { return false };
    let Ok(path_handle) = Handle::from_path(path) else { return false };
    stdout_handle == path_handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternSet;
    use std::fs;
    use tempfile::tempdir;

    fn matcher_for(pattern: &str, config: &Config) -> CompiledMatcher {
        let mut patterns = PatternSet::new();
        patterns.add_command_line(pattern);
        CompiledMatcher::compile(&patterns, config).unwrap()
    }

    #[test]
    fn single_file_emits_no_filename_prefix_by_default() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"alpha\nbeta\ngamma\n").unwrap();

        let config = Config::default();
        let matcher = matcher_for("a", &config);
        let excluder = Excluder::none();
        let mut out = Vec::new();

        let outcome = run(&[file], &config, &matcher, &excluder, &mut out).unwrap();
        assert!(outcome.any_matched);
        assert_eq!(out, b"alpha\ngamma\n");
    }

    #[test]
    fn multiple_files_show_filename_prefix() {
        let dir = tempdir().unwrap();
        let f1 = dir.path().join("a.txt");
        let f2 = dir.path().join("b.txt");
        fs::write(&f1, b"hit\n").unwrap();
        fs::write(&f2, b"hit\n").unwrap();

        let config = Config::default();
        let matcher = matcher_for("hit", &config);
        let excluder = Excluder::none();
        let mut out = Vec::new();

        run(&[f1.clone(), f2.clone()], &config, &matcher, &excluder, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!("{}:hit", f1.display())));
        assert!(text.contains(&format!("{}:hit", f2.display())));
    }

    #[test]
    fn count_mode_reports_match_count_without_body() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"a\nb\na\n").unwrap();

        let mut config = Config::default();
        config.count_matches = true;
        let matcher = matcher_for("a", &config);
        let excluder = Excluder::none();
        let mut out = Vec::new();

        run(&[file], &config, &matcher, &excluder, &mut out).unwrap();
        assert_eq!(out, b"2\n");
    }

    #[test]
    fn list_matching_files_reports_only_names() {
        let dir = tempdir().unwrap();
        let f1 = dir.path().join("a.txt");
        let f2 = dir.path().join("b.txt");
        fs::write(&f1, b"hit\n").unwrap();
        fs::write(&f2, b"miss\n").unwrap();

        let mut config = Config::default();
        config.list_files = ListFiles::Matching;
        let matcher = matcher_for("hit", &config);
        let excluder = Excluder::none();
        let mut out = Vec::new();

        run(&[f1.clone(), f2], &config, &matcher, &excluder, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, format!("{}\n", f1.display()));
    }

    #[test]
    fn exit_code_reflects_match_presence() {
        let mut outcome = RunOutcome::default();
        assert_eq!(outcome.exit_code(), 1);
        outcome.any_matched = true;
        assert_eq!(outcome.exit_code(), 0);
        outcome.errseen = true;
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn recursive_directory_search_finds_nested_match() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/nested.txt"), b"needle\n").unwrap();

        let mut config = Config::default();
        config.directories = DirectoryPolicy::Recurse;
        let matcher = matcher_for("needle", &config);
        let excluder = Excluder::none();
        let mut out = Vec::new();

        let outcome = run(&[dir.path().to_path_buf()], &config, &matcher, &excluder, &mut out).unwrap();
        assert!(outcome.any_matched);
    }
}
