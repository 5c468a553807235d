//! Parallel coordinator: spec.md §4.5. Launches `N` workers, each driving
//! its own independent `ignore::Walk` rooted at the same path, claiming
//! entries by `index mod N`, and rendering claimed entries into striped
//! output buckets the coordinator flushes in ascending index order.
//!
//! Grounded directly on `grep.c`'s `thread_routine` /
//! `grepdesc_traversal_mthread` / `lock_buffer_locks` / `raise_max_nodes`;
//! no example repo implements this scheme (the teacher's
//! `services/grep.rs` instead hands one shared `ignore::WalkParallel` a
//! work-stealing closure, which cannot reproduce serial traversal order).
//! Expressed with `std::thread::scope` instead of `rayon`, since the
//! coordinator needs explicit join-then-flush control between batches that
//! a `rayon::ThreadPool` doesn't expose.

pub mod bucket;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ignore::WalkBuilder;

use crate::config::Config;
use crate::error::Result;
use crate::exclude::Excluder;
use crate::matcher::CompiledMatcher;
use crate::printer::LinePrinter;
use crate::scanner::Scanner;
use bucket::BucketTable;

/// Per-batch visited-entry bound before a worker returns to let the
/// coordinator flush, spec.md §4.5: `2^25 * N - 8`.
fn max_allowed_nodes(threads: usize) -> u64 {
    (1u64 << 25) * threads as u64 - 8
}

/// Shared state every worker thread reads and writes; fields chosen so
/// workers never need to touch the real stdout (spec.md §5: "Standard
/// output is touched only by the coordinator between worker batches").
struct SharedState {
    buckets: BucketTable,
    any_matched: AtomicBool,
    errseen: AtomicBool,
    finished: AtomicBool,
    /// Global index of the highest entry claimed this batch, used by the
    /// coordinator to bound its flush scan.
    high_water: AtomicU64,
}

/// Runs `root` through the parallel coordinator, writing to `out` in
/// ascending traversal order, and returns whether any line was selected
/// (spec.md §6 exit-code contract).
pub fn run_parallel(
    root: &Path,
    config: &Config,
    matcher: &CompiledMatcher,
    excluder: &Excluder,
    out: &mut impl std::io::Write,
) -> Result<bool> {
    let threads = config.threads.max(1);
    let shared = Arc::new(SharedState {
        buckets: BucketTable::new(),
        any_matched: AtomicBool::new(false),
        errseen: AtomicBool::new(false),
        finished: AtomicBool::new(false),
        high_water: AtomicU64::new(0),
    });

    loop {
        let batch_high = std::thread::scope(|scope| -> u64 {
            let mut handles = Vec::with_capacity(threads);
            for worker_id in 0..threads {
                let shared = Arc::clone(&shared);
                let root = root.to_path_buf();
                let excluder = excluder.clone();
                handles.push(scope.spawn(move || {
                    worker_loop(worker_id, threads, &root, config, matcher, &excluder, &shared)
                }));
            }
            handles.into_iter().map(|h| h.join().unwrap_or(0)).max().unwrap_or(0)
        });

        flush_buckets(&shared.buckets, batch_high, out)?;

        if shared.finished.load(Ordering::SeqCst) {
            break;
        }
    }

    Ok(shared.any_matched.load(Ordering::SeqCst))
}

/// One worker's batch: enumerate the whole tree from scratch, claim every
/// `k`th entry (`k mod N == worker_id`), render claimed entries into the
/// shared bucket table. Returns the highest global index this worker
/// observed, so the coordinator knows how far to flush.
#[allow(clippy::too_many_arguments)]
fn worker_loop(
    worker_id: usize,
    threads: usize,
    root: &Path,
    config: &Config,
    matcher: &CompiledMatcher,
    excluder: &Excluder,
    shared: &SharedState,
) -> u64 {
    let recurse = true;
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(config.follow_symlinks)
        .max_depth(if recurse { None } else { Some(1) })
        .build();

    let bound = max_allowed_nodes(threads);
    let mut visited: u64 = 0;
    let mut highest = 0u64;

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => {
                shared.errseen.store(true, Ordering::SeqCst);
                visited += 1;
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let global_index = visited;
        visited += 1;
        highest = highest.max(global_index);

        if global_index % threads as u64 != worker_id as u64 {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type();
        let is_dir = file_type.is_some_and(|ft| ft.is_dir());
        if excluder.skip(path, is_dir) {
            continue;
        }
        let is_symlink = file_type.is_some_and(|ft| ft.is_symlink());
        if is_dir || (is_symlink && !config.follow_symlinks) || !crate::walk::should_scan(path, config.devices) {
            continue;
        }

        if let Some(rendered) = render_entry(path, config, matcher) {
            if rendered.matched {
                shared.any_matched.store(true, Ordering::SeqCst);
            }
            if !rendered.buf.is_empty() {
                shared.buckets.store(global_index as usize, rendered.buf);
            }
        } else {
            shared.errseen.store(true, Ordering::SeqCst);
        }

        if visited >= bound {
            shared.high_water.fetch_max(highest, Ordering::SeqCst);
            return highest;
        }
    }

    shared.high_water.fetch_max(highest, Ordering::SeqCst);
    if worker_id == 0 {
        shared.finished.store(true, Ordering::SeqCst);
    }
    highest
}

struct RenderedEntry {
    buf: Vec<u8>,
    matched: bool,
}

/// Opens one claimed file, scans it with a private `Scanner`, and renders
/// its selected lines into an in-memory buffer via `LinePrinter` (spec.md
/// §3 "Output bucket"). Each worker gets its own `Scanner`/`LinePrinter`
/// instance per file; no state crosses the thread boundary except through
/// `BucketTable`.
fn render_entry(path: &Path, config: &Config, matcher: &CompiledMatcher) -> Option<RenderedEntry> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut scanner = Scanner::new(config);
    let mut buf = Vec::new();
    let label = path.to_string_lossy().into_owned();
    let only_matching_matcher = config.only_matching.then_some(matcher);
    let colors = (config.color == crate::config::ColorWhen::Always).then(crate::colorcap::ColorSpec::from_env);
    let skip_nuls = matcher.matches_empty_line() == config.invert;
    let matched = {
        let mut printer =
            LinePrinter::new(&mut buf, Some(label.as_str()), config, colors.as_ref(), only_matching_matcher);
        scanner.run_file(&mut file, skip_nuls, matcher, config, &mut printer).ok()?
    };
    Some(RenderedEntry { buf, matched })
}

/// Drains bucket indices `[0, high]` from `buckets` into `out`, in
/// ascending order, preserving the serial walk's output sequence (spec.md
/// §4.5's "flush-and-restart cycle").
fn flush_buckets(buckets: &BucketTable, high: u64, out: &mut impl std::io::Write) -> Result<()> {
    for index in 0..=high as usize {
        if let Some(data) = buckets.take(index) {
            out.write_all(&data).map_err(crate::error::GrepError::Output)?;
        }
    }
    Ok(())
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
    fn parallel_walk_matches_serial_output_for_small_tree() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hit\nmiss\n").unwrap();
        fs::write(dir.path().join("b.txt"), b"miss\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.txt"), b"hit again\n").unwrap();

        let mut config = Config::default();
        config.directories = crate::config::DirectoryPolicy::Recurse;
        config.threads = 4;
        let matcher = matcher_for("hit", &config);
        let excluder = Excluder::none();

        let mut out = Vec::new();
        let any = run_parallel(dir.path(), &config, &matcher, &excluder, &mut out).unwrap();
        assert!(any);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("a.txt:hit"));
        assert!(text.contains(&format!("{}", dir.path().join("sub/c.txt").display())));
        assert!(!text.contains("b.txt"));
    }

    #[test]
    fn no_matches_yields_false_and_empty_output() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"nothing here\n").unwrap();

        let mut config = Config::default();
        config.directories = crate::config::DirectoryPolicy::Recurse;
        config.threads = 2;
        let matcher = matcher_for("absent", &config);
        let excluder = Excluder::none();

        let mut out = Vec::new();
        let any = run_parallel(dir.path(), &config, &matcher, &excluder, &mut out).unwrap();
        assert!(!any);
        assert!(out.is_empty());
    }
}
