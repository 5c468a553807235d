//! Stream scanner: drives read/refill over one open descriptor, locates
//! candidate lines, and feeds them through invert-match, context windowing,
//! and binary detection (spec.md §4.3). Generalizes the teacher's
//! `Searcher`-driven loop in `services/grep.rs` into a from-scratch
//! buffered reader owned by this crate instead of `grep-searcher`.

pub mod buffer;

use std::collections::VecDeque;
use std::io::Read;

use crate::config::{BinaryPolicy, Config};
use crate::error::Result;
use crate::matcher::CompiledMatcher;
use buffer::ScanBuffer;

/// Per-open-file scan state, spec.md §3's "Per-scan state".
pub struct ScanState {
    totalcc: u64,
    totalnl: u64,
    lastnl_pos: usize,
    outleft: Option<u64>,
    binary_decided: bool,
    is_binary: bool,
    binary_first_nul_line: Option<u64>,
    any_selected: bool,
    /// Latches once a `SEEK_DATA` attempt fails, so later fills in the same
    /// scan don't keep retrying a seek that can't succeed (spec.md §4.3;
    /// mirrors `grep.c`'s static `seek_data_failed`).
    seek_data_failed: bool,
}

impl ScanState {
    #[must_use]
    pub fn new(max_count: Option<u64>) -> Self {
        Self {
            totalcc: 0,
            totalnl: 0,
            lastnl_pos: 0,
            outleft: max_count,
            binary_decided: false,
            is_binary: false,
            binary_first_nul_line: None,
            any_selected: false,
            seek_data_failed: false,
        }
    }
}

/// Text handed to the sink for one line: a selected match, a context line,
/// or (when inverted) a non-matching line.
pub struct LineEvent<'a> {
    pub bytes: &'a [u8],
    pub line_number: u64,
    pub byte_offset: u64,
    pub is_match: bool,
}

/// Destination for scanner output, implemented by `printer::LinePrinter`.
/// Mirrors the closure-sink pattern the teacher uses for
/// `grep_searcher::sinks::UTF8`, generalized to a trait so the printer can
/// hold state (column widths, pending separators) across calls.
pub trait LineSink {
    fn line(&mut self, event: LineEvent<'_>) -> Result<()>;
    fn binary_matched(&mut self) -> Result<()>;
    fn group_separator(&mut self) -> Result<()>;
}

pub struct Scanner {
    buf: ScanBuffer,
    state: ScanState,
    eol: u8,
}

impl Scanner {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let eol = config.eol_byte();
        Self {
            buf: ScanBuffer::new(eol),
            state: ScanState::new(config.max_count),
            eol,
        }
    }

    /// Runs the full read/match/emit loop over `reader`, returning whether
    /// any line was selected (for exit-code purposes, spec.md §6).
    pub fn run(
        &mut self,
        reader: &mut impl Read,
        matcher: &CompiledMatcher,
        config: &Config,
        sink: &mut dyn LineSink,
    ) -> Result<bool> {
        let mut residue = 0usize;
        let mut before_context: VecDeque<(u64, u64, Vec<u8>)> = VecDeque::new();
        let mut pending_after: usize = 0;
        let mut last_emitted_line: Option<u64> = None;

        loop {
            let n = self
                .buf
                .fillbuf(residue, reader)
                .map_err(|source| crate::error::GrepError::Io {
                    path: std::path::PathBuf::from(config.label.clone()),
                    source,
                })?;

            if n == 0 && residue == 0 {
                break;
            }

            let keep_going = self.process_fill(
                n,
                0,
                matcher,
                config,
                sink,
                &mut before_context,
                &mut pending_after,
                &mut last_emitted_line,
                &mut residue,
            )?;
            if !keep_going {
                break;
            }
        }

        if self.state.is_binary && self.state.any_selected && config.binary_policy == BinaryPolicy::Binary {
            sink.binary_matched()?;
        }

        Ok(self.state.any_selected)
    }

    /// Like `run`, but reads directly from an open `File` so that a hole of
    /// NUL bytes (a sparse binary file, spec.md §8's scenario 5) can be
    /// skipped with `lseek(SEEK_DATA)` instead of streamed through in full
    /// (spec.md §4.3's "NUL handling in 'skip NULs' mode"). `skip_nuls`
    /// eligibility is the caller's responsibility to compute once per scan
    /// (see `Config::skip_nuls_eligible` usage in `driver.rs`), matching
    /// `grep.c`'s one-time `skip_empty_lines` check before the read loop.
    pub fn run_file(
        &mut self,
        file: &mut std::fs::File,
        skip_nuls: bool,
        matcher: &CompiledMatcher,
        config: &Config,
        sink: &mut dyn LineSink,
    ) -> Result<bool> {
        let mut residue = 0usize;
        let mut before_context: VecDeque<(u64, u64, Vec<u8>)> = VecDeque::new();
        let mut pending_after: usize = 0;
        let mut last_emitted_line: Option<u64> = None;
        let skip_nuls = skip_nuls && self.eol == b'\n';

        loop {
            let (n, nul_credit) = self
                .buf
                .fillbuf_seek_skip(residue, file, skip_nuls, &mut self.state.seek_data_failed)
                .map_err(|source| crate::error::GrepError::Io {
                    path: std::path::PathBuf::from(config.label.clone()),
                    source,
                })?;

            if n == 0 && residue == 0 {
                self.state.totalnl += nul_credit;
                break;
            }

            let keep_going = self.process_fill(
                n,
                nul_credit,
                matcher,
                config,
                sink,
                &mut before_context,
                &mut pending_after,
                &mut last_emitted_line,
                &mut residue,
            )?;
            if !keep_going {
                break;
            }
        }

        if self.state.is_binary && self.state.any_selected && config.binary_policy == BinaryPolicy::Binary {
            sink.binary_matched()?;
        }

        Ok(self.state.any_selected)
    }

    /// Shared per-fill body for `run`/`run_file`: binary detection, NUL
    /// zapping, `grepbuf`-style matching, and residue bookkeeping. Returns
    /// whether the outer loop should keep reading.
    #[allow(clippy::too_many_arguments)]
    fn process_fill(
        &mut self,
        n: usize,
        nul_credit: u64,
        matcher: &CompiledMatcher,
        config: &Config,
        sink: &mut dyn LineSink,
        before_context: &mut VecDeque<(u64, u64, Vec<u8>)>,
        pending_after: &mut usize,
        last_emitted_line: &mut Option<u64>,
        residue: &mut usize,
    ) -> Result<bool> {
        // Zero-width lines skipped via SEEK_DATA still count toward line
        // numbering (spec.md §4.3: "treating each zero as a zero-width
        // line, which matters for -n accuracy").
        self.state.totalnl += nul_credit;

        if !self.state.binary_decided && self.eol == b'\n' && config.binary_policy != BinaryPolicy::Text {
            self.decide_binary();
        }
        if self.state.is_binary && config.binary_policy == BinaryPolicy::WithoutMatch {
            return Ok(false);
        }

        let bufbeg = self.buf.bufbeg();
        let buflim = self.buf.buflim();

        // Last complete line in the live region; remainder is residue.
        let last_complete_end = {
            let slice = &self.buf.as_slice()[bufbeg..buflim];
            slice.iter().rposition(|&b| b == self.eol).map(|i| bufbeg + i + 1).unwrap_or(bufbeg)
        };

        self.buf.zap_nuls(bufbeg, last_complete_end);

        self.grep_range(
            bufbeg,
            last_complete_end,
            matcher,
            config,
            sink,
            before_context,
            pending_after,
            last_emitted_line,
        )?;

        // `totalcc` tracks bytes retired before `bufbeg`; credit the span
        // just processed before the next refill shifts `bufbeg` forward
        // (grep.c: `totalcc = add_count (totalcc, buflim - bufbeg - save)`).
        self.state.totalcc += (last_complete_end - bufbeg) as u64;

        if config.done_on_match() && self.state.any_selected {
            return Ok(false);
        }
        if matches!(self.state.outleft, Some(0)) {
            return Ok(false);
        }

        *residue = buflim - last_complete_end;
        if n == 0 {
            return Ok(false);
        }
        Ok(true)
    }

    fn decide_binary(&mut self) {
        self.state.binary_decided = true;
        let bufbeg = self.buf.bufbeg();
        let buflim = self.buf.buflim();
        self.state.is_binary = self.buf.as_slice()[bufbeg..buflim].contains(&0);
        if self.state.is_binary {
            self.state.binary_first_nul_line = Some(self.state.totalnl + 1);
        }
    }

    /// Applies the matcher repeatedly over `[beg, lim)`, honoring
    /// invert-match and context windows, per spec.md §4.3's `grepbuf`.
    #[allow(clippy::too_many_arguments)]
    fn grep_range(
        &mut self,
        beg: usize,
        lim: usize,
        matcher: &CompiledMatcher,
        config: &Config,
        sink: &mut dyn LineSink,
        before_context: &mut VecDeque<(u64, u64, Vec<u8>)>,
        pending_after: &mut usize,
        last_emitted_line: &mut Option<u64>,
    ) -> Result<()> {
        let full = self.buf.as_slice();
        let mut cursor = beg;

        while cursor < lim {
            let line_start = cursor;
            let line_end = full[cursor..lim]
                .iter()
                .position(|&b| b == self.eol)
                .map(|i| cursor + i + 1)
                .unwrap_or(lim);

            self.state.totalnl += 1;
            let line_number = self.state.totalnl;
            let byte_offset = self.state.totalcc + (line_start - self.buf.bufbeg()) as u64;

            let hit = matcher.execute(&full[..line_end], Some(line_start));
            let is_match_line = matches!(hit, Some(ref m) if m.start < line_end && m.start >= line_start)
                ^ config.invert;

            if is_match_line {
                if matches!(self.state.outleft, Some(0)) {
                    cursor = line_end;
                    continue;
                }

                if let Some(gap_start) = last_emitted_line {
                    if line_number > *gap_start + 1 && config.out_before + config.out_after > 0 {
                        sink.group_separator()?;
                    }
                }

                for (bn, bo, btext) in before_context.drain(..) {
                    sink.line(LineEvent { bytes: &btext, line_number: bn, byte_offset: bo, is_match: false })?;
                }

                let line_bytes = trim_eol(&full[line_start..line_end], self.eol);
                sink.line(LineEvent { bytes: line_bytes, line_number, byte_offset, is_match: true })?;
                self.state.any_selected = true;
                *last_emitted_line = Some(line_number);
                *pending_after = config.out_after;

                if let Some(left) = self.state.outleft.as_mut() {
                    *left = left.saturating_sub(1);
                }
            } else if *pending_after > 0 {
                let line_bytes = trim_eol(&full[line_start..line_end], self.eol);
                sink.line(LineEvent { bytes: line_bytes, line_number, byte_offset, is_match: false })?;
                *last_emitted_line = Some(line_number);
                *pending_after -= 1;
            } else if config.out_before > 0 {
                before_context.push_back((line_number, byte_offset, full[line_start..line_end].to_vec()));
                while before_context.len() > config.out_before {
                    before_context.pop_front();
                }
            }

            cursor = line_end;
        }

        Ok(())
    }
}

fn trim_eol(line: &[u8], eol: u8) -> &[u8] {
    if line.last() == Some(&eol) {
        &line[..line.len() - 1]
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternSet;
    use std::cell::RefCell;
    use std::io::Cursor;

    struct CollectSink {
        lines: RefCell<Vec<(u64, bool, Vec<u8>)>>,
    }

    impl LineSink for CollectSink {
        fn line(&mut self, event: LineEvent<'_>) -> Result<()> {
            self.lines.borrow_mut().push((event.line_number, event.is_match, event.bytes.to_vec()));
            Ok(())
        }
        fn binary_matched(&mut self) -> Result<()> {
            Ok(())
        }
        fn group_separator(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn matcher_for(pattern: &str, config: &Config) -> CompiledMatcher {
        let mut patterns = PatternSet::new();
        patterns.add_command_line(pattern);
        CompiledMatcher::compile(&patterns, config).unwrap()
    }

    #[test]
    fn basic_scan_selects_matching_lines() {
        let config = Config::default();
        let matcher = matcher_for("a", &config);
        let mut scanner = Scanner::new(&config);
        let mut reader = Cursor::new(b"alpha\nbeta\ngamma\n".to_vec());
        let mut sink = CollectSink { lines: RefCell::new(Vec::new()) };

        let any = scanner.run(&mut reader, &matcher, &config, &mut sink).unwrap();
        assert!(any);
        let lines = sink.lines.into_inner();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].2, b"alpha");
        assert_eq!(lines[1].2, b"gamma");
    }

    #[test]
    fn invert_match_selects_non_matching_lines() {
        let mut config = Config::default();
        config.invert = true;
        let matcher = matcher_for("a", &config);
        let mut scanner = Scanner::new(&config);
        let mut reader = Cursor::new(b"alpha\nbeta\ngamma\n".to_vec());
        let mut sink = CollectSink { lines: RefCell::new(Vec::new()) };

        scanner.run(&mut reader, &matcher, &config, &mut sink).unwrap();
        let lines = sink.lines.into_inner();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].2, b"beta");
    }
}
