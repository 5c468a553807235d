//! Line printer: spec.md §4.2. Formats one selected/context line with
//! optional prefix fields and color markup, writing either to the real
//! output sink or (in parallel mode) into a per-entry output bucket.

use std::io::Write;

use crate::colorcap::ColorSpec;
use crate::config::Config;
use crate::error::{GrepError, Result};
use crate::matcher::CompiledMatcher;
use crate::scanner::{LineEvent, LineSink};

/// A line printer writing to some `Write` destination: either stdout
/// directly (serial mode) or an `OutputBucket`'s in-memory buffer
/// (parallel mode).
pub struct LinePrinter<'a, W: Write> {
    out: &'a mut W,
    file_label: Option<&'a str>,
    config: &'a Config,
    colors: Option<&'a ColorSpec>,
    only_matching_matcher: Option<&'a CompiledMatcher>,
}

impl<'a, W: Write> LinePrinter<'a, W> {
    pub fn new(
        out: &'a mut W,
        file_label: Option<&'a str>,
        config: &'a Config,
        colors: Option<&'a ColorSpec>,
        only_matching_matcher: Option<&'a CompiledMatcher>,
    ) -> Self {
        Self { out, file_label, config, colors, only_matching_matcher }
    }

    fn write_prefix(&mut self, line_number: u64, byte_offset: u64, sep: u8, is_match: bool) -> Result<()> {
        let field_sep = if self.config.null_sep { 0u8 } else { sep };

        if let Some(name) = self.file_label {
            if !self.config.no_filename {
                if let Some(colors) = self.colors {
                    write!(self.out, "{}", colors.wrap("fn", name))
                } else {
                    write!(self.out, "{name}")
                }
                .map_err(GrepError::Output)?;
                self.out.write_all(&[field_sep]).map_err(GrepError::Output)?;
            }
        }

        if self.config.line_number {
            let field = if let Some(colors) = self.colors {
                colors.wrap(if is_match { "ln" } else { "ln" }, &line_number.to_string())
            } else {
                line_number.to_string()
            };
            write!(self.out, "{field}").map_err(GrepError::Output)?;
            self.out.write_all(&[sep]).map_err(GrepError::Output)?;
        }

        if self.config.byte_offset {
            write!(self.out, "{byte_offset}").map_err(GrepError::Output)?;
            self.out.write_all(&[sep]).map_err(GrepError::Output)?;
        }

        Ok(())
    }

    /// Re-runs the matcher over `line` in only-matching mode, emitting one
    /// fragment per non-overlapping hit with color markup (spec.md §4.2
    /// step 3).
    fn write_only_matching(&mut self, line: &[u8]) -> Result<()> {
        let Some(matcher) = self.only_matching_matcher else {
            self.out.write_all(line).map_err(GrepError::Output)?;
            self.out.write_all(b"\n").map_err(GrepError::Output)?;
            return Ok(());
        };

        let mut pos = 0;
        let mut any = false;
        while pos <= line.len() {
            let Some(m) = matcher.execute(line, Some(pos)) else { break };
            if m.start >= line.len() {
                break;
            }
            any = true;
            let fragment = &line[m.start..m.end.min(line.len())];
            if let Some(colors) = self.colors {
                write!(self.out, "{}", colors.wrap("mt", &String::from_utf8_lossy(fragment)))
                    .map_err(GrepError::Output)?;
            } else {
                self.out.write_all(fragment).map_err(GrepError::Output)?;
            }
            self.out.write_all(b"\n").map_err(GrepError::Output)?;
            pos = if m.end > m.start { m.end } else { m.end + 1 };
        }
        if !any {
            // Defensive: the caller only invokes this for lines already
            // known to match; an empty result means a zero-width match at
            // line end, which spec.md §4.2 says to suppress.
        }
        Ok(())
    }

    fn write_body_with_highlight(&mut self, line: &[u8], is_match: bool) -> Result<()> {
        let Some(colors) = self.colors else {
            self.out.write_all(line).map_err(GrepError::Output)?;
            self.out.write_all(b"\n").map_err(GrepError::Output)?;
            return Ok(());
        };
        let Some(matcher) = self.only_matching_matcher else {
            self.out.write_all(line).map_err(GrepError::Output)?;
            self.out.write_all(b"\n").map_err(GrepError::Output)?;
            return Ok(());
        };
        if !is_match {
            self.out.write_all(line).map_err(GrepError::Output)?;
            self.out.write_all(b"\n").map_err(GrepError::Output)?;
            return Ok(());
        }

        let mut pos = 0;
        while pos < line.len() {
            match matcher.execute(line, Some(pos)) {
                Some(m) if m.start < line.len() => {
                    self.out.write_all(&line[pos..m.start]).map_err(GrepError::Output)?;
                    let end = m.end.min(line.len());
                    let field = if is_match { "ms" } else { "mc" };
                    write!(self.out, "{}", colors.wrap(field, &String::from_utf8_lossy(&line[m.start..end])))
                        .map_err(GrepError::Output)?;
                    pos = if end > m.start { end } else { end + 1 };
                }
                _ => break,
            }
        }
        self.out.write_all(&line[pos..]).map_err(GrepError::Output)?;
        self.out.write_all(b"\n").map_err(GrepError::Output)?;
        Ok(())
    }
}

impl<'a, W: Write> LineSink for LinePrinter<'a, W> {
    fn line(&mut self, event: LineEvent<'_>) -> Result<()> {
        let sep = if event.is_match { b':' } else { b'-' };
        self.write_prefix(event.line_number, event.byte_offset, sep, event.is_match)?;

        if self.config.only_matching && event.is_match {
            self.write_only_matching(event.bytes)?;
        } else {
            self.write_body_with_highlight(event.bytes, event.is_match)?;
        }
        Ok(())
    }

    fn binary_matched(&mut self) -> Result<()> {
        let name = self.file_label.unwrap_or("(standard input)");
        writeln!(self.out, "Binary file {name} matches").map_err(GrepError::Output)
    }

    fn group_separator(&mut self) -> Result<()> {
        writeln!(self.out, "{}", self.config.group_separator).map_err(GrepError::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternSet;

    fn matcher_for(pattern: &str, config: &Config) -> CompiledMatcher {
        let mut patterns = PatternSet::new();
        patterns.add_command_line(pattern);
        CompiledMatcher::compile(&patterns, config).unwrap()
    }

    #[test]
    fn plain_line_emission_has_no_prefix_by_default() {
        let config = Config::default();
        let mut out = Vec::new();
        let mut printer = LinePrinter::new(&mut out, None, &config, None, None);
        printer
            .line(LineEvent { bytes: b"alpha", line_number: 1, byte_offset: 0, is_match: true })
            .unwrap();
        assert_eq!(out, b"alpha\n");
    }

    #[test]
    fn line_number_prefix_is_emitted_when_requested() {
        let mut config = Config::default();
        config.line_number = true;
        let mut out = Vec::new();
        let mut printer = LinePrinter::new(&mut out, None, &config, None, None);
        printer
            .line(LineEvent { bytes: b"alpha", line_number: 3, byte_offset: 0, is_match: true })
            .unwrap();
        assert_eq!(out, b"3:alpha\n");
    }

    #[test]
    fn only_matching_emits_one_line_per_hit() {
        let mut config = Config::default();
        config.only_matching = true;
        let matcher = matcher_for("a.", &config);
        let mut out = Vec::new();
        let mut printer = LinePrinter::new(&mut out, None, &config, None, Some(&matcher));
        printer
            .line(LineEvent { bytes: b"aXaYaZ", line_number: 1, byte_offset: 0, is_match: true })
            .unwrap();
        assert_eq!(out, b"aX\naY\naZ\n");
    }
}
