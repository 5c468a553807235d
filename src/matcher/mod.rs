//! The layered matching pipeline: keyword set -> superset DFA -> DFA ->
//! regex engines, generalizing `dfasearch.c`'s `GEAcompile`/`EGexecute`
//! cascade (spec.md §4.1) into one `CompiledMatcher` value that is
//! immutable after compile and cheaply cloned per worker (spec.md §9's
//! "re-architect these into ... a compiled-matcher value, immutable after
//! compile, cloned per worker").

pub mod engine;
pub mod keyword;
pub mod must;

use regex_syntax::Parser;

use crate::config::Config;
use crate::dialect::{self, Dialect};
use crate::error::{GrepError, Result};
use crate::locale::Locale;
use crate::pattern::PatternSet;
use engine::Engine;
use keyword::KeywordSet;
use must::extract as extract_must;

/// One compiled sub-pattern: the unwrapped original text plus the engine
/// that executes it, used for back-reference disambiguation and `-w`/`-x`
/// confirmation (spec.md §4.1 step 5).
struct SubPattern {
    engine: Engine,
}

/// A successful match: byte offset and length within the searched buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The compiled matcher: keyword set, optional superset prefilter,
/// authoritative DFA, and a regex engine per sub-pattern. Matches spec.md
/// §3's "Compiled matcher" data model.
pub struct CompiledMatcher {
    word_match: bool,
    line_match: bool,
    eol: u8,
    locale: Locale,
    /// The authoritative automaton: always exists unless the pattern set
    /// is entirely `Fixed` (in which case the keyword set alone decides).
    dfa: Option<regex::bytes::Regex>,
    /// A relaxed over-approximation, present only for back-reference
    /// patterns, built by replacing `\N` with `.*?` (spec.md §4.1's
    /// "Superset stage").
    superset: Option<regex::bytes::Regex>,
    keyword: Option<KeywordSet>,
    sub_patterns: Vec<SubPattern>,
    has_any_backref: bool,
}

impl CompiledMatcher {
    /// Compiles `patterns` under `config`'s dialect/case-fold/word/line
    /// settings. Spec.md §4.1's compile contract.
    pub fn compile(patterns: &PatternSet, config: &Config) -> Result<Self> {
        let locale = Locale::from_env();
        let eol = config.eol_byte();

        let mut sub_patterns = Vec::with_capacity(patterns.patterns().len());
        let mut musts = Vec::new();
        let mut has_any_backref = false;

        for (idx, spec) in patterns.patterns().iter().enumerate() {
            if matches!(config.dialect, Dialect::Fixed) {
                let literal = spec.text.as_bytes().to_vec();
                musts.push((idx, must::MustString { literal, exact: true }));
                continue;
            }

            let translated = dialect::translate(&spec.text, config.dialect)
                .unwrap_or_else(|| spec.text.clone());
            let has_backref = has_backreference(&translated);
            has_any_backref |= has_backref;

            let engine = engine::compile_with_origin(&translated, config.case_fold, has_backref, |msg| {
                patterns.compile_error(idx, msg)
            })?;
            sub_patterns.push(SubPattern { engine });

            if let Ok(hir) = Parser::new().parse(&neutralize_backrefs(&translated)) {
                if let Some(m) = extract_must(&hir) {
                    musts.push((idx, m));
                }
            }
        }

        // A keyword hit is used as a *mandatory* prefilter (a miss
        // short-circuits `execute` straight to NOMATCH), so it is only
        // sound when every sub-pattern contributed a must-string — one
        // alternative with no extractable literal (an alternation, an
        // unanchored `.*`, ...) means some matching lines carry no keyword
        // at all, and a keyword-only filter would wrongly reject them.
        // GNU grep's kwset is gated the same way: mandatory only when every
        // alternative supplies a must.
        let keyword = if matches!(config.dialect, Dialect::Fixed) {
            KeywordSet::build(&musts, config.case_fold)
        } else if musts.len() == patterns.patterns().len() {
            KeywordSet::build(&musts, false)
        } else {
            None
        };

        // The `regex` crate cannot parse a back-reference at all (spec.md
        // §9's "Static regex-registers pitfall" becomes, in this port, a
        // parser-capability pitfall instead). When any sub-pattern has one,
        // the "DFA" stage is compiled from the backref-neutralized text and
        // doubles as the superset prefilter; `fancy-regex`'s per-sub-pattern
        // engines become the sole authority, per spec.md §4.1 step 4's "DFA
        // stage... detect whether any back-references are present".
        let (dfa, superset) = if matches!(config.dialect, Dialect::Fixed) {
            (None, None)
        } else {
            // Sub-patterns are newline-separated in the source pattern set
            // but that newline means *alternation*, not a literal byte to
            // match contiguously (GNU grep's DFA compiler treats them the
            // same way) — `execute` only ever hands the engine one line at
            // a time, so a literal `\n` joiner could never match at all.
            let translated_subs: Vec<String> = patterns
                .patterns()
                .iter()
                .map(|p| dialect::translate(&p.text, config.dialect).unwrap_or_else(|| p.text.clone()))
                .collect();
            let joined = join_alternation(&translated_subs);

            if has_any_backref {
                let neutralized = neutralize_backrefs(&joined);
                let wrapped = wrap_anchors(&neutralized, config.word_match, config.line_match);
                let superset = regex::bytes::RegexBuilder::new(&wrapped)
                    .case_insensitive(config.case_fold)
                    .multi_line(true)
                    .build()
                    .map_err(|e| GrepError::Compile(patterns.compile_error(0, e.to_string())))?;
                (None, Some(superset))
            } else {
                let wrapped = wrap_anchors(&joined, config.word_match, config.line_match);
                let dfa = regex::bytes::RegexBuilder::new(&wrapped)
                    .case_insensitive(config.case_fold)
                    .multi_line(true)
                    .build()
                    .map_err(|e| GrepError::Compile(patterns.compile_error(0, e.to_string())))?;
                (Some(dfa), None)
            }
        };

        Ok(Self {
            word_match: config.word_match,
            line_match: config.line_match,
            eol,
            locale,
            dfa,
            superset,
            keyword,
            sub_patterns,
            has_any_backref,
        })
    }

    #[must_use]
    pub fn kwset_exact_count(&self) -> usize {
        self.keyword.as_ref().map(KeywordSet::exact_count).unwrap_or(0)
    }

    /// Whether this matcher selects a zero-length line, i.e. a buffer
    /// holding nothing but the EOL byte. Used to decide `skip_nuls`
    /// eligibility in the stream scanner: `grep.c` runs this same one-shot
    /// probe (`execute(eolbytes + 1, 1, ...)`) once per invocation before
    /// deciding whether a NUL run can be bulk-skipped via `SEEK_DATA`.
    #[must_use]
    pub fn matches_empty_line(&self) -> bool {
        let buf = [self.eol];
        self.execute(&buf, None).is_some()
    }

    /// Executes the cascade against `buf`, starting the search at
    /// `start_hint` (or the start of the buffer if absent). Per spec.md
    /// §4.1: with no hint, returns the span of the *whole matching line*
    /// (the shape `grepbuf`'s scan loop wants); with a hint, returns the
    /// leftmost-then-longest *match fragment* at or after `start_hint`
    /// (the shape `--only-matching`/highlighting want).
    #[must_use]
    pub fn execute(&self, buf: &[u8], start_hint: Option<usize>) -> Option<MatchSpan> {
        let want_fragment = start_hint.is_some();
        let mut pos = start_hint.unwrap_or(0);

        loop {
            if pos > buf.len() {
                return None;
            }

            // 1. Keyword stage.
            let (line_start, line_end, hit_start, hit_end, exact_hit) = if let Some(kw) = &self.keyword {
                let hit = kw.search(buf, pos)?;
                let (ls, le) = self.line_bounds(buf, hit.start);
                (ls, le, hit.start, hit.end, hit.exact)
            } else {
                let (ls, le) = self.line_bounds(buf, pos);
                (ls, le, ls, le, false)
            };

            // The line may start before `pos` (the keyword hit narrows to
            // the containing line, not to `pos` itself); callers in
            // start_hint mode expect no fragment reported before `pos`.
            let scan_from = pos.max(line_start);

            // 2. Exact keyword shortcut: a hit here is a definitive match
            // of the whole line, with no DFA/regex follow-up needed. Not
            // valid when word/line-match or back-references require the
            // regex stage's own boundary confirmation (spec.md §4.1: "The
            // regex engine is authoritative for back-references, -w
            // word-boundary checks, and -x whole-line matches") — except
            // for `Fixed`-dialect patterns, which have no regex engine at
            // all and so check word/line boundaries against the keyword
            // hit directly here.
            let fixed_mode = self.sub_patterns.is_empty() && !self.has_any_backref;
            let boundary_checks_pass = if fixed_mode {
                (!self.line_match || (hit_start == line_start && hit_end == line_end))
                    && (!self.word_match || self.is_word_aligned(buf, hit_start, hit_end))
            } else {
                !self.word_match && !self.line_match
            };
            let exact_shortcut_eligible =
                exact_hit && hit_start >= scan_from && !self.has_any_backref && boundary_checks_pass;
            if exact_shortcut_eligible {
                if !self.locale.is_char_boundary(buf, hit_start) {
                    pos = self.locale.next_char_boundary(buf, hit_start);
                    continue;
                }
                return Some(if want_fragment {
                    MatchSpan { start: hit_start, end: hit_end }
                } else {
                    MatchSpan { start: line_start, end: line_end }
                });
            }
            if fixed_mode && exact_hit && !boundary_checks_pass {
                pos = hit_start + 1;
                if pos >= buf.len() {
                    return None;
                }
                continue;
            }

            // 3. Superset stage (backref patterns only).
            if let Some(superset) = &self.superset {
                if superset.find_at(buf, line_start).is_none() {
                    pos = line_end;
                    if pos >= buf.len() {
                        return None;
                    }
                    continue;
                }
            }

            // 4. DFA stage.
            let dfa_hit = match &self.dfa {
                Some(dfa) => dfa.find_at(&buf[..line_end], scan_from),
                None => None,
            };

            let needs_regex_confirm = self.has_any_backref || self.word_match || self.line_match;

            if dfa_hit.is_none() && self.dfa.is_some() && !needs_regex_confirm {
                pos = line_end;
                if pos >= buf.len() {
                    return None;
                }
                continue;
            }

            // 5. Regex stage: authoritative for back-references, -w, -x.
            if needs_regex_confirm || self.dfa.is_none() {
                if let Some(fragment) = self.regex_confirm(buf, line_start, line_end, scan_from) {
                    return Some(if want_fragment {
                        fragment
                    } else {
                        MatchSpan { start: line_start, end: line_end }
                    });
                }
                pos = line_end;
                if pos >= buf.len() {
                    return None;
                }
                continue;
            }

            let fragment_start = dfa_hit.map(|m| m.start()).unwrap_or(scan_from);
            let fragment_end = dfa_hit.map(|m| m.end()).unwrap_or(line_end);
            return Some(if want_fragment {
                MatchSpan { start: fragment_start, end: fragment_end }
            } else {
                MatchSpan { start: line_start, end: line_end }
            });
        }
    }

    fn line_bounds(&self, buf: &[u8], pos: usize) -> (usize, usize) {
        let start = buf[..pos].iter().rposition(|&b| b == self.eol).map(|i| i + 1).unwrap_or(0);
        let end = buf[pos..].iter().position(|&b| b == self.eol).map(|i| pos + i + 1).unwrap_or(buf.len());
        (start, end)
    }

    /// Runs every sub-pattern's regex engine over `[line_start, line_end)`,
    /// tracking the leftmost-then-longest match across all of them (spec.md
    /// §4.1 step 5's `best_match`/`best_len`), and applying the `-w` word
    /// boundary retry and `-x` whole-line check.
    fn regex_confirm(&self, buf: &[u8], line_start: usize, line_end: usize, scan_from: usize) -> Option<MatchSpan> {
        let line_end_trimmed = if line_end > line_start && buf[line_end - 1] == self.eol {
            line_end - 1
        } else {
            line_end
        };

        let mut best: Option<MatchSpan> = None;

        for sub in &self.sub_patterns {
            let mut search_pos = scan_from;
            while search_pos <= line_end_trimmed {
                let Some(m) = sub.engine.find_at(&buf[..line_end_trimmed], search_pos) else {
                    break;
                };
                if m.start >= line_end_trimmed {
                    break;
                }

                if self.line_match && (m.start != line_start || m.end != line_end_trimmed) {
                    search_pos = m.start + 1;
                    continue;
                }

                if self.word_match && !self.is_word_aligned(buf, m.start, m.end) {
                    search_pos = m.start + 1;
                    continue;
                }

                let better = match &best {
                    None => true,
                    Some(b) => m.start < b.start || (m.start == b.start && m.end > b.end),
                };
                if better {
                    best = Some(MatchSpan { start: m.start, end: m.end });
                }
                break;
            }
        }

        best
    }

    fn is_word_aligned(&self, buf: &[u8], start: usize, end: usize) -> bool {
        let before_ok = start == 0 || !is_word_byte(buf[start - 1]);
        let after_ok = end >= buf.len() || !is_word_byte(buf[end]);
        before_ok && after_ok
    }
}

fn is_word_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric() || b >= 0x80
}

/// `\N` for N in 1..=9 signals a back-reference in both BRE and ERE syntax.
fn has_backreference(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'\\' && bytes[i + 1].is_ascii_digit() && bytes[i + 1] != b'0' {
            return true;
        }
        i += 1;
    }
    false
}

/// Replaces every `\N` back-reference with `.*?`, producing a pattern whose
/// language is a superset of the original (spec.md GLOSSARY's "Superset
/// DFA"), suitable for a cheap over-approximating prefilter.
fn neutralize_backrefs(pattern: &str) -> String {
    let bytes = pattern.as_bytes();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() && bytes[i + 1] != b'0' {
            out.push_str(".*?");
            i += 2;
            continue;
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

/// Joins translated sub-patterns as alternation: each is wrapped in a
/// non-capturing group and `|`-joined, so `a.` and `b.` supplied as two
/// `-e` patterns (or two lines of a `-f` file) compile to `(?:a.)|(?:b.)`
/// rather than a single pattern requiring `a.` then a literal newline then
/// `b.` to appear contiguously on one line.
fn join_alternation(subs: &[String]) -> String {
    subs.iter().map(|s| format!("(?:{s})")).collect::<Vec<_>>().join("|")
}

/// Wraps the joined pattern in the line/word anchor template described in
/// spec.md §4.1: `^(...)$` for `-x`, `(^|non-word)(...)(non-word|$)` for
/// `-w`. Only the DFA receives this wrapper; per-sub-pattern regex engines
/// get the unwrapped originals and perform their own checks at execute time
/// (`is_word_aligned` above).
fn wrap_anchors(joined: &str, word_match: bool, line_match: bool) -> String {
    if line_match {
        format!("(?m)^(?:{joined})$")
    } else if word_match {
        format!(r"(?m)(?:^|\W)(?:{joined})(?:\W|$)")
    } else {
        format!("(?m){joined}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pattern::PatternSet;

    fn matcher_for(pattern: &str, config: &Config) -> CompiledMatcher {
        let mut patterns = PatternSet::new();
        patterns.add_command_line(pattern);
        CompiledMatcher::compile(&patterns, config).unwrap()
    }

    fn matcher_for_multi(subs: &[&str], config: &Config) -> CompiledMatcher {
        let mut patterns = PatternSet::new();
        for sub in subs {
            patterns.add_command_line(sub);
        }
        CompiledMatcher::compile(&patterns, config).unwrap()
    }

    #[test]
    fn plain_literal_matches_line() {
        let cfg = Config::default();
        let matcher = matcher_for("a", &cfg);
        let buf = b"alpha\nbeta\ngamma\n";
        let m = matcher.execute(buf, None).unwrap();
        assert_eq!(&buf[m.start..m.end], b"alpha\n");
    }

    #[test]
    fn word_match_rejects_substring_hit() {
        let mut cfg = Config::default();
        cfg.word_match = true;
        let matcher = matcher_for("foo", &cfg);
        let buf = b"foobar\n";
        assert!(matcher.execute(buf, None).is_none());

        let buf2 = b"a foo b\n";
        let m = matcher.execute(buf2, None).unwrap();
        assert_eq!(&buf2[m.start..m.end], b"a foo b\n");
    }

    #[test]
    fn fixed_dialect_honors_word_match_without_a_regex_engine() {
        let mut cfg = Config::default();
        cfg.dialect = Dialect::Fixed;
        cfg.word_match = true;
        let matcher = matcher_for("foo", &cfg);
        assert!(matcher.execute(b"foobar\n", None).is_none());
        let m = matcher.execute(b"a foo b\n", None).unwrap();
        assert_eq!(&b"a foo b\n"[m.start..m.end], b"a foo b\n");
    }

    #[test]
    fn backreference_pattern_compiles_and_matches() {
        let cfg = Config::default();
        let matcher = matcher_for(r"\(a*\)b\1", &cfg); // BRE-style: (a*)b\1
        assert!(matcher.has_any_backref);
        let buf = b"aabaa\n";
        assert!(matcher.execute(buf, None).is_some());
    }

    #[test]
    fn multiple_e_patterns_match_as_alternation_not_concatenation() {
        // Two `-e` sub-patterns (neither a pure literal) must be joined as
        // `(?:a.)|(?:b.)`, not `a.\nb.` (which could never match a single
        // line).
        let cfg = Config::default();
        let matcher = matcher_for_multi(&["a.", "b."], &cfg);
        let buf = b"xay\nnope\nxbz\n";
        let m = matcher.execute(buf, None).unwrap();
        assert_eq!(&buf[m.start..m.end], b"xay\n");
        let m2 = matcher.execute(buf, Some(m.end)).unwrap();
        assert_eq!(&buf[m2.start..m2.end], b"xbz\n");
    }

    #[test]
    fn keyword_prefilter_is_skipped_when_one_alternative_has_no_must_string() {
        // `foo.*z` contributes a must-string but `q|w` does not; the
        // keyword set must not be used as a mandatory filter in that case,
        // or lines matching only the must-less alternative get dropped.
        let cfg = Config::default();
        let matcher = matcher_for_multi(&["foo.*z", "q|w"], &cfg);
        assert!(matcher.keyword.is_none());
        let buf = b"nothing here\nq\n";
        let m = matcher.execute(buf, None).unwrap();
        assert_eq!(&buf[m.start..m.end], b"q\n");
    }
}
