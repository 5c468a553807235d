//! One regex engine per sub-pattern (spec.md §3: "A vector of *regex
//! engines*, one per line-separated sub-pattern"). Plain patterns compile
//! against `regex::bytes::Regex` (byte-oriented, so binary input never has
//! to round-trip through UTF-8 validation); patterns containing a
//! back-reference compile against `fancy_regex::Regex` instead, since the
//! `regex` crate's automaton cannot execute one. This mirrors
//! `dfasearch.c` keeping one GNU regex engine per sub-pattern behind a
//! uniform `patterns[i]` slot, generalized here to two concrete engines
//! behind one Rust enum.

use crate::error::{CompileError, GrepError, Result};

/// A single (offset, length) match within a searched byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineMatch {
    pub start: usize,
    pub end: usize,
}

pub enum Engine {
    Std(regex::bytes::Regex),
    /// `fancy-regex` only operates on `&str`; callers supply a lossily
    /// decoded copy of the searched range when invoking this variant. This
    /// is a recorded simplification: a back-reference pattern against a
    /// line with invalid UTF-8 may fail to match where GNU grep's
    /// byte-oriented GNU regex would have succeeded.
    Fancy(fancy_regex::Regex),
}

impl Engine {
    pub fn compile(pattern: &str, case_fold: bool, has_backref: bool) -> std::result::Result<Self, String> {
        if has_backref {
            let built = if case_fold {
                format!("(?i){pattern}")
            } else {
                pattern.to_string()
            };
            fancy_regex::Regex::new(&built)
                .map(Engine::Fancy)
                .map_err(|e| e.to_string())
        } else {
            regex::bytes::RegexBuilder::new(pattern)
                .case_insensitive(case_fold)
                .build()
                .map(Engine::Std)
                .map_err(|e| e.to_string())
        }
    }

    /// Finds the leftmost match at or after `pos` within `haystack`.
    #[must_use]
    pub fn find_at(&self, haystack: &[u8], pos: usize) -> Option<EngineMatch> {
        match self {
            Engine::Std(re) => re
                .find_at(haystack, pos)
                .map(|m| EngineMatch { start: m.start(), end: m.end() }),
            Engine::Fancy(re) => {
                let text = String::from_utf8_lossy(haystack);
                re.find_at(&text, pos).ok().flatten().map(|m| EngineMatch { start: m.start(), end: m.end() })
            }
        }
    }

    #[must_use]
    pub fn is_match(&self, haystack: &[u8]) -> bool {
        match self {
            Engine::Std(re) => re.is_match(haystack),
            Engine::Fancy(re) => {
                let text = String::from_utf8_lossy(haystack);
                re.is_match(&text).unwrap_or(false)
            }
        }
    }
}

/// Compiles one engine, translating a raw compile error into a
/// `GrepError::Compile` tagged with the sub-pattern's provenance.
pub fn compile_with_origin(
    pattern: &str,
    case_fold: bool,
    has_backref: bool,
    to_compile_error: impl FnOnce(String) -> CompileError,
) -> Result<Engine> {
    Engine::compile(pattern, case_fold, has_backref)
        .map_err(|msg| GrepError::Compile(to_compile_error(msg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pattern_uses_std_engine() {
        let engine = Engine::compile("a.c", false, false).unwrap();
        assert!(matches!(engine, Engine::Std(_)));
        assert!(engine.is_match(b"abc"));
    }

    #[test]
    fn backref_pattern_uses_fancy_engine() {
        let engine = Engine::compile(r"(\w+) \1", false, true).unwrap();
        assert!(matches!(engine, Engine::Fancy(_)));
        assert!(engine.is_match(b"hello hello"));
        assert!(!engine.is_match(b"hello world"));
    }

    #[test]
    fn find_at_respects_start_position() {
        let engine = Engine::compile("a", false, false).unwrap();
        let m = engine.find_at(b"banana", 2).unwrap();
        assert_eq!(m.start, 3);
    }
}
