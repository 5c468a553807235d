//! Translates the four classic grep pattern dialects (basic, extended, awk,
//! fixed) into the Perl-flavored syntax `regex`/`fancy-regex` understand.
//! `perl` passes through untouched. Grounded on `dfasearch.c`'s
//! `line_beg_bk`/`word_beg_no_bk`-style wrapper construction, generalized
//! here into a translation pass instead of string-templated wrapping.

use std::fmt;

/// Which pattern syntax a sub-pattern is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// POSIX basic regular expressions: `\(`/`\)`/`\{`/`\}` are grouping,
    /// bare `(`/`)` are literal.
    Basic,
    /// POSIX extended regular expressions: Perl-like metacharacter set
    /// already, `+`/`?`/`|`/`(`/`)` are all special without a backslash.
    Extended,
    /// awk's dialect: extended regex plus C-style escape sequences
    /// (`\t`, `\n`, ...) in the pattern text itself.
    Awk,
    /// Fixed strings: every character is literal; never regex-compiled.
    Fixed,
    /// Perl-compatible syntax, passed straight to `regex`/`fancy-regex`.
    Perl,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Basic => "basic",
            Self::Extended => "extended",
            Self::Awk => "awk",
            Self::Fixed => "fixed",
            Self::Perl => "perl",
        };
        write!(f, "{s}")
    }
}

/// Translates one sub-pattern written in `dialect` into `regex`-compatible
/// syntax. Returns `None` for `Fixed`, since fixed-string patterns never
/// pass through a regex compiler (spec.md §4.1: "`fixed` bypasses regex
/// compilation entirely and seeds only the keyword set").
#[must_use]
pub fn translate(pattern: &str, dialect: Dialect) -> Option<String> {
    match dialect {
        Dialect::Fixed => None,
        Dialect::Perl | Dialect::Extended => Some(pattern.to_string()),
        Dialect::Awk => Some(translate_awk(pattern)),
        Dialect::Basic => Some(translate_basic(pattern)),
    }
}

/// BRE -> ERE-ish syntax: unescaped `(`, `)`, `{`, `}`, `|`, `+`, `?` are
/// literal in BRE; their escaped forms are the special grouping/repetition
/// operators. We invert that: strip the backslash off the escaped forms
/// (making them special to the downstream Perl-syntax engine) and escape
/// the bare forms (making them literal).
fn translate_basic(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            match next {
                '(' | ')' | '{' | '}' | '|' | '+' | '?' => {
                    out.push(next);
                    i += 2;
                    continue;
                }
                _ => {
                    out.push(c);
                    out.push(next);
                    i += 2;
                    continue;
                }
            }
        }
        if matches!(c, '(' | ')' | '{' | '}' | '|' | '+' | '?') {
            out.push('\\');
            out.push(c);
            i += 1;
            continue;
        }
        // BRE's `^` and `$` are only anchors at the start/end of the
        // (sub)expression; elsewhere they are literal. The common case
        // (anchors at the true start/end of the pattern) is handled by
        // passing them through; mid-pattern occurrences are rare enough
        // in practice that we accept ERE's always-special semantics here.
        out.push(c);
        i += 1;
    }
    out
}

/// awk adds C-style backslash escapes (`\t`, `\n`, `\r`, `\a`, `\b`, `\f`,
/// `\v`) on top of extended regex syntax; expand them to their literal
/// byte before handing the pattern to the regex compiler.
fn translate_awk(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            let expanded = match next {
                't' => Some('\t'),
                'n' => Some('\n'),
                'r' => Some('\r'),
                'a' => Some('\u{07}'),
                'b' => Some('\u{08}'),
                'f' => Some('\u{0C}'),
                'v' => Some('\u{0B}'),
                _ => None,
            };
            if let Some(lit) = expanded {
                out.push(lit);
                i += 2;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Escapes every regex metacharacter in `text`, producing a pattern that
/// matches `text` literally under any of the non-fixed dialects. Used for
/// the keyword-set literal path and for spec.md §8's `-F` round-trip
/// property.
#[must_use]
pub fn escape_literal(text: &str) -> String {
    regex_syntax::escape(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_dialect_inverts_grouping_escapes() {
        assert_eq!(translate_basic(r"a\(b\)c"), "a(b)c");
        assert_eq!(translate_basic("a(b)c"), r"a\(b\)c");
        assert_eq!(translate_basic(r"a\+b"), "a+b");
        assert_eq!(translate_basic("a+b"), r"a\+b");
    }

    #[test]
    fn awk_dialect_expands_c_escapes() {
        assert_eq!(translate_awk(r"a\tb"), "a\tb");
        assert_eq!(translate_awk(r"a\nb"), "a\nb");
    }

    #[test]
    fn fixed_dialect_never_translates() {
        assert_eq!(translate("a.b", Dialect::Fixed), None);
    }

    #[test]
    fn escape_literal_neutralizes_metacharacters() {
        let escaped = escape_literal("a.b*c");
        assert!(regex::Regex::new(&escaped).unwrap().is_match("a.b*c"));
        assert!(!regex::Regex::new(&escaped).unwrap().is_match("aXbYYc"));
    }
}
