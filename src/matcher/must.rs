//! Must-string extraction: finds a literal substring that every match of a
//! compiled pattern is guaranteed to contain, used to seed the keyword set
//! (spec.md §4.1, "After DFA compilation the compiler asks the DFA for a
//! must-string"). `regex_syntax::hir::literal::Extractor` exists for this,
//! but its exactness semantics are subtle enough that we hand-roll a
//! conservative structural walk over the `Hir` instead, the way
//! `dfasearch.c`'s `kwsmusts` builds its must list from the DFA's own
//! internal literal analysis rather than from a black-box library call.

use regex_syntax::hir::{Hir, HirKind, Literal};

/// The result of must-string analysis for one sub-pattern.
#[derive(Debug, Clone)]
pub struct MustString {
    pub literal: Vec<u8>,
    /// True when `literal` is not just a required substring but the entire
    /// language of the pattern (spec.md: "marks it exact when the DFA
    /// reports that the whole language collapses to that literal").
    pub exact: bool,
}

/// Extracts the must-string for `hir`, if one can be determined.
#[must_use]
pub fn extract(hir: &Hir) -> Option<MustString> {
    if let Some(lit) = whole_literal(hir) {
        return Some(MustString { literal: lit, exact: true });
    }
    required_substring(hir).map(|lit| MustString { literal: lit, exact: false })
}

/// Returns `Some(bytes)` if `hir` matches exactly one literal string and
/// nothing else (no alternation, no repetition, no anchors beyond the
/// literal itself).
fn whole_literal(hir: &Hir) -> Option<Vec<u8>> {
    match hir.kind() {
        HirKind::Literal(Literal(bytes)) => Some(bytes.to_vec()),
        HirKind::Concat(parts) => {
            let mut out = Vec::new();
            for part in parts {
                out.extend(whole_literal(part)?);
            }
            Some(out)
        }
        _ => None,
    }
}

/// Finds the longest literal run that must appear in every match: the
/// longest `Literal` node reachable by walking into `Concat` children
/// (any branch of a `Concat` is mandatory) but not into `Alternation` or
/// `Repetition` children (those may be skipped or vary).
fn required_substring(hir: &Hir) -> Option<Vec<u8>> {
    let mut best: Option<Vec<u8>> = None;
    collect_required_literals(hir, &mut best);
    best.filter(|lit| !lit.is_empty())
}

fn collect_required_literals(hir: &Hir, best: &mut Option<Vec<u8>>) {
    match hir.kind() {
        HirKind::Literal(Literal(bytes)) => {
            if best.as_ref().map(|b| bytes.len() > b.len()).unwrap_or(true) {
                *best = Some(bytes.to_vec());
            }
        }
        HirKind::Concat(parts) => {
            for part in parts {
                collect_required_literals(part, best);
            }
        }
        HirKind::Capture(cap) => collect_required_literals(&cap.sub, best),
        // Alternation branches and repetitions (including `?`/`*`) are not
        // individually mandatory, so we don't recurse into them; a literal
        // appearing only inside one of these is not a valid must-string.
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex_syntax::Parser;

    fn parse(pattern: &str) -> Hir {
        Parser::new().parse(pattern).unwrap()
    }

    #[test]
    fn whole_literal_pattern_is_exact() {
        let hir = parse("hello");
        let must = extract(&hir).unwrap();
        assert!(must.exact);
        assert_eq!(must.literal, b"hello");
    }

    #[test]
    fn concatenated_literal_with_wildcard_is_not_exact() {
        let hir = parse("foo.*bar");
        let must = extract(&hir).unwrap();
        assert!(!must.exact);
        assert!(must.literal == b"foo" || must.literal == b"bar");
    }

    #[test]
    fn alternation_yields_no_must_string() {
        let hir = parse("foo|bar");
        assert!(extract(&hir).is_none());
    }
}
