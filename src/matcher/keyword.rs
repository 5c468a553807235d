//! Keyword set: a multi-string literal prefilter built from the must-strings
//! of every sub-pattern. Backed by `aho-corasick`, the Rust-ecosystem
//! equivalent of GNU grep's Commentz-Walter `kwset` (spec.md GLOSSARY).

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::matcher::must::MustString;

/// One literal entry in the keyword set, tagged with the sub-pattern index
/// it came from and whether a hit on it is a definitive match.
#[derive(Debug, Clone)]
pub struct KeywordEntry {
    pub pattern_index: usize,
    pub exact: bool,
}

pub struct KeywordSet {
    automaton: AhoCorasick,
    entries: Vec<KeywordEntry>,
}

/// One hit reported by [`KeywordSet::search`].
#[derive(Debug, Clone, Copy)]
pub struct KeywordHit {
    pub start: usize,
    pub end: usize,
    pub pattern_index: usize,
    pub exact: bool,
}

impl KeywordSet {
    /// Builds a keyword set from one must-string per sub-pattern. Entries
    /// whose must-string is exact are sorted first so an exact hit is
    /// reported over a non-exact overlapping one when both start at the
    /// same position, matching spec.md's `kwset_exact_count` invariant
    /// (exact entries occupy the low indices).
    pub fn build(musts: &[(usize, MustString)], ascii_case_insensitive: bool) -> Option<Self> {
        if musts.is_empty() {
            return None;
        }
        let mut ordered: Vec<&(usize, MustString)> = musts.iter().collect();
        ordered.sort_by_key(|(_, m)| !m.exact);

        let literals: Vec<&[u8]> = ordered.iter().map(|(_, m)| m.literal.as_slice()).collect();
        let entries: Vec<KeywordEntry> = ordered
            .iter()
            .map(|(idx, m)| KeywordEntry { pattern_index: *idx, exact: m.exact })
            .collect();

        let automaton = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .ascii_case_insensitive(ascii_case_insensitive)
            .build(literals)
            .ok()?;

        Some(Self { automaton, entries })
    }

    /// Count of entries that are full-pattern equivalents (spec.md §3's
    /// `kwset_exact_count`), valid because `build` sorts exact entries to
    /// the front.
    #[must_use]
    pub fn exact_count(&self) -> usize {
        self.entries.iter().take_while(|e| e.exact).count()
    }

    /// Returns the first keyword hit in `buf` at or after `from`.
    #[must_use]
    pub fn search(&self, buf: &[u8], from: usize) -> Option<KeywordHit> {
        let window = buf.get(from..)?;
        let m = self.automaton.find(window)?;
        let entry = &self.entries[m.pattern().as_usize()];
        Some(KeywordHit {
            start: from + m.start(),
            end: from + m.end(),
            pattern_index: entry.pattern_index,
            exact: entry.exact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_entries_sort_before_non_exact() {
        let musts = vec![
            (0, MustString { literal: b"foo".to_vec(), exact: false }),
            (1, MustString { literal: b"bar".to_vec(), exact: true }),
        ];
        let set = KeywordSet::build(&musts, false).unwrap();
        assert_eq!(set.exact_count(), 1);
    }

    #[test]
    fn search_finds_literal_at_offset() {
        let musts = vec![(0, MustString { literal: b"needle".to_vec(), exact: true })];
        let set = KeywordSet::build(&musts, false).unwrap();
        let hit = set.search(b"hay needle stack", 0).unwrap();
        assert_eq!(hit.start, 4);
        assert_eq!(hit.end, 10);
        assert!(hit.exact);
    }
}
