//! Pattern set: the sub-patterns a matcher is compiled from, each carrying
//! enough provenance to turn a compile error into `file:line:message`.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{CompileError, GrepError, Result};

/// Where a single sub-pattern line came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternOrigin {
    /// `-e PATTERN` or the bare positional pattern argument.
    CommandLine,
    /// A line read from a `-f FILE` pattern file.
    File { name: String, line: usize },
}

impl fmt::Display for PatternOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandLine => write!(f, "<command line>"),
            Self::File { name, line } => write!(f, "{name}:{line}"),
        }
    }
}

/// One newline-separated sub-pattern plus where it came from.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub text: String,
    pub origin: PatternOrigin,
}

/// The full set of sub-patterns a matcher compiles, in the order they were
/// supplied. Matches spec.md §3 "Pattern set".
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<PatternSpec>,
}

impl PatternSet {
    #[must_use]
    pub fn new() -> Self {
        Self { patterns: Vec::new() }
    }

    /// Adds a single pattern given directly on the command line (`-e` or
    /// the bare positional argument). GNU grep splits a `-e` argument on
    /// embedded newlines too; we do the same.
    pub fn add_command_line(&mut self, text: &str) {
        for line in text.split('\n') {
            self.patterns.push(PatternSpec {
                text: line.to_string(),
                origin: PatternOrigin::CommandLine,
            });
        }
    }

    /// Reads a `-f FILE` pattern file, recording a line number per entry.
    /// `-` reads patterns from standard input.
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let name = path.display().to_string();
        let contents = if path == Path::new("-") {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|source| GrepError::Io { path: path.to_path_buf(), source })?;
            buf
        } else {
            fs::read_to_string(path).map_err(|source| GrepError::Io { path: path.to_path_buf(), source })?
        };

        for (idx, line) in contents.lines().enumerate() {
            self.patterns.push(PatternSpec {
                text: line.to_string(),
                origin: PatternOrigin::File { name: name.clone(), line: idx + 1 },
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub fn patterns(&self) -> &[PatternSpec] {
        &self.patterns
    }

    /// Concatenates the set into one newline-joined pattern, the form the
    /// matcher compiles as a single DFA (spec.md §4.1's "concatenated
    /// newline-separated sub-patterns").
    #[must_use]
    pub fn joined(&self) -> String {
        self.patterns
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Wraps a raw regex-syntax error with the origin of the sub-pattern at
    /// `pattern_index`, producing spec.md §4.1/§7's `file:line:message`
    /// compile diagnostic.
    #[must_use]
    pub fn compile_error(&self, pattern_index: usize, message: String) -> CompileError {
        match self.patterns.get(pattern_index).map(|p| &p.origin) {
            Some(PatternOrigin::File { name, line }) => CompileError::InPatternFile {
                file: name.clone(),
                line: *line,
                message,
            },
            _ => CompileError::Bare { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_pattern_splits_on_embedded_newline() {
        let mut set = PatternSet::new();
        set.add_command_line("foo\nbar");
        assert_eq!(set.patterns().len(), 2);
        assert_eq!(set.patterns()[0].text, "foo");
        assert_eq!(set.patterns()[1].text, "bar");
        assert!(matches!(set.patterns()[0].origin, PatternOrigin::CommandLine));
    }

    #[test]
    fn joined_concatenates_with_newlines() {
        let mut set = PatternSet::new();
        set.add_command_line("foo");
        set.add_command_line("bar");
        assert_eq!(set.joined(), "foo\nbar");
    }

    #[test]
    fn compile_error_carries_file_origin() {
        let mut set = PatternSet::new();
        set.patterns.push(PatternSpec {
            text: "(".to_string(),
            origin: PatternOrigin::File { name: "pats.txt".into(), line: 2 },
        });
        let err = set.compile_error(0, "Unmatched (".to_string());
        assert_eq!(err.to_string(), "pats.txt:2: Unmatched (");
    }
}
