//! Error types for pargrep.
//!
//! Uses thiserror for ergonomic error handling with proper error chain
//! propagation. §7 of the design spec: the matcher never raises from
//! `execute`, so `CompileError` only happens up front; I/O errors are
//! per-file and suppressible; output errors on stdout are always fatal.

use std::path::PathBuf;
use thiserror::Error;

/// A pattern compilation failure, reported as `file:line: message` when the
/// pattern came from a `-f` file, or bare when it came from the command line.
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    #[error("{file}:{line}: {message}")]
    InPatternFile {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{message}")]
    Bare { message: String },

    #[error("regular expression offset too large for this line")]
    OffsetOverflow,
}

impl CompileError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InPatternFile { .. } | Self::Bare { .. } => "PATTERN_SYNTAX",
            Self::OffsetOverflow => "PATTERN_OFFSET_OVERFLOW",
        }
    }
}

/// Top-level error for a pargrep run.
#[derive(Error, Debug)]
pub enum GrepError {
    #[error("{0}")]
    Compile(#[from] CompileError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write error")]
    Output(#[source] std::io::Error),

    #[error("{path}: input file is output")]
    SelfReference { path: PathBuf },

    #[error("{path}: recursive directory loop")]
    DirectoryLoop { path: PathBuf },

    #[error("line too long for available memory")]
    OutOfMemory,
}

impl GrepError {
    /// Returns a machine-readable error code, mirroring the teacher's
    /// per-domain `code()` convention.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Compile(e) => e.code(),
            Self::Io { .. } => "IO_ERROR",
            Self::Output(_) => "OUTPUT_ERROR",
            Self::SelfReference { .. } => "SELF_REFERENCE",
            Self::DirectoryLoop { .. } => "DIRECTORY_LOOP",
            Self::OutOfMemory => "OUT_OF_MEMORY",
        }
    }

    /// Whether this error is suppressible under `-s`/`no_messages`
    /// (spec.md §7: I/O errors are suppressible; compile, output, and
    /// out-of-memory errors are always fatal).
    #[must_use]
    pub fn is_suppressible(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::SelfReference { .. } | Self::DirectoryLoop { .. }
        )
    }
}

/// Result type alias for pargrep operations.
pub type Result<T> = std::result::Result<T, GrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_formats_with_file_and_line() {
        let e = CompileError::InPatternFile {
            file: "patterns.txt".into(),
            line: 3,
            message: "Unmatched ( or \\(".into(),
        };
        assert_eq!(e.to_string(), "patterns.txt:3: Unmatched ( or \\(");
    }

    #[test]
    fn io_errors_are_suppressible_but_compile_errors_are_not() {
        let io = GrepError::Io {
            path: PathBuf::from("x"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(io.is_suppressible());

        let compile = GrepError::Compile(CompileError::Bare {
            message: "bad pattern".into(),
        });
        assert!(!compile.is_suppressible());
    }
}
