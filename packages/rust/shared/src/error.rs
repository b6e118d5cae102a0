//! Error types for pbrtjson.
//!
//! Library crates use [`ConvertError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pbrtjson operations.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed quoting in the source text.
    #[error("lexical error on line {line}: {message}")]
    Lexical { line: usize, message: String },

    /// Unbalanced or nested brackets inside a block.
    #[error("structural error in block {block}: {message}")]
    Structural { block: usize, message: String },

    /// An `Include` target could not be read.
    #[error("cannot resolve include {include:?} from {from:?}: {source}")]
    Resolution {
        include: String,
        from: PathBuf,
        #[source]
        source: Box<ConvertError>,
    },

    /// A file includes itself, directly or through other files.
    #[error("include cycle: {}", format_chain(.chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    /// Any error raised while converting a particular source file.
    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ConvertError>,
    },

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data validation error (artifact shape mismatch, bad pattern, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a lexical error for the given 1-based source line.
    pub fn lexical(line: usize, msg: impl Into<String>) -> Self {
        Self::Lexical {
            line,
            message: msg.into(),
        }
    }

    /// Create a structural error for the given block index.
    pub fn structural(block: usize, msg: impl Into<String>) -> Self {
        Self::Structural {
            block,
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the source file being converted. Already-attributed errors pass through.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            err @ (Self::InFile { .. } | Self::Resolution { .. } | Self::IncludeCycle { .. }) => {
                err
            }
            other => Self::InFile {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ConvertError::config("missing output root");
        assert_eq!(err.to_string(), "config error: missing output root");

        let err = ConvertError::lexical(7, "unterminated quote");
        assert_eq!(err.to_string(), "lexical error on line 7: unterminated quote");

        let err = ConvertError::structural(2, "unbalanced ]");
        assert!(err.to_string().contains("block 2"));
    }

    #[test]
    fn cycle_lists_chain() {
        let err = ConvertError::IncludeCycle {
            chain: vec!["a.pbrt".into(), "b.pbrt".into(), "a.pbrt".into()],
        };
        assert_eq!(err.to_string(), "include cycle: a.pbrt -> b.pbrt -> a.pbrt");
    }

    #[test]
    fn in_file_wraps_once() {
        let err = ConvertError::lexical(1, "x").in_file("scene.pbrt").in_file("outer.pbrt");
        match err {
            ConvertError::InFile { path, source } => {
                assert_eq!(path, PathBuf::from("scene.pbrt"));
                assert!(matches!(*source, ConvertError::Lexical { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
