//! Error taxonomy of a grading call.
//!
//! [`GradeError`] covers everything a candidate can cause; all of it is folded
//! into a [`Verdict`](gabarito_common::Verdict). Only [`EngineError`], a fault
//! of the host itself, ever reaches the caller.

use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradeError {
    /// Source could not be parsed or compiled
    #[error("{0}")]
    Compile(String),

    /// No callable with the requested name after loading
    #[error("entry point `{0}` not found")]
    EntryPointMissing(String),

    /// Top-level code of the candidate raised while loading
    #[error("{0}")]
    TopLevel(String),

    /// Fixture input or expected output is not valid JSON
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    /// Candidate raised (or died) while handling one call
    #[error("{0}")]
    Invocation(String),

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Host-side failures unrelated to the candidate's behavior
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start interpreter `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("worker pipe unavailable: {0}")]
    Pipe(&'static str),

    #[error("failed to encode worker request: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Cut a candidate-supplied detail down to `max_chars` characters
pub fn bounded(detail: &str, max_chars: usize) -> String {
    let detail = detail.trim();
    match detail.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &detail[..cut]),
        None => detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_keeps_short_details() {
        assert_eq!(bounded("division by zero", 500), "division by zero");
        assert_eq!(bounded("  padded \n", 500), "padded");
    }

    #[test]
    fn test_bounded_cuts_on_char_boundary() {
        assert_eq!(bounded("ããããã", 3), "ããã…");
        assert_eq!(bounded("abcdef", 6), "abcdef");
    }

    #[test]
    fn test_engine_error_converts() {
        let err: GradeError = EngineError::Pipe("stdin").into();
        assert!(matches!(err, GradeError::Engine(_)));
        assert_eq!(err.to_string(), "worker pipe unavailable: stdin");
    }
}
