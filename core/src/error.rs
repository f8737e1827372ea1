//! Error types for resolution and dispatch.
//!
//! [`UsageError`] describes why an input could not be matched. It never
//! escapes [`Parser::parse`](crate::Parser::parse), which renders help text
//! instead. [`DispatchError`] covers faults that do reach the caller.

use thiserror::Error;

/// Why a token vector was answered with help text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// The input held no positional token to name a command.
    #[error("no command given")]
    NoCommand,
    /// The first positional token names no registered command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// A required flag was not supplied.
    #[error("missing required flag: {0}")]
    MissingRequiredFlag(String),
    /// A flag was followed by fewer tokens than its arity.
    #[error("flag {flag} expects {expected} argument(s), found {found}")]
    InsufficientFlagArgs {
        flag: String,
        expected: usize,
        found: usize,
    },
    /// The leftover positional count differs from the command's arity.
    #[error("command {command} expects {expected} positional argument(s), found {found}")]
    WrongArity {
        command: String,
        expected: usize,
        found: usize,
    },
}

impl UsageError {
    /// Whether the failure happened before a command was matched, in which
    /// case the parser-level help applies.
    pub fn is_parser_level(&self) -> bool {
        matches!(self, UsageError::NoCommand | UsageError::UnknownCommand(_))
    }
}

/// Failures surfaced to the caller of a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A command was executed with the wrong positional count.
    #[error("command {command} executed with {found} positional argument(s), expected {expected}")]
    ArityMismatch {
        command: String,
        expected: usize,
        found: usize,
    },
    /// The command handler failed.
    #[error("command {command} failed")]
    Handler {
        command: String,
        #[source]
        source: anyhow::Error,
    },
}
