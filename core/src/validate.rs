//! Registration-time validation.
//!
//! Catches structural mistakes in command and flag schemas before a parser
//! is built: empty or unmatchable command names, duplicate commands, flag
//! names that could never be classified as flags, and name/alias collisions
//! inside a command.
//!
//! # Examples
//!
//! ```
//! use command_dispatch_core::*;
//!
//! let flags = vec![FlagSchema::new("--host").with_alias("-H")];
//! assert!(validate_command("gather-info", &flags).is_empty());
//!
//! // Invalid: alias collides with another flag's canonical name
//! let flags = vec![
//!     FlagSchema::new("--host").with_alias("-p"),
//!     FlagSchema::new("-p"),
//! ];
//! assert!(!validate_command("gather-info", &flags).is_empty());
//! ```

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::types::{CommandSchema, FlagSchema, HELP_TOKENS, Token};

/// Schema validation errors.
///
/// Each variant describes a construction mistake. These are programming
/// errors in the schema declaration, never user-input mistakes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Command name is empty or whitespace-only.
    #[error("command name cannot be empty")]
    EmptyCommandName,
    /// Two registered commands share a name.
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),
    /// Command name would never be classified back to itself: it looks like
    /// a flag, or it is a number not written in canonical form (`07`).
    #[error("invalid command name: {0}")]
    InvalidCommandName(String),
    /// A command was built without a handler.
    #[error("command {0} has no handler")]
    MissingHandler(String),
    /// Flag name or alias does not start with the flag prefix.
    #[error("invalid flag name in command {command}: {name}")]
    InvalidFlagName { command: String, name: String },
    /// Two flags of one command claim the same name or alias.
    #[error("duplicate flag name in command {command}: {name}")]
    DuplicateFlag { command: String, name: String },
    /// A flag claims `--help` or `-h`.
    #[error("reserved flag name in command {command}: {name}")]
    ReservedFlag { command: String, name: String },
}

/// Position of a flag in its command plus the precedence of the matched
/// name: 0 for the canonical name, `n + 1` for the n-th alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FlagSlot {
    pub(crate) index: usize,
    pub(crate) rank: usize,
}

/// Validates the command set of a parser.
///
/// Duplicate names are rejected instead of letting the first registrant
/// silently shadow the rest.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::*;
///
/// let ping = || CommandSchema::builder("ping").handler(|_, _| Ok(None)).build().unwrap();
/// let errors = validate_commands(&[ping(), ping()]);
/// assert_eq!(errors, vec![ValidationError::DuplicateCommand("ping".into())]);
/// ```
pub fn validate_commands(commands: &[CommandSchema]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for command in commands {
        if !seen.insert(command.name()) {
            errors.push(ValidationError::DuplicateCommand(command.name().to_string()));
            return errors;
        }
    }

    errors
}

/// Validates one command's name and flag declarations.
pub fn validate_command(name: &str, flags: &[FlagSchema]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(ValidationError::EmptyCommandName);
        return errors;
    }

    let token = Token::infer(name);
    if token.is_flag_marker() || token.to_string() != name {
        errors.push(ValidationError::InvalidCommandName(name.to_string()));
        return errors;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for flag in flags {
        let names = std::iter::once(flag.name()).chain(flag.aliases().iter().map(String::as_str));
        for flag_name in names {
            // Numeric names like `-5` would be classified as positional.
            if !Token::infer(flag_name).is_flag_marker() || flag_name.len() < 2 {
                errors.push(ValidationError::InvalidFlagName {
                    command: name.to_string(),
                    name: flag_name.to_string(),
                });
                return errors;
            }
            if HELP_TOKENS.contains(&flag_name) {
                errors.push(ValidationError::ReservedFlag {
                    command: name.to_string(),
                    name: flag_name.to_string(),
                });
                return errors;
            }
            if !seen.insert(flag_name) {
                errors.push(ValidationError::DuplicateFlag {
                    command: name.to_string(),
                    name: flag_name.to_string(),
                });
                return errors;
            }
        }
    }

    errors
}

/// Maps every canonical name and alias to its owning flag.
///
/// Expects flags that passed [`validate_command`]; on a collision the first
/// registrant keeps the name.
pub(crate) fn flag_lookup(flags: &[FlagSchema]) -> HashMap<String, FlagSlot> {
    let mut lookup = HashMap::new();

    for (index, flag) in flags.iter().enumerate() {
        let names = std::iter::once(flag.name()).chain(flag.aliases().iter().map(String::as_str));
        for (rank, flag_name) in names.enumerate() {
            lookup
                .entry(flag_name.to_string())
                .or_insert(FlagSlot { index, rank });
        }
    }

    lookup
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_command_rejects_empty_name() {
        assert_eq!(
            validate_command("  ", &[]),
            vec![ValidationError::EmptyCommandName]
        );
    }

    #[test]
    fn test_validate_command_rejects_unmatchable_names() {
        for name in ["--scan", "-s", "07", "5.0"] {
            assert_eq!(
                validate_command(name, &[]),
                vec![ValidationError::InvalidCommandName(name.to_string())],
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_command_accepts_canonical_numbers() {
        assert!(validate_command("5", &[]).is_empty());
        assert!(validate_command("-5", &[]).is_empty());
    }

    #[test]
    fn test_validate_command_rejects_unprefixed_alias() {
        let flags = vec![FlagSchema::new("--host").with_alias("host")];

        assert_eq!(
            validate_command("gather-info", &flags),
            vec![ValidationError::InvalidFlagName {
                command: "gather-info".to_string(),
                name: "host".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_command_rejects_bare_prefix() {
        let flags = vec![FlagSchema::new("-")];

        let errors = validate_command("scan", &flags);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::InvalidFlagName { .. }]
        ));
    }

    #[test]
    fn test_validate_command_rejects_numeric_flag_name() {
        let flags = vec![FlagSchema::new("-5")];

        assert_eq!(
            validate_command("scan", &flags),
            vec![ValidationError::InvalidFlagName {
                command: "scan".to_string(),
                name: "-5".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_command_rejects_help_alias() {
        let flags = vec![FlagSchema::new("--host").with_alias("-h")];

        assert_eq!(
            validate_command("gather-info", &flags),
            vec![ValidationError::ReservedFlag {
                command: "gather-info".to_string(),
                name: "-h".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_command_rejects_alias_collision() {
        let flags = vec![
            FlagSchema::new("--port").with_alias("-p"),
            FlagSchema::new("--proxy").with_alias("-p"),
        ];

        assert_eq!(
            validate_command("gather-info", &flags),
            vec![ValidationError::DuplicateFlag {
                command: "gather-info".to_string(),
                name: "-p".to_string(),
            }]
        );
    }

    #[test]
    fn test_flag_lookup_ranks_names() {
        let flags = vec![
            FlagSchema::new("--host").with_alias("-H"),
            FlagSchema::new("--port").with_alias("-p").with_alias("--listen"),
        ];
        let lookup = flag_lookup(&flags);

        assert_eq!(lookup["--host"], FlagSlot { index: 0, rank: 0 });
        assert_eq!(lookup["-H"], FlagSlot { index: 0, rank: 1 });
        assert_eq!(lookup["--listen"], FlagSlot { index: 1, rank: 2 });
        assert_eq!(lookup.len(), 5);
    }
}
