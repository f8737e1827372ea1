//! Schema-driven command parsing and dispatch.
//!
//! This crate lets a program declare named commands and resolve a raw token
//! vector against them:
//!
//! - [`FlagSchema`]: a named option with aliases, an arity and a required
//!   marker.
//! - [`CommandSchema`]: a command with an exact positional count, ordered
//!   positional descriptions, flags and a handler.
//! - [`Parser`]: an ordered set of commands that classifies tokens, matches
//!   the command, resolves flags, checks counts and runs the handler.
//!
//! Usage mistakes never surface as errors: [`Parser::parse`] answers them
//! with rendered help text, while [`Parser::resolve`] keeps the precise
//! [`UsageError`] for callers that want it. Construction mistakes are caught
//! at build time as [`ValidationError`]s.
//!
//! # Example
//!
//! ```
//! use command_dispatch_core::*;
//! use serde_json::json;
//!
//! let parser = Parser::builder("tools")
//!     .command(
//!         CommandSchema::builder("greet")
//!             .with_description("Say hello")
//!             .with_expected_args(1)
//!             .with_arg_description("Who to greet.")
//!             .with_flag(FlagSchema::new("--loud").with_alias("-l"))
//!             .handler(|args, flags| {
//!                 let greeting = format!("hello {}", args[0]);
//!                 let greeting = if flags.contains("--loud") {
//!                     greeting.to_uppercase()
//!                 } else {
//!                     greeting
//!                 };
//!                 Ok(Some(json!(greeting)))
//!             }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let resolution = parser.resolve(&Token::from_args(["greet", "world", "-l"]));
//! assert!(matches!(resolution, Resolution::Ready(_)));
//!
//! let resolution = parser.resolve(&Token::from_args(["greet"]));
//! assert!(matches!(resolution.usage_error(), Some(UsageError::WrongArity { .. })));
//! ```

mod error;
mod help;
mod parser;
mod types;
mod validate;

pub use error::{DispatchError, UsageError};
pub use parser::{Invocation, Outcome, Parser, ParserBuilder, Resolution};
pub use types::*;
pub use validate::{ValidationError, validate_command, validate_commands};
