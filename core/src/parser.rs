//! Command resolution and dispatch.
//!
//! [`Parser::resolve`] runs the synchronous pipeline: classify tokens,
//! match the command, honor a help request, resolve flags, collect the
//! remaining positionals and check arity. [`Parser::parse`] then awaits the
//! matched handler. Every usage failure is answered with help text; the
//! precise [`UsageError`] stays available on the [`Resolution`].
//!
//! # Example
//!
//! ```
//! use command_dispatch_core::*;
//!
//! let parser = Parser::builder("tools")
//!     .command(
//!         CommandSchema::builder("gather-info")
//!             .with_expected_args(2)
//!             .with_flag(FlagSchema::new("--host").with_expected_args(1).required(true))
//!             .with_flag(FlagSchema::new("--port").with_expected_args(1).required(true))
//!             .handler(|_, _| Ok(None)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let tokens = Token::from_args(["gather-info", "hostA", "5", "--host", "hostA", "--port", "5"]);
//! let Resolution::Ready(invocation) = parser.resolve(&tokens) else {
//!     panic!("expected a dispatchable invocation");
//! };
//! assert_eq!(invocation.positional, vec![Token::from("hostA"), Token::Number(5.0)]);
//! assert_eq!(invocation.flags.first("--host"), Some(&Token::from("hostA")));
//! ```

use std::fmt;

use semver::Version;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{DispatchError, UsageError};
use crate::types::{CommandBuilder, CommandSchema, FlagValues, Token};
use crate::validate::{ValidationError, validate_commands};

/// Raw token text paired with its position in the input.
#[derive(Debug, Clone, PartialEq)]
struct Marker {
    text: String,
    index: usize,
}

/// Tokens split by classification, each list in input order.
#[derive(Debug, Default)]
struct Markers {
    flags: Vec<Marker>,
    positional: Vec<Marker>,
}

fn classify(tokens: &[Token]) -> Markers {
    let mut markers = Markers::default();
    for (index, token) in tokens.iter().enumerate() {
        let marker = Marker {
            text: token.to_string(),
            index,
        };
        if token.is_flag_marker() {
            markers.flags.push(marker);
        } else {
            markers.positional.push(marker);
        }
    }
    markers
}

/// A matched command with its resolved arguments, ready to run.
#[derive(Debug)]
pub struct Invocation<'a> {
    pub command: &'a CommandSchema,
    pub positional: Vec<Token>,
    pub flags: FlagValues,
}

/// Outcome of the synchronous resolution steps.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// Every check passed.
    Ready(Invocation<'a>),
    /// `--help` or `-h` appeared for a known command.
    HelpRequested(&'a CommandSchema),
    /// The input was rejected; `help` is the text shown in its place.
    Rejected { error: UsageError, help: String },
}

impl Resolution<'_> {
    /// The usage error, if the input was rejected.
    pub fn usage_error(&self) -> Option<&UsageError> {
        match self {
            Resolution::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The help text this resolution falls back to, if any.
    pub fn help_text(&self) -> Option<String> {
        match self {
            Resolution::Ready(_) => None,
            Resolution::HelpRequested(command) => Some(command.help()),
            Resolution::Rejected { help, .. } => Some(help.clone()),
        }
    }
}

/// What a dispatch produced for the caller to print.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Rendered parser or command help.
    Help(String),
    /// Value returned by the handler.
    Value(Value),
}

impl Outcome {
    /// Printable form: help and string values verbatim, anything else as
    /// pretty JSON.
    pub fn render(&self) -> String {
        match self {
            Outcome::Help(text) => text.clone(),
            Outcome::Value(Value::String(text)) => text.clone(),
            Outcome::Value(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Ordered set of frozen commands plus cosmetic name and version.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::*;
///
/// let parser = Parser::builder("tools")
///     .version(1, 2, 3)
///     .command(CommandSchema::builder("ping").with_description("A test command").handler(|_, _| Ok(None)))
///     .build()
///     .unwrap();
///
/// assert_eq!(parser.version_string(), "1.2.3");
/// assert_eq!(parser.help(), "\ntools 1.2.3\n\nCommands:\nping - A test command\n");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Parser {
    name: String,
    version: Version,
    commands: Vec<CommandSchema>,
}

impl Parser {
    pub fn builder(name: impl Into<String>) -> ParserBuilder {
        ParserBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Renders the version as `major.minor.patch`.
    pub fn version_string(&self) -> String {
        format!(
            "{}.{}.{}",
            self.version.major, self.version.minor, self.version.patch
        )
    }

    /// Commands in registration order.
    pub fn commands(&self) -> &[CommandSchema] {
        &self.commands
    }

    /// Finds a command by canonical name. Aliases are not consulted.
    pub fn find_command(&self, name: &str) -> Option<&CommandSchema> {
        self.commands.iter().find(|command| command.name() == name)
    }

    /// Pretty JSON summary of the parser and its schemas.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Resolves a token vector without running any handler.
    pub fn resolve(&self, tokens: &[Token]) -> Resolution<'_> {
        let markers = classify(tokens);

        let Some(candidate) = markers.positional.first() else {
            return self.reject(UsageError::NoCommand);
        };
        let Some(command) = self.find_command(&candidate.text) else {
            return self.reject(UsageError::UnknownCommand(candidate.text.clone()));
        };

        if tokens.iter().any(Token::is_help) {
            debug!(command = %command.name(), "help requested");
            return Resolution::HelpRequested(command);
        }

        match bind(command, tokens, candidate.index, &markers.flags) {
            Ok(invocation) => Resolution::Ready(invocation),
            Err(error) => {
                debug!(command = %command.name(), %error, "rejecting invocation");
                Resolution::Rejected {
                    error,
                    help: command.help(),
                }
            }
        }
    }

    /// Resolves `tokens` and runs the matched handler.
    ///
    /// Usage failures come back as [`Outcome::Help`]. `Ok(None)` means the
    /// handler produced no result.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Handler`] when the handler fails; the error
    /// is passed through without retry.
    pub async fn parse(&self, tokens: &[Token]) -> Result<Option<Outcome>, DispatchError> {
        match self.resolve(tokens) {
            Resolution::Ready(Invocation {
                command,
                positional,
                flags,
            }) => {
                debug!(
                    command = %command.name(),
                    positional = positional.len(),
                    flags = flags.len(),
                    "dispatching"
                );
                let value = command.execute(positional, flags).await?;
                Ok(value.map(Outcome::Value))
            }
            Resolution::HelpRequested(command) => Ok(Some(Outcome::Help(command.help()))),
            Resolution::Rejected { help, .. } => Ok(Some(Outcome::Help(help))),
        }
    }

    fn reject(&self, error: UsageError) -> Resolution<'_> {
        debug!(%error, "no command matched");
        Resolution::Rejected {
            error,
            help: self.help(),
        }
    }
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.to_json().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Resolves flags and positionals for a matched command.
///
/// `used` is the union of every claimed token index: the command token, each
/// matched flag marker and the arguments it consumed. Windows may overlap;
/// positionals are whatever the union leaves out.
///
/// The slot excluded as the command name is the matched command token's own
/// index rather than raw index 0, so a command may follow leading switches.
fn bind<'a>(
    command: &'a CommandSchema,
    tokens: &[Token],
    command_index: usize,
    flag_markers: &[Marker],
) -> Result<Invocation<'a>, UsageError> {
    let mut used = vec![false; tokens.len()];
    used[command_index] = true;
    let mut flags = FlagValues::default();

    for (index, flag) in command.flags().iter().enumerate() {
        let Some(marker) = select_marker(command, index, flag_markers) else {
            if flag.is_required() {
                return Err(UsageError::MissingRequiredFlag(flag.name().to_string()));
            }
            continue;
        };

        let start = marker.index + 1;
        let expected = flag.expected_args();
        // Arguments are raw tokens whatever their classification, but never
        // the command token itself.
        let found = (start..tokens.len())
            .take_while(|&i| i != command_index)
            .take(expected)
            .count();
        if found < expected {
            return Err(UsageError::InsufficientFlagArgs {
                flag: flag.name().to_string(),
                expected,
                found,
            });
        }

        used[marker.index] = true;
        used[start..start + expected].fill(true);
        debug!(flag = %flag.name(), matched = %marker.text, args = expected, "resolved flag");
        flags.insert(flag.name(), tokens[start..start + expected].to_vec());
    }

    let positional: Vec<Token> = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| !used[*i])
        .map(|(_, token)| token.clone())
        .collect();

    if !command.accepts_arity(positional.len()) {
        return Err(UsageError::WrongArity {
            command: command.name().to_string(),
            expected: command.expected_args(),
            found: positional.len(),
        });
    }

    Ok(Invocation {
        command,
        positional,
        flags,
    })
}

/// Picks the marker for the flag at `index`: the canonical name first, then
/// aliases in declaration order, earliest occurrence on ties.
fn select_marker<'m>(
    command: &CommandSchema,
    index: usize,
    flag_markers: &'m [Marker],
) -> Option<&'m Marker> {
    flag_markers
        .iter()
        .filter_map(|marker| {
            command
                .flag_slot(&marker.text)
                .filter(|slot| slot.index == index)
                .map(|slot| (slot.rank, marker))
        })
        .min_by_key(|(rank, marker)| (*rank, marker.index))
        .map(|(_, marker)| marker)
}

/// Builder for [`Parser`].
#[derive(Debug)]
pub struct ParserBuilder {
    name: String,
    version: Version,
    commands: Vec<CommandBuilder>,
}

impl ParserBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Version::new(0, 1, 0),
            commands: Vec::new(),
        }
    }

    pub fn version(mut self, major: u64, minor: u64, patch: u64) -> Self {
        self.version = Version::new(major, minor, patch);
        self
    }

    /// Registers a command; registration order is help order.
    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }

    /// Freezes every command and the parser.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] from any command, or
    /// [`ValidationError::DuplicateCommand`] when two commands share a name.
    pub fn build(self) -> Result<Parser, ValidationError> {
        let commands = self
            .commands
            .into_iter()
            .map(CommandBuilder::build)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(error) = validate_commands(&commands).into_iter().next() {
            return Err(error);
        }

        debug!(
            parser = %self.name,
            commands = commands.len(),
            flags = commands.iter().map(|c| c.flags().len()).sum::<usize>(),
            "built parser"
        );

        Ok(Parser {
            name: self.name,
            version: self.version,
            commands,
        })
    }
}
