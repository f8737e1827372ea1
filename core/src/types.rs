//! Schema type definitions for commands, flags and input tokens.
//!
//! Schemas are assembled with value-style builders and frozen once built.
//! Flag and command schemas serialize with [`serde`] so a registered parser
//! can be described as JSON; handlers are never serialized.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value;

use crate::error::DispatchError;
use crate::validate::{FlagSlot, ValidationError, flag_lookup, validate_command};

/// Prefix that marks a textual token as a flag.
pub const FLAG_PREFIX: char = '-';

/// Tokens that request command help wherever they appear in the input.
pub const HELP_TOKENS: [&str; 2] = ["--help", "-h"];

/// One raw input token.
///
/// Numeric tokens are always positional, even when their text would start
/// with the flag prefix (e.g. `-5`).
///
/// # Examples
///
/// ```
/// use command_dispatch_core::Token;
///
/// assert_eq!(Token::infer("5"), Token::Number(5.0));
/// assert_eq!(Token::infer("--host"), Token::Text("--host".into()));
/// assert!(Token::infer("--host").is_flag_marker());
/// assert!(!Token::infer("-5").is_flag_marker());
/// assert_eq!(Token::Number(5.0).to_string(), "5");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Token {
    /// Textual token.
    Text(String),
    /// Numeric literal.
    Number(f64),
}

impl Token {
    /// Classifies a raw command-line string: finite numeric literals become
    /// [`Token::Number`], everything else stays text.
    pub fn infer(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(number) if number.is_finite() => Token::Number(number),
            _ => Token::Text(raw.to_string()),
        }
    }

    /// Converts a whole argument vector with [`Token::infer`].
    pub fn from_args<I, S>(args: I) -> Vec<Token>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        args.into_iter().map(|arg| Token::infer(arg.as_ref())).collect()
    }

    /// Returns the text of a textual token.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Text(text) => Some(text),
            Token::Number(_) => None,
        }
    }

    /// Returns the value of a numeric token.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Token::Number(number) => Some(*number),
            Token::Text(_) => None,
        }
    }

    /// Whether this token is classified as a flag marker.
    pub fn is_flag_marker(&self) -> bool {
        matches!(self, Token::Text(text) if text.starts_with(FLAG_PREFIX))
    }

    /// Whether this token is one of the [`HELP_TOKENS`].
    pub fn is_help(&self) -> bool {
        self.as_text().is_some_and(|text| HELP_TOKENS.contains(&text))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => f.write_str(text),
            Token::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Token::Text(text.to_string())
    }
}

impl From<String> for Token {
    fn from(text: String) -> Self {
        Token::Text(text)
    }
}

impl From<f64> for Token {
    fn from(number: f64) -> Self {
        Token::Number(number)
    }
}

/// Schema for a command flag.
///
/// A flag has a canonical name (conventionally prefixed, e.g. `--host`),
/// any number of aliases, and consumes exactly
/// [`expected_args`](FlagSchema::expected_args) trailing tokens. The default
/// arity is 0, a boolean switch.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::FlagSchema;
///
/// let host = FlagSchema::new("--host")
///     .with_description("The hostname to connect to")
///     .with_expected_args(1)
///     .with_alias("-H")
///     .required(true);
///
/// assert_eq!(host.name(), "--host");
/// assert!(host.matches("-H"));
/// assert!(host.is_required());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagSchema {
    name: String,
    description: String,
    expected_args: usize,
    aliases: Vec<String>,
    required: bool,
}

impl FlagSchema {
    /// Creates an optional boolean flag.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            expected_args: 0,
            aliases: Vec::new(),
            required: false,
        }
    }

    /// Sets the description shown in help text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets how many trailing tokens the flag consumes.
    pub fn with_expected_args(mut self, expected_args: usize) -> Self {
        self.expected_args = expected_args;
        self
    }

    /// Adds an alias, typically a short form.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets whether the flag must be present.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expected_args(&self) -> usize {
        self.expected_args
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Checks the canonical name and every alias.
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|alias| alias == token)
    }
}

/// Flag values resolved for one invocation, keyed by canonical flag name.
///
/// Flags that were not supplied have no entry; supplied switches map to an
/// empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlagValues(BTreeMap<String, Vec<Token>>);

impl FlagValues {
    pub(crate) fn insert(&mut self, name: &str, values: Vec<Token>) {
        self.0.insert(name.to_string(), values);
    }

    /// All tokens consumed by a flag.
    pub fn get(&self, name: &str) -> Option<&[Token]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// The first token consumed by a flag.
    pub fn first(&self, name: &str) -> Option<&Token> {
        self.0.get(name).and_then(|values| values.first())
    }

    /// Whether the flag was supplied at all.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Token])> {
        self.0
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

/// Result produced by a command handler.
pub type HandlerResult = anyhow::Result<Option<Value>>;

/// Boxed future returned by every handler.
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

type Handler = Arc<dyn Fn(Vec<Token>, FlagValues) -> HandlerFuture + Send + Sync>;

/// Frozen schema for one invocable command.
///
/// Built through [`CommandSchema::builder`]; exposes no mutation afterwards.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::{CommandSchema, FlagSchema};
///
/// let scan = CommandSchema::builder("scan")
///     .with_description("Scan a host")
///     .with_expected_args(1)
///     .with_arg_description("The host to scan.")
///     .with_flag(FlagSchema::new("--verbose").with_alias("-v"))
///     .handler(|_args, _flags| Ok(None))
///     .build()
///     .unwrap();
///
/// assert_eq!(scan.name(), "scan");
/// assert_eq!(scan.find_flag("-v").unwrap().name(), "--verbose");
/// assert!(scan.required_flags().is_empty());
/// ```
#[derive(Clone, Serialize)]
pub struct CommandSchema {
    name: String,
    description: String,
    expected_args: usize,
    arg_descriptions: Vec<String>,
    flags: Vec<FlagSchema>,
    aliases: Vec<String>,
    #[serde(skip)]
    lookup: HashMap<String, FlagSlot>,
    #[serde(skip)]
    handler: Handler,
}

impl CommandSchema {
    /// Starts building a command with the given canonical name.
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expected_args(&self) -> usize {
        self.expected_args
    }

    pub fn arg_descriptions(&self) -> &[String] {
        &self.arg_descriptions
    }

    /// Flags in declaration order.
    pub fn flags(&self) -> &[FlagSchema] {
        &self.flags
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Flags marked as required, in declaration order.
    pub fn required_flags(&self) -> Vec<&FlagSchema> {
        self.flags.iter().filter(|flag| flag.is_required()).collect()
    }

    /// Finds the flag owning a canonical name or alias.
    pub fn find_flag(&self, token: &str) -> Option<&FlagSchema> {
        self.flag_slot(token).map(|slot| &self.flags[slot.index])
    }

    pub(crate) fn flag_slot(&self, token: &str) -> Option<FlagSlot> {
        self.lookup.get(token).copied()
    }

    /// Positional-count check shared by [`execute`](Self::execute) and the
    /// parser's arity step.
    pub(crate) fn accepts_arity(&self, count: usize) -> bool {
        count == self.expected_args
    }

    /// Runs the handler directly.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ArityMismatch`] when `positional` does not
    /// hold exactly [`expected_args`](Self::expected_args) tokens, and
    /// [`DispatchError::Handler`] when the handler fails.
    pub async fn execute(
        &self,
        positional: Vec<Token>,
        flags: FlagValues,
    ) -> Result<Option<Value>, DispatchError> {
        if !self.accepts_arity(positional.len()) {
            return Err(DispatchError::ArityMismatch {
                command: self.name.clone(),
                expected: self.expected_args,
                found: positional.len(),
            });
        }

        (self.handler)(positional, flags)
            .await
            .map_err(|source| DispatchError::Handler {
                command: self.name.clone(),
                source,
            })
    }
}

impl fmt::Debug for CommandSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSchema")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("expected_args", &self.expected_args)
            .field("arg_descriptions", &self.arg_descriptions)
            .field("flags", &self.flags)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandSchema`].
pub struct CommandBuilder {
    name: String,
    description: String,
    expected_args: usize,
    arg_descriptions: Vec<String>,
    flags: Vec<FlagSchema>,
    aliases: Vec<String>,
    handler: Option<Handler>,
}

impl CommandBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            expected_args: 0,
            arg_descriptions: Vec::new(),
            flags: Vec::new(),
            aliases: Vec::new(),
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the exact positional-argument count. Flags and their consumed
    /// tokens do not count.
    pub fn with_expected_args(mut self, expected_args: usize) -> Self {
        self.expected_args = expected_args;
        self
    }

    /// Appends a positional-argument description; add them in display order.
    pub fn with_arg_description(mut self, text: impl Into<String>) -> Self {
        self.arg_descriptions.push(text.into());
        self
    }

    pub fn with_flag(mut self, flag: FlagSchema) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets a synchronous handler.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Vec<Token>, FlagValues) -> HandlerResult + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(move |positional: Vec<Token>, flags: FlagValues| {
            futures_util::future::ready(handler(positional, flags)).boxed()
        }));
        self
    }

    /// Sets a handler that returns a future.
    pub fn async_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Vec<Token>, FlagValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |positional: Vec<Token>, flags: FlagValues| {
            handler(positional, flags).boxed()
        }));
        self
    }

    /// Freezes the command.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: an empty name, invalid
    /// or colliding flag names, or a missing handler.
    pub fn build(self) -> Result<CommandSchema, ValidationError> {
        if let Some(error) = validate_command(&self.name, &self.flags).into_iter().next() {
            return Err(error);
        }
        let handler = self
            .handler
            .ok_or_else(|| ValidationError::MissingHandler(self.name.clone()))?;
        let lookup = flag_lookup(&self.flags);

        Ok(CommandSchema {
            name: self.name,
            description: self.description,
            expected_args: self.expected_args,
            arg_descriptions: self.arg_descriptions,
            flags: self.flags,
            aliases: self.aliases,
            lookup,
            handler,
        })
    }
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("name", &self.name)
            .field("expected_args", &self.expected_args)
            .field("flags", &self.flags)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}
