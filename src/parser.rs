//! Argument parsing: turns normalized getopt tokens into flag values.

use crate::dialect::{DialectAdapter, DialectError, Splitter};
use crate::help::{render_version, HelpFormatter};
use crate::registry::{FlagType, FlagValue, Registry, HELP_FLAG, VERSION_FLAG};
use crate::validate::ValidationError;
use thiserror::Error;
use tracing::debug;

/// Exit status for broken internal invariants.
pub const FATAL_STATUS: i32 = 3;

/// Errors that can occur during argument parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unrecognized option ({0})")]
    UnrecognizedOption(String),

    #[error("missing value for option ({0})")]
    MissingValue(String),

    #[error(transparent)]
    InvalidValue(#[from] ValidationError),

    #[error(transparent)]
    Dialect(#[from] DialectError),

    #[error("fatal: {0}")]
    Internal(String),
}

impl ParseError {
    /// Process exit status for this error.
    pub fn status(&self) -> i32 {
        match self {
            ParseError::Internal(_) => FATAL_STATUS,
            _ => ParseStatus::Error.code(),
        }
    }
}

/// Shell status of a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Success,
    /// Help or version was requested; the caller decides whether to exit.
    Failure,
    Error,
}

impl ParseStatus {
    pub fn code(self) -> i32 {
        match self {
            ParseStatus::Success => 0,
            ParseStatus::Failure => 1,
            ParseStatus::Error => 2,
        }
    }
}

/// Arguments left over after option parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Residual {
    positionals: Vec<String>,
    legacy_argc: usize,
}

impl Residual {
    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    pub fn into_positionals(self) -> Vec<String> {
        self.positionals
    }

    /// Token count minus option tokens minus the `--` terminator, if any.
    ///
    /// Kept for scripts that still read `FLAGS_ARGC`; prefer
    /// [`Residual::positionals`].
    pub fn legacy_argc(&self) -> usize {
        self.legacy_argc
    }

    /// Positionals quoted so a shell can split them back apart.
    pub fn quoted(&self) -> Result<String, shlex::QuoteError> {
        shlex::try_join(self.positionals.iter().map(String::as_str))
    }
}

/// Outcome of parsing arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Flags were applied; positionals remain.
    Success(Residual),
    /// The help flag was set. Carries the rendered help.
    Help(String),
    /// The version flag was set. Carries the version line.
    Version(String),
}

impl ParseOutcome {
    pub fn status(&self) -> ParseStatus {
        match self {
            ParseOutcome::Success(_) => ParseStatus::Success,
            ParseOutcome::Help(_) | ParseOutcome::Version(_) => ParseStatus::Failure,
        }
    }
}

/// Parse `args` into the flags of `registry`.
///
/// Registers the built-in flags, lets `splitter` normalize the arguments
/// and walks the resulting tokens. Values assigned before an error stay
/// assigned.
pub fn parse<S: Splitter + ?Sized>(
    registry: &mut Registry,
    splitter: &S,
    args: &[String],
) -> Result<ParseOutcome, ParseError> {
    registry.ensure_builtins();
    let args = alias_question_mark(registry, args);
    let tokens = DialectAdapter::new(registry.dialect(), splitter).normalize(registry, &args)?;
    ArgParser::new(registry).run(&tokens)
}

/// Like [`parse`], but prints help/version and exits on errors.
///
/// Help and version text go to stdout and the outcome is returned so the
/// caller can pick its own exit path. Errors are printed to stderr and the
/// process exits with [`ParseError::status`].
pub fn parse_or_exit<S: Splitter + ?Sized>(
    registry: &mut Registry,
    splitter: &S,
    args: &[String],
) -> ParseOutcome {
    match parse(registry, splitter, args) {
        Ok(outcome) => {
            if let ParseOutcome::Help(text) | ParseOutcome::Version(text) = &outcome {
                print!("{}", text);
            }
            outcome
        }
        Err(err) => {
            let program = registry.program().name.as_deref().unwrap_or("flags");
            eprintln!("{}: error: {}", program, err);
            std::process::exit(err.status());
        }
    }
}

/// Rewrite `-?` ahead of any `--` to the help flag.
fn alias_question_mark(registry: &Registry, args: &[String]) -> Vec<String> {
    let replacement = match registry.lookup(HELP_FLAG) {
        Some(flag) => match flag.short() {
            Some(c) => format!("-{}", c),
            None => "--help".to_string(),
        },
        None => return args.to_vec(),
    };
    let mut scanning = true;
    args.iter()
        .map(|arg| {
            if arg == "--" {
                scanning = false;
            }
            if scanning && arg == "-?" {
                replacement.clone()
            } else {
                arg.clone()
            }
        })
        .collect()
}

/// Parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    Done,
}

/// How a token named its flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matched {
    Long,
    Negated,
    Short,
}

/// A token resolved to a registered flag.
struct Resolved {
    name: String,
    matched: Matched,
    inline_value: Option<String>,
}

/// Walks normalized tokens and assigns flag values.
pub struct ArgParser<'r> {
    registry: &'r mut Registry,
}

impl<'r> ArgParser<'r> {
    pub fn new(registry: &'r mut Registry) -> Self {
        Self { registry }
    }

    /// Apply `tokens` left to right.
    pub fn run(mut self, tokens: &[String]) -> Result<ParseOutcome, ParseError> {
        let mut state = State::Scanning;
        let mut index = 0;
        let mut option_tokens = 0;
        let mut terminated = false;

        while state == State::Scanning {
            let Some(token) = tokens.get(index) else {
                break;
            };

            if token == "--" {
                index += 1;
                terminated = true;
                state = State::Done;
                continue;
            }

            let Some(resolved) = self.resolve(token)? else {
                // First operand: everything from here on is positional.
                state = State::Done;
                continue;
            };

            let consumed = self.apply(&resolved, token, tokens.get(index + 1))?;
            index += consumed;
            option_tokens += consumed;

            if let Some(outcome) = self.requested(&resolved.name) {
                return Ok(outcome);
            }
        }

        let positionals = tokens.get(index..).unwrap_or(&[]).to_vec();
        let legacy_argc = tokens
            .len()
            .saturating_sub(option_tokens + usize::from(terminated));
        debug!(?positionals, legacy_argc, "parsed arguments");
        Ok(ParseOutcome::Success(Residual {
            positionals,
            legacy_argc,
        }))
    }

    /// Match a token to a flag. `None` means the token is an operand.
    fn resolve(&self, token: &str) -> Result<Option<Resolved>, ParseError> {
        if let Some(option_str) = token.strip_prefix("--") {
            if !self.registry.dialect().supports_long() {
                return Err(ParseError::UnrecognizedOption(token.to_string()));
            }
            let (name, inline_value) = match option_str.split_once('=') {
                Some((n, v)) => (n, Some(v.to_string())),
                None => (option_str, None),
            };

            if let Some(flag) = self.registry.lookup(name) {
                return Ok(Some(Resolved {
                    name: flag.name().to_string(),
                    matched: Matched::Long,
                    inline_value,
                }));
            }
            if let Some(flag) = self.registry.lookup_negated(name) {
                if inline_value.is_some() {
                    return Err(ParseError::UnrecognizedOption(token.to_string()));
                }
                return Ok(Some(Resolved {
                    name: flag.name().to_string(),
                    matched: Matched::Negated,
                    inline_value: None,
                }));
            }
            return Err(ParseError::UnrecognizedOption(format!("--{}", name)));
        }

        let Some(body) = token.strip_prefix('-').filter(|b| !b.is_empty()) else {
            return Ok(None);
        };
        let mut chars = body.chars();
        let Some(c) = chars.next() else {
            return Ok(None);
        };
        let attached = chars.as_str();
        let flag = self
            .registry
            .lookup_short(c)
            .ok_or_else(|| ParseError::UnrecognizedOption(format!("-{}", c)))?;
        if flag.is_boolean() && !attached.is_empty() {
            return Err(ParseError::UnrecognizedOption(token.to_string()));
        }
        Ok(Some(Resolved {
            name: flag.name().to_string(),
            matched: Matched::Short,
            inline_value: Some(attached.to_string()).filter(|v| !v.is_empty()),
        }))
    }

    /// Assign the flag's new value; returns the number of tokens consumed.
    fn apply(
        &mut self,
        resolved: &Resolved,
        token: &str,
        next: Option<&String>,
    ) -> Result<usize, ParseError> {
        let flag = self.registry.flag_mut(&resolved.name).ok_or_else(|| {
            ParseError::Internal(format!("flag ({}) is missing from the registry", resolved.name))
        })?;

        let (value, consumed) = match (flag.flag_type(), resolved.matched) {
            (_, Matched::Negated) => (FlagValue::Boolean(false), 1),
            (FlagType::Boolean, Matched::Long) => match resolved.inline_value {
                Some(ref literal) => (FlagValue::parse(FlagType::Boolean, literal)?, 1),
                None => (FlagValue::Boolean(true), 1),
            },
            (FlagType::Boolean, Matched::Short) => {
                let current = flag.value().as_bool().ok_or_else(|| {
                    let name = flag.name();
                    ParseError::Internal(format!("flag ({name}) holds a non-boolean value"))
                })?;
                (FlagValue::Boolean(!current), 1)
            }
            (flag_type, _) => {
                let (raw, consumed) = match resolved.inline_value {
                    Some(ref v) => (v.as_str(), 1),
                    None => {
                        let v = next.ok_or_else(|| ParseError::MissingValue(token.to_string()))?;
                        (v.as_str(), 2)
                    }
                };
                (FlagValue::parse(flag_type, raw)?, consumed)
            }
        };

        debug!(flag = flag.name(), %value, "assigned flag");
        flag.set_value(value);
        Ok(consumed)
    }

    /// Help or version output when the flag just set asks for it.
    fn requested(&self, name: &str) -> Option<ParseOutcome> {
        let registry: &Registry = self.registry;
        if registry.lookup(name)?.value().as_bool() != Some(true) {
            return None;
        }
        match name {
            HELP_FLAG => Some(ParseOutcome::Help(HelpFormatter::new(registry).render())),
            VERSION_FLAG => Some(ParseOutcome::Version(render_version(registry))),
            _ => None,
        }
    }
}
