//! getopt dialects and the splitter that turns raw arguments into tokens.

use crate::registry::Registry;
use std::fmt;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable naming the getopt command to run.
pub const GETOPT_CMD_ENV: &str = "FLAGS_GETOPT_CMD";
/// Command used when the environment does not name one.
pub const DEFAULT_GETOPT_CMD: &str = "getopt";

/// Errors raised while splitting arguments with getopt.
#[derive(Debug, Error)]
pub enum DialectError {
    #[error("the available getopt does not support spaces in options")]
    SpacesUnsupported,

    #[error("the available getopt does not support empty arguments")]
    EmptyUnsupported,

    #[error("{message}")]
    Rejected { status: i32, message: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to split getopt output: {0}")]
    Malformed(String),
}

/// Capability level of the option splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Short options only.
    Standard,
    /// Short and long options, including negated booleans.
    Enhanced,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Standard => f.write_str("standard"),
            Dialect::Enhanced => f.write_str("enhanced"),
        }
    }
}

/// Option descriptions handed to getopt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSpec {
    /// Short option string, `:` after options taking a value.
    pub short: String,
    /// Long options, `:` suffix on those taking a value.
    pub long: Vec<String>,
    /// `no<name>` aliases of boolean flags.
    pub negated: Vec<String>,
}

impl OptionSpec {
    /// Comma-joined long options followed by the negated aliases.
    pub fn long_list(&self) -> String {
        self.long
            .iter()
            .chain(&self.negated)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Dialect {
    pub fn supports_long(self) -> bool {
        matches!(self, Dialect::Enhanced)
    }

    /// Build the getopt option descriptions for every registered flag.
    pub fn option_spec(self, registry: &Registry) -> OptionSpec {
        let mut spec = OptionSpec::default();
        for flag in registry.flags() {
            let suffix = if flag.is_boolean() { "" } else { ":" };
            if let Some(c) = flag.short() {
                spec.short.push(c);
                spec.short.push_str(suffix);
            }
            if self.supports_long() {
                spec.long.push(format!("{}{}", flag.display_name(), suffix));
                if flag.is_boolean() {
                    spec.negated.push(format!("no{}", flag.display_name()));
                }
            }
        }
        spec
    }

    /// Arguments for one getopt run, excluding the program itself.
    pub fn invocation(self, spec: &OptionSpec, args: &[String]) -> Vec<String> {
        let mut invocation = match self {
            Dialect::Standard => vec![spec.short.clone()],
            Dialect::Enhanced => vec![
                "-o".to_string(),
                spec.short.clone(),
                "-l".to_string(),
                spec.long_list(),
                "--".to_string(),
            ],
        };
        invocation.extend(args.iter().cloned());
        invocation
    }

    /// Split getopt output into tokens.
    ///
    /// Standard getopt prints its tokens unquoted; enhanced getopt quotes
    /// every value for the shell.
    pub fn tokenize(self, output: &str) -> Result<Vec<String>, DialectError> {
        match self {
            Dialect::Standard => Ok(output.split_whitespace().map(str::to_string).collect()),
            Dialect::Enhanced => {
                shlex::split(output).ok_or_else(|| DialectError::Malformed(output.to_string()))
            }
        }
    }
}

/// Something that splits an argument vector the way getopt(1) does.
pub trait Splitter {
    /// Run with `invocation` as getopt's own arguments and return its output.
    fn split(&self, invocation: &[String]) -> Result<String, DialectError>;
}

/// The external getopt program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetoptCommand {
    program: String,
}

impl GetoptCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `FLAGS_GETOPT_CMD` when set and non-empty, else `getopt`.
    pub fn from_env() -> Self {
        match std::env::var(GETOPT_CMD_ENV) {
            Ok(program) if !program.is_empty() => Self::new(program),
            _ => Self::default(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for GetoptCommand {
    fn default() -> Self {
        Self::new(DEFAULT_GETOPT_CMD)
    }
}

impl Splitter for GetoptCommand {
    fn split(&self, invocation: &[String]) -> Result<String, DialectError> {
        debug!(program = %self.program, ?invocation, "running getopt");
        let output = Command::new(&self.program)
            .args(invocation)
            .output()
            .map_err(|source| DialectError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(DialectError::Rejected {
                status: output.status.code().unwrap_or(1),
                message,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Detect which dialect `splitter` speaks.
///
/// Enhanced getopt understands `-lfoo` as a long option list and prints
/// `--foo` ahead of the `--` terminator. Anything else, including a failed
/// split, is treated as the standard dialect.
pub fn detect_dialect<S: Splitter + ?Sized>(splitter: &S) -> Dialect {
    let sample = ["-lfoo".to_string(), String::new(), "--foo".to_string()];
    match splitter.split(&sample) {
        Ok(output) => {
            let dialect = match output.split_whitespace().next() {
                Some("--foo") => Dialect::Enhanced,
                _ => Dialect::Standard,
            };
            debug!(%dialect, output = output.trim(), "detected getopt dialect");
            dialect
        }
        Err(err) => {
            warn!(%err, "getopt detection failed, assuming the standard dialect");
            Dialect::Standard
        }
    }
}

/// Builds getopt input for a registry and normalizes the output.
pub struct DialectAdapter<'a, S: Splitter + ?Sized> {
    dialect: Dialect,
    splitter: &'a S,
}

impl<'a, S: Splitter + ?Sized> DialectAdapter<'a, S> {
    pub fn new(dialect: Dialect, splitter: &'a S) -> Self {
        Self { dialect, splitter }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Run the splitter over `args` and return the normalized tokens.
    pub fn normalize(
        &self,
        registry: &Registry,
        args: &[String],
    ) -> Result<Vec<String>, DialectError> {
        // Standard getopt output is unquoted, so these would not survive.
        if self.dialect == Dialect::Standard {
            if args.iter().any(|arg| arg.is_empty()) {
                return Err(DialectError::EmptyUnsupported);
            }
            if args.iter().any(|arg| arg.chars().any(char::is_whitespace)) {
                return Err(DialectError::SpacesUnsupported);
            }
        }

        let spec = self.dialect.option_spec(registry);
        let invocation = self.dialect.invocation(&spec, args);
        let output = self.splitter.split(&invocation)?;
        let tokens = self.dialect.tokenize(&output)?;
        debug!(?tokens, "normalized arguments");
        Ok(tokens)
    }
}
