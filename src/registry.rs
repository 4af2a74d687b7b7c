//! Flag definitions and the registry that owns them.

use crate::dialect::Dialect;
use crate::validate::{self, ValidationError};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Names that cannot be used for user-defined flags.
pub const RESERVED_NAMES: &[&str] = &[
    "argc",
    "argv",
    "error",
    "help",
    "parent",
    "true",
    "false",
    "getopt_cmd",
    "version",
];

/// Canonical name of the built-in help flag.
pub const HELP_FLAG: &str = "help";
/// Canonical name of the built-in version flag.
pub const VERSION_FLAG: &str = "version";

/// Errors that can occur while defining a flag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid flag name ({0}): use ASCII letters, digits, '-' and '_'")]
    InvalidName(String),

    #[error("flag name ({0}) is reserved")]
    ReservedName(String),

    #[error("invalid short flag '{0}': must be a single ASCII letter or digit")]
    InvalidShortName(char),

    #[error("flag ({0}) needs a short name: the available getopt only supports short options")]
    ShortNameRequired(String),

    #[error("flag ({0}) already defined")]
    DuplicateName(String),

    #[error("short flag (-{0}) already defined")]
    DuplicateShortName(char),

    #[error("invalid default for flag ({name}): {source}")]
    InvalidDefault {
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("unknown flag type ({0})")]
    UnknownType(String),
}

/// The type of a flag's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagType {
    Boolean,
    Float,
    Integer,
    Unsigned,
    String,
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlagType::Boolean => "boolean",
            FlagType::Float => "float",
            FlagType::Integer => "integer",
            FlagType::Unsigned => "unsigned integer",
            FlagType::String => "string",
        };
        f.write_str(name)
    }
}

impl FromStr for FlagType {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" | "bool" => Ok(FlagType::Boolean),
            "float" => Ok(FlagType::Float),
            "integer" | "int" => Ok(FlagType::Integer),
            "unsigned" | "unsigned-integer" | "unsigned_integer" | "uint" => {
                Ok(FlagType::Unsigned)
            }
            "string" | "str" => Ok(FlagType::String),
            other => Err(DefinitionError::UnknownType(other.to_string())),
        }
    }
}

/// A typed flag value.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Boolean(bool),
    /// The validated literal is kept for display; `f64` cannot hold every
    /// decimal the validator accepts.
    Float { value: f64, literal: String },
    Integer(i64),
    Unsigned(u64),
    String(String),
}

impl FlagValue {
    /// Validate `literal` for `flag_type` and convert it.
    ///
    /// Boolean literals follow shell truth: `0` is true and `1` is false.
    /// Numbers that are lexically valid but do not fit in 64 bits, or
    /// floats too large to be finite, are rejected with the same error as
    /// malformed ones.
    pub fn parse(flag_type: FlagType, literal: &str) -> Result<FlagValue, ValidationError> {
        validate::validate(flag_type, literal)?;
        let invalid = || ValidationError::new(flag_type, literal);
        let value = match flag_type {
            FlagType::Boolean => FlagValue::Boolean(matches!(literal, "true" | "t" | "0")),
            FlagType::Float => {
                let value: f64 = literal.parse().map_err(|_| invalid())?;
                if !value.is_finite() {
                    return Err(invalid());
                }
                FlagValue::Float {
                    value,
                    literal: literal.to_string(),
                }
            }
            FlagType::Integer => FlagValue::Integer(literal.parse().map_err(|_| invalid())?),
            FlagType::Unsigned => FlagValue::Unsigned(literal.parse().map_err(|_| invalid())?),
            FlagType::String => FlagValue::String(literal.to_string()),
        };
        Ok(value)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FlagValue::Float { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FlagValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FlagValue::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Boolean(b) => write!(f, "{}", b),
            FlagValue::Float { literal, .. } => f.write_str(literal),
            FlagValue::Integer(v) => write!(f, "{}", v),
            FlagValue::Unsigned(v) => write!(f, "{}", v),
            FlagValue::String(s) => f.write_str(s),
        }
    }
}

/// One declared flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    name: String,
    display_name: String,
    short: Option<char>,
    flag_type: FlagType,
    default: FlagValue,
    value: FlagValue,
    help: String,
    required: bool,
}

impl Flag {
    /// Canonical name (hyphens replaced with underscores).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name as it was declared, used on the command line.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn flag_type(&self) -> FlagType {
        self.flag_type
    }

    pub fn default_value(&self) -> &FlagValue {
        &self.default
    }

    pub fn value(&self) -> &FlagValue {
        &self.value
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Advisory only: affects help grouping, never enforced while parsing.
    pub fn required(&self) -> bool {
        self.required
    }

    pub fn is_boolean(&self) -> bool {
        self.flag_type == FlagType::Boolean
    }

    /// Whether this is one of the flags the library registers itself.
    pub fn is_builtin(&self) -> bool {
        self.name == HELP_FLAG || self.name == VERSION_FLAG
    }

    pub(crate) fn set_value(&mut self, value: FlagValue) {
        self.value = value;
    }
}

/// Program metadata shown in help and version output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub name: Option<String>,
    pub usage: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    /// Project the program belongs to, shown next to its name.
    pub project: Option<String>,
    /// Copyright holder, without the "Copyright (c)" prefix.
    pub copyright: Option<String>,
    pub license: Option<String>,
    /// Where to report problems; printed at the end of help.
    pub contact: Option<String>,
}

/// Replace hyphens with the internal separator.
pub fn canonical_name(name: &str) -> String {
    name.replace('-', "_")
}

fn valid_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphanumeric())
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn is_reserved(canonical: &str) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(canonical))
}

/// Ordered set of flags plus lookup indexes.
#[derive(Debug, Clone)]
pub struct Registry {
    dialect: Dialect,
    program: Program,
    flags: Vec<Flag>,
    by_name: HashMap<String, usize>,
    by_short: HashMap<char, usize>,
    by_negated: HashMap<String, usize>,
}

impl Registry {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            program: Program::default(),
            flags: Vec::new(),
            by_name: HashMap::new(),
            by_short: HashMap::new(),
            by_negated: HashMap::new(),
        }
    }

    pub fn with_program(mut self, program: Program) -> Self {
        self.program = program;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Define a flag.
    ///
    /// Nothing is registered when an error is returned.
    pub fn define(
        &mut self,
        flag_type: FlagType,
        name: &str,
        default: &str,
        help: &str,
        short: Option<char>,
        required: bool,
    ) -> Result<(), DefinitionError> {
        if name.is_empty() {
            return Err(DefinitionError::MissingArgument("name"));
        }
        if !valid_name(name) {
            return Err(DefinitionError::InvalidName(name.to_string()));
        }
        if is_reserved(&canonical_name(name)) {
            return Err(DefinitionError::ReservedName(name.to_string()));
        }
        self.insert(flag_type, name, default, help, short, required)
    }

    pub fn define_boolean(
        &mut self,
        name: &str,
        default: &str,
        help: &str,
        short: Option<char>,
    ) -> Result<(), DefinitionError> {
        self.define(FlagType::Boolean, name, default, help, short, false)
    }

    pub fn define_float(
        &mut self,
        name: &str,
        default: &str,
        help: &str,
        short: Option<char>,
    ) -> Result<(), DefinitionError> {
        self.define(FlagType::Float, name, default, help, short, false)
    }

    pub fn define_integer(
        &mut self,
        name: &str,
        default: &str,
        help: &str,
        short: Option<char>,
    ) -> Result<(), DefinitionError> {
        self.define(FlagType::Integer, name, default, help, short, false)
    }

    pub fn define_unsigned(
        &mut self,
        name: &str,
        default: &str,
        help: &str,
        short: Option<char>,
    ) -> Result<(), DefinitionError> {
        self.define(FlagType::Unsigned, name, default, help, short, false)
    }

    pub fn define_string(
        &mut self,
        name: &str,
        default: &str,
        help: &str,
        short: Option<char>,
    ) -> Result<(), DefinitionError> {
        self.define(FlagType::String, name, default, help, short, false)
    }

    /// Checks shared by user and built-in definitions, then registration.
    fn insert(
        &mut self,
        flag_type: FlagType,
        name: &str,
        default: &str,
        help: &str,
        short: Option<char>,
        required: bool,
    ) -> Result<(), DefinitionError> {
        if let Some(c) = short {
            if !c.is_ascii_alphanumeric() {
                return Err(DefinitionError::InvalidShortName(c));
            }
        } else if !self.dialect.supports_long() {
            return Err(DefinitionError::ShortNameRequired(name.to_string()));
        }

        let canonical = canonical_name(name);
        let negated = format!("no{}", canonical);
        if self.is_defined(&canonical)
            || (flag_type == FlagType::Boolean && self.is_defined(&negated))
        {
            return Err(DefinitionError::DuplicateName(name.to_string()));
        }
        if let Some(c) = short {
            if self.by_short.contains_key(&c) {
                return Err(DefinitionError::DuplicateShortName(c));
            }
        }

        let default = FlagValue::parse(flag_type, default).map_err(|source| {
            DefinitionError::InvalidDefault {
                name: name.to_string(),
                source,
            }
        })?;

        let index = self.flags.len();
        self.by_name.insert(canonical.clone(), index);
        if let Some(c) = short {
            self.by_short.insert(c, index);
        }
        if flag_type == FlagType::Boolean {
            self.by_negated.insert(negated, index);
        }
        self.flags.push(Flag {
            name: canonical,
            display_name: name.to_string(),
            short,
            flag_type,
            value: default.clone(),
            default,
            help: help.to_string(),
            required,
        });
        debug!(flag = name, %flag_type, ?short, "defined flag");
        Ok(())
    }

    /// Whether `canonical` is taken by a flag or a negated alias.
    fn is_defined(&self, canonical: &str) -> bool {
        self.by_name.contains_key(canonical) || self.by_negated.contains_key(canonical)
    }

    /// Register the built-in `help` and `version` flags when missing.
    pub fn ensure_builtins(&mut self) {
        if !self.by_name.contains_key(HELP_FLAG) {
            let short = Some('h').filter(|c| !self.by_short.contains_key(c));
            if short.is_some() || self.dialect.supports_long() {
                let help = match short {
                    Some(_) => "show this help (-h)",
                    None => "show this help",
                };
                let registered =
                    self.insert(FlagType::Boolean, HELP_FLAG, "false", help, short, false);
                if let Err(err) = registered {
                    debug!(%err, "help flag not registered");
                }
            }
        }
        if self.program.version.is_some()
            && self.dialect.supports_long()
            && !self.by_name.contains_key(VERSION_FLAG)
        {
            if let Err(err) = self.insert(
                FlagType::Boolean,
                VERSION_FLAG,
                "false",
                "show version information",
                None,
                false,
            ) {
                debug!(%err, "version flag not registered");
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.by_name
            .get(&canonical_name(name))
            .and_then(|&index| self.flags.get(index))
    }

    /// Current value of the named flag.
    pub fn value(&self, name: &str) -> Option<&FlagValue> {
        self.lookup(name).map(Flag::value)
    }

    pub fn lookup_short(&self, short: char) -> Option<&Flag> {
        self.by_short
            .get(&short)
            .and_then(|&index| self.flags.get(index))
    }

    /// Resolve a `no<name>` alias to the boolean flag it negates.
    pub fn lookup_negated(&self, name: &str) -> Option<&Flag> {
        self.by_negated
            .get(&canonical_name(name))
            .and_then(|&index| self.flags.get(index))
    }

    /// Flags in definition order.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub(crate) fn flag_mut(&mut self, canonical: &str) -> Option<&mut Flag> {
        let index = *self.by_name.get(canonical)?;
        self.flags.get_mut(index)
    }

    /// Remove every flag and index. The dialect and program metadata stay.
    pub fn reset(&mut self) {
        self.flags.clear();
        self.by_name.clear();
        self.by_short.clear();
        self.by_negated.clear();
    }
}
