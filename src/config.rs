//! JSON flag definitions for the command-line tool.

use crate::dialect::Dialect;
use crate::registry::{DefinitionError, FlagType, Program, Registry};
use serde::Deserialize;
use thiserror::Error;

/// Prefix for exported variables when the config sets none.
pub const DEFAULT_PREFIX: &str = "FLAGS_";

/// Errors that can occur during config parsing and registry building.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse JSON config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("flag '{flag}': {source}")]
    Definition {
        flag: String,
        #[source]
        source: DefinitionError,
    },
}

/// A default value written as a JSON string, number or boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultLiteral(pub String);

impl<'de> Deserialize<'de> for DefaultLiteral {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct LiteralVisitor;

        impl<'de> Visitor<'de> for LiteralVisitor {
            type Value = DefaultLiteral;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string, number or boolean")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value.to_string()))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value.to_string()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value.to_string()))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                // Debug keeps the fraction of whole numbers: 2.0, not 2.
                Ok(DefaultLiteral(format!("{:?}", value)))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value))
            }
        }

        deserializer.deserialize_any(LiteralVisitor)
    }
}

/// Configuration for a single flag.
#[derive(Debug, Clone, Deserialize)]
pub struct FlagConfig {
    /// Long name of the flag
    pub name: String,
    /// Type name, e.g. "boolean", "integer", "string"
    #[serde(rename = "type")]
    pub flag_type: String,
    /// Default value, validated against the type
    pub default: Option<DefaultLiteral>,
    /// Help text for this flag
    #[serde(default)]
    pub help: String,
    /// Short option character (e.g., 'v' for -v)
    pub short: Option<char>,
    /// Listed under the required heading in help; not enforced
    #[serde(default)]
    pub required: bool,
}

/// Top-level configuration for a script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Name of the script
    pub name: Option<String>,
    /// Usage line replacing the generated one
    pub usage: Option<String>,
    /// Description of the script
    pub description: Option<String>,
    /// Version of the script
    pub version: Option<String>,
    /// Project the script belongs to
    pub project: Option<String>,
    /// Copyright holder, printed with the version
    pub copyright: Option<String>,
    /// License notice, printed with the version
    pub license: Option<String>,
    /// Contact notice, printed at the end of help
    pub contact: Option<String>,
    /// Exported variable prefix (default: "FLAGS_")
    pub prefix: Option<String>,
    /// Flag definitions, in help order
    #[serde(default)]
    pub flags: Vec<FlagConfig>,
}

impl Config {
    /// Parse a JSON string into a Config.
    pub fn from_json(json: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Get the effective prefix, using the default if none is set.
    pub fn effective_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    pub fn program(&self) -> Program {
        Program {
            name: self.name.clone(),
            usage: self.usage.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            project: self.project.clone(),
            copyright: self.copyright.clone(),
            license: self.license.clone(),
            contact: self.contact.clone(),
        }
    }

    /// Define every flag in a fresh registry for `dialect`.
    ///
    /// Stops at the first definition error.
    pub fn build_registry(&self, dialect: Dialect) -> Result<Registry, ConfigError> {
        let mut registry = Registry::new(dialect).with_program(self.program());
        for flag in &self.flags {
            flag.define(&mut registry)
                .map_err(|source| ConfigError::Definition {
                    flag: flag.name.clone(),
                    source,
                })?;
        }
        Ok(registry)
    }
}

impl FlagConfig {
    fn define(&self, registry: &mut Registry) -> Result<(), DefinitionError> {
        let flag_type: FlagType = self.flag_type.parse()?;
        let default = self
            .default
            .as_ref()
            .ok_or(DefinitionError::MissingArgument("default"))?;
        registry.define(
            flag_type,
            &self.name,
            &default.0,
            &self.help,
            self.short,
            self.required,
        )
    }
}
