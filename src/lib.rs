//! shflags - typed command-line flags for shell scripts.
//!
//! Flags are declared in a [`Registry`], split by a getopt [`Splitter`]
//! speaking the detected [`Dialect`], and parsed into typed values. Help
//! text, version text and sourceable shell output are generated from the
//! same registry.

pub mod config;
pub mod dialect;
pub mod getopt;
pub mod help;
pub mod output;
pub mod parser;
pub mod registry;
pub mod validate;

pub use config::{Config, ConfigError, FlagConfig};
pub use dialect::{
    detect_dialect, Dialect, DialectAdapter, DialectError, GetoptCommand, OptionSpec, Splitter,
    GETOPT_CMD_ENV,
};
pub use getopt::InProcessGetopt;
pub use help::{render_version, terminal_width, HelpFormatter};
pub use output::{assignments, error_and_exit, text_and_exit, write_sourceable};
pub use parser::{
    parse, parse_or_exit, ArgParser, ParseError, ParseOutcome, ParseStatus, Residual,
    FATAL_STATUS,
};
pub use registry::{DefinitionError, Flag, FlagType, FlagValue, Program, Registry};
pub use validate::{validate, ValidationError};
