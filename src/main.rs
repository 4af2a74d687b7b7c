//! shflags - typed command-line flags for shell scripts.
//!
//! ```sh
//! eval_file=$(shflags parse --config "$FLAGS_CONFIG" -- "$@") && . "$eval_file"
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use shflags::{
    assignments, detect_dialect, error_and_exit, parse, text_and_exit, write_sourceable, Config,
    Dialect, GetoptCommand, HelpFormatter, InProcessGetopt, ParseOutcome, Registry, Splitter,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shflags", version, about, disable_help_subcommand = true)]
struct Cli {
    /// Log filter, e.g. "debug" or "shflags=trace"
    #[arg(long, global = true, env = "SHFLAGS_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse script arguments and print the path of a file to source
    Parse {
        #[command(flatten)]
        script: ScriptArgs,

        /// Prefix for exported variables [default: config prefix or FLAGS_]
        #[arg(long)]
        prefix: Option<String>,

        /// The script's own arguments, after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print the script's help text
    Help {
        #[command(flatten)]
        script: ScriptArgs,
    },

    /// Print which getopt dialect is available
    Dialect {
        #[command(flatten)]
        getopt: GetoptArgs,
    },
}

#[derive(Args, Debug)]
struct ScriptArgs {
    /// Flag definitions as JSON
    #[arg(long)]
    config: String,

    #[command(flatten)]
    getopt: GetoptArgs,
}

#[derive(Args, Debug)]
struct GetoptArgs {
    /// getopt program to run [default: $FLAGS_GETOPT_CMD or getopt]
    #[arg(long)]
    getopt_cmd: Option<String>,

    /// Split arguments in-process instead of running getopt
    #[arg(long, value_enum)]
    builtin: Option<BuiltinDialect>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BuiltinDialect {
    Standard,
    Enhanced,
}

impl From<BuiltinDialect> for Dialect {
    fn from(builtin: BuiltinDialect) -> Self {
        match builtin {
            BuiltinDialect::Standard => Dialect::Standard,
            BuiltinDialect::Enhanced => Dialect::Enhanced,
        }
    }
}

impl GetoptArgs {
    fn splitter(&self) -> Box<dyn Splitter> {
        match self.builtin {
            Some(builtin) => Box::new(InProcessGetopt::new(builtin.into())),
            None => Box::new(match self.getopt_cmd {
                Some(ref program) => GetoptCommand::new(program.as_str()),
                None => GetoptCommand::from_env(),
            }),
        }
    }
}

impl ScriptArgs {
    /// Load the config and define its flags for the detected dialect.
    fn load(&self, splitter: &dyn Splitter) -> Result<(Config, Registry)> {
        let config = Config::from_json(&self.config).context("failed to parse config JSON")?;
        let registry = config
            .build_registry(detect_dialect(splitter))
            .context("invalid flag definitions")?;
        Ok((config, registry))
    }
}

fn run_parse(script: &ScriptArgs, prefix: Option<&str>, args: &[String]) -> Result<()> {
    let splitter = script.getopt.splitter();
    let (config, mut registry) = script.load(splitter.as_ref())?;
    let prefix = prefix.unwrap_or_else(|| config.effective_prefix());

    let sourceable = match parse(&mut registry, splitter.as_ref(), args) {
        Ok(ParseOutcome::Success(residual)) => assignments(&registry, &residual, prefix)?,
        Ok(ParseOutcome::Help(text) | ParseOutcome::Version(text)) => text_and_exit(&text, 0),
        Err(err) => {
            tracing::debug!(%err, status = err.status(), "parse failed");
            error_and_exit(&err.to_string(), err.status())
        }
    };

    let path = write_sourceable(&sourceable)?;
    println!("{}", path.display());
    Ok(())
}

fn run_help(script: &ScriptArgs) -> Result<()> {
    let (_, mut registry) = script.load(script.getopt.splitter().as_ref())?;
    registry.ensure_builtins();
    print!("{}", HelpFormatter::new(&registry).render());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        Command::Parse {
            script,
            prefix,
            args,
        } => run_parse(&script, prefix.as_deref(), &args),
        Command::Help { script } => run_help(&script),
        Command::Dialect { getopt } => {
            println!("{}", detect_dialect(getopt.splitter().as_ref()));
            Ok(())
        }
    }
}
