//! Shell scripts that carry a parse result back into the calling shell.
//!
//! Every script is written to a temporary file whose path the binary prints;
//! the caller sources it with `. "$(shflags parse ...)"`.

use crate::parser::Residual;
use crate::registry::{FlagValue, Registry};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;

/// Terminates heredocs holding help or version text.
const HEREDOC_END: &str = "__SHFLAGS_EOF__";

/// `value` wrapped in double quotes, with the characters the shell would
/// still expand inside them escaped.
fn double_quoted(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '$' | '`' | '\\' | '"' | '!') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Shell form of a value. Booleans use shell truth: 0 is true.
fn shell_value(value: &FlagValue) -> String {
    match value {
        FlagValue::Boolean(true) => "0".to_string(),
        FlagValue::Boolean(false) => "1".to_string(),
        other => other.to_string(),
    }
}

/// Script assigning every flag and restoring the positional arguments.
///
/// Sourcing it exports `<prefix><name>` per flag, the `<prefix>TRUE` and
/// `<prefix>FALSE` constants, `<prefix>ARGC` and `<prefix>ARGV`, then
/// resets `$@` to the positionals.
pub fn assignments(registry: &Registry, residual: &Residual, prefix: &str) -> Result<String> {
    let argv = residual
        .quoted()
        .context("positional arguments cannot be quoted for the shell")?;

    let mut lines = vec![
        format!("export {prefix}TRUE=0"),
        format!("export {prefix}FALSE=1"),
    ];
    lines.extend(registry.flags().iter().map(|flag| {
        format!(
            "export {prefix}{}={}",
            flag.name(),
            double_quoted(&shell_value(flag.value()))
        )
    }));
    let argc = residual.legacy_argc().to_string();
    lines.push(format!("export {prefix}ARGC={}", double_quoted(&argc)));
    lines.push(format!("export {prefix}ARGV={}", double_quoted(&argv)));
    lines.push(format!("set -- {argv}"));

    let mut script = lines.join("\n");
    script.push('\n');
    Ok(script)
}

/// Script printing `text` verbatim to stdout, then exiting with `status`.
pub fn text_and_exit(text: &str, status: i32) -> String {
    let mut script = format!("cat <<'{HEREDOC_END}'\n{text}");
    if !text.ends_with('\n') {
        script.push('\n');
    }
    script.push_str(&format!("{HEREDOC_END}\nexit {status}\n"));
    script
}

/// Script reporting `message` on stderr, then exiting with `status`.
pub fn error_and_exit(message: &str, status: i32) -> String {
    format!(
        "echo {} >&2\nexit {status}\n",
        double_quoted(&format!("shflags: {message}"))
    )
}

/// Persist `script` to a temporary file the caller can source.
///
/// The file outlives the process; removing it is up to the caller.
pub fn write_sourceable(script: &str) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("shflags-")
        .suffix(".sh")
        .tempfile()
        .context("failed to create output file")?;
    file.write_all(script.as_bytes())
        .context("failed to write output file")?;
    let path = file
        .into_temp_path()
        .keep()
        .context("failed to keep output file")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::getopt::InProcessGetopt;
    use crate::parser::{parse, ParseOutcome};

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    /// Define `(name, default)` string flags and parse `argv`.
    fn parsed(flags: &[(&str, &str)], argv: &[&str]) -> (Registry, Residual) {
        let mut registry = Registry::new(Dialect::Enhanced);
        for (name, default) in flags {
            registry.define_string(name, default, "", None).unwrap();
        }
        let getopt = InProcessGetopt::new(Dialect::Enhanced);
        match parse(&mut registry, &getopt, &args(argv)).unwrap() {
            ParseOutcome::Success(residual) => (registry, residual),
            other => panic!("Expected Success, got {:?}", other),
        }
    }

    fn script_for(flags: &[(&str, &str)], argv: &[&str]) -> String {
        let (registry, residual) = parsed(flags, argv);
        assignments(&registry, &residual, "FLAGS_").unwrap()
    }

    #[test]
    fn test_assignments_cover_every_flag() {
        let mut registry = Registry::new(Dialect::Enhanced);
        registry.define_boolean("verbose", "false", "", Some('v')).unwrap();
        registry.define_string("output", "a.txt", "", Some('o')).unwrap();
        let getopt = InProcessGetopt::new(Dialect::Enhanced);
        let residual = match parse(&mut registry, &getopt, &args(&["-v", "in.txt"])).unwrap() {
            ParseOutcome::Success(residual) => residual,
            other => panic!("Expected Success, got {:?}", other),
        };
        let script = assignments(&registry, &residual, "FLAGS_").unwrap();

        assert!(script.starts_with("export FLAGS_TRUE=0\nexport FLAGS_FALSE=1\n"));
        assert!(script.contains("export FLAGS_verbose=\"0\"\n"));
        assert!(script.contains("export FLAGS_output=\"a.txt\"\n"));
        assert!(script.contains("export FLAGS_help=\"1\"\n"));
        assert!(script.contains("export FLAGS_ARGC=\"1\"\n"));
        assert!(script.ends_with("set -- in.txt\n"));
    }

    #[test]
    fn test_expansions_are_escaped() {
        let script = script_for(
            &[("path", "x"), ("cmd", "x"), ("msg", "x")],
            &["--path", "$HOME/bin", "--cmd", "`id`", "--msg", "say \"hi\"!"],
        );
        assert!(script.contains(r#"export FLAGS_path="\$HOME/bin""#));
        assert!(script.contains(r#"export FLAGS_cmd="\`id\`""#));
        assert!(script.contains(r#"export FLAGS_msg="say \"hi\"\!""#));
    }

    #[test]
    fn test_newlines_stay_literal() {
        let script = script_for(&[("text", "x")], &["--text", "line1\nline2"]);
        assert!(script.contains("export FLAGS_text=\"line1\nline2\"\n"));
    }

    #[test]
    fn test_prefix_and_canonical_names() {
        let (registry, residual) = parsed(&[("my-option", "value")], &[]);
        let script = assignments(&registry, &residual, "MYAPP_").unwrap();
        assert!(script.contains("export MYAPP_my_option=\"value\""));
        assert!(script.contains("export MYAPP_ARGC=\"0\""));
        assert!(!script.contains("FLAGS_"));
    }

    #[test]
    fn test_positionals_are_requoted() {
        let script = script_for(&[], &["--", "two words", "it's"]);
        let line = script.lines().last().unwrap();
        let words = shlex::split(line.strip_prefix("set -- ").unwrap()).unwrap();
        assert_eq!(words, args(&["two words", "it's"]));
    }

    #[test]
    fn test_error_and_exit() {
        let script = error_and_exit("unrecognized option ($foo)", 2);
        assert_eq!(
            script,
            "echo \"shflags: unrecognized option (\\$foo)\" >&2\nexit 2\n"
        );
    }

    #[test]
    fn test_text_and_exit() {
        let script = text_and_exit("USAGE: tool [flags] args\n", 0);
        assert_eq!(
            script,
            "cat <<'__SHFLAGS_EOF__'\nUSAGE: tool [flags] args\n__SHFLAGS_EOF__\nexit 0\n"
        );
        assert!(text_and_exit("tool 1.0", 0).contains("tool 1.0\n__SHFLAGS_EOF__\n"));
    }

    #[test]
    fn test_write_sourceable_keeps_file() {
        let path = write_sourceable("exit 0\n").unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("shflags-") && n.ends_with(".sh")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "exit 0\n");
        std::fs::remove_file(path).unwrap();
    }
}
