//! A getopt(1) work-alike that runs in-process.
//!
//! Accepts the same arguments as the external command for either dialect
//! and produces the same output: enhanced output quotes values for the
//! shell and moves non-option arguments after `--`; standard output is
//! unquoted and stops at the first non-option.

use crate::dialect::{Dialect, DialectError, Splitter};
use std::collections::HashMap;

/// Whether an option takes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HasArg {
    No,
    Required,
    Optional,
}

/// Parsed getopt option descriptions.
#[derive(Debug, Default)]
struct Options {
    short: HashMap<char, HasArg>,
    long: Vec<(String, HasArg)>,
    /// Stop at the first non-option instead of permuting.
    posix: bool,
}

impl Options {
    fn new(short: &str, long: &[String]) -> Self {
        let mut options = Options {
            posix: short.starts_with('+'),
            ..Options::default()
        };
        let chars: Vec<char> = short.trim_start_matches(['+', '-']).chars().collect();
        let mut i = 0;
        while let Some(&c) = chars.get(i) {
            let colons = chars[i + 1..].iter().take(2).take_while(|&&n| n == ':').count();
            let has_arg = match colons {
                0 => HasArg::No,
                1 => HasArg::Required,
                _ => HasArg::Optional,
            };
            options.short.insert(c, has_arg);
            i += 1 + colons;
        }
        for entry in long {
            for name in entry.split(',').filter(|n| !n.is_empty()) {
                let (bare, has_arg) = if let Some(n) = name.strip_suffix("::") {
                    (n, HasArg::Optional)
                } else if let Some(n) = name.strip_suffix(':') {
                    (n, HasArg::Required)
                } else {
                    (name, HasArg::No)
                };
                options.long.push((bare.to_string(), has_arg));
            }
        }
        options
    }

    /// Exact match, or the only option starting with `name`.
    fn find_long(&self, name: &str) -> Result<(&str, HasArg), String> {
        if let Some((n, has_arg)) = self.long.iter().find(|(n, _)| n == name) {
            return Ok((n.as_str(), *has_arg));
        }
        let candidates: Vec<&(String, HasArg)> =
            self.long.iter().filter(|(n, _)| n.starts_with(name)).collect();
        match candidates.as_slice() {
            [(n, has_arg)] => Ok((n.as_str(), *has_arg)),
            [] => Err(format!("unrecognized option '--{}'", name)),
            many => {
                let names: Vec<String> = many.iter().map(|(n, _)| format!("'--{}'", n)).collect();
                Err(format!(
                    "option '--{}' is ambiguous; possibilities: {}",
                    name,
                    names.join(" ")
                ))
            }
        }
    }
}

/// One piece of getopt output.
enum Piece {
    Opt(String),
    Value(String),
}

/// In-process getopt speaking one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InProcessGetopt {
    dialect: Dialect,
}

impl InProcessGetopt {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn reject(&self, message: String) -> DialectError {
        DialectError::Rejected {
            status: 1,
            message: format!("getopt: {}", message),
        }
    }

    fn run_standard(&self, invocation: &[String]) -> Result<String, DialectError> {
        let (optstring, args) = invocation
            .split_first()
            .ok_or_else(|| self.reject("missing optstring argument".to_string()))?;
        let options = Options {
            posix: true,
            ..Options::new(optstring, &[])
        };
        let (pieces, rest) = self.scan(&options, args)?;
        Ok(render(&pieces, &rest, |s| s.to_string()))
    }

    fn run_enhanced(&self, invocation: &[String]) -> Result<String, DialectError> {
        let mut short: Option<String> = None;
        let mut long = Vec::new();
        let mut i = 0;
        let mut params: &[String] = &[];
        while let Some(arg) = invocation.get(i) {
            let next = invocation.get(i + 1);
            match arg.as_str() {
                "--" => {
                    params = &invocation[i + 1..];
                    break;
                }
                "-o" | "--options" => {
                    short = Some(next.cloned().unwrap_or_default());
                    i += 2;
                }
                "-l" | "--longoptions" => {
                    long.push(next.cloned().unwrap_or_default());
                    i += 2;
                }
                a if a.starts_with("--options=") => {
                    short = Some(a["--options=".len()..].to_string());
                    i += 1;
                }
                a if a.starts_with("--longoptions=") => {
                    long.push(a["--longoptions=".len()..].to_string());
                    i += 1;
                }
                a if a.starts_with("-o") => {
                    short = Some(a[2..].to_string());
                    i += 1;
                }
                a if a.starts_with("-l") => {
                    long.push(a[2..].to_string());
                    i += 1;
                }
                _ => {
                    params = &invocation[i..];
                    break;
                }
            }
        }

        // Without -o the first parameter is the short option string.
        let (short, args) = match short {
            Some(short) => (short, params),
            None => match params.split_first() {
                Some((first, rest)) => (first.clone(), rest),
                None => return Err(self.reject("missing optstring argument".to_string())),
            },
        };

        let options = Options::new(&short, &long);
        let (pieces, rest) = self.scan(&options, args)?;
        Ok(render(&pieces, &rest, quote))
    }

    /// Split `args` into option pieces and non-option arguments.
    fn scan(
        &self,
        options: &Options,
        args: &[String],
    ) -> Result<(Vec<Piece>, Vec<String>), DialectError> {
        let mut pieces = Vec::new();
        let mut rest = Vec::new();
        let mut args_iter = args.iter();

        while let Some(arg) = args_iter.next() {
            if arg == "--" {
                rest.extend(args_iter.by_ref().cloned());
                break;
            }

            if self.dialect.supports_long() && arg.starts_with("--") {
                self.scan_long(options, &arg[2..], &mut args_iter, &mut pieces)?;
            } else if arg.starts_with('-') && arg.len() > 1 {
                self.scan_short(options, &arg[1..], &mut args_iter, &mut pieces)?;
            } else if options.posix {
                rest.push(arg.clone());
                rest.extend(args_iter.by_ref().cloned());
                break;
            } else {
                rest.push(arg.clone());
            }
        }

        Ok((pieces, rest))
    }

    fn scan_long<'a>(
        &self,
        options: &Options,
        option_str: &str,
        args_iter: &mut impl Iterator<Item = &'a String>,
        pieces: &mut Vec<Piece>,
    ) -> Result<(), DialectError> {
        let (name, inline_value) = match option_str.split_once('=') {
            Some((n, v)) => (n, Some(v)),
            None => (option_str, None),
        };

        let (long, has_arg) = options.find_long(name).map_err(|msg| self.reject(msg))?;
        pieces.push(Piece::Opt(format!("--{}", long)));

        match has_arg {
            HasArg::No => {
                if inline_value.is_some() {
                    return Err(
                        self.reject(format!("option '--{}' doesn't allow an argument", long))
                    );
                }
            }
            HasArg::Required => {
                let value = match inline_value {
                    Some(v) => v.to_string(),
                    None => args_iter.next().cloned().ok_or_else(|| {
                        self.reject(format!("option '--{}' requires an argument", long))
                    })?,
                };
                pieces.push(Piece::Value(value));
            }
            HasArg::Optional => {
                pieces.push(Piece::Value(inline_value.unwrap_or_default().to_string()));
            }
        }
        Ok(())
    }

    fn scan_short<'a>(
        &self,
        options: &Options,
        cluster: &str,
        args_iter: &mut impl Iterator<Item = &'a String>,
        pieces: &mut Vec<Piece>,
    ) -> Result<(), DialectError> {
        for (i, c) in cluster.char_indices() {
            let has_arg = options
                .short
                .get(&c)
                .copied()
                .ok_or_else(|| self.reject(self.short_message("invalid option", c)))?;
            pieces.push(Piece::Opt(format!("-{}", c)));

            let remaining = &cluster[i + c.len_utf8()..];
            match has_arg {
                HasArg::No => {}
                HasArg::Required => {
                    // The value is the rest of this argument (-ofile) or the next one.
                    let value = if !remaining.is_empty() {
                        remaining.to_string()
                    } else {
                        args_iter.next().cloned().ok_or_else(|| {
                            self.reject(self.short_message("option requires an argument", c))
                        })?
                    };
                    pieces.push(Piece::Value(value));
                    return Ok(());
                }
                HasArg::Optional => {
                    pieces.push(Piece::Value(remaining.to_string()));
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn short_message(&self, what: &str, c: char) -> String {
        match self.dialect {
            Dialect::Standard if what == "invalid option" => format!("illegal option -- {}", c),
            Dialect::Standard => format!("{} -- {}", what, c),
            Dialect::Enhanced => format!("{} -- '{}'", what, c),
        }
    }
}

impl Splitter for InProcessGetopt {
    fn split(&self, invocation: &[String]) -> Result<String, DialectError> {
        match self.dialect {
            Dialect::Standard => self.run_standard(invocation),
            Dialect::Enhanced => self.run_enhanced(invocation),
        }
    }
}

/// Single-quote `value` for the shell, the way enhanced getopt does.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn render(pieces: &[Piece], rest: &[String], value: impl Fn(&str) -> String) -> String {
    let mut out = String::new();
    for piece in pieces {
        out.push(' ');
        match piece {
            Piece::Opt(opt) => out.push_str(opt),
            Piece::Value(v) => out.push_str(&value(v)),
        }
    }
    out.push_str(" --");
    for arg in rest {
        out.push(' ');
        out.push_str(&value(arg));
    }
    out.push('\n');
    out
}
