//! Help and version text generation.

use crate::dialect::Dialect;
use crate::registry::{Flag, FlagValue, Registry, HELP_FLAG, VERSION_FLAG};

/// Width used when the terminal size is unknown.
pub const DEFAULT_COLUMNS: usize = 80;

/// Flags listed under the standard heading.
const STANDARD_FLAGS: &[&str] = &[HELP_FLAG, VERSION_FLAG, "usage", "verbose"];

/// Width of the terminal, from `COLUMNS`, falling back to 80.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|&c| c > 0)
        .unwrap_or(DEFAULT_COLUMNS)
}

/// Renders usage text for a registry.
pub struct HelpFormatter<'a> {
    registry: &'a Registry,
    dialect: Dialect,
    width: usize,
}

impl<'a> HelpFormatter<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self::with_width(registry, terminal_width())
    }

    pub fn with_width(registry: &'a Registry, width: usize) -> Self {
        Self {
            registry,
            dialect: registry.dialect(),
            width,
        }
    }

    /// Full usage listing: usage line, description and grouped flags.
    pub fn render(&self) -> String {
        let program = self.registry.program();
        let mut out = match program.usage {
            Some(ref usage) => format!("{}\n", usage),
            None => format!(
                "USAGE: {} [flags] args\n",
                program.name.as_deref().unwrap_or("script")
            ),
        };
        if let Some(ref description) = program.description {
            out.push('\n');
            out.push_str(description);
            out.push('\n');
        }

        let (mut required, mut optional, mut standard) = (Vec::new(), Vec::new(), Vec::new());
        for flag in self.registry.flags() {
            if STANDARD_FLAGS.contains(&flag.name()) {
                standard.push(flag);
            } else if flag.required() {
                required.push(flag);
            } else {
                optional.push(flag);
            }
        }

        for (heading, group) in [
            ("Required flags:", required),
            ("Optional flags:", optional),
            ("Standard flags:", standard),
        ] {
            if group.is_empty() {
                continue;
            }
            let column = group
                .iter()
                .map(|flag| self.label(flag).chars().count())
                .max()
                .unwrap_or(0);
            out.push('\n');
            out.push_str(heading);
            out.push('\n');
            for flag in group {
                out.push_str(&self.render_flag(flag, column));
            }
        }
        if let Some(contact) = nonempty(&program.contact) {
            out.push_str(&format!("\nContact:\n  {}\n", contact));
        }
        out
    }

    /// `-x` for the standard dialect, `-x,--[no]name` for the enhanced one.
    pub fn label(&self, flag: &Flag) -> String {
        let mut label = String::new();
        if let Some(c) = flag.short() {
            label.push('-');
            label.push(c);
        }
        if self.dialect.supports_long() {
            if !label.is_empty() {
                label.push(',');
            }
            label.push_str("--");
            if flag.is_boolean() && !flag.is_builtin() {
                label.push_str("[no]");
            }
            label.push_str(flag.display_name());
        }
        label
    }

    /// One flag, padded to `column`, wrapped to the terminal width.
    pub fn render_flag(&self, flag: &Flag, column: usize) -> String {
        let label = self.label(flag);
        let mut head = format!("  {:<column$}", label, column = column);
        if !flag.help().is_empty() {
            head.push_str("  ");
            head.push_str(flag.help());
        }

        let Some(default) = default_string(flag) else {
            return format!("{}\n", head.trim_end());
        };

        let line = format!("{}  {}", head, default);
        if line.chars().count() <= self.width {
            return format!("{}\n", line);
        }

        let pad = column.max(label.chars().count()) + 4;
        let indented = format!("{:pad$}{}", "", default, pad = pad);
        if self.dialect == Dialect::Standard || indented.chars().count() <= self.width {
            format!("{}\n{}\n", head.trim_end(), indented)
        } else {
            format!("{}\n    {}\n", head.trim_end(), default)
        }
    }
}

/// `(value)` for a flag's default, or nothing for help and version.
fn default_string(flag: &Flag) -> Option<String> {
    if flag.is_builtin() {
        return None;
    }
    let value = match flag.default_value() {
        FlagValue::String(s) => format!("'{}'", s),
        other => other.to_string(),
    };
    Some(format!("({})", value))
}

fn nonempty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// `<name> [(<project>)] <version>`, then the copyright and license notices.
pub fn render_version(registry: &Registry) -> String {
    let program = registry.program();
    let mut out = program.name.clone().unwrap_or_else(|| "script".to_string());
    if let Some(project) = nonempty(&program.project) {
        out.push_str(&format!(" ({})", project));
    }
    if let Some(version) = nonempty(&program.version) {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');
    if let Some(copyright) = nonempty(&program.copyright) {
        out.push_str(&format!("Copyright (c) {}. All rights reserved.\n", copyright));
    }
    if let Some(license) = nonempty(&program.license) {
        out.push_str(license);
        out.push('\n');
    }
    out
}
