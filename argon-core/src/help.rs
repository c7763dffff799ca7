//! Generated help and version text.

use std::fmt::Write;

use crate::command::{CommandSpec, CommandTable};
use crate::options::EngineOptions;

/// Overview help: the commands available under a path prefix.
pub fn render_help(table: &CommandTable, prefix: &[String], options: &EngineOptions) -> String {
    let mut out = String::new();

    let scope = if prefix.is_empty() {
        options.name.clone()
    } else {
        format!("{} {}", options.name, prefix.join(" "))
    };
    let _ = writeln!(out, "Usage: {} <command> [arguments]", scope);
    let _ = writeln!(out);
    let _ = writeln!(out, "Commands:");

    let mut rows: Vec<(String, String)> = Vec::new();
    for spec in table.under_prefix(prefix) {
        let name = if spec.is_root() {
            "(root)".to_string()
        } else {
            spec.path().join(" ")
        };
        rows.push((name, spec.summary().to_string()));
    }

    let width = rows.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    for (name, summary) in rows {
        let _ = writeln!(out, "  {:width$}  {}", name, summary, width = width);
    }

    out
}

/// Detailed help for a single command.
pub fn render_command_help(spec: &CommandSpec, options: &EngineOptions) -> String {
    let mut out = String::new();

    let mut usage = options.name.clone();
    if !spec.is_root() {
        usage.push(' ');
        usage.push_str(&spec.path().join(" "));
    }
    for param in spec.params() {
        if param.is_service() {
            continue;
        }
        if param.is_rest() {
            let _ = write!(usage, " [{}...]", param.name());
        } else if param.is_required() {
            let _ = write!(usage, " <{}>", param.name());
        } else if param.is_boolean() {
            let _ = write!(usage, " [--{}]", param.name());
        } else {
            let _ = write!(usage, " [--{} <value>]", param.name());
        }
    }
    let _ = writeln!(out, "Usage: {}", usage);

    if !spec.summary().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", spec.summary());
    }

    let visible: Vec<_> = spec.params().iter().filter(|p| !p.is_service()).collect();
    if !visible.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Parameters:");
        let mut rows: Vec<(String, String)> = Vec::new();
        for param in &visible {
            let mut names = format!("--{}", param.name());
            if let Some(long) = param.long_alias() {
                let _ = write!(names, ", --{}", long);
            }
            if let Some(short) = param.short_alias() {
                let _ = write!(names, ", -{}", short);
            }

            let mut detail = param.tag().to_string();
            if let Some(default) = param.default_value() {
                let _ = write!(detail, " (default: {})", default.render());
            }
            if param.is_required() {
                detail.push_str(" [required]");
            }
            rows.push((names, detail));
        }

        let width = rows.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        for (names, detail) in rows {
            let _ = writeln!(out, "  {:width$}  {}", names, detail, width = width);
        }
    }

    out
}

pub fn render_version(options: &EngineOptions) -> String {
    format!("{} {}", options.name, options.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::binder::BoundArgs;
    use crate::command::{CommandHandler, ParamSpec};
    use crate::context::InvocationContext;
    use crate::error::Result;
    use crate::value::{ArgValue, TypeTag};

    struct NoopHandler;

    #[async_trait]
    impl CommandHandler for NoopHandler {
        async fn invoke(&self, _ctx: &InvocationContext, _args: &BoundArgs) -> Result<i32> {
            Ok(0)
        }
    }

    #[test]
    fn command_help_lists_parameters() {
        let spec = CommandSpec::new(&["greet"], "Print a greeting", Arc::new(NoopHandler))
            .with_param(ParamSpec::new("name", TypeTag::String))
            .with_param(
                ParamSpec::new("repeat", TypeTag::Integer)
                    .with_short('r')
                    .with_default(ArgValue::Integer(1)),
            );

        let text = render_command_help(&spec, &EngineOptions::default());
        assert!(text.contains("Usage: argon greet <name>"));
        assert!(text.contains("--name"));
        assert!(text.contains("[required]"));
        assert!(text.contains("-r"));
        assert!(text.contains("default: 1"));
    }

    #[test]
    fn overview_lists_commands_under_prefix() {
        let table = CommandTable::new()
            .register(CommandSpec::new(&["calc", "sum"], "Add numbers", Arc::new(NoopHandler)))
            .unwrap()
            .register(CommandSpec::new(&["echo"], "Echo text", Arc::new(NoopHandler)))
            .unwrap();

        let all = render_help(&table, &[], &EngineOptions::default());
        assert!(all.contains("calc sum"));
        assert!(all.contains("echo"));

        let scoped = render_help(&table, &["calc".to_string()], &EngineOptions::default());
        assert!(scoped.contains("calc sum"));
        assert!(!scoped.contains("echo"));
    }
}
