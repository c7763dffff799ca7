//! Command descriptors and the command table.
//!
//! A `CommandSpec` is the immutable description of one command: its path,
//! ordered parameter specs, summary text, filters, and the handler that
//! implements the body. The `CommandTable` is the read-only collection the
//! dispatcher consults; every structural check happens when the table is
//! built, before any dispatch.

use std::any::{Any, TypeId};
use std::sync::Arc;

use async_trait::async_trait;

use crate::binder::BoundArgs;
use crate::context::InvocationContext;
use crate::error::{ArgonError, Result};
use crate::filter::CommandFilter;
use crate::validate::ValidationRule;
use crate::value::{ArgValue, TypeTag};

/// The bitmask recording supplied parameters is a u64, so a command may
/// declare at most this many parameters.
pub const MAX_PARAMS: usize = 64;

/// Trait implemented by command bodies.
///
/// The handler receives the invocation context (command path, raw args,
/// cooperative cancellation token) and the fully bound arguments, and
/// returns the process exit code.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn invoke(&self, ctx: &InvocationContext, args: &BoundArgs) -> Result<i32>;
}

/// Identity of an injected service, resolved by type from the locator.
#[derive(Debug, Clone, Copy)]
pub struct ServiceKey {
    pub id: TypeId,
    pub type_name: &'static str,
}

/// Declared shape and constraints of one command parameter.
#[derive(Clone)]
pub struct ParamSpec {
    name: String,
    tag: TypeTag,
    default: Option<ArgValue>,
    rules: Vec<ValidationRule>,
    short: Option<char>,
    long: Option<String>,
    rest: bool,
    service: Option<ServiceKey>,
}

impl ParamSpec {
    pub fn new(name: &str, tag: TypeTag) -> Self {
        Self {
            name: name.to_string(),
            tag,
            default: None,
            rules: Vec::new(),
            short: None,
            long: None,
            rest: false,
            service: None,
        }
    }

    /// A trailing rest collector: consumes every remaining token, each
    /// converted with the element type.
    pub fn rest(name: &str, elem: TypeTag) -> Self {
        let mut spec = Self::new(name, TypeTag::Array(Box::new(elem)));
        spec.rest = true;
        spec
    }

    /// An injected-service parameter, resolved from the locator by type.
    pub fn service<T: Any + Send + Sync>(name: &str) -> Self {
        let mut spec = Self::new(name, TypeTag::Service(std::any::type_name::<T>()));
        spec.service = Some(ServiceKey {
            id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        });
        spec
    }

    pub fn with_default(mut self, value: ArgValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Short alias, matched case-sensitively as `-x`.
    pub fn with_short(mut self, alias: char) -> Self {
        self.short = Some(alias);
        self
    }

    /// Long alias, matched case-insensitively as `--alias`.
    pub fn with_long(mut self, alias: &str) -> Self {
        self.long = Some(alias.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    pub fn default_value(&self) -> Option<&ArgValue> {
        self.default.as_ref()
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn short_alias(&self) -> Option<char> {
        self.short
    }

    pub fn long_alias(&self) -> Option<&str> {
        self.long.as_deref()
    }

    pub fn is_rest(&self) -> bool {
        self.rest
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.tag, TypeTag::Boolean)
    }

    pub fn is_service(&self) -> bool {
        self.service.is_some()
    }

    pub fn service_key(&self) -> Option<&ServiceKey> {
        self.service.as_ref()
    }

    /// Required-ness is derived: no default, and not a boolean, optional,
    /// rest, or service parameter.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
            && !self.is_boolean()
            && !self.rest
            && !self.is_service()
            && !matches!(self.tag, TypeTag::Optional(_))
    }

    /// Whether a `--name` token addresses this parameter. The parameter's
    /// own name and its long alias both match, case-insensitively.
    pub fn matches_long(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.long.as_deref().is_some_and(|l| l.eq_ignore_ascii_case(name))
    }

    pub fn matches_short(&self, alias: char) -> bool {
        self.short == Some(alias)
    }
}

/// Immutable metadata and invocation handle for one command.
#[derive(Clone)]
pub struct CommandSpec {
    path: Vec<String>,
    summary: String,
    params: Vec<ParamSpec>,
    filters: Vec<Arc<dyn CommandFilter>>,
    handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    /// Create a command at the given path. An empty path declares the
    /// root command.
    pub fn new(path: &[&str], summary: &str, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            summary: summary.to_string(),
            params: Vec::new(),
            filters: Vec::new(),
            handler,
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Attach a filter. Filters wrap the body in declaration order; the
    /// declaration producer flattens any outer scoping into this list.
    pub fn with_filter(mut self, filter: Arc<dyn CommandFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn filters(&self) -> &[Arc<dyn CommandFilter>] {
        &self.filters
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    /// Human-readable form of the path, `(root)` for the root command.
    pub fn display_path(&self) -> String {
        if self.path.is_empty() {
            "(root)".to_string()
        } else {
            self.path.join(" ")
        }
    }

    /// Structural checks for a single command, run at table build time.
    fn check(&self) -> Result<()> {
        if self.params.len() > MAX_PARAMS {
            return Err(ArgonError::Config(format!(
                "command '{}' declares {} parameters, the maximum is {}",
                self.display_path(),
                self.params.len(),
                MAX_PARAMS
            )));
        }

        for (i, param) in self.params.iter().enumerate() {
            // Name and alias collisions within the command
            for other in &self.params[i + 1..] {
                let clash = other.matches_long(param.name())
                    || param
                        .long_alias()
                        .is_some_and(|l| other.matches_long(l))
                    || (param.short_alias().is_some() && param.short_alias() == other.short_alias());
                if clash {
                    return Err(ArgonError::Config(format!(
                        "command '{}': parameters '{}' and '{}' have colliding names or aliases",
                        self.display_path(),
                        param.name(),
                        other.name()
                    )));
                }
            }

            if param.is_rest() && i + 1 != self.params.len() {
                return Err(ArgonError::Config(format!(
                    "command '{}': rest collector '{}' must be the last parameter",
                    self.display_path(),
                    param.name()
                )));
            }

            if param.is_service() && (param.default_value().is_some() || !param.rules().is_empty()) {
                return Err(ArgonError::Config(format!(
                    "command '{}': service parameter '{}' cannot carry defaults or rules",
                    self.display_path(),
                    param.name()
                )));
            }

            if let TypeTag::Enum(allowed) = param.tag() {
                if allowed.is_empty() {
                    return Err(ArgonError::Config(format!(
                        "command '{}': enum parameter '{}' has no allowed values",
                        self.display_path(),
                        param.name()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Static, immutable mapping from command path to command spec.
///
/// Produced once by the external declaration layer; the engine only reads
/// it. Duplicate paths are rejected here, before any dispatch occurs.
#[derive(Clone, Default)]
pub struct CommandTable {
    commands: Vec<Arc<CommandSpec>>,
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field(
                "commands",
                &self.commands.iter().map(|c| c.display_path()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command, running its structural checks.
    pub fn register(mut self, spec: CommandSpec) -> Result<Self> {
        spec.check()?;

        if self.find(spec.path()).is_some() {
            return Err(ArgonError::Config(format!(
                "duplicate command: {}",
                spec.display_path()
            )));
        }

        self.commands.push(Arc::new(spec));
        Ok(self)
    }

    pub fn commands(&self) -> &[Arc<CommandSpec>] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Exact path lookup, segment-by-segment case-insensitive.
    pub fn find(&self, path: &[String]) -> Option<&Arc<CommandSpec>> {
        self.commands.iter().find(|c| paths_equal(c.path(), path))
    }

    pub fn root(&self) -> Option<&Arc<CommandSpec>> {
        self.commands.iter().find(|c| c.is_root())
    }

    /// Whether any command's path starts with the given segments.
    pub fn has_prefix(&self, prefix: &[String]) -> bool {
        self.commands.iter().any(|c| {
            c.path().len() >= prefix.len() && paths_equal(&c.path()[..prefix.len()], prefix)
        })
    }

    /// Every command under a path prefix, in registration order.
    pub fn under_prefix<'a>(&'a self, prefix: &'a [String]) -> impl Iterator<Item = &'a Arc<CommandSpec>> {
        self.commands.iter().filter(move |c| {
            c.path().len() >= prefix.len() && paths_equal(&c.path()[..prefix.len()], prefix)
        })
    }
}

fn paths_equal(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    #[async_trait]
    impl CommandHandler for NoopHandler {
        async fn invoke(&self, _ctx: &InvocationContext, _args: &BoundArgs) -> Result<i32> {
            Ok(0)
        }
    }

    fn handler() -> Arc<dyn CommandHandler> {
        Arc::new(NoopHandler)
    }

    #[test]
    fn duplicate_paths_are_rejected_at_build_time() {
        let table = CommandTable::new()
            .register(CommandSpec::new(&["echo"], "", handler()))
            .unwrap();

        let err = table
            .register(CommandSpec::new(&["echo"], "", handler()))
            .unwrap_err();
        assert!(matches!(err, ArgonError::Config(_)));
    }

    #[test]
    fn duplicate_paths_match_case_insensitively() {
        let table = CommandTable::new()
            .register(CommandSpec::new(&["echo"], "", handler()))
            .unwrap();
        assert!(table.register(CommandSpec::new(&["Echo"], "", handler())).is_err());
    }

    #[test]
    fn alias_collisions_are_rejected() {
        let spec = CommandSpec::new(&["x"], "", handler())
            .with_param(ParamSpec::new("alpha", TypeTag::Integer).with_short('a'))
            .with_param(ParamSpec::new("all", TypeTag::Boolean).with_short('a'));
        assert!(CommandTable::new().register(spec).is_err());
    }

    #[test]
    fn rest_collector_must_be_last() {
        let spec = CommandSpec::new(&["x"], "", handler())
            .with_param(ParamSpec::rest("items", TypeTag::String))
            .with_param(ParamSpec::new("after", TypeTag::Integer));
        assert!(CommandTable::new().register(spec).is_err());
    }

    #[test]
    fn required_is_derived() {
        assert!(ParamSpec::new("x", TypeTag::Integer).is_required());
        assert!(!ParamSpec::new("x", TypeTag::Integer)
            .with_default(ArgValue::Integer(1))
            .is_required());
        assert!(!ParamSpec::new("v", TypeTag::Boolean).is_required());
        assert!(!ParamSpec::new("o", TypeTag::Optional(Box::new(TypeTag::String))).is_required());
        assert!(!ParamSpec::rest("r", TypeTag::String).is_required());
    }

    #[test]
    fn prefix_lookup() {
        let table = CommandTable::new()
            .register(CommandSpec::new(&["calc", "sum"], "", handler()))
            .unwrap()
            .register(CommandSpec::new(&["calc", "avg"], "", handler()))
            .unwrap();

        let prefix = vec!["calc".to_string()];
        assert!(table.has_prefix(&prefix));
        assert_eq!(table.under_prefix(&prefix).count(), 2);
        assert!(table.find(&prefix).is_none());
        assert!(table.find(&["CALC".to_string(), "sum".to_string()]).is_some());
    }
}
