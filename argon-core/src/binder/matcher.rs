//! The matching pass over a raw argument vector.

use tracing::debug;

use super::{BoundArgs, ParseOutcome};
use crate::command::{CommandSpec, ParamSpec};
use crate::error::ArgonError;
use crate::service::ServiceLocator;
use crate::validate::run_rules;
use crate::value::{convert, convert_rest, ArgValue, TypeTag};

/// Match a raw argument vector against a command's parameter specs.
///
/// The scan is a single left-to-right pass. Tokens matching a declared
/// long alias (case-insensitive) or short alias bind by name; tokens seen
/// before any named token bind positionally in declaration order. Once any
/// named token has matched, positional binding is disabled for the rest of
/// the scan. Conversion and validation failures accumulate so the caller
/// sees every problem at once; an unrecognized argument name is fatal
/// because continuing could mis-bind the tokens after it.
pub fn bind(spec: &CommandSpec, raw: &[String], services: &ServiceLocator) -> ParseOutcome {
    let params = spec.params();

    // Reserved-token short circuits, checked before any scanning
    if raw.is_empty() && params.iter().any(|p| p.is_required()) {
        return ParseOutcome::Help;
    }
    if raw.len() == 1 {
        match raw[0].as_str() {
            "-h" | "--help" => return ParseOutcome::Help,
            "--version" => return ParseOutcome::Version,
            _ => {}
        }
    }

    let mut scan = Scan::new(params, services);
    scan.run(raw);
    scan.finish()
}

/// State of one matching pass.
struct Scan<'a> {
    params: &'a [ParamSpec],
    services: &'a ServiceLocator,
    slots: Vec<Option<ArgValue>>,
    supplied: u64,
    errors: Vec<ArgonError>,
    named_mode: bool,
    next_positional: usize,
    fatal: bool,
}

impl<'a> Scan<'a> {
    fn new(params: &'a [ParamSpec], services: &'a ServiceLocator) -> Self {
        Self {
            params,
            services,
            slots: vec![None; params.len()],
            supplied: 0,
            errors: Vec::new(),
            named_mode: false,
            next_positional: 0,
            fatal: false,
        }
    }

    fn run(&mut self, raw: &[String]) {
        let mut i = 0;
        while i < raw.len() && !self.fatal {
            let token = &raw[i];

            if let Some(body) = token.strip_prefix("--") {
                i = self.take_long(body, raw, i);
            } else if is_alias_shaped(token) {
                i = self.take_short(token, raw, i);
            } else {
                i = self.take_positional(token, raw, i);
            }
        }
    }

    /// `--name`, `--name=value`, or `--name value`.
    fn take_long(&mut self, body: &str, raw: &[String], i: usize) -> usize {
        let (name, inline) = match body.split_once('=') {
            Some((n, v)) => (n, Some(v)),
            None => (body, None),
        };

        let Some(idx) = self.params.iter().position(|p| p.matches_long(name)) else {
            self.errors.push(ArgonError::UnknownArgument(format!("--{}", name)));
            self.fatal = true;
            return i + 1;
        };

        self.named_mode = true;
        self.bind_named(idx, inline, raw, i)
    }

    /// `-x` or `-x value`.
    fn take_short(&mut self, token: &str, raw: &[String], i: usize) -> usize {
        let mut chars = token.chars().skip(1);
        let idx = match (chars.next(), chars.next()) {
            (Some(alias), None) => self.params.iter().position(|p| p.matches_short(alias)),
            _ => None,
        };

        let Some(idx) = idx else {
            self.errors.push(ArgonError::UnknownArgument(token.to_string()));
            self.fatal = true;
            return i + 1;
        };

        self.named_mode = true;
        self.bind_named(idx, None, raw, i)
    }

    /// Bind a named parameter, consuming the value token if one is needed.
    fn bind_named(&mut self, idx: usize, inline: Option<&str>, raw: &[String], i: usize) -> usize {
        let param = &self.params[idx];
        self.mark_supplied(idx);

        // Booleans consume no following token
        if param.is_boolean() && inline.is_none() {
            self.slots[idx] = Some(ArgValue::Boolean(true));
            return i + 1;
        }

        if let Some(value) = inline {
            self.convert_into(idx, value);
            return i + 1;
        }

        match raw.get(i + 1) {
            Some(value) => {
                self.convert_into(idx, value);
                i + 2
            }
            None => {
                self.errors.push(ArgonError::Conversion {
                    param: param.name().to_string(),
                    reason: "expected a value".to_string(),
                });
                i + 1
            }
        }
    }

    /// Bind a token positionally, or sweep the remainder into a rest
    /// collector.
    fn take_positional(&mut self, token: &str, raw: &[String], i: usize) -> usize {
        if self.named_mode {
            // Positional binding is disabled once named mode begins
            self.errors.push(ArgonError::UnknownArgument(token.to_string()));
            self.fatal = true;
            return i + 1;
        }

        // Skip parameters that never bind positionally
        while self
            .params
            .get(self.next_positional)
            .is_some_and(|p| p.is_service() || self.slots[self.next_positional].is_some())
        {
            self.next_positional += 1;
        }

        let Some(param) = self.params.get(self.next_positional) else {
            self.errors.push(ArgonError::UnknownArgument(token.to_string()));
            self.fatal = true;
            return i + 1;
        };

        let idx = self.next_positional;
        self.mark_supplied(idx);

        if param.is_rest() {
            let elem = rest_element(param);
            match convert_rest(param.name(), &raw[i..], &elem) {
                Ok(value) => self.validate_into(idx, value),
                Err(e) => self.errors.push(e),
            }
            return raw.len();
        }

        self.convert_into(idx, token);
        self.next_positional += 1;
        i + 1
    }

    fn convert_into(&mut self, idx: usize, token: &str) {
        let param = &self.params[idx];
        match convert(param.name(), token, param.tag()) {
            Ok(value) => self.validate_into(idx, value),
            Err(e) => self.errors.push(e),
        }
    }

    fn validate_into(&mut self, idx: usize, value: ArgValue) {
        let param = &self.params[idx];
        if let Some(err) = run_rules(param.name(), &value, param.rules()) {
            self.errors.push(err);
        }
        self.slots[idx] = Some(value);
    }

    fn mark_supplied(&mut self, idx: usize) {
        if idx < 64 {
            self.supplied |= 1 << idx;
        }
    }

    fn was_supplied(&self, idx: usize) -> bool {
        idx < 64 && self.supplied & (1 << idx) != 0
    }

    /// Fill defaults and services, report missing required parameters, and
    /// produce the outcome.
    fn finish(mut self) -> ParseOutcome {
        // An aborted scan reports what it saw; filling in defaults or
        // missing-required noise for unscanned tokens would mislead
        if self.fatal {
            return ParseOutcome::Failure(self.errors);
        }

        for (idx, param) in self.params.iter().enumerate() {
            if self.slots[idx].is_some() {
                continue;
            }
            if self.was_supplied(idx) {
                // Supplied but failed conversion; already reported
                continue;
            }

            if param.is_service() {
                self.resolve_service(idx);
            } else if let Some(default) = param.default_value() {
                self.slots[idx] = Some(default.clone());
            } else if param.is_boolean() {
                self.slots[idx] = Some(ArgValue::Boolean(false));
            } else if param.is_rest() {
                self.slots[idx] = Some(ArgValue::Array(Vec::new()));
            } else if param.is_required() {
                self.errors
                    .push(ArgonError::MissingArgument(param.name().to_string()));
            } else {
                self.slots[idx] = Some(ArgValue::Absent);
            }
        }

        if !self.errors.is_empty() {
            debug!(errors = self.errors.len(), "argument binding failed");
            return ParseOutcome::Failure(self.errors);
        }

        let entries = self
            .params
            .iter()
            .zip(self.slots)
            .map(|(p, slot)| (p.name().to_string(), slot.unwrap_or(ArgValue::Absent)))
            .collect();
        ParseOutcome::Bound(BoundArgs::new(entries, self.supplied))
    }

    fn resolve_service(&mut self, idx: usize) {
        let param = &self.params[idx];
        let Some(key) = param.service_key() else {
            return;
        };
        match self.services.resolve_raw(key.id) {
            Some(handle) => self.slots[idx] = Some(ArgValue::Service(handle)),
            None => self.errors.push(ArgonError::Config(format!(
                "no service registered for parameter '{}' ({})",
                param.name(),
                key.type_name
            ))),
        }
    }
}

/// A `-`-prefixed token shaped like an alias rather than a value.
///
/// Negative numbers and the bare `-` stdin convention stay positional.
fn is_alias_shaped(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next() == Some('-')
        && match chars.next() {
            Some(c) => !c.is_ascii_digit() && c != '.',
            None => false,
        }
}

fn rest_element(param: &ParamSpec) -> TypeTag {
    match param.tag() {
        TypeTag::Array(elem) => (**elem).clone(),
        other => other.clone(),
    }
}
