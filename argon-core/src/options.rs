//! Process-wide engine configuration.
//!
//! One options object is built before dispatch and treated as read-only
//! for the rest of the run. Passing it into the dispatcher (rather than
//! ambient statics) keeps the engine testable with several configurations
//! in one process.

use std::sync::Arc;
use std::time::Duration;

use crate::cancel::DEFAULT_GRACE_PERIOD;
use crate::filter::CommandFilter;
use crate::service::ServiceLocator;

/// Configuration for one dispatcher instance.
#[derive(Clone)]
pub struct EngineOptions {
    /// Application name used in usage and version text
    pub name: String,

    /// Version string printed for `--version`
    pub version: String,

    /// Delay between cooperative and forced cancellation
    pub grace_period: Duration,

    /// Optional overall deadline for the command body
    pub execution_timeout: Option<Duration>,

    /// Filters wrapped around every command, outermost first
    pub global_filters: Vec<Arc<dyn CommandFilter>>,

    /// Registry for injected-service parameters
    pub services: ServiceLocator,

    /// Whether to listen for OS termination signals. Disabled in tests,
    /// where signals are injected directly into the controller.
    pub install_signal_handlers: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            name: "argon".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            grace_period: DEFAULT_GRACE_PERIOD,
            execution_timeout: None,
            global_filters: Vec::new(),
            services: ServiceLocator::new(),
            install_signal_handlers: true,
        }
    }
}

impl EngineOptions {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            ..Self::default()
        }
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }

    pub fn with_global_filter(mut self, filter: Arc<dyn CommandFilter>) -> Self {
        self.global_filters.push(filter);
        self
    }

    pub fn with_services(mut self, services: ServiceLocator) -> Self {
        self.services = services;
        self
    }

    pub fn without_signal_handlers(mut self) -> Self {
        self.install_signal_handlers = false;
        self
    }
}
