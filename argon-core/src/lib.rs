//! Core engine for the Argon command-line runtime.
//!
//! This crate provides the binding and dispatch machinery: a read-only
//! command table, an argument matcher that converts and validates tokens
//! into typed values, a middleware filter chain around the command body,
//! and a two-phase cancellation controller driving process exit codes.

mod binder;
mod cancel;
mod command;
mod context;
mod dispatch;
mod error;
mod filter;
mod help;
mod options;
mod service;
mod validate;
mod value;

// Re-export core types
pub use binder::{bind, BoundArgs, ParseOutcome};
pub use cancel::{CancelController, RunState, DEFAULT_GRACE_PERIOD};
pub use command::{CommandHandler, CommandSpec, CommandTable, ParamSpec, ServiceKey, MAX_PARAMS};
pub use context::InvocationContext;
pub use dispatch::{Dispatcher, EXIT_CANCELLED, EXIT_FAILURE, EXIT_SUCCESS};
pub use error::{ArgonError, Result};
pub use filter::{CommandFilter, FilterNode};
pub use help::{render_command_help, render_help, render_version};
pub use options::EngineOptions;
pub use service::ServiceLocator;
pub use validate::ValidationRule;
pub use value::{convert, convert_rest, ArgValue, TypeTag, LIST_DELIMITER};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
