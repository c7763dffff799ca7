//! Per-invocation context handed to filters and command bodies.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context for one command invocation.
///
/// Carries the resolved command path, the raw argument tokens that were
/// bound, and the cooperative cancellation token the body is expected to
/// observe at its suspension points.
pub struct InvocationContext {
    /// Resolved command path (empty for the root command)
    pub command_path: Vec<String>,

    /// Raw tokens handed to the argument matcher
    pub raw_args: Vec<String>,

    /// Cooperative cancellation token, signalled on the first
    /// termination signal
    pub cancellation: CancellationToken,

    /// Correlation id for this invocation's log events
    pub invocation_id: Uuid,
}

impl InvocationContext {
    pub fn new(command_path: Vec<String>, raw_args: Vec<String>, cancellation: CancellationToken) -> Self {
        Self {
            command_path,
            raw_args,
            cancellation,
            invocation_id: Uuid::new_v4(),
        }
    }

    /// Display name of the invoked command.
    pub fn command_name(&self) -> String {
        if self.command_path.is_empty() {
            "(root)".to_string()
        } else {
            self.command_path.join(" ")
        }
    }

    /// Whether cooperative cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
