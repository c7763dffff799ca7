//! Middleware filters wrapping command invocation.
//!
//! Filters form a singly linked chain built once per invocation: each node
//! owns its successor, the outermost filter runs first, and the terminal
//! link applies the bound arguments to the command body. A filter that does
//! not call its successor short-circuits the rest of the chain.

use std::sync::Arc;

use async_trait::async_trait;

use crate::binder::BoundArgs;
use crate::command::CommandHandler;
use crate::context::InvocationContext;
use crate::error::Result;

/// Middleware wrapping the next link in the invocation chain.
///
/// The filter decides whether to call `next` and may observe the
/// cooperative cancellation token on the context at any suspension point.
/// Errors propagate to the dispatcher unmodified.
#[async_trait]
pub trait CommandFilter: Send + Sync {
    async fn handle(&self, ctx: &InvocationContext, next: &FilterNode) -> Result<i32>;
}

/// One link of the invocation chain.
pub struct FilterNode {
    inner: NodeInner,
}

enum NodeInner {
    /// A filter and the link it wraps
    Link {
        filter: Arc<dyn CommandFilter>,
        next: Box<FilterNode>,
    },

    /// The command body with its bound arguments
    Terminal {
        handler: Arc<dyn CommandHandler>,
        args: BoundArgs,
    },
}

impl FilterNode {
    /// The innermost link: applies the bound arguments to the handler.
    pub fn terminal(handler: Arc<dyn CommandHandler>, args: BoundArgs) -> Self {
        Self {
            inner: NodeInner::Terminal { handler, args },
        }
    }

    /// Wrap an existing chain with an outer filter.
    pub fn wrap(filter: Arc<dyn CommandFilter>, next: FilterNode) -> Self {
        Self {
            inner: NodeInner::Link {
                filter,
                next: Box::new(next),
            },
        }
    }

    /// Build the full chain bottom-up from ordered filter lists.
    ///
    /// Global filters sit outermost, then the command's own filters in
    /// declaration order, then the terminal link.
    pub fn build(
        global: &[Arc<dyn CommandFilter>],
        command: &[Arc<dyn CommandFilter>],
        handler: Arc<dyn CommandHandler>,
        args: BoundArgs,
    ) -> Self {
        let mut node = Self::terminal(handler, args);
        for filter in command.iter().rev() {
            node = Self::wrap(Arc::clone(filter), node);
        }
        for filter in global.iter().rev() {
            node = Self::wrap(Arc::clone(filter), node);
        }
        node
    }

    /// Run this link and everything it wraps.
    pub async fn invoke(&self, ctx: &InvocationContext) -> Result<i32> {
        match &self.inner {
            NodeInner::Link { filter, next } => filter.handle(ctx, next).await,
            NodeInner::Terminal { handler, args } => handler.invoke(ctx, args).await,
        }
    }
}
