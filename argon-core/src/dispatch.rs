//! Top-level command dispatch.
//!
//! The dispatcher resolves a command path from the argument vector, binds
//! the remaining tokens, then runs the filter chain on a spawned task raced
//! against the cancellation controller, and maps the outcome to a process
//! exit code.

use std::sync::Arc;

use tracing::{debug, error, info_span, warn, Instrument};

use crate::binder::{bind, BoundArgs, ParseOutcome};
use crate::cancel::CancelController;
use crate::command::{CommandSpec, CommandTable};
use crate::context::InvocationContext;
use crate::error::{ArgonError, Result};
use crate::filter::FilterNode;
use crate::help::{render_command_help, render_help, render_version};
use crate::options::EngineOptions;

/// Normal completion, help, or version.
pub const EXIT_SUCCESS: i32 = 0;

/// Parse, validation, or unhandled execution error.
pub const EXIT_FAILURE: i32 = 1;

/// Cancellation, matching the conventional SIGINT exit status.
pub const EXIT_CANCELLED: i32 = 130;

/// Result of resolving a command path from the leading tokens.
enum Resolution<'a> {
    Command(&'a Arc<CommandSpec>, &'a [String]),
    HelpAt(Vec<String>),
    Version,
    NotFound(String),
}

/// Top-level orchestrator for one engine configuration.
pub struct Dispatcher {
    options: EngineOptions,
}

impl Dispatcher {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Dispatch a raw argument vector against the command table and return
    /// the process exit code.
    pub async fn run(&self, table: &CommandTable, raw: &[String]) -> i32 {
        if let Err(err) = self.check_table(table) {
            error!("{}", err);
            eprintln!("{}", err);
            return EXIT_FAILURE;
        }

        let (spec, rest) = match self.resolve(table, raw) {
            Resolution::Command(spec, rest) => (spec, rest),
            Resolution::HelpAt(prefix) => {
                print!("{}", render_help(table, &prefix, &self.options));
                return EXIT_SUCCESS;
            }
            Resolution::Version => {
                println!("{}", render_version(&self.options));
                return EXIT_SUCCESS;
            }
            Resolution::NotFound(offender) => {
                let err = ArgonError::CommandNotFound(offender);
                warn!("{}", err);
                eprintln!("{}", err);
                eprint!("{}", render_help(table, &[], &self.options));
                return EXIT_FAILURE;
            }
        };

        match bind(spec, rest, &self.options.services) {
            ParseOutcome::Help => {
                print!("{}", render_command_help(spec, &self.options));
                EXIT_SUCCESS
            }
            ParseOutcome::Version => {
                println!("{}", render_version(&self.options));
                EXIT_SUCCESS
            }
            ParseOutcome::Failure(errors) => {
                warn!(command = %spec.display_path(), errors = errors.len(), "binding failed");
                for err in &errors {
                    eprintln!("{}", err);
                }
                EXIT_FAILURE
            }
            ParseOutcome::Bound(bound) => self.execute(spec, bound, rest).await,
        }
    }

    /// Startup-time configuration checks, run before any dispatch.
    ///
    /// Duplicate commands are rejected when the table is built; what
    /// remains is cross-checking declared service parameters against the
    /// locator.
    fn check_table(&self, table: &CommandTable) -> Result<()> {
        for spec in table.commands() {
            for param in spec.params() {
                if let Some(key) = param.service_key() {
                    if !self.options.services.contains(key.id) {
                        return Err(ArgonError::Config(format!(
                            "command '{}': no service registered for parameter '{}' ({})",
                            spec.display_path(),
                            param.name(),
                            key.type_name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Greedily consume leading non-flag tokens that extend a declared
    /// command path.
    fn resolve<'a>(&self, table: &'a CommandTable, raw: &'a [String]) -> Resolution<'a> {
        let mut prefix: Vec<String> = Vec::new();
        let mut consumed = 0;

        while let Some(token) = raw.get(consumed) {
            if token.starts_with('-') {
                break;
            }
            let mut candidate = prefix.clone();
            candidate.push(token.clone());
            if !table.has_prefix(&candidate) {
                break;
            }
            prefix = candidate;
            consumed += 1;
        }

        if let Some(spec) = table.find(&prefix) {
            return Resolution::Command(spec, &raw[consumed..]);
        }

        // No exact command at this node; reserved tokens are intercepted
        // here since there is no further matching segment
        match raw.get(consumed).map(String::as_str) {
            Some("-h") | Some("--help") => return Resolution::HelpAt(prefix),
            Some("--version") => return Resolution::Version,
            None if consumed == 0 => return Resolution::HelpAt(Vec::new()),
            _ => {}
        }

        if consumed == 0 {
            // Nothing matched a declared path; fall back to the root
            // command with the full token list
            if let Some(root) = table.root() {
                return Resolution::Command(root, raw);
            }
            return Resolution::NotFound(raw.first().cloned().unwrap_or_default());
        }

        Resolution::NotFound(prefix.join(" "))
    }

    /// Run the filter chain under the cancellation controller.
    async fn execute(&self, spec: &Arc<CommandSpec>, bound: BoundArgs, rest: &[String]) -> i32 {
        let controller = CancelController::new(self.options.grace_period);
        if self.options.install_signal_handlers {
            controller.spawn_signal_listener();
        }
        if let Some(timeout) = self.options.execution_timeout {
            controller.arm_timeout(timeout);
        }

        let ctx = InvocationContext::new(
            spec.path().to_vec(),
            rest.to_vec(),
            controller.cooperative_token(),
        );
        let span = info_span!("invoke", command = %ctx.command_name(), id = %ctx.invocation_id);
        debug!(parent: &span, args = %bound.to_json(), "dispatching");

        let chain = FilterNode::build(
            &self.options.global_filters,
            spec.filters(),
            Arc::clone(spec.handler()),
            bound,
        );
        let task = tokio::spawn(async move { chain.invoke(&ctx).await }.instrument(span));

        let forced = controller.forced_token();
        tokio::select! {
            joined = task => {
                controller.complete();
                match joined {
                    Ok(Ok(code)) => {
                        debug!(code, "command completed");
                        code
                    }
                    Ok(Err(err)) => self.report(err),
                    Err(join_err) => {
                        error!(error = ?join_err, "command task failed");
                        EXIT_FAILURE
                    }
                }
            }
            _ = forced.cancelled() => {
                // The task may keep running in the background; its result
                // is discarded
                warn!("command abandoned after forced cancellation");
                EXIT_CANCELLED
            }
        }
    }

    /// Map a command-body error to its exit code and log it.
    ///
    /// Recognized kinds log message-only; anything else gets full
    /// diagnostic detail.
    fn report(&self, err: ArgonError) -> i32 {
        eprintln!("{}", err);
        match &err {
            ArgonError::Cancelled { .. } => {
                warn!("{}", err);
                EXIT_CANCELLED
            }
            e if e.is_recognized() => {
                error!("{}", err);
                EXIT_FAILURE
            }
            _ => {
                error!(error = ?err, "command failed");
                EXIT_FAILURE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::command::{CommandHandler, ParamSpec};
    use crate::validate::ValidationRule;
    use crate::value::TypeTag;

    struct Probe {
        invoked: Arc<AtomicBool>,
        code: i32,
    }

    #[async_trait]
    impl CommandHandler for Probe {
        async fn invoke(&self, _ctx: &InvocationContext, _args: &BoundArgs) -> Result<i32> {
            self.invoked.store(true, Ordering::SeqCst);
            Ok(self.code)
        }
    }

    fn probe(invoked: &Arc<AtomicBool>) -> Arc<dyn CommandHandler> {
        Arc::new(Probe {
            invoked: Arc::clone(invoked),
            code: 0,
        })
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(EngineOptions::default().without_signal_handlers())
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn zero_required_params_and_empty_args_runs_the_body() {
        let invoked = Arc::new(AtomicBool::new(false));
        let table = CommandTable::new()
            .register(CommandSpec::new(&[], "root", probe(&invoked)))
            .unwrap();

        let code = dispatcher().run(&table, &[]).await;
        assert_eq!(code, EXIT_SUCCESS);
        assert!(invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn range_failure_skips_the_body() {
        let invoked = Arc::new(AtomicBool::new(false));
        let spec = CommandSpec::new(&["calc"], "", probe(&invoked))
            .with_param(ParamSpec::new("x", TypeTag::Integer))
            .with_param(
                ParamSpec::new("y", TypeTag::Integer)
                    .with_rule(ValidationRule::range(100.0, 2000.0)),
            );
        let table = CommandTable::new().register(spec).unwrap();

        let code = dispatcher()
            .run(&table, &args(&["calc", "--x", "100", "--y", "1000"]))
            .await;
        assert_eq!(code, EXIT_SUCCESS);
        assert!(invoked.load(Ordering::SeqCst));

        invoked.store(false, Ordering::SeqCst);
        let code = dispatcher()
            .run(&table, &args(&["calc", "--x", "100", "--y", "5"]))
            .await;
        assert_eq!(code, EXIT_FAILURE);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_command_exits_nonzero() {
        let invoked = Arc::new(AtomicBool::new(false));
        let table = CommandTable::new()
            .register(CommandSpec::new(&["echo"], "", probe(&invoked)))
            .unwrap();

        let code = dispatcher().run(&table, &args(&["nope"])).await;
        assert_eq!(code, EXIT_FAILURE);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn nested_paths_resolve_greedily() {
        let invoked = Arc::new(AtomicBool::new(false));
        let spec = CommandSpec::new(&["calc", "sum"], "", probe(&invoked))
            .with_param(ParamSpec::rest("values", TypeTag::Integer));
        let table = CommandTable::new().register(spec).unwrap();

        let code = dispatcher().run(&table, &args(&["calc", "sum", "1", "2"])).await;
        assert_eq!(code, EXIT_SUCCESS);
        assert!(invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn version_prints_and_exits_zero() {
        let invoked = Arc::new(AtomicBool::new(false));
        let table = CommandTable::new()
            .register(CommandSpec::new(&["echo"], "", probe(&invoked)))
            .unwrap();

        let code = dispatcher().run(&table, &args(&["--version"])).await;
        assert_eq!(code, EXIT_SUCCESS);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn missing_service_is_a_startup_error() {
        struct Db;
        let invoked = Arc::new(AtomicBool::new(false));
        let spec = CommandSpec::new(&["q"], "", probe(&invoked))
            .with_param(ParamSpec::service::<Db>("db"));
        let table = CommandTable::new().register(spec).unwrap();

        // No Db registered: rejected before any dispatch, even though the
        // invocation never names the service parameter
        let code = dispatcher().run(&table, &args(&["q"])).await;
        assert_eq!(code, EXIT_FAILURE);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    struct Sleeper;

    #[async_trait]
    impl CommandHandler for Sleeper {
        async fn invoke(&self, _ctx: &InvocationContext, _args: &BoundArgs) -> Result<i32> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_body_is_abandoned_with_cancelled_exit_code() {
        let table = CommandTable::new()
            .register(CommandSpec::new(&["stall"], "", Arc::new(Sleeper)))
            .unwrap();

        let dispatcher = Dispatcher::new(
            EngineOptions::default()
                .without_signal_handlers()
                .with_execution_timeout(Duration::from_millis(10))
                .with_grace_period(Duration::from_millis(10)),
        );

        let code = dispatcher.run(&table, &args(&["stall"])).await;
        assert_eq!(code, EXIT_CANCELLED);
    }

    struct Cooperative;

    #[async_trait]
    impl CommandHandler for Cooperative {
        async fn invoke(&self, ctx: &InvocationContext, _args: &BoundArgs) -> Result<i32> {
            ctx.cancellation.cancelled().await;
            Err(ArgonError::Cancelled { forced: false })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cooperative_body_sees_the_token_before_force() {
        let table = CommandTable::new()
            .register(CommandSpec::new(&["work"], "", Arc::new(Cooperative)))
            .unwrap();

        let dispatcher = Dispatcher::new(
            EngineOptions::default()
                .without_signal_handlers()
                .with_execution_timeout(Duration::from_millis(10))
                .with_grace_period(Duration::from_secs(5)),
        );

        // The body stops cooperatively well inside the grace period
        let code = dispatcher.run(&table, &args(&["work"])).await;
        assert_eq!(code, EXIT_CANCELLED);
    }
}
