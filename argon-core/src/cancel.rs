//! Two-phase cancellation and timeout control.
//!
//! OS termination signals become a two-phase cancellation: the first signal
//! cancels the cooperative token and starts a grace-period timer; the timer
//! expiring (or a second signal) cancels the forced token, which abandons
//! the awaited command unconditionally. The forced token is never cancelled
//! before the cooperative one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lifecycle of one controlled invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    CoopRequested,
    Forced,
    Completed,
}

/// Controller racing a command invocation against signals and timeouts.
///
/// Cheap to clone; clones share the same state and tokens.
#[derive(Clone)]
pub struct CancelController {
    state: Arc<Mutex<RunState>>,
    coop: CancellationToken,
    forced: CancellationToken,
    grace: Duration,
}

/// Default grace period between cooperative and forced cancellation.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

impl CancelController {
    pub fn new(grace: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::Running)),
            coop: CancellationToken::new(),
            forced: CancellationToken::new(),
            grace,
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap()
    }

    /// Token the command body is expected to observe voluntarily.
    pub fn cooperative_token(&self) -> CancellationToken {
        self.coop.clone()
    }

    /// Token that abandons the wait regardless of cooperative behavior.
    pub fn forced_token(&self) -> CancellationToken {
        self.forced.clone()
    }

    /// Record a termination signal.
    ///
    /// The first signal requests cooperative cancellation and arms the
    /// grace timer; a second signal escalates to forced immediately.
    /// Signals after forced cancellation or completion are ignored.
    pub fn on_signal(&self) {
        let mut state = self.state.lock().unwrap();
        match *state {
            RunState::Running => {
                *state = RunState::CoopRequested;
                drop(state);

                warn!(grace = ?self.grace, "cancellation requested, waiting for the command to stop");
                self.coop.cancel();

                let ctrl = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(ctrl.grace).await;
                    ctrl.force();
                });
            }
            RunState::CoopRequested => {
                drop(state);
                self.force();
            }
            RunState::Forced | RunState::Completed => {}
        }
    }

    /// Escalate to forced cancellation if still pending.
    fn force(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == RunState::CoopRequested {
            *state = RunState::Forced;
            drop(state);

            warn!("forcing cancellation");
            self.forced.cancel();
        }
    }

    /// Mark the invocation finished; later signals and timers are no-ops.
    pub fn complete(&self) {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, RunState::Running | RunState::CoopRequested) {
            *state = RunState::Completed;
        }
    }

    /// Arm an overall execution deadline.
    ///
    /// Expiry takes the same path as a first termination signal, so a body
    /// that ignores the cooperative token is force-abandoned one grace
    /// period later.
    pub fn arm_timeout(&self, timeout: Duration) {
        let ctrl = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if ctrl.state() == RunState::Running {
                warn!(?timeout, "execution timeout elapsed");
            }
            ctrl.on_signal();
        });
    }

    /// Wire OS termination signals into the controller.
    ///
    /// Listens for interrupt on every platform, plus terminate and quit on
    /// unix, for the lifetime of the invocation.
    pub fn spawn_signal_listener(&self) {
        let ctrl = self.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};

                let (mut term, mut quit) = match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
                    (Ok(t), Ok(q)) => (t, q),
                    _ => {
                        warn!("failed to install unix signal handlers");
                        return;
                    }
                };

                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                        _ = quit.recv() => {}
                    }
                    debug!("termination signal received");
                    ctrl.on_signal();
                }
            }

            #[cfg(not(unix))]
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    warn!("failed to listen for interrupt signals");
                    return;
                }
                debug!("termination signal received");
                ctrl.on_signal();
            }
        });
    }
}
