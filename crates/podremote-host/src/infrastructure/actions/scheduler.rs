//! EffectRunner: runs dispatched effects after their delay.
//!
//! # Two ways to run an effect (for beginners)
//!
//! - **Lanes.**  Every connection owns one [`EffectLane`]: a bounded channel
//!   drained by a single worker task.  Immediate effects (`up`, `enter`,
//!   `say`, `volume up`) go through it, so they run one at a time in the
//!   order the client sent them.  When the worker falls behind, the channel
//!   fills and the session stops reading, which pushes back on the client.
//! - **Scheduled effects.**  Delayed effects (shutdown, restart, exit) get
//!   their own task and their own [`CancellationToken`] via
//!   [`EffectRunner::schedule`], so a pending shutdown can be called off
//!   without touching anything else.
//!
//! The executor call itself runs on `spawn_blocking` because platform
//! integrations (speech, AppleScript, `shutdown -h`) may block for a while.
//!
//! Effects are independent of the server lifecycle: stopping the server does
//! not cancel an acknowledged `shutdown`, and a lane finishes the effects
//! already queued after its connection closes.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::dispatch_command::{Effect, EffectKind};
use crate::application::execute_action::ActionExecutor;

/// Effects a lane buffers before the session has to wait.
pub const LANE_CAPACITY: usize = 32;

/// How a scheduled effect ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    /// The action ran (or the exit token was fired).
    Completed,
    /// The executor reported an error; the client is not told.
    Failed(String),
    /// Cancelled before the delay elapsed.
    Cancelled,
}

/// Handle to one pending effect.
///
/// Dropping the handle does not cancel the effect.  Call [`detach`](Self::detach)
/// to make that explicit.
#[derive(Debug)]
#[must_use = "call `detach` to let the effect run unobserved"]
pub struct ScheduledEffect {
    cancel: CancellationToken,
    handle: JoinHandle<EffectOutcome>,
}

impl ScheduledEffect {
    /// Calls the effect off if its delay has not elapsed yet.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the effect to finish.
    pub async fn join(self) -> EffectOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => EffectOutcome::Failed(format!("effect task failed: {e}")),
        }
    }

    /// Lets the effect run without keeping a handle to it.
    pub fn detach(self) {
        debug!("scheduled effect detached");
    }
}

/// The lane was closed because its worker is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("effect lane closed")]
pub struct LaneClosed;

/// Ordered effect queue owned by one connection.
///
/// Dropping the lane closes the channel; the worker finishes what is queued
/// and exits.
#[derive(Debug)]
pub struct EffectLane {
    tx: mpsc::Sender<EffectKind>,
    runner: EffectRunner,
}

impl EffectLane {
    /// Queues an immediate effect, or schedules a delayed one on its own task.
    ///
    /// Waits while the lane is full.
    ///
    /// # Errors
    ///
    /// Returns [`LaneClosed`] if the worker has stopped.
    pub async fn submit(&self, effect: Effect) -> Result<(), LaneClosed> {
        if effect.delay.is_zero() {
            self.tx.send(effect.kind).await.map_err(|_| LaneClosed)
        } else {
            self.runner.schedule(effect).detach();
            Ok(())
        }
    }
}

/// Schedules effects against one executor.
#[derive(Clone)]
pub struct EffectRunner {
    executor: Arc<dyn ActionExecutor>,
    exit: CancellationToken,
}

impl EffectRunner {
    /// `exit` is cancelled when a `TerminateProcess` effect fires.
    pub fn new(executor: Arc<dyn ActionExecutor>, exit: CancellationToken) -> Self {
        Self { executor, exit }
    }

    pub fn exit_token(&self) -> CancellationToken {
        self.exit.clone()
    }

    /// Spawns a task that waits out `effect.delay` and then performs it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, effect: Effect) -> ScheduledEffect {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let executor = Arc::clone(&self.executor);
        let exit = self.exit.clone();

        let handle = tokio::spawn(async move {
            if !effect.delay.is_zero() {
                debug!(delay_ms = effect.delay.as_millis() as u64, "effect delayed");
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("scheduled effect cancelled");
                        return EffectOutcome::Cancelled;
                    }
                    _ = tokio::time::sleep(effect.delay) => {}
                }
            }
            run(effect.kind, executor, exit).await
        });

        ScheduledEffect { cancel, handle }
    }

    /// Opens an ordered lane with its own worker task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn lane(&self) -> EffectLane {
        let (tx, mut rx) = mpsc::channel::<EffectKind>(LANE_CAPACITY);
        let executor = Arc::clone(&self.executor);
        let exit = self.exit.clone();

        tokio::spawn(async move {
            while let Some(kind) = rx.recv().await {
                run(kind, Arc::clone(&executor), exit.clone()).await;
            }
            debug!("effect lane drained");
        });

        EffectLane {
            tx,
            runner: self.clone(),
        }
    }
}

impl std::fmt::Debug for EffectRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRunner")
            .field("exit_requested", &self.exit.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn run(
    kind: EffectKind,
    executor: Arc<dyn ActionExecutor>,
    exit: CancellationToken,
) -> EffectOutcome {
    match kind {
        EffectKind::TerminateProcess => {
            info!("exit requested by client");
            exit.cancel();
            EffectOutcome::Completed
        }
        EffectKind::Action(action) => {
            let name = action.name();
            let result =
                tokio::task::spawn_blocking(move || action.apply(executor.as_ref())).await;
            match result {
                Ok(Ok(())) => {
                    debug!(action = name, "action completed");
                    EffectOutcome::Completed
                }
                Ok(Err(e)) => {
                    warn!(action = name, error = %e, "action failed");
                    EffectOutcome::Failed(e.to_string())
                }
                Err(e) => {
                    warn!(action = name, error = %e, "action task panicked");
                    EffectOutcome::Failed(e.to_string())
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
