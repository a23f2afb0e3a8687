//! The action executor port and the actions applied to it.
//!
//! The host never touches the OS directly.  Every real-world effect goes
//! through the [`ActionExecutor`] trait, implemented in the infrastructure
//! layer (`LoggingExecutor` for dry runs, `RecordingExecutor` for tests,
//! or a platform integration supplied by the embedding application).
//!
//! Executor calls are fire-and-forget from the protocol's point of view:
//! the client's reply is already on the wire when the action runs, and a
//! failure is only logged.  Implementations may block; the scheduler runs
//! them on Tokio's blocking pool.

use podremote_core::Direction;
use thiserror::Error;

/// Error type for action execution.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The platform refused or failed to perform the action.
    #[error("platform error: {0}")]
    Platform(String),
    /// The action is not available on this host.
    #[error("action not supported on this host: {0}")]
    Unsupported(&'static str),
}

/// Platform-agnostic host effects.
///
/// Each supported platform provides an implementation in the infrastructure
/// layer.
#[cfg_attr(test, mockall::automock)]
pub trait ActionExecutor: Send + Sync {
    /// Powers off the host.
    fn power_off(&self) -> Result<(), ActionError>;

    /// Restarts the host.
    fn restart(&self) -> Result<(), ActionError>;

    /// Speaks `text` through the host's text-to-speech service.
    fn speak(&self, text: &str) -> Result<(), ActionError>;

    /// Launches the media player.
    fn open_media_app(&self) -> Result<(), ActionError>;

    /// Toggles play/pause in the media player.
    fn play_media(&self) -> Result<(), ActionError>;

    /// Quits the media player.
    fn close_media_app(&self) -> Result<(), ActionError>;

    /// Presses the arrow key for `direction`.
    fn simulate_direction(&self, direction: Direction) -> Result<(), ActionError>;

    /// Presses Return.
    fn simulate_confirm(&self) -> Result<(), ActionError>;

    /// Clicks the primary mouse button at the current cursor position.
    fn simulate_click(&self) -> Result<(), ActionError>;

    /// Changes the system volume by `delta` percentage points, clamped to
    /// `[0, 100]` by the implementation.
    fn adjust_volume(&self, delta: i32) -> Result<(), ActionError>;
}

/// A host action requested by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    PowerOff,
    Restart,
    Speak(String),
    OpenMedia,
    PlayMedia,
    CloseMedia,
    Navigate(Direction),
    Confirm,
    Click,
    AdjustVolume(i32),
}

impl Action {
    /// Invokes the matching executor method.
    ///
    /// # Errors
    ///
    /// Propagates the executor's [`ActionError`].
    pub fn apply(&self, executor: &dyn ActionExecutor) -> Result<(), ActionError> {
        match self {
            Action::PowerOff => executor.power_off(),
            Action::Restart => executor.restart(),
            Action::Speak(text) => executor.speak(text),
            Action::OpenMedia => executor.open_media_app(),
            Action::PlayMedia => executor.play_media(),
            Action::CloseMedia => executor.close_media_app(),
            Action::Navigate(direction) => executor.simulate_direction(*direction),
            Action::Confirm => executor.simulate_confirm(),
            Action::Click => executor.simulate_click(),
            Action::AdjustVolume(delta) => executor.adjust_volume(*delta),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::PowerOff => "power_off",
            Action::Restart => "restart",
            Action::Speak(_) => "speak",
            Action::OpenMedia => "open_media_app",
            Action::PlayMedia => "play_media",
            Action::CloseMedia => "close_media_app",
            Action::Navigate(_) => "simulate_direction",
            Action::Confirm => "simulate_confirm",
            Action::Click => "simulate_click",
            Action::AdjustVolume(_) => "adjust_volume",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
