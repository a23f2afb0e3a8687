//! RecordingExecutor: records every call for later inspection.
//!
//! # Why a recording executor? (for beginners)
//!
//! The real effects (powering off, pressing keys, speaking) cannot run on a
//! CI machine, and could not be observed from Rust code if they did.  The
//! `RecordingExecutor` pushes each call into a `Mutex<Vec<RecordedAction>>`
//! instead, so a test can assert exactly which actions ran and in what
//! order.  It also tracks a simulated [`VolumeLevel`] so volume clamping can
//! be checked end to end.
//!
//! Set `should_fail` to make every call return [`ActionError::Platform`].
//! [`RecordingExecutor::with_direction_latency`] makes arrow-key presses
//! block for a while, like a slow platform integration would.
//!
//! ```ignore
//! let executor = Arc::new(RecordingExecutor::with_volume(95));
//! // ... drive the server with "volume up" twice ...
//! assert_eq!(executor.volume().percent(), 100);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use podremote_core::{Direction, VolumeLevel};

use crate::application::execute_action::{ActionError, ActionExecutor};

/// One executor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    PowerOff,
    Restart,
    Speak(String),
    OpenMediaApp,
    PlayMedia,
    CloseMediaApp,
    Direction(Direction),
    Confirm,
    Click,
    AdjustVolume(i32),
}

/// Executor that records calls instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    actions: Mutex<Vec<RecordedAction>>,
    volume: Mutex<VolumeLevel>,
    /// When `true`, every method returns an error after recording the call.
    pub should_fail: bool,
    /// Blocking pause before an arrow-key press is recorded.
    direction_latency: Duration,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the simulated volume at `percent` (clamped to 100).
    pub fn with_volume(percent: u8) -> Self {
        Self {
            volume: Mutex::new(VolumeLevel::new(percent)),
            ..Self::default()
        }
    }

    /// A recorder whose calls all fail.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Makes `simulate_direction` block for `latency` before recording.
    pub fn with_direction_latency(latency: Duration) -> Self {
        Self {
            direction_latency: latency,
            ..Self::default()
        }
    }

    /// Every call so far, oldest first.
    pub fn actions(&self) -> Vec<RecordedAction> {
        lock(&self.actions).clone()
    }

    /// Number of recorded calls equal to `action`.
    pub fn count(&self, action: &RecordedAction) -> usize {
        lock(&self.actions).iter().filter(|a| *a == action).count()
    }

    pub fn volume(&self) -> VolumeLevel {
        *lock(&self.volume)
    }

    fn record(&self, action: RecordedAction) -> Result<(), ActionError> {
        lock(&self.actions).push(action);
        if self.should_fail {
            return Err(ActionError::Platform("recording executor set to fail".into()));
        }
        Ok(())
    }
}

/// A poisoned lock only means another test thread panicked mid-push; the
/// vector itself is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ActionExecutor for RecordingExecutor {
    fn power_off(&self) -> Result<(), ActionError> {
        self.record(RecordedAction::PowerOff)
    }

    fn restart(&self) -> Result<(), ActionError> {
        self.record(RecordedAction::Restart)
    }

    fn speak(&self, text: &str) -> Result<(), ActionError> {
        self.record(RecordedAction::Speak(text.to_string()))
    }

    fn open_media_app(&self) -> Result<(), ActionError> {
        self.record(RecordedAction::OpenMediaApp)
    }

    fn play_media(&self) -> Result<(), ActionError> {
        self.record(RecordedAction::PlayMedia)
    }

    fn close_media_app(&self) -> Result<(), ActionError> {
        self.record(RecordedAction::CloseMediaApp)
    }

    fn simulate_direction(&self, direction: Direction) -> Result<(), ActionError> {
        if !self.direction_latency.is_zero() {
            std::thread::sleep(self.direction_latency);
        }
        self.record(RecordedAction::Direction(direction))
    }

    fn simulate_confirm(&self) -> Result<(), ActionError> {
        self.record(RecordedAction::Confirm)
    }

    fn simulate_click(&self) -> Result<(), ActionError> {
        self.record(RecordedAction::Click)
    }

    fn adjust_volume(&self, delta: i32) -> Result<(), ActionError> {
        self.record(RecordedAction::AdjustVolume(delta))?;
        let mut volume = lock(&self.volume);
        *volume = volume.adjust(delta);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let executor = RecordingExecutor::new();

        executor.speak("hi").expect("speak");
        executor.simulate_direction(Direction::Down).expect("down");
        executor.simulate_click().expect("click");

        assert_eq!(
            executor.actions(),
            vec![
                RecordedAction::Speak("hi".into()),
                RecordedAction::Direction(Direction::Down),
                RecordedAction::Click,
            ]
        );
    }

    #[test]
    fn test_volume_clamps_at_bounds() {
        // Arrange
        let executor = RecordingExecutor::with_volume(95);

        // Act
        executor.adjust_volume(10).expect("up");
        executor.adjust_volume(10).expect("up");

        // Assert
        assert_eq!(executor.volume().percent(), 100);
        assert_eq!(executor.count(&RecordedAction::AdjustVolume(10)), 2);

        executor.adjust_volume(-250).expect("down");
        assert_eq!(executor.volume().percent(), 0);
    }

    #[test]
    fn test_failing_executor_still_records() {
        let executor = RecordingExecutor::failing();

        let result = executor.power_off();

        assert!(matches!(result, Err(ActionError::Platform(_))));
        assert_eq!(executor.actions(), vec![RecordedAction::PowerOff]);
    }
}
