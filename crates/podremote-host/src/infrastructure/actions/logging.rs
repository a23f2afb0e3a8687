//! LoggingExecutor: performs no real action, only logs it.

use podremote_core::Direction;
use tracing::info;

use crate::application::execute_action::{ActionError, ActionExecutor};

/// Dry-run executor for hosts without a platform integration.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExecutor;

impl LoggingExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl ActionExecutor for LoggingExecutor {
    fn power_off(&self) -> Result<(), ActionError> {
        info!(action = "power_off", "would power off the host");
        Ok(())
    }

    fn restart(&self) -> Result<(), ActionError> {
        info!(action = "restart", "would restart the host");
        Ok(())
    }

    fn speak(&self, text: &str) -> Result<(), ActionError> {
        info!(action = "speak", text, "would speak text");
        Ok(())
    }

    fn open_media_app(&self) -> Result<(), ActionError> {
        info!(action = "open_media_app", "would open the media player");
        Ok(())
    }

    fn play_media(&self) -> Result<(), ActionError> {
        info!(action = "play_media", "would toggle play/pause");
        Ok(())
    }

    fn close_media_app(&self) -> Result<(), ActionError> {
        info!(action = "close_media_app", "would quit the media player");
        Ok(())
    }

    fn simulate_direction(&self, direction: Direction) -> Result<(), ActionError> {
        let key = direction.key();
        info!(
            action = "simulate_direction",
            %direction,
            %key,
            native_code = key.native_code(),
            "would press arrow key"
        );
        Ok(())
    }

    fn simulate_confirm(&self) -> Result<(), ActionError> {
        let key = podremote_core::RemoteKey::Enter;
        info!(
            action = "simulate_confirm",
            %key,
            native_code = key.native_code(),
            "would press return"
        );
        Ok(())
    }

    fn simulate_click(&self) -> Result<(), ActionError> {
        info!(action = "simulate_click", "would click at the cursor position");
        Ok(())
    }

    fn adjust_volume(&self, delta: i32) -> Result<(), ActionError> {
        info!(action = "adjust_volume", delta, "would change the system volume");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_succeeds() {
        let executor = LoggingExecutor::new();
        assert!(executor.power_off().is_ok());
        assert!(executor.restart().is_ok());
        assert!(executor.speak("hello").is_ok());
        assert!(executor.open_media_app().is_ok());
        assert!(executor.play_media().is_ok());
        assert!(executor.close_media_app().is_ok());
        assert!(executor.simulate_direction(Direction::Up).is_ok());
        assert!(executor.simulate_confirm().is_ok());
        assert!(executor.simulate_click().is_ok());
        assert!(executor.adjust_volume(-10).is_ok());
    }
}
