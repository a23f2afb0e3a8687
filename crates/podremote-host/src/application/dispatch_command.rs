//! CommandDispatcher: decides the reply and the host effect for a command.
//!
//! The dispatcher is synchronous and pure.  It never performs the effect
//! itself; it returns a [`Dispatch`] holding the reply line to write and an
//! optional [`Effect`] which the session hands to the effect scheduler
//! *after* the reply has been written.  This ordering is what lets a client
//! see `ok: shutting down` before the machine goes away.
//!
//! # Delays
//!
//! Shutdown, restart and exit carry `destructive_delay` (1 s by default) so
//! the acknowledgement is flushed and received first.  Every other effect
//! has zero delay.

use std::time::Duration;

use podremote_core::{Ack, Command, ProtocolError, Reply};

use super::execute_action::Action;

/// Default pause before a destructive effect runs.
pub const DEFAULT_DESTRUCTIVE_DELAY: Duration = Duration::from_millis(1000);

/// Default volume change per `volume up`/`volume down`, in percentage points.
pub const DEFAULT_VOLUME_STEP: i32 = 10;

/// Tunables for [`CommandDispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub destructive_delay: Duration,
    pub volume_step: i32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            destructive_delay: DEFAULT_DESTRUCTIVE_DELAY,
            volume_step: DEFAULT_VOLUME_STEP,
        }
    }
}

/// Facts about the server needed to answer a command.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchContext {
    /// Number of Ready connections when the command was processed.
    pub active_connections: usize,
}

/// What an effect does once its delay elapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectKind {
    /// Call the action executor.
    Action(Action),
    /// Ask the host process to terminate.
    TerminateProcess,
}

/// A host effect, possibly delayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub kind: EffectKind,
    pub delay: Duration,
}

impl Effect {
    pub fn immediate(kind: EffectKind) -> Self {
        Self {
            kind,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(kind: EffectKind, delay: Duration) -> Self {
        Self { kind, delay }
    }
}

/// Outcome of dispatching one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub reply: Reply,
    pub effect: Option<Effect>,
}

impl Dispatch {
    fn reply_only(reply: Reply) -> Self {
        Self {
            reply,
            effect: None,
        }
    }

    fn ack(ack: Ack, effect: Effect) -> Self {
        Self {
            reply: Reply::Ack(ack),
            effect: Some(effect),
        }
    }
}

/// Maps commands to replies and effects.
#[derive(Debug, Clone, Default)]
pub struct CommandDispatcher {
    settings: DispatchSettings,
}

impl CommandDispatcher {
    pub fn new(settings: DispatchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> DispatchSettings {
        self.settings
    }

    /// Decides the reply and effect for `command`.
    pub fn dispatch(&self, command: Command, context: &DispatchContext) -> Dispatch {
        let delay = self.settings.destructive_delay;
        let step = self.settings.volume_step;
        let act = |action: Action| Effect::immediate(EffectKind::Action(action));

        match command {
            Command::Ping => Dispatch::reply_only(Reply::Pong),
            Command::Status => Dispatch::reply_only(Reply::Status {
                active: context.active_connections,
            }),
            Command::Shutdown => Dispatch::ack(
                Ack::Shutdown,
                Effect::delayed(EffectKind::Action(Action::PowerOff), delay),
            ),
            Command::Restart => Dispatch::ack(
                Ack::Restart,
                Effect::delayed(EffectKind::Action(Action::Restart), delay),
            ),
            Command::Exit => Dispatch::ack(
                Ack::Exit,
                Effect::delayed(EffectKind::TerminateProcess, delay),
            ),
            Command::Say(text) => {
                let effect = act(Action::Speak(text.clone()));
                Dispatch::ack(Ack::Say(text), effect)
            }
            Command::OpenMusic => Dispatch::ack(Ack::OpenMusic, act(Action::OpenMedia)),
            Command::PlayMusic => Dispatch::ack(Ack::PlayMusic, act(Action::PlayMedia)),
            Command::CloseMusic => Dispatch::ack(Ack::CloseMusic, act(Action::CloseMedia)),
            Command::Navigate(direction) => {
                Dispatch::ack(Ack::Navigate(direction), act(Action::Navigate(direction)))
            }
            Command::Confirm => Dispatch::ack(Ack::Confirm, act(Action::Confirm)),
            Command::Click => Dispatch::ack(Ack::Click, act(Action::Click)),
            Command::VolumeUp => Dispatch::ack(Ack::VolumeUp, act(Action::AdjustVolume(step))),
            Command::VolumeDown => {
                Dispatch::ack(Ack::VolumeDown, act(Action::AdjustVolume(-step)))
            }
            Command::Unknown(verb) => Dispatch::reply_only(Reply::Unknown { verb }),
        }
    }

    /// Dispatches the result of [`Command::parse`] or of framing.
    ///
    /// Protocol errors become an `error: ...` reply with no effect; the
    /// connection stays open.
    pub fn dispatch_parsed(
        &self,
        parsed: Result<Command, ProtocolError>,
        context: &DispatchContext,
    ) -> Dispatch {
        match parsed {
            Ok(command) => self.dispatch(command, context),
            Err(error) => Dispatch::reply_only(Reply::Error(error)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use podremote_core::Direction;

    fn dispatcher() -> CommandDispatcher {
        CommandDispatcher::default()
    }

    fn dispatch_line(line: &str) -> Dispatch {
        dispatcher().dispatch_parsed(Command::parse(line), &DispatchContext::default())
    }

    #[test]
    fn test_ping_replies_pong_without_effect() {
        let outcome = dispatch_line("PiNg");

        assert_eq!(outcome.reply, Reply::Pong);
        assert!(outcome.effect.is_none());
    }

    #[test]
    fn test_status_reports_active_connections() {
        // Arrange
        let context = DispatchContext {
            active_connections: 3,
        };

        // Act
        let outcome = dispatcher().dispatch(Command::Status, &context);

        // Assert
        assert_eq!(outcome.reply.to_string(), "status: 3 connected");
        assert!(outcome.effect.is_none());
    }

    #[test]
    fn test_destructive_commands_are_delayed() {
        let cases = [
            ("shutdown", EffectKind::Action(Action::PowerOff)),
            ("RESTART", EffectKind::Action(Action::Restart)),
            ("exit", EffectKind::TerminateProcess),
        ];
        for (line, kind) in cases {
            let outcome = dispatch_line(line);
            let effect = outcome.effect.expect("effect");
            assert_eq!(effect.kind, kind, "line {line:?}");
            assert_eq!(effect.delay, DEFAULT_DESTRUCTIVE_DELAY);
        }
    }

    #[test]
    fn test_custom_destructive_delay_is_used() {
        let dispatcher = CommandDispatcher::new(DispatchSettings {
            destructive_delay: Duration::from_millis(5),
            volume_step: 10,
        });

        let outcome = dispatcher.dispatch(Command::Shutdown, &DispatchContext::default());

        assert_eq!(
            outcome.effect.map(|e| e.delay),
            Some(Duration::from_millis(5))
        );
    }

    #[test]
    fn test_shutdown_reply_text() {
        assert_eq!(dispatch_line("shutdown").reply.to_string(), "ok: shutting down");
    }

    #[test]
    fn test_say_speaks_text_immediately() {
        let outcome = dispatch_line("SAY hola mundo");

        assert_eq!(
            outcome.reply,
            Reply::Ack(Ack::Say("hola mundo".to_string()))
        );
        assert_eq!(
            outcome.effect,
            Some(Effect::immediate(EffectKind::Action(Action::Speak(
                "hola mundo".to_string()
            ))))
        );
    }

    #[test]
    fn test_say_without_text_is_an_error_reply() {
        let outcome = dispatch_line("say");

        assert!(outcome.reply.is_error());
        assert!(outcome.effect.is_none());
    }

    #[test]
    fn test_each_direction_navigates() {
        for (line, direction) in [
            ("up", Direction::Up),
            ("DOWN", Direction::Down),
            ("Left", Direction::Left),
            ("right", Direction::Right),
        ] {
            let outcome = dispatch_line(line);
            assert_eq!(outcome.reply, Reply::Ack(Ack::Navigate(direction)));
            assert_eq!(
                outcome.effect.map(|e| e.kind),
                Some(EffectKind::Action(Action::Navigate(direction)))
            );
        }
    }

    #[test]
    fn test_media_and_pointer_commands() {
        let cases = [
            ("open music", Action::OpenMedia),
            ("play music", Action::PlayMedia),
            ("close-music", Action::CloseMedia),
            ("enter", Action::Confirm),
            ("click", Action::Click),
        ];
        for (line, action) in cases {
            let effect = dispatch_line(line).effect.expect("effect");
            assert_eq!(effect.kind, EffectKind::Action(action), "line {line:?}");
            assert_eq!(effect.delay, Duration::ZERO);
        }
    }

    #[test]
    fn test_volume_uses_configured_step_in_both_directions() {
        let dispatcher = CommandDispatcher::new(DispatchSettings {
            destructive_delay: DEFAULT_DESTRUCTIVE_DELAY,
            volume_step: 7,
        });
        let context = DispatchContext::default();

        let up = dispatcher.dispatch(Command::VolumeUp, &context);
        let down = dispatcher.dispatch(Command::VolumeDown, &context);

        assert_eq!(
            up.effect.map(|e| e.kind),
            Some(EffectKind::Action(Action::AdjustVolume(7)))
        );
        assert_eq!(
            down.effect.map(|e| e.kind),
            Some(EffectKind::Action(Action::AdjustVolume(-7)))
        );
    }

    #[test]
    fn test_unknown_verb_lists_commands_without_effect() {
        let outcome = dispatch_line("launch rockets");

        assert_eq!(
            outcome.reply,
            Reply::Unknown {
                verb: "launch rockets".to_string()
            }
        );
        assert!(outcome.effect.is_none());
    }

    #[test]
    fn test_oversized_frame_error_becomes_error_reply() {
        let outcome = dispatcher().dispatch_parsed(
            Err(ProtocolError::Oversized { max: 1024 }),
            &DispatchContext::default(),
        );

        assert_eq!(outcome.reply.to_string(), "error: command exceeds 1024 bytes");
        assert!(outcome.effect.is_none());
    }
}
