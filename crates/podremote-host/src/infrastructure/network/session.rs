//! Session: runs the line protocol on one connection.
//!
//! # Life of a session (for beginners)
//!
//! 1. The accept loop registers the socket (state `Connecting`) and spawns
//!    [`run_session`].
//! 2. The session moves to `Ready` and, if enabled, writes
//!    `welcome to <instance>\n`.
//! 3. It then loops: read a chunk (racing the connection's cancel token),
//!    feed it to the [`LineFramer`], and for every complete line parse it,
//!    dispatch it, write the one reply line, and only then hand the effect
//!    to the connection's [`EffectLane`].  Commands on one connection are
//!    strictly sequential, and so are their immediate effects.  Every read
//!    and write races the cancel token, so a peer that stops reading cannot
//!    hold the server up.
//! 4. EOF, a socket error, or cancellation ends the loop.  The session moves
//!    to `Closing`, shuts the write side down, and unregisters (`Closed`).
//!
//! Nothing here returns an error to the caller: every failure ends only
//! this connection and is logged.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use podremote_core::{
    Command, ConnectionId, ConnectionState, Frame, LineEnding, LineFramer, Reply,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::connection_manager::{ConnectionManager, Registration};
use crate::application::dispatch_command::{CommandDispatcher, Dispatch, DispatchContext};
use crate::infrastructure::actions::scheduler::{EffectLane, EffectRunner};

/// Bytes requested per read.
const READ_CHUNK: usize = 1024;

/// Everything a session needs that is shared across connections.
#[derive(Debug)]
pub struct SessionContext {
    pub manager: Arc<ConnectionManager>,
    pub dispatcher: CommandDispatcher,
    pub effects: EffectRunner,
    pub max_line_len: usize,
    /// Instance name to greet with, or `None` to skip the welcome line.
    pub welcome: Option<String>,
}

/// Why the read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    PeerClosed,
    Cancelled,
}

/// Runs one connection to completion.
///
/// Generic over the stream so tests can drive it with an in-memory mock.
pub async fn run_session<S>(
    mut stream: S,
    remote: SocketAddr,
    registration: Registration,
    context: Arc<SessionContext>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = registration.id;
    let manager = &context.manager;

    if let Err(e) = manager.transition(id, ConnectionState::Ready).await {
        // The server closed everything between accept and now.
        debug!(%id, %remote, error = %e, "connection gone before it became ready");
        manager.unregister(id).await;
        return;
    }
    info!(%id, %remote, "connection ready");

    match serve(&mut stream, &registration, &context).await {
        Ok(CloseReason::PeerClosed) => debug!(%id, "peer closed the connection"),
        Ok(CloseReason::Cancelled) => debug!(%id, "connection cancelled by server"),
        Err(e) => warn!(%id, %remote, error = %e, "connection failed"),
    }

    // Unknown after `close_all`; the entry is already gone then.
    let _ = manager.transition(id, ConnectionState::Closing).await;
    if let Err(e) = stream.shutdown().await {
        debug!(%id, error = %e, "shutdown of write side failed");
    }
    manager.unregister(id).await;
}

async fn serve<S>(
    stream: &mut S,
    registration: &Registration,
    context: &SessionContext,
) -> io::Result<CloseReason>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let cancel = &registration.cancel;
    let lane = context.effects.lane();

    if let Some(instance_name) = &context.welcome {
        let welcome = Reply::Welcome {
            instance_name: instance_name.clone(),
        };
        tokio::select! {
            _ = cancel.cancelled() => return Ok(CloseReason::Cancelled),
            written = write_reply(stream, &welcome, LineEnding::Lf) => written?,
        }
    }

    let mut framer = LineFramer::new(context.max_line_len);
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return Ok(CloseReason::Cancelled),
            read = stream.read(&mut buf) => read?,
        };

        if read == 0 {
            if let Some(frame) = framer.finish() {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(CloseReason::Cancelled),
                    handled = handle_frame(stream, frame, registration.id, context, &lane) => handled?,
                }
            }
            return Ok(CloseReason::PeerClosed);
        }

        framer.push(&buf[..read]);
        while let Some(frame) = framer.next_frame() {
            // A peer that never reads fills the socket buffer; the write must
            // still give way to cancellation.
            tokio::select! {
                _ = cancel.cancelled() => return Ok(CloseReason::Cancelled),
                handled = handle_frame(stream, frame, registration.id, context, &lane) => handled?,
            }
        }
    }
}

async fn handle_frame<S>(
    stream: &mut S,
    frame: Frame,
    id: ConnectionId,
    context: &SessionContext,
    lane: &EffectLane,
) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let ending = frame.ending();
    let parsed = match frame {
        Frame::Line { text, .. } => {
            if text.trim().is_empty() {
                return Ok(());
            }
            Command::parse(&text)
        }
        Frame::Rejected { error, .. } => Err(error),
    };

    match &parsed {
        Ok(command) => debug!(%id, verb = command.verb(), "command received"),
        Err(e) => debug!(%id, error = %e, "command rejected"),
    }

    let dispatch_context = DispatchContext {
        active_connections: context.manager.count().await,
    };
    let Dispatch { reply, effect } = context.dispatcher.dispatch_parsed(parsed, &dispatch_context);

    write_reply(stream, &reply, ending).await?;
    if let Some(effect) = effect {
        if let Err(e) = lane.submit(effect).await {
            warn!(%id, error = %e, "effect dropped");
        }
    }
    Ok(())
}

async fn write_reply<S>(stream: &mut S, reply: &Reply, ending: LineEnding) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(reply.to_line(ending).as_bytes()).await?;
    stream.flush().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::io::Builder;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::application::dispatch_command::DispatchSettings;
    use crate::application::execute_action::ActionExecutor;
    use crate::infrastructure::actions::recording::{RecordedAction, RecordingExecutor};

    fn peer() -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 2], 49152))
    }

    struct Harness {
        context: Arc<SessionContext>,
        executor: Arc<RecordingExecutor>,
        registration: Registration,
    }

    async fn harness(welcome: bool) -> Harness {
        let manager = Arc::new(ConnectionManager::new());
        manager.set_accepting(true).await;
        let registration = manager
            .register(peer(), &CancellationToken::new())
            .await
            .expect("register");
        let executor = Arc::new(RecordingExecutor::new());
        let context = Arc::new(SessionContext {
            manager,
            dispatcher: CommandDispatcher::new(DispatchSettings::default()),
            effects: EffectRunner::new(
                Arc::clone(&executor) as Arc<dyn ActionExecutor>,
                CancellationToken::new(),
            ),
            max_line_len: 16,
            welcome: welcome.then(|| "MacController".to_string()),
        });
        Harness {
            context,
            executor,
            registration,
        }
    }

    async fn settle() {
        // Immediate effects run on the blocking pool.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_welcome_then_pong() {
        // Arrange
        let h = harness(true).await;
        let stream = Builder::new()
            .write(b"welcome to MacController\n")
            .read(b"ping\n")
            .write(b"pong\n")
            .build();

        // Act
        run_session(stream, peer(), h.registration.clone(), Arc::clone(&h.context)).await;

        // Assert
        assert!(h.context.manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_split_delivery_yields_one_reply() {
        let h = harness(false).await;
        let stream = Builder::new()
            .read(b"pi")
            .read(b"ng\n")
            .write(b"pong\n")
            .build();

        run_session(stream, peer(), h.registration.clone(), Arc::clone(&h.context)).await;
    }

    #[tokio::test]
    async fn test_two_commands_in_one_read_get_two_ordered_replies() {
        let h = harness(false).await;
        let stream = Builder::new()
            .read(b"ping\nstatus\n")
            .write(b"pong\n")
            .write(b"status: 1 connected\n")
            .build();

        run_session(stream, peer(), h.registration.clone(), Arc::clone(&h.context)).await;
    }

    #[tokio::test]
    async fn test_crlf_input_gets_crlf_reply_and_blank_lines_are_ignored() {
        let h = harness(false).await;
        let stream = Builder::new()
            .read(b"\r\n\nPING\r\n")
            .write(b"pong\r\n")
            .build();

        run_session(stream, peer(), h.registration.clone(), Arc::clone(&h.context)).await;
    }

    #[tokio::test]
    async fn test_oversized_line_is_rejected_and_session_continues() {
        let h = harness(false).await;
        let stream = Builder::new()
            .read(b"say this line is far too long\n")
            .write(b"error: command exceeds 16 bytes\n")
            .read(b"ping\n")
            .write(b"pong\n")
            .build();

        run_session(stream, peer(), h.registration.clone(), Arc::clone(&h.context)).await;

        settle().await;
        assert!(h.executor.actions().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_gets_error_reply() {
        let h = harness(false).await;
        let stream = Builder::new()
            .read(b"\xff\xfe\n")
            .write(b"error: command is not valid UTF-8\n")
            .build();

        run_session(stream, peer(), h.registration.clone(), Arc::clone(&h.context)).await;
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline_is_processed_at_eof() {
        let h = harness(false).await;
        let stream = Builder::new().read(b"say hi").write(b"ok: saying \"hi\"\n").build();

        run_session(stream, peer(), h.registration.clone(), Arc::clone(&h.context)).await;

        settle().await;
        assert_eq!(h.executor.actions(), vec![RecordedAction::Speak("hi".into())]);
    }

    #[tokio::test]
    async fn test_say_runs_speak_after_reply() {
        let h = harness(false).await;
        let stream = Builder::new()
            .read(b"SAY hola mundo\n")
            .write(b"ok: saying \"hola mundo\"\n")
            .build();

        run_session(stream, peer(), h.registration.clone(), Arc::clone(&h.context)).await;

        settle().await;
        assert_eq!(h.executor.count(&RecordedAction::Speak("hola mundo".into())), 1);
    }

    #[tokio::test]
    async fn test_unregisters_exactly_once_on_eof() {
        // Arrange
        let h = harness(false).await;
        let mut connectivity = h.context.manager.connectivity();
        let stream = Builder::new().read(b"ping\n").write(b"pong\n").build();

        // Act
        run_session(stream, peer(), h.registration.clone(), Arc::clone(&h.context)).await;

        // Assert
        assert_eq!(*connectivity.borrow_and_update(), 0);
        assert!(!h.context.manager.unregister(h.registration.id).await);
    }

    #[tokio::test]
    async fn test_cancelled_registration_ends_session() {
        let h = harness(false).await;
        let (client, server) = tokio::io::duplex(64);
        let cancel = h.registration.cancel.clone();

        let task = tokio::spawn(run_session(
            server,
            peer(),
            h.registration.clone(),
            Arc::clone(&h.context),
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(h.context.manager.count().await, 1);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("session ends")
            .expect("join");

        assert!(h.context.manager.is_empty().await);
        drop(client);
    }

    #[tokio::test]
    async fn test_cancel_ends_session_blocked_writing_to_a_peer_that_never_reads() {
        // Arrange: a tiny pipe fills up after a dozen unread replies.
        let h = harness(false).await;
        let (client, server) = tokio::io::duplex(64);
        let (client_read, mut client_write) = tokio::io::split(client);
        let cancel = h.registration.cancel.clone();

        let session = tokio::spawn(run_session(
            server,
            peer(),
            h.registration.clone(),
            Arc::clone(&h.context),
        ));
        let writer = tokio::spawn(async move {
            let flood = b"ping\n".repeat(200);
            let _ = client_write.write_all(&flood).await;
            client_write
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!session.is_finished());

        // Act
        cancel.cancel();

        // Assert
        tokio::time::timeout(Duration::from_secs(1), session)
            .await
            .expect("session ends despite the blocked write")
            .expect("join");
        assert!(h.context.manager.is_empty().await);
        writer.abort();
        drop(client_read);
    }

    #[tokio::test]
    async fn test_immediate_effects_run_in_command_order() {
        // Arrange: the arrow key is slow, Return is instant.
        let manager = Arc::new(ConnectionManager::new());
        manager.set_accepting(true).await;
        let registration = manager
            .register(peer(), &CancellationToken::new())
            .await
            .expect("register");
        let executor = Arc::new(RecordingExecutor::with_direction_latency(
            Duration::from_millis(200),
        ));
        let context = Arc::new(SessionContext {
            manager,
            dispatcher: CommandDispatcher::default(),
            effects: EffectRunner::new(
                Arc::clone(&executor) as Arc<dyn ActionExecutor>,
                CancellationToken::new(),
            ),
            max_line_len: 64,
            welcome: None,
        });
        let stream = Builder::new()
            .read(b"up\nenter\n")
            .write(b"ok: up\n")
            .write(b"ok: enter\n")
            .build();

        // Act
        run_session(stream, peer(), registration, context).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Assert
        assert_eq!(
            executor.actions(),
            vec![
                RecordedAction::Direction(podremote_core::Direction::Up),
                RecordedAction::Confirm,
            ]
        );
    }
}
