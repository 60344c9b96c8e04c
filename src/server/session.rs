//! One controller connection, from greeting to close.
//!
//! ```text
//! Greeting ─▶ Listening ─▶ Dispatching ─┐
//!                 ▲                     │ command / bad line: reply
//!                 └─────────────────────┘
//! Listening: EOF, reset, line too long, timeout, shutdown ─▶ Closing
//! Dispatching: STOP, TERMINATE, write failure             ─▶ Closing
//! ```
//!
//! Lines on one connection are handled strictly in order; the next line is
//! not read until the previous reply is written.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::frame::GREETING;
use crate::protocol::{
    decode, encode, reply_text, sentinel, Command, CommandResult, Direction, Frame, LineCodec,
    Role, Sentinel,
};
use crate::registry::{Registry, SharedInstrument};
use crate::{AppError, Result};

/// State shared by every session of one server.
pub struct SessionContext {
    /// Identifier this server answers to.
    pub role: Role,
    /// Commands reachable over the wire.
    pub registry: Registry,
    /// Facade the handlers run against.
    pub instrument: SharedInstrument,
    /// Process-wide shutdown flag; set once, never cleared.
    pub shutdown: CancellationToken,
    /// Longest accepted inbound line.
    pub max_line_bytes: usize,
    /// Idle read timeout, if any.
    pub read_timeout: Option<Duration>,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The controller sent `STOP`.
    Stopped,
    /// The controller sent `TERMINATE`; the shutdown flag is set.
    Terminated,
    /// The peer closed, reset, or aborted the connection.
    Disconnected,
    /// The server is shutting down and the session was idle.
    Shutdown,
    /// A fatal per-connection fault (oversized line, timeout, read or
    /// write error).
    Failed(String),
}

enum Listen {
    Line(Bytes),
    Closed(SessionOutcome),
}

/// Exclusive owner of one accepted connection.
pub struct Session {
    context: Arc<SessionContext>,
    reader: FramedRead<OwnedReadHalf, LineCodec>,
    writer: OwnedWriteHalf,
    open: bool,
}

impl Session {
    /// Take ownership of `stream`.
    #[must_use]
    pub fn new(stream: TcpStream, context: Arc<SessionContext>) -> Self {
        let (read_half, writer) = stream.into_split();
        let reader = FramedRead::new(read_half, LineCodec::new(context.max_line_bytes));
        Self {
            context,
            reader,
            writer,
            open: true,
        }
    }

    /// Serve the connection until it ends, then close it.
    pub async fn run(mut self) -> SessionOutcome {
        let outcome = self.serve().await;
        self.close().await;
        match &outcome {
            SessionOutcome::Failed(reason) => warn!(%reason, "session failed"),
            other => info!(outcome = ?other, "session closed"),
        }
        outcome
    }

    async fn serve(&mut self) -> SessionOutcome {
        if let Err(err) = self.send(GREETING).await {
            return SessionOutcome::Failed(err.to_string());
        }

        loop {
            let line = match self.listen().await {
                Listen::Line(line) => line,
                Listen::Closed(outcome) => return outcome,
            };
            if let ControlFlow::Break(outcome) = self.dispatch(&line).await {
                return outcome;
            }
        }
    }

    /// Wait for the next line, the peer closing, or shutdown.
    async fn listen(&mut self) -> Listen {
        let context = Arc::clone(&self.context);
        let reader = &mut self.reader;

        let read = async {
            match context.read_timeout {
                Some(limit) => tokio::time::timeout(limit, reader.next())
                    .await
                    .unwrap_or_else(|_| {
                        Some(Err(AppError::Timeout(format!(
                            "no line within {}s",
                            limit.as_secs()
                        ))))
                    }),
                None => reader.next().await,
            }
        };

        tokio::select! {
            () = context.shutdown.cancelled() => Listen::Closed(SessionOutcome::Shutdown),
            next = read => match next {
                Some(Ok(line)) => Listen::Line(line),
                None => Listen::Closed(SessionOutcome::Disconnected),
                Some(Err(AppError::Connection(reason))) => {
                    debug!(%reason, "peer dropped the connection");
                    Listen::Closed(SessionOutcome::Disconnected)
                }
                Some(Err(err)) => Listen::Closed(SessionOutcome::Failed(err.to_string())),
            },
        }
    }

    /// Handle one line. Per-line faults are answered, never fatal.
    async fn dispatch(&mut self, line: &[u8]) -> ControlFlow<SessionOutcome> {
        let frame = match decode(line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "rejected line");
                let echo = String::from_utf8_lossy(line);
                return self.reply(&echo, &CommandResult::from_error(&err)).await;
            }
        };

        if let Err(err) = self.check_addressed(&frame) {
            warn!(%err, "misaddressed frame");
            return self
                .reply(&frame.payload, &CommandResult::from_error(&err))
                .await;
        }

        match sentinel(&frame) {
            Some(Sentinel::Stop) => return ControlFlow::Break(SessionOutcome::Stopped),
            Some(Sentinel::Terminate) => {
                info!("terminate requested");
                self.context.shutdown.cancel();
                return ControlFlow::Break(SessionOutcome::Terminated);
            }
            None => {}
        }

        let result = match Command::parse(&frame.payload) {
            Ok(command) => {
                debug!(command = %command.name, args = ?command.args, "dispatching");
                self.context
                    .registry
                    .dispatch(&command, &self.context.instrument)
                    .await
            }
            Err(err) => CommandResult::from_error(&err),
        };
        self.reply(&frame.payload, &result).await
    }

    fn check_addressed(&self, frame: &Frame) -> Result<()> {
        if frame.direction != Direction::ToInstrument {
            return Err(AppError::MalformedFrame(
                "expected a controller frame 'CTL,<role>,...'".into(),
            ));
        }
        if frame.role != self.context.role.as_str() {
            return Err(AppError::MalformedFrame(format!(
                "frame addressed to '{}', this is '{}'",
                frame.role, self.context.role
            )));
        }
        Ok(())
    }

    async fn reply(&mut self, payload: &str, result: &CommandResult) -> ControlFlow<SessionOutcome> {
        match self.send(&reply_text(payload, result)).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(SessionOutcome::Failed(err.to_string())),
        }
    }

    async fn send(&mut self, payload: &str) -> Result<()> {
        let line = encode(self.context.role.as_str(), Direction::ToController, payload)?;
        self.writer
            .write_all(&line)
            .await
            .map_err(|err| AppError::Connection(format!("write failed: {err}")))
    }

    /// Shut the socket down. Safe to call more than once.
    async fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(err) = self.writer.shutdown().await {
            debug!(%err, "socket shutdown failed");
        }
    }
}
