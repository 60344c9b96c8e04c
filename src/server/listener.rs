//! Listening socket and accept loop.
//!
//! The server owns the listener and the shutdown flag. Each accepted
//! connection gets its own [`Session`] task; the loop never waits on a
//! session. Once the flag is set (a controller sent `TERMINATE`, or the
//! process received a signal) the loop stops accepting, drops the
//! listener, and gives in-flight sessions a bounded grace period.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{lookup_host, TcpListener};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, info_span, warn, Instrument as _};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::instrument::Instrument;
use crate::protocol::Role;
use crate::registry::{self, Registry};
use crate::server::session::{Session, SessionContext};
use crate::{AppError, Result};

/// A bound instrument server, ready to [`run`](Self::run).
pub struct Server {
    listener: TcpListener,
    context: Arc<SessionContext>,
    drain_timeout: Duration,
    sessions: TaskTracker,
}

impl Server {
    /// Bind using the command table of the configured profile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid role and `AppError::Bind`
    /// if the address does not resolve or no resolved address can be bound.
    pub async fn bind(
        config: &ServerConfig,
        instrument: Box<dyn Instrument>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        Self::bind_with_registry(
            config,
            Registry::for_profile(config.profile),
            instrument,
            shutdown,
        )
        .await
    }

    /// Bind with an explicit command table.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid role and `AppError::Bind`
    /// if the address does not resolve or no resolved address can be bound.
    pub async fn bind_with_registry(
        config: &ServerConfig,
        registry: Registry,
        instrument: Box<dyn Instrument>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let role = Role::new(config.role.clone())?;
        let address = config.bind_address.as_str();

        let candidates = lookup_host(address)
            .await
            .map_err(|err| AppError::Bind(format!("cannot resolve {address}: {err}")))?;
        let listener = bind_first(candidates)
            .await
            .map_err(|err| AppError::Bind(format!("cannot bind {address}: {err}")))?;

        let context = SessionContext {
            role,
            registry,
            instrument: registry::share(instrument),
            shutdown,
            max_line_bytes: config.max_line_bytes,
            read_timeout: config.read_timeout(),
        };

        Ok(Self {
            listener,
            context: Arc::new(context),
            drain_timeout: config.drain_timeout(),
            sessions: TaskTracker::new(),
        })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the socket cannot report its address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the shutdown flag; cancelling it stops the server.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.context.shutdown.clone()
    }

    /// Accept connections until the shutdown flag is set.
    ///
    /// Consumes the server; the listening socket is closed on return.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept failures are logged and the
    /// loop continues.
    pub async fn run(self) -> Result<()> {
        let Self {
            listener,
            context,
            drain_timeout,
            sessions,
        } = self;

        let span = info_span!("server", role = %context.role);
        async move {
            if let Ok(address) = listener.local_addr() {
                info!(%address, commands = context.registry.len(), "server listening");
            }

            loop {
                tokio::select! {
                    biased;
                    () = context.shutdown.cancelled() => {
                        info!("shutdown requested, no longer accepting");
                        break;
                    }
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            let conn_id = Uuid::new_v4();
                            let span = info_span!("session", %conn_id, %peer);
                            let session = Session::new(stream, Arc::clone(&context));
                            info!(parent: &span, "connection accepted");
                            sessions.spawn(session.run().instrument(span));
                        }
                        Err(err) => warn!(%err, "accept failed"),
                    },
                }
            }

            drop(listener);
            sessions.close();
            if tokio::time::timeout(drain_timeout, sessions.wait())
                .await
                .is_err()
            {
                warn!(
                    remaining = sessions.len(),
                    "sessions still running after drain timeout"
                );
            }
            info!("server stopped");
            Ok(())
        }
        .instrument(span)
        .await
    }
}

/// Bind the first resolved address that accepts a listener.
async fn bind_first(candidates: impl Iterator<Item = SocketAddr>) -> std::io::Result<TcpListener> {
    let mut last_err = None;
    for candidate in candidates {
        match TcpListener::bind(candidate).await {
            Ok(listener) => return Ok(listener),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no addresses resolved")
    }))
}
