//! Connection acceptor
//!
//! Binds the listener, spawns one session task per accepted connection and
//! owns the shared state those sessions use. Shutdown is driven by a
//! `CancellationToken`: accepting stops, every session runs its normal
//! termination path, and stragglers are aborted after a grace period.

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broadcast::BroadcastSet;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::registry::Registry;
use crate::session::Session;
use crate::transport::LineTransport;
use crate::types::SessionId;

/// State shared by every session for the lifetime of the server
///
/// The two structures are locked independently; nothing needs both at once.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    /// Name → client
    pub registry: Registry,
    /// Sinks of active sessions
    pub broadcast: BroadcastSet,
}

/// The chat server: a bound listener plus shared state
pub struct ChatServer {
    listener: TcpListener,
    state: ChatState,
    config: ServerConfig,
    cancel_token: CancellationToken,
}

impl ChatServer {
    /// Bind the configured address
    ///
    /// Fails if the config is invalid or the address cannot be bound.
    pub async fn bind(
        config: ServerConfig,
        cancel_token: CancellationToken,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind_addr()).await?;
        info!("Chat server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            state: ChatState::default(),
            config,
            cancel_token,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the shared state
    pub fn state(&self) -> ChatState {
        self.state.clone()
    }

    /// Accept connections until cancelled
    ///
    /// Returns an error only for accept failures the server cannot recover
    /// from; sessions are drained before returning either way.
    pub async fn run(self) -> Result<(), AppError> {
        let ChatServer {
            listener,
            state,
            config,
            cancel_token,
        } = self;

        // Also cancelled on a fatal accept error, so sessions wind down
        let sessions_token = cancel_token.child_token();
        let mut sessions: JoinSet<(SessionId, Result<(), AppError>)> = JoinSet::new();

        let result = loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    info!("Shutdown requested, no longer accepting connections");
                    break Ok(());
                }
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    log_session_end(joined);
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }
                        let transport =
                            LineTransport::new(stream, addr.to_string(), config.max_line_length);
                        let session =
                            Session::new(transport, state.clone(), &config, sessions_token.clone());
                        let id = session.id();
                        info!("New connection from {} (session {})", addr, id);
                        sessions.spawn(async move { (id, session.run().await) });
                    }
                    Err(e) if is_transient(&e) => {
                        warn!("Failed to accept connection: {}", e);
                    }
                    Err(e) => {
                        error!("Accept loop failed: {}", e);
                        break Err(AppError::Io(e));
                    }
                },
            }
        };

        drop(listener);
        sessions_token.cancel();

        info!("Waiting for {} session(s) to finish", sessions.len());
        let drain = async {
            while let Some(joined) = sessions.join_next().await {
                log_session_end(joined);
            }
        };
        if tokio::time::timeout(config.shutdown_grace(), drain).await.is_err() {
            warn!("Sessions still running after grace period, closing them");
            sessions.shutdown().await;
        }

        info!("Chat server stopped");
        result
    }
}

/// Accept errors that concern one connection rather than the listener
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

fn log_session_end(joined: Result<(SessionId, Result<(), AppError>), JoinError>) {
    match joined {
        Ok((id, Ok(()))) => debug!("Session {} finished", id),
        // Already reported by the session itself
        Ok((id, Err(AppError::MalformedRegistration(_)))) => {
            debug!("Session {} rejected for protocol violation", id)
        }
        Ok((id, Err(e))) => info!("Session {} ended with error: {}", id, e),
        Err(e) if e.is_cancelled() => debug!("Session task cancelled"),
        Err(e) => error!("Session task panicked: {}", e),
    }
}
