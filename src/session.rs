//! Per-connection session
//!
//! Runs one client from accept to disconnect:
//! - Registration: `SUBMITNAME` until the client offers a free name
//! - Activation: announce the newcomer, then enroll its sink
//! - Active loop: every inbound line goes through the router
//! - Termination: announce the departure, release the name and the sink
//!
//! Outbound lines never hit the socket directly. Each session owns a
//! bounded queue drained by its own writer task; the queue's `Sender` is
//! the session's sink in the registry and the broadcast set. A full queue
//! makes whoever is sending wait, so a client that stops reading slows
//! down the chatters talking to it instead of growing memory.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::message::{Registration, ServerMessage};
use crate::router;
use crate::server::ChatState;
use crate::transport::{LineReader, LineTransport, LineWriter};
use crate::types::{SessionId, SessionState};

/// One client connection and its protocol state machine
pub struct Session<S> {
    id: SessionId,
    transport: LineTransport<S>,
    state: ChatState,
    outbound_queue: usize,
    drain_timeout: Duration,
    shutdown: CancellationToken,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Create a session; nothing happens until [`Session::run`]
    ///
    /// `shutdown` ends the session through the normal termination path.
    /// Queue capacity and drain timeout come from `config`.
    pub fn new(
        transport: LineTransport<S>,
        state: ChatState,
        config: &ServerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id: SessionId::new(),
            transport,
            state,
            outbound_queue: config.outbound_queue,
            drain_timeout: config.drain_timeout(),
            shutdown,
        }
    }

    /// Session identifier, used in logs
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Drive the session to completion
    ///
    /// Cleanup runs whatever the outcome. The returned error only says why
    /// this session ended; it never concerns other sessions.
    pub async fn run(self) -> Result<(), AppError> {
        let Session {
            id,
            transport,
            state,
            outbound_queue,
            drain_timeout,
            shutdown,
        } = self;

        debug!("Session {} started for {}", id, transport.peer_addr());

        let (reader, writer) = transport.split();
        let (sender, receiver) = mpsc::channel(outbound_queue);

        // Cancelled by server shutdown, or by the writer when the socket dies
        let closed = shutdown.child_token();

        // Aborted with the session future, so the socket never outlives it
        let mut writer_task = AbortOnDropHandle::new(tokio::spawn(write_lines(
            writer,
            receiver,
            closed.clone(),
            id,
        )));

        let mut conn = Connection {
            id,
            reader,
            sender,
            closed,
            cleanup: Cleanup::new(id, state),
        };

        let result = conn.serve().await;
        conn.cleanup.finish().await;

        // Last sender handle gone: the writer drains its queue and exits
        drop(conn);
        if tokio::time::timeout(drain_timeout, &mut writer_task)
            .await
            .is_err()
        {
            debug!("Session {} writer did not drain in time", id);
            writer_task.abort();
        }

        result
    }
}

/// Live state of a running session
struct Connection<S> {
    id: SessionId,
    reader: LineReader<S>,
    sender: mpsc::Sender<ServerMessage>,
    closed: CancellationToken,
    cleanup: Cleanup,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn serve(&mut self) -> Result<(), AppError> {
        let Some(client) = self.register().await? else {
            debug!("Session {} closed before registering", self.id);
            return Ok(());
        };

        self.activate(&client).await;
        self.chat(&client.name).await
    }

    /// Ask for a name until a free one arrives
    ///
    /// `Ok(None)` if the client goes away first.
    async fn register(&mut self) -> Result<Option<Client>, AppError> {
        loop {
            self.send(ServerMessage::SubmitName).await?;

            let Some(line) = self.read_line().await? else {
                return Ok(None);
            };

            let registration = match Registration::parse(&line) {
                Ok(registration) => registration,
                Err(e) => {
                    warn!("Session {} sent a malformed registration: {:?}", self.id, line);
                    return Err(e);
                }
            };

            let client = Client::new(
                self.id,
                registration.name,
                registration.address,
                self.sender.clone(),
            );
            if self.cleanup.state.registry.try_register(client.clone()) {
                self.cleanup.registered(client.name.clone());
                return Ok(Some(client));
            }

            debug!("Session {} asked for taken name '{}'", self.id, client.name);
        }
    }

    /// Announce the newcomer to current members, then enroll it
    ///
    /// The order means the newcomer never sees its own `NAMEACCEPTED`.
    async fn activate(&mut self, client: &Client) {
        let state = &self.cleanup.state;
        let notified = state
            .broadcast
            .broadcast(ServerMessage::NameAccepted {
                name: client.name.clone(),
                address: client.address.clone(),
            })
            .await;
        state.broadcast.insert(client.id, client.sender.clone());
        self.cleanup.activated();

        info!(
            "Session {} registered as '{}' ({}), announced to {} member(s)",
            self.id, client.name, client.address, notified
        );
    }

    async fn chat(&mut self, name: &str) -> Result<(), AppError> {
        while let Some(line) = self.read_line().await? {
            let state = &self.cleanup.state;
            let delivery = router::route(name, &line, &state.registry, &state.broadcast).await;
            debug!("Session {} routed line: {:?}", self.id, delivery);
        }
        Ok(())
    }

    /// Next line from the client, or `None` once it is gone or we are closing
    async fn read_line(&mut self) -> Result<Option<String>, AppError> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Ok(None),
            line = self.reader.next_line() => line,
        }
    }

    /// Queue a line for this session's own client
    async fn send(&self, msg: ServerMessage) -> Result<(), AppError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}

/// Releases a session's shared-state footprint exactly once
///
/// `finish` is the normal path. If the session future is dropped before
/// reaching it (task abort, panic) `Drop` still releases the name and the
/// sink, without the departure line.
struct Cleanup {
    id: SessionId,
    state: ChatState,
    name: Option<String>,
    phase: SessionState,
}

impl Cleanup {
    fn new(id: SessionId, state: ChatState) -> Self {
        Self {
            id,
            state,
            name: None,
            phase: SessionState::Registering,
        }
    }

    fn registered(&mut self, name: String) {
        self.name = Some(name);
    }

    fn activated(&mut self) {
        self.phase = SessionState::Active;
    }

    async fn finish(&mut self) {
        if self.phase == SessionState::Terminated {
            return;
        }

        let name = self.name.clone().unwrap_or_default();
        let notified = self
            .state
            .broadcast
            .broadcast_except(ServerMessage::Left { name: name.clone() }, self.id)
            .await;

        let was = self.phase;
        self.release();
        info!(
            "Session {} ('{}') left while {}, {} member(s) notified",
            self.id, name, was, notified
        );
    }

    fn release(&mut self) {
        if let Some(name) = &self.name {
            self.state.registry.unregister(name);
        }
        self.state.broadcast.remove(self.id);
        self.phase = SessionState::Terminated;
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if self.phase != SessionState::Terminated {
            warn!("Session {} dropped while {}, releasing", self.id, self.phase);
            self.release();
        }
    }
}

/// Writer task: drain the session's queue onto the socket
async fn write_lines<S>(
    mut writer: LineWriter<S>,
    mut receiver: mpsc::Receiver<ServerMessage>,
    closed: CancellationToken,
    id: SessionId,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(msg) = receiver.recv().await {
        if let Err(e) = writer.send_line(msg.to_string()).await {
            debug!("Write to session {} failed: {}", id, e);
            closed.cancel();
            return;
        }
    }

    let _ = writer.close().await;
    debug!("Writer for session {} finished", id);
}
