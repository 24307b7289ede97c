//! Line transport
//!
//! Wraps one byte stream as a duplex stream of newline-terminated lines.
//! Knows nothing about the chat protocol. Generic over the stream so that
//! sessions can run over TCP in production and `tokio::io::duplex` in tests.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LinesCodec};

use crate::error::AppError;

/// One connection framed into lines
pub struct LineTransport<S> {
    framed: Framed<S, LinesCodec>,
    peer_addr: String,
}

impl<S> LineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Frame `stream`, rejecting inbound lines longer than `max_line_length`
    pub fn new(stream: S, peer_addr: impl Into<String>, max_line_length: usize) -> Self {
        Self {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(max_line_length)),
            peer_addr: peer_addr.into(),
        }
    }

    /// Remote address, informational
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Split into independently owned read and write halves
    pub fn split(self) -> (LineReader<S>, LineWriter<S>) {
        let (sink, stream) = self.framed.split();
        (LineReader { inner: stream }, LineWriter { inner: sink })
    }
}

/// Read half
pub struct LineReader<S> {
    inner: SplitStream<Framed<S, LinesCodec>>,
}

impl<S> LineReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Next line without its terminator (`\r\n` is accepted too)
    ///
    /// `Ok(None)` means the peer closed the connection.
    pub async fn next_line(&mut self) -> Result<Option<String>, AppError> {
        match self.inner.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

/// Write half
pub struct LineWriter<S> {
    inner: SplitSink<Framed<S, LinesCodec>, String>,
}

impl<S> LineWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Write one line and flush it
    pub async fn send_line(&mut self, line: String) -> Result<(), AppError> {
        self.inner.send(line).await?;
        Ok(())
    }

    /// Flush and shut down the write side
    pub async fn close(&mut self) -> Result<(), AppError> {
        self.inner.close().await?;
        Ok(())
    }
}
