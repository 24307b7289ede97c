//! Line-based TCP Chat Server Library
//!
//! A multi-client broadcast chat server speaking a newline-delimited text
//! protocol, built on tokio.
//!
//! # Features
//! - Unique screen name registration (`SUBMITNAME` until a free name arrives)
//! - Join announcements to existing members
//! - Broadcast messages, echoed back to the sender
//! - Whispers: a line starting with `<name>/` goes only to that member
//! - Departure announcements and name release on disconnect
//! - Graceful shutdown
//!
//! # Architecture
//! One task per connection, sharing two independently locked structures:
//! - `Registry` maps screen names to client handles and arbitrates uniqueness
//! - `BroadcastSet` holds the sinks of every active session
//! - Each `Session` owns a bounded outbound queue drained by a writer task
//!
//! # Example
//! ```ignore
//! use line_chat_server::{ChatServer, ServerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), line_chat_server::AppError> {
//!     let server = ChatServer::bind(ServerConfig::default(), CancellationToken::new()).await?;
//!     server.run().await
//! }
//! ```

pub mod broadcast;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use broadcast::BroadcastSet;
pub use client::Client;
pub use config::ServerConfig;
pub use error::{AppError, SendError};
pub use message::{Registration, ServerMessage};
pub use registry::Registry;
pub use router::{route, Delivery, Route};
pub use server::{ChatServer, ChatState};
pub use session::Session;
pub use transport::LineTransport;
pub use types::{SessionId, SessionState};
