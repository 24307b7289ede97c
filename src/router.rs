//! Message router
//!
//! Classifies an active-phase line as a whisper or a broadcast and delivers
//! it. A line is a whisper when the text before its first `/` is the name
//! of a currently registered client. There is no dedicated command prefix,
//! so a broadcast that happens to start with `<live name>/` is delivered as
//! a whisper; existing clients rely on this.

use tracing::debug;

use crate::broadcast::BroadcastSet;
use crate::client::Client;
use crate::message::ServerMessage;
use crate::registry::Registry;

/// Where a line goes
#[derive(Debug)]
pub enum Route {
    /// To one registered client
    Whisper(Client),
    /// To every active session, sender included
    Broadcast,
}

/// Outcome of routing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Whisper queued for the target (or dropped if its sink had closed)
    Whispered { to: String, delivered: bool },
    /// Broadcast accepted by this many sinks
    Broadcast { recipients: usize },
}

/// Candidate whisper target: the text before the first `/`, if any
pub fn whisper_target(line: &str) -> Option<&str> {
    line.split_once('/').map(|(target, _)| target)
}

/// Classify `line` against the current registry
///
/// Uses a single registry lookup so the answer and the resolved client
/// come from the same instant.
pub fn classify(line: &str, registry: &Registry) -> Route {
    match whisper_target(line).and_then(|target| registry.lookup(target)) {
        Some(client) => Route::Whisper(client),
        None => Route::Broadcast,
    }
}

/// Deliver a line sent by `sender`
///
/// Delivery failures are not reported to the sender; the failing peer's
/// own session notices its broken connection and cleans up.
pub async fn route(
    sender: &str,
    line: &str,
    registry: &Registry,
    broadcast: &BroadcastSet,
) -> Delivery {
    match classify(line, registry) {
        Route::Whisper(target) => {
            let msg = ServerMessage::Whisper {
                from: sender.to_string(),
                to: target.name.clone(),
                line: line.to_string(),
            };
            let delivered = target.send(msg).await.is_ok();
            if !delivered {
                debug!("Whisper from {} to {} dropped: sink closed", sender, target.name);
            }
            Delivery::Whispered {
                to: target.name,
                delivered,
            }
        }
        Route::Broadcast => {
            let msg = ServerMessage::Message {
                from: sender.to_string(),
                line: line.to_string(),
            };
            let recipients = broadcast.broadcast(msg).await;
            Delivery::Broadcast { recipients }
        }
    }
}
