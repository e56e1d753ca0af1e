//! Reply correlation for a single session.
//!
//! Each session awaits exactly one reply (id 2). The outcome is delivered
//! through a one-shot channel whose sender sits in a `Mutex<Option<_>>`;
//! whoever takes it resolves the session, everyone after that is a no-op.

use crate::error::McpResult;
use crate::protocol::JsonRpcMessage;
use serde_json::Value;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Outcome delivered to the waiting invocation.
pub type Outcome = McpResult<Value>;

/// Single-use resolution slot shared by the stream reader and the handshake.
#[derive(Debug)]
pub struct Resolver {
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl Resolver {
    /// Create a resolver and the receiver the caller waits on.
    pub fn new() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let resolver = Self {
            sender: Mutex::new(Some(tx)),
        };
        (resolver, rx)
    }

    /// Deliver an outcome. Returns false if the session was already resolved.
    pub fn resolve(&self, outcome: Outcome) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            // A dropped receiver means the caller already gave up (timeout).
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self.sender.lock() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

/// Matches stream payloads against the awaited id.
#[derive(Debug)]
pub struct Correlator {
    awaited_id: u64,
    resolver: Resolver,
}

impl Correlator {
    pub fn new(awaited_id: u64) -> (Self, oneshot::Receiver<Outcome>) {
        let (resolver, rx) = Resolver::new();
        (
            Self {
                awaited_id,
                resolver,
            },
            rx,
        )
    }

    /// Inspect one payload. Returns true if it resolved the session.
    ///
    /// Payloads that are not JSON (keep-alives and the like), messages with
    /// another id, and anything after resolution are ignored.
    pub fn observe(&self, payload: &str) -> bool {
        if self.resolver.is_resolved() {
            return false;
        }

        let message: JsonRpcMessage = match serde_json::from_str(payload) {
            Ok(message) => message,
            Err(e) => {
                trace!(error = %e, "Ignoring non-JSON event payload");
                return false;
            }
        };

        if message.numeric_id() != Some(self.awaited_id) {
            debug!(id = ?message.id, method = ?message.method, "Ignoring uncorrelated message");
            return false;
        }

        self.resolver.resolve(message.into_outcome())
    }

    /// Resolve with an outcome produced elsewhere (transport or handshake failure).
    pub fn fail(&self, outcome: Outcome) -> bool {
        self.resolver.resolve(outcome)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolver.is_resolved()
    }
}
