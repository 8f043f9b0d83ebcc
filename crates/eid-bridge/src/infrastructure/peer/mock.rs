//! Scripted peer for tests and offline demos.
//!
//! Lets tests inject synthetic SDK messages and inspect the commands the
//! service sent, without a running AusweisApp2 instance.  Replies can be
//! scripted per command discriminator so a whole workflow plays out
//! automatically:
//!
//! ```rust
//! use eid_bridge::infrastructure::peer::ScriptedPeer;
//!
//! let peer = ScriptedPeer::new()
//!     .reply_to("RUN_AUTH", &[r#"{"msg":"AUTH"}"#, r#"{"msg":"ACCESS_RIGHTS"}"#])
//!     .reply_to("ACCEPT", &[r#"{"msg":"ENTER_PIN"}"#]);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::domain::peer::{Peer, PeerCallback, PeerError};

/// An in-memory [`Peer`] whose replies are scripted in advance.
///
/// Scripted replies are delivered synchronously from inside `send`, which the
/// `Peer` contract allows; [`emit`](Self::emit) may be called from any thread.
pub struct ScriptedPeer {
    accepts_initialize: bool,
    callback: Mutex<Option<PeerCallback>>,
    sent: Mutex<Vec<String>>,
    /// Per discriminator, one batch of replies per expected send.
    replies: Mutex<HashMap<String, VecDeque<Vec<String>>>>,
    connected: AtomicBool,
}

impl ScriptedPeer {
    /// Creates a peer that accepts initialization and has no scripted replies.
    pub fn new() -> Self {
        Self {
            accepts_initialize: true,
            callback: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            replies: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Creates a peer whose `initialize` always returns `false`.
    pub fn rejecting() -> Self {
        Self {
            accepts_initialize: false,
            ..Self::new()
        }
    }

    /// Scripts the messages emitted the next time a command with
    /// discriminator `cmd` is sent.  Calling this repeatedly for the same
    /// `cmd` queues batches for successive sends.
    pub fn reply_to(self, cmd: &str, messages: &[&str]) -> Self {
        lock(&self.replies)
            .entry(cmd.to_string())
            .or_default()
            .push_back(messages.iter().map(|m| m.to_string()).collect());
        self
    }

    /// Delivers `raw` through the registered callback, as if the SDK had
    /// sent it.
    ///
    /// Returns `false` if no callback has been registered yet.
    pub fn emit(&self, raw: &str) -> bool {
        match lock(&self.callback).as_ref() {
            Some(callback) => {
                callback(raw.to_string());
                true
            }
            None => false,
        }
    }

    /// Every wire string sent so far, in order.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// The `cmd` discriminators of every command sent so far, in order.
    pub fn sent_commands(&self) -> Vec<String> {
        lock(&self.sent)
            .iter()
            .filter_map(|wire| discriminator_of(wire))
            .collect()
    }

    /// `true` once a callback has been registered.
    pub fn is_initialized(&self) -> bool {
        lock(&self.callback).is_some()
    }

    /// Simulates the SDK going away: subsequent sends fail with
    /// [`PeerError::Disconnected`].
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

impl Default for ScriptedPeer {
    fn default() -> Self {
        Self::new()
    }
}

impl Peer for ScriptedPeer {
    fn initialize(&self, callback: PeerCallback) -> bool {
        if !self.accepts_initialize {
            return false;
        }
        *lock(&self.callback) = Some(callback);
        true
    }

    fn send(&self, wire: &str) -> Result<(), PeerError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(PeerError::Disconnected);
        }
        lock(&self.sent).push(wire.to_string());

        let batch = discriminator_of(wire)
            .and_then(|cmd| lock(&self.replies).get_mut(&cmd)?.pop_front());
        for reply in batch.unwrap_or_default() {
            self.emit(&reply);
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn discriminator_of(wire: &str) -> Option<String> {
    let value: Value = serde_json::from_str(wire).ok()?;
    value.get("cmd")?.as_str().map(str::to_string)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
