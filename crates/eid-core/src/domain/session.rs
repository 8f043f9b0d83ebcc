//! Implicit workflow state inferred from the SDK's message sequence.
//!
//! The SDK never reports "which step are we in" directly.  The step has to be
//! inferred from the messages it sends.  The most important case is `AUTH`,
//! which means *started* without a URL and *finished* with one.
//!
//! # State machine
//!
//! ```text
//!            AUTH (no url)           ACCESS_RIGHTS                  ENTER_PIN
//!   Idle ─────────────────► Started ───────────────► AwaitingAccessRights ─────► AwaitingPin
//!    ▲                                                    Decision                    │
//!    │                                                                                │ AUTH (url)
//!    └──────────────── reset (CANCEL sent / timeout) ◄──────── Completed ◄────────────┘
//! ```
//!
//! `ENTER_CAN`, `ENTER_PUK` and `ENTER_NEW_PIN` lead to their own awaiting
//! states.  Any other message, including `BAD_STATE` and the other peer-error
//! kinds, leaves the state untouched: the SDK is the authority on which
//! commands are legal, and this tracker only observes.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::protocol::messages::{DecodedEvent, MessageKind};

/// Where the current session stands, as far as the message sequence tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No authentication in progress.
    #[default]
    Idle,
    /// `AUTH` without URL received.
    Started,
    /// `ACCESS_RIGHTS` received; the SDK waits for `ACCEPT` or `CANCEL`.
    AwaitingAccessRightsDecision,
    /// `ENTER_PIN` received; the SDK waits for `SET_PIN`.
    AwaitingPin,
    /// `ENTER_CAN` received; the SDK waits for `SET_CAN`.
    AwaitingCan,
    /// `ENTER_PUK` received; the SDK waits for `SET_PUK`.
    AwaitingPuk,
    /// `ENTER_NEW_PIN` received; the SDK waits for `SET_NEW_PIN`.
    AwaitingNewPin,
    /// `AUTH` with URL received.
    Completed,
}

impl SessionState {
    /// Pure transition function.
    ///
    /// Returns the state that follows `self` after observing `event`.
    pub fn apply(self, event: &DecodedEvent) -> SessionState {
        match event.kind {
            MessageKind::Auth if event.result_url.is_some() => SessionState::Completed,
            MessageKind::Auth => SessionState::Started,
            MessageKind::AccessRights => SessionState::AwaitingAccessRightsDecision,
            MessageKind::EnterPin => SessionState::AwaitingPin,
            MessageKind::EnterCan => SessionState::AwaitingCan,
            MessageKind::EnterPuk => SessionState::AwaitingPuk,
            MessageKind::EnterNewPin => SessionState::AwaitingNewPin,
            _ => self,
        }
    }

    /// `true` while the session expects a further message from the SDK.
    ///
    /// `Idle` and `Completed` expect nothing; every other state does.
    pub fn is_waiting(self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Completed)
    }
}

/// The outcome of feeding one event into a [`SessionTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
}

impl StateTransition {
    /// `true` if the event moved the session to a different state.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Tracks a single session's state across events.
///
/// One tracker exists per service; it is owned by the dispatch task and never
/// shared, so it needs no interior locking.
#[derive(Debug)]
pub struct SessionTracker {
    state: SessionState,
    entered_at: Instant,
    attempt_id: Option<Uuid>,
}

impl SessionTracker {
    /// Creates a tracker in [`SessionState::Idle`].
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            entered_at: Instant::now(),
            attempt_id: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identifier of the current authentication attempt, assigned whenever the
    /// session enters `Started` from outside an attempt.
    pub fn attempt_id(&self) -> Option<Uuid> {
        self.attempt_id
    }

    /// Time spent in the current state.
    pub fn time_in_state(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Applies one event and reports the transition.
    pub fn apply(&mut self, event: &DecodedEvent) -> StateTransition {
        let from = self.state;
        let to = from.apply(event);

        // A bare AUTH after Idle or Completed opens a new attempt; one arriving
        // mid-workflow (a retry after an error) keeps the current id.
        let opens_attempt = matches!(from, SessionState::Idle | SessionState::Completed)
            || self.attempt_id.is_none();
        if to == SessionState::Started && opens_attempt {
            self.attempt_id = Some(Uuid::new_v4());
        }

        if to != from {
            self.state = to;
            self.entered_at = Instant::now();
        }

        StateTransition { from, to }
    }

    /// Returns the tracker to `Idle`, ending the current attempt.
    pub fn reset(&mut self) -> StateTransition {
        let from = self.state;
        self.state = SessionState::Idle;
        self.entered_at = Instant::now();
        self.attempt_id = None;
        StateTransition {
            from,
            to: SessionState::Idle,
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
