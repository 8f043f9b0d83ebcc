//! Domain logic for the eID SDK protocol.
//!
//! Nothing in here performs I/O or depends on an async runtime.  The session
//! tracker is a plain state machine fed with already-decoded events, so it can
//! be tested without a running SDK.

/// Workflow state inferred from the message sequence.
///
/// See [`session::SessionTracker`] for the main type.
pub mod session;
