//! Application layer for eid-bridge.
//!
//! Knows *what* happens when commands go out and messages come in, and
//! delegates *how* bytes travel to the [`Peer`](crate::domain::Peer) the
//! infrastructure layer provides.
//!
//! # Responsibilities
//!
//! - Owning the single peer callback and the dispatch task (`service`)
//! - Fanning decoded messages out to subscribers (`dispatcher`)
//! - Playing the client side of interactive workflows (`auth_flow`)
//!
//! # What does NOT belong here?
//!
//! - Sockets, terminals, or files (that is infrastructure)
//! - Wire formats (that is `eid-core`)

pub mod auth_flow;
pub mod dispatcher;
pub mod service;

pub use auth_flow::{AuthFlow, AuthOutcome, ChangePinOutcome, Credential, CredentialPrompt, FlowNotice};
pub use dispatcher::{EventDispatcher, EventHandler, SubscriptionToken};
pub use service::{EidService, SendError, StartupError};
