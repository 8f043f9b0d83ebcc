//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is populated by the infrastructure layer (TOML file, CLI arguments,
//! environment variables) and handed to the service by value.
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads inside the domain) makes the service easy to embed in tests.

use std::time::Duration;

/// Default WebSocket endpoint of a locally running AusweisApp2 SDK.
pub const DEFAULT_PEER_URL: &str = "ws://127.0.0.1:24727/eID-Kernel";

/// Default TC token URL: the public Governikus test service.
pub const DEFAULT_TC_TOKEN_URL: &str =
    "https://test.governikus-eid.de/Autent-DemoApplication/RequestServlet?provider=demo_epa_20&redirect=true";

/// All runtime configuration for the eID bridge.
///
/// # Example
///
/// ```rust
/// use eid_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.await_timeout.as_secs(), 120);
/// assert!(cfg.cancel_on_timeout);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// WebSocket URL of the SDK's eID-Kernel endpoint.
    pub peer_url: String,

    /// TC token URL sent with `RUN_AUTH`.
    ///
    /// Always caller-supplied: the service provider endpoint depends on the
    /// deployment, so nothing in the protocol core hardcodes it.
    pub tc_token_url: String,

    /// Longest time the service waits for the next SDK message while the
    /// session is in a waiting state (`Started`, `AwaitingPin`, ...).
    /// `Duration::ZERO` disables the timeout.
    pub await_timeout: Duration,

    /// Whether an expired wait also sends `CANCEL` to the SDK.
    pub cancel_on_timeout: bool,

    /// Whether the authentication flow answers `ACCESS_RIGHTS` with `ACCEPT`
    /// without asking.
    pub auto_accept_access_rights: bool,

    /// API level announced with `SET_API_LEVEL` right after startup.
    ///
    /// `None` leaves the SDK at its default level.
    pub api_level: Option<u32>,
}

impl Default for BridgeConfig {
    /// | Field                      | Default                              |
    /// |----------------------------|--------------------------------------|
    /// | peer_url                   | `ws://127.0.0.1:24727/eID-Kernel`    |
    /// | tc_token_url               | Governikus test service              |
    /// | await_timeout              | 120 seconds                          |
    /// | cancel_on_timeout          | `true`                               |
    /// | auto_accept_access_rights  | `true`                               |
    /// | api_level                  | `None`                               |
    fn default() -> Self {
        Self {
            peer_url: DEFAULT_PEER_URL.to_string(),
            tc_token_url: DEFAULT_TC_TOKEN_URL.to_string(),
            await_timeout: Duration::from_secs(120),
            cancel_on_timeout: true,
            auto_accept_access_rights: true,
            api_level: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
