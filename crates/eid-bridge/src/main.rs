//! eID bridge: command-line client for the AusweisApp2 SDK.
//!
//! Connects to a running AusweisApp2 over its local WebSocket endpoint and
//! runs one workflow: an online authentication, a PIN change, or a simple
//! `GET_INFO` round trip.
//!
//! # Usage
//!
//! ```text
//! eid-bridge [OPTIONS] [COMMAND]
//!
//! Commands:
//!   auth         Run one authentication (default)
//!   change-pin   Change the card PIN
//!   info         Ask the SDK for its version information
//!   save-config  Write the effective settings to the config file
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config dir]
//!   --peer-url <URL>         eID SDK WebSocket endpoint
//!   --tc-token-url <URL>     TC token URL of the service provider
//!   --await-timeout <SECS>   Longest wait for the next SDK message (0: none)
//!   --api-level <LEVEL>      API level announced at startup
//!   --no-auto-accept         Ask before granting access rights
//!   --log-level <LEVEL>      Log level when RUST_LOG is unset
//! ```
//!
//! # Precedence
//!
//! CLI arguments (and their `EID_*` environment variables) override the config
//! file, which overrides the built-in defaults.
//!
//! The result URL of a successful authentication is printed on stdout; prompts
//! and logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use eid_bridge::application::{AuthFlow, AuthOutcome, ChangePinOutcome, EidService, EventDispatcher};
use eid_bridge::infrastructure::peer::WebSocketPeer;
use eid_bridge::infrastructure::storage::{default_config_path, load_config, save_config, AppConfig};
use eid_bridge::infrastructure::TerminalPrompt;
use eid_core::{Command, MessageKind};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Command-line client for the AusweisApp2 eID SDK.
#[derive(Debug, Parser)]
#[command(name = "eid-bridge", about = "Command-line client for the AusweisApp2 eID SDK", version)]
struct Cli {
    /// Path of the TOML config file.
    #[arg(long, env = "EID_CONFIG")]
    config: Option<PathBuf>,

    /// WebSocket URL of the SDK's eID-Kernel endpoint.
    #[arg(long, env = "EID_PEER_URL")]
    peer_url: Option<String>,

    /// TC token URL sent with `RUN_AUTH`.
    #[arg(long, env = "EID_TC_TOKEN_URL")]
    tc_token_url: Option<String>,

    /// Seconds to wait for the next SDK message during a workflow; 0 waits
    /// indefinitely.
    #[arg(long, env = "EID_AWAIT_TIMEOUT")]
    await_timeout: Option<u64>,

    /// API level announced with `SET_API_LEVEL` at startup.
    #[arg(long, env = "EID_API_LEVEL")]
    api_level: Option<u32>,

    /// Ask before answering `ACCESS_RIGHTS` instead of accepting.
    #[arg(long)]
    no_auto_accept: bool,

    /// `tracing` level used when `RUST_LOG` is unset.
    #[arg(long, env = "EID_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum CliCommand {
    /// Run one authentication.
    Auth,
    /// Change the card PIN.
    ChangePin,
    /// Ask the SDK for its version information.
    Info,
    /// Write the effective settings to the config file.
    SaveConfig,
}

impl Cli {
    /// The config file to read: `--config`, else the platform default.
    fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| default_config_path().ok())
    }

    /// Layers the CLI arguments over `file`.
    fn apply(&self, mut file: AppConfig) -> AppConfig {
        if let Some(url) = &self.peer_url {
            file.sdk.peer_url = url.clone();
        }
        if let Some(level) = self.api_level {
            file.sdk.api_level = Some(level);
        }
        if let Some(url) = &self.tc_token_url {
            file.auth.tc_token_url = url.clone();
        }
        if let Some(secs) = self.await_timeout {
            file.auth.await_timeout_secs = secs;
        }
        if self.no_auto_accept {
            file.auth.auto_accept_access_rights = false;
        }
        if let Some(level) = &self.log_level {
            file.logging.log_level = level.clone();
        }
        file
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config_path();
    let file_config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    let app_config = cli.apply(file_config);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config.logging.log_level)),
        )
        .init();

    let command = cli.command.unwrap_or(CliCommand::Auth);
    if command == CliCommand::SaveConfig {
        let path = config_path.context("no config path could be determined; pass --config")?;
        save_config(&path, &app_config)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        info!("config written to {}", path.display());
        return Ok(());
    }

    let config = app_config.into_bridge_config();
    info!("eID bridge starting, SDK at {}", config.peer_url);

    let peer = Arc::new(WebSocketPeer::connect(&config.peer_url).await?);
    let service = Arc::new(EidService::new(peer, Arc::new(EventDispatcher::new()), config));
    service.start().context("failed to start eID service")?;

    tokio::select! {
        result = run_command(command, &service) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("received Ctrl+C, cancelling workflow");
            // Best effort; the process exits either way.
            let _ = service.send_command(&Command::Cancel);
            Ok(())
        }
    }
}

async fn run_command(command: CliCommand, service: &Arc<EidService<WebSocketPeer>>) -> anyhow::Result<()> {
    match command {
        CliCommand::Auth => {
            let flow = AuthFlow::new(Arc::clone(service), TerminalPrompt::new());
            match flow.run(&service.config().tc_token_url).await? {
                AuthOutcome::Completed { result_url } => {
                    println!("{result_url}");
                    Ok(())
                }
                AuthOutcome::Aborted => anyhow::bail!("authentication aborted"),
            }
        }
        CliCommand::ChangePin => {
            let flow = AuthFlow::new(Arc::clone(service), TerminalPrompt::new());
            match flow.change_pin().await? {
                ChangePinOutcome::Finished => {
                    eprintln!("PIN change finished.");
                    Ok(())
                }
                ChangePinOutcome::Aborted => anyhow::bail!("PIN change aborted"),
            }
        }
        CliCommand::Info => query_info(service, service.config().await_timeout).await,
        CliCommand::SaveConfig => Ok(()),
    }
}

/// Sends `GET_INFO` and prints the kind of the first relevant reply.
async fn query_info(service: &EidService<WebSocketPeer>, wait: Duration) -> anyhow::Result<()> {
    let dispatcher = Arc::clone(service.dispatcher());
    let (token, mut events) = dispatcher.subscribe_channel();
    service.send_command(&Command::GetInfo)?;

    let first_reply = async {
        while let Some(event) = events.recv().await {
            if event.kind == MessageKind::Info || event.kind.is_peer_error() {
                return Some(event.kind);
            }
        }
        None
    };
    let reply = if wait.is_zero() {
        Ok(first_reply.await)
    } else {
        tokio::time::timeout(wait, first_reply).await
    };
    dispatcher.unsubscribe(token);

    match reply {
        Ok(Some(kind)) => {
            println!("{kind}");
            Ok(())
        }
        Ok(None) => anyhow::bail!("eID SDK connection closed before replying"),
        Err(_) => anyhow::bail!("no reply from eID SDK within {wait:?}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use eid_bridge::domain::BridgeConfig;

    #[test]
    fn test_cli_defaults_leave_everything_unset() {
        // Arrange / Act
        let cli = Cli::parse_from(["eid-bridge"]);

        // Assert
        assert_eq!(cli.peer_url, None);
        assert_eq!(cli.await_timeout, None);
        assert!(!cli.no_auto_accept);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_cli_without_overrides_keeps_file_values() {
        let cli = Cli::parse_from(["eid-bridge"]);
        let mut file = AppConfig::default();
        file.auth.tc_token_url = "https://from-file.example".to_string();

        let merged = cli.apply(file.clone());

        assert_eq!(merged, file);
    }

    #[test]
    fn test_cli_overrides_take_precedence_over_file() {
        // Arrange
        let cli = Cli::parse_from([
            "eid-bridge",
            "--peer-url",
            "ws://10.0.0.5:24727/eID-Kernel",
            "--tc-token-url",
            "https://from-cli.example",
            "--await-timeout",
            "30",
            "--api-level",
            "2",
            "--no-auto-accept",
            "--log-level",
            "debug",
        ]);
        let mut file = AppConfig::default();
        file.auth.tc_token_url = "https://from-file.example".to_string();

        // Act
        let merged = cli.apply(file);
        let log_level = merged.logging.log_level.clone();
        let config = merged.into_bridge_config();

        // Assert
        assert_eq!(config.peer_url, "ws://10.0.0.5:24727/eID-Kernel");
        assert_eq!(config.tc_token_url, "https://from-cli.example");
        assert_eq!(config.await_timeout, Duration::from_secs(30));
        assert_eq!(config.api_level, Some(2));
        assert!(!config.auto_accept_access_rights);
        assert_eq!(log_level, "debug");
    }

    #[test]
    fn test_defaults_without_file_or_cli_match_bridge_defaults() {
        let cli = Cli::parse_from(["eid-bridge"]);
        let config = cli.apply(AppConfig::default()).into_bridge_config();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_subcommands_parse() {
        assert_eq!(Cli::parse_from(["eid-bridge", "auth"]).command, Some(CliCommand::Auth));
        assert_eq!(
            Cli::parse_from(["eid-bridge", "change-pin"]).command,
            Some(CliCommand::ChangePin)
        );
        assert_eq!(Cli::parse_from(["eid-bridge", "info"]).command, Some(CliCommand::Info));
        assert_eq!(
            Cli::parse_from(["eid-bridge", "save-config"]).command,
            Some(CliCommand::SaveConfig)
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let cli = Cli::parse_from(["eid-bridge", "--config", "/tmp/eid.toml"]);
        assert_eq!(cli.config_path(), Some(PathBuf::from("/tmp/eid.toml")));
    }

    #[test]
    fn test_zero_await_timeout_disables_the_wait() {
        let cli = Cli::parse_from(["eid-bridge", "--await-timeout", "0"]);
        let config = cli.apply(AppConfig::default()).into_bridge_config();
        assert!(config.await_timeout.is_zero());
    }

    #[test]
    fn test_invalid_await_timeout_is_rejected() {
        let result = Cli::try_parse_from(["eid-bridge", "--await-timeout", "soon"]);
        assert!(result.is_err());
    }
}
