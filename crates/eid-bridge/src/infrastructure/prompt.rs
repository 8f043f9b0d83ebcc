//! Terminal implementation of [`CredentialPrompt`].
//!
//! Questions and notices go to stderr so stdout only carries the result
//! (the redirect URL), which keeps the binary scriptable.  Reading stdin is
//! blocking, so each answer is read on Tokio's blocking pool.
//!
//! Input is echoed; the eID SDK itself offers on-device PIN entry for
//! deployments where that matters.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use tracing::warn;

use crate::application::auth_flow::{Credential, CredentialPrompt, FlowNotice};

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialPrompt for TerminalPrompt {
    async fn credential(&self, credential: Credential) -> Option<String> {
        let answer = ask(format!("Enter {credential} (empty to cancel): ")).await?;
        let answer = answer.trim().to_string();
        (!answer.is_empty()).then_some(answer)
    }

    async fn confirm_access_rights(&self) -> bool {
        ask("Grant the requested access rights? [y/N]: ".to_string())
            .await
            .map(|answer| is_yes(&answer))
            .unwrap_or(false)
    }

    fn notice(&self, notice: FlowNotice) {
        match notice {
            FlowNotice::Started => eprintln!("Authentication started."),
            FlowNotice::InsertCard => eprintln!("Please place your ID card on the reader."),
            FlowNotice::PeerError(kind) => eprintln!("eID SDK reported {kind}."),
        }
    }
}

/// Prints `question` and reads one line.  `None` on EOF or read failure.
async fn ask(question: String) -> Option<String> {
    let read = tokio::task::spawn_blocking(move || {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{question}");
        let _ = stderr.flush();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(e) => {
                warn!("failed to read from terminal: {e}");
                None
            }
        }
    })
    .await;

    read.unwrap_or_else(|e| {
        warn!("terminal prompt task failed: {e}");
        None
    })
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
