//! Headless driver for the SDK's interactive workflows.
//!
//! An authentication against the SDK is a conversation:
//!
//! ```text
//! RUN_AUTH  ─►  AUTH             (started)
//!           ◄─  ACCESS_RIGHTS    ─►  ACCEPT
//!           ◄─  INSERT_CARD          (user places the card)
//!           ◄─  ENTER_PIN        ─►  SET_PIN
//!           ◄─  AUTH + url       (finished)
//! ```
//!
//! [`AuthFlow`] plays the client side of that conversation.  Everything that
//! needs a human (credentials, the access-rights decision, status notices) is
//! delegated to a [`CredentialPrompt`], so the same flow drives a terminal, a
//! GUI, or a scripted test.
//!
//! The flow never decides that the SDK is wrong.  Peer-reported errors such as
//! `BAD_STATE` are shown to the prompt and the flow keeps listening; the SDK
//! ends the workflow when it considers it over.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use eid_core::{Command, DecodedEvent, MessageKind, SessionState};

use crate::application::service::{EidService, SendError};
use crate::domain::peer::Peer;

/// A secret the SDK may ask for during a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Pin,
    Can,
    Puk,
    NewPin,
}

impl Credential {
    /// The command that delivers `value` for this credential.
    pub fn into_command(self, value: String) -> Command {
        match self {
            Credential::Pin => Command::SetPin { pin: value },
            Credential::Can => Command::SetCan { can: value },
            Credential::Puk => Command::SetPuk { puk: value },
            Credential::NewPin => Command::SetNewPin { pin: value },
        }
    }

    fn requested_by(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::EnterPin => Some(Credential::Pin),
            MessageKind::EnterCan => Some(Credential::Can),
            MessageKind::EnterPuk => Some(Credential::Puk),
            MessageKind::EnterNewPin => Some(Credential::NewPin),
            _ => None,
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Credential::Pin => "PIN",
            Credential::Can => "CAN",
            Credential::Puk => "PUK",
            Credential::NewPin => "new PIN",
        })
    }
}

/// Status information shown to the user; requires no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowNotice {
    /// The SDK confirmed the workflow has started.
    Started,
    /// A card must be placed on the reader.
    InsertCard,
    /// The SDK reported a problem with a previous command or itself.
    PeerError(MessageKind),
}

/// The human side of a workflow.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Asks for a credential.  `None` means the user declined, which cancels
    /// the workflow.
    async fn credential(&self, credential: Credential) -> Option<String>;

    /// Asks whether the requested access rights are granted.  Only called
    /// when automatic acceptance is disabled.
    async fn confirm_access_rights(&self) -> bool;

    /// Shows a status notice.
    fn notice(&self, notice: FlowNotice);
}

/// How an authentication ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The SDK finished the authentication; the caller should open `result_url`.
    Completed { result_url: String },
    /// The workflow was cancelled, timed out, or the event stream closed.
    Aborted,
}

/// How a PIN change ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePinOutcome {
    /// The SDK reported the end of the change-PIN workflow.
    Finished,
    /// The workflow was cancelled, timed out, or the event stream closed.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Workflow {
    Auth,
    ChangePin,
}

/// Result of reacting to one event.
enum Step {
    Continue,
    Finished(Option<String>),
    Aborted,
}

/// Drives one workflow at a time against an [`EidService`].
pub struct AuthFlow<P, C> {
    service: Arc<EidService<P>>,
    prompt: C,
}

impl<P: Peer + 'static, C: CredentialPrompt> AuthFlow<P, C> {
    pub fn new(service: Arc<EidService<P>>, prompt: C) -> Self {
        Self { service, prompt }
    }

    pub fn prompt(&self) -> &C {
        &self.prompt
    }

    /// Runs one authentication against the service provider at
    /// `tc_token_url` and waits for it to end.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if a command could not be handed to the peer.
    pub async fn run(&self, tc_token_url: &str) -> Result<AuthOutcome, SendError> {
        let command = Command::RunAuth {
            tc_token_url: tc_token_url.to_string(),
        };
        Ok(match self.drive(Workflow::Auth, command).await? {
            Step::Finished(Some(result_url)) => AuthOutcome::Completed { result_url },
            _ => AuthOutcome::Aborted,
        })
    }

    /// Runs one change-PIN workflow and waits for it to end.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if a command could not be handed to the peer.
    pub async fn change_pin(&self) -> Result<ChangePinOutcome, SendError> {
        let outcome = match self.drive(Workflow::ChangePin, Command::RunChangePin).await? {
            Step::Finished(_) => ChangePinOutcome::Finished,
            _ => ChangePinOutcome::Aborted,
        };
        // CHANGE_PIN does not move the tracked state; release it explicitly.
        self.service.reset_session();
        Ok(outcome)
    }

    async fn drive(&self, workflow: Workflow, command: Command) -> Result<Step, SendError> {
        let dispatcher = Arc::clone(self.service.dispatcher());
        let (token, mut events) = dispatcher.subscribe_channel();
        let mut state = self.service.watch_session();

        info!(command = command.discriminator(), "starting eID workflow");
        let result = match self.service.send_command(&command) {
            Ok(()) => self.listen(workflow, &mut events, &mut state).await,
            Err(e) => Err(e),
        };

        dispatcher.unsubscribe(token);
        result
    }

    async fn listen(
        &self,
        workflow: Workflow,
        events: &mut mpsc::UnboundedReceiver<DecodedEvent>,
        state: &mut watch::Receiver<SessionState>,
    ) -> Result<Step, SendError> {
        let mut entered_session = false;
        let mut new_pin_sent = false;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        return Ok(Step::Aborted);
                    };
                    match self.react(workflow, &event, &mut new_pin_sent).await? {
                        Step::Continue => {}
                        end => return Ok(end),
                    }
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        return Ok(Step::Aborted);
                    }
                    let current = *state.borrow_and_update();
                    if current.is_waiting() {
                        entered_session = true;
                    } else if entered_session && current == SessionState::Idle {
                        debug!("session returned to Idle; workflow abandoned");
                        return Ok(Step::Aborted);
                    }
                }
            }
        }
    }

    async fn react(
        &self,
        workflow: Workflow,
        event: &DecodedEvent,
        new_pin_sent: &mut bool,
    ) -> Result<Step, SendError> {
        if let Some(credential) = Credential::requested_by(event.kind) {
            let Some(value) = self.prompt.credential(credential).await else {
                info!("{credential} entry declined; cancelling workflow");
                self.service.send_command(&Command::Cancel)?;
                return Ok(Step::Aborted);
            };
            self.service.send_command(&credential.into_command(value))?;
            if credential == Credential::NewPin {
                *new_pin_sent = true;
            }
            return Ok(Step::Continue);
        }

        match event.kind {
            MessageKind::Auth if workflow == Workflow::Auth => {
                if let Some(url) = &event.result_url {
                    return Ok(Step::Finished(Some(url.clone())));
                }
                self.prompt.notice(FlowNotice::Started);
            }
            MessageKind::ChangePin if workflow == Workflow::ChangePin => {
                if *new_pin_sent {
                    return Ok(Step::Finished(None));
                }
                self.prompt.notice(FlowNotice::Started);
            }
            MessageKind::AccessRights => {
                let accept = self.service.config().auto_accept_access_rights
                    || self.prompt.confirm_access_rights().await;
                if !accept {
                    info!("access rights declined; cancelling workflow");
                    self.service.send_command(&Command::Cancel)?;
                    return Ok(Step::Aborted);
                }
                self.service.send_command(&Command::Accept)?;
            }
            MessageKind::InsertCard => self.prompt.notice(FlowNotice::InsertCard),
            kind if kind.is_peer_error() => self.prompt.notice(FlowNotice::PeerError(kind)),
            _ => {}
        }
        Ok(Step::Continue)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::EventDispatcher;
    use crate::domain::config::BridgeConfig;
    use crate::infrastructure::peer::ScriptedPeer;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers credential requests from a queue and records what it was shown.
    #[derive(Default)]
    struct QueuedPrompt {
        answers: Mutex<VecDeque<Option<String>>>,
        grant_access: bool,
        asked: Mutex<Vec<Credential>>,
        notices: Mutex<Vec<FlowNotice>>,
    }

    impl QueuedPrompt {
        fn answering(answers: &[Option<&str>]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.map(str::to_string)).collect()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl CredentialPrompt for QueuedPrompt {
        async fn credential(&self, credential: Credential) -> Option<String> {
            self.asked.lock().unwrap().push(credential);
            self.answers.lock().unwrap().pop_front().flatten()
        }

        async fn confirm_access_rights(&self) -> bool {
            self.grant_access
        }

        fn notice(&self, notice: FlowNotice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    fn started_service(peer: ScriptedPeer, config: BridgeConfig) -> (Arc<ScriptedPeer>, Arc<EidService<ScriptedPeer>>) {
        let peer = Arc::new(peer);
        let service = Arc::new(EidService::new(
            Arc::clone(&peer),
            Arc::new(EventDispatcher::new()),
            config,
        ));
        service.start().unwrap();
        (peer, service)
    }

    async fn within_2s<T>(fut: impl std::future::Future<Output = T>) -> T {
        tokio::time::timeout(Duration::from_secs(2), fut)
            .await
            .expect("flow finished within 2s")
    }

    #[tokio::test]
    async fn test_successful_authentication_returns_result_url() {
        // Arrange
        let peer = ScriptedPeer::new()
            .reply_to("RUN_AUTH", &[r#"{"msg":"AUTH"}"#, r#"{"msg":"ACCESS_RIGHTS"}"#])
            .reply_to("ACCEPT", &[r#"{"msg":"INSERT_CARD"}"#, r#"{"msg":"ENTER_PIN"}"#])
            .reply_to("SET_PIN", &[r#"{"msg":"AUTH","url":"https://service.example/done"}"#]);
        let (peer, service) = started_service(peer, BridgeConfig::default());
        let flow = AuthFlow::new(service, QueuedPrompt::answering(&[Some("123456")]));

        // Act
        let outcome = within_2s(flow.run("https://service.example/tcToken")).await.unwrap();

        // Assert
        assert_eq!(
            outcome,
            AuthOutcome::Completed {
                result_url: "https://service.example/done".to_string()
            }
        );
        assert_eq!(peer.sent_commands(), vec!["RUN_AUTH", "ACCEPT", "SET_PIN"]);
        assert_eq!(*flow.prompt().asked.lock().unwrap(), vec![Credential::Pin]);
        assert_eq!(
            *flow.prompt().notices.lock().unwrap(),
            vec![FlowNotice::Started, FlowNotice::InsertCard]
        );
    }

    #[tokio::test]
    async fn test_declined_pin_cancels_workflow() {
        let peer = ScriptedPeer::new()
            .reply_to("RUN_AUTH", &[r#"{"msg":"AUTH"}"#, r#"{"msg":"ENTER_PIN"}"#]);
        let (peer, service) = started_service(peer, BridgeConfig::default());
        let flow = AuthFlow::new(service, QueuedPrompt::answering(&[None]));

        let outcome = within_2s(flow.run("https://x")).await.unwrap();

        assert_eq!(outcome, AuthOutcome::Aborted);
        assert_eq!(peer.sent_commands(), vec!["RUN_AUTH", "CANCEL"]);
    }

    #[tokio::test]
    async fn test_declined_access_rights_cancel_when_not_auto_accepting() {
        let peer = ScriptedPeer::new()
            .reply_to("RUN_AUTH", &[r#"{"msg":"AUTH"}"#, r#"{"msg":"ACCESS_RIGHTS"}"#]);
        let config = BridgeConfig {
            auto_accept_access_rights: false,
            ..BridgeConfig::default()
        };
        let (peer, service) = started_service(peer, config);
        let flow = AuthFlow::new(service, QueuedPrompt::default());

        let outcome = within_2s(flow.run("https://x")).await.unwrap();

        assert_eq!(outcome, AuthOutcome::Aborted);
        assert_eq!(peer.sent_commands(), vec!["RUN_AUTH", "CANCEL"]);
    }

    #[tokio::test]
    async fn test_can_and_puk_requests_are_answered() {
        let peer = ScriptedPeer::new()
            .reply_to("RUN_AUTH", &[r#"{"msg":"AUTH"}"#, r#"{"msg":"ENTER_PUK"}"#])
            .reply_to("SET_PUK", &[r#"{"msg":"ENTER_CAN"}"#])
            .reply_to("SET_CAN", &[r#"{"msg":"ENTER_PIN"}"#])
            .reply_to("SET_PIN", &[r#"{"msg":"AUTH","url":"https://done"}"#]);
        let (peer, service) = started_service(peer, BridgeConfig::default());
        let flow = AuthFlow::new(
            service,
            QueuedPrompt::answering(&[Some("1234567890"), Some("123456"), Some("654321")]),
        );

        let outcome = within_2s(flow.run("https://x")).await.unwrap();

        assert!(matches!(outcome, AuthOutcome::Completed { .. }));
        assert_eq!(
            peer.sent_commands(),
            vec!["RUN_AUTH", "SET_PUK", "SET_CAN", "SET_PIN"]
        );
        assert_eq!(
            peer.sent()[1],
            r#"{"cmd":"SET_PUK","value":"1234567890"}"#
        );
    }

    #[tokio::test]
    async fn test_peer_error_is_shown_and_flow_continues() {
        let peer = ScriptedPeer::new()
            .reply_to("RUN_AUTH", &[r#"{"msg":"AUTH"}"#, r#"{"msg":"ENTER_PIN"}"#])
            .reply_to("SET_PIN", &[r#"{"msg":"BAD_STATE"}"#, r#"{"msg":"AUTH","url":"https://done"}"#]);
        let (_peer, service) = started_service(peer, BridgeConfig::default());
        let flow = AuthFlow::new(service, QueuedPrompt::answering(&[Some("123456")]));

        let outcome = within_2s(flow.run("https://x")).await.unwrap();

        assert!(matches!(outcome, AuthOutcome::Completed { .. }));
        assert!(flow
            .prompt()
            .notices
            .lock()
            .unwrap()
            .contains(&FlowNotice::PeerError(MessageKind::BadState)));
    }

    #[tokio::test]
    async fn test_timeout_aborts_flow() {
        // The SDK never answers the PIN.
        let peer = ScriptedPeer::new()
            .reply_to("RUN_AUTH", &[r#"{"msg":"AUTH"}"#, r#"{"msg":"ACCESS_RIGHTS"}"#]);
        let config = BridgeConfig {
            await_timeout: Duration::from_millis(50),
            ..BridgeConfig::default()
        };
        let (peer, service) = started_service(peer, config);
        let flow = AuthFlow::new(service, QueuedPrompt::default());

        let outcome = within_2s(flow.run("https://x")).await.unwrap();

        assert_eq!(outcome, AuthOutcome::Aborted);
        assert_eq!(peer.sent_commands().last().map(String::as_str), Some("CANCEL"));
    }

    #[tokio::test]
    async fn test_send_failure_is_returned() {
        let peer = ScriptedPeer::new();
        peer.disconnect();
        let (_peer, service) = started_service(peer, BridgeConfig::default());
        let flow = AuthFlow::new(Arc::clone(&service), QueuedPrompt::default());

        let result = flow.run("https://x").await;

        assert!(matches!(result, Err(SendError::Peer(_))));
        assert_eq!(service.dispatcher().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_change_pin_sends_old_and_new_pin() {
        let peer = ScriptedPeer::new()
            .reply_to("RUN_CHANGE_PIN", &[r#"{"msg":"CHANGE_PIN"}"#, r#"{"msg":"ENTER_PIN"}"#])
            .reply_to("SET_PIN", &[r#"{"msg":"ENTER_NEW_PIN"}"#])
            .reply_to("SET_NEW_PIN", &[r#"{"msg":"CHANGE_PIN","success":true}"#]);
        let (peer, service) = started_service(peer, BridgeConfig::default());
        let flow = AuthFlow::new(
            service,
            QueuedPrompt::answering(&[Some("123456"), Some("654321")]),
        );

        let outcome = within_2s(flow.change_pin()).await.unwrap();

        assert_eq!(outcome, ChangePinOutcome::Finished);
        assert_eq!(
            peer.sent_commands(),
            vec!["RUN_CHANGE_PIN", "SET_PIN", "SET_NEW_PIN"]
        );
        assert_eq!(
            *flow.prompt().asked.lock().unwrap(),
            vec![Credential::Pin, Credential::NewPin]
        );
    }
}
