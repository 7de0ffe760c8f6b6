//! The credential lifecycle state machine.
//!
//! One call to [`AuthFlow::obtain`] makes one pass:
//!
//! ```text
//! load() ──► Valid ──────────────────────────────────► credential
//!        ──► Expired ──► Refreshing ──► Valid ───────► credential
//!        │                │ (rejected)
//!        │                ▼
//!        └─► NoCredential ──► Authorizing ──► Valid ─► credential
//! ```
//!
//! `Valid` is the only state that yields a credential. Nothing is retried:
//! cancellation, timeout, and transport failures all surface to the caller.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{AuthError, Result};
use crate::listener::ConsentListener;
use crate::oauth::OAuthClient;
use crate::store::CredentialStore;
use crate::types::Credential;

/// How long `obtain` waits for the user to complete consent.
pub const DEFAULT_CONSENT_TIMEOUT: Duration = Duration::from_secs(120);

/// States of the credential lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    NoCredential,
    Expired,
    Valid,
    Refreshing,
    Authorizing,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::NoCredential => "no-credential",
            FlowState::Expired => "expired",
            FlowState::Valid => "valid",
            FlowState::Refreshing => "refreshing",
            FlowState::Authorizing => "authorizing",
        };
        f.write_str(name)
    }
}

/// Produces a valid, usable credential: stored, refreshed, or newly
/// authorized.
pub struct AuthFlow {
    store: CredentialStore,
    oauth: OAuthClient,
    listener: Box<dyn ConsentListener>,
    consent_timeout: Duration,
    interactive: bool,
    present_url: Box<dyn Fn(&str) + Send + Sync>,
    visited: Vec<FlowState>,
}

impl AuthFlow {
    pub fn new(store: CredentialStore, oauth: OAuthClient, listener: Box<dyn ConsentListener>) -> Self {
        Self {
            store,
            oauth,
            listener,
            consent_timeout: DEFAULT_CONSENT_TIMEOUT,
            interactive: true,
            present_url: Box::new(|url: &str| info!(url = %url, "visit this URL to authorize")),
            visited: Vec::new(),
        }
    }

    pub fn with_consent_timeout(mut self, timeout: Duration) -> Self {
        self.consent_timeout = timeout;
        self
    }

    /// Disable the interactive handshake: reaching `NoCredential` then fails
    /// instead of authorizing. For scripted invocations.
    pub fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// Called with the authorization URL when the flow needs the user to
    /// grant consent.
    pub fn on_authorize_url(mut self, present: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.present_url = Box::new(present);
        self
    }

    /// The states visited by the last `obtain` call, in order.
    pub fn visited(&self) -> &[FlowState] {
        &self.visited
    }

    fn enter(&mut self, state: FlowState) {
        debug!(state = %state, "auth flow transition");
        self.visited.push(state);
    }

    /// Produce a valid credential, or the error that ended the pass.
    pub async fn obtain(&mut self) -> Result<Credential> {
        self.visited.clear();
        let required: BTreeSet<String> = self.oauth.scopes().iter().cloned().collect();

        // A rejected refresh falls through to the handshake; remember the
        // rejection in case the handshake is unavailable.
        let mut refresh_rejection: Option<AuthError> = None;

        match self.store.load() {
            Some(credential) if credential.is_valid(&required) => {
                self.enter(FlowState::Valid);
                info!("stored credential is valid");
                return Ok(credential);
            }
            Some(mut credential) if credential.is_refreshable() => {
                self.enter(FlowState::Expired);
                self.enter(FlowState::Refreshing);
                let refresh_token = credential.refresh_token.clone().unwrap_or_default();

                match self.oauth.refresh(&refresh_token).await {
                    Ok(grant) => {
                        credential.apply_refresh(grant);
                        self.store.save(&credential)?;
                        self.enter(FlowState::Valid);
                        info!("credential refreshed");
                        return Ok(credential);
                    }
                    Err(rejection @ AuthError::RefreshRejected(_)) => {
                        warn!(error = %rejection, "refresh token is dead; a new authorization is needed");
                        self.enter(FlowState::NoCredential);
                        refresh_rejection = Some(rejection);
                    }
                    // The refresh token may still be good; do not discard it
                    // over a transport or server problem.
                    Err(other) => return Err(other),
                }
            }
            Some(_) => {
                debug!("stored credential is expired and not refreshable, or lacks scopes");
                self.enter(FlowState::NoCredential);
            }
            None => {
                self.enter(FlowState::NoCredential);
            }
        }

        if !self.interactive {
            return Err(refresh_rejection.unwrap_or(AuthError::InteractiveRequired));
        }

        self.enter(FlowState::Authorizing);
        let credential = self.authorize().await?;
        self.store.save(&credential)?;
        self.enter(FlowState::Valid);
        info!("authorization complete");
        Ok(credential)
    }

    /// The interactive handshake: loopback listener, consent URL, code
    /// exchange. The listener is scoped to this call.
    async fn authorize(&mut self) -> Result<Credential> {
        let redirect_uri = self.listener.bind().await?;
        let (authorize_url, verifier) = self.oauth.authorize_url(&redirect_uri)?;

        (self.present_url)(&authorize_url);

        let reply = self.listener.wait_for_reply(self.consent_timeout).await?;
        let grant = self
            .oauth
            .exchange_code(&reply.code, &reply.state, &verifier, &redirect_uri)
            .await?;

        Ok(Credential::from_grant(grant, self.oauth.scopes()))
    }
}
