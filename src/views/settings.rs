//! Settings view - credentials and the FreeAgent connection
//!
//! Mounting consumes any OAuth callback result left in the location query
//! (`?oauth=success|error&message=...`), strips it from the address, then
//! loads the stored credentials. Secret inputs are blank after every load.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::{BackendClient, CredentialField, CredentialsForm};
use crate::host::Host;

use super::{ActionOutcome, Banner, FetchSequence, Redraw, ViewState};

pub const SETTINGS_PATH: &str = "/settings";

const OAUTH_SUCCESS_MESSAGE: &str = "Successfully connected to FreeAgent!";
const OAUTH_ERROR_FALLBACK: &str = "OAuth connection failed";
const SAVE_SUCCESS_MESSAGE: &str = "Credentials saved successfully";
const SAVE_FAILED_FALLBACK: &str = "Failed to save credentials";
const CONNECT_FAILED_FALLBACK: &str = "Failed to initiate FreeAgent connection";
const DISCONNECT_PROMPT: &str = "Are you sure you want to disconnect from FreeAgent?";
const DISCONNECT_SUCCESS_MESSAGE: &str = "Disconnected from FreeAgent";
const DISCONNECT_FAILED_FALLBACK: &str = "Failed to disconnect";

/// OAuth handshake result handed back by the backend's callback redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthCallback {
    Success,
    Error(Option<String>),
}

impl OAuthCallback {
    /// Read `oauth` and `message` from a raw query string
    pub fn from_query(query: &str) -> Option<Self> {
        let mut oauth = None;
        let mut message = None;
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "oauth" => oauth = Some(value.into_owned()),
                "message" => message = Some(value.into_owned()),
                _ => {}
            }
        }

        match oauth.as_deref() {
            Some("success") => Some(OAuthCallback::Success),
            Some("error") => Some(OAuthCallback::Error(message.filter(|m| !m.is_empty()))),
            _ => None,
        }
    }

    pub fn banner(&self) -> Banner {
        match self {
            OAuthCallback::Success => Banner::Success(OAUTH_SUCCESS_MESSAGE.to_string()),
            OAuthCallback::Error(Some(message)) => {
                Banner::Error(format!("{}: {}", OAUTH_ERROR_FALLBACK, message))
            }
            OAuthCallback::Error(None) => Banner::Error(OAUTH_ERROR_FALLBACK.to_string()),
        }
    }
}

/// True when the query carries callback parameters that must be stripped
fn has_callback_params(query: &str) -> bool {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .any(|(key, _)| key == "oauth" || key == "message")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsState {
    pub loading: bool,
    pub form: CredentialsForm,
    pub is_connected: bool,
    pub saving: bool,
    pub connecting: bool,
    pub disconnecting: bool,
    pub banner: Option<Banner>,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            loading: true,
            form: CredentialsForm::default(),
            is_connected: false,
            saving: false,
            connecting: false,
            disconnecting: false,
            banner: None,
        }
    }
}

struct SettingsInner {
    client: Arc<dyn BackendClient>,
    host: Arc<dyn Host>,
    state: ViewState<SettingsState>,
    sequence: FetchSequence,
}

impl SettingsInner {
    async fn load_credentials(&self) {
        let seq = self.sequence.begin();
        let result = self.client.credentials().await;

        self.state
            .update(|state| {
                match result {
                    Ok(stored) => {
                        if self.sequence.try_apply(seq) {
                            let stored = stored.unwrap_or_default();
                            state.form = CredentialsForm::from_stored(&stored);
                            state.is_connected = stored.is_connected;
                        }
                    }
                    Err(e) => log::error!("Error fetching credentials: {}", e),
                }
                state.form.clear_secrets();
                state.loading = false;
            })
            .await;
    }
}

/// Mounted settings page
pub struct SettingsView {
    inner: Arc<SettingsInner>,
    initial_load: JoinHandle<()>,
}

impl SettingsView {
    /// Mount the page for `query` (the part of the location after `?`).
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(
        client: Arc<dyn BackendClient>,
        host: Arc<dyn Host>,
        query: &str,
        redraw: Redraw,
    ) -> Self {
        let mut initial = SettingsState::default();
        if let Some(callback) = OAuthCallback::from_query(query) {
            log::info!("OAuth callback result: {:?}", callback);
            initial.banner = Some(callback.banner());
        }
        if has_callback_params(query) {
            host.replace_location(SETTINGS_PATH);
        }

        let inner = Arc::new(SettingsInner {
            client,
            host,
            state: ViewState::new(initial, redraw),
            sequence: FetchSequence::default(),
        });

        let load_inner = inner.clone();
        let initial_load = tokio::spawn(async move { load_inner.load_credentials().await });

        Self {
            inner,
            initial_load,
        }
    }

    pub async fn snapshot(&self) -> SettingsState {
        self.inner.state.snapshot().await
    }

    /// Re-fetch credentials and connection state
    pub async fn reload(&self) {
        self.inner.load_credentials().await;
    }

    pub async fn set_field(&self, field: CredentialField, value: String) {
        self.inner.state.update(|state| state.form.set(field, value)).await;
    }

    /// Validate and submit the form, then reload on success
    pub async fn save(&self) -> ActionOutcome {
        let form = self
            .inner
            .state
            .update(|state| {
                if state.saving {
                    return Err(None);
                }
                if let Err(e) = state.form.validate() {
                    state.banner = Some(Banner::Error(e.to_string()));
                    return Err(Some(e));
                }
                state.saving = true;
                state.banner = None;
                Ok(state.form.clone())
            })
            .await;

        let form = match form {
            Ok(form) => form,
            Err(None) => return ActionOutcome::Skipped,
            Err(Some(e)) => {
                log::warn!("Credentials not saved: {}", e);
                return ActionOutcome::Failed;
            }
        };

        let result = self.inner.client.save_credentials(&form).await;
        drop(form);

        match result {
            Ok(()) => {
                log::info!("Credentials saved");
                self.inner
                    .state
                    .update(|state| {
                        state.saving = false;
                        state.banner = Some(Banner::Success(SAVE_SUCCESS_MESSAGE.to_string()));
                    })
                    .await;
                self.inner.load_credentials().await;
                ActionOutcome::Completed
            }
            Err(e) => {
                log::error!("Error saving credentials: {}", e);
                let message = e.user_message(SAVE_FAILED_FALLBACK);
                self.inner
                    .state
                    .update(|state| {
                        state.saving = false;
                        state.banner = Some(Banner::Error(message));
                    })
                    .await;
                ActionOutcome::Failed
            }
        }
    }

    /// Fetch the provider consent URL and hand it to the host
    pub async fn connect(&self) -> ActionOutcome {
        let claimed = self
            .inner
            .state
            .update(|state| {
                if state.connecting {
                    return false;
                }
                state.connecting = true;
                state.banner = None;
                true
            })
            .await;
        if !claimed {
            return ActionOutcome::Skipped;
        }

        match self.inner.client.authorize_url().await {
            Ok(url) => {
                log::info!("Redirecting to FreeAgent authorization");
                self.inner.host.open_external(&url);
                self.inner.state.update(|state| state.connecting = false).await;
                ActionOutcome::Completed
            }
            Err(e) => {
                log::error!("Error initiating OAuth: {}", e);
                let message = e.user_message(CONNECT_FAILED_FALLBACK);
                self.inner
                    .state
                    .update(|state| {
                        state.connecting = false;
                        state.banner = Some(Banner::Error(message));
                    })
                    .await;
                ActionOutcome::Failed
            }
        }
    }

    /// Confirm with the user, then drop the FreeAgent tokens
    pub async fn disconnect(&self) -> ActionOutcome {
        if self.snapshot().await.disconnecting {
            return ActionOutcome::Skipped;
        }
        if !self.inner.host.confirm(DISCONNECT_PROMPT).await {
            log::info!("Disconnect cancelled");
            return ActionOutcome::Skipped;
        }

        let claimed = self
            .inner
            .state
            .update(|state| {
                if state.disconnecting {
                    return false;
                }
                state.disconnecting = true;
                state.banner = None;
                true
            })
            .await;
        if !claimed {
            return ActionOutcome::Skipped;
        }

        match self.inner.client.disconnect().await {
            Ok(()) => {
                log::info!("FreeAgent disconnected");
                self.inner
                    .state
                    .update(|state| {
                        state.disconnecting = false;
                        state.is_connected = false;
                        state.banner =
                            Some(Banner::Success(DISCONNECT_SUCCESS_MESSAGE.to_string()));
                    })
                    .await;
                ActionOutcome::Completed
            }
            Err(e) => {
                log::error!("Error disconnecting: {}", e);
                let message = e.user_message(DISCONNECT_FAILED_FALLBACK);
                self.inner
                    .state
                    .update(|state| {
                        state.disconnecting = false;
                        state.banner = Some(Banner::Error(message));
                    })
                    .await;
                ActionOutcome::Failed
            }
        }
    }

    pub async fn dismiss_banner(&self) {
        self.inner.state.update(|state| state.banner = None).await;
    }

    /// Cancel the initial load if it is still pending
    pub fn unmount(&self) {
        self.initial_load.abort();
    }
}

impl Drop for SettingsView {
    fn drop(&mut self) {
        self.unmount();
    }
}
