//! Backend API Models
//!
//! Shapes exchanged with the sync backend under `/api`:
//! - SyncStatus: current scheduler/run state
//! - SyncLogEntry: one append-only record per sync cycle
//! - StoredCredentials / CredentialsForm: the credential round trip
//! - Response envelopes for manual sync, OAuth and health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Sync Status & History
// ============================================================================

/// Current sync state as reported by `GET /sync/status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    #[serde(default)]
    pub is_running: bool,

    /// Finish time of the most recent completed run
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub last_sync: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_sync_status: Option<LastSyncStatus>,

    /// Human-readable schedule, e.g. "Every hour at :00"
    #[serde(default)]
    pub next_sync: Option<String>,
}

/// Outcome of the most recent completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastSyncStatus {
    Success,
    Error,
    Running,
    #[serde(other)]
    Unknown,
}

impl LastSyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LastSyncStatus::Success => "success",
            LastSyncStatus::Error => "error",
            LastSyncStatus::Running => "running",
            LastSyncStatus::Unknown => "unknown",
        }
    }
}

/// Status label carried by a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
    Running,
    #[serde(other)]
    Other,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Error => "error",
            LogStatus::Running => "running",
            LogStatus::Other => "other",
        }
    }
}

/// One sync cycle summary. Immutable once the backend finishes the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: String,

    /// "manual" or "automatic"
    pub sync_type: String,

    pub status: LogStatus,

    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub invoices_processed: u32,
    #[serde(default)]
    pub invoices_created: u32,
    #[serde(default)]
    pub clients_created: u32,
    #[serde(default)]
    pub payments_synced: u32,

    #[serde(default)]
    pub errors: Vec<String>,
}

/// Body of a successful `POST /sync/manual`
#[derive(Debug, Clone, Deserialize)]
pub struct ManualSyncResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub result: SyncRunResult,
}

/// Counters reported for a finished manual run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRunResult {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub invoices_processed: u32,
    #[serde(default)]
    pub invoices_created: u32,
    #[serde(default)]
    pub clients_created: u32,
    #[serde(default)]
    pub payments_synced: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

// ============================================================================
// Credentials
// ============================================================================

/// Masked credentials from `GET /settings/credentials`.
///
/// Secret fields only ever carry a mask such as `***` and are never copied
/// into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoredCredentials {
    #[serde(default)]
    pub whmcs_url: Option<String>,
    #[serde(default)]
    pub whmcs_identifier: Option<String>,
    #[serde(default)]
    pub whmcs_secret: Option<String>,
    #[serde(default)]
    pub freeagent_client_id: Option<String>,
    #[serde(default)]
    pub freeagent_client_secret: Option<String>,
    #[serde(default)]
    pub has_access_token: bool,
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Editable credential fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    WhmcsUrl,
    WhmcsIdentifier,
    WhmcsSecret,
    FreeagentClientId,
    FreeagentClientSecret,
}

impl CredentialField {
    /// Form order
    pub const ALL: [CredentialField; 5] = [
        CredentialField::WhmcsUrl,
        CredentialField::WhmcsIdentifier,
        CredentialField::WhmcsSecret,
        CredentialField::FreeagentClientId,
        CredentialField::FreeagentClientSecret,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialField::WhmcsUrl => "whmcs_url",
            CredentialField::WhmcsIdentifier => "whmcs_identifier",
            CredentialField::WhmcsSecret => "whmcs_secret",
            CredentialField::FreeagentClientId => "freeagent_client_id",
            CredentialField::FreeagentClientSecret => "freeagent_client_secret",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CredentialField::WhmcsUrl => "WHMCS URL",
            CredentialField::WhmcsIdentifier => "WHMCS API Identifier",
            CredentialField::WhmcsSecret => "WHMCS API Secret",
            CredentialField::FreeagentClientId => "FreeAgent Client ID",
            CredentialField::FreeagentClientSecret => "FreeAgent Client Secret",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == s)
    }

    pub fn is_secret(&self) -> bool {
        matches!(
            self,
            CredentialField::WhmcsSecret | CredentialField::FreeagentClientSecret
        )
    }
}

/// Credential form state and `POST /settings/credentials` payload.
///
/// Every field is wiped on drop; the two secrets are also wiped whenever the
/// form is reloaded from the backend.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct CredentialsForm {
    pub whmcs_url: String,
    pub whmcs_identifier: String,
    pub whmcs_secret: String,
    pub freeagent_client_id: String,
    pub freeagent_client_secret: String,
}

impl CredentialsForm {
    /// Form populated from stored credentials, secrets left blank
    pub fn from_stored(stored: &StoredCredentials) -> Self {
        Self {
            whmcs_url: stored.whmcs_url.clone().unwrap_or_default(),
            whmcs_identifier: stored.whmcs_identifier.clone().unwrap_or_default(),
            whmcs_secret: String::new(),
            freeagent_client_id: stored.freeagent_client_id.clone().unwrap_or_default(),
            freeagent_client_secret: String::new(),
        }
    }

    pub fn get(&self, field: CredentialField) -> &str {
        match field {
            CredentialField::WhmcsUrl => &self.whmcs_url,
            CredentialField::WhmcsIdentifier => &self.whmcs_identifier,
            CredentialField::WhmcsSecret => &self.whmcs_secret,
            CredentialField::FreeagentClientId => &self.freeagent_client_id,
            CredentialField::FreeagentClientSecret => &self.freeagent_client_secret,
        }
    }

    pub fn set(&mut self, field: CredentialField, value: String) {
        let slot = match field {
            CredentialField::WhmcsUrl => &mut self.whmcs_url,
            CredentialField::WhmcsIdentifier => &mut self.whmcs_identifier,
            CredentialField::WhmcsSecret => &mut self.whmcs_secret,
            CredentialField::FreeagentClientId => &mut self.freeagent_client_id,
            CredentialField::FreeagentClientSecret => &mut self.freeagent_client_secret,
        };
        slot.zeroize();
        *slot = value;
    }

    pub fn clear_secrets(&mut self) {
        self.whmcs_secret.zeroize();
        self.freeagent_client_secret.zeroize();
    }

    /// Every field is required
    pub fn validate(&self) -> Result<(), ValidationError> {
        match CredentialField::ALL
            .into_iter()
            .find(|field| self.get(*field).trim().is_empty())
        {
            Some(field) => Err(ValidationError::MissingField(field)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("CredentialsForm")
            .field("whmcs_url", &self.whmcs_url)
            .field("whmcs_identifier", &self.whmcs_identifier)
            .field("whmcs_secret", &redact(&self.whmcs_secret))
            .field("freeagent_client_id", &self.freeagent_client_id)
            .field("freeagent_client_secret", &redact(&self.freeagent_client_secret))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{} is required", .0.label())]
    MissingField(CredentialField),
}

// ============================================================================
// OAuth & Health
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeResponse {
    pub authorization_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// ============================================================================
// Timestamps
// ============================================================================

/// The backend emits RFC 3339 for aware datetimes and offset-less ISO-8601
/// for the naive UTC values MongoDB hands back. Both are read as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
            return Some(aware.with_timezone(&Utc));
        }
        raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
        }
    }
}
