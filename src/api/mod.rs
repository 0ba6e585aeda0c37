//! Backend API - typed contract and HTTP client
//!
//! The dashboard holds no business logic of its own; everything it shows
//! comes from the sync backend under `{BACKEND_URL}/api`.

pub mod client;
pub mod models;

pub use client::{ApiError, BackendClient, HttpBackendClient};
pub use models::{
    AuthorizeResponse, CredentialField, CredentialsForm, HealthResponse, LastSyncStatus,
    LogStatus, ManualSyncResponse, StoredCredentials, SyncLogEntry, SyncRunResult, SyncStatus,
    ValidationError,
};
