//! In-process fakes shared by view and shell tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;

use crate::api::{
    ApiError, BackendClient, CredentialsForm, HealthResponse, LogStatus, ManualSyncResponse,
    StoredCredentials, SyncLogEntry, SyncRunResult, SyncStatus,
};
use crate::host::Host;

type Failure = (StatusCode, Option<String>);

fn backend_error(failure: &Failure) -> ApiError {
    ApiError::Backend {
        status: failure.0,
        detail: failure.1.clone(),
    }
}

/// Let spawned tasks run their immediate work
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn sample_log(id: &str) -> SyncLogEntry {
    SyncLogEntry {
        id: id.to_string(),
        sync_type: "automatic".to_string(),
        status: LogStatus::Success,
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        message: Some("Processed 0 invoices, but no new invoices to sync".to_string()),
        invoices_processed: 0,
        invoices_created: 0,
        clients_created: 0,
        payments_synced: 0,
        errors: Vec::new(),
    }
}

pub fn filled_form() -> CredentialsForm {
    CredentialsForm {
        whmcs_url: "https://billing.example.com".to_string(),
        whmcs_identifier: "ident-1234".to_string(),
        whmcs_secret: "whmcs-secret".to_string(),
        freeagent_client_id: "fa-client".to_string(),
        freeagent_client_secret: "fa-secret".to_string(),
    }
}

#[derive(Default)]
struct FakeState {
    status: SyncStatus,
    fail_status: bool,
    status_calls: usize,

    logs: Vec<SyncLogEntry>,
    scripted_logs: VecDeque<(Vec<SyncLogEntry>, Duration)>,
    fail_logs: bool,
    log_limits: Vec<u32>,

    manual: Option<Result<String, Failure>>,
    manual_delay: Duration,
    manual_calls: usize,

    credentials: Option<StoredCredentials>,
    credentials_calls: usize,
    save_err: Option<Failure>,
    save_delay: Duration,
    saved_forms: Vec<CredentialsForm>,

    authorize: Option<Result<String, Failure>>,
    authorize_delay: Duration,
    authorize_calls: usize,

    disconnect_err: Option<Failure>,
    disconnect_delay: Duration,
    disconnect_calls: usize,
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Scriptable backend that records every call
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_status(&self, status: SyncStatus) {
        self.with(|s| s.status = status);
    }

    pub fn fail_status(&self, fail: bool) {
        self.with(|s| s.fail_status = fail);
    }

    pub fn set_logs(&self, logs: Vec<SyncLogEntry>) {
        self.with(|s| s.logs = logs);
    }

    /// Answer the next `sync_logs` call with `logs` after `delay`
    pub fn script_logs(&self, logs: Vec<SyncLogEntry>, delay: Duration) {
        self.with(|s| s.scripted_logs.push_back((logs, delay)));
    }

    pub fn fail_logs(&self, fail: bool) {
        self.with(|s| s.fail_logs = fail);
    }

    pub fn set_manual_ok(&self, message: &str) {
        self.with(|s| s.manual = Some(Ok(message.to_string())));
    }

    pub fn set_manual_err(&self, status: StatusCode, detail: Option<&str>) {
        self.with(|s| s.manual = Some(Err((status, detail.map(str::to_string)))));
    }

    pub fn set_manual_delay(&self, delay: Duration) {
        self.with(|s| s.manual_delay = delay);
    }

    pub fn set_credentials(&self, credentials: Option<StoredCredentials>) {
        self.with(|s| s.credentials = credentials);
    }

    pub fn set_save_err(&self, status: StatusCode, detail: Option<&str>) {
        self.with(|s| s.save_err = Some((status, detail.map(str::to_string))));
    }

    pub fn set_save_delay(&self, delay: Duration) {
        self.with(|s| s.save_delay = delay);
    }

    pub fn set_authorize_delay(&self, delay: Duration) {
        self.with(|s| s.authorize_delay = delay);
    }

    pub fn set_disconnect_delay(&self, delay: Duration) {
        self.with(|s| s.disconnect_delay = delay);
    }

    pub fn set_authorize_url(&self, result: Result<&str, (StatusCode, Option<&str>)>) {
        let result = result
            .map(str::to_string)
            .map_err(|(status, detail)| (status, detail.map(str::to_string)));
        self.with(|s| s.authorize = Some(result));
    }

    pub fn set_disconnect_err(&self, status: StatusCode, detail: Option<&str>) {
        self.with(|s| s.disconnect_err = Some((status, detail.map(str::to_string))));
    }

    pub fn status_calls(&self) -> usize {
        self.with(|s| s.status_calls)
    }

    pub fn log_limits(&self) -> Vec<u32> {
        self.with(|s| s.log_limits.clone())
    }

    pub fn manual_calls(&self) -> usize {
        self.with(|s| s.manual_calls)
    }

    pub fn credentials_calls(&self) -> usize {
        self.with(|s| s.credentials_calls)
    }

    pub fn saved_forms(&self) -> Vec<CredentialsForm> {
        self.with(|s| s.saved_forms.clone())
    }

    pub fn authorize_calls(&self) -> usize {
        self.with(|s| s.authorize_calls)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.with(|s| s.disconnect_calls)
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn sync_status(&self) -> Result<SyncStatus, ApiError> {
        self.with(|s| {
            s.status_calls += 1;
            if s.fail_status {
                Err(ApiError::InvalidResponse)
            } else {
                Ok(s.status.clone())
            }
        })
    }

    async fn sync_logs(&self, limit: u32) -> Result<Vec<SyncLogEntry>, ApiError> {
        let (result, delay) = self.with(|s| {
            s.log_limits.push(limit);
            if s.fail_logs {
                return (Err(ApiError::InvalidResponse), Duration::ZERO);
            }
            match s.scripted_logs.pop_front() {
                Some((logs, delay)) => (Ok(logs), delay),
                None => (Ok(s.logs.clone()), Duration::ZERO),
            }
        });
        pause(delay).await;
        result
    }

    async fn trigger_manual_sync(&self) -> Result<ManualSyncResponse, ApiError> {
        let (result, delay) = self.with(|s| {
            s.manual_calls += 1;
            (s.manual.clone(), s.manual_delay)
        });
        pause(delay).await;

        match result {
            Some(Err(failure)) => Err(backend_error(&failure)),
            Some(Ok(message)) => Ok(ManualSyncResponse {
                status: Some("success".to_string()),
                result: SyncRunResult {
                    message,
                    ..Default::default()
                },
            }),
            None => Ok(ManualSyncResponse {
                status: Some("success".to_string()),
                result: SyncRunResult {
                    message: "No invoices found in WHMCS".to_string(),
                    ..Default::default()
                },
            }),
        }
    }

    async fn credentials(&self) -> Result<Option<StoredCredentials>, ApiError> {
        self.with(|s| {
            s.credentials_calls += 1;
            Ok(s.credentials.clone())
        })
    }

    async fn save_credentials(&self, form: &CredentialsForm) -> Result<(), ApiError> {
        let (result, delay) = self.with(|s| match &s.save_err {
            Some(failure) => (Err(backend_error(failure)), s.save_delay),
            None => {
                s.saved_forms.push(form.clone());
                (Ok(()), s.save_delay)
            }
        });
        pause(delay).await;
        result
    }

    async fn authorize_url(&self) -> Result<String, ApiError> {
        let (result, delay) = self.with(|s| {
            s.authorize_calls += 1;
            let result = match &s.authorize {
                Some(Ok(url)) => Ok(url.clone()),
                Some(Err(failure)) => Err(backend_error(failure)),
                None => Ok("https://api.freeagent.com/v2/approve_app".to_string()),
            };
            (result, s.authorize_delay)
        });
        pause(delay).await;
        result
    }

    async fn disconnect(&self) -> Result<(), ApiError> {
        let (result, delay) = self.with(|s| {
            s.disconnect_calls += 1;
            let result = match &s.disconnect_err {
                Some(failure) => Err(backend_error(failure)),
                None => Ok(()),
            };
            (result, s.disconnect_delay)
        });
        pause(delay).await;
        result
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse {
            status: "healthy".to_string(),
            timestamp: None,
        })
    }
}

#[derive(Default)]
struct HostLog {
    location: String,
    replaced: Vec<String>,
    opened: Vec<String>,
    prompts: Vec<String>,
    confirm_answer: bool,
}

/// Host that records effects instead of performing them
pub struct RecordingHost {
    log: Arc<Mutex<HostLog>>,
}

impl RecordingHost {
    pub fn new(location: &str) -> Self {
        Self {
            log: Arc::new(Mutex::new(HostLog {
                location: location.to_string(),
                ..Default::default()
            })),
        }
    }

    pub fn answer_confirm(&self, answer: bool) {
        self.log.lock().unwrap().confirm_answer = answer;
    }

    pub fn replaced(&self) -> Vec<String> {
        self.log.lock().unwrap().replaced.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.log.lock().unwrap().opened.clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.log.lock().unwrap().prompts.clone()
    }
}

#[async_trait]
impl Host for RecordingHost {
    fn location(&self) -> String {
        self.log.lock().unwrap().location.clone()
    }

    fn replace_location(&self, location: &str) {
        let mut log = self.log.lock().unwrap();
        log.location = location.to_string();
        log.replaced.push(location.to_string());
    }

    fn open_external(&self, url: &str) {
        self.log.lock().unwrap().opened.push(url.to_string());
    }

    async fn confirm(&self, prompt: &str) -> bool {
        let mut log = self.log.lock().unwrap();
        log.prompts.push(prompt.to_string());
        log.confirm_answer
    }
}
