//! Logs view - full sync history, newest first as returned by the backend

use std::sync::Arc;

use crate::api::{BackendClient, SyncLogEntry};
use crate::config::{LOGS_POLL_INTERVAL, LOG_HISTORY_LIMIT};

use super::{FetchSequence, Poller, Redraw, ViewState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsState {
    pub loading: bool,
    pub entries: Vec<SyncLogEntry>,
}

impl Default for LogsState {
    fn default() -> Self {
        Self {
            loading: true,
            entries: Vec::new(),
        }
    }
}

struct LogsInner {
    client: Arc<dyn BackendClient>,
    state: ViewState<LogsState>,
    sequence: FetchSequence,
}

impl LogsInner {
    async fn refresh(&self) {
        let seq = self.sequence.begin();
        let result = self.client.sync_logs(LOG_HISTORY_LIMIT).await;

        self.state
            .update(|state| {
                match result {
                    Ok(entries) => {
                        if self.sequence.try_apply(seq) {
                            state.entries = entries;
                        }
                    }
                    Err(e) => log::error!("Error fetching logs: {}", e),
                }
                state.loading = false;
            })
            .await;
    }
}

/// Mounted logs page
pub struct LogsView {
    inner: Arc<LogsInner>,
    poller: Poller,
}

impl LogsView {
    /// Start polling the history (immediately, then every 15s)
    pub fn mount(client: Arc<dyn BackendClient>, redraw: Redraw) -> Self {
        let inner = Arc::new(LogsInner {
            client,
            state: ViewState::new(LogsState::default(), redraw),
            sequence: FetchSequence::default(),
        });

        let poll_inner = inner.clone();
        let poller = Poller::start("logs", LOGS_POLL_INTERVAL, move || {
            let inner = poll_inner.clone();
            async move { inner.refresh().await }
        });

        Self { inner, poller }
    }

    pub async fn snapshot(&self) -> LogsState {
        self.inner.state.snapshot().await
    }

    /// Manual refresh button
    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }

    /// Stop polling. The view may still be held by a pending action.
    pub fn unmount(&self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }
}
