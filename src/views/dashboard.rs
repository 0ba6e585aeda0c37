//! Dashboard view - sync status, recent activity and the manual trigger

use std::sync::Arc;

use crate::api::{BackendClient, SyncLogEntry, SyncStatus};
use crate::config::{DASHBOARD_POLL_INTERVAL, RECENT_LOGS_LIMIT};

use super::{ActionOutcome, Banner, FetchSequence, Poller, Redraw, ViewState};

const SYNC_FAILED_FALLBACK: &str = "Failed to trigger sync";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    /// True until the first fetch cycle resolves
    pub loading: bool,
    pub status: Option<SyncStatus>,
    pub recent_logs: Vec<SyncLogEntry>,
    /// A manual sync request is in flight
    pub syncing: bool,
    pub banner: Option<Banner>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            loading: true,
            status: None,
            recent_logs: Vec::new(),
            syncing: false,
            banner: None,
        }
    }
}

impl DashboardState {
    /// Manual sync is disabled while a request is in flight or the backend
    /// reports a run in progress
    pub fn can_trigger_sync(&self) -> bool {
        let backend_running = self.status.as_ref().is_some_and(|s| s.is_running);
        !self.syncing && !backend_running
    }
}

struct DashboardInner {
    client: Arc<dyn BackendClient>,
    state: ViewState<DashboardState>,
    sequence: FetchSequence,
}

impl DashboardInner {
    async fn refresh(&self) {
        let seq = self.sequence.begin();
        let result = tokio::try_join!(
            self.client.sync_status(),
            self.client.sync_logs(RECENT_LOGS_LIMIT)
        );

        self.state
            .update(|state| {
                match result {
                    Ok((status, logs)) => {
                        if self.sequence.try_apply(seq) {
                            state.status = Some(status);
                            state.recent_logs = logs;
                        } else {
                            log::debug!("Discarding superseded dashboard refresh #{}", seq);
                        }
                    }
                    Err(e) => log::error!("Error fetching dashboard data: {}", e),
                }
                state.loading = false;
            })
            .await;
    }
}

/// Mounted dashboard page. Dropping it unmounts the page and stops polling.
pub struct DashboardView {
    inner: Arc<DashboardInner>,
    poller: Poller,
}

impl DashboardView {
    /// Start polling status and recent logs (immediately, then every 10s)
    pub fn mount(client: Arc<dyn BackendClient>, redraw: Redraw) -> Self {
        let inner = Arc::new(DashboardInner {
            client,
            state: ViewState::new(DashboardState::default(), redraw),
            sequence: FetchSequence::default(),
        });

        let poll_inner = inner.clone();
        let poller = Poller::start("dashboard", DASHBOARD_POLL_INTERVAL, move || {
            let inner = poll_inner.clone();
            async move { inner.refresh().await }
        });

        Self { inner, poller }
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.inner.state.snapshot().await
    }

    /// Out-of-band refresh of status and recent logs
    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }

    /// Trigger a manual sync, report the outcome, then refresh
    pub async fn manual_sync(&self) -> ActionOutcome {
        let claimed = self
            .inner
            .state
            .update(|state| {
                if !state.can_trigger_sync() {
                    return false;
                }
                state.syncing = true;
                state.banner = None;
                true
            })
            .await;

        if !claimed {
            log::info!("Manual sync ignored: a sync is already in progress");
            return ActionOutcome::Skipped;
        }

        log::info!("Triggering manual sync");
        let outcome = match self.inner.client.trigger_manual_sync().await {
            Ok(response) => {
                log::info!("Manual sync finished: {}", response.result.message);
                self.inner
                    .state
                    .update(|state| {
                        state.banner = Some(Banner::Success(response.result.message.clone()))
                    })
                    .await;
                ActionOutcome::Completed
            }
            Err(e) => {
                log::error!("Manual sync failed: {}", e);
                let message = e.user_message(SYNC_FAILED_FALLBACK);
                self.inner
                    .state
                    .update(|state| state.banner = Some(Banner::Error(message)))
                    .await;
                ActionOutcome::Failed
            }
        };

        self.inner.state.update(|state| state.syncing = false).await;
        self.inner.refresh().await;
        outcome
    }

    pub async fn dismiss_banner(&self) {
        self.inner.state.update(|state| state.banner = None).await;
    }

    /// Stop polling. The view may still be held by a pending action.
    pub fn unmount(&self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }
}
