//! Views - headless controllers for the three dashboard pages
//!
//! Each view owns its local state (loading flags, form fields, banners) and,
//! where the page refreshes itself, a [`Poller`]. Views share nothing with
//! each other; the backend is the only source of truth.
//!
//! State changes are published through [`Redraw`]: a revision counter bumped
//! only when a view's state actually differs after an update, so an
//! unchanged poll result never causes a redraw.

pub mod dashboard;
pub mod logs;
pub mod poller;
pub mod settings;


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

pub use dashboard::{DashboardState, DashboardView};
pub use logs::{LogsState, LogsView};
pub use poller::Poller;
pub use settings::{OAuthCallback, SettingsState, SettingsView};

/// Alert shown at the top of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Success(String),
    Error(String),
}

impl Banner {
    pub fn text(&self) -> &str {
        match self {
            Banner::Success(text) | Banner::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Banner::Error(_))
    }
}

/// Result of a user-triggered action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Failed,
    /// Control was disabled, or the user declined
    Skipped,
}

/// Revision counter the terminal watches to know when to redraw
#[derive(Clone)]
pub struct Redraw(Arc<watch::Sender<u64>>);

impl Redraw {
    pub fn new() -> (Self, watch::Receiver<u64>) {
        let (tx, rx) = watch::channel(0);
        (Self(Arc::new(tx)), rx)
    }

    pub fn request(&self) {
        self.0.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    pub fn revision(&self) -> u64 {
        *self.0.borrow()
    }
}

/// View-local state plus change notification
pub(crate) struct ViewState<T> {
    state: RwLock<T>,
    redraw: Redraw,
}

impl<T: Clone + PartialEq> ViewState<T> {
    pub fn new(initial: T, redraw: Redraw) -> Self {
        Self {
            state: RwLock::new(initial),
            redraw,
        }
    }

    pub async fn snapshot(&self) -> T {
        self.state.read().await.clone()
    }

    /// Apply `f` under the write lock; redraw only if the state changed
    pub async fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.state.write().await;
        let before = guard.clone();
        let out = f(&mut *guard);
        if *guard != before {
            self.redraw.request();
        }
        out
    }
}

/// Orders overlapping fetch cycles.
///
/// Superseded requests are not cancelled; a cycle's response is applied only
/// if no newer cycle has already been applied.
#[derive(Default)]
pub(crate) struct FetchSequence {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl FetchSequence {
    /// Number for a cycle about to be issued
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Claim the right to apply `seq`. Call under the state write lock.
    pub fn try_apply(&self, seq: u64) -> bool {
        self.applied.fetch_max(seq, Ordering::SeqCst) < seq
    }
}
