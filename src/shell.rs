//! Navigation shell
//!
//! Sidebar plus one route-switched content area. Exactly one view is mounted
//! at a time; navigating unmounts the previous view, which stops its poller
//! even while a background action still holds the view.

use std::sync::Arc;

use crate::api::BackendClient;
use crate::host::Host;
use crate::render;
use crate::views::{DashboardView, LogsView, Redraw, SettingsView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Settings,
    Logs,
}

impl Route {
    /// Sidebar order
    pub const ALL: [Route; 3] = [Route::Dashboard, Route::Settings, Route::Logs];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Settings => "/settings",
            Route::Logs => "/logs",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Settings => "Settings",
            Route::Logs => "Sync Logs",
        }
    }

    /// Split a location into its route and raw query. Unknown paths fall
    /// back to the dashboard.
    pub fn parse(location: &str) -> (Route, &str) {
        let (path, query) = location.split_once('?').unwrap_or((location, ""));
        let path = path.trim();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        let route = Route::ALL
            .into_iter()
            .find(|route| route.path() == path)
            .unwrap_or(Route::Dashboard);
        (route, query)
    }
}

/// The currently mounted page. Cloning shares the view, so long-running
/// actions can be driven outside the shell.
#[derive(Clone)]
pub enum MountedView {
    Dashboard(Arc<DashboardView>),
    Settings(Arc<SettingsView>),
    Logs(Arc<LogsView>),
}

impl MountedView {
    /// Stop timers and pending loads
    pub fn unmount(&self) {
        match self {
            MountedView::Dashboard(view) => view.unmount(),
            MountedView::Settings(view) => view.unmount(),
            MountedView::Logs(view) => view.unmount(),
        }
    }

    /// Re-fetch whatever the page shows
    pub async fn refresh(&self) {
        match self {
            MountedView::Dashboard(view) => view.refresh().await,
            MountedView::Settings(view) => view.reload().await,
            MountedView::Logs(view) => view.refresh().await,
        }
    }

    pub async fn dismiss_banner(&self) {
        match self {
            MountedView::Dashboard(view) => view.dismiss_banner().await,
            MountedView::Settings(view) => view.dismiss_banner().await,
            MountedView::Logs(_) => {}
        }
    }

    async fn render(&self) -> String {
        match self {
            MountedView::Dashboard(view) => render::dashboard(&view.snapshot().await),
            MountedView::Settings(view) => render::settings(&view.snapshot().await),
            MountedView::Logs(view) => render::logs(&view.snapshot().await),
        }
    }
}

pub struct Shell {
    client: Arc<dyn BackendClient>,
    host: Arc<dyn Host>,
    redraw: Redraw,
    route: Route,
    current: Option<MountedView>,
}

impl Shell {
    pub fn new(client: Arc<dyn BackendClient>, host: Arc<dyn Host>, redraw: Redraw) -> Self {
        Self {
            client,
            host,
            redraw,
            route: Route::Dashboard,
            current: None,
        }
    }

    /// Unmount the current page and mount the one for `location`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn navigate(&mut self, location: &str) {
        let (route, query) = Route::parse(location);

        // Unmount first so the old poller is gone before the new one starts
        if let Some(view) = self.current.take() {
            view.unmount();
        }

        let location = if query.is_empty() {
            route.path().to_string()
        } else {
            format!("{}?{}", route.path(), query)
        };
        self.host.replace_location(&location);
        log::info!("Navigating to {}", location);

        let view = match route {
            Route::Dashboard => MountedView::Dashboard(Arc::new(DashboardView::mount(
                self.client.clone(),
                self.redraw.clone(),
            ))),
            Route::Settings => MountedView::Settings(Arc::new(SettingsView::mount(
                self.client.clone(),
                self.host.clone(),
                query,
                self.redraw.clone(),
            ))),
            Route::Logs => MountedView::Logs(Arc::new(LogsView::mount(
                self.client.clone(),
                self.redraw.clone(),
            ))),
        };

        self.route = route;
        self.current = Some(view);
        self.redraw.request();
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn location(&self) -> String {
        self.host.location()
    }

    pub fn current(&self) -> Option<MountedView> {
        self.current.clone()
    }

    pub fn dashboard(&self) -> Option<Arc<DashboardView>> {
        match &self.current {
            Some(MountedView::Dashboard(view)) => Some(view.clone()),
            _ => None,
        }
    }

    pub fn settings(&self) -> Option<Arc<SettingsView>> {
        match &self.current {
            Some(MountedView::Settings(view)) => Some(view.clone()),
            _ => None,
        }
    }

    pub fn logs(&self) -> Option<Arc<LogsView>> {
        match &self.current {
            Some(MountedView::Logs(view)) => Some(view.clone()),
            _ => None,
        }
    }

    /// Re-fetch whatever the current page shows
    pub async fn refresh(&self) {
        if let Some(view) = &self.current {
            view.refresh().await;
        }
    }

    pub async fn dismiss_banner(&self) {
        if let Some(view) = &self.current {
            view.dismiss_banner().await;
        }
    }

    /// Full frame: sidebar, location and the mounted page
    pub async fn render(&self) -> String {
        let content = match &self.current {
            Some(view) => view.render().await,
            None => String::new(),
        };

        render::frame(self.route, &self.location(), &content)
    }
}
