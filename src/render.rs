//! Text frames for the terminal
//!
//! Pure functions from view state to the text printed for each page.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::api::{CredentialField, LogStatus, SyncLogEntry};
use crate::shell::Route;
use crate::views::{Banner, DashboardState, LogsState, SettingsState};

const RULE: &str = "------------------------------------------------------------";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn status_badge(status: LogStatus) -> String {
    format!("[{}]", status.as_str())
}

fn sync_type_label(sync_type: &str) -> String {
    let mut chars = sync_type.chars();
    match chars.next() {
        Some(first) => format!("{}{} sync", first.to_uppercase(), chars.as_str()),
        None => "Sync".to_string(),
    }
}

fn banner_line(banner: &Option<Banner>) -> String {
    match banner {
        Some(Banner::Success(text)) => format!("[OK] {}\n\n", text),
        Some(Banner::Error(text)) => format!("[ERROR] {}\n\n", text),
        None => String::new(),
    }
}

/// Sidebar, current location and page content
pub fn frame(active: Route, location: &str, content: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "WHMCS -> FreeAgent Sync");
    let _ = writeln!(out, "Location: {}", location);
    let _ = writeln!(out, "{}", RULE);
    for route in Route::ALL {
        let marker = if route == active { ">" } else { " " };
        let _ = writeln!(out, " {} {:<10} {}", marker, route.title(), route.path());
    }
    let _ = writeln!(out, "{}", RULE);
    out.push_str(content);
    out
}

pub fn dashboard(state: &DashboardState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sync Dashboard");
    let _ = writeln!(out, "Monitor and manage your WHMCS to FreeAgent invoice sync\n");

    if state.loading {
        let _ = writeln!(out, "Loading...");
        return out;
    }

    out.push_str(&banner_line(&state.banner));

    let status = state.status.clone().unwrap_or_default();
    let running = if status.is_running { "Running" } else { "Idle" };
    let _ = writeln!(out, "Sync Status:  {}", running);

    let last = match (&status.last_sync, status.last_sync_status) {
        (Some(ts), Some(outcome)) => format!("{} ({})", format_timestamp(ts), outcome.as_str()),
        (Some(ts), None) => format_timestamp(ts),
        (None, _) => "Never".to_string(),
    };
    let _ = writeln!(out, "Last Sync:    {}", last);
    let _ = writeln!(
        out,
        "Next Sync:    {}\n",
        status.next_sync.as_deref().unwrap_or("Not scheduled")
    );

    let trigger = if state.syncing {
        "Syncing... (in progress)"
    } else if status.is_running {
        "Sync Now (disabled: sync in progress)"
    } else {
        "[sync] Sync Now"
    };
    let _ = writeln!(out, "{}\n", trigger);

    let _ = writeln!(out, "Recent Activity");
    if state.recent_logs.is_empty() {
        let _ = writeln!(out, "  No sync activity yet");
    }
    for entry in &state.recent_logs {
        let _ = writeln!(
            out,
            "  {} {:<9} {:<16} {}",
            format_timestamp(&entry.timestamp),
            status_badge(entry.status),
            sync_type_label(&entry.sync_type),
            entry.message.as_deref().unwrap_or("")
        );
    }

    out
}

pub fn settings(state: &SettingsState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Settings");
    let _ = writeln!(out, "Configure your WHMCS and FreeAgent API credentials\n");

    if state.loading {
        let _ = writeln!(out, "Loading...");
        return out;
    }

    out.push_str(&banner_line(&state.banner));

    let all = CredentialField::ALL;
    for (heading, fields) in [("WHMCS", &all[..3]), ("FreeAgent", &all[3..])] {
        let _ = writeln!(out, "{}", heading);
        for field in fields {
            let value = state.form.get(*field);
            let shown = if value.is_empty() {
                "(empty)".to_string()
            } else if field.is_secret() {
                "********".to_string()
            } else {
                value.to_string()
            };
            let _ = writeln!(out, "  {:<24} {:<24} {}", field.label(), shown, field.as_str());
        }
    }

    let save = if state.saving { "Saving... (in progress)" } else { "[save] Save Credentials" };
    let _ = writeln!(out, "\n{}\n", save);

    let connection = if state.is_connected { "Connected" } else { "Not connected" };
    let _ = writeln!(out, "FreeAgent Connection: {}", connection);

    if state.is_connected {
        let action = if state.disconnecting {
            "Disconnecting... (in progress)"
        } else {
            "[disconnect] Disconnect"
        };
        let _ = writeln!(out, "{}", action);
    } else {
        let action = if state.connecting {
            "Connecting... (in progress)"
        } else {
            "[connect] Connect to FreeAgent"
        };
        let _ = writeln!(out, "{}", action);
    }

    out
}

fn log_entry(out: &mut String, entry: &SyncLogEntry) {
    let _ = writeln!(
        out,
        "{} {}  {}",
        status_badge(entry.status),
        sync_type_label(&entry.sync_type),
        format_timestamp(&entry.timestamp)
    );
    if let Some(message) = entry.message.as_deref().filter(|m| !m.is_empty()) {
        let _ = writeln!(out, "  {}", message);
    }
    if entry.status == LogStatus::Success {
        let _ = writeln!(
            out,
            "  Processed: {} | Invoices created: {} | Clients created: {} | Payments synced: {}",
            entry.invoices_processed,
            entry.invoices_created,
            entry.clients_created,
            entry.payments_synced
        );
    }
    if !entry.errors.is_empty() {
        let _ = writeln!(out, "  Errors:");
        for error in &entry.errors {
            let _ = writeln!(out, "    - {}", error);
        }
    }
}

pub fn logs(state: &LogsState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sync Logs");
    let _ = writeln!(out, "View the history of all sync operations");
    let _ = writeln!(out, "[refresh] Refresh\n");

    if state.loading {
        let _ = writeln!(out, "Loading...");
        return out;
    }

    if state.entries.is_empty() {
        let _ = writeln!(out, "No sync logs found");
        return out;
    }

    for entry in &state.entries {
        log_entry(&mut out, entry);
        out.push('\n');
    }
    out
}
