//! Host integration
//!
//! The effects a page has on whatever is displaying it: the address bar,
//! leaving for an external site, and interactive confirmation.

use async_trait::async_trait;

#[async_trait]
pub trait Host: Send + Sync {
    /// Current location, path plus query
    fn location(&self) -> String;

    /// Rewrite the location in place (no navigation, no history entry)
    fn replace_location(&self, location: &str);

    /// Leave the dashboard for an external page
    fn open_external(&self, url: &str);

    /// Ask the user a yes/no question
    async fn confirm(&self, prompt: &str) -> bool;
}
