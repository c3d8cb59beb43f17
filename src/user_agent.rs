//! User-Agent string for download requests.
//!
//! Some hosts refuse clients that do not look like a browser, so requests
//! carry a desktop browser identification. This is a compatibility shim
//! only; nothing in the engine depends on the server honoring it.

/// Browser-like User-Agent sent with every download request.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Returns the User-Agent used by the download client.
#[must_use]
pub(crate) fn default_download_user_agent() -> &'static str {
    BROWSER_USER_AGENT
}
