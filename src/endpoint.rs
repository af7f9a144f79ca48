//! Device address and the URLs derived from it

use std::time::Duration;

/// Address the projector ships with on its control network
pub const DEFAULT_HOST: &str = "192.168.250.1";

/// Path of the page embedding the power status
pub const STATUS_PATH: &str = "/info_data.htm";

/// Path of the power toggle pulse
pub const TOGGLE_PATH: &str = "/custom/01";

/// Per-request HTTP timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A projector reachable over HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    /// IP address or hostname
    pub host: String,
    /// URL of the status page
    pub status_url: String,
    /// URL of the toggle pulse
    pub toggle_url: String,
}

impl DeviceEndpoint {
    /// Build both URLs from a host
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            status_url: format!("http://{host}{STATUS_PATH}"),
            toggle_url: format!("http://{host}{TOGGLE_PATH}"),
            host,
        }
    }

    /// Replace the derived status URL
    pub fn with_status_url(mut self, url: impl Into<String>) -> Self {
        self.status_url = url.into();
        self
    }
}

impl Default for DeviceEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}
