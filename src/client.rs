//! Communicate with the projector web interface

use std::{error::Error as StdError, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    endpoint::{DeviceEndpoint, DEFAULT_TIMEOUT},
    poll::{self, Clock, Direction, Outcome, Projector, SystemClock},
    status::{PowerState, StatusReport},
};

/// User agent sent when the caller does not provide one
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A trait representing a way to reach the projector web interface
pub trait DeviceLink {
    /// Download the status page as text
    fn fetch_status_page(&mut self) -> Result<String, crate::Error>;

    /// Send the toggle pulse, discarding the response
    fn send_toggle(&mut self) -> Result<(), crate::Error>;
}

/// Decode a response body, falling back to Latin-1 when it is not valid UTF-8
pub fn decode_body(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| e.into_bytes().into_iter().map(char::from).collect())
}

/// Render an error followed by each of its sources, `outer: inner: root cause`
pub fn describe_error(error: &dyn StdError) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Blocking HTTP link with a per-request timeout.
///
/// System proxies are bypassed: projectors sit on a local control network.
pub struct HttpLink {
    client: reqwest::blocking::Client,
    endpoint: DeviceEndpoint,
}

impl HttpLink {
    /// Build a link to the given endpoint
    pub fn new(
        endpoint: DeviceEndpoint,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, crate::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .no_proxy()
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// Endpoint this link talks to
    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, crate::Error> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(crate::Error::HttpStatus(status));
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl DeviceLink for HttpLink {
    fn fetch_status_page(&mut self) -> Result<String, crate::Error> {
        let body = self.get(&self.endpoint.status_url)?;
        Ok(decode_body(body))
    }

    fn send_toggle(&mut self) -> Result<(), crate::Error> {
        self.get(&self.endpoint.toggle_url)?;
        Ok(())
    }
}

/// A session with one projector
pub struct ProjectorSession<L: DeviceLink> {
    link: L,
}

impl ProjectorSession<HttpLink> {
    /// Initiate a new session over HTTP
    pub fn new_from_http(
        endpoint: DeviceEndpoint,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, crate::Error> {
        Ok(Self::new_from_link(HttpLink::new(endpoint, timeout, user_agent)?))
    }

    /// Initiate a new session over HTTP with default timeout and user agent
    pub fn new_default(endpoint: DeviceEndpoint) -> Result<Self, crate::Error> {
        Self::new_from_http(endpoint, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }
}

impl<L: DeviceLink> ProjectorSession<L> {
    /// Initiate a new session from an arbitrary link
    pub fn new_from_link(link: L) -> Self {
        Self { link }
    }

    /// Underlying link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Fetch and parse the status page, keeping every parsing detail
    pub fn status_report(&mut self) -> Result<StatusReport, crate::Error> {
        let html = self.link.fetch_status_page()?;
        let report = StatusReport::from_html(&html);
        debug!(declaration = ?report.declaration, items = ?report.items, "parsed status page");
        Ok(report)
    }

    /// Current state, [`PowerState::Unknown`] when the page can't be fetched or parsed
    pub fn status(&mut self) -> PowerState {
        match self.status_report() {
            Ok(report) => report.state,
            Err(e) => {
                warn!("status fetch failed: {}", describe_error(&e));
                PowerState::Unknown
            }
        }
    }

    /// Send one toggle pulse. Failures are logged and otherwise ignored.
    pub fn toggle(&mut self) {
        match self.link.send_toggle() {
            Ok(()) => info!("sent toggle command"),
            Err(e) => warn!("toggle failed: {}", describe_error(&e)),
        }
    }

    /// Bring the projector to the direction's target, blocking until it converges or times out
    pub fn set_power(&mut self, direction: Direction) -> Outcome {
        self.set_power_with_clock(direction, &mut SystemClock)
    }

    /// Same as [`Self::set_power`] with a caller-supplied clock
    pub fn set_power_with_clock<C: Clock + ?Sized>(
        &mut self,
        direction: Direction,
        clock: &mut C,
    ) -> Outcome {
        let current = self.status();
        info!(status = %current, "current status");
        poll::converge(self, clock, direction, current)
    }

    /// Power the projector on
    pub fn set_power_on(&mut self) -> Outcome {
        self.set_power(Direction::PowerOn)
    }

    /// Power the projector off
    pub fn set_power_off(&mut self) -> Outcome {
        self.set_power(Direction::PowerOff)
    }
}

impl<L: DeviceLink> Projector for ProjectorSession<L> {
    fn current_state(&mut self) -> PowerState {
        self.status()
    }

    fn pulse_toggle(&mut self) {
        self.toggle()
    }
}
