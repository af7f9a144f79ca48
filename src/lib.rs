#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use thiserror::Error;

pub mod cli;
pub mod client;
pub mod endpoint;
pub mod poll;
pub mod status;

pub use client::{DeviceLink, HttpLink, ProjectorSession};
pub use endpoint::DeviceEndpoint;
pub use poll::{Direction, Outcome};
pub use status::PowerState;

/// General error that can occur during communication with the projector
#[derive(Debug, Error)]
pub enum Error {
    /// Transport error: connection refused, DNS failure, timeout...
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),
    /// Device answered with a non-success status
    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(reqwest::StatusCode),
}
