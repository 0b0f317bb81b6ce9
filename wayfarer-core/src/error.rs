//! Error handling for the Wayfarer coordination protocol.
//!
//! This module provides a centralized error type and result alias for all
//! Wayfarer operations. Variants follow the failure taxonomy of the planner:
//! discovery failures exclude a peer, send failures are recorded per call,
//! and only a blown deadline with nothing settled fails a whole plan.
//!
//! # Examples
//!
//! ```rust
//! use wayfarer_core::error::{Error, Result};
//!
//! fn validate_guests(count: u32) -> Result<()> {
//!     if count == 0 {
//!         return Err(Error::validation("guest_count must be at least 1"));
//!     }
//!     Ok(())
//! }
//! ```

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for Wayfarer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An envelope was missing required fields or carried no usable text
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Card discovery failed for a configured peer
    #[error("Discovery failed for {peer}: {reason}")]
    Discovery {
        peer: String,
        reason: String,
        /// The peer answered but does not publish a card on the discovery path
        not_advertised: bool,
    },

    /// A peer could not be reached or did not answer in time
    #[error("Remote agent {peer} unavailable: {reason}")]
    RemoteUnavailable {
        peer: String,
        reason: String,
        timed_out: bool,
    },

    /// A peer answered with a body that does not fit the wire contract
    #[error("Remote agent {peer} protocol error: {reason}")]
    RemoteProtocol { peer: String, reason: String },

    /// LLM collaborator failures
    #[error("LLM error: {0}")]
    Llm(String),

    /// Search collaborator failures
    #[error("Search error: {0}")]
    Search(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration loading and validation errors
    #[error("Config error: {0}")]
    Config(String),

    /// The planning ceiling elapsed before anything usable settled
    #[error("Planning deadline of {0:?} exceeded with no settled results")]
    DeadlineExceeded(Duration),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O operation failures
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience type alias for Results with Wayfarer errors.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new malformed envelope error with the given message.
    ///
    /// # Examples
    /// ```
    /// use wayfarer_core::error::Error;
    ///
    /// let err = Error::malformed("parts must not be empty");
    /// ```
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedEnvelope(msg.into())
    }

    /// Creates a new validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Creates a new configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn discovery(peer: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Discovery {
            peer: peer.into(),
            reason: reason.into(),
            not_advertised: false,
        }
    }

    pub fn unavailable(peer: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::RemoteUnavailable {
            peer: peer.into(),
            reason: reason.into(),
            timed_out: false,
        }
    }

    pub fn timed_out(peer: impl Into<String>, after: Duration) -> Self {
        Error::RemoteUnavailable {
            peer: peer.into(),
            reason: format!("no answer within {:?}", after),
            timed_out: true,
        }
    }

    pub fn protocol(peer: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::RemoteProtocol {
            peer: peer.into(),
            reason: reason.into(),
        }
    }

    /// True for send failures caused by an elapsed timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::RemoteUnavailable { timed_out: true, .. })
    }

    /// Short form recorded in a plan's per-agent status.
    pub fn status_label(&self) -> String {
        if self.is_timeout() {
            "timeout".to_string()
        } else {
            self.to_string()
        }
    }
}
