//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration, capacity limits of the packed terrain buffer, malformed buffers,
//! compute device failures, definition parsing, IO, and generic errors.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("capacity exceeded: {count} {what} (max {max})")]
    CapacityExceeded {
        what: &'static str,
        count: usize,
        max: usize,
    },

    #[error("invalid packed terrain layout: {0}")]
    InvalidLayout(String),

    #[error("compute device unavailable")]
    DeviceUnavailable,

    #[error("tile readback failed: {0}")]
    Readback(String),

    #[error("failed to parse terrain definition: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_uses_other_variant() {
        let err: Error = String::from("boom").into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn capacity_message_names_the_limit() {
        let err = Error::CapacityExceeded {
            what: "contours",
            count: 10,
            max: 4,
        };
        assert_eq!(err.to_string(), "capacity exceeded: 10 contours (max 4)");
    }
}
