//! Custom error types for the Watchpost application
//!
//! This module defines custom error types and implements the necessary traits
//! to properly handle errors throughout the application.

use std::fmt;

/// Main error type for the Watchpost application
#[derive(Debug)]
pub enum WatchpostError {
    /// Error occurred while reading a file or binding the server socket
    Io(std::io::Error),

    /// Error occurred while parsing configuration
    ConfigParse(json5::Error),

    /// Error occurred while talking to an HTTP endpoint
    Http(reqwest::Error),

    /// The event connection could not be established or was lost during sync
    Connection(String),

    /// Generic error with a message
    Generic(String),
}

impl fmt::Display for WatchpostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchpostError::Io(e) => {
                write!(f, "I/O error: {e}")
            }
            WatchpostError::ConfigParse(e) => {
                write!(f, "Failed to parse configuration: {e}")
            }
            WatchpostError::Http(e) => {
                write!(f, "HTTP request failed: {e}")
            }
            WatchpostError::Connection(msg) => {
                write!(f, "Event connection failed: {msg}")
            }
            WatchpostError::Generic(msg) => {
                write!(f, "Error: {msg}")
            }
        }
    }
}

impl std::error::Error for WatchpostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WatchpostError::Io(e) => Some(e),
            WatchpostError::ConfigParse(e) => Some(e),
            WatchpostError::Http(e) => Some(e),
            WatchpostError::Connection(_) | WatchpostError::Generic(_) => None,
        }
    }
}

impl From<std::io::Error> for WatchpostError {
    fn from(error: std::io::Error) -> Self {
        WatchpostError::Io(error)
    }
}

impl From<json5::Error> for WatchpostError {
    fn from(error: json5::Error) -> Self {
        WatchpostError::ConfigParse(error)
    }
}

impl From<reqwest::Error> for WatchpostError {
    fn from(error: reqwest::Error) -> Self {
        WatchpostError::Http(error)
    }
}

impl From<&str> for WatchpostError {
    fn from(message: &str) -> Self {
        WatchpostError::Generic(message.to_string())
    }
}

impl From<String> for WatchpostError {
    fn from(message: String) -> Self {
        WatchpostError::Generic(message)
    }
}

/// Result type alias using our custom error type
pub type Result<T> = std::result::Result<T, WatchpostError>;
