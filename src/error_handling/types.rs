//! Error type definitions.
//!
//! This module defines the error enums used throughout the crate and the
//! failure kinds tracked for geolocation providers.

use std::time::Duration;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error preparing the geolocation cache (e.g., cache directory creation).
    #[error("Geolocation cache initialization error: {0}")]
    GeoCacheError(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// A stored value could not be mapped back onto its Rust type.
    #[error("Invalid stored value in {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
}

/// Error types for a detection cycle.
///
/// A cycle that fails returns one of these instead of an empty report, so
/// callers can tell "nothing suspicious" apart from "could not look".
#[derive(Error, Debug)]
pub enum DetectionError {
    /// Another detection cycle is still running against the same store.
    #[error("Detection cycle already in progress")]
    CycleInProgress,

    /// The log or suspicion store could not be read or written.
    #[error("Detection store error: {0}")]
    Store(#[from] DatabaseError),
}

/// Failure of a single geolocation provider call.
///
/// These never reach the resolver's caller; they are logged, counted and
/// the resolver moves on to the next provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider did not answer within its timeout.
    #[error("Provider timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Transport-level failure (connect, TLS, body read).
    #[error("Provider request failed: {0}")]
    Request(#[from] ReqwestError),

    /// The provider answered with a non-success HTTP status.
    #[error("Provider returned HTTP {0}")]
    Status(u16),

    /// The payload was not the JSON shape the provider documents.
    #[error("Malformed provider payload: {0}")]
    Malformed(String),

    /// The provider explicitly reported a failed lookup.
    #[error("Provider reported failure: {0}")]
    Unsuccessful(String),

    /// The payload parsed but carried no country.
    #[error("Provider returned no country")]
    EmptyCountry,
}

/// Categories of provider failures, tracked by `LookupStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ProviderFailureKind {
    Timeout,
    Connect,
    Status,
    Decode,
    Unsuccessful,
    EmptyResult,
    Other,
}

impl std::fmt::Display for ProviderFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFailureKind::Timeout => "Provider timeout",
            ProviderFailureKind::Connect => "Provider connect error",
            ProviderFailureKind::Status => "Provider non-success status",
            ProviderFailureKind::Decode => "Provider payload decode error",
            ProviderFailureKind::Unsuccessful => "Provider reported failure",
            ProviderFailureKind::EmptyResult => "Provider returned no country",
            ProviderFailureKind::Other => "Provider other error",
        }
    }
}
