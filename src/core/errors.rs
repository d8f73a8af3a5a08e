//! CFM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Failure reported by one of the external providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider could not be reached or timed out.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The provider refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The provider answered with a payload we cannot decode.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// Local I/O failure while talking to a file-backed provider.
    #[error("io failure: {0}")]
    Io(String),
}

/// Which provider call of a fetch cycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStage {
    Metrics,
    History,
    Conflicts,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metrics => write!(f, "flow metrics"),
            Self::History => write!(f, "update history"),
            Self::Conflicts => write!(f, "data conflicts"),
        }
    }
}

/// A fetch cycle aborted at `stage`; nothing from the cycle was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} request failed: {source}")]
pub struct FetchError {
    pub stage: FetchStage,
    #[source]
    pub source: ProviderError,
}

/// Top-level error type for the flow monitor.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("[CFM-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CFM-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CFM-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[CFM-2001] {0}")]
    Fetch(#[from] FetchError),

    #[error("[CFM-2002] conflict {conflict_id} could not be resolved: {details}")]
    Resolution {
        conflict_id: String,
        details: String,
    },

    #[error("[CFM-2003] unknown conflict: {conflict_id}")]
    UnknownConflict { conflict_id: String },

    #[error("[CFM-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CFM-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[CFM-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[CFM-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl FlowError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "CFM-1001",
            Self::MissingConfig { .. } => "CFM-1002",
            Self::ConfigParse { .. } => "CFM-1003",
            Self::Fetch(_) => "CFM-2001",
            Self::Resolution { .. } => "CFM-2002",
            Self::UnknownConflict { .. } => "CFM-2003",
            Self::Serialization { .. } => "CFM-2101",
            Self::Io { .. } => "CFM-3002",
            Self::ChannelClosed { .. } => "CFM-3003",
            Self::Runtime { .. } => "CFM-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Nothing in the engine retries automatically; this only informs the operator.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_)
                | Self::Resolution { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
