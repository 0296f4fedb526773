pub mod abi;

pub mod app;

pub mod config;

pub mod events;

pub mod records;

use crate::app::single_flight::ScanKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The block number or a historical log query failed. The whole dataset of the
    /// current scan is unreliable.
    #[error("{operation} failed: {reason}")]
    UpstreamQuery {
        operation: &'static str,
        reason: String,
    },
    /// A log came back without a field the engine needs, or did not decode.
    #[error("malformed {event} log: {reason}")]
    MalformedEvent { event: &'static str, reason: String },
    #[error("a {0} scan is already in flight")]
    ScanInProgress(ScanKind),
    #[error("no account connected to the session")]
    NoAccount,
}

impl Error {
    pub fn upstream(operation: &'static str, err: anyhow::Error) -> Self {
        Error::UpstreamQuery {
            operation,
            reason: format!("{err:#}"),
        }
    }

    pub fn malformed(event: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedEvent {
            event,
            reason: reason.into(),
        }
    }

    /// True for the failures that invalidate a whole scan rather than one token.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::UpstreamQuery { .. } | Error::MalformedEvent { .. }
        )
    }
}
