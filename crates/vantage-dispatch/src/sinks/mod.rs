//! Concrete sink adapters.
//!
//! Each adapter implements the uniform [`Sink`](crate::sink::Sink) contract
//! and delegates its wire protocol to an injected transport trait, so the
//! network/SDK side stays swappable and testable. Transport errors map onto
//! the outcome taxonomy here.

pub mod blog;
pub mod console;
pub mod object_store;
pub mod presence;
pub mod webhook;

use thiserror::Error;

use vantage_core::types::{SinkFailure, SinkOutcome, SkipReason};

/// Error surface shared by all sink transports.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote side is throttling. Treated as a soft outcome.
    #[error("rate limited by remote")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    /// The transport's own local staging/cache write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Map a transport error onto the sink-outcome taxonomy.
    pub fn into_outcome(self) -> SinkOutcome {
        match self {
            TransportError::RateLimited => SinkOutcome::Skipped(SkipReason::RateLimited),
            TransportError::Network(detail) => SinkOutcome::Failed(SinkFailure::Network(detail)),
            TransportError::Persistence(detail) => {
                SinkOutcome::Failed(SinkFailure::Persistence(detail))
            }
            TransportError::Other(detail) => SinkOutcome::Failed(SinkFailure::Other(detail)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_soft() {
        assert_eq!(
            TransportError::RateLimited.into_outcome(),
            SinkOutcome::Skipped(SkipReason::RateLimited)
        );
    }

    #[test]
    fn test_hard_errors_map_to_failures() {
        assert!(TransportError::Network("down".into()).into_outcome().is_failed());
        assert!(TransportError::Persistence("disk".into())
            .into_outcome()
            .is_failed());
        assert!(TransportError::Other("boom".into()).into_outcome().is_failed());
    }
}
