//! Error handling for the biosig framework

use crate::sample::ChannelId;
use core::fmt;

/// Result type alias for biosig operations
pub type SignalResult<T> = Result<T, SignalError>;

/// Error type for all biosig operations
///
/// Only `ConfigurationError` is fatal, and only at construction time.
/// `SequenceError` and `GapDetected` are signal-quality artifacts that the
/// streaming layer recovers from locally; a malformed sample never aborts
/// a running stream.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SignalError {
    /// Out-of-order or duplicate timestamp within one channel
    SequenceError {
        /// Channel the rejected sample belonged to
        channel: ChannelId,
        /// Timestamp of the rejected sample
        timestamp: f64,
        /// Latest timestamp already stored for the channel
        latest: f64,
    },

    /// Invalid filter/pipeline configuration, detected before streaming starts
    ConfigurationError {
        /// Description of the configuration error
        message: String,
    },

    /// Inter-sample interval far exceeds the nominal sampling period
    GapDetected {
        /// Channel the gap was observed on
        channel: ChannelId,
        /// Observed inter-sample interval in seconds
        interval: f64,
        /// Nominal sampling period in seconds
        nominal_period: f64,
    },

    /// Sample addressed to a channel the receiver does not own
    UnknownChannel {
        /// Channel id carried by the sample
        channel: ChannelId,
    },
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalError::SequenceError { channel, timestamp, latest } => {
                write!(
                    f,
                    "out-of-order sample on channel {}: timestamp {:.6}s <= latest {:.6}s",
                    channel, timestamp, latest
                )
            }
            SignalError::ConfigurationError { message } => {
                write!(f, "invalid configuration: {}", message)
            }
            SignalError::GapDetected { channel, interval, nominal_period } => {
                write!(
                    f,
                    "gap on channel {}: {:.4}s between samples, nominal period {:.4}s",
                    channel, interval, nominal_period
                )
            }
            SignalError::UnknownChannel { channel } => {
                write!(f, "sample for unknown channel {}", channel)
            }
        }
    }
}

impl std::error::Error for SignalError {}
