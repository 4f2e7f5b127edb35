//! Channel descriptors and the raw sample type

use crate::error::{SignalError, SignalResult};
use serde::{Deserialize, Serialize};

/// Identifier for one acquisition channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u16);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physiological signal modality carried by a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Surface electromyography (armband electrode)
    Emg,
    /// Inertial measurement unit axis
    Imu,
    /// Galvanic skin response / electrodermal activity
    Gsr,
}

impl ChannelKind {
    /// Nominal sampling rate of the lab hardware for this modality, in Hz.
    ///
    /// Rates are nominal only: arrival jitter is tolerated, and sample
    /// timestamps stay authoritative for every rate-dependent computation.
    pub fn nominal_rate(&self) -> f32 {
        match self {
            ChannelKind::Emg => 200.0,
            ChannelKind::Imu => 50.0,
            ChannelKind::Gsr => 250.0,
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Emg => write!(f, "EMG"),
            ChannelKind::Imu => write!(f, "IMU"),
            ChannelKind::Gsr => write!(f, "GSR"),
        }
    }
}

/// One raw measurement from the acquisition source
///
/// Timestamps are monotonic seconds on the acquisition clock and must be
/// non-decreasing within a channel; the ring buffer rejects violations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic acquisition timestamp in seconds
    pub timestamp: f64,
    /// Source channel
    pub channel: ChannelId,
    /// Measured value (µV for EMG, µS for GSR, modality units for IMU)
    pub value: f32,
}

impl Sample {
    pub fn new(timestamp: f64, channel: ChannelId, value: f32) -> Self {
        Self { timestamp, channel, value }
    }
}

/// Static description of one channel, fixed for a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: ChannelId,
    pub kind: ChannelKind,
    /// Declared sampling rate in Hz
    pub sample_rate: f32,
}

impl ChannelConfig {
    /// Create a channel configuration, validating the declared rate.
    pub fn new(id: ChannelId, kind: ChannelKind, sample_rate: f32) -> SignalResult<Self> {
        Self::validate_sample_rate(sample_rate)?;
        Ok(Self { id, kind, sample_rate })
    }

    /// Channel configuration at the modality's nominal rate.
    pub fn at_nominal_rate(id: ChannelId, kind: ChannelKind) -> Self {
        Self {
            id,
            kind,
            sample_rate: kind.nominal_rate(),
        }
    }

    /// Validate a declared sampling rate
    pub fn validate_sample_rate(rate: f32) -> SignalResult<()> {
        const MAX_RATE: f32 = 10_000.0;

        if !rate.is_finite() || rate <= 0.0 || rate > MAX_RATE {
            return Err(SignalError::ConfigurationError {
                message: format!("sample rate {}Hz outside (0, {}]Hz", rate, MAX_RATE),
            });
        }
        Ok(())
    }

    /// Nominal inter-sample period in seconds
    pub fn nominal_period(&self) -> f64 {
        1.0 / self.sample_rate as f64
    }
}
