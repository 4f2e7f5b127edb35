//! Configuration for the per-channel processing pipelines

use crate::detector::DetectorConfig;
use crate::window::FrequencyBand;
use biosig_core::{SignalError, SignalResult};
use serde::{Deserialize, Serialize};

/// Notch parameters for powerline rejection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotchConfig {
    /// Line frequency, 50 or 60 Hz depending on the mains grid
    pub freq_hz: f32,
    /// Quality factor (higher = narrower notch)
    pub q: f32,
}

impl Default for NotchConfig {
    fn default() -> Self {
        Self { freq_hz: 50.0, q: 30.0 }
    }
}

/// Window geometry shared by all channel kinds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowParams {
    /// Window duration in seconds
    pub duration: f64,
    /// Stride between window starts in seconds
    pub stride: f64,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self { duration: 1.0, stride: 1.0 }
    }
}

/// EMG channel parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmgConfig {
    /// Band-pass low edge in Hz (motion-artifact rejection)
    pub band_low_hz: f32,
    /// Band-pass high edge in Hz
    pub band_high_hz: f32,
    /// Band-pass order
    pub band_order: usize,
    /// Optional powerline notch
    pub notch: Option<NotchConfig>,
    /// Envelope smoothing cutoff in Hz
    pub envelope_cutoff_hz: f32,
    /// Envelope smoothing order
    pub envelope_order: usize,
    /// Feature window geometry
    pub window: WindowParams,
    /// Bands for window band-power features
    pub bands: Vec<FrequencyBand>,
}

impl Default for EmgConfig {
    fn default() -> Self {
        // armband defaults: 20-95 Hz band at 200 Hz sampling, 6 Hz envelope
        Self {
            band_low_hz: 20.0,
            band_high_hz: 95.0,
            band_order: 4,
            notch: Some(NotchConfig::default()),
            envelope_cutoff_hz: 6.0,
            envelope_order: 4,
            window: WindowParams::default(),
            bands: FrequencyBand::emg_bands(),
        }
    }
}

/// GSR channel parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GsrConfig {
    /// Pre-filter low-pass cutoff in Hz (GSR content lives below 5 Hz)
    pub lowpass_hz: f32,
    /// Pre-filter order
    pub lowpass_order: usize,
    /// Tonic estimator cutoff in Hz
    pub tonic_cutoff_hz: f32,
    /// Tonic estimator order
    pub tonic_order: usize,
    /// SCR detection thresholds
    pub detector: DetectorConfig,
    /// Feature window geometry (aggregates the tonic component)
    pub window: WindowParams,
}

impl Default for GsrConfig {
    fn default() -> Self {
        Self {
            lowpass_hz: 5.0,
            lowpass_order: 4,
            tonic_cutoff_hz: 0.05,
            tonic_order: 4,
            detector: DetectorConfig::default(),
            window: WindowParams { duration: 10.0, stride: 10.0 },
        }
    }
}

/// IMU channel parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuConfig {
    /// Smoothing low-pass cutoff in Hz
    pub smoothing_cutoff_hz: f32,
    /// Smoothing filter order
    pub smoothing_order: usize,
    /// Feature window geometry
    pub window: WindowParams,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            smoothing_cutoff_hz: 10.0,
            smoothing_order: 2,
            window: WindowParams::default(),
        }
    }
}

/// Processing parameters for every channel kind, plus stream-level knobs.
///
/// All thresholds and cutoffs are experiment-tunable; the defaults are the
/// lab's working values for the 200 Hz armband and the 250 Hz GSR channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub emg: EmgConfig,
    pub gsr: GsrConfig,
    pub imu: ImuConfig,
    /// Ring buffer capacity per channel, in samples
    pub buffer_capacity: usize,
    /// An inter-sample interval beyond `gap_factor x nominal period`
    /// surfaces a gap warning
    pub gap_factor: f64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            emg: EmgConfig::default(),
            gsr: GsrConfig::default(),
            imu: ImuConfig::default(),
            buffer_capacity: 2048,
            gap_factor: 3.0,
        }
    }
}

impl ProcessingConfig {
    /// Validate everything that can be checked without a channel's sample
    /// rate; filter construction re-validates cutoffs against the rate.
    pub fn validate(&self) -> SignalResult<()> {
        if self.buffer_capacity == 0 {
            return Err(SignalError::ConfigurationError {
                message: "buffer capacity must be at least 1".to_string(),
            });
        }
        if self.gap_factor <= 1.0 {
            return Err(SignalError::ConfigurationError {
                message: format!("gap factor {} must exceed 1", self.gap_factor),
            });
        }

        for (label, window) in [
            ("emg", &self.emg.window),
            ("gsr", &self.gsr.window),
            ("imu", &self.imu.window),
        ] {
            if !(window.duration > 0.0) {
                return Err(SignalError::ConfigurationError {
                    message: format!("{} window duration must be positive", label),
                });
            }
            if !(window.stride > 0.0) || window.stride > window.duration {
                return Err(SignalError::ConfigurationError {
                    message: format!("{} window stride must lie in (0, duration]", label),
                });
            }
        }

        if self.emg.band_low_hz >= self.emg.band_high_hz {
            return Err(SignalError::ConfigurationError {
                message: "EMG band edges are inverted".to_string(),
            });
        }
        if self.gsr.detector.min_rise_time >= self.gsr.detector.search_horizon {
            return Err(SignalError::ConfigurationError {
                message: "SCR search horizon must exceed the minimum rise time".to_string(),
            });
        }
        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> SignalResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SignalError::ConfigurationError {
            message: format!("failed to serialize configuration: {}", e),
        })
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> SignalResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SignalError::ConfigurationError {
                message: format!("failed to deserialize configuration: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ProcessingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_catches_bad_values() {
        let mut config = ProcessingConfig::default();
        config.buffer_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = ProcessingConfig::default();
        config.gap_factor = 0.5;
        assert!(config.validate().is_err());

        let mut config = ProcessingConfig::default();
        config.emg.band_low_hz = 120.0;
        assert!(config.validate().is_err());

        let mut config = ProcessingConfig::default();
        config.gsr.window.stride = 20.0; // beyond the 10s duration
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = ProcessingConfig::default();
        config.emg.envelope_cutoff_hz = 8.0;
        config.gsr.detector.onset_threshold = 0.02;
        config.imu.window.duration = 0.5;
        config.imu.window.stride = 0.25;

        let json = config.to_json().unwrap();
        let restored = ProcessingConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let mut config = ProcessingConfig::default();
        config.gap_factor = 0.0;
        let json = serde_json::to_string(&config).unwrap();
        assert!(ProcessingConfig::from_json(&json).is_err());
    }
}
