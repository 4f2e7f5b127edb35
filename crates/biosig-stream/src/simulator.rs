//! Synthetic EMG and GSR sources for tests and demos

use crate::patterns::ActivationPattern;
use biosig_core::{ChannelId, Sample, SignalError, SignalResult};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Configuration for the EMG simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmgSimulatorConfig {
    /// Sampling rate in Hz
    pub sample_rate: f32,
    /// Channel ids to generate (the armband has eight)
    pub channels: Vec<ChannelId>,
    /// Activation time course shared by all channels
    pub pattern: ActivationPattern,
    /// Peak oscillation amplitude at full activation, µV
    pub amplitude: f32,
    /// Gaussian measurement noise standard deviation, µV
    pub noise_std: f32,
    /// Optional mains interference frequency (50/60 Hz)
    pub powerline_hz: Option<f32>,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for EmgSimulatorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 200.0,
            channels: (0..8).map(ChannelId).collect(),
            pattern: ActivationPattern::Constant { level: 0.4 },
            amplitude: 100.0,
            noise_std: 2.0,
            powerline_hz: Some(50.0),
            seed: None,
        }
    }
}

/// Generates interleaved multi-channel EMG with realistic texture:
/// activation-scaled oscillation, recruitment noise, measurement noise and
/// optional powerline interference.
pub struct EmgSimulator {
    config: EmgSimulatorConfig,
    rng: rand::rngs::StdRng,
    noise: Normal<f32>,
    time_offset: f64,
}

fn seed_or_now(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    })
}

impl EmgSimulator {
    pub fn new(config: EmgSimulatorConfig) -> SignalResult<Self> {
        if config.channels.is_empty() {
            return Err(SignalError::ConfigurationError {
                message: "EMG simulator needs at least one channel".to_string(),
            });
        }
        let noise = Normal::new(0.0, config.noise_std).map_err(|e| {
            SignalError::ConfigurationError {
                message: format!("invalid noise distribution: {}", e),
            }
        })?;
        let rng = rand::rngs::StdRng::seed_from_u64(seed_or_now(config.seed));

        Ok(Self {
            config,
            rng,
            noise,
            time_offset: 0.0,
        })
    }

    pub fn config(&self) -> &EmgSimulatorConfig {
        &self.config
    }

    /// Generate `duration` seconds of samples, time-ordered, all channels
    /// sharing each timestamp. Consecutive calls continue the timeline.
    pub fn generate(&mut self, duration: f64) -> Vec<Sample> {
        let dt = 1.0 / self.config.sample_rate as f64;
        let steps = (duration * self.config.sample_rate as f64) as usize;
        let mut samples = Vec::with_capacity(steps * self.config.channels.len());

        for step in 0..steps {
            let t = self.time_offset + step as f64 * dt;
            let activation = self.config.pattern.activation_at(t as f32);

            for (index, &channel) in self.config.channels.iter().enumerate() {
                // slight per-channel carrier variation, as across electrodes
                let carrier_hz = 60.0 + index as f32 * 4.0;
                let phase = 2.0 * std::f32::consts::PI * carrier_hz * t as f32;

                let mut value = activation * self.config.amplitude * phase.sin();
                value += activation * self.config.amplitude * 0.3 * (2.0 * phase).sin();
                value += activation * self.rng.gen_range(-0.2..0.2) * self.config.amplitude;
                value += self.noise.sample(&mut self.rng);

                if let Some(mains) = self.config.powerline_hz {
                    value += 5.0
                        * (2.0 * std::f32::consts::PI * mains * t as f32).sin();
                }

                samples.push(Sample::new(t, channel, value));
            }
        }

        self.time_offset += steps as f64 * dt;
        samples
    }

    /// Restart the timeline (a new recording session).
    pub fn reset_time(&mut self) {
        self.time_offset = 0.0;
    }
}

/// Configuration for the GSR simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GsrSimulatorConfig {
    /// Sampling rate in Hz
    pub sample_rate: f32,
    /// Channel id to generate
    pub channel: ChannelId,
    /// Baseline skin conductance level, µS
    pub baseline: f32,
    /// Peak-to-peak slow baseline drift, µS (0 disables)
    pub drift_amplitude: f32,
    /// (time, amplitude) of each SCR bump, seconds / µS
    pub scr_events: Vec<(f64, f32)>,
    /// Onset-to-peak rise time of each bump, seconds
    pub scr_rise_time: f64,
    /// Gaussian measurement noise standard deviation, µS
    pub noise_std: f32,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for GsrSimulatorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 250.0,
            channel: ChannelId(0),
            baseline: 5.0,
            drift_amplitude: 0.5,
            scr_events: vec![(10.0, 0.5), (25.0, 0.8), (42.0, 0.3)],
            scr_rise_time: 2.0,
            noise_std: 0.02,
            seed: None,
        }
    }
}

/// Generates a GSR trace: drifting tonic baseline with Gaussian-shaped SCR
/// bumps and measurement noise riding on it.
pub struct GsrSimulator {
    config: GsrSimulatorConfig,
    rng: rand::rngs::StdRng,
    noise: Normal<f32>,
    time_offset: f64,
}

impl GsrSimulator {
    pub fn new(config: GsrSimulatorConfig) -> SignalResult<Self> {
        let noise = Normal::new(0.0, config.noise_std).map_err(|e| {
            SignalError::ConfigurationError {
                message: format!("invalid noise distribution: {}", e),
            }
        })?;
        let rng = rand::rngs::StdRng::seed_from_u64(seed_or_now(config.seed));

        Ok(Self {
            config,
            rng,
            noise,
            time_offset: 0.0,
        })
    }

    pub fn config(&self) -> &GsrSimulatorConfig {
        &self.config
    }

    /// Generate `duration` seconds of samples; consecutive calls continue
    /// the timeline.
    pub fn generate(&mut self, duration: f64) -> Vec<Sample> {
        let dt = 1.0 / self.config.sample_rate as f64;
        let steps = (duration * self.config.sample_rate as f64) as usize;
        let mut samples = Vec::with_capacity(steps);

        // spread such that the bump crosses ~6% of its amplitude one rise
        // time before the peak
        let sigma = self.config.scr_rise_time / 2.355;

        for step in 0..steps {
            let t = self.time_offset + step as f64 * dt;

            let mut value = self.config.baseline as f64
                + (self.config.drift_amplitude as f64 / 2.0)
                    * (2.0 * std::f64::consts::PI * 0.01 * t).sin();

            for &(event_time, amplitude) in &self.config.scr_events {
                value += amplitude as f64
                    * (-(t - event_time).powi(2) / (2.0 * sigma * sigma)).exp();
            }

            let value = value as f32 + self.noise.sample(&mut self.rng);
            samples.push(Sample::new(t, self.config.channel, value));
        }

        self.time_offset += steps as f64 * dt;
        samples
    }

    pub fn reset_time(&mut self) {
        self.time_offset = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emg_simulator_timeline_and_shape() {
        let config = EmgSimulatorConfig {
            channels: (0..4).map(ChannelId).collect(),
            seed: Some(7),
            ..EmgSimulatorConfig::default()
        };
        let mut simulator = EmgSimulator::new(config).unwrap();

        let first = simulator.generate(0.5);
        assert_eq!(first.len(), 100 * 4);
        // timestamps are shared across channels and non-decreasing
        assert_eq!(first[0].timestamp, first[3].timestamp);
        assert!(first.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        // a second call continues the timeline
        let second = simulator.generate(0.5);
        assert!(second[0].timestamp > first.last().unwrap().timestamp);
    }

    #[test]
    fn test_emg_simulator_is_deterministic_under_seed() {
        let config = EmgSimulatorConfig {
            seed: Some(42),
            ..EmgSimulatorConfig::default()
        };
        let mut a = EmgSimulator::new(config.clone()).unwrap();
        let mut b = EmgSimulator::new(config).unwrap();
        assert_eq!(a.generate(1.0), b.generate(1.0));
    }

    #[test]
    fn test_emg_rest_pattern_is_noise_only() {
        let config = EmgSimulatorConfig {
            pattern: ActivationPattern::Constant { level: 0.0 },
            powerline_hz: None,
            noise_std: 1.0,
            seed: Some(1),
            ..EmgSimulatorConfig::default()
        };
        let mut simulator = EmgSimulator::new(config).unwrap();
        let samples = simulator.generate(1.0);
        let max = samples.iter().map(|s| s.value.abs()).fold(0.0f32, f32::max);
        assert!(max < 6.0, "rest signal should be noise-scale, got {}", max);
    }

    #[test]
    fn test_gsr_simulator_bump_amplitude() {
        let config = GsrSimulatorConfig {
            baseline: 2.0,
            drift_amplitude: 0.0,
            scr_events: vec![(10.0, 0.8)],
            noise_std: 0.0,
            seed: Some(3),
            ..GsrSimulatorConfig::default()
        };
        let mut simulator = GsrSimulator::new(config).unwrap();
        let samples = simulator.generate(20.0);

        let peak = samples
            .iter()
            .map(|s| s.value)
            .fold(f32::NEG_INFINITY, f32::max);
        assert!((peak - 2.8).abs() < 0.01);

        // far from the bump the trace sits on the baseline
        assert!((samples[0].value - 2.0).abs() < 0.01);
        assert!((samples.last().unwrap().value - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_channel_list_rejected() {
        let config = EmgSimulatorConfig {
            channels: Vec::new(),
            ..EmgSimulatorConfig::default()
        };
        assert!(EmgSimulator::new(config).is_err());
    }
}
