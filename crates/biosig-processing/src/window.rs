//! Sliding-window feature aggregation

use biosig_core::{ChannelId, FeatureVector, SignalError, SignalResult};
use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Frequency band definition for band-power features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub low_hz: f32,
    pub high_hz: f32,
}

impl FrequencyBand {
    /// EMG bands for the 200 Hz armband (Nyquist 100 Hz)
    pub fn emg_bands() -> Vec<FrequencyBand> {
        vec![
            FrequencyBand { name: "low".to_string(), low_hz: 20.0, high_hz: 45.0 },
            FrequencyBand { name: "mid".to_string(), low_hz: 45.0, high_hz: 70.0 },
            FrequencyBand { name: "high".to_string(), low_hz: 70.0, high_hz: 95.0 },
        ]
    }
}

/// Window geometry and feature selection for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window duration in seconds
    pub duration: f64,
    /// Stride between window starts in seconds; stride == duration gives
    /// non-overlapping windows, stride < duration overlapping ones
    pub stride: f64,
    /// Sample rate used for spectral bin resolution
    pub sample_rate: f32,
    /// Bands for spectral power features; empty disables the FFT pass
    pub bands: Vec<FrequencyBand>,
}

impl WindowConfig {
    pub fn new(duration: f64, stride: f64, sample_rate: f32) -> Self {
        Self {
            duration,
            stride,
            sample_rate,
            bands: Vec::new(),
        }
    }

    pub fn with_bands(mut self, bands: Vec<FrequencyBand>) -> Self {
        self.bands = bands;
        self
    }

    pub fn validate(&self) -> SignalResult<()> {
        if !(self.duration > 0.0 && self.duration.is_finite()) {
            return Err(SignalError::ConfigurationError {
                message: format!("window duration {}s must be positive", self.duration),
            });
        }
        if !(self.stride > 0.0) || self.stride > self.duration {
            return Err(SignalError::ConfigurationError {
                message: format!(
                    "window stride {}s must lie in (0, duration {}s]",
                    self.stride, self.duration
                ),
            });
        }
        if self.sample_rate <= 0.0 {
            return Err(SignalError::ConfigurationError {
                message: "window sample rate must be positive".to_string(),
            });
        }
        for band in &self.bands {
            if band.low_hz >= band.high_hz || band.low_hz < 0.0 {
                return Err(SignalError::ConfigurationError {
                    message: format!(
                        "band '{}' [{}, {}]Hz is malformed",
                        band.name, band.low_hz, band.high_hz
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Aggregates processed samples into per-window [`FeatureVector`]s.
///
/// Windows are fixed-duration in timestamp space. Overlapping windows
/// recompute their features from the buffered raw samples rather than
/// incrementally, trading compute for correctness simplicity.
pub struct FeatureWindow {
    channel: ChannelId,
    config: WindowConfig,
    samples: VecDeque<(f64, f32)>,
    window_start: Option<f64>,
    planner: FftPlanner<f32>,
}

impl std::fmt::Debug for FeatureWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureWindow")
            .field("channel", &self.channel)
            .field("config", &self.config)
            .field("samples", &self.samples)
            .field("window_start", &self.window_start)
            .field("planner", &"<FftPlanner>")
            .finish()
    }
}

impl FeatureWindow {
    pub fn new(channel: ChannelId, config: WindowConfig) -> SignalResult<Self> {
        config.validate()?;
        Ok(Self {
            channel,
            config,
            samples: VecDeque::new(),
            window_start: None,
            planner: FftPlanner::new(),
        })
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Accumulate one processed value; returns a completed window's
    /// features when this sample lands at or beyond the window end.
    pub fn push(&mut self, timestamp: f64, value: f32) -> Option<FeatureVector> {
        let start = *self.window_start.get_or_insert(timestamp);

        let mut emitted = None;
        if timestamp >= start + self.config.duration {
            emitted = Some(self.emit(start, start + self.config.duration, false));

            // advance far enough that the new sample falls inside the
            // current window (a long silence may skip several strides)
            let mut new_start = start + self.config.stride;
            while timestamp >= new_start + self.config.duration {
                new_start += self.config.stride;
            }
            self.window_start = Some(new_start);
            while let Some(&(t, _)) = self.samples.front() {
                if t < new_start {
                    self.samples.pop_front();
                } else {
                    break;
                }
            }
        }

        self.samples.push_back((timestamp, value));
        emitted
    }

    /// Close the in-progress window early, flagged as partial.
    ///
    /// Called at a stop signal so no data is silently lost mid-window.
    /// Returns `None` when nothing has been accumulated.
    pub fn flush(&mut self) -> Option<FeatureVector> {
        let start = self.window_start?;
        if self.samples.is_empty() {
            self.window_start = None;
            return None;
        }
        let end = self.samples.back().map(|&(t, _)| t).unwrap_or(start);
        let vector = self.emit(start, end, true);
        self.samples.clear();
        self.window_start = None;
        Some(vector)
    }

    /// Drop buffered samples and window alignment.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.window_start = None;
    }

    fn emit(&mut self, start: f64, end: f64, partial: bool) -> FeatureVector {
        let values: Vec<f32> = self.samples.iter().map(|&(_, v)| v).collect();
        let mut features = time_domain_features(&values);

        if !self.config.bands.is_empty() && values.len() >= 4 {
            let powers = self.band_powers(&values);
            features.extend(powers);
        }

        FeatureVector::new(self.channel, start, end, partial, features)
    }

    /// Band power from an FFT periodogram over the window
    fn band_powers(&mut self, values: &[f32]) -> HashMap<String, f64> {
        let fft_size = values.len().next_power_of_two();
        let fft = self.planner.plan_fft_forward(fft_size);

        let mut buffer: Vec<Complex<f32>> =
            values.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buffer.resize(fft_size, Complex::new(0.0, 0.0));
        fft.process(&mut buffer);

        // power spectrum over positive frequencies
        let power_spectrum: Vec<f64> = buffer[0..fft_size / 2]
            .iter()
            .map(|c| (c.norm() as f64).powi(2))
            .collect();
        let freq_resolution = self.config.sample_rate as f64 / fft_size as f64;

        let mut powers = HashMap::new();
        for band in &self.config.bands {
            let low_bin = (band.low_hz as f64 / freq_resolution) as usize;
            let high_bin = ((band.high_hz as f64 / freq_resolution) as usize)
                .min(power_spectrum.len().saturating_sub(1));
            let power: f64 = if low_bin <= high_bin && low_bin < power_spectrum.len() {
                power_spectrum[low_bin..=high_bin].iter().sum()
            } else {
                0.0
            };
            powers.insert(format!("band_power_{}", band.name), power);
        }
        powers
    }
}

/// Mean, RMS, standard deviation, mean absolute value and waveform length
fn time_domain_features(values: &[f32]) -> HashMap<String, f64> {
    let mut features = HashMap::new();
    if values.is_empty() {
        return features;
    }

    let n = values.len() as f64;
    let sum: f64 = values.iter().map(|&x| x as f64).sum();
    let mean = sum / n;

    let sum_sq: f64 = values.iter().map(|&x| (x as f64).powi(2)).sum();
    let rms = (sum_sq / n).sqrt();

    let variance = values
        .iter()
        .map(|&x| (x as f64 - mean).powi(2))
        .sum::<f64>()
        / n;

    let mav = values.iter().map(|&x| (x as f64).abs()).sum::<f64>() / n;

    let waveform_length: f64 = values
        .windows(2)
        .map(|w| (w[1] as f64 - w[0] as f64).abs())
        .sum();

    features.insert("mean".to_string(), mean);
    features.insert("rms".to_string(), rms);
    features.insert("std".to_string(), variance.sqrt());
    features.insert("mav".to_string(), mav);
    features.insert("waveform_length".to_string(), waveform_length);
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_input_emits_one_vector_per_second() {
        let config = WindowConfig::new(1.0, 1.0, 200.0);
        let mut window = FeatureWindow::new(ChannelId(0), config).unwrap();

        let mut vectors = Vec::new();
        for i in 0..1000 {
            let t = i as f64 / 200.0; // 5 seconds total
            if let Some(v) = window.push(t, 3.5) {
                vectors.push(v);
            }
        }
        if let Some(v) = window.flush() {
            vectors.push(v);
        }

        assert_eq!(vectors.len(), 5);
        for v in &vectors {
            assert!((v.get("mean").unwrap() - 3.5).abs() < 1e-6);
            assert!((v.get("rms").unwrap() - 3.5).abs() < 1e-6);
            assert!(v.get("std").unwrap().abs() < 1e-6);
        }
        // only the flushed tail is marked partial
        assert!(vectors[..4].iter().all(|v| !v.partial));
        assert!(vectors[4].partial);
    }

    #[test]
    fn test_window_timestamps_tile_the_stream() {
        let config = WindowConfig::new(1.0, 1.0, 100.0);
        let mut window = FeatureWindow::new(ChannelId(2), config).unwrap();

        let mut vectors = Vec::new();
        for i in 0..300 {
            let t = i as f64 / 100.0;
            if let Some(v) = window.push(t, (i % 7) as f32) {
                vectors.push(v);
            }
        }

        assert_eq!(vectors.len(), 2);
        assert!((vectors[0].start_time - 0.0).abs() < 1e-9);
        assert!((vectors[0].end_time - 1.0).abs() < 1e-9);
        assert!((vectors[1].start_time - 1.0).abs() < 1e-9);
        assert_eq!(vectors[0].channel, ChannelId(2));
    }

    #[test]
    fn test_overlapping_windows_share_samples() {
        // 1 s windows every 0.5 s
        let config = WindowConfig::new(1.0, 0.5, 100.0);
        let mut window = FeatureWindow::new(ChannelId(0), config).unwrap();

        // ramp so each window's mean identifies its span
        let mut vectors = Vec::new();
        for i in 0..250 {
            let t = i as f64 / 100.0;
            if let Some(v) = window.push(t, t as f32) {
                vectors.push(v);
            }
        }

        assert!(vectors.len() >= 3);
        assert!((vectors[0].start_time - 0.0).abs() < 1e-9);
        assert!((vectors[1].start_time - 0.5).abs() < 1e-9);
        // mean of a ramp over [start, start+1) is start + ~0.5
        for v in &vectors {
            let expected = v.start_time + 0.5;
            assert!(
                (v.get("mean").unwrap() - expected).abs() < 0.02,
                "window starting {} has mean {}",
                v.start_time,
                v.get("mean").unwrap()
            );
        }
    }

    #[test]
    fn test_band_power_tracks_tone_frequency() {
        let fs = 200.0f32;
        let config =
            WindowConfig::new(1.28, 1.28, fs).with_bands(FrequencyBand::emg_bands());
        let mut window = FeatureWindow::new(ChannelId(0), config).unwrap();

        // 30 Hz tone lands in the low band (20-45 Hz)
        let mut vector = None;
        for i in 0..300 {
            let t = i as f64 / fs as f64;
            let x = (2.0 * std::f32::consts::PI * 30.0 * t as f32).sin();
            if let Some(v) = window.push(t, x) {
                vector = Some(v);
            }
        }

        let vector = vector.expect("a 1.28s window should have closed");
        let low = vector.get("band_power_low").unwrap();
        let mid = vector.get("band_power_mid").unwrap();
        let high = vector.get("band_power_high").unwrap();
        assert!(low > mid * 5.0, "low {} should dominate mid {}", low, mid);
        assert!(low > high * 5.0, "low {} should dominate high {}", low, high);
    }

    #[test]
    fn test_flush_on_empty_window_returns_none() {
        let config = WindowConfig::new(1.0, 1.0, 100.0);
        let mut window = FeatureWindow::new(ChannelId(0), config).unwrap();
        assert!(window.flush().is_none());
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        assert!(FeatureWindow::new(ChannelId(0), WindowConfig::new(0.0, 1.0, 100.0)).is_err());
        assert!(FeatureWindow::new(ChannelId(0), WindowConfig::new(1.0, 0.0, 100.0)).is_err());
        // stride beyond duration would silently drop samples
        assert!(FeatureWindow::new(ChannelId(0), WindowConfig::new(1.0, 2.0, 100.0)).is_err());

        let bad_band = WindowConfig::new(1.0, 1.0, 100.0).with_bands(vec![FrequencyBand {
            name: "inverted".to_string(),
            low_hz: 50.0,
            high_hz: 20.0,
        }]);
        assert!(FeatureWindow::new(ChannelId(0), bad_band).is_err());
    }
}
