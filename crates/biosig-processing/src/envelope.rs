//! EMG envelope extraction: rectify, then smooth

use crate::filter::{FilterSpec, FilterStage, SampleStage};
use biosig_core::SignalResult;
use serde::{Deserialize, Serialize};

/// Configuration for one channel's envelope extractor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Optional line-frequency rejection applied before rectification
    pub notch: Option<NotchSpec>,
    /// Envelope smoothing cutoff in Hz (typically 3-10 Hz)
    pub cutoff_hz: f32,
    /// Smoothing filter order
    pub order: usize,
    /// Sample rate of the channel, in Hz
    pub sample_rate: f32,
}

/// Notch parameters for powerline rejection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotchSpec {
    pub freq_hz: f32,
    pub q: f32,
}

impl EnvelopeConfig {
    /// Lab default: 6 Hz envelope, order 4, no notch.
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self {
            notch: None,
            cutoff_hz,
            order: 4,
            sample_rate,
        }
    }

    pub fn with_notch(mut self, freq_hz: f32, q: f32) -> Self {
        self.notch = Some(NotchSpec { freq_hz, q });
        self
    }
}

/// Muscle-activation-level signal from raw or band-passed EMG.
///
/// Per-sample pipeline: optional notch -> full-wave rectification
/// (absolute value) -> lowpass smoothing. The first ~1/cutoff seconds of
/// output after construction or `reset` are the smoothing filter's
/// transient response and should not be trusted; this is expected
/// behavior, not hidden or corrected.
#[derive(Debug)]
pub struct EnvelopeExtractor {
    notch: Option<FilterStage>,
    smoother: FilterStage,
    config: EnvelopeConfig,
}

impl EnvelopeExtractor {
    pub fn new(config: EnvelopeConfig) -> SignalResult<Self> {
        let notch = match config.notch {
            Some(spec) => Some(FilterStage::new(FilterSpec::notch(
                spec.freq_hz,
                spec.q,
                config.sample_rate,
            ))?),
            None => None,
        };
        let smoother = FilterStage::new(FilterSpec::lowpass(
            config.cutoff_hz,
            config.sample_rate,
            config.order,
        ))?;

        Ok(Self { notch, smoother, config })
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }
}

impl SampleStage for EnvelopeExtractor {
    fn process(&mut self, value: f32) -> f32 {
        let cleaned = match &mut self.notch {
            Some(notch) => notch.process(value),
            None => value,
        };
        self.smoother.process(cleaned.abs())
    }

    fn reset(&mut self) {
        if let Some(notch) = &mut self.notch {
            notch.reset();
        }
        self.smoother.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_of_rectified_sinusoid_converges_to_rectified_mean() {
        let fs = 200.0;
        let mut extractor = EnvelopeExtractor::new(EnvelopeConfig::new(6.0, fs)).unwrap();

        // 23 Hz so the sampling grid covers many phases of the cycle
        let mut last = 0.0;
        for i in 0..2000 {
            let t = i as f32 / fs;
            last = extractor.process((2.0 * std::f32::consts::PI * 23.0 * t).sin());
        }

        // rectified mean of a unit sinusoid is 2/pi
        let expected = 2.0 / std::f32::consts::PI;
        assert!(
            (last - expected).abs() < 0.05,
            "envelope {} should settle near {}",
            last,
            expected
        );
    }

    #[test]
    fn test_square_wave_burst_envelope_rises_and_recovers() {
        let fs = 200.0;
        let mut extractor = EnvelopeExtractor::new(EnvelopeConfig::new(6.0, fs)).unwrap();

        let burst = |t: f32| {
            if (1.0..4.0).contains(&t) {
                // +/-100 µV square wave at 10 Hz
                if (2.0 * std::f32::consts::PI * 10.0 * t).sin() >= 0.0 {
                    100.0
                } else {
                    -100.0
                }
            } else {
                0.0
            }
        };

        let mut mid_burst = 0.0;
        let mut after_burst = 0.0;
        let mut pre_burst = 0.0;
        for i in 0..(6.0 * fs) as usize {
            let t = i as f32 / fs;
            let env = extractor.process(burst(t));
            if (t - 0.9).abs() < 1e-6 {
                pre_burst = env;
            }
            if (t - 3.5).abs() < 1e-6 {
                mid_burst = env;
            }
            after_burst = env;
        }

        assert!(pre_burst.abs() < 1.0, "envelope near zero at rest, got {}", pre_burst);
        // rectified square wave is a constant 100, so the plateau sits there
        assert!(
            (mid_burst - 100.0).abs() < 10.0,
            "envelope plateau should approach 100 µV, got {}",
            mid_burst
        );
        assert!(
            after_burst.abs() < 5.0,
            "envelope should return to near zero after the burst, got {}",
            after_burst
        );
    }

    #[test]
    fn test_notch_variant_behaves_like_plain_on_clean_signal() {
        let fs = 200.0;
        let mut plain = EnvelopeExtractor::new(EnvelopeConfig::new(6.0, fs)).unwrap();
        let mut notched =
            EnvelopeExtractor::new(EnvelopeConfig::new(6.0, fs).with_notch(50.0, 30.0)).unwrap();

        let mut last_plain = 0.0;
        let mut last_notched = 0.0;
        for i in 0..2000 {
            let t = i as f32 / fs;
            let x = (2.0 * std::f32::consts::PI * 23.0 * t).sin();
            last_plain = plain.process(x);
            last_notched = notched.process(x);
        }
        // 23 Hz is far from the 50 Hz notch; envelopes agree closely
        assert!((last_plain - last_notched).abs() < 0.05);
    }

    #[test]
    fn test_reset_restores_fresh_behavior() {
        let fs = 200.0;
        let config = EnvelopeConfig::new(6.0, fs);
        let mut used = EnvelopeExtractor::new(config).unwrap();
        for i in 0..500 {
            used.process((i as f32 * 0.3).sin());
        }
        used.reset();

        let mut fresh = EnvelopeExtractor::new(config).unwrap();
        for i in 0..200 {
            let x = (i as f32 * 0.17).cos();
            assert_eq!(used.process(x).to_bits(), fresh.process(x).to_bits());
        }
    }
}
