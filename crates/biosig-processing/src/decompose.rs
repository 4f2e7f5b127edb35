//! Tonic/phasic decomposition of galvanic skin response

use crate::filter::{FilterSpec, FilterStage, SampleStage};
use biosig_core::{SignalResult, TonicPhasicSplit};
use serde::{Deserialize, Serialize};

/// Configuration for the tonic estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecomposerConfig {
    /// Tonic lowpass cutoff in Hz. Must be far below the 0.2-1 Hz band
    /// that individual SCR transients occupy, so the baseline estimate
    /// does not chase the events it is meant to sit under. The lab's
    /// working value is 0.05 Hz.
    pub tonic_cutoff_hz: f32,
    /// Tonic lowpass order
    pub order: usize,
    /// Sample rate of the channel, in Hz
    pub sample_rate: f32,
}

impl DecomposerConfig {
    pub fn new(tonic_cutoff_hz: f32, sample_rate: f32) -> Self {
        Self {
            tonic_cutoff_hz,
            order: 4,
            sample_rate,
        }
    }
}

/// Splits a GSR stream into skin conductance level (tonic) and the
/// SCR-bearing residual (phasic).
///
/// tonic[t] is a long-time-constant lowpass of the input; phasic[t] is
/// `raw[t] - tonic[t]`, so the pair reconstructs the input exactly. The
/// filter is primed to the first sample's value, otherwise a causal
/// estimator would open every session with a baseline-sized transient
/// that reads as a giant spurious SCR.
#[derive(Debug)]
pub struct TonicPhasicDecomposer {
    tonic_filter: FilterStage,
    primed: bool,
    config: DecomposerConfig,
}

impl TonicPhasicDecomposer {
    pub fn new(config: DecomposerConfig) -> SignalResult<Self> {
        let tonic_filter = FilterStage::new(FilterSpec::lowpass(
            config.tonic_cutoff_hz,
            config.sample_rate,
            config.order,
        ))?;

        Ok(Self {
            tonic_filter,
            primed: false,
            config,
        })
    }

    pub fn config(&self) -> &DecomposerConfig {
        &self.config
    }

    /// Split one sample into its tonic and phasic components.
    pub fn process(&mut self, value: f32) -> TonicPhasicSplit {
        if !self.primed {
            self.tonic_filter.prime(value);
            self.primed = true;
        }

        // skin conductance cannot be negative; undershoot goes to phasic
        let tonic = self.tonic_filter.process(value).max(0.0);
        TonicPhasicSplit {
            tonic,
            phasic: value - tonic,
        }
    }

    /// Discard the learned baseline.
    ///
    /// Only valid at an explicit session boundary: resetting mid-session
    /// throws away minutes of baseline adaptation and produces a
    /// discontinuity in both components.
    pub fn reset(&mut self) {
        self.tonic_filter.reset();
        self.primed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruction_holds_for_every_sample() {
        let fs = 250.0;
        let mut decomposer = TonicPhasicDecomposer::new(DecomposerConfig::new(0.05, fs)).unwrap();

        for i in 0..5000 {
            let t = i as f32 / fs;
            let raw = 3.0 + 0.4 * (0.7 * t).sin() + 0.1 * (3.1 * t).cos();
            let split = decomposer.process(raw);
            assert!(
                (split.tonic + split.phasic - raw).abs() < 1e-4,
                "tonic {} + phasic {} should reconstruct {}",
                split.tonic,
                split.phasic,
                raw
            );
        }
    }

    #[test]
    fn test_primed_baseline_produces_zero_phasic() {
        let fs = 250.0;
        let mut decomposer = TonicPhasicDecomposer::new(DecomposerConfig::new(0.05, fs)).unwrap();

        for _ in 0..2500 {
            let split = decomposer.process(2.0);
            assert!(
                split.phasic.abs() < 1e-4,
                "constant input should carry no phasic component, got {}",
                split.phasic
            );
            assert!((split.tonic - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_fast_transient_lands_in_phasic() {
        let fs = 250.0;
        let mut decomposer = TonicPhasicDecomposer::new(DecomposerConfig::new(0.05, fs)).unwrap();

        // settle on the baseline first
        for _ in 0..2500 {
            decomposer.process(2.0);
        }

        // 2-second half-sine bump of 0.5 µS riding on the baseline
        let mut max_phasic = 0.0f32;
        let mut max_tonic_excursion = 0.0f32;
        for i in 0..(2.0 * fs) as usize {
            let u = i as f32 / (2.0 * fs);
            let raw = 2.0 + 0.5 * (std::f32::consts::PI * u).sin();
            let split = decomposer.process(raw);
            max_phasic = max_phasic.max(split.phasic);
            max_tonic_excursion = max_tonic_excursion.max((split.tonic - 2.0).abs());
        }

        assert!(
            max_phasic > 0.4,
            "most of the bump should appear in phasic, got {}",
            max_phasic
        );
        assert!(
            max_tonic_excursion < 0.1,
            "tonic should barely move during a 2s transient, moved {}",
            max_tonic_excursion
        );
    }

    #[test]
    fn test_tonic_is_never_negative() {
        let fs = 250.0;
        let mut decomposer = TonicPhasicDecomposer::new(DecomposerConfig::new(0.05, fs)).unwrap();

        for i in 0..2000 {
            let raw = (0.01 * (i as f32 * 0.5).sin()).max(0.0);
            let split = decomposer.process(raw);
            assert!(split.tonic >= 0.0);
        }
    }
}
