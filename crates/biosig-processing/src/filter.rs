//! Causal digital filters applied sample-by-sample with persistent state

use biosig_core::{SignalError, SignalResult};
use serde::{Deserialize, Serialize};

/// Common contract for every sample-in/sample-out stage.
///
/// `process` must be called once per arriving sample, in arrival order,
/// with no gaps. Skipped calls degrade accuracy silently; the stage cannot
/// detect them, so this is a caller precondition rather than an enforced
/// invariant.
pub trait SampleStage: Send {
    /// Consume one input value and return one output value, updating state.
    fn process(&mut self, value: f32) -> f32;

    /// Zero the internal state (used when a stream restarts after a gap).
    fn reset(&mut self);
}

/// Filter response shapes supported by the framework
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterKind {
    /// Butterworth lowpass
    LowPass { cutoff_hz: f32 },
    /// Butterworth highpass
    HighPass { cutoff_hz: f32 },
    /// Butterworth bandpass (highpass/lowpass cascade)
    BandPass { low_hz: f32, high_hz: f32 },
    /// Notch for powerline interference
    Notch { freq_hz: f32, q: f32 },
}

/// Filter specification: shape, sample rate and order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    /// Sample rate the filter is designed for, in Hz
    pub sample_rate: f32,
    /// Filter order; realized as ceil(order / 2) second-order sections
    pub order: usize,
}

impl FilterSpec {
    /// Lowpass filter specification
    pub fn lowpass(cutoff_hz: f32, sample_rate: f32, order: usize) -> Self {
        Self {
            kind: FilterKind::LowPass { cutoff_hz },
            sample_rate,
            order,
        }
    }

    /// Highpass filter specification
    pub fn highpass(cutoff_hz: f32, sample_rate: f32, order: usize) -> Self {
        Self {
            kind: FilterKind::HighPass { cutoff_hz },
            sample_rate,
            order,
        }
    }

    /// Bandpass filter specification
    pub fn bandpass(low_hz: f32, high_hz: f32, sample_rate: f32, order: usize) -> Self {
        Self {
            kind: FilterKind::BandPass { low_hz, high_hz },
            sample_rate,
            order,
        }
    }

    /// Notch filter specification (order is fixed at 2)
    pub fn notch(freq_hz: f32, q: f32, sample_rate: f32) -> Self {
        Self {
            kind: FilterKind::Notch { freq_hz, q },
            sample_rate,
            order: 2,
        }
    }

    fn validate_cutoff(&self, cutoff_hz: f32) -> SignalResult<()> {
        let nyquist = self.sample_rate / 2.0;
        let normalized = cutoff_hz / nyquist;
        if !(normalized > 0.0 && normalized < 1.0) || !normalized.is_finite() {
            return Err(SignalError::ConfigurationError {
                message: format!(
                    "cutoff {}Hz invalid for sample rate {}Hz: normalized cutoff must lie in (0, 1)",
                    cutoff_hz, self.sample_rate
                ),
            });
        }
        Ok(())
    }

    /// Validate the specification without constructing a stage.
    pub fn validate(&self) -> SignalResult<()> {
        if self.sample_rate <= 0.0 || !self.sample_rate.is_finite() {
            return Err(SignalError::ConfigurationError {
                message: format!("sample rate {}Hz must be positive", self.sample_rate),
            });
        }
        if self.order == 0 {
            return Err(SignalError::ConfigurationError {
                message: "filter order must be at least 1".to_string(),
            });
        }

        match self.kind {
            FilterKind::LowPass { cutoff_hz } | FilterKind::HighPass { cutoff_hz } => {
                self.validate_cutoff(cutoff_hz)
            }
            FilterKind::BandPass { low_hz, high_hz } => {
                if low_hz >= high_hz {
                    return Err(SignalError::ConfigurationError {
                        message: format!(
                            "bandpass low cutoff {}Hz must be below high cutoff {}Hz",
                            low_hz, high_hz
                        ),
                    });
                }
                self.validate_cutoff(low_hz)?;
                self.validate_cutoff(high_hz)
            }
            FilterKind::Notch { freq_hz, q } => {
                if q <= 0.0 {
                    return Err(SignalError::ConfigurationError {
                        message: format!("notch quality factor {} must be positive", q),
                    });
                }
                self.validate_cutoff(freq_hz)
            }
        }
    }
}

/// Single second-order section.
///
/// Coefficients and state are kept in f64: sub-hertz cutoffs against a
/// 250 Hz sample rate put the poles too close to z = 1 for f32 to resolve.
#[derive(Debug, Clone)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    // Direct form II transposed state
    s1: f64,
    s2: f64,
}

impl Biquad {
    /// 2nd-order Butterworth lowpass via bilinear transform
    fn butter_lowpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        let omega = std::f64::consts::PI * cutoff_hz / sample_rate;
        let k = omega.tan();
        let sqrt2 = std::f64::consts::SQRT_2;
        let k2 = k * k;
        let norm = k2 + sqrt2 * k + 1.0;

        let b0 = k2 / norm;
        Self {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (k2 - 1.0) / norm,
            a2: (k2 - sqrt2 * k + 1.0) / norm,
            s1: 0.0,
            s2: 0.0,
        }
    }

    /// 2nd-order Butterworth highpass via bilinear transform
    fn butter_highpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        let omega = std::f64::consts::PI * cutoff_hz / sample_rate;
        let k = omega.tan();
        let sqrt2 = std::f64::consts::SQRT_2;
        let k2 = k * k;
        let norm = k2 + sqrt2 * k + 1.0;

        let b0 = 1.0 / norm;
        Self {
            b0,
            b1: -2.0 * b0,
            b2: b0,
            a1: 2.0 * (k2 - 1.0) / norm,
            a2: (k2 - sqrt2 * k + 1.0) / norm,
            s1: 0.0,
            s2: 0.0,
        }
    }

    /// Notch biquad for powerline rejection
    fn notch(freq_hz: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * std::f64::consts::PI * freq_hz / sample_rate;
        let alpha = omega.sin() / (2.0 * q);
        let cos_omega = omega.cos();
        let a0 = 1.0 + alpha;

        Self {
            b0: 1.0 / a0,
            b1: -2.0 * cos_omega / a0,
            b2: 1.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
            s1: 0.0,
            s2: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.s1;
        self.s1 = self.b1 * x - self.a1 * y + self.s2;
        self.s2 = self.b2 * x - self.a2 * y;
        y
    }

    fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }

    /// Steady-state gain at DC
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Seed the state to the DC steady state for a constant input `x`.
    fn prime(&mut self, x: f64) {
        let y = x * self.dc_gain();
        self.s2 = self.b2 * x - self.a2 * y;
        self.s1 = self.b1 * x - self.a1 * y + self.s2;
    }
}

/// Stateful recursive filter for one channel.
///
/// Each output depends only on past and current inputs, so the stage
/// supports unbounded real-time streaming. Internal state is exclusively
/// owned: one instance per channel, never shared, or channels contaminate
/// each other through the taps.
#[derive(Debug, Clone)]
pub struct FilterStage {
    spec: FilterSpec,
    sections: Vec<Biquad>,
}

impl FilterStage {
    /// Build a filter from its specification.
    ///
    /// Fails with [`SignalError::ConfigurationError`] when the normalized
    /// cutoff falls outside (0, 1) or the band edges are inverted, so a
    /// misconfigured pipeline is rejected before streaming starts.
    pub fn new(spec: FilterSpec) -> SignalResult<Self> {
        spec.validate()?;

        let fs = spec.sample_rate as f64;
        let num_sections = (spec.order + 1) / 2;

        let sections = match spec.kind {
            FilterKind::LowPass { cutoff_hz } => {
                vec![Biquad::butter_lowpass(cutoff_hz as f64, fs); num_sections]
            }
            FilterKind::HighPass { cutoff_hz } => {
                vec![Biquad::butter_highpass(cutoff_hz as f64, fs); num_sections]
            }
            FilterKind::BandPass { low_hz, high_hz } => {
                let mut sections =
                    vec![Biquad::butter_highpass(low_hz as f64, fs); num_sections];
                sections.extend(vec![Biquad::butter_lowpass(high_hz as f64, fs); num_sections]);
                sections
            }
            FilterKind::Notch { freq_hz, q } => {
                vec![Biquad::notch(freq_hz as f64, q as f64, fs)]
            }
        };

        Ok(Self { spec, sections })
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Seed the filter state so a constant input `value` passes through at
    /// its DC steady state, suppressing the start-up transient. Used by the
    /// tonic estimator, where the transient would otherwise last minutes.
    pub fn prime(&mut self, value: f32) {
        // each section is primed with the DC output of the one before it
        let mut x = value as f64;
        for section in &mut self.sections {
            section.prime(x);
            x *= section.dc_gain();
        }
    }

    /// Steady-state output for a constant input `value`
    fn dc_output(&self, value: f32) -> f32 {
        let gain: f64 = self.sections.iter().map(|s| s.dc_gain()).product();
        (value as f64 * gain) as f32
    }
}

impl SampleStage for FilterStage {
    fn process(&mut self, value: f32) -> f32 {
        let mut x = value as f64;
        for section in &mut self.sections {
            x = section.process(x);
        }
        x as f32
    }

    fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

/// Ordered chain of filter stages applied in series
#[derive(Debug, Default)]
pub struct FilterCascade {
    stages: Vec<FilterStage>,
}

impl FilterCascade {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn push(&mut self, stage: FilterStage) {
        self.stages.push(stage);
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Seed every stage for a constant input (see [`FilterStage::prime`]).
    pub fn prime(&mut self, value: f32) {
        let mut x = value;
        for stage in &mut self.stages {
            stage.prime(x);
            x = stage.dc_output(x);
        }
    }
}

impl SampleStage for FilterCascade {
    fn process(&mut self, value: f32) -> f32 {
        let mut x = value;
        for stage in &mut self.stages {
            x = stage.process(x);
        }
        x
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}
