//! Per-channel processing pipeline assembly

use crate::config::ProcessingConfig;
use crate::decompose::{DecomposerConfig, TonicPhasicDecomposer};
use crate::detector::EventDetector;
use crate::envelope::{EnvelopeConfig, EnvelopeExtractor};
use crate::filter::{FilterCascade, FilterSpec, FilterStage, SampleStage};
use crate::window::{FeatureWindow, WindowConfig};
use biosig_core::{
    ChannelConfig, ChannelId, ChannelKind, FeatureVector, RingBuffer, Sample, ScrEvent,
    SignalResult, TonicPhasicSplit,
};
use tracing::warn;

/// Processed value for one input sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalValue {
    /// Muscle activation level (EMG path)
    Envelope(f32),
    /// Tonic/phasic pair (GSR path)
    TonicPhasic(TonicPhasicSplit),
    /// Smoothed value (IMU path)
    Filtered(f32),
}

/// Inter-sample gap surfaced to the caller.
///
/// A gap is a warning, not an applied action: the pipeline recommends a
/// `reset()` of dependent filter state but never performs one itself,
/// since silently resetting could hide a real acquisition fault.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapWarning {
    /// Observed inter-sample interval in seconds
    pub interval: f64,
    /// Nominal sampling period in seconds
    pub nominal_period: f64,
}

/// Everything one sample produced on its way through the pipeline
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    pub timestamp: f64,
    pub channel: ChannelId,
    pub value: SignalValue,
    /// Confirmed SCR, when the sample closed a detection episode
    pub event: Option<ScrEvent>,
    /// Completed feature window, when the sample closed one
    pub feature: Option<FeatureVector>,
    /// Gap warning, when the sample arrived long after its predecessor
    pub gap: Option<GapWarning>,
}

#[derive(Debug)]
enum KindStages {
    Emg {
        prefilter: FilterCascade,
        envelope: EnvelopeExtractor,
    },
    Gsr {
        prefilter: FilterStage,
        decomposer: TonicPhasicDecomposer,
        detector: EventDetector,
    },
    Imu {
        smoother: FilterStage,
    },
}

/// One channel's complete processing chain.
///
/// Owns the channel's ring buffer and every piece of filter state; state
/// is never shared across channels, so different channels can be processed
/// fully in parallel. The instance itself is not safe for concurrent
/// mutation and must be driven by exactly one execution context.
#[derive(Debug)]
pub struct ChannelPipeline {
    channel: ChannelConfig,
    buffer: RingBuffer,
    stages: KindStages,
    window: FeatureWindow,
    gap_factor: f64,
}

impl ChannelPipeline {
    /// Assemble the kind-specific pipeline for one channel.
    ///
    /// Fails with a `ConfigurationError` before any streaming starts when
    /// a cutoff is invalid for the channel's sample rate.
    pub fn new(channel: ChannelConfig, config: &ProcessingConfig) -> SignalResult<Self> {
        config.validate()?;
        let fs = channel.sample_rate;

        let (stages, window_params, bands) = match channel.kind {
            ChannelKind::Emg => {
                let emg = &config.emg;
                let mut prefilter = FilterCascade::new();
                prefilter.push(FilterStage::new(FilterSpec::bandpass(
                    emg.band_low_hz,
                    emg.band_high_hz,
                    fs,
                    emg.band_order,
                ))?);
                if let Some(notch) = emg.notch {
                    prefilter.push(FilterStage::new(FilterSpec::notch(
                        notch.freq_hz,
                        notch.q,
                        fs,
                    ))?);
                }

                let mut envelope_config = EnvelopeConfig::new(emg.envelope_cutoff_hz, fs);
                envelope_config.order = emg.envelope_order;
                let envelope = EnvelopeExtractor::new(envelope_config)?;

                (
                    KindStages::Emg { prefilter, envelope },
                    emg.window,
                    emg.bands.clone(),
                )
            }
            ChannelKind::Gsr => {
                let gsr = &config.gsr;
                let prefilter = FilterStage::new(FilterSpec::lowpass(
                    gsr.lowpass_hz,
                    fs,
                    gsr.lowpass_order,
                ))?;
                let mut decomposer_config = DecomposerConfig::new(gsr.tonic_cutoff_hz, fs);
                decomposer_config.order = gsr.tonic_order;
                let decomposer = TonicPhasicDecomposer::new(decomposer_config)?;
                let detector = EventDetector::new(channel.id, gsr.detector);

                (
                    KindStages::Gsr { prefilter, decomposer, detector },
                    gsr.window,
                    Vec::new(),
                )
            }
            ChannelKind::Imu => {
                let imu = &config.imu;
                let smoother = FilterStage::new(FilterSpec::lowpass(
                    imu.smoothing_cutoff_hz,
                    fs,
                    imu.smoothing_order,
                ))?;
                (KindStages::Imu { smoother }, imu.window, Vec::new())
            }
        };

        let window = FeatureWindow::new(
            channel.id,
            WindowConfig::new(window_params.duration, window_params.stride, fs)
                .with_bands(bands),
        )?;

        Ok(Self {
            channel,
            buffer: RingBuffer::new(channel.id, config.buffer_capacity)?,
            stages,
            window,
            gap_factor: config.gap_factor,
        })
    }

    pub fn channel(&self) -> &ChannelConfig {
        &self.channel
    }

    /// Read access to the channel's raw sample history
    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    /// Run one sample through the chain.
    ///
    /// An out-of-order sample returns `SequenceError` without mutating any
    /// state; callers drop the sample, log the artifact and keep
    /// streaming. Gaps are reported on the output, never acted upon.
    pub fn process(&mut self, sample: Sample) -> SignalResult<ChannelOutput> {
        let first_sample = self.buffer.is_empty();

        let gap = self.buffer.latest_timestamp().and_then(|latest| {
            let interval = sample.timestamp - latest;
            let nominal_period = self.channel.nominal_period();
            if interval > self.gap_factor * nominal_period {
                warn!(
                    channel = %self.channel.id,
                    interval, nominal_period,
                    "inter-sample gap detected; reset() of dependent filter state recommended"
                );
                Some(GapWarning { interval, nominal_period })
            } else {
                None
            }
        });

        // rejects out-of-order timestamps before any filter state moves
        self.buffer.push(sample)?;

        let (value, windowed, event) = match &mut self.stages {
            KindStages::Emg { prefilter, envelope } => {
                let filtered = prefilter.process(sample.value);
                let activation = envelope.process(filtered);
                // window features are computed over the band-passed signal
                (SignalValue::Envelope(activation), filtered, None)
            }
            KindStages::Gsr { prefilter, decomposer, detector } => {
                if first_sample {
                    // seed the pre-filter so the session opens on the
                    // measured conductance instead of a decaying zero
                    prefilter.prime(sample.value);
                }
                let cleaned = prefilter.process(sample.value);
                let split = decomposer.process(cleaned);
                let event = detector.process(sample.timestamp, split.phasic);
                (SignalValue::TonicPhasic(split), split.tonic, event)
            }
            KindStages::Imu { smoother } => {
                let smoothed = smoother.process(sample.value);
                (SignalValue::Filtered(smoothed), smoothed, None)
            }
        };

        let feature = self.window.push(sample.timestamp, windowed);

        Ok(ChannelOutput {
            timestamp: sample.timestamp,
            channel: sample.channel,
            value,
            event,
            feature,
            gap,
        })
    }

    /// Close the in-progress feature window, flagged partial.
    pub fn flush(&mut self) -> Option<FeatureVector> {
        self.window.flush()
    }

    /// Reset every stage, including the tonic baseline.
    ///
    /// This is the explicit session boundary: the acquisition source must
    /// signal a channel restart before the pipeline is reset, since the
    /// decomposer's learned baseline is discarded here.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.window.reset();
        match &mut self.stages {
            KindStages::Emg { prefilter, envelope } => {
                prefilter.reset();
                envelope.reset();
            }
            KindStages::Gsr { prefilter, decomposer, detector } => {
                prefilter.reset();
                decomposer.reset();
                detector.reset();
            }
            KindStages::Imu { smoother } => smoother.reset(),
        }
    }
}
