//! Output records emitted by the processing pipeline

use crate::sample::ChannelId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Per-timestamp split of a GSR sample into slow and fast components.
///
/// `tonic + phasic` reconstructs the input value within floating-point
/// rounding; the phasic residual is computed against the rounded tonic
/// estimate so the pair always sums back to the sample it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TonicPhasicSplit {
    /// Skin conductance level (slow baseline), clamped to be non-negative
    pub tonic: f32,
    /// Skin conductance response residual (fast component)
    pub phasic: f32,
}

impl TonicPhasicSplit {
    /// Reconstructed input value
    pub fn raw(&self) -> f32 {
        self.tonic + self.phasic
    }
}

/// One confirmed skin conductance response.
///
/// Immutable once emitted. Amplitude is the phasic value at the peak;
/// candidates whose rise above the onset level fails the detector's
/// minimum-amplitude or minimum-rise-time constraints are discarded and
/// never surface here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrEvent {
    /// Channel the response was detected on
    pub channel: ChannelId,
    /// Time the phasic signal crossed the onset threshold, seconds
    pub onset_time: f64,
    /// Time of the confirmed peak, seconds
    pub peak_time: f64,
    /// Phasic amplitude at the peak, µS
    pub amplitude: f32,
    /// Onset-to-peak duration, seconds
    pub rise_time: f64,
}

impl ScrEvent {
    pub fn new(channel: ChannelId, onset_time: f64, peak_time: f64, amplitude: f32) -> Self {
        Self {
            channel,
            onset_time,
            peak_time,
            amplitude,
            rise_time: peak_time - onset_time,
        }
    }
}

/// Scalar features aggregated over one window of processed samples.
///
/// Produced once per completed window and tagged with the window's source
/// timestamps so downstream consumers can align it with the raw stream.
/// The window itself is discarded after emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Unique identifier for this record
    pub id: Uuid,
    /// Source channel
    pub channel: ChannelId,
    /// Window start timestamp, seconds
    pub start_time: f64,
    /// Window end timestamp, seconds
    pub end_time: f64,
    /// True when the window was flushed before its full duration elapsed
    pub partial: bool,
    /// Feature name to value
    pub features: HashMap<String, f64>,
}

impl FeatureVector {
    pub fn new(
        channel: ChannelId,
        start_time: f64,
        end_time: f64,
        partial: bool,
        features: HashMap<String, f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            start_time,
            end_time,
            partial,
            features,
        }
    }

    /// Look up a feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    /// Window duration in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_reconstruction() {
        let split = TonicPhasicSplit { tonic: 2.0, phasic: 0.25 };
        assert!((split.raw() - 2.25).abs() < 1e-6);
    }

    #[test]
    fn test_scr_event_rise_time() {
        let event = ScrEvent::new(ChannelId(1), 10.0, 12.0, 0.8);
        assert!((event.rise_time - 2.0).abs() < 1e-9);
        assert!(event.amplitude > 0.0);
    }

    #[test]
    fn test_feature_vector_lookup() {
        let mut features = HashMap::new();
        features.insert("mean".to_string(), 1.5);

        let vector = FeatureVector::new(ChannelId(0), 0.0, 1.0, false, features);
        assert_eq!(vector.get("mean"), Some(1.5));
        assert_eq!(vector.get("rms"), None);
        assert!((vector.duration() - 1.0).abs() < 1e-9);
        assert!(!vector.partial);
    }
}
