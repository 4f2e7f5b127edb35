//! Biosig-Processing: Real-time signal processing pipeline
//!
//! Sample-by-sample filters, EMG envelope extraction, GSR tonic/phasic
//! decomposition, SCR event detection and windowed feature aggregation.

pub mod config;
pub mod decompose;
pub mod detector;
pub mod envelope;
pub mod filter;
pub mod pipeline;
pub mod window;

pub use config::{EmgConfig, GsrConfig, ImuConfig, NotchConfig, ProcessingConfig, WindowParams};
pub use decompose::{DecomposerConfig, TonicPhasicDecomposer};
pub use detector::{DetectorConfig, EventDetector};
pub use envelope::{EnvelopeConfig, EnvelopeExtractor};
pub use filter::{FilterCascade, FilterKind, FilterSpec, FilterStage, SampleStage};
pub use pipeline::{ChannelOutput, ChannelPipeline, GapWarning, SignalValue};
pub use window::{FeatureWindow, FrequencyBand, WindowConfig};
