//! Biosig-Stream: Async producer/consumer session and synthetic sources
//!
//! Runs the processing pipelines behind a bounded queue with a documented
//! drop-oldest backpressure policy, and provides seedable EMG/GSR signal
//! generators for tests and demos.

pub mod patterns;
pub mod session;
pub mod simulator;

pub use patterns::ActivationPattern;
pub use session::{SessionCommand, SessionConfig, SessionOutput, StreamSession};
pub use simulator::{EmgSimulator, EmgSimulatorConfig, GsrSimulator, GsrSimulatorConfig};
