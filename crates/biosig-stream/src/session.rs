//! Producer/bounded-queue/consumer streaming session

use biosig_core::{ChannelConfig, ChannelId, FeatureVector, Sample, SignalError, SignalResult};
use biosig_processing::{ChannelOutput, ChannelPipeline, ProcessingConfig};
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Session-level configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Channels the session will process; one pipeline per channel
    pub channels: Vec<ChannelConfig>,
    /// Processing parameters shared by all channels of a kind
    pub processing: ProcessingConfig,
    /// Bounded sample queue capacity, in samples
    pub queue_capacity: usize,
}

impl SessionConfig {
    pub fn new(channels: Vec<ChannelConfig>) -> Self {
        Self {
            channels,
            processing: ProcessingConfig::default(),
            queue_capacity: 4096,
        }
    }
}

/// Commands accepted by a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Stop once already-queued samples have drained, flushing in-progress
    /// windows; never interrupts a sample mid-processing
    Stop,
}

/// Everything the session emits toward its consumer
#[derive(Debug, Clone)]
pub enum SessionOutput {
    /// One sample's processed value, with any event/feature/gap it produced
    Processed(ChannelOutput),
    /// Partial window flushed at the stop boundary
    Flushed(FeatureVector),
    /// Oldest unconsumed samples were dropped because the producer outran
    /// the consumer (hard real-time coupling: the queue never grows
    /// unboundedly and never blocks the producer)
    SamplesDropped { count: u64 },
    /// A sample was rejected as a signal-quality artifact and dropped
    SampleRejected { channel: ChannelId, timestamp: f64 },
}

/// Asynchronous processing session.
///
/// A single producer feeds samples through a bounded broadcast queue; one
/// dedicated consumer task owns every channel's pipeline state and drains
/// the queue, blocking only on queue-empty, never on I/O. When the
/// producer outruns the consumer, the queue drops its oldest unconsumed
/// samples and the consumer reports how many were lost. A stop command
/// propagates at the next sample boundary, after queued samples drain;
/// in-flight windows are flushed as partial rather than discarded, so no
/// data is silently lost mid-window.
pub struct StreamSession {
    id: Uuid,
    sample_tx: broadcast::Sender<Sample>,
    command_tx: mpsc::Sender<SessionCommand>,
    output_rx: mpsc::UnboundedReceiver<SessionOutput>,
}

impl StreamSession {
    /// Validate the configuration, build one pipeline per channel and
    /// spawn the consumer task. All configuration errors surface here,
    /// before any streaming starts.
    pub fn spawn(config: SessionConfig) -> SignalResult<Self> {
        if config.queue_capacity == 0 {
            return Err(SignalError::ConfigurationError {
                message: "queue capacity must be at least 1".to_string(),
            });
        }
        if config.channels.is_empty() {
            return Err(SignalError::ConfigurationError {
                message: "session needs at least one channel".to_string(),
            });
        }

        let mut pipelines: HashMap<ChannelId, ChannelPipeline> = HashMap::new();
        for channel in &config.channels {
            if pipelines.contains_key(&channel.id) {
                return Err(SignalError::ConfigurationError {
                    message: format!("duplicate channel id {}", channel.id),
                });
            }
            pipelines.insert(channel.id, ChannelPipeline::new(*channel, &config.processing)?);
        }

        let (sample_tx, sample_rx) = broadcast::channel(config.queue_capacity);
        let (command_tx, command_rx) = mpsc::channel(8);
        let (output_tx, output_rx) = mpsc::unbounded_channel();

        let id = Uuid::new_v4();
        tokio::spawn(consumer_loop(id, pipelines, sample_rx, command_rx, output_tx));

        Ok(Self {
            id,
            sample_tx,
            command_tx,
            output_rx,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handle for the producer to deliver samples on
    pub fn sample_sender(&self) -> broadcast::Sender<Sample> {
        self.sample_tx.clone()
    }

    /// Handle for sending control commands
    pub fn command_handle(&self) -> mpsc::Sender<SessionCommand> {
        self.command_tx.clone()
    }

    /// Request a stop; honored at the next sample boundary.
    pub async fn stop(&self) {
        let _ = self.command_tx.send(SessionCommand::Stop).await;
    }

    /// Next output record; `None` once the session has stopped and every
    /// buffered output has been drained.
    pub async fn next_output(&mut self) -> Option<SessionOutput> {
        self.output_rx.recv().await
    }
}

async fn consumer_loop(
    id: Uuid,
    mut pipelines: HashMap<ChannelId, ChannelPipeline>,
    mut sample_rx: broadcast::Receiver<Sample>,
    mut command_rx: mpsc::Receiver<SessionCommand>,
    output_tx: mpsc::UnboundedSender<SessionOutput>,
) {
    debug!(session = %id, channels = pipelines.len(), "stream session started");

    loop {
        // queued samples drain before a stop command is honored, so a stop
        // never discards data already delivered by the producer
        tokio::select! {
            biased;
            received = sample_rx.recv() => {
                match received {
                    Ok(sample) => {
                        handle_sample(&mut pipelines, sample, &output_tx);
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(
                            session = %id,
                            count,
                            "consumer lagged; oldest unconsumed samples dropped"
                        );
                        let _ = output_tx.send(SessionOutput::SamplesDropped { count });
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            command = command_rx.recv() => {
                match command {
                    Some(SessionCommand::Stop) | None => break,
                }
            }
        }
    }

    // stop boundary: flush in-flight windows instead of discarding them
    for pipeline in pipelines.values_mut() {
        if let Some(vector) = pipeline.flush() {
            let _ = output_tx.send(SessionOutput::Flushed(vector));
        }
    }
    debug!(session = %id, "stream session stopped");
}

fn handle_sample(
    pipelines: &mut HashMap<ChannelId, ChannelPipeline>,
    sample: Sample,
    output_tx: &mpsc::UnboundedSender<SessionOutput>,
) {
    let Some(pipeline) = pipelines.get_mut(&sample.channel) else {
        warn!(channel = %sample.channel, "sample for unregistered channel dropped");
        let _ = output_tx.send(SessionOutput::SampleRejected {
            channel: sample.channel,
            timestamp: sample.timestamp,
        });
        return;
    };

    match pipeline.process(sample) {
        Ok(output) => {
            let _ = output_tx.send(SessionOutput::Processed(output));
        }
        // recovered locally: the sample is dropped, the stream continues
        Err(SignalError::SequenceError { channel, timestamp, latest }) => {
            warn!(
                channel = %channel,
                timestamp, latest,
                "out-of-order sample dropped"
            );
            let _ = output_tx.send(SessionOutput::SampleRejected { channel, timestamp });
        }
        Err(error) => {
            warn!(channel = %sample.channel, %error, "sample processing failed");
            let _ = output_tx.send(SessionOutput::SampleRejected {
                channel: sample.channel,
                timestamp: sample.timestamp,
            });
        }
    }
}
