//! Fixed-capacity ring buffer of timestamped samples for one channel

use crate::error::{SignalError, SignalResult};
use crate::sample::{ChannelId, Sample};
use std::collections::VecDeque;

/// Circular store of the most recent samples for one channel.
///
/// `push` is O(1) amortized; when the buffer is full the oldest sample is
/// evicted before the new one is stored. Timestamps must be strictly
/// increasing: a sample at or before the latest retained timestamp is
/// rejected with [`SignalError::SequenceError`] and the buffer is left
/// untouched. Callers treat that as a signal-quality artifact, not a fatal
/// error.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    channel: ChannelId,
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl RingBuffer {
    /// Create a buffer holding up to `capacity` samples for `channel`.
    pub fn new(channel: ChannelId, capacity: usize) -> SignalResult<Self> {
        if capacity == 0 {
            return Err(SignalError::ConfigurationError {
                message: "ring buffer capacity must be at least 1".to_string(),
            });
        }
        Ok(Self {
            channel,
            capacity,
            samples: VecDeque::with_capacity(capacity),
        })
    }

    /// Append one sample, evicting the oldest when full.
    pub fn push(&mut self, sample: Sample) -> SignalResult<()> {
        if sample.channel != self.channel {
            return Err(SignalError::UnknownChannel {
                channel: sample.channel,
            });
        }

        if let Some(latest) = self.latest_timestamp() {
            if sample.timestamp <= latest {
                return Err(SignalError::SequenceError {
                    channel: self.channel,
                    timestamp: sample.timestamp,
                    latest,
                });
            }
        }

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        Ok(())
    }

    /// The `n` most recent samples, oldest first, without removing them.
    ///
    /// The returned iterator is lazy and can be re-created at any time;
    /// fewer than `n` samples are yielded when the buffer holds fewer.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &Sample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip)
    }

    /// Timestamp of the most recent retained sample
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.samples.back().map(|s| s.timestamp)
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop all retained samples (used when a stream restarts after a gap).
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
