//! SCR peak detection over the phasic signal

use biosig_core::{ChannelId, ScrEvent};
use serde::{Deserialize, Serialize};

/// Detection thresholds.
///
/// These are experiment-tunable: onset and amplitude thresholds depend on
/// the electrode site and the participant's baseline noise level, so they
/// are configuration rather than constants. Defaults follow the lab's
/// working values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Phasic level that opens a candidate response, µS
    pub onset_threshold: f32,
    /// Minimum rise above the onset level for a peak to qualify, µS
    pub min_amplitude: f32,
    /// Minimum onset-to-peak duration, seconds (rejects noise spikes)
    pub min_rise_time: f64,
    /// Maximum time to search for a qualifying peak after onset, seconds
    pub search_horizon: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            onset_threshold: 0.05,
            min_amplitude: 0.01,
            min_rise_time: 0.5,
            search_horizon: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PrevSample {
    time: f64,
    value: f32,
    slope_up: bool,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    peak_time: f64,
    peak_value: f32,
}

#[derive(Debug, Clone, Copy)]
enum DetectorState {
    Idle,
    Rising {
        onset_time: f64,
        onset_level: f32,
        candidate: Option<Candidate>,
    },
}

/// State machine that turns a phasic stream into discrete [`ScrEvent`]s.
///
/// IDLE -> RISING when the phasic value crosses the onset threshold with a
/// positive derivative. RISING confirms a local maximum whose rise above
/// the onset level clears `min_amplitude` and whose onset-to-peak time
/// clears `min_rise_time`; the episode then emits exactly one event once
/// the signal falls back below the onset threshold or the search horizon
/// elapses. A RISING episode with no qualifying peak is discarded without
/// surfacing anything. When several qualifying maxima occur in one
/// episode, only the largest is reported, so emitted events never overlap.
///
/// SCRs are sparse (well under one per second), which is why the policy is
/// confirm-then-emit: a few seconds of emission latency costs nothing,
/// while a tentative event that later has to be retracted would poison
/// every downstream consumer.
#[derive(Debug)]
pub struct EventDetector {
    channel: ChannelId,
    config: DetectorConfig,
    state: DetectorState,
    prev: Option<PrevSample>,
}

impl EventDetector {
    pub fn new(channel: ChannelId, config: DetectorConfig) -> Self {
        Self {
            channel,
            config,
            state: DetectorState::Idle,
            prev: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Advance the state machine by one phasic sample.
    pub fn process(&mut self, timestamp: f64, phasic: f32) -> Option<ScrEvent> {
        let mut emitted = None;
        let prev = self.prev;

        match &mut self.state {
            DetectorState::Idle => {
                if let Some(p) = prev {
                    let crossed = p.value < self.config.onset_threshold
                        && phasic >= self.config.onset_threshold;
                    if crossed && phasic > p.value {
                        self.state = DetectorState::Rising {
                            onset_time: timestamp,
                            onset_level: phasic,
                            candidate: None,
                        };
                    }
                }
            }
            DetectorState::Rising { onset_time, onset_level, candidate } => {
                // a local maximum sits at the previous sample when the
                // slope flips from positive to non-positive
                if let Some(p) = prev {
                    if p.slope_up && phasic <= p.value {
                        let rise = p.time - *onset_time;
                        let height = p.value - *onset_level;
                        let qualifies = rise >= self.config.min_rise_time
                            && height >= self.config.min_amplitude;
                        if qualifies {
                            let better = match candidate {
                                Some(c) => p.value > c.peak_value,
                                None => true,
                            };
                            if better {
                                *candidate = Some(Candidate {
                                    peak_time: p.time,
                                    peak_value: p.value,
                                });
                            }
                        }
                    }
                }

                let horizon_elapsed =
                    timestamp - *onset_time >= self.config.search_horizon;
                let fell_below = phasic < self.config.onset_threshold;

                if horizon_elapsed || fell_below {
                    if let Some(c) = candidate {
                        emitted = Some(ScrEvent::new(
                            self.channel,
                            *onset_time,
                            c.peak_time,
                            c.peak_value,
                        ));
                    }
                    self.state = DetectorState::Idle;
                }
            }
        }

        let slope_up = match prev {
            Some(p) => {
                if phasic > p.value {
                    true
                } else if phasic < p.value {
                    false
                } else {
                    p.slope_up
                }
            }
            None => false,
        };
        self.prev = Some(PrevSample {
            time: timestamp,
            value: phasic,
            slope_up,
        });

        emitted
    }

    /// Return to IDLE and forget the previous sample.
    pub fn reset(&mut self) {
        self.state = DetectorState::Idle;
        self.prev = None;
    }
}
