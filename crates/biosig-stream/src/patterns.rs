//! Muscle activation patterns for synthetic EMG generation

use serde::{Deserialize, Serialize};

/// Time course of simulated muscle activation, 0.0 (rest) to 1.0 (maximum)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationPattern {
    /// Constant activation level
    Constant { level: f32 },
    /// On/off contraction cycles
    Burst {
        on_duration: f32,
        off_duration: f32,
        level: f32,
    },
    /// Linear ramp from one level to another
    Ramp {
        start_level: f32,
        end_level: f32,
        duration: f32,
    },
}

impl ActivationPattern {
    /// Activation level at `time` seconds from the pattern start
    pub fn activation_at(&self, time: f32) -> f32 {
        match self {
            ActivationPattern::Constant { level } => *level,

            ActivationPattern::Burst { on_duration, off_duration, level } => {
                let cycle = on_duration + off_duration;
                if time.rem_euclid(cycle) < *on_duration {
                    *level
                } else {
                    0.0
                }
            }

            ActivationPattern::Ramp { start_level, end_level, duration } => {
                if time >= *duration {
                    *end_level
                } else {
                    start_level + (end_level - start_level) * (time / duration)
                }
            }
        }
        .clamp(0.0, 1.0)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ActivationPattern::Constant { .. } => "Constant activation",
            ActivationPattern::Burst { .. } => "Contraction bursts",
            ActivationPattern::Ramp { .. } => "Gradual ramp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_pattern() {
        let pattern = ActivationPattern::Constant { level: 0.4 };
        assert_eq!(pattern.activation_at(0.0), 0.4);
        assert_eq!(pattern.activation_at(99.0), 0.4);
    }

    #[test]
    fn test_burst_pattern_cycles() {
        let pattern = ActivationPattern::Burst {
            on_duration: 2.0,
            off_duration: 1.0,
            level: 0.8,
        };
        assert_eq!(pattern.activation_at(0.5), 0.8);
        assert_eq!(pattern.activation_at(2.5), 0.0);
        assert_eq!(pattern.activation_at(3.5), 0.8);
    }

    #[test]
    fn test_ramp_pattern_saturates() {
        let pattern = ActivationPattern::Ramp {
            start_level: 0.1,
            end_level: 0.7,
            duration: 10.0,
        };
        assert!((pattern.activation_at(5.0) - 0.4).abs() < 1e-6);
        assert_eq!(pattern.activation_at(20.0), 0.7);
    }
}
