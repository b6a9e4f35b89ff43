//! Ping-pong scheduling for iterated separable filters.
//!
//! Filters that read and write the same logical image alternate between two
//! physical targets `A` and `B` so that no pass samples the texture it is
//! rendering into. The filter source is always written into `B` first.
//!
//! ```text
//! source ─► B
//! step 0:  B ─► A   (horizontal)
//! step 1:  A ─► B   (vertical)
//! step 2:  B ─► A   (horizontal)
//! ...
//! ```

/// One of the two physical targets of a ping-pong pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PingPongSlot {
    A,
    B,
}

impl PingPongSlot {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurStep {
    pub source: PingPongSlot,
    pub target: PingPongSlot,
    pub direction: BlurDirection,
}

/// Even steps write `A` reading `B`, odd steps write `B` reading `A`;
/// directions alternate starting with horizontal.
#[must_use]
pub fn ping_pong_schedule(iterations: u32) -> Vec<BlurStep> {
    (0..iterations)
        .map(|i| {
            if i % 2 == 0 {
                BlurStep {
                    source: PingPongSlot::B,
                    target: PingPongSlot::A,
                    direction: BlurDirection::Horizontal,
                }
            } else {
                BlurStep {
                    source: PingPongSlot::A,
                    target: PingPongSlot::B,
                    direction: BlurDirection::Vertical,
                }
            }
        })
        .collect()
}

/// Slot holding the filtered result after `iterations` steps.
#[must_use]
pub fn final_slot(iterations: u32) -> PingPongSlot {
    if iterations % 2 == 0 {
        PingPongSlot::B
    } else {
        PingPongSlot::A
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_step_reads_its_own_target() {
        for step in ping_pong_schedule(10) {
            assert_ne!(step.source, step.target);
        }
    }

    #[test]
    fn each_step_reads_the_previous_output() {
        let steps = ping_pong_schedule(7);
        for pair in steps.windows(2) {
            assert_eq!(pair[1].source, pair[0].target);
        }
        assert_eq!(steps[0].source, PingPongSlot::B);
        assert_eq!(final_slot(7), steps[6].target);
    }

    #[test]
    fn zero_iterations_leave_source_in_b() {
        assert!(ping_pong_schedule(0).is_empty());
        assert_eq!(final_slot(0), PingPongSlot::B);
    }
}
