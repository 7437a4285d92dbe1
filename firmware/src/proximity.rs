//! Proximity edge detector.
//!
//! Turns the stream of bowl-distance samples into one `Present` event per
//! approach.  Feeding on the level (pet is near) would dispense on every
//! tick while the pet stands at the bowl; feeding on the `Far -> Near` edge
//! gives exactly one portion per visit.
//!
//! ```text
//!            sample < T  (emit Present)
//!   ┌─────┐ ───────────────────────────▶ ┌──────┐
//!   │ Far │                              │ Near │ ◀─┐ sample < T
//!   └─────┘ ◀─────────────────────────── └──────┘ ──┘
//!      ▲ │       sample >= T (re-arm)
//!      └─┘ sample >= T
//! ```

/// Whether something is in front of the ranger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProximityState {
    #[default]
    Far,
    Near,
}

/// Emitted on the `Far -> Near` transition only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityEdge {
    Present,
}

#[derive(Debug, Clone)]
pub struct EdgeDetector {
    state: ProximityState,
    threshold_cm: u32,
}

impl EdgeDetector {
    pub fn new(threshold_cm: u32) -> Self {
        Self {
            state: ProximityState::Far,
            threshold_cm,
        }
    }

    /// Feed one distance sample.  Returns `Some(Present)` only when the
    /// detector moves from `Far` to `Near`.
    pub fn feed(&mut self, distance_cm: u32) -> Option<ProximityEdge> {
        let near = distance_cm < self.threshold_cm;
        match (self.state, near) {
            (ProximityState::Far, true) => {
                self.state = ProximityState::Near;
                Some(ProximityEdge::Present)
            }
            (ProximityState::Near, false) => {
                self.state = ProximityState::Far;
                None
            }
            _ => None,
        }
    }

    pub fn state(&self) -> ProximityState {
        self.state
    }
}
