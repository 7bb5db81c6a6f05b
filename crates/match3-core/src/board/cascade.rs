//! Chain-reaction resolution as a lazy sequence of board states.
//!
//! After a committed swap the board has holes where matched tiles were
//! cleared. Each call to [`Cascade::next`] performs one phase of the cycle
//!
//! ```text
//! Gravity -> Refill -> Resolve --(matches)--> Gravity ...
//!                          \--(none)--> done
//! ```
//!
//! and yields a snapshot of the board after that phase, so the protocol
//! layer can emit one diff per step instead of the engine talking to the
//! serial port. The cascade must be driven to completion; dropping it early
//! leaves empty cells on the board.

use super::engine::Engine;
use super::grid::Board;

/// Phase of the cascade cycle that produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePhase {
    /// Columns compacted toward the bottom.
    Gravity,
    /// Empty cells refilled with fresh colors.
    Refill,
    /// New matches found and cleared.
    Resolve,
}

/// One observable step of a cascade.
#[derive(Debug, Clone, Copy)]
pub struct CascadeStep {
    pub phase: CascadePhase,
    /// Board after this phase.
    pub board: Board,
    /// Cells cleared in this step (non-zero only for `Resolve`).
    pub removed: u32,
    /// Points awarded in this step.
    pub points: u32,
}

/// Totals for a finished cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    /// Gravity/refill/resolve cycles run.
    pub passes: u32,
    /// Cells cleared by chain reactions (excluding the initial swap).
    pub removed: u32,
    pub points: u32,
}

/// Iterator over cascade steps. See the module docs.
pub struct Cascade<'a> {
    engine: &'a mut Engine,
    next_phase: Option<CascadePhase>,
    summary: CascadeSummary,
}

impl<'a> Cascade<'a> {
    pub(crate) fn new(engine: &'a mut Engine) -> Self {
        Self {
            engine,
            next_phase: Some(CascadePhase::Gravity),
            summary: CascadeSummary::default(),
        }
    }

    /// Totals accumulated so far.
    pub fn summary(&self) -> CascadeSummary {
        self.summary
    }

    /// Drive the cascade to completion and return the totals.
    pub fn finish(mut self) -> CascadeSummary {
        for _ in self.by_ref() {}
        self.summary
    }
}

impl Iterator for Cascade<'_> {
    type Item = CascadeStep;

    fn next(&mut self) -> Option<CascadeStep> {
        let phase = self.next_phase?;
        let (removed, points) = match phase {
            CascadePhase::Gravity => {
                self.summary.passes += 1;
                self.engine.apply_gravity();
                self.next_phase = Some(CascadePhase::Refill);
                (0, 0)
            }
            CascadePhase::Refill => {
                self.engine.refill();
                self.next_phase = Some(CascadePhase::Resolve);
                (0, 0)
            }
            CascadePhase::Resolve => match self.engine.clear_matches() {
                Some((removed, points)) => {
                    self.summary.removed += removed;
                    self.summary.points += points;
                    self.next_phase = Some(CascadePhase::Gravity);
                    (removed, points)
                }
                None => {
                    self.next_phase = None;
                    return None;
                }
            },
        };

        Some(CascadeStep {
            phase,
            board: *self.engine.board(),
            removed,
            points,
        })
    }
}
