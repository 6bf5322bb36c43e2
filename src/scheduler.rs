//! Scheduler - the cooperative work loop.
//!
//! The engine never blocks its host for more than one time slice. A slice
//! ([`Engine::run_slice`]) pulls work units one at a time and checks the
//! remaining budget between units; when it drops below
//! [`YIELD_THRESHOLD`] the slice returns and the walk resumes exactly where
//! it stopped on the next call. A single unit is never interrupted mid-way,
//! and once the unit queue drains the commit phase runs to completion no
//! matter what the deadline says.
//!
//! The core owns no suspension mechanism. A [`Deadline`] tells it how much
//! budget remains; where the next slice comes from (idle callback, timer,
//! task queue) is the [`SchedulerHost`]'s business, wired up by [`drive`] or
//! by calling `run_slice` directly.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::host::HostRenderer;

/// Remaining budget below which the work loop yields between units.
pub const YIELD_THRESHOLD: Duration = Duration::from_millis(1);

/// Remaining time in the current slice.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

/// Wall-clock deadline: a fixed budget from the moment of construction.
pub struct TimeBudget {
    end: Instant,
}

impl TimeBudget {
    pub fn new(budget: Duration) -> Self {
        Self {
            end: Instant::now() + budget,
        }
    }
}

impl Deadline for TimeBudget {
    fn time_remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }
}

/// What one slice accomplished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceOutcome {
    /// No pass in flight and nothing pending.
    Idle,
    /// Budget exhausted with units remaining; call again to resume.
    Yielded,
    /// The unit queue drained and the pass committed.
    Committed,
}

/// The external collaborator granting idle time.
///
/// [`drive`] re-requests a deadline after every slice, which makes the loop
/// self-perpetuating the way an idle-callback host re-arms itself.
pub trait SchedulerHost {
    /// Grant the budget for the next slice.
    fn idle_deadline(&mut self) -> Box<dyn Deadline>;

    /// Called after every slice with whether the engine went idle; return
    /// `false` to stop driving.
    fn should_continue(&mut self, idle: bool) -> bool;
}

/// Run the engine against a scheduler host until the host stops the loop or
/// an error abandons the pass.
pub fn drive<H: HostRenderer, S: SchedulerHost>(
    engine: &mut Engine<H>,
    host: &mut S,
) -> Result<(), EngineError> {
    loop {
        let deadline = host.idle_deadline();
        let outcome = engine.run_slice(deadline.as_ref())?;
        if !host.should_continue(outcome == SliceOutcome::Idle) {
            return Ok(());
        }
    }
}

impl<H: HostRenderer> Engine<H> {
    /// Run one time slice of the work loop.
    ///
    /// Starts the next pending pass if none is in flight, then processes
    /// work units until the tree or the budget is exhausted. When the tree
    /// is exhausted the commit phase runs immediately and uninterrupted.
    ///
    /// On error the in-flight pass is abandoned; the committed tree is
    /// unaffected unless the failure happened mid-commit (see
    /// [`crate::committer`]).
    pub fn run_slice(&mut self, deadline: &dyn Deadline) -> Result<SliceOutcome, EngineError> {
        if self.wip_root.is_none() {
            self.begin_next_pass();
        }
        let Some(pass_root) = self.wip_root else {
            return Ok(SliceOutcome::Idle);
        };

        while let Some(unit) = self.next_unit {
            match self.perform_unit(unit, pass_root) {
                Ok(next) => self.next_unit = next,
                Err(err) => {
                    self.abandon_pass();
                    return Err(err);
                }
            }
            if self.next_unit.is_some() && deadline.time_remaining() < YIELD_THRESHOLD {
                trace!("budget exhausted, yielding");
                return Ok(SliceOutcome::Yielded);
            }
        }

        if let Err(err) = self.commit_root(pass_root) {
            self.abandon_pass();
            return Err(err.into());
        }
        Ok(SliceOutcome::Committed)
    }

    /// Drive the engine with fresh `slice`-sized budgets until it reports
    /// [`SliceOutcome::Idle`]. Returns the number of working slices.
    ///
    /// Convenience driver for tests and synchronous embedders; production
    /// hosts should hand out their own deadlines via [`run_slice`] or
    /// [`drive`].
    pub fn run_until_idle(&mut self, slice: Duration) -> Result<u32, EngineError> {
        let mut slices = 0;
        loop {
            let budget = TimeBudget::new(slice);
            if self.run_slice(&budget)? == SliceOutcome::Idle {
                return Ok(slices);
            }
            slices += 1;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_budget_counts_down() {
        let budget = TimeBudget::new(Duration::from_secs(60));
        let remaining = budget.time_remaining();
        assert!(remaining > Duration::from_secs(59));
        assert!(remaining <= Duration::from_secs(60));

        let expired = TimeBudget::new(Duration::ZERO);
        assert_eq!(expired.time_remaining(), Duration::ZERO);
    }
}
