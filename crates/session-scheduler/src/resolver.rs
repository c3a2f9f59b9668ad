//! Conflict resolution -- applies a template's FAIL / SKIP / ROLLOVER policy to
//! a candidate that collided with an existing commitment.

use chrono_tz::Tz;

use crate::config::SchedulerConfig;
use crate::detector::{ConflictCheck, ConflictDetector};
use crate::error::Result;
use crate::expander;
use crate::model::{
    Candidate, ConflictOutcome, ConflictResolutionStrategy, ScheduledInstance, SchedulingConflict,
    Scope, TimeWindow,
};

/// Decision for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The candidate (possibly shifted) goes into the schedule.
    Accepted(ScheduledInstance),
    /// The candidate is dropped; the rest of the template continues.
    Skipped(SchedulingConflict),
    /// The whole template is discarded.
    Aborted(SchedulingConflict),
}

/// Applies a conflict-resolution strategy, probing the detector again for
/// ROLLOVER.
#[derive(Debug)]
pub struct ConflictResolver<'a, C> {
    detector: &'a ConflictDetector<C>,
    config: &'a SchedulerConfig,
    tz: Tz,
}

/// What the resolver needs to know about the template being resolved.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub template_index: usize,
    pub strategy: ConflictResolutionStrategy,
    /// Windows of earlier templates held as commitments; empty unless the
    /// engine is configured to hold them.
    pub held: &'a [TimeWindow],
    /// Windows this template has already accepted.
    pub accepted: &'a [TimeWindow],
    /// Naive windows of this template's candidates that have not been processed yet.
    pub upcoming: &'a [TimeWindow],
}

impl<'a, C: ConflictCheck> ConflictResolver<'a, C> {
    pub fn new(detector: &'a ConflictDetector<C>, config: &'a SchedulerConfig, tz: Tz) -> Self {
        Self {
            detector,
            config,
            tz,
        }
    }

    /// Resolve `candidate` given the `reasons` the detector reported for it.
    ///
    /// A candidate with no reasons is accepted as-is regardless of strategy.
    ///
    /// # Errors
    /// Returns `ScheduleError::CollaboratorUnavailable` if a ROLLOVER probe
    /// cannot be checked.
    pub fn resolve(
        &self,
        candidate: &Candidate,
        reasons: Vec<String>,
        scope: &Scope,
        ctx: &TemplateContext<'_>,
    ) -> Result<Resolution> {
        if reasons.is_empty() {
            return Ok(Resolution::Accepted(instance(
                ctx.template_index,
                candidate,
                candidate.window,
                0,
            )));
        }

        match ctx.strategy {
            ConflictResolutionStrategy::Fail => Ok(Resolution::Aborted(SchedulingConflict::new(
                ctx.template_index,
                candidate,
                reasons,
                ConflictOutcome::Aborted,
            ))),
            ConflictResolutionStrategy::Skip => Ok(Resolution::Skipped(SchedulingConflict::new(
                ctx.template_index,
                candidate,
                reasons,
                ConflictOutcome::Skipped,
            ))),
            ConflictResolutionStrategy::Rollover => self.roll_over(candidate, reasons, scope, ctx),
        }
    }

    fn roll_over(
        &self,
        candidate: &Candidate,
        reasons: Vec<String>,
        scope: &Scope,
        ctx: &TemplateContext<'_>,
    ) -> Result<Resolution> {
        for attempt in 1..=self.config.rollover_attempts {
            let days = attempt.saturating_mul(self.config.rollover_step_days);
            let Some(probe) =
                expander::shift_days(&candidate.window, days, self.tz, self.config.dst_policy)
            else {
                continue;
            };

            // Never roll onto another occurrence of the same series.
            if ctx
                .upcoming
                .iter()
                .chain(ctx.accepted)
                .any(|w| w.overlaps(&probe))
            {
                tracing::debug!(
                    sequence = candidate.sequence_number,
                    days,
                    "rollover probe collides with the series itself"
                );
                continue;
            }

            let probe_reasons = self.detector.detect_against(&probe, scope, ctx.held)?;
            if probe_reasons.is_empty() {
                tracing::debug!(
                    sequence = candidate.sequence_number,
                    days,
                    start = %probe.start,
                    "occurrence rolled over"
                );
                return Ok(Resolution::Accepted(instance(
                    ctx.template_index,
                    candidate,
                    probe,
                    days,
                )));
            }
        }

        Ok(Resolution::Skipped(SchedulingConflict::new(
            ctx.template_index,
            candidate,
            reasons,
            ConflictOutcome::RolloverExhausted,
        )))
    }
}

fn instance(
    template_index: usize,
    candidate: &Candidate,
    window: TimeWindow,
    rollover_days: u32,
) -> ScheduledInstance {
    ScheduledInstance {
        start_time: window.start,
        end_time: window.end,
        template_index,
        sequence_number: candidate.sequence_number,
        rollover_days,
    }
}
