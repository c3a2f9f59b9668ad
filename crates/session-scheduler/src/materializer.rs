//! Schedule materialization -- runs every session template through expansion,
//! detection and resolution, and collects the class-creation result.

use crate::config::SchedulerConfig;
use crate::detector::{ConflictCheck, ConflictDetector};
use crate::dst;
use crate::error::{Result, ScheduleError};
use crate::expander;
use crate::model::{
    Candidate, Materialization, ScheduledInstance, SchedulingConflict, Scope, SessionTemplate,
    TemplateError, TemplateErrorKind, TimeWindow,
};
use crate::resolver::{ConflictResolver, Resolution, TemplateContext};

/// Entry point of the engine: a conflict check plus engine configuration.
///
/// Holds no state between calls; the same templates and the same collaborator
/// answers always produce the same result.
#[derive(Debug, Clone)]
pub struct Scheduler<C> {
    detector: ConflictDetector<C>,
    config: SchedulerConfig,
}

impl<C: ConflictCheck> Scheduler<C> {
    pub fn new(check: C) -> Self {
        Self::with_config(check, SchedulerConfig::default())
    }

    pub fn with_config(check: C, config: SchedulerConfig) -> Self {
        Self {
            detector: ConflictDetector::new(check),
            config,
        }
    }

    /// Turn session templates into accepted instances and a conflict report.
    ///
    /// Templates are processed in order and independently: candidates are
    /// checked against the conflict check only, and a FAIL abort or a malformed
    /// rule affects its own template alone. With
    /// [`SchedulerConfig::hold_earlier_templates`] set, instances accepted for
    /// earlier templates also count as commitments for later ones.
    ///
    /// # Errors
    /// Returns `ScheduleError::CollaboratorUnavailable` if the conflict check
    /// fails at any point. Nothing is returned in that case, since no decision
    /// made without the check can be trusted.
    pub fn materialize(
        &self,
        templates: &[SessionTemplate],
        scope: &Scope,
    ) -> Result<Materialization> {
        let mut result = Materialization::default();
        let mut held: Vec<TimeWindow> = Vec::new();

        for (index, template) in templates.iter().enumerate() {
            match self.materialize_template(index, template, scope, &held) {
                Ok(TemplateRun {
                    instances,
                    conflicts,
                }) => {
                    tracing::info!(
                        template = index,
                        accepted = instances.len(),
                        conflicts = conflicts.len(),
                        "template materialized"
                    );
                    if self.config.hold_earlier_templates {
                        held.extend(instances.iter().map(ScheduledInstance::window));
                    }
                    result.instances.extend(instances);
                    result.conflicts.extend(conflicts);
                }
                Err(err) => {
                    let rejected = reject(index, err).inspect_err(|err| {
                        tracing::warn!(template = index, error = %err, "conflict check failed");
                    })?;
                    tracing::warn!(
                        template = index,
                        kind = ?rejected.kind,
                        message = %rejected.message,
                        "template rejected"
                    );
                    result.template_errors.push(rejected);
                }
            }
        }

        Ok(result)
    }

    fn materialize_template(
        &self,
        index: usize,
        template: &SessionTemplate,
        scope: &Scope,
        held: &[TimeWindow],
    ) -> Result<TemplateRun> {
        let tz = dst::parse_timezone(template.timezone.as_deref())?;
        let first = template.first_window()?;
        let candidates: Vec<Candidate> =
            expander::expand_in(first, template.recurrence.as_ref(), tz, &self.config)?.collect();
        let naive: Vec<TimeWindow> = candidates.iter().map(|c| c.window).collect();

        let resolver = ConflictResolver::new(&self.detector, &self.config, tz);
        let mut accepted: Vec<TimeWindow> = Vec::new();
        let mut run = TemplateRun::default();

        for (position, candidate) in candidates.iter().enumerate() {
            let reasons = self
                .detector
                .detect_against(&candidate.window, scope, held)?;
            let ctx = TemplateContext {
                template_index: index,
                strategy: template.conflict_resolution,
                held,
                accepted: &accepted,
                upcoming: &naive[position + 1..],
            };

            match resolver.resolve(candidate, reasons, scope, &ctx)? {
                Resolution::Accepted(instance) => {
                    accepted.push(instance.window());
                    run.instances.push(instance);
                }
                Resolution::Skipped(conflict) => {
                    tracing::debug!(
                        template = index,
                        sequence = conflict.sequence_number,
                        outcome = ?conflict.outcome,
                        "occurrence dropped"
                    );
                    run.conflicts.push(conflict);
                }
                Resolution::Aborted(conflict) => {
                    tracing::warn!(
                        template = index,
                        sequence = conflict.sequence_number,
                        discarded = run.instances.len(),
                        "scheduling aborted"
                    );
                    return Ok(TemplateRun {
                        instances: Vec::new(),
                        conflicts: vec![conflict],
                    });
                }
            }
        }

        Ok(run)
    }
}

/// Materialize with the default configuration.
pub fn materialize<C: ConflictCheck>(
    templates: &[SessionTemplate],
    scope: &Scope,
    check: C,
) -> Result<Materialization> {
    Scheduler::new(check).materialize(templates, scope)
}

#[derive(Debug, Default)]
struct TemplateRun {
    instances: Vec<ScheduledInstance>,
    conflicts: Vec<SchedulingConflict>,
}

/// Turn a per-template failure into a structured report; infrastructure
/// failures are handed back unchanged.
fn reject(index: usize, err: ScheduleError) -> Result<TemplateError> {
    let kind = match &err {
        ScheduleError::MalformedRecurrence(_) => TemplateErrorKind::MalformedRecurrence,
        ScheduleError::InvalidWindow(_) => TemplateErrorKind::InvalidWindow,
        ScheduleError::InvalidTimezone(_) => TemplateErrorKind::InvalidTimezone,
        ScheduleError::CollaboratorUnavailable(_)
        | ScheduleError::InvalidConfig(_)
        | ScheduleError::Export(_) => return Err(err),
    };
    Ok(TemplateError {
        template_index: index,
        kind,
        message: err.to_string(),
    })
}
