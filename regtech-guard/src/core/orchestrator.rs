//! The phase state machine.
//!
//! ```text
//! Pending ──► Running(0) ──► PhasePassed(0) ──► Running(1) ──► ... ──► Completed
//!    │             │                 │
//!    ▼             ▼                 ▼
//! Aborted       Halted            Halted (cancelled)
//! ```
//!
//! The orchestrator owns no findings; it only decides which phase runs next
//! and when the run stops. Transitions that the engine should never request
//! are reported as [`GuardError::EngineFatal`].

use super::markers::FieldMarkers;
use super::{HaltReason, Phase, RunStatus, Schema};
use crate::config::HaltPolicy;
use crate::error::{GuardError, Result};
use tracing::{debug, warn};

/// Where a run currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Nothing has run yet
    Pending,
    /// The phase with this index is running
    Running(usize),
    /// The phase with this index finished and the run may continue
    PhasePassed(usize),
    /// Every phase ran
    Completed,
    /// The run stopped after a phase
    Halted {
        /// Index of the phase after which the run stopped
        phase: usize,
        /// Why the run stopped
        reason: HaltReason,
    },
    /// The schema was rejected before any phase ran
    Aborted(String),
}

impl RunState {
    /// Returns true for the three terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Halted { .. } | RunState::Aborted(_)
        )
    }
}

/// Drives a run through the phases of one schema.
#[derive(Debug)]
pub struct PhaseOrchestrator<'s> {
    schema: &'s Schema,
    policy: HaltPolicy,
    state: RunState,
    phases_run: Vec<String>,
}

impl<'s> PhaseOrchestrator<'s> {
    /// Creates an orchestrator in the `Pending` state.
    pub fn new(schema: &'s Schema, policy: HaltPolicy) -> Self {
        Self {
            schema,
            policy,
            state: RunState::Pending,
            phases_run: Vec::new(),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Names of the phases that fully ran.
    pub fn phases_run(&self) -> &[String] {
        &self.phases_run
    }

    /// The phase that would run next, or `None` once no phase is left.
    pub fn next_phase(&self) -> Option<usize> {
        let next = match self.state {
            RunState::Pending => 0,
            RunState::PhasePassed(i) => i + 1,
            _ => return None,
        };
        (next < self.schema.phases().len()).then_some(next)
    }

    /// `Pending → Running(0)` or `PhasePassed(i) → Running(i + 1)`.
    pub fn begin_phase(&mut self) -> Result<&'s Phase> {
        let next = self.next_phase().ok_or_else(|| {
            GuardError::fatal(format!("cannot start a phase from state {:?}", self.state))
        })?;
        let phase = &self.schema.phases()[next];
        debug!(phase.name = %phase.name(), phase.index = next, "Starting phase");
        self.state = RunState::Running(next);
        Ok(phase)
    }

    /// Closes the running phase and evaluates the halt condition.
    ///
    /// The halt condition is only checked after structural phases that are
    /// followed by another phase: for every non-nullable field, the fraction
    /// of records on which it is unusable is compared with the policy
    /// threshold.
    pub(crate) fn finish_phase(&mut self, markers: &FieldMarkers, records: usize) -> Result<()> {
        let RunState::Running(current) = self.state else {
            return Err(GuardError::fatal(format!(
                "cannot finish a phase from state {:?}",
                self.state
            )));
        };
        let phase = &self.schema.phases()[current];
        self.phases_run.push(phase.name().to_string());

        let is_last = current + 1 == self.schema.phases().len();
        if is_last {
            self.state = RunState::Completed;
            return Ok(());
        }

        if phase.is_structural() {
            for (index, field) in self.schema.required_fields() {
                let unusable = markers.unusable_count(index);
                if self.policy.should_halt(unusable, records) {
                    warn!(
                        phase.name = %phase.name(),
                        field.name = %field.name(),
                        unusable,
                        records,
                        "Halting: required field unusable"
                    );
                    self.state = RunState::Halted {
                        phase: current,
                        reason: HaltReason::RequiredFieldUnusable {
                            field: field.name().to_string(),
                            unusable,
                            total: records,
                        },
                    };
                    return Ok(());
                }
            }
        }

        self.state = RunState::PhasePassed(current);
        Ok(())
    }

    /// Stops the run at a phase boundary.
    pub fn cancel(&mut self) -> Result<()> {
        let phase = match self.state {
            RunState::Pending => 0,
            RunState::PhasePassed(i) => i,
            _ => {
                return Err(GuardError::fatal(format!(
                    "cannot cancel from state {:?}",
                    self.state
                )))
            }
        };
        warn!(phase.index = phase, "Run cancelled");
        self.state = RunState::Halted {
            phase,
            reason: HaltReason::Cancelled,
        };
        Ok(())
    }

    /// `Pending → Aborted`.
    pub fn abort(&mut self, reason: impl Into<String>) -> Result<()> {
        if self.state != RunState::Pending {
            return Err(GuardError::fatal(format!(
                "cannot abort from state {:?}",
                self.state
            )));
        }
        self.state = RunState::Aborted(reason.into());
        Ok(())
    }

    /// The terminal status of the run.
    pub fn status(&self) -> Result<RunStatus> {
        match &self.state {
            RunState::Completed => Ok(RunStatus::Completed),
            RunState::Halted { phase, reason } => Ok(RunStatus::Halted {
                phase: self.schema.phases()[*phase].name().to_string(),
                reason: reason.clone(),
            }),
            RunState::Aborted(reason) => Ok(RunStatus::Aborted {
                reason: reason.clone(),
            }),
            other => Err(GuardError::fatal(format!(
                "run has not reached a terminal state: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldDefinition, FieldType, RecordId};

    fn schema(phases: Vec<Phase>) -> Schema {
        Schema::build(
            "s",
            vec![
                FieldDefinition::new("uid", FieldType::String).required(),
                FieldDefinition::new("note", FieldType::String),
            ],
            phases,
        )
        .unwrap()
    }

    #[test]
    fn test_runs_every_phase_to_completion() {
        let schema = schema(Phase::standard());
        let markers = FieldMarkers::new(2);
        let mut orch = PhaseOrchestrator::new(&schema, HaltPolicy::default());

        assert_eq!(orch.begin_phase().unwrap().name(), "syntactical");
        orch.finish_phase(&markers, 3).unwrap();
        assert_eq!(orch.state(), &RunState::PhasePassed(0));
        assert_eq!(orch.begin_phase().unwrap().name(), "logical");
        orch.finish_phase(&markers, 3).unwrap();

        assert_eq!(orch.state(), &RunState::Completed);
        assert_eq!(orch.status().unwrap(), RunStatus::Completed);
        assert_eq!(orch.phases_run(), ["syntactical", "logical"]);
        assert!(orch.next_phase().is_none());
    }

    #[test]
    fn test_halts_when_required_field_unusable_everywhere() {
        let schema = schema(Phase::standard());
        let mut markers = FieldMarkers::new(2);
        for i in 0..2 {
            markers.mark(RecordId::from_index(i), 0);
        }
        let mut orch = PhaseOrchestrator::new(&schema, HaltPolicy::default());
        orch.begin_phase().unwrap();
        orch.finish_phase(&markers, 2).unwrap();

        match orch.status().unwrap() {
            RunStatus::Halted { phase, reason } => {
                assert_eq!(phase, "syntactical");
                assert_eq!(
                    reason,
                    HaltReason::RequiredFieldUnusable {
                        field: "uid".to_string(),
                        unusable: 2,
                        total: 2
                    }
                );
            }
            other => panic!("expected halt, got {other:?}"),
        }
        assert!(orch.next_phase().is_none());
    }

    #[test]
    fn test_nullable_fields_never_halt() {
        let schema = schema(Phase::standard());
        let mut markers = FieldMarkers::new(2);
        markers.mark(RecordId::from_index(0), 1);
        let mut orch = PhaseOrchestrator::new(&schema, HaltPolicy::default());
        orch.begin_phase().unwrap();
        orch.finish_phase(&markers, 1).unwrap();
        assert_eq!(orch.state(), &RunState::PhasePassed(0));
    }

    #[test]
    fn test_invalid_transitions_are_fatal() {
        let schema = schema(vec![Phase::structural("only")]);
        let markers = FieldMarkers::new(2);
        let mut orch = PhaseOrchestrator::new(&schema, HaltPolicy::default());

        assert!(matches!(
            orch.finish_phase(&markers, 0),
            Err(GuardError::EngineFatal(_))
        ));
        assert!(orch.status().is_err());

        orch.begin_phase().unwrap();
        orch.finish_phase(&markers, 0).unwrap();
        assert!(matches!(orch.begin_phase(), Err(GuardError::EngineFatal(_))));
        assert!(matches!(orch.abort("late"), Err(GuardError::EngineFatal(_))));
        assert!(matches!(orch.cancel(), Err(GuardError::EngineFatal(_))));
    }

    #[test]
    fn test_cancel_and_abort() {
        let schema = schema(Phase::standard());
        let mut orch = PhaseOrchestrator::new(&schema, HaltPolicy::default());
        orch.cancel().unwrap();
        assert!(matches!(
            orch.status().unwrap(),
            RunStatus::Halted {
                reason: HaltReason::Cancelled,
                ..
            }
        ));

        let mut orch = PhaseOrchestrator::new(&schema, HaltPolicy::default());
        orch.abort("bad schema").unwrap();
        assert!(orch.state().is_terminal());
        assert_eq!(
            orch.status().unwrap(),
            RunStatus::Aborted {
                reason: "bad schema".to_string()
            }
        );
    }
}
