use std::time::{Duration, Instant};

use shared::domain::StepId;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    catalog::{Catalog, Question},
    flag_store::{CompletionFlag, KeyValueStore},
    matcher::is_accepted,
};

/// How long a wrong answer keeps the error flash raised.
pub const ERROR_FLASH_DURATION: Duration = Duration::from_millis(500);

/// Consecutive misses on one question before its hint is shown.
pub const HINT_AFTER_ERRORS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    /// Index into the catalog.
    Question(usize),
    Proposal,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { next: FlowStep },
    /// The answer matched nothing; the flow stays on the same question.
    InvalidAnswer { consecutive_errors: u32 },
    /// No question is active.
    Ignored,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("the proposal cannot be accepted before every question is answered")]
    QuestionsPending,
    #[error("completion flag store failed: {0}")]
    FlagStore(#[source] anyhow::Error),
}

/// Cosmetic error indicator that switches itself off after [`ERROR_FLASH_DURATION`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFlash {
    raised_at: Option<Instant>,
}

impl ErrorFlash {
    pub fn raise(&mut self, now: Instant) {
        self.raised_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.raised_at = None;
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.raised_at
            .is_some_and(|raised| now.saturating_duration_since(raised) < ERROR_FLASH_DURATION)
    }
}

/// Linear riddle flow: every catalog question in order, then the proposal,
/// then completion. There are no backward transitions.
pub struct Flow<S> {
    catalog: Catalog,
    step: FlowStep,
    consecutive_errors: u32,
    flash: ErrorFlash,
    flag: CompletionFlag<S>,
}

impl<S: KeyValueStore> Flow<S> {
    /// Starts at the first question, or directly at completion when the flag is already set.
    pub fn new(catalog: Catalog, store: S) -> Result<Self, FlowError> {
        let flag = CompletionFlag::new(store);
        let completed = flag.is_set().map_err(FlowError::FlagStore)?;
        let step = if completed {
            info!("completion flag already set; skipping questions");
            FlowStep::Completion
        } else {
            first_step(&catalog)
        };

        Ok(Self {
            catalog,
            step,
            consecutive_errors: 0,
            flash: ErrorFlash::default(),
            flag,
        })
    }

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn active_question(&self) -> Option<&Question> {
        match self.step {
            FlowStep::Question(index) => self.catalog.get(index),
            FlowStep::Proposal | FlowStep::Completion => None,
        }
    }

    pub fn current_step_id(&self) -> Option<&StepId> {
        self.active_question().map(|question| &question.id)
    }

    /// 1-based position of the active question.
    pub fn question_number(&self) -> Option<usize> {
        match self.step {
            FlowStep::Question(index) => Some(index + 1),
            FlowStep::Proposal | FlowStep::Completion => None,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        if self.consecutive_errors < HINT_AFTER_ERRORS {
            return None;
        }
        self.active_question().map(|question| question.hint.as_str())
    }

    pub fn is_error_flash_active(&self, now: Instant) -> bool {
        self.flash.is_active(now)
    }

    pub fn submit_answer(&mut self, text: &str) -> SubmitOutcome {
        self.submit_answer_at(text, Instant::now())
    }

    pub fn submit_answer_at(&mut self, text: &str, now: Instant) -> SubmitOutcome {
        let FlowStep::Question(index) = self.step else {
            return SubmitOutcome::Ignored;
        };
        let Some(question) = self.catalog.get(index) else {
            return SubmitOutcome::Ignored;
        };

        if !is_accepted(text, &question.accepted_answers) {
            self.consecutive_errors += 1;
            self.flash.raise(now);
            debug!(
                step = %question.id,
                consecutive_errors = self.consecutive_errors,
                "answer rejected"
            );
            return SubmitOutcome::InvalidAnswer {
                consecutive_errors: self.consecutive_errors,
            };
        }

        let next = if index + 1 < self.catalog.len() {
            FlowStep::Question(index + 1)
        } else {
            FlowStep::Proposal
        };
        debug!(step = %question.id, ?next, "answer accepted");
        self.consecutive_errors = 0;
        self.flash.clear();
        self.step = next;
        SubmitOutcome::Accepted { next }
    }

    /// Persists the completion flag and moves to completion.
    ///
    /// Calling it again once complete is a no-op. If persisting fails the
    /// flow stays on the proposal.
    pub fn accept_proposal(&mut self) -> Result<FlowStep, FlowError> {
        match self.step {
            FlowStep::Completion => Ok(FlowStep::Completion),
            FlowStep::Question(_) => Err(FlowError::QuestionsPending),
            FlowStep::Proposal => {
                self.flag.mark().map_err(|e| {
                    warn!(error = %e, "failed to persist completion flag");
                    FlowError::FlagStore(e)
                })?;
                self.step = FlowStep::Completion;
                Ok(FlowStep::Completion)
            }
        }
    }

    pub fn completion_flag(&self) -> &CompletionFlag<S> {
        &self.flag
    }
}

fn first_step(catalog: &Catalog) -> FlowStep {
    if catalog.is_empty() {
        FlowStep::Proposal
    } else {
        FlowStep::Question(0)
    }
}

#[cfg(test)]
#[path = "tests/flow_tests.rs"]
mod tests;
