/// Verdict Aggregator - Per-Fixture Outcomes to One Verdict
///
/// **Core Responsibility:**
/// Fold fixture outcomes, in order, into a single status and message.
///
/// **Critical Properties:**
/// - Knows nothing about interpreters or processes
/// - Starts optimistic (`accepted`) and halts at the first failure
/// - Never records more than one failed fixture
/// - A timeout overrides whatever fixture was in flight
///
/// **Transition Rules (first match wins, evaluated per fixture):**
/// 1. Decode error → runtime_error, halt
/// 2. Candidate raised → runtime_error, halt
/// 3. Value differs → wrong_answer, halt
/// 4. Value matches → passed, continue
/// 5. Deadline → time_limit, halt

use gabarito_common::types::{MSG_ACCEPTED, MSG_DATA_FORMAT};
use gabarito_common::{Fixture, FixtureResult, GradeStatus, Verdict};
use std::time::Duration;

use crate::comparator::values_equal;
use crate::error::GradeError;
use crate::invoker::Invocation;

/// Whether grading should move on to the next fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Halt,
}

#[derive(Debug)]
pub struct VerdictAggregator {
    status: GradeStatus,
    message: String,
    results: Vec<FixtureResult>,
    halted: bool,
    time_limit: Duration,
    keep_partial_results: bool,
}

impl VerdictAggregator {
    pub fn new(time_limit: Duration) -> Self {
        Self {
            status: GradeStatus::Accepted,
            message: MSG_ACCEPTED.to_string(),
            results: Vec::new(),
            halted: false,
            time_limit,
            keep_partial_results: true,
        }
    }

    /// Drop finished fixtures from a timed-out verdict
    pub fn discard_partial_results(mut self) -> Self {
        self.keep_partial_results = false;
        self
    }

    pub fn status(&self) -> GradeStatus {
        self.status
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Record the outcome of fixture number `test_number` (1-based)
    pub fn record(&mut self, test_number: u32, fixture: &Fixture, outcome: Invocation) -> Progress {
        debug_assert!(!self.halted, "fixture recorded after grading halted");
        if self.halted {
            return Progress::Halt;
        }

        let mut result = FixtureResult::pending(test_number, fixture);

        match outcome {
            Invocation::DecodeFailed(detail) => {
                result.error = Some(format!("Erro ao parsear JSON: {}", detail));
                self.fail(GradeStatus::RuntimeError, MSG_DATA_FORMAT.to_string());
            }
            Invocation::Raised(detail) => {
                self.fail(
                    GradeStatus::RuntimeError,
                    format!("Erro no teste {}: {}", test_number, detail),
                );
                result.error = Some(detail);
            }
            Invocation::Returned { actual, expected } => {
                result.passed = values_equal(&actual, &expected);
                result.actual = Some(actual);
                if !result.passed {
                    self.fail(GradeStatus::WrongAnswer, format!("Teste {} falhou", test_number));
                }
            }
            Invocation::DeadlineExceeded => {
                self.deadline_exceeded();
                return Progress::Halt;
            }
        }

        self.results.push(result);
        if self.halted {
            Progress::Halt
        } else {
            Progress::Continue
        }
    }

    /// The whole-call ceiling elapsed
    pub fn deadline_exceeded(&mut self) {
        let seconds = self.time_limit.as_secs_f64();
        self.fail(
            GradeStatus::TimeLimit,
            format!("Tempo limite de execução excedido ({} segundos)", seconds),
        );
        if !self.keep_partial_results {
            self.results.clear();
        }
    }

    /// Loading failed before any fixture ran
    pub fn load_failed(&mut self, error: &GradeError) {
        match error {
            GradeError::Compile(detail) => {
                self.fail(GradeStatus::RuntimeError, format!("Erro de sintaxe: {}", detail))
            }
            GradeError::EntryPointMissing(name) => self.fail(
                GradeStatus::RuntimeError,
                format!("Função \"{}\" não encontrada no código", name),
            ),
            GradeError::DeadlineExceeded(_) => self.deadline_exceeded(),
            other => self.fail(
                GradeStatus::RuntimeError,
                format!("Erro durante execução: {}", other),
            ),
        }
    }

    fn fail(&mut self, status: GradeStatus, message: String) {
        self.status = status;
        self.message = message;
        self.halted = true;
    }

    pub fn finish(self, elapsed: Duration) -> Verdict {
        Verdict {
            status: self.status,
            message: self.message,
            test_results: self.results,
            execution_time: round_millis(elapsed),
        }
    }
}

/// Seconds with three decimals
pub fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}
