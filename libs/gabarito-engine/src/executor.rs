/// Grader - High-Level Orchestration
///
/// **Responsibility:**
/// Coordinate runtime, invoker, comparator and aggregator into one verdict.
///
/// **Architecture:**
/// 1. Load the candidate through a `CandidateRuntime` (runtime.rs / python.rs)
/// 2. Feed fixtures in order through the `Invoker` (invoker.rs)
/// 3. Fold outcomes with the `VerdictAggregator` (evaluator.rs)
///
/// One deadline covers loading and every fixture. Each call owns its worker
/// and its deadline; graders can be shared across concurrent calls.

use gabarito_common::{CandidateProgram, Fixture, GraderConfig, Verdict};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::error::{EngineError, GradeError};
use crate::evaluator::{Progress, VerdictAggregator};
use crate::invoker::{Invocation, Invoker};
use crate::python::PythonRuntime;
use crate::runtime::CandidateRuntime;

#[derive(Debug, Clone)]
pub struct Grader<R = PythonRuntime> {
    runtime: R,
    time_limit: Duration,
    keep_partial_results: bool,
}

impl Grader<PythonRuntime> {
    /// Production grader hosting candidates in Python workers
    pub fn from_config(config: &GraderConfig) -> Self {
        let runtime = PythonRuntime::new(config.python_command.clone())
            .with_max_error_chars(config.max_error_chars);
        Self::new(runtime, config)
    }
}

impl<R: CandidateRuntime> Grader<R> {
    pub fn new(runtime: R, config: &GraderConfig) -> Self {
        Self {
            runtime,
            time_limit: config.time_limit(),
            keep_partial_results: config.keep_partial_results,
        }
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Grade under the configured time limit
    pub async fn grade(
        &self,
        program: &CandidateProgram,
        fixtures: &[Fixture],
    ) -> Result<Verdict, EngineError> {
        self.grade_within(program, fixtures, self.time_limit).await
    }

    /// Grade `program` against `fixtures`, stopping at the first failure
    ///
    /// Every candidate-caused failure is folded into the verdict; `Err` means
    /// the host could not run the candidate at all.
    #[instrument(skip_all, fields(entry_point = %program.entry_point, fixtures = fixtures.len(), time_limit_ms = time_limit.as_millis() as u64))]
    pub async fn grade_within(
        &self,
        program: &CandidateProgram,
        fixtures: &[Fixture],
        time_limit: Duration,
    ) -> Result<Verdict, EngineError> {
        let started = Instant::now();
        let deadline = started + time_limit;

        let mut aggregator = VerdictAggregator::new(time_limit);
        if !self.keep_partial_results {
            aggregator = aggregator.discard_partial_results();
        }

        let handle = match timeout_at(deadline, self.runtime.load(program)).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(GradeError::Engine(e))) => {
                warn!(error = %e, "Worker could not be started");
                return Err(e);
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Candidate failed to load");
                aggregator.load_failed(&e);
                return Ok(self.conclude(aggregator, started));
            }
            Err(_) => {
                warn!("Deadline exceeded while loading candidate");
                aggregator.load_failed(&GradeError::DeadlineExceeded(time_limit));
                return Ok(self.conclude(aggregator, started));
            }
        };

        let mut invoker = Invoker::new(handle, deadline);

        for (idx, fixture) in fixtures.iter().enumerate() {
            let test_number = idx as u32 + 1;
            let outcome = invoker.run(fixture).await?;

            if let Invocation::Returned { .. } = &outcome {
                debug!(test_number, "Fixture returned");
            }

            if aggregator.record(test_number, fixture, outcome) == Progress::Halt {
                break;
            }
        }

        invoker.finish().await;
        Ok(self.conclude(aggregator, started))
    }

    fn conclude(&self, aggregator: VerdictAggregator, started: Instant) -> Verdict {
        let verdict = aggregator.finish(started.elapsed());
        info!(
            status = %verdict.status,
            fixtures_run = verdict.test_results.len(),
            execution_time = verdict.execution_time,
            "Grading completed"
        );
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{CallArgs, CandidateHandle};
    use gabarito_common::GradeStatus;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Candidate behaviors the scripted runtime can play
    #[derive(Clone, Copy)]
    enum Script {
        /// Sums positional args, multiplies named args
        Arithmetic,
        /// Subtracts instead of adding
        Subtract,
        Divide,
        SleepOnLoad,
        /// Sleeps once the running total exceeds 10
        SleepAfterTen,
        SyntaxError,
        MissingEntryPoint,
        BrokenHost,
    }

    #[derive(Clone)]
    struct ScriptedRuntime {
        script: Script,
        calls: Arc<AtomicUsize>,
    }

    struct ScriptedHandle {
        script: Script,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedRuntime {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CandidateRuntime for ScriptedRuntime {
        type Handle = ScriptedHandle;

        async fn load(&self, program: &CandidateProgram) -> Result<ScriptedHandle, GradeError> {
            match self.script {
                Script::SyntaxError => Err(GradeError::Compile("invalid syntax".into())),
                Script::MissingEntryPoint => {
                    Err(GradeError::EntryPointMissing(program.entry_point.clone()))
                }
                Script::BrokenHost => Err(EngineError::Pipe("stdin").into()),
                Script::SleepOnLoad => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    unreachable!()
                }
                script => Ok(ScriptedHandle {
                    script,
                    calls: self.calls.clone(),
                }),
            }
        }
    }

    impl CandidateHandle for ScriptedHandle {
        async fn invoke(&mut self, args: &CallArgs) -> Result<Value, GradeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let nums: Vec<i64> = match args {
                CallArgs::Args(items) => items.iter().filter_map(Value::as_i64).collect(),
                CallArgs::Kwargs(pairs) => pairs.values().filter_map(Value::as_i64).collect(),
            };
            match (self.script, args) {
                (Script::Divide, _) => {
                    Err(GradeError::Invocation("ZeroDivisionError: division by zero".into()))
                }
                (Script::Subtract, _) => Ok(json!(nums.iter().skip(1).fold(nums[0], |a, b| a - b))),
                (Script::SleepAfterTen, _) if nums.iter().sum::<i64>() > 10 => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    unreachable!()
                }
                (_, CallArgs::Kwargs(_)) => Ok(json!(nums.iter().product::<i64>())),
                _ => Ok(json!(nums.iter().sum::<i64>())),
            }
        }

        async fn terminate(self) {}
    }

    fn grader(script: Script, time_limit_ms: u64) -> Grader<ScriptedRuntime> {
        let config = GraderConfig {
            time_limit_ms,
            ..GraderConfig::default()
        };
        Grader::new(ScriptedRuntime::new(script), &config)
    }

    fn program() -> CandidateProgram {
        CandidateProgram::new("def solution(a, b):\n    return a + b", "solution")
    }

    fn fixtures(pairs: &[(&str, &str)]) -> Vec<Fixture> {
        pairs.iter().map(|(i, e)| Fixture::new(*i, *e)).collect()
    }

    #[tokio::test]
    async fn test_accepts_in_order() {
        let verdict = grader(Script::Arithmetic, 5000)
            .grade(&program(), &fixtures(&[("[2, 3]", "5"), ("[10, 20]", "30"), (r#"{"a": 3, "b": 4}"#, "12")]))
            .await
            .unwrap();

        assert_eq!(verdict.status, GradeStatus::Accepted);
        let numbers: Vec<u32> = verdict.test_results.iter().map(|r| r.test_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(verdict.test_results.iter().all(|r| r.passed));
        assert!(verdict.execution_time >= 0.0);
    }

    #[tokio::test]
    async fn test_stops_at_first_wrong_answer() {
        let g = grader(Script::Subtract, 5000);
        let verdict = g
            .grade(&program(), &fixtures(&[("[5, 0]", "5"), ("[2, 3]", "5"), ("[10, 20]", "30")]))
            .await
            .unwrap();

        assert_eq!(verdict.status, GradeStatus::WrongAnswer);
        assert_eq!(verdict.message, "Teste 2 falhou");
        assert_eq!(verdict.test_results.len(), 2);
        assert!(verdict.test_results[0].passed);
        assert!(!verdict.test_results[1].passed);
        assert_eq!(g.runtime.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_runtime_error_on_first_fixture() {
        let verdict = grader(Script::Divide, 5000)
            .grade(&program(), &fixtures(&[("[2, 3]", "5"), ("[1, 1]", "2")]))
            .await
            .unwrap();

        assert_eq!(verdict.status, GradeStatus::RuntimeError);
        assert_eq!(verdict.test_results.len(), 1);
        assert!(!verdict.test_results[0].passed);
        assert!(verdict.test_results[0].error.is_some());
        assert!(verdict.message.starts_with("Erro no teste 1"));
    }

    #[tokio::test]
    async fn test_missing_entry_point_runs_nothing() {
        let g = grader(Script::MissingEntryPoint, 5000);
        let verdict = g.grade(&program(), &fixtures(&[("[2, 3]", "5")])).await.unwrap();

        assert_eq!(verdict.status, GradeStatus::RuntimeError);
        assert!(verdict.message.contains("não encontrada"));
        assert!(verdict.test_results.is_empty());
        assert_eq!(g.runtime.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_syntax_error() {
        let verdict = grader(Script::SyntaxError, 5000)
            .grade(&program(), &fixtures(&[("[2, 3]", "5")]))
            .await
            .unwrap();
        assert_eq!(verdict.status, GradeStatus::RuntimeError);
        assert!(verdict.message.to_lowercase().contains("sintaxe"));
    }

    #[tokio::test]
    async fn test_malformed_fixture_is_data_format_error() {
        let verdict = grader(Script::Arithmetic, 5000)
            .grade(&program(), &fixtures(&[("[1, 1]", "2"), ("invalid json", "5"), ("[1, 2]", "3")]))
            .await
            .unwrap();
        assert_eq!(verdict.status, GradeStatus::RuntimeError);
        assert!(verdict.message.contains("formato dos dados"));
        assert_eq!(verdict.test_results.len(), 2);
    }

    #[tokio::test]
    async fn test_time_limit_during_fixture() {
        let verdict = grader(Script::SleepAfterTen, 100)
            .grade(&program(), &fixtures(&[("[1, 2]", "3"), ("[10, 20]", "30"), ("[1, 1]", "2")]))
            .await
            .unwrap();

        assert_eq!(verdict.status, GradeStatus::TimeLimit);
        assert!(verdict.message.contains("0.1 segundos"));
        assert_eq!(verdict.test_results.len(), 1);
        assert!(verdict.test_results[0].passed);
    }

    #[tokio::test]
    async fn test_time_limit_discarding_partial_results() {
        let config = GraderConfig {
            time_limit_ms: 100,
            keep_partial_results: false,
            ..GraderConfig::default()
        };
        let verdict = Grader::new(ScriptedRuntime::new(Script::SleepAfterTen), &config)
            .grade(&program(), &fixtures(&[("[1, 2]", "3"), ("[10, 20]", "30")]))
            .await
            .unwrap();
        assert_eq!(verdict.status, GradeStatus::TimeLimit);
        assert!(verdict.test_results.is_empty());
    }

    #[tokio::test]
    async fn test_time_limit_while_loading() {
        let verdict = grader(Script::SleepOnLoad, 5000)
            .grade_within(&program(), &fixtures(&[("[1, 2]", "3")]), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(verdict.status, GradeStatus::TimeLimit);
        assert!(verdict.test_results.is_empty());
    }

    #[tokio::test]
    async fn test_host_fault_is_returned_to_caller() {
        let result = grader(Script::BrokenHost, 5000)
            .grade(&program(), &fixtures(&[("[1, 2]", "3")]))
            .await;
        assert!(matches!(result, Err(EngineError::Pipe("stdin"))));
    }

    #[tokio::test]
    async fn test_grading_is_idempotent() {
        let g = grader(Script::Subtract, 5000);
        let cases = fixtures(&[("[5, 2]", "3"), ("[2, 3]", "5")]);
        let mut first = g.grade(&program(), &cases).await.unwrap();
        let mut second = g.grade(&program(), &cases).await.unwrap();
        assert!(first.execution_time >= 0.0 && second.execution_time >= 0.0);
        first.execution_time = 0.0;
        second.execution_time = 0.0;
        assert_eq!(first, second);
    }
}
