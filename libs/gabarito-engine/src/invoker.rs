/// Invoker - Fixture Decoding and Deadline-Bound Calls
///
/// **Core Responsibility:**
/// Decode one fixture, call the loaded candidate with it and capture the
/// return value, without ever letting the batch outlive its deadline.
///
/// **Critical Properties:**
/// - Input is decoded before expected output; either failing is a decode error
/// - The deadline is shared by every fixture of one grading call
/// - On expiry the in-flight call is abandoned and the worker terminated
/// - Does NOT compare values (comparator's job) or pick statuses (evaluator's)

use gabarito_common::Fixture;
use serde_json::Value;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::decode;
use crate::error::{EngineError, GradeError};
use crate::runtime::{CallArgs, CandidateHandle};

/// A fixture after both encodings were parsed
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFixture {
    pub args: CallArgs,
    pub expected: Value,
}

/// Parse a fixture's input and expected output
pub fn decode_fixture(fixture: &Fixture) -> Result<DecodedFixture, GradeError> {
    let input: Value = decode::from_str(&fixture.input)?;
    let expected: Value = decode::from_str(&fixture.expected_output)?;
    Ok(DecodedFixture {
        args: CallArgs::from_input(input),
        expected,
    })
}

/// What happened to one fixture
#[derive(Debug)]
pub enum Invocation {
    /// The candidate returned a value
    Returned { actual: Value, expected: Value },
    /// Input or expected output was not valid JSON
    DecodeFailed(String),
    /// The candidate raised or its worker died
    Raised(String),
    /// The batch deadline passed; the worker is already gone
    DeadlineExceeded,
}

/// Drives a loaded candidate through fixtures until the deadline
pub struct Invoker<H: CandidateHandle> {
    handle: Option<H>,
    deadline: Instant,
}

impl<H: CandidateHandle> Invoker<H> {
    pub fn new(handle: H, deadline: Instant) -> Self {
        Self {
            handle: Some(handle),
            deadline,
        }
    }

    /// Decode and run one fixture
    ///
    /// Returns `Err` only for host faults; the worker is terminated first.
    pub async fn run(&mut self, fixture: &Fixture) -> Result<Invocation, EngineError> {
        let decoded = match decode_fixture(fixture) {
            Ok(decoded) => decoded,
            Err(e) => return Ok(Invocation::DecodeFailed(e.to_string())),
        };

        let Some(handle) = self.handle.as_mut() else {
            return Ok(Invocation::DeadlineExceeded);
        };

        let outcome = timeout_at(self.deadline, handle.invoke(&decoded.args)).await;

        match outcome {
            Ok(Ok(actual)) => Ok(Invocation::Returned {
                actual,
                expected: decoded.expected,
            }),
            Ok(Err(GradeError::Engine(e))) => {
                self.finish().await;
                Err(e)
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Candidate raised");
                Ok(Invocation::Raised(e.to_string()))
            }
            Err(_) => {
                warn!(args = decoded.args.len(), "Deadline exceeded mid-call; terminating worker");
                self.finish().await;
                Ok(Invocation::DeadlineExceeded)
            }
        }
    }

    /// Terminate the candidate; later calls report the deadline as exceeded
    pub async fn finish(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.terminate().await;
        }
    }
}
