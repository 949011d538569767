use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::config::GraderConfig;

/// Entry point looked up when the caller does not name one
pub const DEFAULT_ENTRY_POINT: &str = "solution";

pub const MSG_ACCEPTED: &str = "Todos os testes passaram!";
pub const MSG_DATA_FORMAT: &str = "Erro no formato dos dados de teste";
pub const MSG_EMPTY_SOURCE: &str = "Código vazio";
pub const MSG_NO_FIXTURES: &str = "Nenhum caso de teste disponível";

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

/// Candidate source plus the name of the callable to grade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProgram {
    pub source_code: String,
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
}

impl CandidateProgram {
    pub fn new(source_code: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            source_code: source_code.into(),
            entry_point: entry_point.into(),
        }
    }
}

/// One input/expected-output pair, both JSON encoded
///
/// `description` and `is_sample` belong to the caller; the engine grades
/// every fixture it is handed the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(alias = "input_data")]
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_sample: bool,
}

impl Fixture {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            description: String::new(),
            is_sample: false,
        }
    }

    pub fn sample(mut self) -> Self {
        self.is_sample = true;
        self
    }

    fn encoded_len(&self) -> usize {
        self.input.len() + self.expected_output.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    Accepted,
    WrongAnswer,
    RuntimeError,
    TimeLimit,
}

impl GradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeStatus::Accepted => "accepted",
            GradeStatus::WrongAnswer => "wrong_answer",
            GradeStatus::RuntimeError => "runtime_error",
            GradeStatus::TimeLimit => "time_limit",
        }
    }
}

impl fmt::Display for GradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single fixture
///
/// `input` and `expected` are the raw encodings as supplied; `actual` is the
/// decoded value the candidate returned, if it returned at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureResult {
    pub test_number: u32,
    pub passed: bool,
    pub input: String,
    pub expected: String,
    pub actual: Option<Value>,
    pub error: Option<String>,
}

impl FixtureResult {
    pub fn pending(test_number: u32, fixture: &Fixture) -> Self {
        Self {
            test_number,
            passed: false,
            input: fixture.input.clone(),
            expected: fixture.expected_output.clone(),
            actual: None,
            error: None,
        }
    }
}

/// Final classification of one grading call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: GradeStatus,
    pub message: String,
    pub test_results: Vec<FixtureResult>,
    /// Wall-clock seconds, rounded to milliseconds
    pub execution_time: f64,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        self.status == GradeStatus::Accepted
    }

    /// The fixture that halted grading, if any
    pub fn failed_fixture(&self) -> Option<&FixtureResult> {
        self.test_results.iter().find(|r| !r.passed)
    }
}

/// Caller-side rejections raised before any candidate code runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("{}", MSG_EMPTY_SOURCE)]
    EmptySource,
    #[error("{}", MSG_NO_FIXTURES)]
    NoFixtures,
    #[error("invalid entry point name: {0:?}")]
    InvalidEntryPoint(String),
    #[error("source code exceeds maximum size of {limit} bytes")]
    SourceTooLarge { limit: usize },
    #[error("test data exceeds maximum size of {limit} bytes")]
    FixturesTooLarge { limit: usize },
}

/// Grading request as accepted by the HTTP and CLI surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    #[serde(alias = "code")]
    pub source_code: String,
    #[serde(default = "default_entry_point")]
    pub function_name: String,
    #[serde(default)]
    pub test_cases: Vec<Fixture>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl GradeRequest {
    pub fn program(&self) -> CandidateProgram {
        CandidateProgram::new(self.source_code.clone(), self.function_name.clone())
    }

    /// Fixtures flagged as samples, in submission order
    pub fn sample_fixtures(&self) -> Vec<Fixture> {
        self.test_cases
            .iter()
            .filter(|f| f.is_sample)
            .cloned()
            .collect()
    }

    /// Reject requests the engine should never see
    pub fn validate(&self, config: &GraderConfig) -> Result<(), RequestError> {
        if self.source_code.trim().is_empty() {
            return Err(RequestError::EmptySource);
        }
        if !is_identifier(&self.function_name) {
            return Err(RequestError::InvalidEntryPoint(self.function_name.clone()));
        }
        if self.source_code.len() > config.max_source_bytes {
            return Err(RequestError::SourceTooLarge {
                limit: config.max_source_bytes,
            });
        }
        if self.test_cases.is_empty() {
            return Err(RequestError::NoFixtures);
        }
        let total: usize = self.test_cases.iter().map(Fixture::encoded_len).sum();
        if total > config.max_fixture_bytes {
            return Err(RequestError::FixturesTooLarge {
                limit: config.max_fixture_bytes,
            });
        }
        Ok(())
    }
}

/// Letters, digits and underscores, not starting with a digit
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}
