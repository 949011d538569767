/// Candidate Runtime - Loading Capability
///
/// **Core Responsibility:**
/// Turn candidate source into an opaque handle that can be invoked.
///
/// **Critical Architectural Boundary:**
/// - The runtime knows HOW candidate code is hosted (interpreter, process, ...)
/// - The runtime does NOT decode fixtures, compare values or pick statuses
/// - Everything above this boundary talks to `CandidateHandle` only
///
/// Production uses `PythonRuntime` (python.rs). Tests swap in scripted runtimes.

use gabarito_common::CandidateProgram;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::GradeError;

/// Argument list for one call of the entry point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallArgs {
    /// Successive positional arguments
    Args(Vec<Value>),
    /// Named arguments
    Kwargs(Map<String, Value>),
}

impl CallArgs {
    /// Marshal a decoded fixture input onto the calling convention
    ///
    /// - array → each element is one positional argument
    /// - object → each pair is one named argument
    /// - anything else → the sole positional argument
    pub fn from_input(input: Value) -> Self {
        match input {
            Value::Array(items) => CallArgs::Args(items),
            Value::Object(pairs) => CallArgs::Kwargs(pairs),
            scalar => CallArgs::Args(vec![scalar]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CallArgs::Args(items) => items.len(),
            CallArgs::Kwargs(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Something that can load candidate programs
///
/// Loading runs the candidate's top-level code exactly once and resolves the
/// entry point. Failures map to `GradeError::Compile`,
/// `GradeError::EntryPointMissing` or `GradeError::TopLevel`; host faults to
/// `GradeError::Engine`.
#[allow(async_fn_in_trait)]
pub trait CandidateRuntime {
    type Handle: CandidateHandle;

    async fn load(&self, program: &CandidateProgram) -> Result<Self::Handle, GradeError>;
}

/// A loaded candidate, bound to its entry point
///
/// Dropping a handle must release whatever hosts the candidate; `terminate`
/// does the same but waits until it is gone.
#[allow(async_fn_in_trait)]
pub trait CandidateHandle: Sized {
    /// Call the entry point once and return its decoded result
    async fn invoke(&mut self, args: &CallArgs) -> Result<Value, GradeError>;

    /// Stop the candidate and release its resources
    async fn terminate(self);
}
