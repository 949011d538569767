//! Grading engine: loads an untrusted candidate program, runs it against
//! JSON fixtures under one wall-clock deadline and classifies the outcome.
//!
//! ```no_run
//! use gabarito_common::{CandidateProgram, Fixture, GraderConfig};
//! use gabarito_engine::Grader;
//!
//! # async fn demo() -> Result<(), gabarito_engine::EngineError> {
//! let grader = Grader::from_config(&GraderConfig::default());
//! let program = CandidateProgram::new("def solution(a, b):\n    return a + b", "solution");
//! let verdict = grader.grade(&program, &[Fixture::new("[2, 3]", "5")]).await?;
//! assert!(verdict.is_accepted());
//! # Ok(())
//! # }
//! ```

pub mod comparator;
pub mod decode;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod invoker;
pub mod python;
pub mod runtime;

pub use error::{EngineError, GradeError};
pub use executor::Grader;
pub use python::PythonRuntime;
pub use runtime::{CallArgs, CandidateHandle, CandidateRuntime};
