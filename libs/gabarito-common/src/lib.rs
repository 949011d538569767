pub mod config;
pub mod types;

pub use config::GraderConfig;
pub use types::{
    CandidateProgram, Fixture, FixtureResult, GradeRequest, GradeStatus, RequestError, Verdict,
    DEFAULT_ENTRY_POINT,
};
