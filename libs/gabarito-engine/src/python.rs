/// Python Runtime - One Interpreter Process per Grading Call
///
/// **Worker Rules:**
/// 1. Spawns `python3 -I` with a cleared environment (PATH only), null stderr
///    and the system temp dir as working directory
/// 2. Sends the candidate source once; the embedded harness compiles it into a
///    fresh namespace, runs top-level code and resolves the entry point
/// 3. Serves one JSON line per call: `{"args": [...]}` or `{"kwargs": {...}}`
/// 4. Candidate stdin/stdout are detached inside the worker, so prints never
///    reach the protocol channel or the host
/// 5. The process is killed on `terminate` and on drop (`kill_on_drop`)
///
/// **Not a sandbox:** no seccomp, namespaces, cgroups or rlimits are applied,
/// and processes forked by the candidate outlive the worker.

use gabarito_common::CandidateProgram;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, instrument, warn};

use crate::decode;
use crate::error::{bounded, EngineError, GradeError};
use crate::runtime::{CallArgs, CandidateHandle, CandidateRuntime};

const HARNESS: &str = include_str!("harness.py");

/// How long `terminate` waits for the killed worker to be reaped
const REAP_GRACE: Duration = Duration::from_millis(500);

const WORKER_GONE: &str = "o processo do candidato foi encerrado inesperadamente";

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    source_code: &'a str,
    entry_point: &'a str,
}

/// Replies written by the harness, one JSON object per line
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WorkerReply {
    Ready,
    CompileError { detail: String },
    TopLevelError { detail: String },
    EntryPointMissing,
    Value { value: Value },
    Raised { detail: String },
}

#[derive(Debug, Clone)]
pub struct PythonRuntime {
    python_command: String,
    max_error_chars: usize,
}

impl PythonRuntime {
    pub fn new(python_command: impl Into<String>) -> Self {
        Self {
            python_command: python_command.into(),
            max_error_chars: 500,
        }
    }

    pub fn with_max_error_chars(mut self, max_error_chars: usize) -> Self {
        self.max_error_chars = max_error_chars;
        self
    }

    fn spawn(&self) -> Result<Child, EngineError> {
        let path_env = std::env::var("PATH")
            .unwrap_or_else(|_| "/usr/bin:/usr/local/bin:/bin".to_string());

        Command::new(&self.python_command)
            .arg("-I")
            .arg("-c")
            .arg(HARNESS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .env_clear()
            .env("PATH", path_env)
            .current_dir(std::env::temp_dir())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: self.python_command.clone(),
                source,
            })
    }
}

impl CandidateRuntime for PythonRuntime {
    type Handle = PythonHandle;

    #[instrument(skip_all, fields(entry_point = %program.entry_point, source_size = program.source_code.len()))]
    async fn load(&self, program: &CandidateProgram) -> Result<PythonHandle, GradeError> {
        let mut child = self.spawn()?;
        let stdin = child.stdin.take().ok_or(EngineError::Pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(EngineError::Pipe("stdout"))?;
        debug!(pid = ?child.id(), "Worker spawned");

        let mut handle = PythonHandle {
            child,
            stdin,
            replies: BufReader::new(stdout).lines(),
            max_error_chars: self.max_error_chars,
        };

        let request = LoadRequest {
            source_code: &program.source_code,
            entry_point: &program.entry_point,
        };
        let line = serde_json::to_string(&request).map_err(EngineError::Encode)?;

        let reply = match handle.round_trip(&line).await {
            Ok(reply) => reply,
            Err(detail) => return Err(GradeError::TopLevel(detail)),
        };

        match reply {
            WorkerReply::Ready => Ok(handle),
            WorkerReply::CompileError { detail } => {
                Err(GradeError::Compile(bounded(&detail, self.max_error_chars)))
            }
            WorkerReply::TopLevelError { detail } => {
                Err(GradeError::TopLevel(bounded(&detail, self.max_error_chars)))
            }
            WorkerReply::EntryPointMissing => {
                Err(GradeError::EntryPointMissing(program.entry_point.clone()))
            }
            other => {
                warn!(reply = ?other, "Unexpected reply while loading");
                Err(GradeError::TopLevel(WORKER_GONE.to_string()))
            }
        }
    }
}

/// A live worker with the entry point resolved
pub struct PythonHandle {
    child: Child,
    stdin: ChildStdin,
    replies: Lines<BufReader<ChildStdout>>,
    max_error_chars: usize,
}

impl PythonHandle {
    /// Write one request line and read one reply line
    ///
    /// Any broken pipe, EOF or unreadable reply means the worker is no longer
    /// trustworthy; the error is reported as a candidate-side failure.
    async fn round_trip(&mut self, line: &str) -> Result<WorkerReply, String> {
        let write = async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.write_all(b"\n").await?;
            self.stdin.flush().await
        };
        if let Err(e) = write.await {
            debug!(error = %e, "Worker stdin closed");
            return Err(WORKER_GONE.to_string());
        }

        match self.replies.next_line().await {
            Ok(Some(reply)) => decode::from_str(&reply).map_err(|e| {
                warn!(error = %e, "Malformed worker reply");
                WORKER_GONE.to_string()
            }),
            Ok(None) => Err(WORKER_GONE.to_string()),
            Err(e) => {
                debug!(error = %e, "Worker stdout unreadable");
                Err(WORKER_GONE.to_string())
            }
        }
    }
}

impl CandidateHandle for PythonHandle {
    async fn invoke(&mut self, args: &CallArgs) -> Result<Value, GradeError> {
        let line = serde_json::to_string(args).map_err(EngineError::Encode)?;

        match self.round_trip(&line).await {
            Ok(WorkerReply::Value { value }) => Ok(value),
            Ok(WorkerReply::Raised { detail }) => {
                Err(GradeError::Invocation(bounded(&detail, self.max_error_chars)))
            }
            Ok(other) => {
                warn!(reply = ?other, "Unexpected reply to call");
                Err(GradeError::Invocation(WORKER_GONE.to_string()))
            }
            Err(detail) => Err(GradeError::Invocation(detail)),
        }
    }

    async fn terminate(mut self) {
        if let Err(e) = self.child.start_kill() {
            // Already exited
            debug!(error = %e, "Worker kill skipped");
        }
        match tokio::time::timeout(REAP_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Worker reaped"),
            Ok(Err(e)) => warn!(error = %e, "Failed to reap worker"),
            Err(_) => warn!("Worker not reaped within grace period"),
        }
    }
}
