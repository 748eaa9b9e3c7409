//! Isolated execution of the primary advice model.
//!
//! Every model invocation runs in its own execution unit with a hard
//! deadline, so a hung or crashed model can never stall the pipeline. The
//! production executor shells out to an external command; tests use an
//! in-process thread executor around a `LanguageModel`.

use crate::capability::llm::LanguageModel;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    /// The model did not answer within the deadline. The execution unit
    /// has been killed.
    #[error("model timed out after {0:?}")]
    Timeout(Duration),

    /// The execution unit died before producing a response.
    #[error("model crashed: {0}")]
    Crashed(String),

    /// The executor could not be launched at all.
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

/// Runs one prompt against the primary model with a hard deadline.
pub trait AdviceExecutor: Send + Sync {
    fn execute(&self, prompt: &str, max_tokens: u32, timeout: Duration)
    -> Result<String, ExecError>;
}

/// Executor that runs the model as a child process.
///
/// The prompt goes to the child's stdin, the response is read from stdout.
/// On deadline the child is killed, never waited on past the timeout.
pub struct ProcessExecutor {
    command: String,
    args: Vec<String>,
}

impl ProcessExecutor {
    /// `{max_tokens}` in an argument is replaced with the token budget.
    pub fn new(command: &str, args: &[String]) -> Self {
        Self {
            command: command.to_string(),
            args: args.to_vec(),
        }
    }
}

impl AdviceExecutor for ProcessExecutor {
    fn execute(
        &self,
        prompt: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, ExecError> {
        let deadline = Instant::now() + timeout;
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{max_tokens}", &max_tokens.to_string()))
            .collect();
        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExecError::Unavailable(format!("{}: {e}", self.command)))?;

        // Feed the prompt from a separate thread so a child that never
        // reads stdin cannot deadlock us against a full pipe.
        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_string();
            std::thread::spawn(move || {
                let _ = stdin.write_all(prompt.as_bytes());
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecError::Crashed("stdout not captured".to_string()))?;
        let (tx, rx) = crossbeam_channel::bounded::<std::io::Result<String>>(1);
        std::thread::spawn(move || {
            let mut stdout = stdout;
            let mut output = String::new();
            let result = stdout.read_to_string(&mut output).map(|_| output);
            let _ = tx.send(result);
        });

        match rx.recv_deadline(deadline) {
            Ok(Ok(output)) => {
                // Stdout closing does not mean the child exited; the same
                // deadline covers its exit status.
                let status = loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break status,
                        Ok(None) => {
                            if Instant::now() >= deadline {
                                let _ = child.kill();
                                let _ = child.wait();
                                return Err(ExecError::Timeout(timeout));
                            }
                            std::thread::sleep(Duration::from_millis(10));
                        }
                        Err(e) => {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(ExecError::Crashed(format!("wait failed: {e}")));
                        }
                    }
                };
                if status.success() {
                    Ok(output)
                } else {
                    Err(ExecError::Crashed(format!("exit status {status}")))
                }
            }
            Ok(Err(e)) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(ExecError::Crashed(format!("read failed: {e}")))
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(ExecError::Timeout(timeout))
            }
        }
    }
}

/// Executor that runs a `LanguageModel` on a fresh thread per call.
///
/// Stand-in for process isolation in tests: a hang is contained by the
/// receive deadline and a panic surfaces as a crash. The worker thread is
/// detached, so a hung model leaks its thread for the rest of the test.
pub struct ThreadExecutor {
    model: Arc<dyn LanguageModel>,
}

impl ThreadExecutor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

impl AdviceExecutor for ThreadExecutor {
    fn execute(
        &self,
        prompt: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, ExecError> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let model = Arc::clone(&self.model);
        let prompt = prompt.to_string();
        std::thread::spawn(move || {
            let result = model.generate(&prompt, max_tokens);
            let _ = tx.send(result);
        });
        match rx.recv_timeout(timeout) {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ExecError::Crashed(e.to_string())),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(ExecError::Timeout(timeout)),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(ExecError::Crashed("model worker panicked".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::llm::MockLanguageModel;

    #[test]
    fn test_thread_executor_returns_response() {
        let executor = ThreadExecutor::new(Arc::new(MockLanguageModel::responding("ok")));
        let result = executor.execute("prompt", 100, Duration::from_secs(1));
        assert_eq!(result.unwrap(), "ok");
    }

    #[test]
    fn test_thread_executor_times_out_hung_model() {
        let executor = ThreadExecutor::new(Arc::new(MockLanguageModel::hanging()));
        let result = executor.execute("prompt", 100, Duration::from_millis(50));
        assert!(matches!(result, Err(ExecError::Timeout(_))));
    }

    #[test]
    fn test_thread_executor_reports_panic_as_crash() {
        let executor = ThreadExecutor::new(Arc::new(MockLanguageModel::crashing()));
        let result = executor.execute("prompt", 100, Duration::from_secs(1));
        assert!(matches!(result, Err(ExecError::Crashed(_))));
    }

    #[test]
    fn test_thread_executor_reports_model_error_as_crash() {
        let executor = ThreadExecutor::new(Arc::new(MockLanguageModel::failing("oom")));
        let result = executor.execute("prompt", 100, Duration::from_secs(1));
        match result {
            Err(ExecError::Crashed(message)) => assert!(message.contains("oom")),
            other => panic!("expected crash, got {other:?}"),
        }
    }

    #[test]
    fn test_process_executor_unknown_command_is_unavailable() {
        let executor = ProcessExecutor::new("livecoach-no-such-binary", &[]);
        let result = executor.execute("prompt", 100, Duration::from_secs(1));
        assert!(matches!(result, Err(ExecError::Unavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_echoes_stdout() {
        let executor = ProcessExecutor::new("cat", &[]);
        let result = executor.execute("hello from stdin", 100, Duration::from_secs(5));
        assert_eq!(result.unwrap(), "hello from stdin");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_kills_on_timeout() {
        let executor = ProcessExecutor::new("sleep", &["10".to_string()]);
        let started = std::time::Instant::now();
        let result = executor.execute("", 100, Duration::from_millis(100));
        assert!(matches!(result, Err(ExecError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_kills_child_that_outlives_its_stdout() {
        // A child that closes stdout and keeps running must still be
        // killed at the deadline.
        let executor = ProcessExecutor::new(
            "sh",
            &["-c".to_string(), "exec 1>&-; sleep 10".to_string()],
        );
        let started = Instant::now();
        let result = executor.execute("", 100, Duration::from_millis(500));
        assert!(matches!(result, Err(ExecError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_nonzero_exit_is_crash() {
        let executor = ProcessExecutor::new("false", &[]);
        let result = executor.execute("", 100, Duration::from_secs(5));
        assert!(matches!(result, Err(ExecError::Crashed(_))));
    }
}
