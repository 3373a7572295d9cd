//! Supervised invocation of the external evaluation harness.
//!
//! The harness is an opaque child process. This module only launches it,
//! bounds the wait with a timeout, and reduces the exit to a result; the
//! report artifact it produces is read elsewhere.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

const OUTPUT_LOG_LIMIT: usize = 2000;

/// How the harness child process is launched.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Program to execute.
    pub program: String,
    /// Arguments placed before the evaluation arguments.
    pub leading_args: Vec<String>,
    /// Dataset the harness evaluates against.
    pub dataset_name: String,
    /// Ask the harness to clean up its intermediate state.
    pub clean: bool,
    /// Wall-clock bound on one harness run.
    pub timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            leading_args: [
                "compose",
                "run",
                "--rm",
                "data-quality-checker",
                "python",
                "-m",
                "swebench.harness.run_evaluation",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            dataset_name: "SWE-bench/SWE-bench".to_string(),
            clean: true,
            timeout: Duration::from_secs(1800),
        }
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("harness exited with code {code}")]
    ExitStatus { code: i32 },
    #[error("harness terminated without an exit code")]
    NoExitCode,
    #[error("harness run timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to launch harness: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs the evaluation harness for one predictions file and run id.
pub struct HarnessRunner {
    config: HarnessConfig,
}

impl HarnessRunner {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Full argument vector for one evaluation run.
    pub fn evaluation_args(&self, predictions_path: &Path, run_id: &str) -> Vec<String> {
        let mut args = self.config.leading_args.clone();
        args.push("--predictions_path".to_string());
        args.push(predictions_path.display().to_string());
        args.push("--run_id".to_string());
        args.push(run_id.to_string());
        args.push("--dataset_name".to_string());
        args.push(self.config.dataset_name.clone());
        args.push("--clean".to_string());
        args.push(if self.config.clean { "True" } else { "False" }.to_string());
        args
    }

    /// Run one evaluation to completion.
    ///
    /// Zero exit status is success. The child is killed if the timeout
    /// elapses; captured output is logged at debug level on failure and never
    /// parsed.
    pub async fn run_evaluation(
        &self,
        predictions_path: &Path,
        run_id: &str,
    ) -> Result<(), HarnessError> {
        let args = self.evaluation_args(predictions_path, run_id);
        info!(program = %self.config.program, run_id = %run_id, "starting harness evaluation");
        debug!(?args, "harness command line");

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the wait future on timeout kills the child via kill_on_drop.
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(HarnessError::Io(e)),
            Err(_) => {
                warn!(run_id = %run_id, timeout = ?self.config.timeout, "harness run timed out");
                return Err(HarnessError::Timeout(self.config.timeout));
            }
        };

        if output.status.success() {
            info!(run_id = %run_id, "harness evaluation completed");
            return Ok(());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(run_id = %run_id, stdout = %tail(&stdout, OUTPUT_LOG_LIMIT), "harness stdout");
        debug!(run_id = %run_id, stderr = %tail(&stderr, OUTPUT_LOG_LIMIT), "harness stderr");

        match output.status.code() {
            Some(code) => Err(HarnessError::ExitStatus { code }),
            None => Err(HarnessError::NoExitCode),
        }
    }
}

/// Last `max_chars` characters of `s`, on a char boundary.
fn tail(s: &str, max_chars: usize) -> &str {
    let mut boundary = s.len();
    for (count, (index, _)) in s.char_indices().rev().enumerate() {
        if count == max_chars {
            return &s[boundary..];
        }
        boundary = index;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Harness stand-in: the shell script sees the appended evaluation
    /// arguments as ignored positional parameters.
    fn sh_config(script: &str, timeout: Duration) -> HarnessConfig {
        HarnessConfig {
            program: "sh".to_string(),
            leading_args: vec!["-c".to_string(), script.to_string(), "harness".to_string()],
            timeout,
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn test_default_config_runs_docker_compose() {
        let config = HarnessConfig::default();
        assert_eq!(config.program, "docker");
        assert_eq!(config.leading_args[0], "compose");
        assert_eq!(config.dataset_name, "SWE-bench/SWE-bench");
        assert!(config.clean);
        assert_eq!(config.timeout, Duration::from_secs(1800));
    }

    #[test]
    fn test_evaluation_args_layout() {
        let runner = HarnessRunner::new(HarnessConfig::default());
        let args = runner.evaluation_args(Path::new("predictions_x.jsonl"), "x");

        let expected: Vec<String> = [
            "compose",
            "run",
            "--rm",
            "data-quality-checker",
            "python",
            "-m",
            "swebench.harness.run_evaluation",
            "--predictions_path",
            "predictions_x.jsonl",
            "--run_id",
            "x",
            "--dataset_name",
            "SWE-bench/SWE-bench",
            "--clean",
            "True",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_evaluation_args_clean_disabled() {
        let config = HarnessConfig {
            clean: false,
            ..HarnessConfig::default()
        };
        let runner = HarnessRunner::new(config);
        let args = runner.evaluation_args(Path::new("p.jsonl"), "run");
        assert_eq!(args.last().map(String::as_str), Some("False"));
    }

    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let runner = HarnessRunner::new(sh_config("exit 0", Duration::from_secs(5)));
        let result = runner.run_evaluation(Path::new("p.jsonl"), "run").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_code() {
        let runner = HarnessRunner::new(sh_config("exit 7", Duration::from_secs(5)));
        match runner.run_evaluation(Path::new("p.jsonl"), "run").await {
            Err(HarnessError::ExitStatus { code }) => assert_eq!(code, 7),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_failure() {
        let runner = HarnessRunner::new(sh_config("sleep 30", Duration::from_millis(200)));
        let started = std::time::Instant::now();
        match runner.run_evaluation(Path::new("p.jsonl"), "run").await {
            Err(HarnessError::Timeout(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_failure() {
        let config = HarnessConfig {
            program: "/nonexistent/dpv-harness".to_string(),
            leading_args: Vec::new(),
            ..HarnessConfig::default()
        };
        let runner = HarnessRunner::new(config);
        let result = runner.run_evaluation(Path::new("p.jsonl"), "run").await;
        assert!(matches!(result, Err(HarnessError::Io(_))));
    }

    #[test]
    fn test_tail_keeps_char_boundaries() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 5), "ab");
        assert_eq!(tail("héllo wörld", 4), "örld");
    }
}
