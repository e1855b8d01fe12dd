use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::gcloud::GcloudError;

/// Abstraction over gcloud CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
/// Every call completes before it returns; the pipeline never overlaps them.
#[allow(async_fn_in_trait)]
pub trait GcloudExecutor: Send + Sync {
    /// Execute a gcloud command and capture stdout.
    async fn exec(&self, args: &[String]) -> Result<String, GcloudError>;

    /// Execute a gcloud command, streaming output to the terminal.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), GcloudError>;

    /// Execute a gcloud command with data piped to stdin.
    ///
    /// `stdin_data` may be secret material and is never logged.
    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, GcloudError>;
}

/// Real gcloud CLI executor.
pub struct RealExecutor;

impl RealExecutor {
    fn command(args: &[String]) -> Command {
        tracing::debug!(args = ?args, "gcloud");
        let mut cmd = Command::new("gcloud");
        cmd.args(args);
        cmd
    }
}

impl GcloudExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, GcloudError> {
        let output = Self::command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| GcloudError::NotFound { source: e })?;

        captured(args, output)
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), GcloudError> {
        let status = Self::command(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| GcloudError::NotFound { source: e })?;

        if status.success() {
            Ok(())
        } else {
            Err(GcloudError::CommandFailed {
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            })
        }
    }

    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, GcloudError> {
        use tokio::io::AsyncWriteExt;

        let mut child = Self::command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GcloudError::NotFound { source: e })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_data)
                .await
                .map_err(|e| GcloudError::StdinWrite { source: e })?;
            stdin
                .shutdown()
                .await
                .map_err(|e| GcloudError::StdinWrite { source: e })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GcloudError::NotFound { source: e })?;

        captured(args, output)
    }
}

fn captured(args: &[String], output: Output) -> Result<String, GcloudError> {
    if output.status.success() {
        String::from_utf8(output.stdout).map_err(|e| GcloudError::InvalidUtf8 { source: e })
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        tracing::debug!(args = ?args, %stderr, "gcloud failed");
        Err(GcloudError::CommandFailed {
            args: args.to_vec(),
            stderr,
        })
    }
}
