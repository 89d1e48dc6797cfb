//! Shell domain — exec create, start, inspect.

use super::client::{classify, DockerClient, DockerError, Subject};
use futures_util::stream::StreamExt;

impl DockerClient {
    /// Create an exec instance in a container.
    /// Returns the exec ID that can be used with `start_exec`.
    pub async fn create_exec(
        &self,
        container_id: &str,
        cmd: Vec<String>,
        privileged: bool,
    ) -> Result<String, DockerError> {
        use bollard::models::ExecConfig;

        let config = ExecConfig {
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            privileged: Some(privileged),
            cmd: Some(cmd),
            ..Default::default()
        };

        let result = self
            .client
            .create_exec(container_id, config)
            .await
            .map_err(|e| classify(e, Subject::Container, container_id))?;

        Ok(result.id)
    }

    /// Start an exec instance attached and wait for its output to close,
    /// which happens when the command exits.
    pub async fn start_exec(&self, exec_id: &str) -> Result<(), DockerError> {
        use bollard::exec::{StartExecOptions, StartExecResults};

        let options = Some(StartExecOptions {
            detach: false,
            ..Default::default()
        });

        let results = self
            .client
            .start_exec(exec_id, options)
            .await
            .map_err(|e| classify(e, Subject::Exec, exec_id))?;

        if let StartExecResults::Attached { mut output, .. } = results {
            while let Some(chunk) = output.next().await {
                match chunk {
                    Ok(line) => tracing::trace!(exec_id, output = %line, "exec output"),
                    Err(e) => return Err(classify(e, Subject::Exec, exec_id)),
                }
            }
        }
        Ok(())
    }

    /// Exit code of a finished exec instance. A missing code (still running)
    /// is reported as `-1`.
    pub async fn inspect_exec(&self, exec_id: &str) -> Result<i64, DockerError> {
        let inspect = self
            .client
            .inspect_exec(exec_id)
            .await
            .map_err(|e| classify(e, Subject::Exec, exec_id))?;
        Ok(inspect.exit_code.unwrap_or(-1))
    }
}
