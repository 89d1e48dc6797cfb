//! Exec — run a tool against a target container's network namespace.
//!
//! Two strategies share one contract:
//! - [`ExecStrategy::InNamespace`] execs the tool inside the target after
//!   checking it exists there.
//! - [`ExecStrategy::Helper`] starts a throwaway container from an image
//!   that ships the tool, joined to the target's network namespace.

use std::collections::HashMap;

use bollard::models::{ContainerCreateBody, HostConfig};
use tracing::debug;

use crate::chaos::error::{map_docker_error, ChaosError};
use crate::chaos::netem::TcCommand;
use crate::client::docker::DockerOps;
use crate::docker::snapshot::{ContainerSnapshot, SKIP_LABEL};

/// Capability `tc` needs to change qdiscs.
const NET_ADMIN: &str = "NET_ADMIN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStrategy {
    InNamespace,
    Helper { image: String },
}

impl ExecStrategy {
    /// Helper strategy when an image is configured, in-namespace otherwise.
    pub fn from_image(image: Option<&str>) -> Self {
        match image.map(str::trim) {
            Some(image) if !image.is_empty() => ExecStrategy::Helper {
                image: image.to_string(),
            },
            _ => ExecStrategy::InNamespace,
        }
    }

    /// Run `tool` with `command`'s arguments against `target`.
    pub async fn run(
        &self,
        docker: &dyn DockerOps,
        target: &ContainerSnapshot,
        tool: &str,
        command: &TcCommand,
    ) -> Result<(), ChaosError> {
        match self {
            ExecStrategy::InNamespace => {
                exec_on_container(docker, target, tool, command.args(), true).await
            }
            ExecStrategy::Helper { image } => {
                run_in_helper(docker, target, image, tool, command.args()).await
            }
        }
    }

    /// Run `commands` in order, stopping at the first failure.
    ///
    /// A failure after at least one command took effect is reported as
    /// [`ChaosError::InvariantViolation`]: the earlier commands are not
    /// rolled back.
    pub async fn run_all(
        &self,
        docker: &dyn DockerOps,
        target: &ContainerSnapshot,
        tool: &str,
        commands: &[TcCommand],
    ) -> Result<(), ChaosError> {
        for (applied, command) in commands.iter().enumerate() {
            debug!(container_id = %target.id, command = %command, "Running tc command");
            if let Err(e) = self.run(docker, target, tool, command).await {
                if applied == 0 {
                    return Err(e);
                }
                return Err(ChaosError::InvariantViolation {
                    applied,
                    total: commands.len(),
                    command: command.to_string(),
                    name: target.name.clone(),
                    id: target.id.clone(),
                    source: Box::new(e),
                });
            }
        }
        Ok(())
    }
}

/// Exec `tool args..` inside `target`, failing fast if the tool is absent.
pub async fn exec_on_container(
    docker: &dyn DockerOps,
    target: &ContainerSnapshot,
    tool: &str,
    args: &[String],
    privileged: bool,
) -> Result<(), ChaosError> {
    let tool: String = tool.chars().filter(|c| !c.is_whitespace()).collect();
    let ctx = |e| map_docker_error("exec in", target, e);

    debug!(container_id = %target.id, %tool, "Checking command exists");
    let check = docker
        .create_exec(&target.id, vec!["which".to_string(), tool.clone()], false)
        .await
        .map_err(ctx)?;
    docker.start_exec(&check).await.map_err(ctx)?;
    if docker.inspect_exec(&check).await.map_err(ctx)? != 0 {
        return Err(ChaosError::ToolMissing {
            tool,
            name: target.name.clone(),
            id: target.id.clone(),
        });
    }

    let mut cmd = Vec::with_capacity(args.len() + 1);
    cmd.push(tool.clone());
    cmd.extend(args.iter().cloned());
    let command_line = cmd.join(" ");

    let exec = docker
        .create_exec(&target.id, cmd, privileged)
        .await
        .map_err(ctx)?;
    debug!(container_id = %target.id, exec_id = %exec, command = %command_line, "Starting exec");
    docker.start_exec(&exec).await.map_err(ctx)?;

    let exit_code = docker.inspect_exec(&exec).await.map_err(ctx)?;
    if exit_code != 0 {
        return Err(ChaosError::ToolFailed {
            command: command_line,
            exit_code,
            name: target.name.clone(),
            id: target.id.clone(),
        });
    }
    Ok(())
}

/// Create body for a helper that runs `tool args..` inside `target`'s
/// network namespace and removes itself on exit.
pub fn helper_body(target: &ContainerSnapshot, image: &str, tool: &str, args: &[String]) -> ContainerCreateBody {
    ContainerCreateBody {
        image: Some(image.to_string()),
        entrypoint: Some(vec![tool.to_string()]),
        cmd: Some(args.to_vec()),
        labels: Some(HashMap::from([(SKIP_LABEL.to_string(), "true".to_string())])),
        host_config: Some(HostConfig {
            auto_remove: Some(true),
            cap_add: Some(vec![NET_ADMIN.to_string()]),
            network_mode: Some(format!("container:{}", target.id)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Create and start the helper. Its exit status is not awaited.
async fn run_in_helper(
    docker: &dyn DockerOps,
    target: &ContainerSnapshot,
    image: &str,
    tool: &str,
    args: &[String],
) -> Result<(), ChaosError> {
    debug!(container_id = %target.id, %image, "Creating tc helper container");
    let body = helper_body(target, image, tool, args);
    let helper_id = docker
        .create_container(body, None)
        .await
        .map_err(|e| map_docker_error("creating tc helper for", target, e))?;
    debug!(container_id = %target.id, %helper_id, "Starting tc helper container");
    docker
        .start_container(&helper_id)
        .await
        .map_err(|e| map_docker_error("starting tc helper for", target, e))
}
