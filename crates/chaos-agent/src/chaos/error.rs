//! Chaos errors and the single [`DockerError`] → [`ChaosError`] mapping.

use thiserror::Error;

use crate::docker::client::DockerError;
use crate::docker::snapshot::ContainerSnapshot;

#[derive(Error, Debug)]
pub enum ChaosError {
    #[error("Docker daemon unavailable while {operation} {name} ({id}): {source}")]
    RuntimeUnavailable {
        operation: &'static str,
        name: String,
        id: String,
        #[source]
        source: DockerError,
    },

    #[error("{name} ({id}) vanished while {operation}: {source}")]
    NotFound {
        operation: &'static str,
        name: String,
        id: String,
        #[source]
        source: DockerError,
    },

    #[error("Container {name} ({id}) could not be stopped within {timeout_secs}s after {signal}")]
    CouldNotStop {
        name: String,
        id: String,
        signal: String,
        timeout_secs: u64,
    },

    #[error("command '{tool}' not found inside the {name} ({id}) container")]
    ToolMissing { tool: String, name: String, id: String },

    #[error("command '{command}' failed in {name} ({id}) container with exit code {exit_code}; run it manually to debug")]
    ToolFailed {
        command: String,
        exit_code: i64,
        name: String,
        id: String,
    },

    #[error("{applied} of {total} tc commands applied on {name} ({id}) before '{command}' failed; the interface may be left inconsistent, run netem stop to clean up")]
    InvariantViolation {
        applied: usize,
        total: usize,
        command: String,
        name: String,
        id: String,
        #[source]
        source: Box<ChaosError>,
    },

    #[error("Docker error while {operation} {name} ({id}): {source}")]
    Runtime {
        operation: &'static str,
        name: String,
        id: String,
        #[source]
        source: DockerError,
    },

    #[error("Invalid {operation} request for {name} ({id}): {reason}")]
    InvalidRequest {
        operation: &'static str,
        name: String,
        id: String,
        reason: String,
    },
}

impl ChaosError {
    /// ID of the container the failed operation was aimed at.
    pub fn container_id(&self) -> &str {
        match self {
            ChaosError::RuntimeUnavailable { id, .. }
            | ChaosError::NotFound { id, .. }
            | ChaosError::CouldNotStop { id, .. }
            | ChaosError::ToolMissing { id, .. }
            | ChaosError::ToolFailed { id, .. }
            | ChaosError::InvariantViolation { id, .. }
            | ChaosError::Runtime { id, .. }
            | ChaosError::InvalidRequest { id, .. } => id,
        }
    }

    pub(crate) fn invalid(
        operation: &'static str,
        target: &ContainerSnapshot,
        reason: impl Into<String>,
    ) -> Self {
        ChaosError::InvalidRequest {
            operation,
            name: target.name.clone(),
            id: target.id.clone(),
            reason: reason.into(),
        }
    }
}

/// Annotate a [`DockerError`] with the operation and target container.
///
/// Mapping rules:
/// - `ConnectionFailed` → `RuntimeUnavailable`
/// - `ContainerNotFound` / `ImageNotFound` / `ExecNotFound` → `NotFound`
/// - Everything else → `Runtime`
pub fn map_docker_error(
    operation: &'static str,
    target: &ContainerSnapshot,
    err: DockerError,
) -> ChaosError {
    let name = target.name.clone();
    let id = target.id.clone();
    if err.is_unavailable() {
        ChaosError::RuntimeUnavailable { operation, name, id, source: err }
    } else if err.is_not_found() {
        ChaosError::NotFound { operation, name, id, source: err }
    } else {
        ChaosError::Runtime { operation, name, id, source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ContainerSnapshot {
        ContainerSnapshot::new("abc123", "web", "sha256:feed")
    }

    #[test]
    fn test_map_connection_failed() {
        let err = DockerError::ConnectionFailed("socket gone".to_string());
        let mapped = map_docker_error("pausing", &target(), err);
        assert!(matches!(mapped, ChaosError::RuntimeUnavailable { .. }));
        let msg = mapped.to_string();
        assert!(msg.contains("socket gone"));
        assert!(msg.contains("web (abc123)"));
    }

    #[test]
    fn test_map_container_not_found() {
        let err = DockerError::ContainerNotFound("abc123".to_string());
        let mapped = map_docker_error("killing", &target(), err);
        assert!(matches!(mapped, ChaosError::NotFound { operation: "killing", .. }));
    }

    #[test]
    fn test_map_image_not_found() {
        let err = DockerError::ImageNotFound("sha256:feed".to_string());
        let mapped = map_docker_error("removing image of", &target(), err);
        assert!(matches!(mapped, ChaosError::NotFound { .. }));
    }

    #[test]
    fn test_map_other_is_runtime() {
        let err = DockerError::BollardError(bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message: "conflict".into(),
        });
        let mapped = map_docker_error("renaming", &target(), err);
        assert!(matches!(mapped, ChaosError::Runtime { .. }));
        assert_eq!(mapped.container_id(), "abc123");
    }

    #[test]
    fn test_tool_failed_message_advises_manual_run() {
        let err = ChaosError::ToolFailed {
            command: "tc qdisc add dev eth0 root netem delay 100ms".into(),
            exit_code: 2,
            name: "web".into(),
            id: "abc123".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tc qdisc add"));
        assert!(msg.contains("run it manually"));
    }

    #[test]
    fn test_could_not_stop_message() {
        let err = ChaosError::CouldNotStop {
            name: "web".into(),
            id: "abc123".into(),
            signal: "SIGKILL".into(),
            timeout_secs: 10,
        };
        assert!(err.to_string().contains("could not be stopped"));
    }
}
