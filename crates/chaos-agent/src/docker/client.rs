//! Docker client — core struct, constructor, error types.
//!
//! Domain methods live in sibling modules (`container`, `image`, `shell`)
//! which add `impl DockerClient` blocks.

use bollard::Docker;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockerError {
    #[error("Docker connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Image not found: {0}")]
    ImageNotFound(String),
    #[error("Exec instance not found: {0}")]
    ExecNotFound(String),
    #[error("Bollard error: {0}")]
    BollardError(#[from] bollard::errors::Error),
}

impl DockerError {
    /// True when the daemon itself could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DockerError::ConnectionFailed(_))
    }

    /// True when the addressed container, image or exec instance is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DockerError::ContainerNotFound(_)
                | DockerError::ImageNotFound(_)
                | DockerError::ExecNotFound(_)
        )
    }
}

/// What a request was addressed to, used to pick the right not-found variant.
#[derive(Debug, Clone, Copy)]
pub(super) enum Subject {
    Container,
    Image,
    Exec,
}

/// Classify a bollard error: 404 becomes a not-found for `subject`,
/// transport failures become `ConnectionFailed`.
pub(super) fn classify(err: bollard::errors::Error, subject: Subject, id: &str) -> DockerError {
    use bollard::errors::Error;

    match err {
        Error::DockerResponseServerError { status_code: 404, .. } => match subject {
            Subject::Container => DockerError::ContainerNotFound(id.to_string()),
            Subject::Image => DockerError::ImageNotFound(id.to_string()),
            Subject::Exec => DockerError::ExecNotFound(id.to_string()),
        },
        e @ (Error::SocketNotFoundError(_)
        | Error::IOError { .. }
        | Error::HyperResponseError { .. }
        | Error::RequestTimeoutError) => DockerError::ConnectionFailed(e.to_string()),
        other => DockerError::BollardError(other),
    }
}

#[derive(Debug, Clone)]
pub struct DockerClient {
    /// The bollard Docker client.  `pub(super)` so that domain modules
    /// in sibling files can call bollard APIs directly.
    pub(super) client: Docker,
}

impl DockerClient {
    pub fn new(socket_path: &str) -> Result<Self, DockerError> {
        let connection = if socket_path.is_empty() {
            Docker::connect_with_defaults()
                .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?
        } else {
            let clean_path = socket_path.trim_start_matches("unix://");
            Docker::connect_with_socket(clean_path, 120, &bollard::API_DEFAULT_VERSION)
                .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?
        };

        Ok(DockerClient { client: connection })
    }

    /// Round-trip to the daemon to confirm it is reachable.
    pub async fn ping(&self) -> Result<(), DockerError> {
        self.client
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| DockerError::ConnectionFailed(e.to_string()))
    }
}
