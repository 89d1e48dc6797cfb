//! Container domain — list, inspect, create, and the lifecycle calls chaos
//! actions are built from (kill, rename, pause, remove).

use super::client::{classify, DockerClient, DockerError, Subject};

use bollard::models::{ContainerCreateBody, ContainerInspectResponse};
use bollard::query_parameters::{
    CreateContainerOptions, KillContainerOptions, ListContainersOptions,
    RemoveContainerOptions, RenameContainerOptions,
};

/// Flags for container removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Kill the container first if it is still running.
    pub force: bool,
    /// Remove the named links associated with the container.
    pub remove_links: bool,
    /// Remove anonymous volumes associated with the container.
    pub remove_volumes: bool,
}

impl DockerClient {
    /// IDs of the currently running containers.
    pub async fn list_running(&self) -> Result<Vec<String>, DockerError> {
        let options = Some(ListContainersOptions {
            all: false,
            ..Default::default()
        });
        let containers = self
            .client
            .list_containers(options)
            .await
            .map_err(|e| classify(e, Subject::Container, ""))?;
        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }

    pub async fn inspect_container(
        &self,
        id: &str,
    ) -> Result<ContainerInspectResponse, DockerError> {
        self.client
            .inspect_container(id, None)
            .await
            .map_err(|e| classify(e, Subject::Container, id))
    }

    /// Create a container and return its ID. `name: None` lets Docker pick one.
    pub async fn create_container(
        &self,
        body: ContainerCreateBody,
        name: Option<&str>,
    ) -> Result<String, DockerError> {
        let options = Some(CreateContainerOptions {
            name: name.map(str::to_string),
            ..Default::default()
        });

        let image = image_of(&body);
        let response = self
            .client
            .create_container(options, body)
            .await
            .map_err(|e| classify(e, Subject::Image, &image))?;

        for warning in &response.warnings {
            tracing::warn!(container_id = %response.id, %warning, "Docker warning on create");
        }
        Ok(response.id)
    }

    pub async fn start_container(&self, container_id: &str) -> Result<(), DockerError> {
        self.client
            .start_container(container_id, None)
            .await
            .map_err(|e| classify(e, Subject::Container, container_id))
    }

    pub async fn rename_container(
        &self,
        container_id: &str,
        new_name: &str,
    ) -> Result<(), DockerError> {
        let options = RenameContainerOptions {
            name: new_name.to_string(),
        };
        self.client
            .rename_container(container_id, options)
            .await
            .map_err(|e| classify(e, Subject::Container, container_id))
    }

    /// Deliver `signal` (e.g. `SIGTERM`) to the container's main process.
    pub async fn kill_container(&self, container_id: &str, signal: &str) -> Result<(), DockerError> {
        let options = Some(KillContainerOptions {
            signal: signal.to_string(),
        });
        self.client
            .kill_container(container_id, options)
            .await
            .map_err(|e| classify(e, Subject::Container, container_id))
    }

    pub async fn remove_container(
        &self,
        container_id: &str,
        opts: RemoveOptions,
    ) -> Result<(), DockerError> {
        let options = Some(RemoveContainerOptions {
            force: opts.force,
            v: opts.remove_volumes,
            link: opts.remove_links,
        });

        self.client
            .remove_container(container_id, options)
            .await
            .map_err(|e| classify(e, Subject::Container, container_id))
    }

    /// Pause a running container (freezes all processes).
    pub async fn pause_container(&self, container_id: &str) -> Result<(), DockerError> {
        self.client
            .pause_container(container_id)
            .await
            .map_err(|e| classify(e, Subject::Container, container_id))
    }

    pub async fn unpause_container(&self, container_id: &str) -> Result<(), DockerError> {
        self.client
            .unpause_container(container_id)
            .await
            .map_err(|e| classify(e, Subject::Container, container_id))
    }
}

/// Image reference a create request points at; a 404 on create means this
/// image is missing.
fn image_of(body: &ContainerCreateBody) -> String {
    body.image.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_404_names_the_image() {
        let body = ContainerCreateBody {
            image: Some("gaiadocker/iproute2".into()),
            ..Default::default()
        };
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such image: gaiadocker/iproute2".into(),
        };
        let mapped = classify(err, Subject::Image, &image_of(&body));
        assert!(matches!(mapped, DockerError::ImageNotFound(ref image) if image == "gaiadocker/iproute2"));
    }

    #[test]
    fn test_remove_options_default_is_gentle() {
        let opts = RemoveOptions::default();
        assert!(!opts.force && !opts.remove_links && !opts.remove_volumes);
    }
}
