//! Image domain — inspect, remove.

use super::client::{classify, DockerClient, DockerError, Subject};

impl DockerClient {
    /// Inspect a specific image by ID or tag.
    pub async fn inspect_image(
        &self,
        image_id: &str,
    ) -> Result<bollard::models::ImageInspect, DockerError> {
        self.client
            .inspect_image(image_id)
            .await
            .map_err(|e| classify(e, Subject::Image, image_id))
    }

    /// Remove an image by ID or tag. Without `force` Docker refuses to
    /// remove an image still referenced by a container.
    pub async fn remove_image(&self, image_id: &str, force: bool) -> Result<(), DockerError> {
        use bollard::query_parameters::RemoveImageOptions;

        let options = Some(RemoveImageOptions {
            force,
            ..Default::default()
        });

        self.client
            .remove_image(image_id, options, None)
            .await
            .map_err(|e| classify(e, Subject::Image, image_id))?;

        Ok(())
    }
}
