//! Live — implements `DockerOps` for the real Bollard-backed `DockerClient`.

use std::pin::Pin;

use bollard::models::{ContainerCreateBody, ContainerInspectResponse, ImageInspect};

use crate::client::docker::DockerOps;
use crate::docker::client::{DockerClient, DockerError};
use crate::docker::container::RemoveOptions;

impl DockerOps for DockerClient {
    // ── Container queries ───────────────────────────────────────

    fn list_running(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<String>, DockerError>> + Send + '_>> {
        Box::pin(self.list_running())
    }

    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerInspectResponse, DockerError>> + Send + 'a>> {
        Box::pin(self.inspect_container(id))
    }

    fn inspect_image<'a>(
        &'a self,
        image_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ImageInspect, DockerError>> + Send + 'a>> {
        Box::pin(self.inspect_image(image_id))
    }

    // ── Container lifecycle ─────────────────────────────────────

    fn create_container<'a>(
        &'a self,
        body: ContainerCreateBody,
        name: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, DockerError>> + Send + 'a>> {
        Box::pin(self.create_container(body, name))
    }

    fn start_container<'a>(
        &'a self,
        container_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(self.start_container(container_id))
    }

    fn rename_container<'a>(
        &'a self,
        container_id: &'a str,
        new_name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(self.rename_container(container_id, new_name))
    }

    fn kill_container<'a>(
        &'a self,
        container_id: &'a str,
        signal: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(self.kill_container(container_id, signal))
    }

    fn remove_container<'a>(
        &'a self,
        container_id: &'a str,
        opts: RemoveOptions,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(self.remove_container(container_id, opts))
    }

    fn pause_container<'a>(
        &'a self,
        container_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(self.pause_container(container_id))
    }

    fn unpause_container<'a>(
        &'a self,
        container_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(self.unpause_container(container_id))
    }

    // ── Images ──────────────────────────────────────────────────

    fn remove_image<'a>(
        &'a self,
        image_id: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(self.remove_image(image_id, force))
    }

    // ── Exec ────────────────────────────────────────────────────

    fn create_exec<'a>(
        &'a self,
        container_id: &'a str,
        cmd: Vec<String>,
        privileged: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, DockerError>> + Send + 'a>> {
        Box::pin(self.create_exec(container_id, cmd, privileged))
    }

    fn start_exec<'a>(
        &'a self,
        exec_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(self.start_exec(exec_id))
    }

    fn inspect_exec<'a>(
        &'a self,
        exec_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<i64, DockerError>> + Send + 'a>> {
        Box::pin(self.inspect_exec(exec_id))
    }
}
