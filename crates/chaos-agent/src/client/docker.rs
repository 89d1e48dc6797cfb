//! Docker trait — abstract interface for the Docker operations chaos needs.
//!
//! The chaos engine reaches the daemon only through this trait.
//! `live.rs` provides the real Bollard-backed implementation.
//! `fake.rs` provides a test double.

use std::pin::Pin;

use bollard::models::{ContainerCreateBody, ContainerInspectResponse, ImageInspect};

use crate::docker::client::DockerError;
use crate::docker::container::RemoveOptions;

/// Unified async interface over the Docker daemon.
///
/// Object-safe thanks to `Pin<Box<…>>` returns.
/// Implementations must be `Send + Sync` so they can live behind an `Arc`
/// shared by concurrent chaos operations.
pub trait DockerOps: Send + Sync {
    // ── Container queries ───────────────────────────────────────

    fn list_running(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<String>, DockerError>> + Send + '_>>;

    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerInspectResponse, DockerError>> + Send + 'a>>;

    fn inspect_image<'a>(
        &'a self,
        image_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ImageInspect, DockerError>> + Send + 'a>>;

    // ── Container lifecycle ─────────────────────────────────────

    fn create_container<'a>(
        &'a self,
        body: ContainerCreateBody,
        name: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, DockerError>> + Send + 'a>>;

    fn start_container<'a>(
        &'a self,
        container_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>>;

    fn rename_container<'a>(
        &'a self,
        container_id: &'a str,
        new_name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>>;

    fn kill_container<'a>(
        &'a self,
        container_id: &'a str,
        signal: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>>;

    fn remove_container<'a>(
        &'a self,
        container_id: &'a str,
        opts: RemoveOptions,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>>;

    fn pause_container<'a>(
        &'a self,
        container_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>>;

    fn unpause_container<'a>(
        &'a self,
        container_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>>;

    // ── Images ──────────────────────────────────────────────────

    fn remove_image<'a>(
        &'a self,
        image_id: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>>;

    // ── Exec ────────────────────────────────────────────────────

    fn create_exec<'a>(
        &'a self,
        container_id: &'a str,
        cmd: Vec<String>,
        privileged: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, DockerError>> + Send + 'a>>;

    /// Run the exec instance to completion.
    fn start_exec<'a>(
        &'a self,
        exec_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>>;

    /// Exit code of a finished exec instance.
    fn inspect_exec<'a>(
        &'a self,
        exec_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<i64, DockerError>> + Send + 'a>>;
}
