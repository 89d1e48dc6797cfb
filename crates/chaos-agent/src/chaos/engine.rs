//! Engine — the single entry point for chaos operations.
//!
//! Every operation takes a [`ContainerSnapshot`] plus parameters, emits one
//! [`Intent`], and returns before touching Docker when `dry_run` is set.
//! Lifecycle operations call [`DockerOps`] directly; netem operations
//! synthesize tc commands and hand them to the configured [`ExecStrategy`].
//!
//! Operations on different containers may run concurrently. Operations on
//! the same container (in particular on the same interface) are not
//! serialized here and must be serialized by the caller.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::chaos::error::{map_docker_error, ChaosError};
use crate::chaos::exec::ExecStrategy;
use crate::chaos::intent::{Intent, Operation};
use crate::chaos::netem::{self, TcCommand, TC_BINARY};
use crate::chaos::stop::{graceful_signal, StopSequence};
use crate::client::docker::DockerOps;
use crate::docker::client::DockerError;
use crate::docker::container::RemoveOptions;
use crate::docker::snapshot::ContainerSnapshot;
use crate::filter::engine::ContainerFilter;

pub const DEFAULT_INTERFACE: &str = "eth0";

/// Parameters of a netem disruption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetemRequest {
    pub interface: String,
    /// Passed to netem verbatim, e.g. `["delay", "100ms"]`.
    pub args: Vec<String>,
    /// Limit the disruption to traffic towards this address.
    pub target_ip: Option<IpAddr>,
}

impl NetemRequest {
    pub fn new(interface: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            interface: interface.into(),
            args,
            target_ip: None,
        }
    }

    pub fn towards(mut self, ip: IpAddr) -> Self {
        self.target_ip = Some(ip);
        self
    }

    pub fn commands(&self) -> Vec<TcCommand> {
        match self.target_ip {
            Some(ip) => netem::build_start_filtered(&self.interface, &self.args, ip),
            None => netem::build_start(&self.interface, &self.args),
        }
    }
}

#[derive(Clone)]
pub struct ChaosEngine {
    docker: Arc<dyn DockerOps>,
    exec: ExecStrategy,
}

impl ChaosEngine {
    pub fn new(docker: Arc<dyn DockerOps>, exec: ExecStrategy) -> Self {
        Self { docker, exec }
    }

    /// Snapshot every running container accepted by `filter`.
    pub async fn list_containers(
        &self,
        filter: &ContainerFilter,
    ) -> Result<Vec<ContainerSnapshot>, DockerError> {
        debug!("Retrieving running containers");
        let mut selected = Vec::new();
        for id in self.docker.list_running().await? {
            let details = self.docker.inspect_container(&id).await?;
            let image_id = details.image.clone().unwrap_or_default();
            let image = self.docker.inspect_image(&image_id).await?;
            let snapshot = ContainerSnapshot::from_inspect(details, Some(&image));
            debug!(container_id = %snapshot.id, name = %snapshot.name, "Running container");
            if filter.matches(&snapshot) {
                selected.push(snapshot);
            }
        }
        Ok(selected)
    }

    /// Stop with the graceful signal, then SIGKILL; fails if the container
    /// is still running `timeout` after the SIGKILL.
    pub async fn stop(
        &self,
        target: &ContainerSnapshot,
        timeout: Duration,
        dry_run: bool,
    ) -> Result<(), ChaosError> {
        Intent::new(Operation::Stop, target, dry_run)
            .detail(format!(
                "signal={} timeout={}s",
                graceful_signal(target),
                timeout.as_secs()
            ))
            .emit();
        if dry_run {
            return Ok(());
        }
        StopSequence::new(self.docker.as_ref(), target, timeout).run().await
    }

    pub async fn kill(
        &self,
        target: &ContainerSnapshot,
        signal: &str,
        dry_run: bool,
    ) -> Result<(), ChaosError> {
        if signal.trim().is_empty() {
            return Err(ChaosError::invalid("killing", target, "signal must not be empty"));
        }
        Intent::new(Operation::Kill, target, dry_run)
            .detail(format!("signal={}", signal))
            .emit();
        if dry_run {
            return Ok(());
        }
        self.docker
            .kill_container(&target.id, signal)
            .await
            .map_err(|e| map_docker_error("killing", target, e))
    }

    /// Recreate the container from its stored config under its old name
    /// and start it.
    pub async fn start(&self, target: &ContainerSnapshot, dry_run: bool) -> Result<(), ChaosError> {
        let body = target
            .create_body()
            .ok_or_else(|| ChaosError::invalid("starting", target, "no stored container config"))?;
        Intent::new(Operation::Start, target, dry_run)
            .detail(format!("image={}", body.image.as_deref().unwrap_or_default()))
            .emit();
        if dry_run {
            return Ok(());
        }

        let new_id = self
            .docker
            .create_container(body, Some(&target.name))
            .await
            .map_err(|e| map_docker_error("recreating", target, e))?;
        debug!(name = %target.name, %new_id, "Starting recreated container");
        self.docker
            .start_container(&new_id)
            .await
            .map_err(|e| map_docker_error("starting", target, e))
    }

    pub async fn rename(
        &self,
        target: &ContainerSnapshot,
        new_name: &str,
        dry_run: bool,
    ) -> Result<(), ChaosError> {
        if new_name.trim().is_empty() {
            return Err(ChaosError::invalid("renaming", target, "new name must not be empty"));
        }
        Intent::new(Operation::Rename, target, dry_run)
            .detail(format!("new_name={}", new_name))
            .emit();
        if dry_run {
            return Ok(());
        }
        self.docker
            .rename_container(&target.id, new_name)
            .await
            .map_err(|e| map_docker_error("renaming", target, e))
    }

    /// Remove the image `target` was created from.
    pub async fn remove_image(
        &self,
        target: &ContainerSnapshot,
        force: bool,
        dry_run: bool,
    ) -> Result<(), ChaosError> {
        Intent::new(Operation::RemoveImage, target, dry_run)
            .detail(format!("image={} force={}", target.image_id, force))
            .emit();
        if dry_run {
            return Ok(());
        }
        self.docker
            .remove_image(&target.image_id, force)
            .await
            .map_err(|e| map_docker_error("removing image of", target, e))
    }

    pub async fn remove_container(
        &self,
        target: &ContainerSnapshot,
        opts: RemoveOptions,
        dry_run: bool,
    ) -> Result<(), ChaosError> {
        Intent::new(Operation::RemoveContainer, target, dry_run)
            .detail(format!(
                "force={} links={} volumes={}",
                opts.force, opts.remove_links, opts.remove_volumes
            ))
            .emit();
        if dry_run {
            return Ok(());
        }
        self.docker
            .remove_container(&target.id, opts)
            .await
            .map_err(|e| map_docker_error("removing", target, e))
    }

    pub async fn pause(&self, target: &ContainerSnapshot, dry_run: bool) -> Result<(), ChaosError> {
        Intent::new(Operation::Pause, target, dry_run).emit();
        if dry_run {
            return Ok(());
        }
        self.docker
            .pause_container(&target.id)
            .await
            .map_err(|e| map_docker_error("pausing", target, e))?;
        debug!(container_id = %target.id, "Container paused");
        Ok(())
    }

    pub async fn unpause(&self, target: &ContainerSnapshot, dry_run: bool) -> Result<(), ChaosError> {
        Intent::new(Operation::Unpause, target, dry_run).emit();
        if dry_run {
            return Ok(());
        }
        self.docker
            .unpause_container(&target.id)
            .await
            .map_err(|e| map_docker_error("unpausing", target, e))
    }

    /// Apply netem to `request.interface` inside `target`'s network namespace.
    pub async fn netem_start(
        &self,
        target: &ContainerSnapshot,
        request: &NetemRequest,
        dry_run: bool,
    ) -> Result<(), ChaosError> {
        if request.interface.trim().is_empty() {
            return Err(ChaosError::invalid("starting netem on", target, "interface must not be empty"));
        }
        if request.args.is_empty() {
            return Err(ChaosError::invalid("starting netem on", target, "netem arguments must not be empty"));
        }
        let commands = request.commands();
        Intent::new(Operation::NetemStart, target, dry_run)
            .detail(describe(&commands))
            .emit();
        if dry_run {
            return Ok(());
        }
        self.exec
            .run_all(self.docker.as_ref(), target, TC_BINARY, &commands)
            .await
    }

    /// Remove whatever netem layout `netem_start` installed on `interface`.
    pub async fn netem_stop(
        &self,
        target: &ContainerSnapshot,
        interface: &str,
        dry_run: bool,
    ) -> Result<(), ChaosError> {
        if interface.trim().is_empty() {
            return Err(ChaosError::invalid("stopping netem on", target, "interface must not be empty"));
        }
        let commands = netem::build_stop(interface);
        Intent::new(Operation::NetemStop, target, dry_run)
            .detail(describe(&commands))
            .emit();
        if dry_run {
            return Ok(());
        }
        self.exec
            .run_all(self.docker.as_ref(), target, TC_BINARY, &commands)
            .await
    }
}

fn describe(commands: &[TcCommand]) -> String {
    commands
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
