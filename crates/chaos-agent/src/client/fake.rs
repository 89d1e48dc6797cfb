//! Fake — test double for Docker operations.
//!
//! Provides a deterministic [`FakeDocker`] that implements [`DockerOps`]
//! using in-memory state and records every call it receives, so tests can
//! assert on call order (signal sequencing, tc command order) and on the
//! absence of calls (dry runs).

use std::collections::HashMap;
use std::pin::Pin;

use bollard::models::{
    ContainerConfig, ContainerCreateBody, ContainerInspectResponse, ContainerState, ImageInspect,
};
use tokio::sync::Mutex;

use crate::client::docker::DockerOps;
use crate::docker::client::DockerError;
use crate::docker::container::RemoveOptions;

// ── In-memory state ─────────────────────────────────────────────

/// A canned container for the fake store, with scripted behaviour.
#[derive(Clone, Debug, Default)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub image_id: String,
    pub stop_signal: Option<String>,
    pub labels: HashMap<String, String>,
    pub running: bool,
    pub paused: bool,
    /// Binaries present inside the container (`which` succeeds for these).
    pub tools: Vec<String>,
    /// Signals the main process survives.
    pub ignored_signals: Vec<String>,
    /// Disappear from the daemon instead of exiting when a signal lands.
    pub vanish_on_kill: bool,
}

impl FakeContainer {
    pub fn running(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            image_id: format!("sha256:{}", name),
            running: true,
            ..Default::default()
        }
    }

    pub fn with_tool(mut self, tool: &str) -> Self {
        self.tools.push(tool.to_string());
        self
    }

    pub fn ignoring(mut self, signals: &[&str]) -> Self {
        self.ignored_signals.extend(signals.iter().map(|s| s.to_string()));
        self
    }

    pub fn vanishing_on_kill(mut self) -> Self {
        self.vanish_on_kill = true;
        self
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    fn inspect(&self) -> ContainerInspectResponse {
        ContainerInspectResponse {
            id: Some(self.id.clone()),
            name: Some(format!("/{}", self.name)),
            image: Some(self.image_id.clone()),
            config: Some(ContainerConfig {
                image: Some(self.image_id.clone()),
                stop_signal: self.stop_signal.clone(),
                labels: Some(self.labels.clone()),
                ..Default::default()
            }),
            state: Some(ContainerState {
                running: Some(self.running),
                paused: Some(self.paused),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// One recorded call against the fake, in arrival order.
#[derive(Clone, Debug)]
pub enum FakeCall {
    ListRunning,
    InspectContainer(String),
    InspectImage(String),
    CreateContainer {
        name: Option<String>,
        body: Box<ContainerCreateBody>,
    },
    StartContainer(String),
    RenameContainer { id: String, new_name: String },
    Kill { id: String, signal: String },
    RemoveContainer { id: String, opts: RemoveOptions },
    RemoveImage { id: String, force: bool },
    Pause(String),
    Unpause(String),
    CreateExec {
        container_id: String,
        cmd: Vec<String>,
        privileged: bool,
    },
    StartExec(String),
    InspectExec(String),
}

#[derive(Clone, Debug)]
struct FakeExec {
    container_id: String,
    cmd: Vec<String>,
    exit_code: Option<i64>,
}

/// Mutable inner state protected by a mutex.
#[derive(Default)]
struct Inner {
    containers: HashMap<String, FakeContainer>,
    images: HashMap<String, ImageInspect>,
    execs: HashMap<String, FakeExec>,
    calls: Vec<FakeCall>,
    failing_commands: Vec<String>,
    unavailable: bool,
    next_id: u64,
}

impl Inner {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn container_mut(&mut self, id: &str) -> Result<&mut FakeContainer, DockerError> {
        self.containers
            .get_mut(id)
            .ok_or_else(|| DockerError::ContainerNotFound(id.to_string()))
    }

    fn name_taken(&self, name: &str, except: &str) -> bool {
        self.containers
            .values()
            .any(|c| c.name == name && c.id != except)
    }

    fn check_available(&self) -> Result<(), DockerError> {
        if self.unavailable {
            Err(DockerError::ConnectionFailed(
                "fake daemon is unreachable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

fn conflict(message: String) -> DockerError {
    DockerError::BollardError(bollard::errors::Error::DockerResponseServerError {
        status_code: 409,
        message,
    })
}

/// A fake Docker client for deterministic testing.
///
/// All methods operate on in-memory state. The builder methods allow
/// pre-populating containers and images before running test code.
pub struct FakeDocker {
    inner: Mutex<Inner>,
}

impl FakeDocker {
    /// Create an empty fake Docker client.
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    /// Seed a container into the fake store.
    pub async fn add_container(&self, container: FakeContainer) {
        let mut state = self.inner.lock().await;
        state.containers.insert(container.id.clone(), container);
    }

    /// Seed an image with the given repo tags.
    pub async fn add_image(&self, image_id: &str, tags: &[&str]) {
        let image = ImageInspect {
            id: Some(image_id.to_string()),
            repo_tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            ..Default::default()
        };
        self.inner.lock().await.images.insert(image_id.to_string(), image);
    }

    /// Any exec whose joined command line contains `pattern` exits non-zero.
    pub async fn fail_commands_matching(&self, pattern: &str) {
        self.inner.lock().await.failing_commands.push(pattern.to_string());
    }

    /// Make every subsequent call fail as if the daemon socket were gone.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// Everything received so far, in order.
    pub async fn calls(&self) -> Vec<FakeCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Signals delivered to `id`, in order.
    pub async fn signals_sent(&self, id: &str) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                FakeCall::Kill { id: target, signal } if target == id => Some(signal),
                _ => None,
            })
            .collect()
    }

    /// Commands exec'd inside `id`, in order, with their privileged flag.
    pub async fn exec_commands(&self, id: &str) -> Vec<(Vec<String>, bool)> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                FakeCall::CreateExec { container_id, cmd, privileged } if container_id == id => {
                    Some((cmd, privileged))
                }
                _ => None,
            })
            .collect()
    }

    /// Bodies of every container created (helpers and recreations).
    pub async fn created_bodies(&self) -> Vec<ContainerCreateBody> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                FakeCall::CreateContainer { body, .. } => Some(*body),
                _ => None,
            })
            .collect()
    }

    /// Current copy of a stored container, if it still exists.
    pub async fn container(&self, id: &str) -> Option<FakeContainer> {
        self.inner.lock().await.containers.get(id).cloned()
    }

    pub async fn has_image(&self, image_id: &str) -> bool {
        self.inner.lock().await.images.contains_key(image_id)
    }
}

impl Default for FakeDocker {
    fn default() -> Self {
        Self::new()
    }
}

// ── DockerOps implementation ────────────────────────────────────

impl DockerOps for FakeDocker {
    // ── Container queries ───────────────────────────────────────

    fn list_running(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<String>, DockerError>> + Send + '_>> {
        Box::pin(async {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::ListRunning);
            state.check_available()?;
            let mut ids: Vec<String> = state
                .containers
                .values()
                .filter(|c| c.running)
                .map(|c| c.id.clone())
                .collect();
            ids.sort();
            Ok(ids)
        })
    }

    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerInspectResponse, DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::InspectContainer(id.to_string()));
            state.check_available()?;
            state
                .containers
                .get(id)
                .map(FakeContainer::inspect)
                .ok_or_else(|| DockerError::ContainerNotFound(id.to_string()))
        })
    }

    fn inspect_image<'a>(
        &'a self,
        image_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ImageInspect, DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::InspectImage(image_id.to_string()));
            state.check_available()?;
            state
                .images
                .get(image_id)
                .cloned()
                .ok_or_else(|| DockerError::ImageNotFound(image_id.to_string()))
        })
    }

    // ── Container lifecycle ─────────────────────────────────────

    fn create_container<'a>(
        &'a self,
        body: ContainerCreateBody,
        name: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::CreateContainer {
                name: name.map(str::to_string),
                body: Box::new(body.clone()),
            });
            state.check_available()?;

            if let Some(n) = name {
                if state.name_taken(n, "") {
                    return Err(conflict(format!("container name \"/{}\" is already in use", n)));
                }
            }

            let id = state.fresh_id("fake");
            let container = FakeContainer {
                id: id.clone(),
                name: name.map(str::to_string).unwrap_or_else(|| id.clone()),
                image_id: body.image.clone().unwrap_or_default(),
                stop_signal: body.stop_signal.clone(),
                labels: body.labels.clone().unwrap_or_default(),
                ..Default::default()
            };
            state.containers.insert(id.clone(), container);
            Ok(id)
        })
    }

    fn start_container<'a>(
        &'a self,
        container_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::StartContainer(container_id.to_string()));
            state.check_available()?;
            state.container_mut(container_id)?.running = true;
            Ok(())
        })
    }

    fn rename_container<'a>(
        &'a self,
        container_id: &'a str,
        new_name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::RenameContainer {
                id: container_id.to_string(),
                new_name: new_name.to_string(),
            });
            state.check_available()?;
            if state.name_taken(new_name, container_id) {
                return Err(conflict(format!("name \"{}\" is already in use", new_name)));
            }
            state.container_mut(container_id)?.name = new_name.to_string();
            Ok(())
        })
    }

    fn kill_container<'a>(
        &'a self,
        container_id: &'a str,
        signal: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::Kill {
                id: container_id.to_string(),
                signal: signal.to_string(),
            });
            state.check_available()?;
            let container = state.container_mut(container_id)?;
            if !container.running {
                return Err(conflict(format!("container {} is not running", container_id)));
            }
            if container.ignored_signals.iter().any(|s| s == signal) {
                return Ok(());
            }
            if container.vanish_on_kill {
                state.containers.remove(container_id);
            } else {
                state.container_mut(container_id)?.running = false;
            }
            Ok(())
        })
    }

    fn remove_container<'a>(
        &'a self,
        container_id: &'a str,
        opts: RemoveOptions,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::RemoveContainer {
                id: container_id.to_string(),
                opts,
            });
            state.check_available()?;
            let running = state.container_mut(container_id)?.running;
            if running && !opts.force {
                return Err(conflict(format!(
                    "cannot remove running container {}, stop it first or use force",
                    container_id
                )));
            }
            state.containers.remove(container_id);
            Ok(())
        })
    }

    fn pause_container<'a>(
        &'a self,
        container_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::Pause(container_id.to_string()));
            state.check_available()?;
            let container = state.container_mut(container_id)?;
            if !container.running {
                return Err(conflict(format!("container {} is not running", container_id)));
            }
            container.paused = true;
            Ok(())
        })
    }

    fn unpause_container<'a>(
        &'a self,
        container_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::Unpause(container_id.to_string()));
            state.check_available()?;
            let container = state.container_mut(container_id)?;
            if !container.paused {
                return Err(conflict(format!("container {} is not paused", container_id)));
            }
            container.paused = false;
            Ok(())
        })
    }

    // ── Images ──────────────────────────────────────────────────

    fn remove_image<'a>(
        &'a self,
        image_id: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::RemoveImage {
                id: image_id.to_string(),
                force,
            });
            state.check_available()?;
            if !state.images.contains_key(image_id) {
                return Err(DockerError::ImageNotFound(image_id.to_string()));
            }
            let in_use = state.containers.values().any(|c| c.image_id == image_id);
            if in_use && !force {
                return Err(conflict(format!(
                    "unable to delete {} (must be forced) - image is being used by a container",
                    image_id
                )));
            }
            state.images.remove(image_id);
            Ok(())
        })
    }

    // ── Exec ────────────────────────────────────────────────────

    fn create_exec<'a>(
        &'a self,
        container_id: &'a str,
        cmd: Vec<String>,
        privileged: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::CreateExec {
                container_id: container_id.to_string(),
                cmd: cmd.clone(),
                privileged,
            });
            state.check_available()?;
            if !state.containers.get(container_id).is_some_and(|c| c.running) {
                return Err(DockerError::ContainerNotFound(container_id.to_string()));
            }
            let id = state.fresh_id("exec");
            state.execs.insert(
                id.clone(),
                FakeExec {
                    container_id: container_id.to_string(),
                    cmd,
                    exit_code: None,
                },
            );
            Ok(id)
        })
    }

    fn start_exec<'a>(
        &'a self,
        exec_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::StartExec(exec_id.to_string()));
            state.check_available()?;
            let exec = state
                .execs
                .get(exec_id)
                .cloned()
                .ok_or_else(|| DockerError::ExecNotFound(exec_id.to_string()))?;

            let tools = state
                .containers
                .get(&exec.container_id)
                .map(|c| c.tools.clone())
                .unwrap_or_default();
            let has = |tool: &str| tools.iter().any(|t| t == tool);
            let line = exec.cmd.join(" ");

            let code = match exec.cmd.first().map(String::as_str) {
                Some("which") => match exec.cmd.get(1) {
                    Some(tool) if has(tool) => 0,
                    _ => 1,
                },
                Some(bin) if !has(bin) => 127,
                Some(_) if state.failing_commands.iter().any(|p| line.contains(p.as_str())) => 2,
                Some(_) => 0,
                None => 126,
            };
            if let Some(e) = state.execs.get_mut(exec_id) {
                e.exit_code = Some(code);
            }
            Ok(())
        })
    }

    fn inspect_exec<'a>(
        &'a self,
        exec_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<i64, DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.calls.push(FakeCall::InspectExec(exec_id.to_string()));
            state.check_available()?;
            state
                .execs
                .get(exec_id)
                .map(|e| e.exit_code.unwrap_or(-1))
                .ok_or_else(|| DockerError::ExecNotFound(exec_id.to_string()))
        })
    }
}
