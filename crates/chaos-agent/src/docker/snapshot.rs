use std::collections::HashMap;

use bollard::models::{ContainerCreateBody, ContainerInspectResponse, HostConfig, ImageInspect};

/// Label that excludes a container from chaos selection. Helper containers
/// carry it so that they never become targets themselves.
pub const SKIP_LABEL: &str = "chaos-agent.skip";

/// Point-in-time view of a container, captured when it was listed.
///
/// Never mutated by chaos operations; live state belongs to the daemon and
/// may have moved on since `captured_at`.
#[derive(Debug, Clone)]
pub struct ContainerSnapshot {
    pub id: String,          // Full container ID 64-char hash
    pub name: String,        // Without leading slash
    pub image_id: String,
    pub image_name: String,  // First repo tag, or the image reference from config
    pub stop_signal: String, // Empty means the daemon default
    pub labels: HashMap<String, String>,
    /// Config the container was created with, shaped as a create request.
    pub runtime_config: Option<ContainerCreateBody>,
    pub host_config: Option<HostConfig>,
    pub captured_at: i64, // Unix timestamp
}

impl ContainerSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_id: image_id.into(),
            image_name: String::new(),
            stop_signal: String::new(),
            labels: HashMap::new(),
            runtime_config: None,
            host_config: None,
            captured_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_stop_signal(mut self, signal: impl Into<String>) -> Self {
        self.stop_signal = signal.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_runtime_config(mut self, body: ContainerCreateBody) -> Self {
        self.runtime_config = Some(body);
        self
    }

    /// Build from container inspection plus (optionally) its image.
    pub fn from_inspect(details: ContainerInspectResponse, image: Option<&ImageInspect>) -> Self {
        let config = details.config.unwrap_or_default();

        // ContainerConfig and ContainerCreateBody share the Engine API JSON
        // shape; going through serde keeps the blob uninterpreted here.
        let runtime_config = serde_json::to_value(&config)
            .and_then(serde_json::from_value::<ContainerCreateBody>)
            .map_err(|e| tracing::debug!(error = %e, "Container config not re-encodable"))
            .ok();

        let image_name = image
            .and_then(|i| i.repo_tags.as_ref())
            .and_then(|tags| tags.first().cloned())
            .or_else(|| config.image.clone())
            .unwrap_or_default();

        Self {
            id: details.id.unwrap_or_default(),
            name: details
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_else(|| "unknown".into()),
            image_id: details.image.unwrap_or_default(),
            image_name,
            stop_signal: config.stop_signal.clone().unwrap_or_default(),
            labels: config.labels.clone().unwrap_or_default(),
            runtime_config,
            host_config: details.host_config,
            captured_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Create request that recreates this container with its stored config.
    pub fn create_body(&self) -> Option<ContainerCreateBody> {
        let mut body = self.runtime_config.clone()?;
        body.host_config = self.host_config.clone();
        Some(body)
    }

    pub fn is_skipped(&self) -> bool {
        self.labels.get(SKIP_LABEL).is_some_and(|v| v == "true")
    }
}

/// Running flag from an inspect response; absent state counts as not running.
pub fn is_running(details: &ContainerInspectResponse) -> bool {
    details
        .state
        .as_ref()
        .and_then(|s| s.running)
        .unwrap_or(false)
}

impl std::fmt::Display for ContainerSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig, ContainerState};

    fn inspect_fixture() -> ContainerInspectResponse {
        ContainerInspectResponse {
            id: Some("abc123".into()),
            name: Some("/web".into()),
            image: Some("sha256:feed".into()),
            config: Some(ContainerConfig {
                image: Some("nginx:1.27".into()),
                stop_signal: Some("SIGQUIT".into()),
                cmd: Some(vec!["nginx".into(), "-g".into(), "daemon off;".into()]),
                labels: Some(HashMap::from([("tier".to_string(), "front".to_string())])),
                ..Default::default()
            }),
            host_config: Some(HostConfig {
                network_mode: Some("bridge".into()),
                ..Default::default()
            }),
            state: Some(ContainerState {
                running: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_inspect_strips_leading_slash() {
        let snap = ContainerSnapshot::from_inspect(inspect_fixture(), None);
        assert_eq!(snap.id, "abc123");
        assert_eq!(snap.name, "web");
        assert_eq!(snap.image_id, "sha256:feed");
    }

    #[test]
    fn test_from_inspect_reads_stop_signal_and_labels() {
        let snap = ContainerSnapshot::from_inspect(inspect_fixture(), None);
        assert_eq!(snap.stop_signal, "SIGQUIT");
        assert_eq!(snap.labels.get("tier").map(String::as_str), Some("front"));
    }

    #[test]
    fn test_from_inspect_missing_stop_signal_is_empty() {
        let mut details = inspect_fixture();
        if let Some(cfg) = details.config.as_mut() {
            cfg.stop_signal = None;
        }
        let snap = ContainerSnapshot::from_inspect(details, None);
        assert!(snap.stop_signal.is_empty());
    }

    #[test]
    fn test_image_name_prefers_repo_tag() {
        let image = ImageInspect {
            repo_tags: Some(vec!["nginx:latest".into()]),
            ..Default::default()
        };
        let snap = ContainerSnapshot::from_inspect(inspect_fixture(), Some(&image));
        assert_eq!(snap.image_name, "nginx:latest");

        let untagged = ContainerSnapshot::from_inspect(inspect_fixture(), None);
        assert_eq!(untagged.image_name, "nginx:1.27");
    }

    #[test]
    fn test_create_body_carries_config_and_host_config() {
        let snap = ContainerSnapshot::from_inspect(inspect_fixture(), None);
        let body = snap.create_body().expect("config should re-encode");
        assert_eq!(body.image.as_deref(), Some("nginx:1.27"));
        assert_eq!(body.cmd.as_ref().map(Vec::len), Some(3));
        assert_eq!(
            body.host_config.and_then(|h| h.network_mode).as_deref(),
            Some("bridge")
        );
    }

    #[test]
    fn test_create_body_none_without_config() {
        let snap = ContainerSnapshot::new("abc", "web", "sha256:feed");
        assert!(snap.create_body().is_none());
    }

    #[test]
    fn test_is_running() {
        assert!(is_running(&inspect_fixture()));
        assert!(!is_running(&ContainerInspectResponse::default()));
    }

    #[test]
    fn test_skip_label() {
        let snap = ContainerSnapshot::new("abc", "web", "img").with_label(SKIP_LABEL, "true");
        assert!(snap.is_skipped());
        let other = ContainerSnapshot::new("abc", "web", "img").with_label(SKIP_LABEL, "false");
        assert!(!other.is_skipped());
    }

    #[test]
    fn test_captured_at_is_listing_time() {
        let before = chrono::Utc::now().timestamp();
        let snap = ContainerSnapshot::from_inspect(inspect_fixture(), None);
        assert!(snap.captured_at >= before);
        assert!(snap.captured_at <= chrono::Utc::now().timestamp());
    }

    #[test]
    fn test_display_names_container() {
        let snap = ContainerSnapshot::new("abc123", "web", "img");
        assert_eq!(snap.to_string(), "web (abc123)");
    }
}
