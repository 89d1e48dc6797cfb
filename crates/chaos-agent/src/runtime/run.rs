//! Run — select containers and apply the configured action to each.

use std::time::Duration;

use futures_util::future::join_all;
use tracing::{error, info, warn};

use crate::chaos::engine::{ChaosEngine, NetemRequest};
use crate::chaos::error::ChaosError;
use crate::conf::{ActionConfig, AgentConfig};
use crate::docker::container::RemoveOptions;
use crate::docker::snapshot::ContainerSnapshot;
use crate::filter::engine::ContainerFilter;

/// Apply `action` to a single container.
pub async fn apply(
    engine: &ChaosEngine,
    target: &ContainerSnapshot,
    action: &ActionConfig,
    dry_run: bool,
) -> Result<(), ChaosError> {
    match action {
        ActionConfig::Stop { timeout_secs } => {
            engine.stop(target, Duration::from_secs(*timeout_secs), dry_run).await
        }
        ActionConfig::Kill { signal } => engine.kill(target, signal, dry_run).await,
        ActionConfig::Pause => engine.pause(target, dry_run).await,
        ActionConfig::Unpause => engine.unpause(target, dry_run).await,
        ActionConfig::Remove { force, links, volumes } => {
            let opts = RemoveOptions {
                force: *force,
                remove_links: *links,
                remove_volumes: *volumes,
            };
            engine.remove_container(target, opts, dry_run).await
        }
        ActionConfig::RemoveImage { force } => engine.remove_image(target, *force, dry_run).await,
        ActionConfig::NetemStart { interface, args, target_ip } => {
            let request = NetemRequest {
                interface: interface.clone(),
                args: args.clone(),
                target_ip: *target_ip,
            };
            engine.netem_start(target, &request, dry_run).await
        }
        ActionConfig::NetemStop { interface } => engine.netem_stop(target, interface, dry_run).await,
    }
}

/// List the selected containers and apply the action to all of them
/// concurrently. Returns the per-container failures.
pub async fn run(
    engine: &ChaosEngine,
    config: &AgentConfig,
) -> Result<Vec<ChaosError>, Box<dyn std::error::Error>> {
    let filter = ContainerFilter::new(&config.containers)?;
    let targets = engine.list_containers(&filter).await?;
    if targets.is_empty() {
        warn!("No running containers matched {:?}", config.containers);
        return Ok(Vec::new());
    }
    info!("Applying {} to {} container(s)", config.action.name(), targets.len());

    let results = join_all(
        targets
            .iter()
            .map(|target| apply(engine, target, &config.action, config.dry_run)),
    )
    .await;

    let failures: Vec<ChaosError> = results.into_iter().filter_map(Result::err).collect();
    for failure in &failures {
        error!(container_id = %failure.container_id(), "{}", failure);
    }
    info!(
        "Finished {}: {} succeeded, {} failed",
        config.action.name(),
        targets.len() - failures.len(),
        failures.len()
    );
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::chaos::exec::ExecStrategy;
    use crate::client::fake::{FakeContainer, FakeDocker};

    async fn fixture() -> (Arc<FakeDocker>, ChaosEngine) {
        let fake = Arc::new(FakeDocker::new());
        for (id, name) in [("a1", "web-1"), ("a2", "web-2"), ("b1", "db")] {
            fake.add_container(FakeContainer::running(id, name)).await;
            fake.add_image(&format!("sha256:{}", name), &[]).await;
        }
        let engine = ChaosEngine::new(fake.clone(), ExecStrategy::InNamespace);
        (fake, engine)
    }

    fn config(containers: &[&str], action: ActionConfig) -> AgentConfig {
        AgentConfig {
            containers: containers.iter().map(|c| c.to_string()).collect(),
            action,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_pauses_matching_containers() {
        let (fake, engine) = fixture().await;
        let failures = run(&engine, &config(&["re2:^web-"], ActionConfig::Pause))
            .await
            .unwrap();

        assert!(failures.is_empty());
        assert!(fake.container("a1").await.unwrap().paused);
        assert!(fake.container("a2").await.unwrap().paused);
        assert!(!fake.container("b1").await.unwrap().paused);
    }

    #[tokio::test]
    async fn test_run_collects_failures() {
        let (fake, engine) = fixture().await;
        // `which tc` fails everywhere: no container ships tc.
        let action = ActionConfig::NetemStart {
            interface: "eth0".into(),
            args: vec!["delay".into(), "100ms".into()],
            target_ip: None,
        };
        let failures = run(&engine, &config(&["web-1", "db"], action)).await.unwrap();

        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|f| matches!(f, ChaosError::ToolMissing { .. })));
        assert!(fake.exec_commands("a2").await.is_empty());
    }

    #[tokio::test]
    async fn test_run_dry_run_touches_nothing() {
        let (fake, engine) = fixture().await;
        let mut cfg = config(&[], ActionConfig::Kill { signal: "SIGKILL".into() });
        cfg.dry_run = true;

        let failures = run(&engine, &cfg).await.unwrap();
        assert!(failures.is_empty());
        for id in ["a1", "a2", "b1"] {
            assert!(fake.signals_sent(id).await.is_empty());
            assert!(fake.container(id).await.unwrap().running);
        }
    }

    #[tokio::test]
    async fn test_run_no_match_is_not_an_error() {
        let (_fake, engine) = fixture().await;
        let failures = run(&engine, &config(&["cache"], ActionConfig::Pause)).await.unwrap();
        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn test_run_invalid_regex_is_error() {
        let (_fake, engine) = fixture().await;
        assert!(run(&engine, &config(&["re2:("], ActionConfig::Pause)).await.is_err());
    }

    #[tokio::test]
    async fn test_run_daemon_unavailable_is_error() {
        let (fake, engine) = fixture().await;
        fake.set_unavailable(true).await;
        assert!(run(&engine, &config(&[], ActionConfig::Pause)).await.is_err());
    }

    #[tokio::test]
    async fn test_apply_remove_maps_flags() {
        let (fake, engine) = fixture().await;
        let target = ContainerSnapshot::new("b1", "db", "sha256:db");
        let action = ActionConfig::Remove { force: true, links: false, volumes: true };

        apply(&engine, &target, &action, false).await.unwrap();
        assert!(fake.container("b1").await.is_none());
    }
}
