//! Model — AgentConfig and the action it drives.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::chaos::engine::DEFAULT_INTERFACE;
use crate::chaos::stop::KILL_SIGNAL;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/chaos-agent/agent.toml";
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Empty means the platform default socket.
    pub docker_socket: String,
    /// Image shipping `tc`; empty runs `tc` inside the target instead.
    pub tc_image: String,
    pub dry_run: bool,
    /// Container names, or a single `re2:<pattern>`. Empty selects all.
    pub containers: Vec<String>,
    pub action: ActionConfig,
}

/// What to do to every selected container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionConfig {
    Stop {
        #[serde(default = "default_stop_timeout")]
        timeout_secs: u64,
    },
    Kill {
        #[serde(default = "default_kill_signal")]
        signal: String,
    },
    Pause,
    Unpause,
    Remove {
        #[serde(default)]
        force: bool,
        #[serde(default)]
        links: bool,
        #[serde(default)]
        volumes: bool,
    },
    RemoveImage {
        #[serde(default)]
        force: bool,
    },
    NetemStart {
        #[serde(default = "default_interface")]
        interface: String,
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_ip: Option<IpAddr>,
    },
    NetemStop {
        #[serde(default = "default_interface")]
        interface: String,
    },
}

fn default_stop_timeout() -> u64 {
    DEFAULT_STOP_TIMEOUT_SECS
}

fn default_kill_signal() -> String {
    KILL_SIGNAL.to_string()
}

fn default_interface() -> String {
    DEFAULT_INTERFACE.to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            docker_socket: "".to_string(),
            tc_image: "".to_string(),
            dry_run: false,
            containers: Vec::new(),
            action: ActionConfig::default(),
        }
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        ActionConfig::Stop {
            timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
        }
    }
}

impl ActionConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ActionConfig::Stop { .. } => "stop",
            ActionConfig::Kill { .. } => "kill",
            ActionConfig::Pause => "pause",
            ActionConfig::Unpause => "unpause",
            ActionConfig::Remove { .. } => "remove",
            ActionConfig::RemoveImage { .. } => "remove_image",
            ActionConfig::NetemStart { .. } => "netem_start",
            ActionConfig::NetemStop { .. } => "netem_stop",
        }
    }

    /// Validate parameter values that would otherwise only fail per container
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ActionConfig::Kill { signal } if signal.trim().is_empty() => {
                Err("action.signal must not be empty".to_string())
            }
            ActionConfig::NetemStart { interface, args, .. } => {
                if interface.trim().is_empty() {
                    return Err("action.interface must not be empty".to_string());
                }
                if args.is_empty() {
                    return Err("action.args must list netem parameters, e.g. [\"delay\", \"100ms\"]".to_string());
                }
                Ok(())
            }
            ActionConfig::NetemStop { interface } if interface.trim().is_empty() => {
                Err("action.interface must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_defaults() {
        let cfg = AgentConfig::default();
        assert!(cfg.docker_socket.is_empty(), "Default docker_socket should be empty (use system default)");
        assert!(cfg.tc_image.is_empty());
        assert!(!cfg.dry_run);
        assert!(cfg.containers.is_empty());
        assert_eq!(cfg.action, ActionConfig::Stop { timeout_secs: 10 });
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let toml_str = r#"
            dry_run = true
            containers = ["web", "db"]

            [action]
            kind = "kill"
        "#;
        let cfg: AgentConfig = toml::from_str(toml_str).expect("Should accept partial TOML");
        assert!(cfg.dry_run);
        assert_eq!(cfg.containers, vec!["web", "db"]);
        assert_eq!(cfg.action, ActionConfig::Kill { signal: "SIGKILL".into() });
        assert!(cfg.tc_image.is_empty()); // default
    }

    #[test]
    fn test_deserialize_netem_start() {
        let toml_str = r#"
            tc_image = "gaiadocker/iproute2"

            [action]
            kind = "netem_start"
            args = ["delay", "100ms"]
            target_ip = "10.0.0.5"
        "#;
        let cfg: AgentConfig = toml::from_str(toml_str).expect("Should parse netem action");
        match cfg.action {
            ActionConfig::NetemStart { interface, args, target_ip } => {
                assert_eq!(interface, "eth0");
                assert_eq!(args, vec!["delay", "100ms"]);
                assert_eq!(target_ip, Some("10.0.0.5".parse().unwrap()));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_unit_actions() {
        let cfg: AgentConfig = toml::from_str("[action]\nkind = \"pause\"").unwrap();
        assert_eq!(cfg.action, ActionConfig::Pause);
        assert_eq!(cfg.action.name(), "pause");
    }

    #[test]
    fn test_deserialize_rejects_unknown_action() {
        let result: Result<AgentConfig, _> = toml::from_str("[action]\nkind = \"explode\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_signal() {
        let action = ActionConfig::Kill { signal: " ".into() };
        let err = action.validate().unwrap_err();
        assert!(err.contains("signal"), "Error should mention signal: {}", err);
    }

    #[test]
    fn test_validate_rejects_empty_netem_args() {
        let action = ActionConfig::NetemStart {
            interface: "eth0".into(),
            args: vec![],
            target_ip: None,
        };
        assert!(action.validate().unwrap_err().contains("args"));
    }

    #[test]
    fn test_validate_rejects_empty_interface() {
        let action = ActionConfig::NetemStop { interface: "".into() };
        assert!(action.validate().unwrap_err().contains("interface"));
    }

    #[test]
    fn test_toml_round_trip() {
        let cfg = AgentConfig {
            containers: vec!["re2:^web-".into()],
            action: ActionConfig::Remove { force: true, links: false, volumes: true },
            ..Default::default()
        };
        let toml_str = toml::to_string(&cfg).expect("Should serialize to TOML");
        let deserialized: AgentConfig = toml::from_str(&toml_str).expect("Should deserialize from TOML");
        assert_eq!(deserialized.containers, cfg.containers);
        assert_eq!(deserialized.action, cfg.action);
    }
}
