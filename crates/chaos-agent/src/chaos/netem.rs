//! Netem — traffic-control command synthesis.
//!
//! Pure functions that produce the argument lists for `tc`. Nothing here
//! touches Docker; the executor runs the commands in the order returned.
//!
//! Scoping to a single destination uses a `prio` root (bands 1:1..1:3),
//! hangs `netem` under band 1:3 only, and steers matching packets into
//! that band with a `u32` filter. Unmatched traffic keeps flowing through
//! the default bands untouched.

use std::fmt;
use std::net::IpAddr;

/// Binary every command is handed to.
pub const TC_BINARY: &str = "tc";

/// Root handle of the priority qdisc used for filtered disruption.
const PRIO_HANDLE: &str = "1:";
/// Band that receives filtered traffic.
const NETEM_BAND: &str = "1:3";

/// One `tc` invocation, arguments only (no binary name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcCommand(Vec<String>);

impl TcCommand {
    fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    fn extended(mut self, extra: &[String]) -> Self {
        self.0.extend(extra.iter().cloned());
        self
    }

    pub fn args(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for TcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", TC_BINARY, self.0.join(" "))
    }
}

/// Add `netem` as the root qdisc of `interface`; `netem_args` are passed
/// through verbatim (`delay 100ms`, `loss 10%`, `rate 1mbit`, ...).
pub fn build_start(interface: &str, netem_args: &[String]) -> Vec<TcCommand> {
    vec![TcCommand::new(["qdisc", "add", "dev", interface, "root", "netem"]).extended(netem_args)]
}

/// Same disruption, limited to packets addressed to `destination`.
///
/// The three commands depend on each other and must run in order.
pub fn build_start_filtered(
    interface: &str,
    netem_args: &[String],
    destination: IpAddr,
) -> Vec<TcCommand> {
    let destination = destination.to_string().to_lowercase();
    vec![
        TcCommand::new(["qdisc", "add", "dev", interface, "root", "handle", PRIO_HANDLE, "prio"]),
        TcCommand::new(["qdisc", "add", "dev", interface, "parent", NETEM_BAND, "netem"])
            .extended(netem_args),
        TcCommand::new([
            "filter", "add", "dev", interface, "protocol", "ip", "parent", "1:0", "prio", "3",
            "u32", "match", "ip", "dport", destination.as_str(), "flowid", NETEM_BAND,
        ]),
    ]
}

/// Delete the root qdisc; covers both the plain and the filtered layout.
pub fn build_stop(interface: &str) -> Vec<TcCommand> {
    vec![TcCommand::new(["qdisc", "del", "dev", interface, "root", "netem"])]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_start_single_command() {
        let cmds = build_start("eth0", &args(&["loss", "10%"]));
        assert_eq!(cmds.len(), 1);
        assert_eq!(
            cmds[0].args(),
            args(&["qdisc", "add", "dev", "eth0", "root", "netem", "loss", "10%"]).as_slice()
        );
    }

    #[test]
    fn test_build_start_filtered_order() {
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        let cmds = build_start_filtered("eth0", &args(&["delay", "100ms"]), ip);
        assert_eq!(cmds.len(), 3);
        assert_eq!(
            cmds[0].args(),
            args(&["qdisc", "add", "dev", "eth0", "root", "handle", "1:", "prio"]).as_slice()
        );
        assert_eq!(
            cmds[1].args(),
            args(&["qdisc", "add", "dev", "eth0", "parent", "1:3", "netem", "delay", "100ms"])
                .as_slice()
        );
        assert_eq!(
            cmds[2].args(),
            args(&[
                "filter", "add", "dev", "eth0", "protocol", "ip", "parent", "1:0", "prio", "3",
                "u32", "match", "ip", "dport", "10.0.0.5", "flowid", "1:3",
            ])
            .as_slice()
        );
    }

    #[test]
    fn test_build_start_filtered_ipv6_lowercase() {
        let ip: IpAddr = "FE80::1".parse().unwrap();
        let cmds = build_start_filtered("eth1", &args(&["corrupt", "5%"]), ip);
        assert!(cmds[2].args().contains(&"fe80::1".to_string()));
        assert!(cmds.iter().all(|c| c.args()[3] == "eth1"));
    }

    #[test]
    fn test_build_stop() {
        let cmds = build_stop("eth0");
        assert_eq!(cmds.len(), 1);
        assert_eq!(
            cmds[0].args(),
            args(&["qdisc", "del", "dev", "eth0", "root", "netem"]).as_slice()
        );
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        assert_eq!(build_stop("eth0"), build_stop("eth0"));
        let a = build_start("eth0", &args(&["rate", "1mbit"]));
        let b = build_start("eth0", &args(&["rate", "1mbit"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_includes_binary() {
        let cmds = build_start("eth0", &args(&["delay", "100ms"]));
        assert_eq!(cmds[0].to_string(), "tc qdisc add dev eth0 root netem delay 100ms");
    }
}
