// anomaly-sim/src/scenarios/network_test.rs
// Repeated outbound TCP connects; failures are reported, never fatal

use crate::action::Action;
use crate::error::Result;
use crate::phase::{Checkpoints, FailurePolicy, Intensity, Phase, PhaseKind, Step};
use crate::plan::{Cleanup, ScenarioPlan};
use crate::sim_error;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkTestParams {
    pub addr: String,
    pub delay_ms: u64,
    /// Wait after the socket itself cannot be created
    pub retry_delay_ms: u64,
}

impl Default for NetworkTestParams {
    fn default() -> Self {
        Self {
            addr: "8.8.8.8:53".to_string(),
            delay_ms: 3000,
            retry_delay_ms: 2000,
        }
    }
}

impl NetworkTestParams {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.addr.parse().map_err(|e| {
            sim_error!(
                config,
                "network_test.addr",
                format!("'{}' is not a socket address: {}", self.addr, e)
            )
        })
    }
}

pub fn plan(params: &NetworkTestParams) -> Result<ScenarioPlan> {
    let addr = params.socket_addr()?;
    Ok(ScenarioPlan::new("network-test", "Network test")
        .note(format!("🌐 Connecting to {} every {}ms", addr, params.delay_ms))
        .cleanup(Cleanup::Abandon)
        .phase(
            Phase::new(PhaseKind::Attack, "connect")
                .describe("Outbound connection attempts...")
                .unbounded()
                .step(Step::new(Action::ConnectSocket { addr }, Intensity::Fixed(1)))
                .every(Duration::from_millis(params.delay_ms))
                .on_failure(FailurePolicy::RetryAfter(Duration::from_millis(
                    params.retry_delay_ms,
                )))
                .checkpoints(Checkpoints::Never),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimError;

    #[test]
    fn test_bad_address_is_a_config_error() {
        let params = NetworkTestParams {
            addr: "dns.google".to_string(),
            ..NetworkTestParams::default()
        };
        assert!(matches!(plan(&params), Err(SimError::Config { .. })));
    }

    #[test]
    fn test_default_targets_public_dns() {
        let plan = plan(&NetworkTestParams::default()).unwrap();
        assert!(!plan.is_bounded());
        assert_eq!(
            plan.phases[0].steps[0].action,
            Action::ConnectSocket {
                addr: "8.8.8.8:53".parse().unwrap()
            }
        );
    }
}
