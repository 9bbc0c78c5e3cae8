use anyhow::Result;
use k8s_openapi::api::core::v1::{ContainerStatus, Pod as KubePod};
use kube::ResourceExt as _;

use crate::session::Pod;

const UNKNOWN_STATUS: &str = "Unknown";

/// Converts an API pod into the session's pod record. The full object is kept
/// as `raw` for describe.
pub fn to_session_pod(pod: &KubePod) -> Result<Pod> {
    let container_statuses = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or_default();

    Ok(Pod {
        name: pod.name_any(),
        namespace: pod.namespace().unwrap_or_default(),
        status: status(pod, container_statuses),
        ready: !container_statuses.is_empty() && container_statuses.iter().all(|cs| cs.ready),
        restarts: container_statuses.iter().map(|cs| cs.restart_count).sum(),
        creation_timestamp: pod.metadata.creation_timestamp.as_ref().map(|t| t.0),
        node: pod
            .spec
            .as_ref()
            .and_then(|spec| spec.node_name.clone())
            .unwrap_or_default(),
        raw: serde_json::to_value(pod)?,
    })
}

/// Phase, overridden by a terminating marker or the first container waiting or
/// terminated reason, the way `kubectl get pods` reports it.
fn status(pod: &KubePod, container_statuses: &[ContainerStatus]) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }

    let reason = container_statuses.iter().find_map(|cs| {
        let state = cs.state.as_ref()?;

        state
            .waiting
            .as_ref()
            .and_then(|w| w.reason.clone())
            .or_else(|| state.terminated.as_ref().and_then(|t| t.reason.clone()))
    });

    reason
        .or_else(|| pod.status.as_ref().and_then(|s| s.phase.clone()))
        .unwrap_or_else(|| UNKNOWN_STATUS.to_string())
}
