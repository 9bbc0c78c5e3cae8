//! Namespace derivation from the pod inventory.
//!
//! The namespace filter self-heals: whenever the inventory is replaced, a
//! selection pointing at a namespace that no longer has pods falls back to
//! `default`, or to every namespace when there is no `default`.

use std::collections::BTreeSet;

use super::Pod;

/// Synthetic selection meaning "no namespace filtering".
pub const ALL_NAMESPACES: &str = "all";

pub const DEFAULT_NAMESPACE: &str = "default";

/// Sorted, deduplicated namespaces present in `pods`.
pub fn unique_namespaces(pods: &[Pod]) -> Vec<String> {
    pods.iter()
        .map(|pod| pod.namespace.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

pub fn effective_namespace(pods: &[Pod], requested: &str) -> String {
    if requested == ALL_NAMESPACES {
        return ALL_NAMESPACES.to_string();
    }

    let namespaces = unique_namespaces(pods);

    if namespaces.iter().any(|ns| ns == requested) {
        return requested.to_string();
    }

    if namespaces.iter().any(|ns| ns == DEFAULT_NAMESPACE) {
        DEFAULT_NAMESPACE.to_string()
    } else {
        ALL_NAMESPACES.to_string()
    }
}

pub fn filtered_by_namespace<'a>(pods: &'a [Pod], selection: &str) -> Vec<&'a Pod> {
    if selection == ALL_NAMESPACES {
        return pods.iter().collect();
    }

    pods.iter().filter(|pod| pod.namespace == selection).collect()
}
