use anyhow::Result;

use crate::{error::message_or, logger};

use super::Pod;

const FETCH_FAILED: &str = "Failed to load pods";

/// Last successfully fetched pod list for the active context.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PodInventory {
    pods: Vec<Pod>,
    loading: bool,
    error: Option<String>,
    context: String,
}

/// Result of applying a completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Replaced,
    Failed(String),
    /// The fetch belonged to a context that is no longer current.
    Stale,
}

impl PodInventory {
    pub fn pods(&self) -> &[Pod] {
        &self.pods
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Drops everything and points the inventory at `context` before any fetch for it begins.
    pub fn reset(&mut self, context: &str) {
        *self = Self {
            context: context.to_string(),
            ..Default::default()
        };
    }

    /// Marks a fetch for `context` as in flight.
    pub fn begin(&mut self, context: &str) {
        if self.context != context {
            self.pods.clear();
            self.context = context.to_string();
        }

        self.loading = true;
        self.error = None;
    }

    /// Applies a completed fetch. Overlapping fetches for the same context resolve
    /// in completion order.
    pub fn complete(&mut self, context: &str, result: Result<Vec<Pod>>) -> RefreshOutcome {
        if self.context != context {
            logger!(
                debug,
                "Discard pod list for {} (current context is {})",
                context,
                self.context
            );
            return RefreshOutcome::Stale;
        }

        self.loading = false;

        match result {
            Ok(pods) => {
                self.pods = pods;
                self.error = None;
                RefreshOutcome::Replaced
            }
            Err(err) => {
                let message = message_or(&err, FETCH_FAILED);

                self.pods.clear();
                self.error = Some(message.clone());

                RefreshOutcome::Failed(message)
            }
        }
    }

    pub fn find(&self, namespace: &str, name: &str) -> Option<&Pod> {
        self.pods
            .iter()
            .find(|pod| pod.namespace == namespace && pod.name == name)
    }
}
