use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::age;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    pub cluster: String,
    pub user: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextList {
    pub contexts: Vec<Context>,
    pub current_context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PodKey {
    pub namespace: String,
    pub name: String,
}

impl PodKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Snapshot of a pod as returned by the last inventory refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pod {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub ready: bool,
    pub restarts: i32,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub node: String,
    /// Raw descriptor as served by the API server.
    pub raw: serde_json::Value,
}

impl Pod {
    pub fn key(&self) -> PodKey {
        PodKey::new(&self.namespace, &self.name)
    }

    pub fn age(&self, now: DateTime<Utc>) -> String {
        match self.creation_timestamp {
            Some(created) => age(&(now - created)),
            None => "<unknown>".to_string(),
        }
    }
}
