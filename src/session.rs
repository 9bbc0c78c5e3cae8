mod controller;
mod inventory;
mod log_stream;
mod model;
mod namespace;
mod search;

pub use controller::{SessionConfig, SessionController};
pub use inventory::{PodInventory, RefreshOutcome};
pub use log_stream::{
    LogBuffer, LogStreamSession, StreamEvent, StreamId, StreamSession, StreamState,
    DEFAULT_MAX_LINES,
};
pub use model::{Context, ContextList, Pod, PodKey};
pub use namespace::{
    effective_namespace, filtered_by_namespace, unique_namespaces, ALL_NAMESPACES,
    DEFAULT_NAMESPACE,
};
pub use search::{filter, highlight, Segment};
