use anyhow::Result;
use async_trait::async_trait;
use crossbeam::channel::Sender;
use tokio::task::AbortHandle;

use crate::{
    message::Message,
    session::{ContextList, Pod, StreamEvent, StreamId},
};

/// Everything the session needs from a cluster.
///
/// Injected into the controller at construction so tests can substitute a mock.
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    async fn list_contexts(&self) -> Result<ContextList>;

    /// Makes `context` current and returns the name now in effect.
    async fn switch_context(&self, context: &str) -> Result<String>;

    async fn list_pods(&self, context: &str) -> Result<Vec<Pod>>;

    /// Opens a follow-mode log stream. Lines are pushed into `sink` from a
    /// background task until the stream ends or the returned handle is cancelled.
    async fn open_log_stream(&self, target: &StreamTarget, sink: LogSink) -> Result<StreamHandle>;

    async fn close_log_stream(&self, handle: &mut StreamHandle) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub pod_name: String,
    pub context: String,
    pub namespace: String,
}

/// Delivery end of a log stream, tagged with the stream it belongs to.
#[derive(Debug, Clone)]
pub struct LogSink {
    stream: StreamId,
    tx: Sender<Message>,
}

impl LogSink {
    pub fn new(stream: StreamId, tx: Sender<Message>) -> Self {
        Self { stream, tx }
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// Returns `false` once nobody is listening anymore.
    pub fn send(&self, line: impl Into<String>) -> bool {
        self.tx
            .send(
                StreamEvent::Line {
                    stream: self.stream,
                    line: line.into(),
                }
                .into(),
            )
            .is_ok()
    }

    pub fn finish(&self) -> bool {
        self.tx
            .send(
                StreamEvent::Finished {
                    stream: self.stream,
                }
                .into(),
            )
            .is_ok()
    }
}

/// Cancellation side of an open stream. Cancelling twice is a no-op, and so is
/// dropping an already cancelled handle.
#[derive(Debug)]
pub struct StreamHandle {
    stream: StreamId,
    task: Option<AbortHandle>,
}

impl StreamHandle {
    pub fn new(stream: StreamId, task: AbortHandle) -> Self {
        Self {
            stream,
            task: Some(task),
        }
    }

    /// A handle with no background task attached.
    pub fn detached(stream: StreamId) -> Self {
        Self { stream, task: None }
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
pub mod mock {
    use super::{ClusterGateway, LogSink, Result, StreamHandle, StreamTarget};
    use crate::session::{ContextList, Pod};
    use mockall::mock;

    mock! {
        pub Gateway {}

        #[async_trait::async_trait]
        impl ClusterGateway for Gateway {
            async fn list_contexts(&self) -> Result<ContextList>;
            async fn switch_context(&self, context: &str) -> Result<String>;
            async fn list_pods(&self, context: &str) -> Result<Vec<Pod>>;
            async fn open_log_stream(&self, target: &StreamTarget, sink: LogSink) -> Result<StreamHandle>;
            async fn close_log_stream(&self, handle: &mut StreamHandle) -> Result<()>;
        }
    }
}
