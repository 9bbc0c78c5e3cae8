use std::collections::{vec_deque, VecDeque};

use crossbeam::channel::Sender;

use crate::{
    error::{message_or, SessionError},
    kube::{ClusterGateway, LogSink, StreamHandle, StreamTarget},
    logger,
    message::Message,
};

use super::Pod;

pub const DEFAULT_MAX_LINES: usize = 1000;

const START_FAILED: &str = "Failed to start log streaming";

/// Identifies one opened stream. A fresh id is allocated for every start, so
/// deliveries from a torn down stream can always be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Line { stream: StreamId, line: String },
    Finished { stream: StreamId },
}

impl From<StreamEvent> for Message {
    fn from(ev: StreamEvent) -> Self {
        Message::Stream(ev)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Starting,
    Streaming,
    Stopping,
    Errored,
}

impl StreamState {
    /// States from which a start has to tear the current stream down first.
    fn is_busy(self) -> bool {
        matches!(self, Self::Starting | Self::Streaming | Self::Stopping)
    }

    fn accepts_lines(self) -> bool {
        matches!(self, Self::Starting | Self::Streaming)
    }
}

/// FIFO of log lines that never grows past its capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_LINES)
    }
}

impl LogBuffer {
    /// Capacity is kept within `1..=DEFAULT_MAX_LINES`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, DEFAULT_MAX_LINES);

        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }

        self.lines.push_back(line);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, String> {
        self.lines.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn join(&self, separator: &str) -> String {
        self.to_vec().join(separator)
    }
}

/// Snapshot of the stream session as exposed to views.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSession {
    pub pod: Option<Pod>,
    pub active: bool,
    pub error: Option<String>,
}

/// Lifecycle of the single log stream.
///
/// Every transition takes `&mut self`, so only one start or stop can be in
/// flight at a time. A start always drives a previous stream through `stop`
/// before opening the next one.
pub struct LogStreamSession {
    tx: Sender<Message>,
    state: StreamState,
    pod: Option<Pod>,
    error: Option<String>,
    buffer: LogBuffer,
    handle: Option<StreamHandle>,
    live: Option<StreamId>,
    next_id: u64,
}

impl LogStreamSession {
    pub fn new(tx: Sender<Message>, max_lines: usize) -> Self {
        Self {
            tx,
            state: StreamState::Idle,
            pod: None,
            error: None,
            buffer: LogBuffer::with_capacity(max_lines),
            handle: None,
            live: None,
            next_id: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == StreamState::Streaming
    }

    pub fn pod(&self) -> Option<&Pod> {
        self.pod.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn live_stream(&self) -> Option<StreamId> {
        self.live
    }

    pub fn snapshot(&self) -> StreamSession {
        StreamSession {
            pod: self.pod.clone(),
            active: self.is_streaming(),
            error: self.error.clone(),
        }
    }

    fn allocate_id(&mut self) -> StreamId {
        self.next_id += 1;
        StreamId(self.next_id)
    }

    pub async fn start<G: ClusterGateway>(
        &mut self,
        gateway: &G,
        pod: &Pod,
        context: &str,
    ) -> Result<(), SessionError> {
        if self.state.is_busy() {
            logger!(
                info,
                "Stop stream of {:?} before starting {}",
                self.pod.as_ref().map(Pod::key),
                pod.key()
            );
            self.stop(gateway).await;
        }

        let id = self.allocate_id();

        self.buffer.clear();
        self.error = None;
        self.pod = Some(pod.clone());
        self.live = Some(id);
        self.state = StreamState::Starting;

        let target = StreamTarget {
            pod_name: pod.name.clone(),
            context: context.to_string(),
            namespace: pod.namespace.clone(),
        };

        logger!(info, "Start log stream {:?} for {:?}", id, target);

        match gateway
            .open_log_stream(&target, LogSink::new(id, self.tx.clone()))
            .await
        {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = StreamState::Streaming;
                Ok(())
            }
            Err(err) => {
                let message = message_or(&err, START_FAILED);

                logger!(error, "Failed to open log stream {:?}: {}", id, message);

                self.live = None;
                self.buffer.clear();
                self.error = Some(message.clone());
                self.state = StreamState::Errored;

                Err(SessionError::StreamStartFailed(message))
            }
        }
    }

    /// Tears the stream down. Always ends in `Idle`, whatever the gateway says.
    pub async fn stop<G: ClusterGateway>(&mut self, gateway: &G) {
        if self.state == StreamState::Idle && self.handle.is_none() {
            return;
        }

        self.state = StreamState::Stopping;
        self.live = None;

        if let Some(mut handle) = self.handle.take() {
            if let Err(err) = gateway.close_log_stream(&mut handle).await {
                let err = SessionError::StreamCloseFailed(err.to_string());
                logger!(warn, "{}", err);
            }

            handle.cancel();
        }

        self.state = StreamState::Idle;

        logger!(info, "Log stream stopped");
    }

    /// Appends a delivered line. Returns `false` when the line came from a stream
    /// that is no longer live and was dropped.
    pub fn deliver(&mut self, stream: StreamId, line: String) -> bool {
        if self.live != Some(stream) || !self.state.accepts_lines() {
            logger!(debug, "Discard line from stale stream {:?}", stream);
            return false;
        }

        self.buffer.push(line);
        true
    }

    /// The gateway ended the stream on its own (container exited, transport closed).
    pub fn finish(&mut self, stream: StreamId) {
        if self.live != Some(stream) {
            return;
        }

        logger!(info, "Log stream {:?} finished", stream);

        self.live = None;

        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
        }

        self.state = StreamState::Idle;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Forgets the pod, its lines and its last error. The stream must already be stopped.
    pub fn reset(&mut self) {
        debug_assert!(!self.state.is_busy());

        self.pod = None;
        self.error = None;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::kube::mock::MockGateway;
    use anyhow::anyhow;
    use crossbeam::channel::{unbounded, Receiver};
    use pretty_assertions::assert_eq;

    fn pod(name: &str) -> Pod {
        Pod {
            name: name.to_string(),
            namespace: "default".to_string(),
            ..Default::default()
        }
    }

    fn drain(session: &mut LogStreamSession, rx: &Receiver<Message>) {
        for msg in rx.try_iter() {
            match msg {
                Message::Stream(StreamEvent::Line { stream, line }) => {
                    session.deliver(stream, line);
                }
                Message::Stream(StreamEvent::Finished { stream }) => session.finish(stream),
                _ => unreachable!(),
            }
        }
    }

    /// Gateway whose streams hand their sinks back to the test.
    fn capturing_gateway() -> (MockGateway, Arc<Mutex<Vec<LogSink>>>) {
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let captured = sinks.clone();

        let mut gateway = MockGateway::new();

        gateway
            .expect_open_log_stream()
            .returning(move |_, sink| {
                let stream = sink.stream();
                captured.lock().unwrap().push(sink);
                Ok(StreamHandle::detached(stream))
            });

        gateway.expect_close_log_stream().returning(|_| Ok(()));

        (gateway, sinks)
    }

    mod buffer {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn keeps_most_recent_lines_in_order() {
            let mut buffer = LogBuffer::default();

            for i in 0..1500 {
                buffer.push(format!("line {}", i));
            }

            assert_eq!(buffer.len(), 1000);
            assert_eq!(buffer.iter().next().map(String::as_str), Some("line 500"));
            assert_eq!(buffer.iter().last().map(String::as_str), Some("line 1499"));

            let expected: Vec<String> = (500..1500).map(|i| format!("line {}", i)).collect();
            assert_eq!(buffer.to_vec(), expected);
        }

        #[test]
        fn never_exceeds_capacity() {
            let mut buffer = LogBuffer::with_capacity(3);

            for i in 0..10 {
                buffer.push(i.to_string());
                assert!(buffer.len() <= 3);
            }

            assert_eq!(buffer.to_vec(), vec!["7", "8", "9"]);
        }

        #[test]
        fn zero_capacity_is_raised_to_one() {
            let mut buffer = LogBuffer::with_capacity(0);
            buffer.push("a".into());
            buffer.push("b".into());

            assert_eq!(buffer.capacity(), 1);
            assert_eq!(buffer.to_vec(), vec!["b"]);
        }

        #[test]
        fn oversized_capacity_is_lowered_to_default() {
            let mut buffer = LogBuffer::with_capacity(5000);

            for i in 0..1500 {
                buffer.push(i.to_string());
            }

            assert_eq!(buffer.capacity(), DEFAULT_MAX_LINES);
            assert_eq!(buffer.len(), DEFAULT_MAX_LINES);
            assert_eq!(buffer.iter().next().map(String::as_str), Some("500"));
        }

        #[test]
        fn join_with_newlines() {
            let mut buffer = LogBuffer::default();
            buffer.push("a".into());
            buffer.push("b".into());

            assert_eq!(buffer.join("\n"), "a\nb");
        }
    }

    #[tokio::test]
    async fn start_enters_streaming_and_passes_target() {
        let (tx, _rx) = unbounded();
        let mut gateway = MockGateway::new();

        gateway
            .expect_open_log_stream()
            .withf(|target, _| {
                target.pod_name == "web" && target.context == "ctx" && target.namespace == "default"
            })
            .times(1)
            .returning(|_, sink| Ok(StreamHandle::detached(sink.stream())));

        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        session.start(&gateway, &pod("web"), "ctx").await.unwrap();

        assert_eq!(session.state(), StreamState::Streaming);
        assert_eq!(session.pod(), Some(&pod("web")));
        assert!(session.snapshot().active);
    }

    #[tokio::test]
    async fn lines_are_appended_in_arrival_order() {
        let (tx, rx) = unbounded();
        let (gateway, sinks) = capturing_gateway();
        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        session.start(&gateway, &pod("web"), "ctx").await.unwrap();

        let sink = sinks.lock().unwrap()[0].clone();
        for line in ["L1", "L2", "L3"] {
            sink.send(line);
        }
        drain(&mut session, &rx);

        assert_eq!(session.buffer().to_vec(), vec!["L1", "L2", "L3"]);
    }

    #[tokio::test]
    async fn late_line_after_stop_is_discarded() {
        let (tx, rx) = unbounded();
        let (gateway, sinks) = capturing_gateway();
        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        session.start(&gateway, &pod("web"), "ctx").await.unwrap();

        let sink = sinks.lock().unwrap()[0].clone();
        for line in ["L1", "L2", "L3"] {
            sink.send(line);
        }
        drain(&mut session, &rx);

        session.stop(&gateway).await;

        sink.send("L4");
        drain(&mut session, &rx);

        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(session.buffer().to_vec(), vec!["L1", "L2", "L3"]);
    }

    #[tokio::test]
    async fn lines_queued_before_stop_are_discarded_too() {
        let (tx, rx) = unbounded();
        let (gateway, sinks) = capturing_gateway();
        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        session.start(&gateway, &pod("web"), "ctx").await.unwrap();

        let sink = sinks.lock().unwrap()[0].clone();
        sink.send("queued");

        session.stop(&gateway).await;
        drain(&mut session, &rx);

        assert!(session.buffer().is_empty());
    }

    #[tokio::test]
    async fn start_failure_enters_errored_with_message() {
        let (tx, _rx) = unbounded();
        let mut gateway = MockGateway::new();

        gateway
            .expect_open_log_stream()
            .returning(|_, _| Err(anyhow!("pods \"web\" not found")));

        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        let err = session.start(&gateway, &pod("web"), "ctx").await.unwrap_err();

        assert!(matches!(err, SessionError::StreamStartFailed(ref m) if m == "pods \"web\" not found"));
        assert_eq!(session.state(), StreamState::Errored);
        assert_eq!(session.error(), Some("pods \"web\" not found"));
        assert!(session.buffer().is_empty());
        assert_eq!(session.live_stream(), None);
    }

    #[tokio::test]
    async fn start_failure_without_message_uses_fallback() {
        let (tx, _rx) = unbounded();
        let mut gateway = MockGateway::new();

        gateway
            .expect_open_log_stream()
            .returning(|_, _| Err(anyhow!("")));

        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        let _ = session.start(&gateway, &pod("web"), "ctx").await;

        assert_eq!(session.error(), Some(START_FAILED));
    }

    #[tokio::test]
    async fn restart_from_errored_clears_error() {
        let (tx, _rx) = unbounded();
        let mut gateway = MockGateway::new();
        let mut seq = mockall::Sequence::new();

        gateway
            .expect_open_log_stream()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow!("boom")));
        gateway
            .expect_open_log_stream()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, sink| Ok(StreamHandle::detached(sink.stream())));

        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        assert!(session.start(&gateway, &pod("web"), "ctx").await.is_err());
        session.start(&gateway, &pod("web"), "ctx").await.unwrap();

        assert_eq!(session.state(), StreamState::Streaming);
        assert_eq!(session.error(), None);
    }

    #[tokio::test]
    async fn starting_another_pod_stops_previous_stream_first() {
        let (tx, rx) = unbounded();
        let mut gateway = MockGateway::new();
        let mut seq = mockall::Sequence::new();

        let sinks = Arc::new(Mutex::new(Vec::new()));

        let captured = sinks.clone();
        gateway
            .expect_open_log_stream()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, sink| {
                let stream = sink.stream();
                captured.lock().unwrap().push(sink);
                Ok(StreamHandle::detached(stream))
            });
        gateway
            .expect_close_log_stream()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let captured = sinks.clone();
        gateway
            .expect_open_log_stream()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, sink| {
                let stream = sink.stream();
                captured.lock().unwrap().push(sink);
                Ok(StreamHandle::detached(stream))
            });

        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        session.start(&gateway, &pod("a"), "ctx").await.unwrap();

        let first = sinks.lock().unwrap()[0].clone();
        first.send("from a");
        drain(&mut session, &rx);

        session.start(&gateway, &pod("b"), "ctx").await.unwrap();

        let second = sinks.lock().unwrap()[1].clone();
        first.send("late from a");
        second.send("from b");
        drain(&mut session, &rx);

        assert_ne!(first.stream(), second.stream());
        assert_eq!(session.pod(), Some(&pod("b")));
        assert_eq!(session.buffer().to_vec(), vec!["from b"]);
    }

    #[tokio::test]
    async fn close_failure_still_returns_to_idle() {
        let (tx, _rx) = unbounded();
        let mut gateway = MockGateway::new();

        gateway
            .expect_open_log_stream()
            .returning(|_, sink| Ok(StreamHandle::detached(sink.stream())));
        gateway
            .expect_close_log_stream()
            .times(1)
            .returning(|_| Err(anyhow!("connection reset")));

        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);
        session.start(&gateway, &pod("web"), "ctx").await.unwrap();

        session.stop(&gateway).await;

        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(session.error(), None);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (tx, _rx) = unbounded();
        let mut gateway = MockGateway::new();

        gateway
            .expect_open_log_stream()
            .returning(|_, sink| Ok(StreamHandle::detached(sink.stream())));
        gateway
            .expect_close_log_stream()
            .times(1)
            .returning(|_| Ok(()));

        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        session.stop(&gateway).await;

        session.start(&gateway, &pod("web"), "ctx").await.unwrap();
        session.stop(&gateway).await;
        session.stop(&gateway).await;

        assert_eq!(session.state(), StreamState::Idle);
    }

    #[tokio::test]
    async fn stop_from_errored_returns_to_idle_and_keeps_error() {
        let (tx, _rx) = unbounded();
        let mut gateway = MockGateway::new();

        gateway
            .expect_open_log_stream()
            .returning(|_, _| Err(anyhow!("boom")));
        gateway.expect_close_log_stream().never();

        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);
        let _ = session.start(&gateway, &pod("web"), "ctx").await;

        session.stop(&gateway).await;

        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(session.error(), Some("boom"));
    }

    #[tokio::test]
    async fn gateway_finishing_stream_is_silent_termination() {
        let (tx, rx) = unbounded();
        let (gateway, sinks) = capturing_gateway();
        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        session.start(&gateway, &pod("web"), "ctx").await.unwrap();

        let sink = sinks.lock().unwrap()[0].clone();
        sink.send("last words");
        sink.finish();
        sink.send("after finish");
        drain(&mut session, &rx);

        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(session.error(), None);
        assert_eq!(session.pod(), Some(&pod("web")));
        assert_eq!(session.buffer().to_vec(), vec!["last words"]);
    }

    #[tokio::test]
    async fn finish_from_old_stream_does_not_touch_new_one() {
        let (tx, rx) = unbounded();
        let (gateway, sinks) = capturing_gateway();
        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        session.start(&gateway, &pod("a"), "ctx").await.unwrap();
        session.start(&gateway, &pod("b"), "ctx").await.unwrap();

        let old = sinks.lock().unwrap()[0].clone();
        old.finish();
        drain(&mut session, &rx);

        assert_eq!(session.state(), StreamState::Streaming);
    }

    #[tokio::test]
    async fn clear_keeps_streaming() {
        let (tx, rx) = unbounded();
        let (gateway, sinks) = capturing_gateway();
        let mut session = LogStreamSession::new(tx, DEFAULT_MAX_LINES);

        session.start(&gateway, &pod("web"), "ctx").await.unwrap();

        let sink = sinks.lock().unwrap()[0].clone();
        sink.send("old");
        drain(&mut session, &rx);

        session.clear();

        sink.send("new");
        drain(&mut session, &rx);

        assert_eq!(session.state(), StreamState::Streaming);
        assert_eq!(session.buffer().to_vec(), vec!["new"]);
    }
}
