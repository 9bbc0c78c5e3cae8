use crate::session::{Context, Pod, PodKey, Segment, StreamSession, StreamState};

/// Everything the session worker reports back for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Contexts {
        contexts: Vec<Context>,
        current: String,
    },
    Pods(PodsView),
    Namespaces {
        namespaces: Vec<String>,
        selected: String,
    },
    /// The whole filtered log view, replacing whatever was shown.
    Logs(Vec<Vec<Segment>>),
    /// One line appended to the live stream that passes the search filter.
    LogLine(Vec<Segment>),
    Stream(StreamSession),
    Describe {
        pod: PodKey,
        yaml: String,
    },
    /// Buffer contents to put on the clipboard.
    CopyAll(String),
    Status(StatusView),
    Notice(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PodsView {
    pub context: String,
    pub namespace: String,
    pub pods: Vec<Pod>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusView {
    pub context: String,
    pub namespace: String,
    pub pod: Option<PodKey>,
    pub state: StreamState,
    pub lines: usize,
    pub search_term: String,
    pub error: Option<String>,
}
