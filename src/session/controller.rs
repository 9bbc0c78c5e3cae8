use crossbeam::channel::Sender;

use crate::{
    error::{message_or, SessionError},
    kube::ClusterGateway,
    logger,
    message::Message,
};

use super::{
    inventory::{PodInventory, RefreshOutcome},
    log_stream::{LogStreamSession, StreamEvent, StreamSession},
    namespace::{effective_namespace, filtered_by_namespace, unique_namespaces, DEFAULT_NAMESPACE},
    search::{self, Segment},
    Context, ContextList, Pod, PodKey,
};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_lines: usize,
    pub default_namespace: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_lines: super::log_stream::DEFAULT_MAX_LINES,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Coordinates contexts, the pod inventory and the single log stream.
///
/// All transitions take `&mut self` and run to completion before the next
/// event is handled. Derived views (filtered pods, filtered logs) are computed
/// on every call and never stored.
pub struct SessionController<G> {
    gateway: G,
    contexts: Vec<Context>,
    current_context: String,
    inventory: PodInventory,
    namespace: String,
    selected_pod: Option<PodKey>,
    stream: LogStreamSession,
    search_term: String,
}

impl<G: ClusterGateway> SessionController<G> {
    pub fn new(gateway: G, tx: Sender<Message>, config: SessionConfig) -> Self {
        Self {
            gateway,
            contexts: Vec::new(),
            current_context: String::new(),
            inventory: PodInventory::default(),
            namespace: config.default_namespace,
            selected_pod: None,
            stream: LogStreamSession::new(tx, config.max_lines),
            search_term: String::new(),
        }
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn current_context(&self) -> &str {
        &self.current_context
    }

    pub fn inventory(&self) -> &PodInventory {
        &self.inventory
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn namespaces(&self) -> Vec<String> {
        unique_namespaces(self.inventory.pods())
    }

    pub fn filtered_pods(&self) -> Vec<&Pod> {
        filtered_by_namespace(self.inventory.pods(), &self.namespace)
    }

    pub fn selected_pod(&self) -> Option<&PodKey> {
        self.selected_pod.as_ref()
    }

    pub fn stream(&self) -> &LogStreamSession {
        &self.stream
    }

    pub fn stream_session(&self) -> StreamSession {
        self.stream.snapshot()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn logs(&self) -> Vec<String> {
        self.stream.buffer().to_vec()
    }

    pub fn filtered_logs(&self) -> Vec<&str> {
        search::filter(self.stream.buffer().iter(), &self.search_term)
    }

    pub fn highlighted_logs(&self) -> Vec<Vec<Segment>> {
        self.filtered_logs()
            .into_iter()
            .map(|line| search::highlight(line, &self.search_term))
            .collect()
    }

    /// Fetches the context list and loads pods for the current context, if any.
    pub async fn load_contexts(&mut self) -> Result<(), SessionError> {
        let ContextList {
            contexts,
            current_context,
        } = self
            .gateway
            .list_contexts()
            .await
            .map_err(|err| SessionError::InventoryFetchFailed(err.to_string()))?;

        logger!(
            info,
            "Loaded {} contexts, current {:?}",
            contexts.len(),
            current_context
        );

        self.contexts = contexts;
        self.current_context = current_context;

        if self.current_context.is_empty() {
            return Ok(());
        }

        self.inventory.reset(&self.current_context);
        self.refresh_pods().await
    }

    pub async fn switch_context(&mut self, context: &str) -> Result<(), SessionError> {
        logger!(info, "Switch context {} -> {}", self.current_context, context);

        self.stream.stop(&self.gateway).await;
        self.selected_pod = None;
        self.stream.reset();
        self.search_term.clear();

        self.inventory.reset(context);

        match self.gateway.switch_context(context).await {
            Ok(current) => self.current_context = current,
            Err(err) => {
                let message = message_or(&err, "Failed to switch context");

                logger!(error, "Failed to switch context to {}: {}", context, message);

                self.inventory.begin(context);
                self.inventory.complete(context, Err(err));

                return Err(SessionError::InventoryFetchFailed(message));
            }
        }

        self.namespace = DEFAULT_NAMESPACE.to_string();

        self.refresh_pods().await
    }

    /// Reloads the inventory of the current context and re-resolves the namespace filter.
    pub async fn refresh_pods(&mut self) -> Result<(), SessionError> {
        if self.current_context.is_empty() {
            return Err(SessionError::InventoryFetchFailed(
                "No current context".to_string(),
            ));
        }

        let context = self.current_context.clone();

        self.inventory.begin(&context);

        let result = self.gateway.list_pods(&context).await;

        match self.inventory.complete(&context, result) {
            RefreshOutcome::Replaced => {
                logger!(
                    info,
                    "Loaded {} pods in {}",
                    self.inventory.pods().len(),
                    context
                );
                self.resolve_namespace();
                Ok(())
            }
            RefreshOutcome::Failed(message) => {
                logger!(error, "Failed to load pods in {}: {}", context, message);
                Err(SessionError::InventoryFetchFailed(message))
            }
            RefreshOutcome::Stale => Ok(()),
        }
    }

    fn resolve_namespace(&mut self) {
        let pods = self.inventory.pods();

        if pods.is_empty() {
            return;
        }

        let effective = effective_namespace(pods, &self.namespace);

        if effective != self.namespace {
            logger!(info, "Namespace {} -> {}", self.namespace, effective);
            self.namespace = effective;
        }
    }

    pub fn set_namespace(&mut self, selection: &str) {
        self.namespace = selection.to_string();
        self.resolve_namespace();
    }

    pub async fn select_pod(&mut self, key: &PodKey) -> Result<(), SessionError> {
        let pod = self
            .inventory
            .find(&key.namespace, &key.name)
            .cloned()
            .ok_or_else(|| SessionError::PodNotFound(key.clone()))?;

        self.selected_pod = Some(key.clone());
        self.search_term.clear();

        self.stream
            .start(&self.gateway, &pod, &self.current_context)
            .await
    }

    pub async fn deselect_pod(&mut self) {
        self.stream.stop(&self.gateway).await;
        self.stream.reset();
        self.selected_pod = None;
        self.search_term.clear();
    }

    /// Restarts streaming for the selected pod.
    pub async fn start_stream(&mut self) -> Result<(), SessionError> {
        let key = self.selected_pod.clone().ok_or(SessionError::NoPodSelected)?;

        let pod = self
            .inventory
            .find(&key.namespace, &key.name)
            .or(self.stream.pod())
            .cloned()
            .ok_or(SessionError::PodNotFound(key))?;

        self.stream
            .start(&self.gateway, &pod, &self.current_context)
            .await
    }

    pub async fn stop_stream(&mut self) {
        self.stream.stop(&self.gateway).await;
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
    }

    pub fn clear_logs(&mut self) {
        self.stream.clear();
        self.search_term.clear();
    }

    /// Every buffered line, oldest first, separated by newlines.
    pub fn copy_all(&self) -> Option<String> {
        let buffer = self.stream.buffer();

        if buffer.is_empty() {
            return None;
        }

        Some(buffer.join("\n"))
    }

    pub fn describe_pod(&self, key: &PodKey) -> Result<String, SessionError> {
        let pod = self
            .inventory
            .find(&key.namespace, &key.name)
            .ok_or_else(|| SessionError::PodNotFound(key.clone()))?;

        Ok(serde_yaml::to_string(&pod.raw)?)
    }

    /// Applies a delivery coming from the gateway. Returns `true` when the view changed.
    pub fn handle_stream_event(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Line { stream, line } => self.stream.deliver(stream, line),
            StreamEvent::Finished { stream } => {
                let was_live = self.stream.live_stream() == Some(stream);
                self.stream.finish(stream);
                was_live
            }
        }
    }

    pub async fn shutdown(&mut self) {
        self.stream.stop(&self.gateway).await;
    }
}
