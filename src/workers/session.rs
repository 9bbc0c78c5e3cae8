mod message;

pub use message::*;

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use tokio::runtime::Runtime;

use crate::{
    error::SessionError,
    kube::{read_kubeconfig, ClusterGateway, KubeGateway},
    logger,
    message::{Message, UserCommand},
    panic_set_hook,
    session::{filter, highlight, SessionConfig, SessionController, StreamEvent},
};

#[derive(Debug, Clone, Default)]
pub struct SessionWorkerConfig {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub session: SessionConfig,
    pub tail_lines: Option<i64>,
    pub refresh_interval: Option<Duration>,
}

/// Owns the session controller on its own tokio runtime.
///
/// `tx` is handed to log streams so their lines come back through `rx`,
/// interleaved with user commands.
pub struct SessionWorker {
    tx_view: Sender<Message>,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    tx_shutdown: Sender<Result<()>>,
    config: SessionWorkerConfig,
}

impl SessionWorker {
    pub fn new(
        tx_view: Sender<Message>,
        tx: Sender<Message>,
        rx: Receiver<Message>,
        tx_shutdown: Sender<Result<()>>,
        config: SessionWorkerConfig,
    ) -> Self {
        Self {
            tx_view,
            tx,
            rx,
            tx_shutdown,
            config,
        }
    }

    pub fn start(self) {
        logger!(info, "SessionWorker start");

        let ret = match Runtime::new() {
            Ok(rt) => rt.block_on(start_session(self.tx_view, self.tx, self.rx, self.config)),
            Err(err) => Err(err.into()),
        };

        if let Err(e) = &ret {
            logger!(error, "{}", e);
        }

        logger!(info, "SessionWorker end");

        self.tx_shutdown
            .send(ret)
            .expect("failed to send shutdown signal");
    }

    pub fn set_panic_hook(&self) {
        let tx_shutdown = self.tx_shutdown.clone();

        panic_set_hook!({
            tx_shutdown
                .send(Err(anyhow::anyhow!("panic occurred in SessionWorker worker")))
                .expect("failed to send shutdown signal");
        });
    }
}

async fn start_session(
    tx_view: Sender<Message>,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    config: SessionWorkerConfig,
) -> Result<()> {
    let SessionWorkerConfig {
        kubeconfig,
        context,
        session,
        tail_lines,
        refresh_interval,
    } = config;

    let kubeconfig = read_kubeconfig(kubeconfig)?;

    let gateway = KubeGateway::new(kubeconfig, context, tail_lines)?;

    let mut session = SessionLoop::new(SessionController::new(gateway, tx, session), tx_view);

    session.init().await?;

    session.run(rx, refresh_interval).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Single event loop around the controller. Each message is handled to
/// completion before the next one is taken.
struct SessionLoop<G> {
    controller: SessionController<G>,
    tx: Sender<Message>,
}

impl<G: ClusterGateway> SessionLoop<G> {
    fn new(controller: SessionController<G>, tx: Sender<Message>) -> Self {
        Self { controller, tx }
    }

    fn send(&self, ev: ViewEvent) -> Result<()> {
        self.tx.send(ev.into())?;
        Ok(())
    }

    /// Loads contexts and the current context's pods. Only an unreadable
    /// context list is fatal.
    async fn init(&mut self) -> Result<()> {
        if let Err(err) = self.controller.load_contexts().await {
            if self.controller.inventory().error().is_none() {
                return Err(anyhow!("Failed to load contexts: {}", err));
            }

            self.report(err)?;
        }

        self.send_contexts()?;
        self.send_pods()
    }

    /// Processes messages until quit. The stream is stopped however the loop ends.
    async fn run(&mut self, rx: Receiver<Message>, refresh_interval: Option<Duration>) -> Result<()> {
        let ret = self.event_loop(&rx, refresh_interval).await;

        logger!(info, "Session shutdown");

        self.controller.shutdown().await;

        ret
    }

    async fn event_loop(
        &mut self,
        rx: &Receiver<Message>,
        refresh_interval: Option<Duration>,
    ) -> Result<()> {
        let mut last_refresh = Instant::now();

        loop {
            let rx_clone = rx.clone();

            let task =
                tokio::task::spawn_blocking(move || rx_clone.recv_timeout(Duration::from_secs(1)));

            let Ok(recv) = task.await else { continue };

            let mut flow = match recv {
                Ok(msg) => self.handle(msg).await?,
                Err(RecvTimeoutError::Timeout) => Flow::Continue,
                Err(RecvTimeoutError::Disconnected) => Flow::Quit,
            };

            while flow == Flow::Continue {
                let Ok(msg) = rx.try_recv() else { break };
                flow = self.handle(msg).await?;
            }

            if flow == Flow::Quit {
                break;
            }

            if let Some(interval) = refresh_interval {
                if interval <= last_refresh.elapsed() {
                    self.refresh().await?;
                    last_refresh = Instant::now();
                }
            }
        }

        Ok(())
    }

    async fn handle(&mut self, msg: Message) -> Result<Flow> {
        match msg {
            Message::User(cmd) => self.command(cmd).await,
            Message::Stream(ev) => {
                self.stream_event(ev)?;
                Ok(Flow::Continue)
            }
            Message::View(_) | Message::Error(_) => Ok(Flow::Continue),
        }
    }

    async fn command(&mut self, cmd: UserCommand) -> Result<Flow> {
        logger!(debug, "Command {:?}", cmd);

        match cmd {
            UserCommand::Contexts => self.send_contexts()?,
            UserCommand::UseContext(context) => {
                if let Err(err) = self.controller.switch_context(&context).await {
                    self.report(err)?;
                }
                self.send_contexts()?;
                self.send_pods()?;
            }
            UserCommand::Pods => self.send_pods()?,
            UserCommand::Refresh => self.refresh().await?,
            UserCommand::Namespaces => self.send(ViewEvent::Namespaces {
                namespaces: self.controller.namespaces(),
                selected: self.controller.namespace().to_string(),
            })?,
            UserCommand::Namespace(namespace) => {
                self.controller.set_namespace(&namespace);
                self.send_pods()?;
            }
            UserCommand::Select(key) => {
                if let Err(err) = self.controller.select_pod(&key).await {
                    self.report(err)?;
                }
                self.send_stream()?;
            }
            UserCommand::Deselect => {
                self.controller.deselect_pod().await;
                self.send_stream()?;
            }
            UserCommand::Start => {
                if let Err(err) = self.controller.start_stream().await {
                    self.report(err)?;
                }
                self.send_stream()?;
            }
            UserCommand::Stop => {
                self.controller.stop_stream().await;
                self.send_stream()?;
            }
            UserCommand::Search(term) => {
                self.controller.set_search_term(&term);
                self.send_logs()?;
            }
            UserCommand::Logs => self.send_logs()?,
            UserCommand::Clear => {
                self.controller.clear_logs();
                self.send_logs()?;
            }
            UserCommand::Copy => match self.controller.copy_all() {
                Some(text) => self.send(ViewEvent::CopyAll(text))?,
                None => self.send(ViewEvent::Notice("Nothing to copy".into()))?,
            },
            UserCommand::Describe(key) => match self.controller.describe_pod(&key) {
                Ok(yaml) => self.send(ViewEvent::Describe { pod: key, yaml })?,
                Err(err) => self.report(err)?,
            },
            UserCommand::Status => self.send(ViewEvent::Status(self.status()))?,
            UserCommand::Help => {}
            UserCommand::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    fn stream_event(&mut self, ev: StreamEvent) -> Result<()> {
        let line = match &ev {
            StreamEvent::Line { line, .. } => Some(line.clone()),
            StreamEvent::Finished { .. } => None,
        };

        if !self.controller.handle_stream_event(ev) {
            return Ok(());
        }

        match line {
            Some(line) => {
                let term = self.controller.search_term();

                if !filter([&line], term).is_empty() {
                    self.send(ViewEvent::LogLine(highlight(&line, term)))?;
                }
            }
            None => {
                self.send(ViewEvent::Notice("Log stream ended".into()))?;
                self.send_stream()?;
            }
        }

        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        if let Err(err) = self.controller.refresh_pods().await {
            self.report(err)?;
        }

        self.send_pods()
    }

    fn report(&self, err: SessionError) -> Result<()> {
        logger!(error, "{}", err);

        if err.is_transient() {
            return Ok(());
        }

        self.send(ViewEvent::Failed(err.to_string()))
    }

    fn send_contexts(&self) -> Result<()> {
        self.send(ViewEvent::Contexts {
            contexts: self.controller.contexts().to_vec(),
            current: self.controller.current_context().to_string(),
        })
    }

    fn send_pods(&self) -> Result<()> {
        let inventory = self.controller.inventory();

        self.send(ViewEvent::Pods(PodsView {
            context: self.controller.current_context().to_string(),
            namespace: self.controller.namespace().to_string(),
            pods: self.controller.filtered_pods().into_iter().cloned().collect(),
            loading: inventory.is_loading(),
            error: inventory.error().map(String::from),
        }))
    }

    fn send_stream(&self) -> Result<()> {
        self.send(ViewEvent::Stream(self.controller.stream_session()))
    }

    fn send_logs(&self) -> Result<()> {
        self.send(ViewEvent::Logs(self.controller.highlighted_logs()))
    }

    fn status(&self) -> StatusView {
        let stream = self.controller.stream();

        StatusView {
            context: self.controller.current_context().to_string(),
            namespace: self.controller.namespace().to_string(),
            pod: self.controller.selected_pod().cloned(),
            state: stream.state(),
            lines: stream.buffer().len(),
            search_term: self.controller.search_term().to_string(),
            error: stream.error().map(String::from),
        }
    }
}
