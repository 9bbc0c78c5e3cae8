use std::path::PathBuf;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::{AsyncBufReadExt as _, TryStreamExt as _};
use k8s_openapi::api::core::v1::Pod as KubePod;
use kube::{
    api::{ListParams, LogParams},
    config::Kubeconfig,
    Api,
};
use tokio::sync::RwLock;

use crate::{
    logger,
    session::{Context, ContextList, Pod},
};

use super::{
    gateway::{ClusterGateway, LogSink, StreamHandle, StreamTarget},
    pod::to_session_pod,
    store::KubeStore,
};

pub fn read_kubeconfig(path: Option<PathBuf>) -> Result<Kubeconfig> {
    let kubeconfig = if let Some(path) = path {
        Kubeconfig::read_from(path)?
    } else {
        Kubeconfig::read()?
    };

    Ok(kubeconfig)
}

/// `ClusterGateway` backed by a kubeconfig and the Kubernetes API.
pub struct KubeGateway {
    kubeconfig: Kubeconfig,
    store: RwLock<KubeStore>,
    current_context: RwLock<String>,
    tail_lines: Option<i64>,
}

impl KubeGateway {
    /// `context` overrides the kubeconfig's current-context when given.
    pub fn new(kubeconfig: Kubeconfig, context: Option<String>, tail_lines: Option<i64>) -> Result<Self> {
        let current_context = match context {
            Some(context) => {
                KubeStore::find_context(&kubeconfig, &context)?;
                context
            }
            None => kubeconfig.current_context.clone().unwrap_or_default(),
        };

        Ok(Self {
            kubeconfig,
            store: RwLock::new(KubeStore::default()),
            current_context: RwLock::new(current_context),
            tail_lines,
        })
    }

    async fn client(&self, context: &str) -> Result<kube::Client> {
        {
            let store = self.store.read().await;

            if store.contains(context) {
                return store.get(context);
            }
        }

        let mut store = self.store.write().await;

        store.ensure_context(&self.kubeconfig, context).await?;

        store.get(context)
    }

    fn contexts(&self) -> Vec<Context> {
        self.kubeconfig
            .contexts
            .iter()
            .map(|named| {
                let (cluster, user) = named
                    .context
                    .as_ref()
                    .map(|ctx| (ctx.cluster.clone(), ctx.user.clone().unwrap_or_default()))
                    .unwrap_or_default();

                Context {
                    name: named.name.clone(),
                    cluster,
                    user,
                }
            })
            .collect()
    }

    fn log_params(&self) -> LogParams {
        LogParams {
            follow: true,
            tail_lines: self.tail_lines,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    async fn list_contexts(&self) -> Result<ContextList> {
        Ok(ContextList {
            contexts: self.contexts(),
            current_context: self.current_context.read().await.clone(),
        })
    }

    async fn switch_context(&self, context: &str) -> Result<String> {
        if !self.kubeconfig.contexts.iter().any(|ctx| ctx.name == context) {
            return Err(anyhow!("Cannot find context {}", context));
        }

        self.client(context).await?;

        let mut current = self.current_context.write().await;
        *current = context.to_string();

        Ok(current.clone())
    }

    async fn list_pods(&self, context: &str) -> Result<Vec<Pod>> {
        let client = self.client(context).await?;

        let api: Api<KubePod> = Api::all(client);

        let list = api.list(&ListParams::default()).await?;

        logger!(debug, "Fetched {} pods from {}", list.items.len(), context);

        list.items.iter().map(to_session_pod).collect()
    }

    async fn open_log_stream(&self, target: &StreamTarget, sink: LogSink) -> Result<StreamHandle> {
        let client = self.client(&target.context).await?;

        let api: Api<KubePod> = Api::namespaced(client, &target.namespace);

        let stream = api.log_stream(&target.pod_name, &self.log_params()).await?;

        let id = sink.stream();
        let pod_name = target.pod_name.clone();

        let task = tokio::spawn(async move {
            let mut lines = stream.lines();

            loop {
                match lines.try_next().await {
                    Ok(Some(line)) => {
                        if !sink.send(line) {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        logger!(error, "Log stream of {} failed: {}", pod_name, err);
                        break;
                    }
                }
            }

            sink.finish();
        });

        Ok(StreamHandle::new(id, task.abort_handle()))
    }

    async fn close_log_stream(&self, handle: &mut StreamHandle) -> Result<()> {
        handle.cancel();
        Ok(())
    }
}
