use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use kube::{
    config::{KubeConfigOptions, Kubeconfig, NamedContext},
    Client, Config,
};

use crate::logger;

/// Clients per kubeconfig context, built the first time a context is used.
#[derive(Default)]
pub struct KubeStore {
    inner: BTreeMap<String, Client>,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("contexts", &self.inner.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KubeStore {
    pub(super) fn find_context<'a>(
        kubeconfig: &'a Kubeconfig,
        context_name: &str,
    ) -> Result<&'a NamedContext> {
        kubeconfig
            .contexts
            .iter()
            .find(|ctx| ctx.name == context_name)
            .ok_or_else(|| anyhow!("Cannot find context {}", context_name))
    }

    fn kubeconfig_options(context: &NamedContext) -> KubeConfigOptions {
        KubeConfigOptions {
            context: Some(context.name.to_string()),
            ..Default::default()
        }
    }

    async fn build_client(kubeconfig: &Kubeconfig, context: &NamedContext) -> Result<Client> {
        let options = Self::kubeconfig_options(context);

        let config = Config::from_custom_kubeconfig(kubeconfig.clone(), &options).await?;

        Ok(Client::try_from(config)?)
    }

    pub async fn ensure_context(&mut self, kubeconfig: &Kubeconfig, context_name: &str) -> Result<()> {
        if self.inner.contains_key(context_name) {
            return Ok(());
        }

        let context = Self::find_context(kubeconfig, context_name)?;
        let client = Self::build_client(kubeconfig, context).await?;

        logger!(info, "Built client for context {}", context.name);

        self.inner.insert(context.name.to_string(), client);

        Ok(())
    }

    pub fn get(&self, context: &str) -> Result<Client> {
        self.inner
            .get(context)
            .cloned()
            .ok_or_else(|| anyhow!("Cannot get context {}", context))
    }

    pub fn contains(&self, context: &str) -> bool {
        self.inner.contains_key(context)
    }
}
