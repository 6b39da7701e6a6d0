//! Action backends: dispatch in-process or post to a running gateway.

use std::sync::Arc;

use callmodel_core::{
    ActionEvent, ActionResponse, CallModelConfig, Dispatcher, MockRuntime, handle_event,
};
use tracing::{debug, info};

use crate::RunOptions;

/// Where actions are handled.
pub enum Backend {
    /// Handle actions in this process.
    Local(Dispatcher),
    /// Post actions to a gateway's `/invoke` endpoint.
    Remote(GatewayClient),
}

impl Backend {
    /// Pick the backend the options ask for.
    pub fn from_options(config: &CallModelConfig, options: &RunOptions) -> Self {
        if let Some(url) = &options.gateway {
            info!(gateway = url.as_str(), "Using remote gateway");
            return Backend::Remote(GatewayClient::new(url));
        }
        if options.offline {
            info!("Offline mode: answering from mock runtime");
            return Backend::Local(Dispatcher::with_runtime(
                config,
                Arc::new(MockRuntime::new()),
            ));
        }
        Backend::Local(Dispatcher::from_config(config))
    }

    /// Handle one action and return its reply envelope.
    pub async fn send(&self, event: &ActionEvent) -> anyhow::Result<ActionResponse> {
        match self {
            Backend::Local(dispatcher) => Ok(handle_event(dispatcher, event).await?),
            Backend::Remote(client) => client.invoke(event).await,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Backend::Local(dispatcher) => format!(
                "in-process (bucket: {})",
                dispatcher.store_config().bucket
            ),
            Backend::Remote(client) => format!("gateway {}", client.base_url),
        }
    }
}

/// Minimal HTTP client for the gateway.
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn invoke_url(&self) -> String {
        format!("{}/invoke", self.base_url)
    }

    pub async fn invoke(&self, event: &ActionEvent) -> anyhow::Result<ActionResponse> {
        let url = self.invoke_url();
        debug!(url = url.as_str(), "Posting action to gateway");
        let response = self.client.post(&url).json(event).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body["error"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            anyhow::bail!("Gateway rejected the action ({}): {}", status.as_u16(), message);
        }

        Ok(response.json::<ActionResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_url_trims_trailing_slash() {
        let client = GatewayClient::new("http://127.0.0.1:8787/");
        assert_eq!(client.invoke_url(), "http://127.0.0.1:8787/invoke");
    }

    #[test]
    fn test_gateway_option_wins_over_offline() {
        let options = RunOptions {
            gateway: Some("http://localhost:8787".into()),
            offline: true,
        };
        let backend = Backend::from_options(&CallModelConfig::default(), &options);
        assert!(matches!(backend, Backend::Remote(_)));
        assert_eq!(backend.describe(), "gateway http://localhost:8787");
    }

    #[tokio::test]
    async fn test_offline_backend_answers_from_mock() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CallModelConfig::default();
        config.store.root = dir.path().to_path_buf();
        let options = RunOptions {
            gateway: None,
            offline: true,
        };
        let backend = Backend::from_options(&config, &options);

        let event = ActionEvent::call_model("call-model", "meta.llama2-13b-chat-v1", "hi");
        let reply = backend.send(&event).await.unwrap();
        assert_eq!(reply.status(), 200);
        assert!(reply.body().contains("mock model"));
    }
}
