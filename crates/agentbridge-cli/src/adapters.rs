//! Adapter construction, connection and teardown.

use std::sync::Arc;

use agentbridge_adapters::{
    Adapter, CallRelayAdapter, ContactsAdapter, DocsAdapter, DriveAdapter, GmailAdapter,
    ShopifyAdapter,
};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;

/// Build every adapter the configuration enables, connected and ready.
///
/// `call_for_me` is only registered when a relay URL is configured.
pub async fn init_adapters(config: &Config) -> Result<Vec<Arc<dyn Adapter>>> {
    let mut adapters: Vec<Box<dyn Adapter>> = vec![
        Box::new(ShopifyAdapter::new("shopify").with_api_version(&config.shopify_api_version)),
        Box::new(DriveAdapter::new("google_drive")),
        Box::new(DocsAdapter::new("google_docs")),
        Box::new(GmailAdapter::new("gmail")),
        Box::new(ContactsAdapter::new("google_contacts")),
    ];
    if config.relay.relay_url.is_some() {
        adapters.push(Box::new(CallRelayAdapter::new("call_relay", config.relay.clone())));
    } else {
        info!("no relay URL configured, call_for_me disabled");
    }

    for adapter in &mut adapters {
        adapter
            .connect()
            .await
            .with_context(|| format!("failed to connect adapter `{}`", adapter.id()))?;
    }

    Ok(adapters.into_iter().map(Arc::from).collect())
}

/// Disconnect every adapter no longer shared with the server.
pub async fn shutdown_adapters(adapters: &mut [Arc<dyn Adapter>]) {
    for adapter in adapters.iter_mut() {
        let id = adapter.id().to_string();
        let Some(adapter) = Arc::get_mut(adapter) else {
            warn!(adapter = %id, "adapter still in use, skipping disconnect");
            continue;
        };
        if let Err(e) = adapter.disconnect().await {
            warn!(adapter = %id, error = %e, "disconnect failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentbridge_adapters::RelayConfig;

    fn config(relay_url: Option<&str>) -> Config {
        let mut relay = RelayConfig::new("cfg");
        relay.relay_url = relay_url.map(str::to_string);
        Config {
            shopify_api_version: "2024-01".into(),
            relay,
        }
    }

    fn tool_names(adapters: &[Arc<dyn Adapter>]) -> Vec<String> {
        adapters
            .iter()
            .flat_map(|a| a.tools())
            .map(|t| t.name)
            .collect()
    }

    #[tokio::test]
    async fn relay_is_opt_in() {
        let adapters = init_adapters(&config(None)).await.unwrap();
        assert_eq!(adapters.len(), 5);
        assert!(!tool_names(&adapters).iter().any(|n| n == "call_for_me"));

        let adapters = init_adapters(&config(Some("http://127.0.0.1:9/mcp"))).await.unwrap();
        assert_eq!(adapters.len(), 6);
        assert!(tool_names(&adapters).iter().any(|n| n == "call_for_me"));
    }

    #[tokio::test]
    async fn tool_names_are_unique() {
        let adapters = init_adapters(&config(Some("http://127.0.0.1:9/mcp"))).await.unwrap();
        let mut names = tool_names(&adapters);
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[tokio::test]
    async fn shutdown_disconnects_unshared_adapters() {
        let mut adapters = init_adapters(&config(None)).await.unwrap();
        let shared = Arc::clone(&adapters[0]);
        shutdown_adapters(&mut adapters).await;
        assert_eq!(
            shared.health_check().await.unwrap(),
            agentbridge_adapters::HealthStatus::Healthy
        );
        drop(shared);
        shutdown_adapters(&mut adapters).await;
        assert_eq!(
            adapters[0].health_check().await.unwrap(),
            agentbridge_adapters::HealthStatus::Unhealthy
        );
    }
}
