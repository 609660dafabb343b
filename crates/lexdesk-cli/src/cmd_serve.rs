use std::sync::Arc;

use lexdesk_ai::{AiConfig, CompletionClient};
use lexdesk_serve::ServeConfig;

pub fn execute(bind: &str, port: u16) -> anyhow::Result<()> {
    let config = ServeConfig {
        bind: bind.to_string(),
        port,
    };
    let ai = AiConfig::from_env();
    tracing::info!(?ai, "upstream model settings");
    let client = ai
        .client()
        .map(|c| Arc::new(c) as Arc<dyn CompletionClient>);
    tokio::runtime::Runtime::new()?.block_on(lexdesk_serve::serve(config, client))
}
