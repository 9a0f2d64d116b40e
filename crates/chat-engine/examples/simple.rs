use std::sync::Arc;

use ai_provider::ProviderRegistry;
use app_config::AppConfig;
use chat_engine::ChatEngine;
use chat_store::ChatStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = AppConfig::load_or_default();
    let store = ChatStore::new(&config.base_dir).with_id_width(config.conversation_id_width);

    let registry = Arc::new(ProviderRegistry::with_defaults());
    println!("registered providers: {:?}", registry.specs());

    let mut engine = ChatEngine::new(
        store,
        registry,
        config.default_provider.clone(),
        config.default_model.clone(),
    );
    if let Some(prompt) = config.system_prompt.clone() {
        engine = engine.with_system_seed(prompt);
    }

    let outcome = engine
        .send_message("demo-user", None, "Say hello in one sentence.")
        .await?;
    println!(
        "[{}] {}",
        outcome.conversation_id, outcome.assistant_message.content
    );

    for entry in engine.conversation_titles("demo-user")? {
        println!("{}  {}", entry.id, entry.title);
    }

    Ok(())
}
