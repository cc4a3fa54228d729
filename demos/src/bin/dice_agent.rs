//! Bare hello-world agent definition.
//!
//! Builds the dice agent, reports its configuration, and exits. The dice
//! tools are not wired up yet, so there is nothing to converse with.

use agentry_core::Agent;
use agentry_demos::{DEFAULT_MODEL, dice_agent};
use agentry_model::{OpenAICompatible, OpenAICompatibleConfig};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let model_name =
        std::env::var("AGENTRY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

    let mut config = OpenAICompatibleConfig::new(api_key, model_name);
    if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    let model = Arc::new(OpenAICompatible::new(config)?);

    let agent = dice_agent(model)?;

    tracing::info!(
        agent = %agent.name(),
        model = %agent.model_name(),
        "Built dice agent"
    );
    println!("Agent: {}", agent.name());
    println!("Description: {}", agent.description());
    println!("Model: {}", agent.model_name());

    Ok(())
}
