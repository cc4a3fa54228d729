//! Pokemon expert agent backed by the public PokeAPI.
//!
//! Set OPENAI_API_KEY (and optionally OPENAI_BASE_URL for a gateway) before
//! running:
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run --bin pokemon_agent
//! ```

use agentry_core::Content;
use agentry_demos::{DEFAULT_MODEL, pokemon_agent};
use agentry_model::{OpenAICompatible, OpenAICompatibleConfig};
use agentry_runner::{Runner, RunnerConfig};
use agentry_session::{CreateRequest, InMemorySessionService, SessionService};
use anyhow::Context;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;

const APP_NAME: &str = "pokemon_agent_app";
const USER_ID: &str = "user_pokemon";

async fn call_pokemon_agent(runner: &Runner, session_id: &str, query: &str) {
    println!("\n=== Pokemon Agent Interaction ===");
    println!("Query: {query}");

    let content = Content::new("user").with_text(query);
    let mut final_response_text = "No response received.".to_string();

    // One failing query must not take down the rest of the run.
    let result: anyhow::Result<()> = async {
        let mut stream = runner
            .run(USER_ID.to_string(), session_id.to_string(), content)
            .await?;

        while let Some(event) = stream.next().await {
            let event = event?;

            let calls = event.function_calls();
            if let Some((name, args)) = calls.first() {
                println!("-> Agent called: {name} with args {args}");
                continue;
            }

            let responses = event.function_responses();
            if let Some(response) = responses.first() {
                println!("-> Function response: {}", response.name);
                continue;
            }

            if event.is_final_response() {
                if let Some(text) = event.content().and_then(|c| c.text()) {
                    final_response_text = text.trim().to_string();
                }
            }
        }

        Ok(())
    }
    .await;

    match result {
        Ok(()) => println!("\nFinal Response: {final_response_text}"),
        Err(e) => println!("Error occurred: {e}"),
    }

    println!("{}", "=".repeat(40));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
    let model_name =
        std::env::var("AGENTRY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

    let mut config = OpenAICompatibleConfig::new(api_key, model_name);
    if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    let model = Arc::new(OpenAICompatible::new(config)?);

    let agent = Arc::new(pokemon_agent(model)?);

    let session_service = Arc::new(InMemorySessionService::new());
    let session_id = format!("session_pokemon_{}", uuid::Uuid::new_v4());
    session_service
        .create(CreateRequest {
            app_name: APP_NAME.to_string(),
            user_id: USER_ID.to_string(),
            session_id: Some(session_id.clone()),
            state: HashMap::new(),
        })
        .await?;

    let runner = Runner::new(RunnerConfig {
        app_name: APP_NAME.to_string(),
        agent,
        session_service,
    })?;

    println!("Starting Pokemon Agent...");
    call_pokemon_agent(&runner, &session_id, "Tell me about Pikachu.").await;
    call_pokemon_agent(&runner, &session_id, "What is the ability 'blaze'?").await;
    call_pokemon_agent(&runner, &session_id, "List all Pokemon types.").await;
    println!("Done.");

    Ok(())
}
