//! Shared agent definitions for the demo binaries.

use agentry_agent::{LlmAgent, LlmAgentBuilder};
use agentry_core::{Llm, Result};
use agentry_tool::OpenApiToolset;
use std::sync::Arc;

/// Model served through an OpenAI-compatible gateway.
pub const DEFAULT_MODEL: &str = "nvidia/llama-3.3-nemotron-super-49b-v1";

/// Simplified PokeAPI description: three read-only operations against
/// the public https://pokeapi.co service.
pub const POKEAPI_SPEC: &str = r#"{
  "openapi": "3.0.0",
  "info": {
    "title": "PokeAPI",
    "version": "2.0",
    "description": "An API providing data about Pokemon."
  },
  "servers": [
    { "url": "https://pokeapi.co/api/v2", "description": "Main PokeAPI server" }
  ],
  "paths": {
    "/pokemon/{name}": {
      "get": {
        "summary": "Get Pokemon info",
        "operationId": "getPokemonByName",
        "parameters": [
          {
            "name": "name",
            "in": "path",
            "required": true,
            "description": "Name of the Pokemon",
            "schema": { "type": "string" }
          }
        ]
      }
    },
    "/type": {
      "get": {
        "summary": "List all Pokemon types",
        "operationId": "listTypes"
      }
    },
    "/ability/{name}": {
      "get": {
        "summary": "Get info about a Pokemon ability",
        "operationId": "getAbility",
        "parameters": [
          {
            "name": "name",
            "in": "path",
            "required": true,
            "description": "Name of the ability",
            "schema": { "type": "string" }
          }
        ]
      }
    }
  }
}"#;

/// Pokemon expert agent: answers questions by querying PokeAPI.
pub fn pokemon_agent(model: Arc<dyn Llm>) -> Result<LlmAgent> {
    let toolset = OpenApiToolset::from_json_str(POKEAPI_SPEC)?;

    LlmAgentBuilder::new("pokemon_expert_agent")
        .description("Provides Pokemon information using the PokeAPI.")
        .instruction(
            "You are a Pokemon expert assistant. Use the Pokemon API to retrieve details \
             about Pokemon, their types, and abilities.\n\
             When users ask about a Pokemon, retrieve its height, weight, types, abilities, \
             and base stats.\n\
             When users ask about types or abilities, provide definitions and examples.\n\
             Always include the Pokemon name or type in your response clearly.",
        )
        .model(model)
        .toolset(Arc::new(toolset))
        .build()
}

/// Minimal hello-world agent. Its dice tools are not wired up yet, so it
/// answers from the instruction alone.
pub fn dice_agent(model: Arc<dyn Llm>) -> Result<LlmAgent> {
    LlmAgentBuilder::new("dice_agent")
        .description(
            "hello world agent that can roll a dice of 8 sides and check prime numbers.",
        )
        .instruction("You roll dice and answer questions about the outcome of the dice rolls.")
        .model(model)
        // .tool(roll_die)
        // .tool(check_prime)
        .build()
}
