use crate::InvocationContext;
use agentry_core::{Agent, AgentryError, Content, Event, EventStream, LlmResponse, Result};
use agentry_session::{GetRequest, SessionService};
use async_stream::stream;
use futures::StreamExt;
use std::sync::Arc;

pub struct RunnerConfig {
    pub app_name: String,
    pub agent: Arc<dyn Agent>,
    pub session_service: Arc<dyn SessionService>,
}

/// Drives an agent against a session.
pub struct Runner {
    app_name: String,
    agent: Arc<dyn Agent>,
    session_service: Arc<dyn SessionService>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner").field("app_name", &self.app_name).finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        if config.app_name.is_empty() {
            return Err(AgentryError::Config("app_name must not be empty".to_string()));
        }

        Ok(Self {
            app_name: config.app_name,
            agent: config.agent,
            session_service: config.session_service,
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Run one user turn against an existing session.
    ///
    /// The session must have been created beforehand; a missing session is a
    /// [`AgentryError::Session`]. The user turn and every event the agent
    /// yields are appended to the session as they stream.
    pub async fn run(
        &self,
        user_id: String,
        session_id: String,
        user_content: Content,
    ) -> Result<EventStream> {
        let app_name = self.app_name.clone();
        let agent = self.agent.clone();
        let session_service = self.session_service.clone();

        let s = stream! {
            let session = match session_service
                .get(GetRequest {
                    app_name: app_name.clone(),
                    user_id: user_id.clone(),
                    session_id: session_id.clone(),
                    num_recent_events: None,
                })
                .await
            {
                Ok(s) => s,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            // Replay history from the event log. Partial streaming chunks
            // are skipped; the complete turn they belong to is also logged.
            let history: Vec<Content> = session
                .events()
                .all()
                .iter()
                .filter(|e| !e.llm_response.partial)
                .filter_map(|e| e.content().cloned())
                .collect();

            let invocation_id = format!("inv-{}", uuid::Uuid::new_v4());
            tracing::info!(
                invocation_id = %invocation_id,
                app_name = %app_name,
                session_id = %session_id,
                agent = %agent.name(),
                "Starting invocation"
            );

            let ctx = Arc::new(InvocationContext::new(
                invocation_id.clone(),
                agent.name().to_string(),
                user_id.clone(),
                app_name.clone(),
                session_id.clone(),
                user_content.clone(),
                history,
            ));

            let mut user_event = Event::new(&invocation_id);
            user_event.author = "user".to_string();
            user_event.llm_response = LlmResponse::new(user_content);

            if let Err(e) = session_service.append_event(&session_id, user_event).await {
                yield Err(e);
                return;
            }

            let mut agent_stream = match agent.run(ctx).await {
                Ok(s) => s,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            while let Some(result) = agent_stream.next().await {
                match result {
                    Ok(event) => {
                        if let Err(e) =
                            session_service.append_event(&session_id, event.clone()).await
                        {
                            yield Err(e);
                            return;
                        }
                        yield Ok(event);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(s))
    }
}
