use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};
use t3ext_slack::{ExtensionCommandHandler, SlackMessage, SlashCommandPayload};
use tracing::warn;
use uuid::Uuid;

use crate::health;

pub const SLASH_COMMAND_PATH: &str = "/slack/extension";

#[derive(Clone)]
struct CommandState {
    handler: Arc<ExtensionCommandHandler>,
}

/// Slash-command endpoint plus `/health`.
pub fn router(handler: Arc<ExtensionCommandHandler>) -> Router {
    let health = health::router(handler.source().clone());
    Router::new()
        .route(SLASH_COMMAND_PATH, post(slash_command))
        .with_state(CommandState { handler })
        .merge(health)
}

/// Always answers 200 with a message body; Slack shows anything else as a
/// generic failure.
async fn slash_command(
    State(state): State<CommandState>,
    form: Result<Form<SlashCommandPayload>, FormRejection>,
) -> Json<SlackMessage> {
    let request_id = Uuid::new_v4().to_string();
    let payload = match form {
        Ok(Form(payload)) => payload,
        Err(rejection) => {
            warn!(
                event_name = "slack.command.undecodable",
                correlation_id = %request_id,
                error = %rejection,
                "slash command body could not be decoded; treating it as empty"
            );
            SlashCommandPayload::default()
        }
    };

    Json(state.handler.handle(&payload, &request_id).await)
}
