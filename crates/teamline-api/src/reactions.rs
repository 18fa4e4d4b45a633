use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use teamline_types::api::{ItemResponse, ToggleReactionRequest};
use teamline_types::events::ServerEvent;

use crate::error::ApiError;
use crate::populate;
use crate::state::AppState;

/// Toggle a user's reaction on a message: adds the (emoji, user) pair if
/// absent, removes it if present. When the removal empties an emoji's user
/// set, the emoji group disappears from the message entirely.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.emoji.is_empty() {
        return Err(ApiError::validation("Emoji is required"));
    }

    state
        .db
        .get_message(&message_id.to_string())?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    let reaction_id = Uuid::new_v4();
    state.db.toggle_reaction(
        &reaction_id.to_string(),
        &message_id.to_string(),
        &req.user_id.to_string(),
        &req.emoji,
    )?;

    let row = state
        .db
        .get_message(&message_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("message vanished during reaction toggle"))?;
    let message = populate::message(&state.db, &row)?;

    state
        .rooms
        .broadcast(
            message.channel_id,
            ServerEvent::ReactionAdded {
                message_id,
                message: message.clone(),
            },
            None,
        )
        .await;

    Ok(Json(ItemResponse {
        success: true,
        message: Some("Reaction updated".into()),
        data: message,
    }))
}
