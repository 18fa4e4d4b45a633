use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use teamline_types::api::{
    AckResponse, CreateMessageRequest, ItemResponse, ListResponse, UpdateMessageRequest,
};
use teamline_types::events::ServerEvent;

use crate::error::ApiError;
use crate::populate;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
}

fn default_limit() -> u32 {
    50
}

/// Paginated messages for a channel: the page covers the most recent
/// messages (offset by `skip`), returned oldest-to-newest within the page.
pub async fn get_messages_by_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking store reads off the async runtime
    let db = state.db.clone();
    let cid = channel_id.to_string();
    let limit = query.limit.min(200);
    let skip = query.skip;

    let (mut page, total) = tokio::task::spawn_blocking(move || {
        let rows = db.messages_by_channel(&cid, limit, skip)?;
        let total = db.count_messages(&cid)?;
        let page = populate::messages_page(&db, rows)?;
        Ok::<_, anyhow::Error>((page, total))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    // Query runs newest-first for the LIMIT/OFFSET; flip to chronological.
    page.reverse();

    Ok(Json(ListResponse {
        success: true,
        count: page.len(),
        total: Some(total),
        data: page,
    }))
}

/// Create a message. This is the single point where persistence and
/// broadcast are sequenced: the write lands in the store, the room gets the
/// populated message, and only then does the HTTP response go out. The
/// response body is a redundant echo of the broadcast payload; clients
/// deduplicate by message id.
pub async fn create_message(
    State(state): State<AppState>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::validation("Message content is required"));
    }

    let message_id = Uuid::new_v4();
    let now = Utc::now();

    let db = state.db.clone();
    let cid = req.channel.to_string();
    let sid = req.sender.to_string();
    let content = req.content.trim().to_string();
    let kind = req.kind;

    let (channel_name, message) = tokio::task::spawn_blocking(move || {
        let channel = db
            .get_channel(&cid)?
            .ok_or_else(|| ApiError::not_found("Channel not found"))?;
        db.get_user(&sid)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        db.insert_message(
            &message_id.to_string(),
            &cid,
            &sid,
            &content,
            kind.as_str(),
            &now.to_rfc3339(),
        )?;

        let row = db
            .get_message(&message_id.to_string())?
            .ok_or_else(|| anyhow::anyhow!("message vanished after insert"))?;
        let message = populate::message(&db, &row)?;
        Ok::<_, ApiError>((channel.name, message))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    // Broadcast to the room before responding, so every subscribed client
    // (the author's other connections included) gets the canonical copy.
    state
        .rooms
        .broadcast(req.channel, ServerEvent::NewMessage(message.clone()), None)
        .await;

    // External mirroring is best-effort: it runs detached, and a failure
    // never rolls back the persisted message or suppresses the broadcast.
    if let Some(bridge) = &state.bridge {
        let bridge = bridge.clone();
        let username = message.sender.username.clone();
        let content = message.content.clone();
        tokio::spawn(async move {
            if let Err(e) = bridge.mirror_message(&channel_name, &username, &content).await {
                warn!("external mirror failed: {:#}", e);
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse {
            success: true,
            message: Some("Message sent".into()),
            data: message,
        }),
    ))
}

/// Edit a message in place: content replaced, edited flag set.
pub async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::validation("Message content is required"));
    }

    let updated = state
        .db
        .update_message(&id.to_string(), req.content.trim(), &Utc::now().to_rfc3339())?;
    if !updated {
        return Err(ApiError::not_found("Message not found"));
    }

    let row = state
        .db
        .get_message(&id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("message vanished after update"))?;
    let message = populate::message(&state.db, &row)?;

    state
        .rooms
        .broadcast(
            message.channel_id,
            ServerEvent::MessageUpdated(message.clone()),
            None,
        )
        .await;

    Ok(Json(ItemResponse {
        success: true,
        message: Some("Message updated".into()),
        data: message,
    }))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_message(&id.to_string())?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    state.db.delete_message(&id.to_string())?;

    let channel_id = row
        .channel_id
        .parse::<Uuid>()
        .map_err(|e| anyhow::anyhow!("corrupt channel id on message {}: {e}", row.id))?;
    state
        .rooms
        .broadcast(channel_id, ServerEvent::MessageDeleted { message_id: id }, None)
        .await;

    Ok(Json(AckResponse {
        success: true,
        message: "Message deleted".into(),
    }))
}
