use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use teamline_types::api::{
    AckResponse, AddMemberRequest, CreateChannelRequest, ItemResponse, ListResponse,
};

use crate::error::ApiError;
use crate::populate;
use crate::state::AppState;

/// List all channels, newest first.
pub async fn list_channels(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_channels()?;
    let channels = rows
        .iter()
        .map(|row| populate::channel(&state.db, row))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(ListResponse {
        success: true,
        count: channels.len(),
        total: None,
        data: channels,
    }))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_channel(&id.to_string())?
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    Ok(Json(ItemResponse {
        success: true,
        message: None,
        data: populate::channel(&state.db, &row)?,
    }))
}

/// Create a channel. The creator is added to the member list automatically,
/// whether or not the request mentions them.
pub async fn create_channel(
    State(state): State<AppState>,
    Json(req): Json<CreateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Channel name is required"));
    }

    state
        .db
        .get_user(&req.created_by.to_string())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();
    state.db.create_channel(
        &id.to_string(),
        name,
        &req.description,
        req.is_private,
        &req.created_by.to_string(),
        &now,
    )?;

    let row = state
        .db
        .get_channel(&id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("channel vanished after insert"))?;

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse {
            success: true,
            message: Some("Channel created".into()),
            data: populate::channel(&state.db, &row)?,
        }),
    ))
}

/// Add a member to a channel. Rejects with 400 if already a member.
pub async fn add_member(
    State(state): State<AppState>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let channel_id = req.channel_id.to_string();
    let user_id = req.user_id.to_string();

    state
        .db
        .get_channel(&channel_id)?
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;
    state
        .db
        .get_user(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if state.db.is_member(&channel_id, &user_id)? {
        return Err(ApiError::validation("User is already a member of the channel"));
    }

    state.db.add_member(&channel_id, &user_id)?;

    let row = state
        .db
        .get_channel(&channel_id)?
        .ok_or_else(|| anyhow::anyhow!("channel vanished after member add"))?;

    Ok(Json(ItemResponse {
        success: true,
        message: Some("Member added".into()),
        data: populate::channel(&state.db, &row)?,
    }))
}

/// Delete a channel along with its messages and their reactions.
pub async fn delete_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.db.delete_channel(&id.to_string())?;
    if !deleted {
        return Err(ApiError::not_found("Channel not found"));
    }

    Ok(Json(AckResponse {
        success: true,
        message: "Channel deleted".into(),
    }))
}
