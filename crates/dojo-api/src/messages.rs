use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use dojo_types::api::SendMessageRequest;

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking};

/// POST /rooms/{room_id}/messages: also joins the caller to the room.
pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.body.trim().is_empty() {
        return Err(ApiError::BadRequest("Message body is required".into()));
    }

    let message_id = Uuid::new_v4();
    let rid = room_id.to_string();
    let mid = message_id.to_string();
    let aid = current.id.to_string();
    let message = blocking(&state, move |db| {
        db.get_room(&rid)?.ok_or(ApiError::NotFound("room"))?;
        db.post_message(&mid, &rid, &aid, &req.body)?;
        db.get_message(&mid)?.ok_or(ApiError::NotFound("message"))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message.into_model())))
}

/// DELETE /messages/{message_id}: author only.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let mid = message_id.to_string();
    let caller = current.id;
    blocking(&state, move |db| {
        let message = db.get_message(&mid)?.ok_or(ApiError::NotFound("message"))?.into_model();
        if message.author.id != caller {
            return Err(ApiError::Forbidden("Users can only delete messages they have created."));
        }
        db.delete_message(&mid)?;
        Ok(())
    })
    .await?;

    info!("{} deleted message {}", current.username, message_id);
    Ok(StatusCode::NO_CONTENT)
}
