use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use dojo_db::rooms::RoomFields;
use dojo_types::api::{RoomPage, RoomRequest, RoomsPage, TopicsPage};
use dojo_types::models::{Message, Room, TopicWithCount, UserSummary};

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking};
use crate::users::SearchQuery;
use crate::validate;

/// Topics and messages shown beside the room list.
const SIDEBAR_LIMIT: u32 = 5;

const ACTIVITY_LIMIT: u32 = 100;

/// Validated, owned copy of a room form.
struct RoomForm {
    topic: String,
    name: String,
    description: Option<String>,
}

impl RoomForm {
    fn parse(req: &RoomRequest) -> ApiResult<Self> {
        Ok(Self {
            topic: validate::required("Topic", &req.topic, validate::MAX_TITLE_LEN)?.to_string(),
            name: validate::required("Name", &req.name, validate::MAX_TITLE_LEN)?.to_string(),
            description: validate::optional("Description", req.description.as_deref(), None)?.map(str::to_string),
        })
    }

    fn fields(&self) -> RoomFields<'_> {
        RoomFields {
            topic: &self.topic,
            name: &self.name,
            description: self.description.as_deref(),
        }
    }
}

/// GET /rooms?q=
pub async fn rooms(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<RoomsPage>> {
    let page = blocking(&state, move |db| {
        let q = query.q.trim();
        let rooms: Vec<Room> = db.search_rooms(q)?.into_iter().map(|r| r.into_model()).collect();
        Ok(RoomsPage {
            room_count: rooms.len() as u32,
            rooms,
            topics: db.list_topics(Some(SIDEBAR_LIMIT))?.into_iter().map(|t| t.into_model()).collect(),
            room_count_all: db.count_rooms()?,
            room_messages: db
                .recent_messages_matching(q, SIDEBAR_LIMIT)?
                .into_iter()
                .map(|m| m.into_model())
                .collect(),
        })
    })
    .await?;

    Ok(Json(page))
}

/// GET /rooms/{room_id}
pub async fn room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> ApiResult<Json<RoomPage>> {
    let rid = room_id.to_string();
    let page = blocking(&state, move |db| {
        let room = db.get_room(&rid)?.ok_or(ApiError::NotFound("room"))?;
        let participants = db
            .room_participants(&rid)?
            .into_iter()
            .filter_map(|(id, username)| Some(UserSummary { id: id.parse().ok()?, username }))
            .collect();
        Ok(RoomPage {
            room: room.into_model(),
            room_messages: db.room_messages(&rid)?.into_iter().map(|m| m.into_model()).collect(),
            participants,
        })
    })
    .await?;

    Ok(Json(page))
}

/// POST /rooms: the caller becomes host.
pub async fn create_room(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<RoomRequest>,
) -> ApiResult<impl IntoResponse> {
    let form = RoomForm::parse(&req)?;
    let room_id = Uuid::new_v4();

    let rid = room_id.to_string();
    let host = current.id.to_string();
    let room = blocking(&state, move |db| {
        db.create_room(&rid, &host, &form.fields())?;
        db.get_room(&rid)?.ok_or(ApiError::NotFound("room"))
    })
    .await?;

    info!("{} created room {}", current.username, room_id);
    Ok((StatusCode::CREATED, Json(room.into_model())))
}

/// PUT /rooms/{room_id}: host only.
pub async fn update_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<RoomRequest>,
) -> ApiResult<Json<Room>> {
    let form = RoomForm::parse(&req)?;

    let rid = room_id.to_string();
    let room = blocking(&state, move |db| {
        let existing = db.get_room(&rid)?.ok_or(ApiError::NotFound("room"))?.into_model();
        ensure_host(&existing, &current, "Users can only edit rooms they have created.")?;

        db.update_room(&rid, &form.fields())?;
        db.get_room(&rid)?.ok_or(ApiError::NotFound("room"))
    })
    .await?;

    Ok(Json(room.into_model()))
}

/// DELETE /rooms/{room_id}: host only; messages go with it.
pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let rid = room_id.to_string();
    let user = current.username.clone();
    blocking(&state, move |db| {
        let existing = db.get_room(&rid)?.ok_or(ApiError::NotFound("room"))?.into_model();
        ensure_host(&existing, &current, "Users can only delete rooms they have created.")?;
        db.delete_room(&rid)?;
        Ok(())
    })
    .await?;

    info!("{} deleted room {}", user, room_id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /topics?q=: matching topics with how many rooms use each.
pub async fn topics(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<TopicsPage>> {
    let page = blocking(&state, move |db| {
        let topics = db
            .search_topics(query.q.trim())?
            .into_iter()
            .filter_map(|t| {
                Some(TopicWithCount {
                    id: t.id.parse().ok()?,
                    name: t.name,
                    room_count: t.room_count,
                })
            })
            .collect();
        Ok(TopicsPage {
            topics,
            room_count_all: db.count_rooms()?,
        })
    })
    .await?;

    Ok(Json(page))
}

/// GET /activity: newest messages across every room.
pub async fn activity(State(state): State<AppState>) -> ApiResult<Json<Vec<Message>>> {
    let messages = blocking(&state, |db| Ok(db.recent_messages(ACTIVITY_LIMIT)?)).await?;
    Ok(Json(messages.into_iter().map(|m| m.into_model()).collect()))
}

/// Rooms whose host account is gone can no longer be edited by anyone.
fn ensure_host(room: &Room, current: &CurrentUser, denial: &'static str) -> ApiResult<()> {
    match &room.host {
        Some(host) if host.id == current.id => Ok(()),
        _ => Err(ApiError::Forbidden(denial)),
    }
}
