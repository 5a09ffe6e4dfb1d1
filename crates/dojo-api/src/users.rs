use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use uuid::Uuid;

use dojo_db::users::ProfileUpdate;
use dojo_types::api::{PictureResponse, ProfileWithStats, StatsPage, UpdateUserRequest, UserPage};
use dojo_types::models::Profile;
use dojo_types::record::RecordKind;
use dojo_types::stats::{ProfileStats, Quarter, stats_by_user};

use crate::error::{ApiError, ApiResult, USERNAME_TAKEN, username_conflict};
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking, today};
use crate::validate;

/// 5 MB upload limit for profile pictures
pub const MAX_PICTURE_SIZE: usize = 5 * 1024 * 1024;

pub const PICTURE_DIR: &str = "profile_pictures";

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /profiles?q=: matching profiles with their current-quarter stats.
pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<ProfileWithStats>>> {
    let quarter = Quarter::containing(today());

    let (profiles, records) = blocking(&state, move |db| {
        let profiles = db.search_profiles(query.q.trim())?;
        let records = db.records_between(quarter.start, quarter.end)?;
        Ok((profiles, records))
    })
    .await?;

    let records: Vec<_> = records.into_iter().filter_map(|r| r.into_model()).collect();
    let mut stats = stats_by_user(&records, &quarter);

    let entries = profiles
        .into_iter()
        .map(|row| {
            let profile = row.into_model();
            let stats = stats.remove(&profile.user_id).unwrap_or_default();
            ProfileWithStats {
                rank_name: profile.rank_display().map(str::to_string),
                profile,
                stats,
            }
        })
        .collect();

    Ok(Json(entries))
}

/// GET /users/{user_id}: everything shown on a member's page.
pub async fn user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserPage>> {
    let uid = user_id.to_string();
    let page = blocking(&state, move |db| {
        let user = db.get_user_by_id(&uid)?.ok_or(ApiError::NotFound("user"))?;
        let profile = db.get_profile(&uid)?.ok_or(ApiError::NotFound("profile"))?;
        let rooms = db.rooms_hosted_by(&uid)?;
        let messages = db.messages_by_user(&uid)?;
        let room_count_all = db.count_rooms()?;
        let topics = db.list_topics(None)?;
        let records = db.records_for_user(&uid, None)?;
        Ok((user, profile, rooms, messages, room_count_all, topics, records))
    })
    .await?;
    let (user, profile, rooms, messages, room_count_all, topics, records) = page;

    let records: Vec<_> = records.into_iter().filter_map(|r| r.into_model()).collect();
    let quarter = Quarter::containing(today());
    let stats = ProfileStats::from_records(&records, &quarter);

    let mut grouped: BTreeMap<String, Vec<_>> = RecordKind::ALL
        .iter()
        .map(|kind| (kind.as_str().to_string(), Vec::new()))
        .collect();
    for record in records {
        grouped.entry(record.kind.as_str().to_string()).or_default().push(record);
    }

    let profile = profile.into_model();
    Ok(Json(UserPage {
        user: user.into_model(),
        rank_name: profile.rank_display().map(str::to_string),
        profile,
        rooms: rooms.into_iter().map(|r| r.into_model()).collect(),
        room_messages: messages.into_iter().map(|m| m.into_model()).collect(),
        room_count_all,
        topics: topics.into_iter().map(|t| t.into_model()).collect(),
        records: grouped,
        quarter,
        stats,
    }))
}

/// GET /users/{user_id}/stats
pub async fn stats(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<StatsPage>> {
    let quarter = Quarter::containing(today());
    let uid = user_id.to_string();
    let records = blocking(&state, move |db| {
        db.get_profile(&uid)?.ok_or(ApiError::NotFound("profile"))?;
        Ok(db.records_for_user(&uid, None)?)
    })
    .await?;

    let records: Vec<_> = records.into_iter().filter_map(|r| r.into_model()).collect();

    Ok(Json(StatsPage {
        user_id,
        quarter,
        stats: ProfileStats::from_records(&records, &quarter),
    }))
}

/// PUT /users/me: edit the caller's account and profile together.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<Profile>> {
    let username = validate::username(&req.username)?.to_string();
    let name = validate::optional("Name", req.name.as_deref(), Some(validate::MAX_NAME_LEN))?.map(str::to_string);
    let about = validate::optional("About", req.about.as_deref(), None)?.map(str::to_string);
    if req.last_promoted.is_some_and(|d| d > today()) {
        return Err(ApiError::BadRequest("Promotion date cannot be in the future".into()));
    }

    let uid = current.id.to_string();
    let email = req.email.trim().to_string();
    let profile = blocking(&state, move |db| {
        if db.username_taken_by_other(&username, &uid)? {
            return Err(ApiError::Conflict(USERNAME_TAKEN.into()));
        }
        let update = ProfileUpdate {
            username: &username,
            email: &email,
            name: name.as_deref(),
            about: about.as_deref(),
            rank: req.rank,
            last_promoted: req.last_promoted,
        };
        if !db.update_profile(&uid, &update).map_err(username_conflict)? {
            return Err(ApiError::NotFound("user"));
        }
        db.get_profile(&uid)?.ok_or(ApiError::NotFound("profile"))
    })
    .await?;

    info!("User {} updated their profile", current.id);
    Ok(Json(profile.into_model()))
}

/// PUT /users/me/picture: raw image bytes; stored under a content hash.
pub async fn upload_picture(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<PictureResponse>> {
    // The body limit layer trips before we see the bytes; keep its 413 in our own format.
    let bytes = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => picture_too_large(),
        _ => ApiError::BadRequest(rejection.body_text()),
    })?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Picture is empty".into()));
    }
    if bytes.len() > MAX_PICTURE_SIZE {
        return Err(picture_too_large());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let ext = picture_extension(content_type).ok_or_else(|| {
        ApiError::UnsupportedMediaType(format!("Unsupported picture type '{content_type}'"))
    })?;

    let file_name = format!("{}.{}", hex::encode(Sha256::digest(&bytes)), ext);
    let dir = state.media_dir.join(PICTURE_DIR);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        error!("Failed to create picture directory {}: {}", dir.display(), e);
        anyhow::Error::from(e)
    })?;

    // Write picture to disk
    let path = dir.join(&file_name);
    let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
        error!("Failed to create file {}: {}", path.display(), e);
        anyhow::Error::from(e)
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", path.display(), e);
        anyhow::Error::from(e)
    })?;
    file.flush().await.map_err(anyhow::Error::from)?;

    let picture = format!("{PICTURE_DIR}/{file_name}");
    let uid = current.id.to_string();
    let stored = picture.clone();
    blocking(&state, move |db| {
        if !db.set_picture(&uid, &stored)? {
            return Err(ApiError::NotFound("profile"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(PictureResponse {
        picture,
        size: bytes.len() as u64,
    }))
}

fn picture_too_large() -> ApiError {
    ApiError::PayloadTooLarge(format!("Pictures are limited to {MAX_PICTURE_SIZE} bytes"))
}

fn picture_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}
