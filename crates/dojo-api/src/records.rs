use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use dojo_db::Database;
use dojo_db::records::RecordFields;
use dojo_types::api::{RecordRequest, RecordsPage};
use dojo_types::models::ProgressRecord;
use dojo_types::record::RecordKind;

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking, today};

const DENIED: &str = "Users can only change their own progress records.";

fn parse_kind(slug: &str) -> ApiResult<RecordKind> {
    RecordKind::from_slug(slug).ok_or(ApiError::NotFound("record kind"))
}

/// Owned, validated record fields.
struct RecordForm {
    date: chrono::NaiveDate,
    label: Option<String>,
    amount: Option<i64>,
}

impl RecordForm {
    fn parse(kind: RecordKind, req: RecordRequest) -> ApiResult<Self> {
        kind.validate(req.label.as_deref(), req.amount)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok(Self {
            date: req.date.unwrap_or_else(today),
            label: req.label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            amount: req.amount,
        })
    }

    fn fields(&self) -> RecordFields<'_> {
        RecordFields {
            date: self.date,
            label: self.label.as_deref(),
            amount: self.amount,
        }
    }
}

fn load_record(db: &Database, id: &str) -> ApiResult<ProgressRecord> {
    db.get_record(id)?
        .and_then(|r| r.into_model())
        .ok_or(ApiError::NotFound("record"))
}

/// GET /users/{user_id}/records/{kind}
pub async fn list_records(
    State(state): State<AppState>,
    Path((user_id, slug)): Path<(Uuid, String)>,
) -> ApiResult<Json<RecordsPage>> {
    let kind = parse_kind(&slug)?;

    let uid = user_id.to_string();
    let rows = blocking(&state, move |db| {
        db.get_profile(&uid)?.ok_or(ApiError::NotFound("profile"))?;
        Ok(db.records_for_user(&uid, Some(kind))?)
    })
    .await?;

    Ok(Json(RecordsPage {
        user_id,
        kind,
        records: rows.into_iter().filter_map(|r| r.into_model()).collect(),
    }))
}

/// POST /users/{user_id}/records/{kind}: owner or staff.
pub async fn create_record(
    State(state): State<AppState>,
    Path((user_id, slug)): Path<(Uuid, String)>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<RecordRequest>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&slug)?;
    if !current.can_edit_for(user_id) {
        return Err(ApiError::Forbidden(DENIED));
    }
    let form = RecordForm::parse(kind, req)?;

    let uid = user_id.to_string();
    let rid = Uuid::new_v4().to_string();
    let record = blocking(&state, move |db| {
        db.get_profile(&uid)?.ok_or(ApiError::NotFound("profile"))?;
        db.insert_record(&rid, &uid, kind, &form.fields())?;
        load_record(db, &rid)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /records/{record_id}: the kind is fixed at creation.
pub async fn update_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<RecordRequest>,
) -> ApiResult<Json<ProgressRecord>> {
    let rid = record_id.to_string();
    let record = blocking(&state, move |db| {
        let existing = load_record(db, &rid)?;
        if !current.can_edit_for(existing.user_id) {
            return Err(ApiError::Forbidden(DENIED));
        }

        let req = RecordRequest {
            date: req.date.or(Some(existing.date)),
            ..req
        };
        let form = RecordForm::parse(existing.kind, req)?;
        db.update_record(&rid, &form.fields())?;
        load_record(db, &rid)
    })
    .await?;

    Ok(Json(record))
}

/// DELETE /records/{record_id}
pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let rid = record_id.to_string();
    blocking(&state, move |db| {
        let existing = load_record(db, &rid)?;
        if !current.can_edit_for(existing.user_id) {
            return Err(ApiError::Forbidden(DENIED));
        }
        db.delete_record(&rid)?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
