use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use dojo_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// The authenticated caller, as currently stored (not as of token issue).
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
}

impl CurrentUser {
    /// Owners may edit their own rows; staff may edit anyone's.
    pub fn can_edit_for(&self, owner: Uuid) -> bool {
        self.id == owner || self.is_staff
    }
}

/// Extract and validate the bearer token, then load the caller's account.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized("Missing bearer token"))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("Invalid or expired token"))?
    .claims;

    let uid = claims.sub.to_string();
    let user = blocking(&state, move |db| Ok(db.get_user_by_id(&uid)?))
        .await?
        .ok_or(ApiError::Unauthorized("Account no longer exists"))?;

    req.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        username: user.username,
        is_staff: user.is_staff,
    });
    Ok(next.run(req).await)
}
