use crate::error::ApiError;

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_TITLE_LEN: usize = 200;

pub fn username(raw: &str) -> Result<&str, ApiError> {
    let name = raw.trim();
    if name.len() < 3 || name.len() > 32 {
        return Err(ApiError::BadRequest("Username must be 3 to 32 characters".into()));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !name.chars().all(allowed) {
        return Err(ApiError::BadRequest(
            "Username may contain only letters, digits and @/./+/-/_".into(),
        ));
    }
    Ok(name)
}

pub fn password(password: &str, confirm: &str) -> Result<(), ApiError> {
    if password.chars().count() < 8 {
        return Err(ApiError::BadRequest("Password must be at least 8 characters".into()));
    }
    if password != confirm {
        return Err(ApiError::BadRequest("The two password fields didn't match".into()));
    }
    Ok(())
}

/// Trimmed, non-empty text of at most `max` characters.
pub fn required<'a>(field: &str, raw: &'a str, max: usize) -> Result<&'a str, ApiError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    limit(field, value, max)?;
    Ok(value)
}

/// Blank optional text collapses to `None`.
pub fn optional<'a>(field: &str, raw: Option<&'a str>, max: Option<usize>) -> Result<Option<&'a str>, ApiError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Some(max) = max {
        limit(field, value, max)?;
    }
    Ok(Some(value))
}

fn limit(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::BadRequest(format!("{field} must be at most {max} characters")));
    }
    Ok(())
}
