use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};

use dojo_types::models::DEFAULT_PICTURE;
use dojo_types::rank::BeltRank;

use crate::models::{ProfileRow, UserRow, format_date};
use crate::{Database, OptionalExt, contains_pattern};

const USER_COLUMNS: &str = "id, username, email, password, is_staff, created_at";

const PROFILE_SELECT: &str = "SELECT p.user_id, u.username, p.name, p.about, p.picture, p.rank, p.last_promoted
     FROM profiles p
     JOIN users u ON u.id = p.user_id";

/// Editable account and profile fields, written together.
pub struct ProfileUpdate<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub about: Option<&'a str>,
    pub rank: Option<BeltRank>,
    pub last_promoted: Option<NaiveDate>,
}

impl Database {
    /// Insert a user and its profile; the profile name starts as the username.
    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                params![id, username, email, password_hash],
            )?;
            tx.execute(
                "INSERT INTO profiles (user_id, name, picture) VALUES (?1, ?2, ?3)",
                params![id, username, DEFAULT_PICTURE],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Returns false when no such user exists.
    pub fn set_staff(&self, username: &str, is_staff: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_staff = ?1 WHERE username = ?2",
                params![is_staff, username],
            )?;
            Ok(changed > 0)
        })
    }

    /// True if `username` belongs to an account other than `user_id`.
    pub fn username_taken_by_other(&self, username: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id != ?2)",
                params![username, user_id],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    pub fn update_profile(&self, user_id: &str, update: &ProfileUpdate<'_>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE users SET username = ?1, email = ?2 WHERE id = ?3",
                params![update.username, update.email, user_id],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            tx.execute(
                "UPDATE profiles SET name = ?1, about = ?2, rank = ?3, last_promoted = ?4 WHERE user_id = ?5",
                params![
                    update.name,
                    update.about,
                    update.rank.map(|r| r.as_str()),
                    update.last_promoted.map(format_date),
                    user_id,
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn set_picture(&self, user_id: &str, picture: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET picture = ?1 WHERE user_id = ?2",
                params![picture, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let sql = format!("{PROFILE_SELECT} WHERE p.user_id = ?1");
            conn.query_row(&sql, [user_id], profile_from_row).optional()
        })
    }

    /// Profiles whose username or display name contains `q`, ignoring ASCII case.
    pub fn search_profiles(&self, q: &str) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{PROFILE_SELECT}
                 WHERE u.username LIKE ?1 ESCAPE '\\' OR p.name LIKE ?1 ESCAPE '\\'
                 ORDER BY u.username COLLATE NOCASE"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([contains_pattern(q)], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    conn.query_row(&sql, [value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            is_staff: row.get(4)?,
            created_at: row.get(5)?,
        })
    })
    .optional()
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        user_id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        about: row.get(3)?,
        picture: row.get(4)?,
        rank: row.get(5)?,
        last_promoted: row.get(6)?,
    })
}
