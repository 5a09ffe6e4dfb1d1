//! Database row types. These map directly to SQLite rows and are kept
//! separate from the dojo-types API models; `into_model` converts.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use dojo_types::models::{Message, Profile, ProgressRecord, Room, Topic, User, UserSummary};
use dojo_types::rank::BeltRank;
use dojo_types::record::RecordKind;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_staff: bool,
    pub created_at: String,
}

pub struct ProfileRow {
    pub user_id: String,
    pub username: String,
    pub name: Option<String>,
    pub about: Option<String>,
    pub picture: String,
    pub rank: Option<String>,
    pub last_promoted: Option<String>,
}

pub struct TopicRow {
    pub id: String,
    pub name: String,
}

pub struct TopicCountRow {
    pub id: String,
    pub name: String,
    pub room_count: u32,
}

pub struct RoomRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub host_id: Option<String>,
    pub host_username: Option<String>,
    pub topic_id: Option<String>,
    pub topic_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub room_id: String,
    pub room_name: String,
    pub user_id: String,
    pub username: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct RecordRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub date: String,
    pub label: Option<String>,
    pub amount: Option<i64>,
    pub created_at: String,
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // rows written by hand in sqlite3 use datetime('now'): no zone, no 'T'
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| warn!("Corrupt date '{}': {}", raw, e))
        .ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

impl UserRow {
    pub fn into_model(self) -> User {
        User {
            id: parse_id(&self.id, "user id"),
            username: self.username,
            email: self.email,
            is_staff: self.is_staff,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

impl ProfileRow {
    pub fn into_model(self) -> Profile {
        let rank = self.rank.as_deref().and_then(|r| {
            r.parse::<BeltRank>()
                .map_err(|e| warn!("Profile {}: {}", self.user_id, e))
                .ok()
        });

        Profile {
            user_id: parse_id(&self.user_id, "profile user id"),
            username: self.username,
            name: self.name,
            about: self.about,
            picture: self.picture,
            rank,
            last_promoted: self.last_promoted.as_deref().and_then(parse_date),
        }
    }
}

impl TopicRow {
    pub fn into_model(self) -> Topic {
        Topic {
            id: parse_id(&self.id, "topic id"),
            name: self.name,
        }
    }
}

impl RoomRow {
    pub fn into_model(self) -> Room {
        let host = match (self.host_id, self.host_username) {
            (Some(id), Some(username)) => Some(UserSummary {
                id: parse_id(&id, "room host id"),
                username,
            }),
            _ => None,
        };
        let topic = match (self.topic_id, self.topic_name) {
            (Some(id), Some(name)) => Some(Topic {
                id: parse_id(&id, "room topic id"),
                name,
            }),
            _ => None,
        };

        Room {
            id: parse_id(&self.id, "room id"),
            name: self.name,
            description: self.description,
            host,
            topic,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        }
    }
}

impl MessageRow {
    pub fn into_model(self) -> Message {
        Message {
            id: parse_id(&self.id, "message id"),
            room_id: parse_id(&self.room_id, "message room id"),
            room_name: self.room_name,
            author: UserSummary {
                id: parse_id(&self.user_id, "message author id"),
                username: self.username,
            },
            body: self.body,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        }
    }
}

impl RecordRow {
    /// Rows with an unknown kind or unreadable date are dropped.
    pub fn into_model(self) -> Option<ProgressRecord> {
        let kind = match self.kind.parse::<RecordKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Record {}: {}", self.id, e);
                return None;
            }
        };

        Some(ProgressRecord {
            id: parse_id(&self.id, "record id"),
            user_id: parse_id(&self.user_id, "record user id"),
            kind,
            date: parse_date(&self.date)?,
            label: self.label,
            amount: self.amount,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}
