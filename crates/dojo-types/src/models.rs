use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rank::BeltRank;
use crate::record::RecordKind;

/// Picture every new profile starts with, relative to the media root.
pub const DEFAULT_PICTURE: &str = "default.svg";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// Just enough of a user to label a room host, author, or participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub about: Option<String>,
    pub picture: String,
    pub rank: Option<BeltRank>,
    pub last_promoted: Option<NaiveDate>,
}

impl Profile {
    pub fn rank_display(&self) -> Option<&'static str> {
        self.rank.map(|r| r.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicWithCount {
    pub id: Uuid,
    pub name: String,
    pub room_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// `None` once the hosting account is gone.
    pub host: Option<UserSummary>,
    pub topic: Option<Topic>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub room_name: String,
    pub author: UserSummary,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: RecordKind,
    pub date: NaiveDate,
    pub label: Option<String>,
    pub amount: Option<i64>,
    pub created_at: DateTime<Utc>,
}
