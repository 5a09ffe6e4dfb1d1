use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Profile, ProgressRecord, Room, Topic, TopicWithCount, User, UserSummary};
use crate::rank::BeltRank;
use crate::record::RecordKind;
use crate::stats::{ProfileStats, Quarter};

// -- JWT Claims --

/// Bearer token claims, issued at register/login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Users & profiles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub name: Option<String>,
    pub about: Option<String>,
    pub rank: Option<BeltRank>,
    pub last_promoted: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileWithStats {
    pub profile: Profile,
    /// Human-readable belt, e.g. "Sr. Brown".
    pub rank_name: Option<String>,
    pub stats: ProfileStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserPage {
    pub user: User,
    pub profile: Profile,
    pub rank_name: Option<String>,
    pub rooms: Vec<Room>,
    pub room_messages: Vec<Message>,
    pub room_count_all: u32,
    pub topics: Vec<Topic>,
    pub records: BTreeMap<String, Vec<ProgressRecord>>,
    pub quarter: Quarter,
    pub stats: ProfileStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsPage {
    pub user_id: Uuid,
    pub quarter: Quarter,
    pub stats: ProfileStats,
}

// -- Rooms --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomRequest {
    pub topic: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomsPage {
    pub rooms: Vec<Room>,
    pub topics: Vec<Topic>,
    pub room_count: u32,
    pub room_count_all: u32,
    pub room_messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomPage {
    pub room: Room,
    pub room_messages: Vec<Message>,
    pub participants: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicsPage {
    pub topics: Vec<TopicWithCount>,
    pub room_count_all: u32,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

// -- Progress records --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordRequest {
    /// Defaults to today when omitted.
    pub date: Option<NaiveDate>,
    pub label: Option<String>,
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordsPage {
    pub user_id: Uuid,
    pub kind: RecordKind,
    pub records: Vec<ProgressRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PictureResponse {
    pub picture: String,
    pub size: u64,
}
