use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::models::{MessageRow, RoomRow, TopicCountRow, TopicRow};
use crate::{Database, NOW, OptionalExt, contains_pattern};

const ROOM_SELECT: &str = "SELECT r.id, r.name, r.description, r.host_id, u.username, r.topic_id, t.name,
            r.created_at, r.updated_at
     FROM rooms r
     LEFT JOIN users u ON u.id = r.host_id
     LEFT JOIN topics t ON t.id = r.topic_id";

const ROOM_ORDER: &str = "ORDER BY r.updated_at DESC, r.created_at DESC, r.rowid DESC";

// JOIN users and rooms to fetch names in a single query
const MESSAGE_SELECT: &str = "SELECT m.id, m.room_id, r.name, m.user_id, u.username, m.body, m.created_at, m.updated_at
     FROM messages m
     JOIN users u ON u.id = m.user_id
     JOIN rooms r ON r.id = m.room_id";

const MESSAGE_ORDER_NEWEST: &str = "ORDER BY m.updated_at DESC, m.created_at DESC, m.rowid DESC";

/// Fields a host chooses when creating or editing a room.
pub struct RoomFields<'a> {
    pub topic: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
}

impl Database {
    // -- Topics --

    /// All topics by name, optionally capped.
    pub fn list_topics(&self, limit: Option<u32>) -> Result<Vec<TopicRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM topics ORDER BY name COLLATE NOCASE LIMIT ?1")?;
            let limit = limit.map(i64::from).unwrap_or(-1);
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(TopicRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn search_topics(&self, q: &str) -> Result<Vec<TopicCountRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name, COUNT(r.id)
                 FROM topics t
                 LEFT JOIN rooms r ON r.topic_id = t.id
                 WHERE t.name LIKE ?1 ESCAPE '\\'
                 GROUP BY t.id
                 ORDER BY t.name COLLATE NOCASE",
            )?;
            let rows = stmt
                .query_map([contains_pattern(q)], |row| {
                    Ok(TopicCountRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        room_count: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Rooms --

    /// Create a room hosted by `host_id`, creating its topic on first use.
    pub fn create_room(&self, id: &str, host_id: &str, fields: &RoomFields<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let topic_id = get_or_create_topic(&tx, fields.topic)?;
            tx.execute(
                "INSERT INTO rooms (id, host_id, topic_id, name, description) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, host_id, topic_id, fields.name, fields.description],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn update_room(&self, id: &str, fields: &RoomFields<'_>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let topic_id = get_or_create_topic(&tx, fields.topic)?;
            let sql = format!(
                "UPDATE rooms SET topic_id = ?1, name = ?2, description = ?3, updated_at = {NOW} WHERE id = ?4"
            );
            let changed = tx.execute(&sql, params![topic_id, fields.name, fields.description, id])?;
            tx.commit()?;
            Ok(changed > 0)
        })
    }

    /// Messages and participant links go with the room.
    pub fn delete_room(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM rooms WHERE id = ?1", [id])? > 0))
    }

    pub fn get_room(&self, id: &str) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| {
            let sql = format!("{ROOM_SELECT} WHERE r.id = ?1");
            conn.query_row(&sql, [id], room_from_row).optional()
        })
    }

    /// Rooms whose topic, name, description or host username contains `q`.
    pub fn search_rooms(&self, q: &str) -> Result<Vec<RoomRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{ROOM_SELECT}
                 WHERE t.name LIKE ?1 ESCAPE '\\'
                    OR r.name LIKE ?1 ESCAPE '\\'
                    OR r.description LIKE ?1 ESCAPE '\\'
                    OR u.username LIKE ?1 ESCAPE '\\'
                 {ROOM_ORDER}"
            );
            query_rooms(conn, &sql, [contains_pattern(q)])
        })
    }

    pub fn rooms_hosted_by(&self, user_id: &str) -> Result<Vec<RoomRow>> {
        self.with_conn(|conn| {
            let sql = format!("{ROOM_SELECT} WHERE r.host_id = ?1 {ROOM_ORDER}");
            query_rooms(conn, &sql, [user_id])
        })
    }

    pub fn count_rooms(&self) -> Result<u32> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM rooms", [], |row| row.get(0))?))
    }

    /// (user id, username) of everyone who has posted in the room, in join order.
    pub fn room_participants(&self, room_id: &str) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username
                 FROM room_participants p
                 JOIN users u ON u.id = p.user_id
                 WHERE p.room_id = ?1
                 ORDER BY p.joined_at, p.rowid",
            )?;
            let rows = stmt
                .query_map([room_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Store a message and make its author a participant of the room.
    pub fn post_message(&self, id: &str, room_id: &str, user_id: &str, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, room_id, user_id, body) VALUES (?1, ?2, ?3, ?4)",
                params![id, room_id, user_id, body],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO room_participants (room_id, user_id) VALUES (?1, ?2)",
                params![room_id, user_id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
            conn.query_row(&sql, [id], message_from_row).optional()
        })
    }

    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM messages WHERE id = ?1", [id])? > 0))
    }

    /// A room's conversation, oldest first.
    pub fn room_messages(&self, room_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT} WHERE m.room_id = ?1 ORDER BY m.updated_at, m.created_at, m.rowid"
            );
            query_messages(conn, &sql, params![room_id])
        })
    }

    pub fn messages_by_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{MESSAGE_SELECT} WHERE m.user_id = ?1 {MESSAGE_ORDER_NEWEST}");
            query_messages(conn, &sql, params![user_id])
        })
    }

    /// Newest messages across all rooms.
    pub fn recent_messages(&self, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{MESSAGE_SELECT} {MESSAGE_ORDER_NEWEST} LIMIT ?1");
            query_messages(conn, &sql, params![limit])
        })
    }

    /// Newest messages in rooms whose topic, name or description contains `q`.
    pub fn recent_messages_matching(&self, q: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT}
                 LEFT JOIN topics t ON t.id = r.topic_id
                 WHERE t.name LIKE ?1 ESCAPE '\\'
                    OR r.name LIKE ?1 ESCAPE '\\'
                    OR r.description LIKE ?1 ESCAPE '\\'
                 {MESSAGE_ORDER_NEWEST}
                 LIMIT ?2"
            );
            query_messages(conn, &sql, params![contains_pattern(q), limit])
        })
    }
}

/// Look a topic up by exact name, inserting it if missing. Returns its id.
fn get_or_create_topic(conn: &Connection, name: &str) -> Result<String> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM topics WHERE name = ?1", [name], |row| row.get(0))
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    conn.execute("INSERT INTO topics (id, name) VALUES (?1, ?2)", params![id, name])?;
    Ok(id)
}

fn query_rooms<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<RoomRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, room_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_messages<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        host_id: row.get(3)?,
        host_username: row.get(4)?,
        topic_id: row.get(5)?,
        topic_name: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        room_id: row.get(1)?,
        room_name: row.get(2)?,
        user_id: row.get(3)?,
        username: row.get(4)?,
        body: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
