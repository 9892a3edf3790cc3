use crate::room_db::schema::*;
use crate::room_db::{format_timestamp, parse_datetime_safe, RoomDbError};
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Parameters for appending a message to a room
pub struct MessageParams<'a> {
    pub room_id: &'a str,
    pub persona: Persona,
    pub content: &'a str,
    /// Defaults to now.
    pub time_stamp: Option<DateTime<Utc>>,
}

/// Rooms and their ordered messages
pub struct RoomStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl RoomStore {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> anyhow::Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| anyhow::anyhow!("Failed to get connection from pool: {}", e))
    }

    pub fn create_room(&self, summary: Option<&str>) -> anyhow::Result<Room> {
        let room_id = Uuid::new_v4().to_string();
        self.create_room_with_id(&room_id, summary)
    }

    pub fn create_room_with_id(&self, room_id: &str, summary: Option<&str>) -> anyhow::Result<Room> {
        let details = RoomDetails::default();
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO rooms (id, summary, details) VALUES (?1, ?2, ?3)",
            params![room_id, summary, serde_json::to_string(&details)?],
        )?;

        info!("Created room with ID: {}", room_id);
        Ok(Room {
            id: room_id.to_string(),
            summary: summary.map(str::to_string),
            details,
        })
    }

    pub fn get_room(&self, room_id: &str) -> anyhow::Result<Option<Room>> {
        let conn = self.get_conn()?;
        let room = conn
            .query_row(
                "SELECT id, summary, details FROM rooms WHERE id = ?1",
                [room_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;

        match room {
            Some((id, summary, details_json)) => {
                let details = serde_json::from_str(&details_json).unwrap_or_else(|e| {
                    warn!("Failed to parse details for room {}: {}", id, e);
                    RoomDetails::default()
                });
                Ok(Some(Room { id, summary, details }))
            }
            None => Ok(None),
        }
    }

    pub fn room_exists(&self, room_id: &str) -> anyhow::Result<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row("SELECT 1 FROM rooms WHERE id = ?1", [room_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn update_room_summary(&self, room_id: &str, summary: &str) -> anyhow::Result<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE rooms SET summary = ?1 WHERE id = ?2",
            params![summary, room_id],
        )?;
        if updated == 0 {
            return Err(RoomDbError::RoomNotFound(room_id.to_string()).into());
        }
        info!("Updated room {} summary", room_id);
        Ok(())
    }

    /// Record a truncation at the given 1-based message position.
    ///
    /// Positions stay ordered; recording a position that is already present
    /// is a no-op.
    pub fn append_truncate_index(&self, room_id: &str, position: usize) -> anyhow::Result<RoomDetails> {
        if position == 0 {
            return Err(RoomDbError::InvalidTruncateIndex(position).into());
        }
        let mut room = self
            .get_room(room_id)?
            .ok_or_else(|| RoomDbError::RoomNotFound(room_id.to_string()))?;

        if !room.details.truncate_indexes.contains(&position) {
            room.details.truncate_indexes.push(position);
            room.details.truncate_indexes.sort_unstable();
        }

        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE rooms SET details = ?1 WHERE id = ?2",
            params![serde_json::to_string(&room.details)?, room_id],
        )?;

        debug!("Room {} truncate indexes: {:?}", room_id, room.details.truncate_indexes);
        Ok(room.details)
    }

    pub fn store_message(&self, params: MessageParams) -> anyhow::Result<StoredMessage> {
        let id = Uuid::new_v4().to_string();
        let time_stamp = params.time_stamp.unwrap_or_else(Utc::now);

        let conn = self.get_conn()?;
        let inserted = conn.execute(
            "INSERT INTO messages (id, room_id, time_stamp, persona, content, is_aborted)
             SELECT ?1, ?2, ?3, ?4, ?5, FALSE WHERE EXISTS (SELECT 1 FROM rooms WHERE id = ?2)",
            params![
                &id,
                params.room_id,
                format_timestamp(&time_stamp),
                params.persona.as_str(),
                params.content,
            ],
        )?;
        if inserted == 0 {
            return Err(RoomDbError::RoomNotFound(params.room_id.to_string()).into());
        }

        Ok(StoredMessage {
            id,
            room_id: params.room_id.to_string(),
            time_stamp,
            persona: params.persona,
            content: params.content.to_string(),
            is_aborted: false,
        })
    }

    /// Messages of a room, oldest first. Equal timestamps keep insertion order.
    pub fn get_room_messages(&self, room_id: &str) -> anyhow::Result<Vec<StoredMessage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, room_id, time_stamp, persona, content, is_aborted
             FROM messages WHERE room_id = ?1 ORDER BY time_stamp ASC, rowid ASC",
        )?;
        let mut rows = stmt.query([room_id])?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            messages.push(row_to_stored_message(row)?);
        }
        Ok(messages)
    }

    pub fn get_room_message_count(&self, room_id: &str) -> anyhow::Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE room_id = ?1",
            [room_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Flag a message whose generation was stopped early. Returns false when
    /// the message does not exist.
    pub fn mark_message_aborted(&self, room_id: &str, message_id: &str) -> anyhow::Result<bool> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE messages SET is_aborted = TRUE WHERE room_id = ?1 AND id = ?2",
            params![room_id, message_id],
        )?;
        Ok(updated > 0)
    }

    /// Delete the room and its messages (foreign key cascade).
    pub fn delete_room(&self, room_id: &str) -> anyhow::Result<usize> {
        let conn = self.get_conn()?;
        delete_room_row(&conn, room_id)
    }
}

pub(crate) fn delete_room_row(conn: &Connection, room_id: &str) -> anyhow::Result<usize> {
    let deleted = conn.execute("DELETE FROM rooms WHERE id = ?1", [room_id])?;
    info!("Deleted room {}", room_id);
    Ok(deleted)
}

fn row_to_stored_message(row: &Row) -> anyhow::Result<StoredMessage> {
    let time_stamp = parse_datetime_safe(&row.get::<_, String>(2)?).unwrap_or_else(|| {
        warn!("Failed parse message time_stamp");
        Utc::now()
    });
    let persona: String = row.get(3)?;

    Ok(StoredMessage {
        id: row.get(0)?,
        room_id: row.get(1)?,
        time_stamp,
        persona: persona.parse()?,
        content: row.get(4)?,
        is_aborted: row.get(5)?,
    })
}
