use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::MessageView;

const VIEW_COLUMNS: &str = "m.id, m.sender_id, u.username AS sender_name, \
     u.user_type AS sender_type, m.body AS message, m.is_read, m.created_at";

/// Trim the raw body; whitespace-only input carries no message.
pub fn normalize_body(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub struct MessageService;

impl MessageService {
    /// Persist a message and advance the room's updated_at in one
    /// transaction. Per-room ordering is store-assigned via the seq
    /// column. Fails with `EmptyMessage` on whitespace-only input.
    pub async fn append(
        db: &PgPool,
        room_id: Uuid,
        sender_id: Uuid,
        raw_body: &str,
    ) -> Result<MessageView, AppError> {
        let body = normalize_body(raw_body).ok_or(AppError::EmptyMessage)?;

        let mut tx = db.begin().await?;

        let view = sqlx::query_as::<_, MessageView>(
            "WITH inserted AS ( \
                 INSERT INTO chat_messages (id, room_id, sender_id, body) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, sender_id, body, is_read, created_at \
             ) \
             SELECT i.id, i.sender_id, u.username AS sender_name, \
                    u.user_type AS sender_type, i.body AS message, \
                    i.is_read, i.created_at \
             FROM inserted i JOIN users u ON u.id = i.sender_id",
        )
        .bind(Uuid::new_v4())
        .bind(room_id)
        .bind(sender_id)
        .bind(&body)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chat_rooms SET updated_at = NOW() WHERE id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(view)
    }

    /// The `limit` most recent messages of the room, re-sorted ascending
    /// (oldest first) so clients render top-to-bottom.
    pub async fn history(
        db: &PgPool,
        room_id: Uuid,
        limit: i64,
    ) -> Result<Vec<MessageView>, AppError> {
        let rows = sqlx::query_as::<_, MessageView>(&format!(
            "SELECT id, sender_id, sender_name, sender_type, message, is_read, created_at \
             FROM ( \
                 SELECT {VIEW_COLUMNS}, m.seq \
                 FROM chat_messages m JOIN users u ON u.id = m.sender_id \
                 WHERE m.room_id = $1 \
                 ORDER BY m.seq DESC \
                 LIMIT $2 \
             ) recent \
             ORDER BY seq ASC"
        ))
        .bind(room_id)
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Every message of the room, ascending.
    pub async fn full_history(db: &PgPool, room_id: Uuid) -> Result<Vec<MessageView>, AppError> {
        let rows = sqlx::query_as::<_, MessageView>(&format!(
            "SELECT {VIEW_COLUMNS} \
             FROM chat_messages m JOIN users u ON u.id = m.sender_id \
             WHERE m.room_id = $1 \
             ORDER BY m.seq ASC"
        ))
        .bind(room_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Flip is_read on every unread message in the room not sent by the
    /// reader. Idempotent; returns the number of rows changed.
    pub async fn mark_all_read(
        db: &PgPool,
        room_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE chat_messages SET is_read = TRUE \
             WHERE room_id = $1 AND is_read = FALSE AND sender_id <> $2",
        )
        .bind(room_id)
        .bind(reader_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Unread messages in the room addressed to the user.
    pub async fn unread_count(db: &PgPool, room_id: Uuid, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chat_messages \
             WHERE room_id = $1 AND is_read = FALSE AND sender_id <> $2",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn last_message(
        db: &PgPool,
        room_id: Uuid,
    ) -> Result<Option<MessageView>, AppError> {
        let row = sqlx::query_as::<_, MessageView>(&format!(
            "SELECT {VIEW_COLUMNS} \
             FROM chat_messages m JOIN users u ON u.id = m.sender_id \
             WHERE m.room_id = $1 \
             ORDER BY m.seq DESC \
             LIMIT 1"
        ))
        .bind(room_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize_body("  hi there  "), Some("hi there".to_string()));
    }

    #[test]
    fn normalize_rejects_empty_and_whitespace_only() {
        assert_eq!(normalize_body(""), None);
        assert_eq!(normalize_body("   "), None);
        assert_eq!(normalize_body("\n\t "), None);
    }
}
