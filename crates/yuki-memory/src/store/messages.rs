//! Message storage, history and full-text search.

use super::{db_timestamp, Store};
use serde::Serialize;
use uuid::Uuid;
use yuki_core::{
    error::YukiError,
    message::{IncomingMessage, SentMessage},
};

/// A message as kept in shared memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StoredMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub sender_id: i64,
    pub sender_name: Option<String>,
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

/// Lifetime counters for one chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatHistoryStats {
    pub total_messages: i64,
    pub bot_messages: i64,
    pub distinct_senders: i64,
    pub topics: i64,
    pub first_message: Option<String>,
    pub last_message: Option<String>,
}

const MESSAGE_COLUMNS: &str =
    "m.chat_id, m.message_id, m.sender_id, m.sender_name, m.role, m.content, m.timestamp";

impl Store {
    /// Store a human message and link any hashtags in it to the sender.
    pub async fn record_message(&self, incoming: &IncomingMessage) -> Result<(), YukiError> {
        self.insert_message(
            incoming.chat_id,
            incoming.message_id,
            incoming.sender_id,
            incoming.sender_name.as_deref(),
            "user",
            &incoming.text,
            &db_timestamp(&incoming.timestamp),
        )
        .await?;

        for topic in super::extract_topics(&incoming.text) {
            self.link_topic(incoming.chat_id, &topic, incoming.sender_id)
                .await?;
        }
        Ok(())
    }

    /// Store one of Yuki's own messages.
    pub async fn record_reply(&self, sent: &SentMessage, text: &str) -> Result<(), YukiError> {
        self.insert_message(
            sent.chat_id,
            sent.message_id,
            sent.sender_id,
            None,
            "assistant",
            text,
            &db_timestamp(&sent.timestamp),
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_message(
        &self,
        chat_id: i64,
        message_id: i64,
        sender_id: i64,
        sender_name: Option<&str>,
        role: &str,
        content: &str,
        timestamp: &str,
    ) -> Result<(), YukiError> {
        sqlx::query(
            "INSERT INTO group_messages \
             (id, chat_id, message_id, sender_id, sender_name, role, content, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(chat_id)
        .bind(message_id)
        .bind(sender_id)
        .bind(sender_name)
        .bind(role)
        .bind(content)
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| YukiError::Memory(format!("insert failed: {e}")))?;
        Ok(())
    }

    /// The last `limit` messages of a chat, oldest first.
    pub async fn recent_messages(
        &self,
        chat_id: i64,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, YukiError> {
        let mut rows: Vec<StoredMessage> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM group_messages m \
             WHERE m.chat_id = ? \
             ORDER BY m.timestamp DESC, m.rowid DESC \
             LIMIT ?"
        ))
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| YukiError::Memory(format!("history query failed: {e}")))?;

        rows.reverse();
        Ok(rows)
    }

    /// Search a chat's past messages using FTS5 full-text search.
    pub async fn search_messages(
        &self,
        chat_id: i64,
        query: &str,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, YukiError> {
        // Short queries produce noisy results.
        if query.trim().chars().count() < 3 {
            return Ok(Vec::new());
        }
        let Some(fts_query) = fts_query(query) else {
            return Ok(Vec::new());
        };

        let rows: Vec<StoredMessage> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} \
             FROM group_messages_fts fts \
             JOIN group_messages m ON m.rowid = fts.rowid \
             WHERE group_messages_fts MATCH ? \
             AND m.chat_id = ? \
             ORDER BY rank \
             LIMIT ?"
        ))
        .bind(fts_query)
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| YukiError::Memory(format!("fts search failed: {e}")))?;

        Ok(rows)
    }

    /// Lifetime counters for a chat; all zero for unknown chats.
    pub async fn chat_stats(&self, chat_id: i64) -> Result<ChatHistoryStats, YukiError> {
        let (total_messages, bot_messages, distinct_senders, first_message, last_message): (
            i64,
            i64,
            i64,
            Option<String>,
            Option<String>,
        ) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COALESCE(SUM(role = 'assistant'), 0), \
                    COUNT(DISTINCT CASE WHEN role = 'user' THEN sender_id END), \
                    MIN(timestamp), MAX(timestamp) \
             FROM group_messages WHERE chat_id = ?",
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| YukiError::Memory(format!("stats query failed: {e}")))?;

        let (topics,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM topics WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| YukiError::Memory(format!("stats query failed: {e}")))?;

        Ok(ChatHistoryStats {
            total_messages,
            bot_messages,
            distinct_senders,
            topics,
            first_message,
            last_message,
        })
    }
}

/// Quote each word so user text can never be read as FTS5 syntax.
fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| format!("\"{w}\""))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::fts_query;

    #[test]
    fn test_fts_query_quotes_terms() {
        assert_eq!(fts_query("pizza night").as_deref(), Some("\"pizza\" \"night\""));
        assert_eq!(fts_query("AND OR \"x").as_deref(), Some("\"AND\" \"OR\" \"x\""));
        assert_eq!(fts_query("-- ** ::"), None);
    }
}
