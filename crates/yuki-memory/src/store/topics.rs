//! Hashtag topics and who talks about them.

use super::Store;
use serde::Serialize;
use yuki_core::error::YukiError;

const MIN_TOPIC_CHARS: usize = 2;
const MAX_TOPIC_CHARS: usize = 64;

/// A topic and how often someone mentioned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub mentions: i64,
}

/// Lower-cased `#hashtags` in `text`, deduplicated, in order of appearance.
///
/// A tag starts at a `#` that is not glued to a preceding word character and
/// runs over letters, digits and `_`. Tags outside 2..=64 characters are ignored.
pub fn extract_topics(text: &str) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let starts_tag = c == '#' && !prev.is_some_and(is_tag_char);
        prev = Some(c);
        if !starts_tag {
            continue;
        }

        let mut tag = String::new();
        while let Some(&next) = chars.peek() {
            if !is_tag_char(next) {
                break;
            }
            tag.push(next);
            prev = Some(next);
            chars.next();
        }

        let len = tag.chars().count();
        if !(MIN_TOPIC_CHARS..=MAX_TOPIC_CHARS).contains(&len) {
            continue;
        }
        let tag = tag.to_lowercase();
        if !topics.contains(&tag) {
            topics.push(tag);
        }
    }
    topics
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Store {
    /// Count one mention of `topic` by `user_id` in a chat.
    pub async fn link_topic(
        &self,
        chat_id: i64,
        topic: &str,
        user_id: i64,
    ) -> Result<(), YukiError> {
        sqlx::query(
            "INSERT INTO topics (chat_id, topic, mentions) VALUES (?, ?, 1) \
             ON CONFLICT(chat_id, topic) DO UPDATE SET \
             mentions = mentions + 1, last_seen = datetime('now')",
        )
        .bind(chat_id)
        .bind(topic)
        .execute(&self.pool)
        .await
        .map_err(|e| YukiError::Memory(format!("topic upsert failed: {e}")))?;

        sqlx::query(
            "INSERT INTO topic_users (chat_id, topic, user_id, mentions) VALUES (?, ?, ?, 1) \
             ON CONFLICT(chat_id, topic, user_id) DO UPDATE SET \
             mentions = mentions + 1, last_seen = datetime('now')",
        )
        .bind(chat_id)
        .bind(topic)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| YukiError::Memory(format!("topic link failed: {e}")))?;

        Ok(())
    }

    /// A user's topics in a chat, most mentioned first.
    pub async fn topics_for_user(
        &self,
        chat_id: i64,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<TopicCount>, YukiError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT topic, mentions FROM topic_users \
             WHERE chat_id = ? AND user_id = ? \
             ORDER BY mentions DESC, last_seen DESC, topic ASC \
             LIMIT ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| YukiError::Memory(format!("topic query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(topic, mentions)| TopicCount { topic, mentions })
            .collect())
    }

    /// Everyone in a chat who mentioned `topic`, most active first.
    pub async fn users_for_topic(&self, chat_id: i64, topic: &str) -> Result<Vec<i64>, YukiError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM topic_users \
             WHERE chat_id = ? AND topic = ? \
             ORDER BY mentions DESC, user_id ASC",
        )
        .bind(chat_id)
        .bind(topic.trim_start_matches('#').to_lowercase())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| YukiError::Memory(format!("topic query failed: {e}")))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
