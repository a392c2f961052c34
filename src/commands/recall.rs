//! Shared-memory commands open to everyone: /recall, /topics.

use yuki_memory::Store;

const PREVIEW_CHARS: usize = 160;
const TOPIC_LIMIT: i64 = 10;

pub(super) async fn handle_recall(store: &Store, chat_id: i64, query: &str, limit: i64) -> String {
    if query.is_empty() {
        return "Usage: /recall <words>".to_string();
    }
    match store.search_messages(chat_id, query, limit).await {
        Ok(hits) if hits.is_empty() => format!("I don't remember anyone saying \"{query}\"."),
        Ok(hits) => {
            let mut out = format!("What I remember about \"{query}\":\n");
            for m in &hits {
                let who = if m.role == "assistant" {
                    "me"
                } else {
                    m.sender_name.as_deref().unwrap_or("someone")
                };
                out.push_str(&format!("\n[{}] {who}: {}", m.timestamp, preview(&m.content)));
            }
            out
        }
        Err(e) => format!("Error: {e}"),
    }
}

pub(super) async fn handle_topics(store: &Store, chat_id: i64, user_id: i64, arg: &str) -> String {
    if let Some(tag) = arg.split_whitespace().next() {
        let tag = tag.trim_start_matches('#').to_lowercase();
        return match store.users_for_topic(chat_id, &tag).await {
            Ok(users) if users.is_empty() => format!("Nobody here talks about #{tag} yet."),
            Ok(users) if users.len() == 1 => format!("1 person here talks about #{tag}."),
            Ok(users) => format!("{} people here talk about #{tag}.", users.len()),
            Err(e) => format!("Error: {e}"),
        };
    }

    match store.topics_for_user(chat_id, user_id, TOPIC_LIMIT).await {
        Ok(topics) if topics.is_empty() => {
            "You haven't used any #hashtags here yet.".to_string()
        }
        Ok(topics) => {
            let mut out = "Your topics:".to_string();
            for t in &topics {
                out.push_str(&format!("\n#{} ({})", t.topic, t.mentions));
            }
            out
        }
        Err(e) => format!("Error: {e}"),
    }
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > PREVIEW_CHARS || text.lines().nth(1).is_some() {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}
