//! # yuki-memory
//!
//! Shared group memory for Yuki (SQLite-backed): what was said in each
//! chat, and who talks about which topics.

pub mod store;

pub use store::{extract_topics, ChatHistoryStats, Store, StoredMessage, TopicCount};
