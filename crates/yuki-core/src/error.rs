use thiserror::Error;

/// Top-level error type for Yuki.
#[derive(Debug, Error)]
pub enum YukiError {
    /// Error from an AI provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error, including rejected runtime setting updates.
    #[error("config error: {0}")]
    Config(String),

    /// Shared-memory/storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Content moderation error.
    #[error("moderation error: {0}")]
    Moderation(String),

    /// Auto-interaction scheduler error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
