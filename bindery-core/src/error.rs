use thiserror::Error;

#[derive(Error, Debug)]
pub enum BinderyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid book file: {0}")]
    InvalidBook(String),

    #[error("Task queue is full ({capacity} pending tasks)")]
    QueueFull { capacity: usize },

    #[error("Task queue is closed")]
    QueueClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BinderyError>;
