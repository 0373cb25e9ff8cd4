#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Fetch error: {0}")]
    Fetch(String),
    #[error("Entry document returned HTTP {status}")]
    Http { status: u16 },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Internal: {0}")]
    Internal(String),
}
