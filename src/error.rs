use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkstackError {
    #[error("{0}")]
    Validation(String),

    #[error("work item {0} not found")]
    NotFound(String),

    #[error("work item {0} not found or is inactive")]
    NotFoundOrInactive(String),

    #[error("{0}")]
    Conflict(String),

    #[error("order key space exhausted between {0:?} and {1:?}")]
    OrderKeyExhausted(Option<String>, Option<String>),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkstackError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::NotFoundOrInactive(_) => "not_found_or_inactive",
            Self::Conflict(_) => "conflict",
            Self::OrderKeyExhausted(..) => "order_key_exhausted",
            Self::Db(_) => "db_error",
            Self::Json(_) => "json_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Whether the error is the caller's fault (maps to the invalid-params
    /// envelope) rather than an internal failure.
    pub fn is_invalid_params(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::NotFoundOrInactive(_) | Self::Conflict(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WorkstackError>;
