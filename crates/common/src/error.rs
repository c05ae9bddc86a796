use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited {
        retry_after: u64,
        limit: u32,
        remaining: u32,
        reset_time: u64,
    },

    /// The record source failed; the message names the dataset.
    #[error("{dataset} query failed: {message}")]
    Upstream { dataset: String, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl DirectoryError {
    pub fn upstream(dataset: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            dataset: dataset.into(),
            message: err.to_string(),
        }
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
