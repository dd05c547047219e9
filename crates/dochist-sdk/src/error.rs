use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("history error: {0}")]
    History(#[from] dochist_plugin::HistoryError),

    #[error("store error: {0}")]
    Store(#[from] dochist_store::StoreError),
}

pub type SdkResult<T> = Result<T, SdkError>;
