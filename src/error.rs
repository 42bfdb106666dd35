/// Failures from the student directory and complaint store. The session
/// turns these into sentinels; nothing past it sees this type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("status {0:?} is not one of Pending, In Progress, Resolved")]
    InvalidStatus(String),

    #[error("store has no {0} column")]
    MissingColumn(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;
