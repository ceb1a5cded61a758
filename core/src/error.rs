use crate::types::Period;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No churn-risk scores found for period {period}")]
    EmptyPopulation { period: Period },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type LabelResult<T> = Result<T, LabelError>;
