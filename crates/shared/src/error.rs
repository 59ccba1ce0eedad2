use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    InvalidStage,
    Store,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrmError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{collection} record {id} not found")]
    NotFound { collection: &'static str, id: i64 },
    #[error("unknown deal stage '{0}'")]
    InvalidStage(String),
    #[error("record store failure: {0}")]
    Store(String),
}

impl CrmError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(collection: &'static str, id: impl Into<i64>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CrmError::Validation(_) => ErrorCode::Validation,
            CrmError::NotFound { .. } => ErrorCode::NotFound,
            CrmError::InvalidStage(_) => ErrorCode::InvalidStage,
            CrmError::Store(_) => ErrorCode::Store,
        }
    }
}

impl From<anyhow::Error> for CrmError {
    fn from(err: anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line.
        CrmError::Store(format!("{err:#}"))
    }
}

impl From<CrmError> for ApiError {
    fn from(value: CrmError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
