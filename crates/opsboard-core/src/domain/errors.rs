//! Errors - エラー型と分類
//!
//! core の公開操作はすべて `OpsError` を返します。
//! ports 側のエラー（StoreError / DirectoryError）は `From` で変換されます。
//! 通知の失敗は `OpsError` にならず、ログに残るだけです。

use thiserror::Error;

/// ErrorKind は呼び出し側向けの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input. Nothing was written.
    Validation,
    /// An id did not resolve.
    NotFound,
    /// The requested transition is not allowed from the current state.
    Conflict,
    /// A load-bearing collaborator (directory) failed.
    Dependency,
    /// Storage or other internal failure.
    Internal,
}

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("dependency failure: {0}")]
    Dependency(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl OpsError {
    pub fn validation(message: impl Into<String>) -> Self {
        OpsError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        OpsError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        OpsError::Conflict(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OpsError::Validation(_) => ErrorKind::Validation,
            OpsError::NotFound { .. } => ErrorKind::NotFound,
            OpsError::Conflict(_) => ErrorKind::Conflict,
            OpsError::Dependency(_) => ErrorKind::Dependency,
            OpsError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Validation, not-found and conflict errors carry their reason; anything
    /// internal collapses to a generic text.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Conflict => self.to_string(),
            ErrorKind::Dependency | ErrorKind::Internal => "internal error".to_string(),
        }
    }
}
