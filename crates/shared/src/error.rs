use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    UnknownAction,
    Internal,
}

/// Failure raised by an action handler. The dispatcher turns it into a
/// `success: false` envelope carrying [`HandlerError::user_message`].
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("missing parameter `{0}`")]
    MissingParameter(String),
    #[error("invalid value {value:?} for parameter `{name}`")]
    InvalidParameter { name: String, value: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("caller is not allowed to perform this action")]
    Forbidden,
    #[error("store error: {0}")]
    Store(String),
}

impl HandlerError {
    pub fn invalid(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingParameter(_) | Self::InvalidParameter { .. } => ErrorCode::Validation,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Forbidden => ErrorCode::Forbidden,
            Self::Store(_) => ErrorCode::Internal,
        }
    }

    /// Message safe to show to the caller. Store details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingParameter(name) => format!("Brak wymaganego parametru: {name}"),
            Self::InvalidParameter { name, .. } => {
                format!("Nieprawidłowa wartość parametru: {name}")
            }
            Self::NotFound(what) => what.clone(),
            Self::Forbidden => "Brak uprawnień do wykonania tej akcji".to_string(),
            Self::Store(_) => "Błąd bazy danych".to_string(),
        }
    }
}
