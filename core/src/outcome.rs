//! Wire form of an executor result.
//!
//! Executors return `ApiResult<T>`. Code that must hand the result to a
//! consumer expecting the `{ data }` / `{ errors_list }` envelope converts it
//! into a `ResponseOutcome` and serializes that.

use serde::Serialize;

use crate::error::TransportError;

/// Result of one request/response cycle.
pub type ApiResult<T> = Result<T, TransportError>;

/// Exactly one of the two envelope shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseOutcome<T> {
    Data { data: T },
    Errors { errors_list: Vec<String> },
}

impl<T> ResponseOutcome<T> {
    pub fn is_error(&self) -> bool {
        matches!(self, ResponseOutcome::Errors { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ResponseOutcome::Data { data } => Some(data),
            ResponseOutcome::Errors { .. } => None,
        }
    }
}

impl<T> From<ApiResult<T>> for ResponseOutcome<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => ResponseOutcome::Data { data },
            Err(err) => ResponseOutcome::Errors {
                errors_list: err.errors_list(),
            },
        }
    }
}
