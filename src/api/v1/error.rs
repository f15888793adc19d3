use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (failure, status) = if let Some(failure) = err.find::<ApiFailure>() {
        (failure.clone(), failure.code.status())
    } else if err.is_not_found() {
        (
            ApiFailure::new(ApiErrorCode::NotFound, "no such route"),
            StatusCode::NOT_FOUND,
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            ApiFailure::new(ApiErrorCode::InvalidArgument, e.to_string()),
            StatusCode::BAD_REQUEST,
        )
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        (
            ApiFailure::new(ApiErrorCode::InvalidArgument, "request body too large"),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            ApiFailure::new(ApiErrorCode::NotFound, "method not allowed"),
            StatusCode::METHOD_NOT_ALLOWED,
        )
    } else {
        (
            ApiFailure::new(
                ApiErrorCode::InternalError,
                format!("Unhandled error: {:?}", err),
            ),
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(failure.code, failure.message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub kind: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Already friends")]
    AlreadyFriends,
    #[error("Friend request already sent")]
    DuplicateRequest,
    #[error("Not friends")]
    NotFriends,
    #[error("Friend request not found")]
    RequestNotFound,
    #[error("Storage temporarily unavailable")]
    StoreReadFailure,
    #[error("Storage temporarily unavailable")]
    StoreWriteFailure,
    #[error("Relationship state is inconsistent")]
    PartialWriteInconsistency,
    #[error("Operation timed out")]
    Timeout,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Not found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    /// Domain outcomes travel in a 200 envelope; only transport-level
    /// problems change the status code.
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }
}

impl From<ErrorKind> for ApiErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidArgument => ApiErrorCode::InvalidArgument,
            ErrorKind::AlreadyFriends => ApiErrorCode::AlreadyFriends,
            ErrorKind::DuplicateRequest => ApiErrorCode::DuplicateRequest,
            ErrorKind::NotFriends => ApiErrorCode::NotFriends,
            ErrorKind::RequestNotFound => ApiErrorCode::RequestNotFound,
            ErrorKind::StoreReadFailure => ApiErrorCode::StoreReadFailure,
            ErrorKind::StoreWriteFailure => ApiErrorCode::StoreWriteFailure,
            ErrorKind::PartialWriteInconsistency => ApiErrorCode::PartialWriteInconsistency,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiFailure {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiFailure {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        warn!("Internal error: {}", error);
        Self::new(ApiErrorCode::InternalError, ApiErrorCode::InternalError.to_string())
    }

    pub fn timeout() -> Self {
        Self::new(
            ApiErrorCode::Timeout,
            "operation is taking too long, check the result and try again",
        )
    }
}

impl reject::Reject for ApiFailure {}

impl From<RelationError> for ApiFailure {
    fn from(error: RelationError) -> Self {
        let code = ApiErrorCode::from(error.kind());
        let message = match code {
            // store details stay in the logs
            ApiErrorCode::StoreReadFailure | ApiErrorCode::StoreWriteFailure => {
                "storage is temporarily unavailable, please try again".to_string()
            }
            ApiErrorCode::PartialWriteInconsistency => {
                "the relationship could not be updated consistently and needs repair".to_string()
            }
            _ => error.to_string(),
        };
        Self::new(code, message)
    }
}

impl From<AuthError> for ApiFailure {
    fn from(error: AuthError) -> Self {
        Self::new(ApiErrorCode::InvalidToken, error.to_string())
    }
}
