//! Request extractors and parameter parsing shared by the handlers

use crate::core::error::{AppError, Result};
use crate::db::models::Page;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

/// `Json<T>` whose rejection is an [`AppError`], so malformed bodies get the
/// same JSON error envelope as every other failure
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(body_rejection(rejection)),
        }
    }
}

fn body_rejection(rejection: JsonRejection) -> AppError {
    tracing::debug!(reason = %rejection.body_text(), "Rejected request body");
    AppError::InvalidRequest("invalid request body".to_string())
}

/// Parse a path or query id, failing with a 400 carrying `message`
pub fn parse_id(raw: &str, message: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::InvalidRequest(message.to_string()))
}

/// Read `page`/`limit` query values. Absent values take the defaults, anything
/// unparsable or out of range is a 400.
pub fn parse_page(page: Option<&str>, limit: Option<&str>) -> Result<Page> {
    fn field(raw: Option<&str>, default: u32) -> Option<u32> {
        match raw {
            None => Some(default),
            Some(value) => value.trim().parse().ok(),
        }
    }

    match (field(page, 1), field(limit, Page::DEFAULT_LIMIT)) {
        (Some(page), Some(limit)) if page >= 1 && (1..=Page::MAX_LIMIT).contains(&limit) => {
            Ok(Page { page, limit })
        }
        _ => Err(AppError::InvalidRequest(
            "invalid pagination parameters".to_string(),
        )),
    }
}
