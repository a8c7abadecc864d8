use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::domain::UserId;

/// Header carrying the numeric id of the authenticated user. Set by the authentication
/// front end; this service trusts it as-is.
pub const CALLER_HEADER: &str = "x-connxt-user";

/// Identity of the user making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub UserId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRejection {
    Missing,
    Malformed,
}

impl IntoResponse for CallerRejection {
    fn into_response(self) -> Response {
        let error = match self {
            CallerRejection::Missing => format!("missing {CALLER_HEADER} header"),
            CallerRejection::Malformed => format!("{CALLER_HEADER} must be a numeric user id"),
        };
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": error }))).into_response()
    }
}

#[axum::async_trait]
impl<St> FromRequestParts<St> for CallerId
where
    St: Send + Sync,
{
    type Rejection = CallerRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or(CallerRejection::Missing)?;
        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|id| CallerId(UserId(id)))
            .ok_or(CallerRejection::Malformed)
    }
}
