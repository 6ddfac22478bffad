use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the journal owner making the request.
///
/// Taken from the `x-user-id` header, or the configured default user when
/// the header is absent or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl FromRequestParts<AppState> for CallerId {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| state.default_user.clone());
        Ok(CallerId(user_id))
    }
}
