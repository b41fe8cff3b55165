use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use spillover_engine::Claims;

use crate::error::ApiError;
use crate::server::AppState;

/// The caller behind a valid `Authorization: Bearer <token>` header.
#[derive(Clone, Debug)]
pub struct AuthMember(pub Claims);

impl FromRequestParts<AppState> for AuthMember {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_whitespace().nth(1));
        let Some(token) = token else {
            return Err(ApiError::missing_token());
        };

        state
            .accounts
            .tokens()
            .verify(token)
            .map(AuthMember)
            .map_err(|_| ApiError::invalid_token())
    }
}
