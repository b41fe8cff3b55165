//! Route handlers. Store access is synchronous, so every handler hops onto
//! the blocking pool before touching the engine.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use spillover_core::{MemberCode, TreeError};
use spillover_engine::{LoginResult, Profile, RegistrationRequest};
use spillover_store::Downline;

use crate::auth::AuthMember;
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub member_code: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub member_code: MemberCode,
}

async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, TreeError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!(error = %e, "handler task failed");
            Err(ApiError::internal())
        }
    }
}

fn malformed_body(rejection: JsonRejection) -> ApiError {
    tracing::debug!(error = %rejection, "rejected request body");
    ApiError::from(TreeError::InvalidInput("All fields are required".into()))
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(malformed_body)?;
    let accounts = state.accounts.clone();
    let registration = blocking(move || accounts.register(&request)).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Member registered successfully",
            member_code: registration.code,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResult>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected login body");
        ApiError::from(TreeError::InvalidInput(
            "Member code and password required".into(),
        ))
    })?;
    let accounts = state.accounts.clone();
    let result = blocking(move || {
        accounts.login(
            request.member_code.as_deref().unwrap_or_default(),
            request.password.as_deref().unwrap_or_default(),
        )
    })
    .await?;
    Ok(Json(result))
}

pub async fn profile(
    State(state): State<AppState>,
    AuthMember(claims): AuthMember,
) -> Result<Json<Profile>, ApiError> {
    let accounts = state.accounts.clone();
    let profile = blocking(move || accounts.profile(claims.id)).await?;
    Ok(Json(profile))
}

pub async fn downline(
    State(state): State<AppState>,
    AuthMember(claims): AuthMember,
) -> Result<Json<Downline>, ApiError> {
    let query = state.downline.clone();
    let downline = blocking(move || query.children_of(claims.id)).await?;
    Ok(Json(downline))
}

pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let repo = state.repo.clone();
    let members = blocking(move || Ok(repo.count()?)).await?;
    Ok(Json(json!({ "status": "ok", "members": members })))
}
