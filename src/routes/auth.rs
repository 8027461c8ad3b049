use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use super::extract::ApiJson;
use super::{require_profile, AppState};
use crate::error::Result;
use crate::models::{User, UserProfile};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub profile: UserProfile,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .with_state(state)
}

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<SessionResponse>> {
    let store = state.store.as_ref();
    let user = crate::auth::register(store, &body.email, &body.password, &body.name).await?;
    let profile = require_profile(store, user.id).await?;

    Ok(Json(SessionResponse { user, profile }))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let store = state.store.as_ref();
    let user = crate::auth::login(store, &body.email, &body.password).await?;
    let profile = require_profile(store, user.id).await?;

    Ok(Json(SessionResponse { user, profile }))
}
