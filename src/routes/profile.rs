use axum::{extract::State, routing::put, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use super::{require_profile, AppState, SuccessResponse};
use crate::error::Result;
use crate::models::ProfileUpdate;

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub profile: ProfileUpdate,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/profile/:user_id", put(update_profile))
        .with_state(state)
}

/// Age and location are user-editable; the average cycle length is not.
async fn update_profile(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<Json<SuccessResponse>> {
    let store = state.store.as_ref();
    let mut profile = require_profile(store, user_id).await?;

    body.profile.apply(&mut profile)?;
    store.update_details(user_id, &profile).await?;

    Ok(Json(SuccessResponse {
        success: true,
        message: None,
    }))
}
