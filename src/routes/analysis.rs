use axum::{extract::State, routing::post, Json, Router};
use uuid::Uuid;

use super::extract::ApiPath;
use super::{require_profile, AppState};
use crate::advisory::AnalysisResult;
use crate::error::Result;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/analysis/:user_id", post(analyze))
        .with_state(state)
}

async fn analyze(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<AnalysisResult>> {
    let profile = require_profile(state.store.as_ref(), user_id).await?;
    let records = state.store.list_by_user(user_id).await?;

    let analysis = state
        .advisory
        .analyze(&records, profile.age, profile.location.as_deref())
        .await?;

    Ok(Json(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::routes::testing;

    #[tokio::test]
    async fn unconfigured_advisory_is_unavailable() {
        let state = testing::state();
        let user = testing::user(&state).await;

        let result = analyze(State(state), ApiPath(user.id)).await;
        assert!(matches!(result, Err(AppError::AdvisoryUnavailable(_))));
    }

    #[tokio::test]
    async fn unknown_user_is_checked_first() {
        let state = testing::state();
        let result = analyze(State(state), ApiPath(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::NotFound("User"))));
    }
}
