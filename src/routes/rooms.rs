use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::room::{JoinRequest, JoinResponse},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Room membership endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/rooms/join", post(join_room))
}

/// Join a room, creating it (and becoming its host) when no room is given.
#[utoipa::path(
    post,
    path = "/rooms/join",
    tag = "rooms",
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Participant admitted", body = JoinResponse),
        (status = 400, description = "Invalid session key, room id or name")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<JoinRequest>>,
) -> Result<Json<JoinResponse>, AppError> {
    Ok(Json(room_service::join(&state, request).await?))
}
