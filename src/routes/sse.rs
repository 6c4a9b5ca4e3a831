use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::{room_service, sse_service},
    state::{SharedState, session::ParticipantId},
};

#[utoipa::path(
    get,
    path = "/participants/{id}/events",
    tag = "sse",
    params(("id" = String, Path, description = "Participant identifier")),
    responses(
        (status = 200, description = "Presentation stream of the participant", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown participant")
    )
)]
/// Stream the participant's presentation notifications.
pub async fn participant_stream(
    State(state): State<SharedState>,
    Path(id): Path<ParticipantId>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let receiver = room_service::subscribe_events(&state, id).await?;
    info!(participant = %id, "new participant SSE connection");
    Ok(sse_service::to_sse_stream(receiver, id))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/participants/{id}/events", get(participant_stream))
}
