use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};

use crate::{
    dto::room::{ActionResponse, JudgeRequest},
    error::AppError,
    services::room_service,
    state::{SharedState, session::ParticipantId, state_machine::Command},
};

/// Controls a hosted participant exposes to its UI.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/participants/{id}/leave", post(leave))
        .route("/participants/{id}/buzz", post(buzz))
        .route("/participants/{id}/game/start", post(start_game))
        .route("/participants/{id}/question/start", post(start_question))
        .route("/participants/{id}/answer/reveal", post(reveal_answer))
        .route("/participants/{id}/judge", post(judge))
}

async fn queue(
    state: &SharedState,
    id: ParticipantId,
    command: Command,
    action: &str,
) -> Result<(StatusCode, Json<ActionResponse>), AppError> {
    room_service::command(state, id, command).await?;
    Ok((StatusCode::ACCEPTED, Json(ActionResponse::queued(action))))
}

/// Leave the room and stop the participant.
#[utoipa::path(
    post,
    path = "/participants/{id}/leave",
    tag = "participants",
    params(("id" = String, Path, description = "Participant identifier")),
    responses(
        (status = 204, description = "Participant removed"),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn leave(
    State(state): State<SharedState>,
    Path(id): Path<ParticipantId>,
) -> Result<StatusCode, AppError> {
    room_service::leave(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Press the buzzer. Ignored while the buzzer is disabled.
#[utoipa::path(
    post,
    path = "/participants/{id}/buzz",
    tag = "participants",
    params(("id" = String, Path, description = "Participant identifier")),
    responses(
        (status = 202, description = "Buzz queued", body = ActionResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn buzz(
    State(state): State<SharedState>,
    Path(id): Path<ParticipantId>,
) -> Result<(StatusCode, Json<ActionResponse>), AppError> {
    queue(&state, id, Command::Buzz, "buzz").await
}

/// Start the game. Host only; followers are ignored.
#[utoipa::path(
    post,
    path = "/participants/{id}/game/start",
    tag = "participants",
    params(("id" = String, Path, description = "Participant identifier")),
    responses(
        (status = 202, description = "Command queued", body = ActionResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<ParticipantId>,
) -> Result<(StatusCode, Json<ActionResponse>), AppError> {
    queue(&state, id, Command::StartGame, "start game").await
}

/// Put the next question in play. Host only.
#[utoipa::path(
    post,
    path = "/participants/{id}/question/start",
    tag = "participants",
    params(("id" = String, Path, description = "Participant identifier")),
    responses(
        (status = 202, description = "Command queued", body = ActionResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn start_question(
    State(state): State<SharedState>,
    Path(id): Path<ParticipantId>,
) -> Result<(StatusCode, Json<ActionResponse>), AppError> {
    queue(&state, id, Command::StartQuestion, "start question").await
}

/// Reveal the answer of the current question. Host only.
#[utoipa::path(
    post,
    path = "/participants/{id}/answer/reveal",
    tag = "participants",
    params(("id" = String, Path, description = "Participant identifier")),
    responses(
        (status = 202, description = "Command queued", body = ActionResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn reveal_answer(
    State(state): State<SharedState>,
    Path(id): Path<ParticipantId>,
) -> Result<(StatusCode, Json<ActionResponse>), AppError> {
    queue(&state, id, Command::RevealAnswer, "reveal answer").await
}

/// Judge the answer of the participant holding the buzzer. Host only.
#[utoipa::path(
    post,
    path = "/participants/{id}/judge",
    tag = "participants",
    params(("id" = String, Path, description = "Participant identifier")),
    request_body = JudgeRequest,
    responses(
        (status = 202, description = "Command queued", body = ActionResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn judge(
    State(state): State<SharedState>,
    Path(id): Path<ParticipantId>,
    Json(request): Json<JudgeRequest>,
) -> Result<(StatusCode, Json<ActionResponse>), AppError> {
    queue(
        &state,
        id,
        Command::Judge {
            correct: request.correct,
        },
        "judge",
    )
    .await
}
