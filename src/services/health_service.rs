use crate::{dto::health::HealthResponse, state::SharedState};

/// Summarise what the process currently serves.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(
        state.tracker().bank().len(),
        state.rooms().len(),
        state.participants().len(),
    )
}
