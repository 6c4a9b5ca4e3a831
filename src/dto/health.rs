use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok" once the server answers.
    pub status: String,
    /// Questions in the loaded bank.
    pub questions: usize,
    /// Rooms with at least one participant hosted here.
    pub rooms: usize,
    /// Participants hosted here.
    pub participants: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(questions: usize, rooms: usize, participants: usize) -> Self {
        Self {
            status: "ok".to_string(),
            questions,
            rooms,
            participants,
        }
    }
}
