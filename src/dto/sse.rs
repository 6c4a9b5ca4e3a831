use serde::Serialize;
use utoipa::ToSchema;

use crate::state::session::{ParticipantId, Role, RoomId};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// First event sent on a participant stream.
pub struct Handshake {
    /// Participant the stream follows.
    #[schema(value_type = String)]
    pub participant_id: ParticipantId,
    /// Room the participant plays in.
    #[schema(value_type = String)]
    pub room_id: RoomId,
    /// Host or follower.
    pub role: Role,
}
