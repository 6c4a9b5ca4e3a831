use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::session::{ParticipantId, Role, RoomId};

/// Request to enter a room, or to create one when `room` is omitted.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRequest {
    /// Browsing-session key; reusing it in the same room keeps role and slot.
    #[validate(length(min = 1, max = 128))]
    pub session: String,
    /// Room to join; a new room is created when absent.
    #[serde(default)]
    #[validate(length(min = 1, max = 32))]
    pub room: Option<String>,
    /// Display name; defaults to "Player <slot>".
    #[serde(default)]
    #[validate(length(max = 40))]
    pub name: Option<String>,
}

/// Identity granted by a successful join.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    #[schema(value_type = String)]
    pub room_id: RoomId,
    #[schema(value_type = String)]
    pub participant_id: ParticipantId,
    pub role: Role,
    pub slot: u32,
    pub name: String,
    /// Link other players can open to join the room.
    pub share_url: String,
}

/// Host verdict on the current answer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JudgeRequest {
    pub correct: bool,
}

/// Acknowledgement for commands queued to a participant.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

impl ActionResponse {
    /// Acknowledge `action`.
    pub fn queued(action: &str) -> Self {
        Self {
            message: format!("{action} queued"),
        }
    }
}
