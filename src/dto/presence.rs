use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::format_system_time,
    state::session::{ParticipantId, Role, RoomSession},
};

/// Metadata a participant announces on the room presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PresenceMeta {
    #[schema(value_type = String)]
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
    pub score: i32,
    pub slot: u32,
    /// Increases with every announcement from the same participant.
    pub revision: u64,
    /// RFC3339 timestamp of the announcement.
    pub online_at: String,
}

impl PresenceMeta {
    /// Describe the local participant with the given score and revision.
    pub fn announce(session: &RoomSession, score: i32, revision: u64) -> Self {
        Self {
            id: session.participant_id,
            name: session.display_name.clone(),
            role: session.role,
            score,
            slot: session.slot,
            revision,
            online_at: format_system_time(SystemTime::now()),
        }
    }
}

/// Full membership state as reported by the transport: every presence key
/// with all metadata entries currently tracked under it.
pub type MembershipSnapshot = IndexMap<ParticipantId, Vec<PresenceMeta>>;
