use dashmap::DashMap;

use crate::state::session::{ParticipantId, Role, RoomId};

/// Role and slot remembered for one browsing session in one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredIdentity {
    /// Role granted when the session first entered the room.
    pub role: Role,
    /// Numeric slot assigned in that room.
    pub slot: u32,
}

/// Per-browsing-session storage keyed by room identifier.
pub trait SessionStore: Send + Sync {
    /// Fetch the identity remembered for `session_key` in `room`.
    fn load(&self, session_key: &str, room: &RoomId) -> Option<StoredIdentity>;
    /// Remember `identity` for `session_key` in `room`.
    fn store(&self, session_key: &str, room: &RoomId, identity: StoredIdentity);
    /// Make `participant` the live participant of `session_key` in `room`,
    /// returning the one it replaces.
    fn attach(
        &self,
        session_key: &str,
        room: &RoomId,
        participant: ParticipantId,
    ) -> Option<ParticipantId>;
    /// Forget the live participant unless it was replaced meanwhile.
    fn detach(&self, session_key: &str, room: &RoomId, participant: ParticipantId);
}

/// Session store living for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<(String, RoomId), StoredIdentity>,
    live: DashMap<(String, RoomId), ParticipantId>,
}

fn key(session_key: &str, room: &RoomId) -> (String, RoomId) {
    (session_key.to_string(), room.clone())
}

impl SessionStore for MemorySessionStore {
    fn load(&self, session_key: &str, room: &RoomId) -> Option<StoredIdentity> {
        self.entries
            .get(&key(session_key, room))
            .map(|entry| *entry.value())
    }

    fn store(&self, session_key: &str, room: &RoomId, identity: StoredIdentity) {
        self.entries.insert(key(session_key, room), identity);
    }

    fn attach(
        &self,
        session_key: &str,
        room: &RoomId,
        participant: ParticipantId,
    ) -> Option<ParticipantId> {
        self.live.insert(key(session_key, room), participant)
    }

    fn detach(&self, session_key: &str, room: &RoomId, participant: ParticipantId) {
        self.live
            .remove_if(&key(session_key, room), |_, live| *live == participant);
    }
}
