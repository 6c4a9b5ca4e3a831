use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::session_store::{SessionStore, StoredIdentity};

const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_ROOM_ID_LENGTH: usize = 32;
/// Slot always taken by the participant who created the room.
pub const HOST_SLOT: u32 = 1;

/// Opaque, stable identity of a participant for the lifetime of its process.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Mint a new random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ParticipantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Authority of a participant inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Advances questions and judges answers.
    Host,
    /// Can only request to buzz.
    Follower,
}

/// Error returned for room references that cannot name a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid room id `{0}`: expected 1 to 32 alphanumeric characters")]
pub struct InvalidRoomId(pub String);

/// Short shareable identifier of a game instance.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct RoomId(String);

impl RoomId {
    /// Mint a random uppercase alphanumeric room identifier.
    pub fn generate<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Self {
        let id = (0..length.clamp(1, MAX_ROOM_ID_LENGTH))
            .map(|_| char::from(ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())]))
            .collect();
        Self(id)
    }

    /// Borrow the identifier as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomId {
    type Err = InvalidRoomId;

    /// Room references are case-insensitive; they are normalised to uppercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_ROOM_ID_LENGTH
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(InvalidRoomId(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

/// Knobs used when resolving a room session.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Length of freshly minted room identifiers.
    pub room_id_length: usize,
    /// Highest slot a follower can be assigned on first join.
    pub max_follower_slot: u32,
}

/// Who the local participant is and which room it plays in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSession {
    /// Room the participant is connected to.
    pub room_id: RoomId,
    /// Identity announced on the room's presence.
    pub participant_id: ParticipantId,
    /// Host or follower.
    pub role: Role,
    /// Positive numeric slot, 1 for the host.
    pub slot: u32,
    /// Name shown in rosters.
    pub display_name: String,
}

impl RoomSession {
    /// Resolve the local session from an optional room reference.
    ///
    /// Without a room reference a new room is minted and the caller becomes
    /// its host. With one, the role and slot remembered for this browsing
    /// session are reused so a reload keeps the host in charge; first-time
    /// visitors join as followers on a random slot.
    pub fn resolve<R: Rng + ?Sized>(
        room: Option<RoomId>,
        session_key: &str,
        display_name: Option<String>,
        store: &dyn SessionStore,
        policy: SessionPolicy,
        rng: &mut R,
    ) -> Self {
        let (room_id, identity) = match room {
            None => {
                let room_id = RoomId::generate(policy.room_id_length, rng);
                let identity = StoredIdentity {
                    role: Role::Host,
                    slot: HOST_SLOT,
                };
                (room_id, identity)
            }
            Some(room_id) => {
                let identity = store.load(session_key, &room_id).unwrap_or_else(|| {
                    let first = HOST_SLOT + 1;
                    let last = policy.max_follower_slot.max(first);
                    StoredIdentity {
                        role: Role::Follower,
                        slot: rng.random_range(first..=last),
                    }
                });
                (room_id, identity)
            }
        };

        store.store(session_key, &room_id, identity);

        let display_name = display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Player {}", identity.slot));

        Self {
            room_id,
            participant_id: ParticipantId::new(),
            role: identity.role,
            slot: identity.slot,
            display_name,
        }
    }

    /// Whether the local participant has host authority.
    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }
}
