pub mod host;
pub mod presence;
pub mod question;
pub mod round;
pub mod session;
mod sse;
pub mod state_machine;
pub mod usage;

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    config::AppConfig,
    dao::{session_store::MemorySessionStore, usage_store::UsageStore},
    services::{participant_runtime::ParticipantHandle, transport::LocalRoomHub},
    state::{
        question::QuestionBank,
        session::{ParticipantId, RoomId},
        usage::UsageTracker,
    },
};

pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

/// A participant hosted by this process.
#[derive(Clone)]
pub struct ParticipantEntry {
    /// Handle to the participant task.
    pub handle: Arc<ParticipantHandle>,
    /// Hub feeding the participant's SSE streams.
    pub sse: Arc<SseHub>,
    /// Browsing session the participant was admitted for.
    pub session_key: String,
}

/// Central application state: loaded question bank, usage tracking, rooms and
/// the participants hosted in this process.
pub struct AppState {
    config: AppConfig,
    tracker: Arc<UsageTracker>,
    usage_store: Arc<dyn UsageStore>,
    sessions: MemorySessionStore,
    rooms: DashMap<RoomId, Arc<LocalRoomHub>>,
    participants: DashMap<ParticipantId, ParticipantEntry>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        bank: Arc<QuestionBank>,
        usage_store: Arc<dyn UsageStore>,
        history: usage::UsageHistory,
    ) -> SharedState {
        Arc::new(Self {
            config,
            tracker: Arc::new(UsageTracker::new(bank, history)),
            usage_store,
            sessions: MemorySessionStore::default(),
            rooms: DashMap::new(),
            participants: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Usage tracker shared by every host.
    pub fn tracker(&self) -> &Arc<UsageTracker> {
        &self.tracker
    }

    /// Persistence for the usage history.
    pub fn usage_store(&self) -> &Arc<dyn UsageStore> {
        &self.usage_store
    }

    /// Identities remembered per browsing session and room.
    pub fn sessions(&self) -> &MemorySessionStore {
        &self.sessions
    }

    /// Rooms that currently have participants hosted here.
    pub fn rooms(&self) -> &DashMap<RoomId, Arc<LocalRoomHub>> {
        &self.rooms
    }

    /// Channel of `room`, created on first use.
    pub fn room_hub(&self, room: &RoomId) -> Arc<LocalRoomHub> {
        self.rooms
            .entry(room.clone())
            .or_insert_with(|| Arc::new(LocalRoomHub::new(room.clone(), self.config.room_capacity)))
            .clone()
    }

    /// Registry of participants keyed by identity.
    pub fn participants(&self) -> &DashMap<ParticipantId, ParticipantEntry> {
        &self.participants
    }
}
