use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    dao::session_store::SessionStore,
    dto::{
        room::{JoinRequest, JoinResponse},
        sse::{Handshake, ServerEvent},
    },
    error::ServiceError,
    services::{
        participant_runtime::{self, RuntimeDeps},
        presenter::SsePresenter,
    },
    state::{
        ParticipantEntry, SharedState, SseHub,
        session::{ParticipantId, RoomId, RoomSession},
        state_machine::{Command, Input, ParticipantContext},
    },
};

const INBOX_CAPACITY: usize = 32;

/// Resolve the caller's session in the requested room and start its participant.
pub async fn join(state: &SharedState, request: JoinRequest) -> Result<JoinResponse, ServiceError> {
    let room = request
        .room
        .as_deref()
        .map(str::parse::<RoomId>)
        .transpose()?;

    let session = RoomSession::resolve(
        room,
        &request.session,
        request.name,
        state.sessions(),
        state.config().session_policy(),
        &mut rand::rng(),
    );

    let previous = state
        .sessions()
        .attach(&request.session, &session.room_id, session.participant_id);
    if let Some(previous) = previous {
        retire(state, previous).await;
    }

    let hub = state.room_hub(&session.room_id);
    let sse = Arc::new(SseHub::new(state.config().sse_capacity));
    let ctx = ParticipantContext::new(
        session.clone(),
        state.config().timings(),
        state.tracker().clone(),
        StdRng::from_os_rng(),
    );
    let deps = RuntimeDeps {
        channel: hub,
        presenter: Arc::new(SsePresenter::new(session.participant_id, sse.clone())),
        usage_store: state.usage_store().clone(),
    };
    let handle = Arc::new(participant_runtime::spawn(ctx, deps, INBOX_CAPACITY));

    state.participants().insert(
        session.participant_id,
        ParticipantEntry {
            handle,
            sse,
            session_key: request.session,
        },
    );

    info!(
        room = %session.room_id,
        participant = %session.participant_id,
        role = ?session.role,
        slot = session.slot,
        "participant admitted"
    );

    Ok(JoinResponse {
        share_url: state.config().share_url(session.room_id.as_str()),
        room_id: session.room_id,
        participant_id: session.participant_id,
        role: session.role,
        slot: session.slot,
        name: session.display_name,
    })
}

/// Stop a participant, withdraw its presence and drop its room once empty.
pub async fn leave(state: &SharedState, id: ParticipantId) -> Result<(), ServiceError> {
    let (_, entry) = state
        .participants()
        .remove(&id)
        .ok_or(ServiceError::UnknownParticipant(id))?;

    entry.handle.shutdown().await;

    let room = entry.handle.room_id().clone();
    state.sessions().detach(&entry.session_key, &room, id);
    let removed = state
        .rooms()
        .remove_if(&room, |_, hub| hub.is_empty());
    if let Some((_, hub)) = removed {
        hub.close();
        info!(room = %room, "room closed");
    }
    Ok(())
}

/// Forward a UI command to the participant task.
pub async fn command(
    state: &SharedState,
    id: ParticipantId,
    command: Command,
) -> Result<(), ServiceError> {
    let entry = lookup(state, id)?;
    if !entry.handle.send(Input::Command(command)).await {
        warn!(participant = %id, ?command, "participant task stopped");
        return Err(ServiceError::ParticipantGone(id));
    }
    Ok(())
}

/// Attach a presentation stream to the participant and ask for a full re-render.
pub async fn subscribe_events(
    state: &SharedState,
    id: ParticipantId,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    let entry = lookup(state, id)?;
    let receiver = entry.sse.subscribe();

    let handshake = Handshake {
        participant_id: id,
        room_id: entry.handle.room_id().clone(),
        role: entry.handle.role(),
    };
    if let Ok(event) = ServerEvent::json(Some("handshake".to_string()), &handshake) {
        entry.sse.broadcast(event);
    }

    if !entry.handle.send(Input::Refresh).await {
        return Err(ServiceError::ParticipantGone(id));
    }
    Ok(receiver)
}

/// Stop the participant a rejoining session leaves behind.
async fn retire(state: &SharedState, previous: ParticipantId) {
    if let Some((_, entry)) = state.participants().remove(&previous) {
        entry.handle.shutdown().await;
        info!(participant = %previous, "previous participant replaced by a rejoin");
    }
}

fn lookup(state: &SharedState, id: ParticipantId) -> Result<ParticipantEntry, ServiceError> {
    state
        .participants()
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or(ServiceError::UnknownParticipant(id))
}
