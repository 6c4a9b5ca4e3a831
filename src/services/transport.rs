//! Room channel abstraction: broadcast of game events and presence tracking.
//!
//! The channel never delivers a broadcast back to the participant that sent
//! it, and messages from one sender arrive in the order they were published.

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use futures::future::{self, BoxFuture};
use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::{
    dto::{
        events::GameEvent,
        presence::{MembershipSnapshot, PresenceMeta},
    },
    state::session::{ParticipantId, RoomId},
};

/// Failures raised by a room channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The room was torn down.
    #[error("room {0} is closed")]
    Closed(RoomId),
    /// The event could not be encoded for the wire.
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Raw message travelling on a room.
#[derive(Debug, Clone)]
pub enum RoomMessage {
    /// JSON-encoded [`GameEvent`] published by `sender`.
    Broadcast {
        /// Publisher, used to suppress self-delivery.
        sender: ParticipantId,
        /// Encoded event.
        payload: String,
    },
    /// Full membership after a presence change.
    PresenceSync(MembershipSnapshot),
}

/// What a subscriber receives once its own traffic is filtered out.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Event published by another participant.
    Event(GameEvent),
    /// Current membership.
    Presence(MembershipSnapshot),
}

/// Subscription of one participant to a room.
pub struct RoomSubscription {
    participant: ParticipantId,
    receiver: broadcast::Receiver<RoomMessage>,
}

impl RoomSubscription {
    /// Wrap a raw receiver, dropping broadcasts sent by `participant`.
    pub fn new(participant: ParticipantId, receiver: broadcast::Receiver<RoomMessage>) -> Self {
        Self {
            participant,
            receiver,
        }
    }

    /// Wait for the next message addressed to this participant.
    ///
    /// Returns `None` once the room is gone.
    pub async fn recv(&mut self) -> Option<Inbound> {
        loop {
            match self.receiver.recv().await {
                Ok(RoomMessage::Broadcast { sender, .. }) if sender == self.participant => continue,
                Ok(RoomMessage::Broadcast { sender, payload }) => {
                    match GameEvent::from_json_str(&payload) {
                        Ok(event) => return Some(Inbound::Event(event)),
                        Err(err) => {
                            warn!(%sender, error = %err, "dropping undecodable room message");
                        }
                    }
                }
                Ok(RoomMessage::PresenceSync(snapshot)) => return Some(Inbound::Presence(snapshot)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(participant = %self.participant, skipped, "room subscription lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Publish/subscribe and presence operations a room must provide.
pub trait RoomChannel: Send + Sync {
    /// Room served by this channel.
    fn room_id(&self) -> &RoomId;
    /// Start receiving room traffic on behalf of `participant`.
    fn subscribe(&self, participant: ParticipantId) -> RoomSubscription;
    /// Send `event` to every other subscriber.
    fn publish(
        &self,
        sender: ParticipantId,
        event: &GameEvent,
    ) -> BoxFuture<'static, Result<(), TransportError>>;
    /// Announce or refresh presence metadata.
    fn track(&self, meta: PresenceMeta) -> BoxFuture<'static, Result<(), TransportError>>;
    /// Withdraw the presence of `participant`.
    fn untrack(&self, participant: ParticipantId) -> BoxFuture<'static, Result<(), TransportError>>;
}

/// In-process room channel shared by the participants hosted in this process.
pub struct LocalRoomHub {
    room_id: RoomId,
    sender: broadcast::Sender<RoomMessage>,
    members: Mutex<IndexMap<ParticipantId, PresenceMeta>>,
    closed: AtomicBool,
}

impl LocalRoomHub {
    /// Create an empty room whose subscribers buffer up to `capacity` messages.
    pub fn new(room_id: RoomId, capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self {
            room_id,
            sender,
            members: Mutex::new(IndexMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Current membership.
    pub fn snapshot(&self) -> MembershipSnapshot {
        let members = self.members.lock().unwrap_or_else(PoisonError::into_inner);
        snapshot_of(&members)
    }

    /// Whether nobody is tracked in the room anymore.
    pub fn is_empty(&self) -> bool {
        self.members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Refuse any further traffic.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed(self.room_id.clone()));
        }
        Ok(())
    }

    fn update_members(
        &self,
        update: impl FnOnce(&mut IndexMap<ParticipantId, PresenceMeta>),
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut members = self.members.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut members);
        // Sent under the lock so syncs reach subscribers in membership order.
        let _ = self
            .sender
            .send(RoomMessage::PresenceSync(snapshot_of(&members)));
        Ok(())
    }
}

fn snapshot_of(members: &IndexMap<ParticipantId, PresenceMeta>) -> MembershipSnapshot {
    members
        .iter()
        .map(|(id, meta)| (*id, vec![meta.clone()]))
        .collect()
}

impl RoomChannel for LocalRoomHub {
    fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn subscribe(&self, participant: ParticipantId) -> RoomSubscription {
        RoomSubscription::new(participant, self.sender.subscribe())
    }

    fn publish(
        &self,
        sender: ParticipantId,
        event: &GameEvent,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        let result = self.ensure_open().and_then(|()| {
            let payload = event.to_json_string()?;
            if self
                .sender
                .send(RoomMessage::Broadcast { sender, payload })
                .is_err()
            {
                debug!(room = %self.room_id, kind = event.kind(), "no subscriber for event");
            }
            Ok(())
        });
        Box::pin(future::ready(result))
    }

    fn track(&self, meta: PresenceMeta) -> BoxFuture<'static, Result<(), TransportError>> {
        let result = self.update_members(|members| {
            members.insert(meta.id, meta);
        });
        Box::pin(future::ready(result))
    }

    fn untrack(&self, participant: ParticipantId) -> BoxFuture<'static, Result<(), TransportError>> {
        let result = self.update_members(|members| {
            members.shift_remove(&participant);
        });
        Box::pin(future::ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::{Role, RoomSession};

    fn room() -> RoomId {
        "ROOM01".parse().unwrap()
    }

    fn meta(slot: u32, revision: u64) -> PresenceMeta {
        let session = RoomSession {
            room_id: room(),
            participant_id: ParticipantId::new(),
            role: if slot == 1 { Role::Host } else { Role::Follower },
            slot,
            display_name: format!("Player {slot}"),
        };
        PresenceMeta::announce(&session, 0, revision)
    }

    #[tokio::test]
    async fn broadcasts_skip_the_sender() {
        let hub = LocalRoomHub::new(room(), 16);
        let alice = ParticipantId::new();
        let bob = ParticipantId::new();
        let mut alice_sub = hub.subscribe(alice);
        let mut bob_sub = hub.subscribe(bob);

        let event = GameEvent::BuzzRequest { participant: alice };
        hub.publish(alice, &event).await.unwrap();
        hub.publish(bob, &GameEvent::ResumeQuestion { excluded: None })
            .await
            .unwrap();

        assert!(matches!(bob_sub.recv().await, Some(Inbound::Event(e)) if e == event));
        assert!(matches!(
            alice_sub.recv().await,
            Some(Inbound::Event(GameEvent::ResumeQuestion { excluded: None }))
        ));
    }

    #[tokio::test]
    async fn same_sender_messages_keep_their_order() {
        let hub = LocalRoomHub::new(room(), 16);
        let host = ParticipantId::new();
        let mut follower = hub.subscribe(ParticipantId::new());

        for sequence in 1..=3 {
            hub.publish(
                host,
                &GameEvent::QuestionStarted {
                    sequence,
                    question_id: sequence,
                    text: "q".into(),
                    answer: "a".into(),
                    excluded: None,
                },
            )
            .await
            .unwrap();
        }

        for expected in 1..=3 {
            match follower.recv().await {
                Some(Inbound::Event(GameEvent::QuestionStarted { sequence, .. })) => {
                    assert_eq!(sequence, expected)
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn presence_changes_reach_every_subscriber() {
        let hub = LocalRoomHub::new(room(), 16);
        let host = meta(1, 1);
        let mut host_sub = hub.subscribe(host.id);

        hub.track(host.clone()).await.unwrap();
        let follower = meta(2, 1);
        hub.track(follower.clone()).await.unwrap();
        hub.untrack(host.id).await.unwrap();

        let mut sizes = Vec::new();
        for _ in 0..3 {
            match host_sub.recv().await {
                Some(Inbound::Presence(snapshot)) => sizes.push(snapshot.len()),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(sizes, vec![1, 2, 1]);
        assert!(hub.snapshot().contains_key(&follower.id));
    }

    #[tokio::test]
    async fn track_replaces_previous_metadata() {
        let hub = LocalRoomHub::new(room(), 16);
        let mut first = meta(2, 1);
        hub.track(first.clone()).await.unwrap();
        first.score = 4;
        first.revision = 2;
        hub.track(first.clone()).await.unwrap();

        let snapshot = hub.snapshot();
        assert_eq!(snapshot[&first.id], vec![first]);
    }

    #[tokio::test]
    async fn closed_room_rejects_traffic() {
        let hub = LocalRoomHub::new(room(), 16);
        hub.close();

        let err = hub
            .publish(
                ParticipantId::new(),
                &GameEvent::AnswerRevealed { answer: "a".into() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed(_)));
        assert!(hub.track(meta(2, 1)).await.is_err());
    }

    #[tokio::test]
    async fn undecodable_payloads_are_skipped() {
        let hub = LocalRoomHub::new(room(), 16);
        let mut sub = hub.subscribe(ParticipantId::new());
        let sender = ParticipantId::new();

        hub.sender
            .send(RoomMessage::Broadcast {
                sender,
                payload: "{\"type\":\"mystery\"}".into(),
            })
            .unwrap();
        hub.publish(sender, &GameEvent::AnswerRevealed { answer: "x".into() })
            .await
            .unwrap();

        assert!(matches!(
            sub.recv().await,
            Some(Inbound::Event(GameEvent::AnswerRevealed { .. }))
        ));
    }
}
