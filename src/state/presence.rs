use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::presence::{MembershipSnapshot, PresenceMeta},
    state::session::{ParticipantId, Role},
};

/// Animal picture drawn next to a participant's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Avatar {
    /// 🐱
    Cat,
    /// 🐶
    Dog,
    /// 🦊
    Fox,
    /// 🐼
    Panda,
    /// 🐨
    Koala,
    /// 🐯
    Tiger,
}

impl Avatar {
    const ALL: [Avatar; 6] = [
        Avatar::Cat,
        Avatar::Dog,
        Avatar::Fox,
        Avatar::Panda,
        Avatar::Koala,
        Avatar::Tiger,
    ];

    /// Stable avatar of `id`, the same on every client.
    pub fn of(id: &ParticipantId) -> Self {
        let sum: usize = id.to_string().chars().map(|c| c as usize).sum();
        Self::ALL[sum % Self::ALL.len()]
    }

    /// Emoji rendering of the avatar.
    pub fn emoji(self) -> &'static str {
        match self {
            Avatar::Cat => "🐱",
            Avatar::Dog => "🐶",
            Avatar::Fox => "🦊",
            Avatar::Panda => "🐼",
            Avatar::Koala => "🐨",
            Avatar::Tiger => "🐯",
        }
    }
}

/// A connected participant as seen by the local process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Participant {
    /// Presence key of the participant.
    #[schema(value_type = String)]
    pub identity: ParticipantId,
    /// Name shown in the roster.
    pub display_name: String,
    /// Host or follower.
    pub role: Role,
    /// Running score.
    pub score: i32,
    /// Numeric slot, 1 for the host.
    pub slot: u32,
    /// Picture derived from the identity.
    pub avatar: Avatar,
}

impl From<&PresenceMeta> for Participant {
    fn from(meta: &PresenceMeta) -> Self {
        Self {
            identity: meta.id,
            display_name: meta.name.clone(),
            role: meta.role,
            score: meta.score,
            slot: meta.slot,
            avatar: Avatar::of(&meta.id),
        }
    }
}

/// Live roster rebuilt from every membership snapshot.
#[derive(Debug, Clone, Default)]
pub struct PresenceRegistry {
    participants: IndexMap<ParticipantId, Participant>,
}

impl PresenceRegistry {
    /// Replace the registry content with `snapshot`.
    ///
    /// When a presence key carries several entries the one with the highest
    /// revision wins. The roster is ordered by slot, then by name.
    pub fn apply_membership_snapshot(&mut self, snapshot: &MembershipSnapshot) -> Vec<Participant> {
        self.participants.clear();

        for metas in snapshot.values() {
            let Some(latest) = metas.iter().max_by_key(|meta| meta.revision) else {
                continue;
            };
            self.participants
                .insert(latest.id, Participant::from(latest));
        }

        self.participants.sort_by(|_, a, _, b| {
            a.slot
                .cmp(&b.slot)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });

        self.roster()
    }

    /// Participants in roster order.
    pub fn roster(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    /// Look a participant up by identity.
    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// Number of participants currently present.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether nobody is present.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Overwrite the locally known score of `id`, if present.
    ///
    /// Used by a participant for its own record right after a judgement, before
    /// the transport echoes the new presence back.
    pub fn record_score(&mut self, id: &ParticipantId, score: i32) {
        if let Some(participant) = self.participants.get_mut(id) {
            participant.score = score;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: ParticipantId, name: &str, slot: u32, score: i32, revision: u64) -> PresenceMeta {
        PresenceMeta {
            id,
            name: name.into(),
            role: if slot == 1 { Role::Host } else { Role::Follower },
            score,
            slot,
            revision,
            online_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn avatar_follows_the_identity_characters() {
        let zero: ParticipantId = "00000000-0000-0000-0000-000000000000".parse().unwrap();
        let one: ParticipantId = "00000000-0000-0000-0000-000000000001".parse().unwrap();

        assert_eq!(Avatar::of(&zero), Avatar::Cat);
        assert_eq!(Avatar::of(&one), Avatar::Dog);
        assert_eq!(Avatar::of(&one).emoji(), "🐶");

        let mut snapshot = MembershipSnapshot::new();
        snapshot.insert(one, vec![meta(one, "Dana", 2, 0, 1)]);
        let roster = PresenceRegistry::default().apply_membership_snapshot(&snapshot);
        assert_eq!(roster[0].avatar, Avatar::Dog);
    }

    #[test]
    fn snapshot_fully_replaces_previous_content() {
        let alice = ParticipantId::new();
        let bob = ParticipantId::new();
        let mut registry = PresenceRegistry::default();

        let mut first = MembershipSnapshot::new();
        first.insert(alice, vec![meta(alice, "Alice", 1, 0, 1)]);
        first.insert(bob, vec![meta(bob, "Bob", 2, 0, 1)]);
        registry.apply_membership_snapshot(&first);
        assert_eq!(registry.len(), 2);

        let mut second = MembershipSnapshot::new();
        second.insert(bob, vec![meta(bob, "Bob", 2, 3, 2)]);
        let roster = registry.apply_membership_snapshot(&second);

        assert_eq!(roster.len(), 1);
        assert!(registry.get(&alice).is_none());
        assert_eq!(registry.get(&bob).map(|p| p.score), Some(3));
    }

    #[test]
    fn latest_announcement_wins_for_duplicate_entries() {
        let carol = ParticipantId::new();
        let mut snapshot = MembershipSnapshot::new();
        snapshot.insert(
            carol,
            vec![
                meta(carol, "Carol", 3, 5, 4),
                meta(carol, "Carol", 3, 1, 2),
            ],
        );

        let mut registry = PresenceRegistry::default();
        registry.apply_membership_snapshot(&snapshot);

        assert_eq!(registry.get(&carol).map(|p| p.score), Some(5));
    }

    #[test]
    fn roster_is_ordered_by_slot() {
        let host = ParticipantId::new();
        let second = ParticipantId::new();
        let third = ParticipantId::new();
        let mut snapshot = MembershipSnapshot::new();
        snapshot.insert(third, vec![meta(third, "Zed", 3, 0, 1)]);
        snapshot.insert(host, vec![meta(host, "Host", 1, 0, 1)]);
        snapshot.insert(second, vec![meta(second, "Amy", 2, 0, 1)]);

        let roster = PresenceRegistry::default().apply_membership_snapshot(&snapshot);

        let slots: Vec<u32> = roster.iter().map(|p| p.slot).collect();
        assert_eq!(slots, vec![1, 2, 3]);
    }
}
