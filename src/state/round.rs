use crate::state::{question::QuestionId, session::ParticipantId};

/// Exclusivity state of the buzzer for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuzzLock {
    /// Nobody has the right to answer.
    #[default]
    Free,
    /// `0` buzzed first and is answering.
    Held(ParticipantId),
}

/// The question currently on screen, kept so the answer can be revealed later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentQuestion {
    /// Bank identifier.
    pub id: QuestionId,
    /// Prompt text.
    pub text: String,
    /// Answer text, hidden until revealed.
    pub answer: String,
}

/// Per-participant mirror of the host's round state.
#[derive(Debug, Clone, Default)]
pub struct RoundState {
    /// Question in play, if any.
    pub current_question: Option<CurrentQuestion>,
    /// Sequence number of the current question, starting at 1.
    pub sequence: u32,
    /// Who holds the buzzer.
    pub buzz_lock: BuzzLock,
    /// Participant barred from buzzing on this question.
    pub excluded: Option<ParticipantId>,
    /// Seconds left on the local countdown, `None` when it is not running.
    pub time_remaining: Option<u32>,
    /// Set once time ran out or a correct answer was given.
    pub buzz_closed: bool,
    /// Wrong answerer named by the latest resume, held back until replaced.
    pub resumed_without: Option<ParticipantId>,
}

impl RoundState {
    /// Reset the mirror for a freshly started question.
    pub fn begin(
        &mut self,
        sequence: u32,
        question: CurrentQuestion,
        excluded: Option<ParticipantId>,
        seconds: u32,
    ) {
        self.current_question = Some(question);
        self.sequence = sequence;
        self.buzz_lock = BuzzLock::Free;
        self.excluded = excluded;
        self.time_remaining = Some(seconds);
        self.buzz_closed = false;
        self.resumed_without = None;
    }

    /// Whether a question is in play.
    pub fn is_active(&self) -> bool {
        self.current_question.is_some()
    }

    /// Current buzz holder, if any.
    pub fn holder(&self) -> Option<ParticipantId> {
        match self.buzz_lock {
            BuzzLock::Free => None,
            BuzzLock::Held(id) => Some(id),
        }
    }

    /// Whether `id` is barred from buzzing on this question regardless of the lock.
    pub fn is_locked_out(&self, id: &ParticipantId) -> bool {
        self.excluded.as_ref() == Some(id) || self.resumed_without.as_ref() == Some(id)
    }

    /// Whether `id` may buzz right now.
    pub fn can_buzz(&self, id: &ParticipantId) -> bool {
        self.is_active()
            && self.buzz_lock == BuzzLock::Free
            && !self.buzz_closed
            && !self.is_locked_out(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> CurrentQuestion {
        CurrentQuestion {
            id: 1,
            text: "q".into(),
            answer: "a".into(),
        }
    }

    #[test]
    fn nobody_can_buzz_without_a_question() {
        let round = RoundState::default();
        assert!(!round.can_buzz(&ParticipantId::new()));
    }

    #[test]
    fn excluded_participant_cannot_buzz() {
        let excluded = ParticipantId::new();
        let other = ParticipantId::new();
        let mut round = RoundState::default();
        round.begin(1, question(), Some(excluded), 20);

        assert!(!round.can_buzz(&excluded));
        assert!(round.can_buzz(&other));
    }

    #[test]
    fn only_the_latest_wrong_answerer_is_held_back() {
        let first = ParticipantId::new();
        let second = ParticipantId::new();
        let mut round = RoundState::default();
        round.begin(1, question(), None, 20);

        round.resumed_without = Some(first);
        assert!(!round.can_buzz(&first));

        round.resumed_without = Some(second);
        assert!(round.can_buzz(&first));
        assert!(!round.can_buzz(&second));
    }

    #[test]
    fn begin_clears_previous_question_state() {
        let wrong = ParticipantId::new();
        let mut round = RoundState::default();
        round.begin(1, question(), None, 20);
        round.buzz_lock = BuzzLock::Held(wrong);
        round.resumed_without = Some(wrong);
        round.buzz_closed = true;

        round.begin(2, question(), None, 20);

        assert_eq!(round.sequence, 2);
        assert_eq!(round.buzz_lock, BuzzLock::Free);
        assert_eq!(round.resumed_without, None);
        assert!(round.can_buzz(&wrong));
    }
}
