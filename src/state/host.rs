//! Commands that advance the game. Apart from [`Command::Buzz`], they only run
//! on the host; followers drop them.

use std::sync::Arc;

use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use crate::{
    dto::{events::GameEvent, presentation::View},
    state::{
        question::QuestionId,
        session::ParticipantId,
        state_machine::{Command, Effect, ParticipantContext, emit},
        usage::UsageTracker,
    },
};

/// Bookkeeping only the host keeps.
#[derive(Debug)]
pub struct HostLedger {
    tracker: Arc<UsageTracker>,
    rng: StdRng,
    order: Vec<QuestionId>,
    pending_exclusion: Option<ParticipantId>,
}

impl HostLedger {
    pub(crate) fn new(tracker: Arc<UsageTracker>, rng: StdRng) -> Self {
        Self {
            tracker,
            rng,
            order: Vec::new(),
            pending_exclusion: None,
        }
    }

    /// Shuffled bank order drawn when the game started.
    pub fn order(&self) -> &[QuestionId] {
        &self.order
    }

    /// Participant who will sit the next question out.
    pub fn pending_exclusion(&self) -> Option<ParticipantId> {
        self.pending_exclusion
    }
}

pub(crate) fn run_command(ctx: &mut ParticipantContext, command: Command, effects: &mut Vec<Effect>) {
    match command {
        Command::Buzz => buzz(ctx, effects),
        Command::StartGame => start_game(ctx, effects),
        Command::StartQuestion => start_question(ctx, effects),
        Command::RevealAnswer => reveal_answer(ctx, effects),
        Command::RevealAfterTimeout { sequence } => {
            if ctx.round().sequence != sequence {
                debug!(sequence, "timeout reveal outdated by a newer question");
                return;
            }
            reveal_answer(ctx, effects);
        }
        Command::Judge { correct } => judge(ctx, correct, effects),
    }
}

fn buzz(ctx: &mut ParticipantContext, effects: &mut Vec<Effect>) {
    let participant = ctx.id();
    if !ctx.buzzer_enabled() {
        debug!(%participant, "buzzer disabled; ignoring press");
        return;
    }
    emit(ctx, GameEvent::BuzzRequest { participant }, effects);
}

fn start_game(ctx: &mut ParticipantContext, effects: &mut Vec<Effect>) {
    if ctx.view() != View::Lobby {
        debug!("game already started");
        return;
    }

    let first_question_delay = ctx.timings().first_question_delay;
    let Some(ledger) = ctx.host_ledger() else {
        debug!("start game ignored on a follower");
        return;
    };
    let order = ledger.tracker.bank().shuffled_order(&mut ledger.rng);
    ledger.order = order.clone();

    info!(room = %ctx.session().room_id, questions = order.len(), "game started");
    emit(ctx, GameEvent::GameStarted { order }, effects);
    effects.push(Effect::Schedule {
        after: first_question_delay,
        command: Command::StartQuestion,
    });
}

fn start_question(ctx: &mut ParticipantContext, effects: &mut Vec<Effect>) {
    let sequence = ctx.round().sequence + 1;
    let Some(ledger) = ctx.host_ledger() else {
        debug!("start question ignored on a follower");
        return;
    };

    let (question, history) = match ledger.tracker.pick_next(&mut ledger.rng) {
        Ok(picked) => picked,
        Err(err) => {
            error!(error = %err, "unable to pick the next question");
            return;
        }
    };
    let excluded = ledger.pending_exclusion.take();

    info!(
        room = %ctx.session().room_id,
        sequence,
        question_id = question.id,
        excluded = ?excluded,
        "question started"
    );
    effects.push(Effect::PersistUsage(history));
    emit(
        ctx,
        GameEvent::QuestionStarted {
            sequence,
            question_id: question.id,
            text: question.question,
            answer: question.answer,
            excluded,
        },
        effects,
    );
}

fn reveal_answer(ctx: &mut ParticipantContext, effects: &mut Vec<Effect>) {
    if !ctx.is_host() {
        debug!("reveal ignored on a follower");
        return;
    }
    let Some(answer) = ctx
        .round()
        .current_question
        .as_ref()
        .map(|question| question.answer.clone())
    else {
        warn!("no question in play; nothing to reveal");
        return;
    };
    emit(ctx, GameEvent::AnswerRevealed { answer }, effects);
}

fn judge(ctx: &mut ParticipantContext, correct: bool, effects: &mut Vec<Effect>) {
    let holder = ctx.round().holder();
    let Some(ledger) = ctx.host_ledger() else {
        debug!("judge ignored on a follower");
        return;
    };
    let Some(participant) = holder else {
        debug!("nobody holds the buzzer; nothing to judge");
        return;
    };

    let (delta, excluded) = if correct {
        (1, None)
    } else {
        (-1, Some(participant))
    };
    ledger.pending_exclusion = excluded;

    info!(%participant, correct, delta, "answer judged");
    emit(
        ctx,
        GameEvent::JudgeResult {
            participant,
            delta,
            correct,
            excluded,
        },
        effects,
    );
    if !correct {
        emit(ctx, GameEvent::ResumeQuestion { excluded }, effects);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::{
        Input, apply,
        tests::{Table, published},
    };

    #[test]
    fn start_game_is_ignored_once_started() {
        let mut table = Table::new(1);
        table.host_command(Command::StartGame);
        let again = table.host_command(Command::StartGame);
        assert!(again.is_empty());
    }

    #[test]
    fn start_game_records_a_permutation_of_the_bank() {
        let mut table = Table::new(0);
        table.host_command(Command::StartGame);

        let ledger = table.host.host_ledger().unwrap();
        let mut order = ledger.order().to_vec();
        order.sort_unstable();
        assert_eq!(order, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn wrong_judgement_sets_the_pending_exclusion() {
        let mut table = Table::new(1);
        table.start_question();
        let wrong = table.followers[0].id();
        table.follower_command(0, Command::Buzz);

        table.host_command(Command::Judge { correct: false });

        assert_eq!(
            table.host.host_ledger().unwrap().pending_exclusion(),
            Some(wrong)
        );
    }

    #[test]
    fn correct_judgement_clears_an_earlier_pending_exclusion() {
        let mut table = Table::new(2);
        table.start_question();

        table.follower_command(0, Command::Buzz);
        table.host_command(Command::Judge { correct: false });
        table.follower_command(1, Command::Buzz);
        let effects = table.host_command(Command::Judge { correct: true });

        assert_eq!(table.host.host_ledger().unwrap().pending_exclusion(), None);
        let next = table.start_question();
        assert!(matches!(
            next,
            GameEvent::QuestionStarted { excluded: None, .. }
        ));
        assert!(
            published(&effects)
                .iter()
                .all(|event| !matches!(event, GameEvent::ResumeQuestion { .. }))
        );
        assert!(table.followers[0].buzzer_enabled());
    }

    #[test]
    fn question_sequence_increases_by_one() {
        let mut table = Table::new(0);
        for expected in 1..=3 {
            table.start_question();
            assert_eq!(table.host.round().sequence, expected);
        }
    }

    #[test]
    fn follower_buzz_is_a_request_only() {
        let mut table = Table::new(1);
        table.start_question();
        let effects = apply(&mut table.followers[0], Input::Command(Command::Buzz));

        assert_eq!(
            effects,
            vec![Effect::Publish(GameEvent::BuzzRequest {
                participant: table.followers[0].id()
            })]
        );
        assert_eq!(table.followers[0].round().holder(), None);
    }
}
