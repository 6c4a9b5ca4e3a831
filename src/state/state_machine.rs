//! Event-driven game state machine run by every participant.
//!
//! The host is the only participant allowed to advance the game, but it does
//! so by emitting events that every participant (the host included) applies
//! with the same handlers below. Handlers never perform I/O themselves: they
//! mutate the participant's [`ParticipantContext`] and return [`Effect`]s for
//! the runtime to carry out.

use std::{sync::Arc, time::Duration};

use rand::rngs::StdRng;
use tracing::debug;

use crate::{
    dto::{
        events::GameEvent,
        presence::{MembershipSnapshot, PresenceMeta},
        presentation::{Cue, Notice, Notification, View},
    },
    state::{
        host::{self, HostLedger},
        presence::PresenceRegistry,
        question::QuestionId,
        round::{BuzzLock, CurrentQuestion, RoundState},
        session::{ParticipantId, RoomSession},
        usage::{UsageHistory, UsageTracker},
    },
};

/// Timing constants of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Length of the per-question countdown, in seconds.
    pub countdown_secs: u32,
    /// Remaining seconds from which the timer is displayed as a warning.
    pub warning_secs: u32,
    /// Delay between the game start and the first question.
    pub first_question_delay: Duration,
    /// Delay between a timeout and the automatic reveal on the host.
    pub reveal_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            countdown_secs: 20,
            warning_secs: 5,
            first_question_delay: Duration::from_secs(1),
            reveal_delay: Duration::from_secs(1),
        }
    }
}

/// Local actions triggered by the participant's own UI or by its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Press the buzzer. The only command a follower can issue.
    Buzz,
    /// Leave the lobby and start the game.
    StartGame,
    /// Put the next question in play.
    StartQuestion,
    /// Show the answer of the current question.
    RevealAnswer,
    /// Reveal scheduled by a timeout; ignored if question `sequence` is no
    /// longer the current one.
    RevealAfterTimeout {
        /// Question the timeout belonged to.
        sequence: u32,
    },
    /// Judge the answer of the participant holding the buzzer.
    Judge {
        /// Whether the answer was right.
        correct: bool,
    },
}

/// Everything that can drive a participant's state machine.
#[derive(Debug, Clone)]
pub enum Input {
    /// Event received from the room channel.
    Remote(GameEvent),
    /// Membership changed on the room presence.
    Presence(MembershipSnapshot),
    /// Local command.
    Command(Command),
    /// A presentation stream attached; re-render everything.
    Refresh,
    /// One second elapsed on the countdown of question `sequence`.
    Tick {
        /// Question the countdown was started for.
        sequence: u32,
        /// Seconds left after this tick.
        remaining: u32,
    },
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send the event to the other participants of the room.
    Publish(GameEvent),
    /// Re-announce the local presence metadata.
    Announce(PresenceMeta),
    /// Forward a notification to the presentation layer.
    Present(Notification),
    /// Start (or restart) the local countdown for question `sequence`.
    StartCountdown {
        /// Question the countdown belongs to.
        sequence: u32,
        /// Length of the countdown.
        seconds: u32,
    },
    /// Stop the local countdown, if any.
    CancelCountdown,
    /// Feed `command` back into the state machine after `after`.
    Schedule {
        /// Delay before the command fires.
        after: Duration,
        /// Command to run.
        command: Command,
    },
    /// Persist the question usage history.
    PersistUsage(UsageHistory),
}

/// State owned by one participant process.
#[derive(Debug)]
pub struct ParticipantContext {
    session: RoomSession,
    timings: Timings,
    view: View,
    score: i32,
    revision: u64,
    round: RoundState,
    presence: PresenceRegistry,
    host: Option<HostLedger>,
}

impl ParticipantContext {
    /// Build the context of a freshly joined participant.
    ///
    /// Host sessions get a ledger drawing questions from `tracker`; followers
    /// never touch it.
    pub fn new(
        session: RoomSession,
        timings: Timings,
        tracker: Arc<UsageTracker>,
        rng: StdRng,
    ) -> Self {
        let host = session.is_host().then(|| HostLedger::new(tracker, rng));
        Self {
            session,
            timings,
            view: View::Lobby,
            score: 0,
            revision: 0,
            round: RoundState::default(),
            presence: PresenceRegistry::default(),
            host,
        }
    }

    /// Local session.
    pub fn session(&self) -> &RoomSession {
        &self.session
    }

    /// Local identity.
    pub fn id(&self) -> ParticipantId {
        self.session.participant_id
    }

    /// Whether the local participant is the host.
    pub fn is_host(&self) -> bool {
        self.host.is_some()
    }

    /// Screen currently shown.
    pub fn view(&self) -> View {
        self.view
    }

    /// Own score, as last written by this process.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Mirror of the round state.
    pub fn round(&self) -> &RoundState {
        &self.round
    }

    /// Live roster.
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Timing constants.
    pub fn timings(&self) -> Timings {
        self.timings
    }

    /// Whether the local buzzer is enabled.
    pub fn buzzer_enabled(&self) -> bool {
        self.round.can_buzz(&self.id())
    }

    /// Produce the next presence announcement for the local participant.
    pub fn announce(&mut self) -> PresenceMeta {
        self.revision += 1;
        PresenceMeta::announce(&self.session, self.score, self.revision)
    }

    pub(crate) fn host_ledger(&mut self) -> Option<&mut HostLedger> {
        self.host.as_mut()
    }

    pub(crate) fn show_view(&mut self, view: View, effects: &mut Vec<Effect>) {
        self.view = view;
        effects.push(Effect::Present(Notification::View { view }));
    }

    fn roster_notification(&self) -> Notification {
        Notification::Roster {
            participants: self.presence.roster(),
            active: self.round.holder(),
        }
    }

    fn display_name(&self, id: &ParticipantId) -> String {
        self.presence
            .get(id)
            .map(|participant| participant.display_name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Run one input through the state machine and collect the resulting effects.
pub fn apply(ctx: &mut ParticipantContext, input: Input) -> Vec<Effect> {
    let mut effects = Vec::new();
    match input {
        Input::Remote(event) => apply_event(ctx, event, &mut effects),
        Input::Presence(snapshot) => on_membership(ctx, &snapshot, &mut effects),
        Input::Command(command) => host::run_command(ctx, command, &mut effects),
        Input::Refresh => on_refresh(ctx, &mut effects),
        Input::Tick {
            sequence,
            remaining,
        } => on_tick(ctx, sequence, remaining, &mut effects),
    }
    effects
}

/// Publish `event` and apply it locally, since the channel never delivers an
/// event back to its sender.
pub(crate) fn emit(ctx: &mut ParticipantContext, event: GameEvent, effects: &mut Vec<Effect>) {
    effects.push(Effect::Publish(event.clone()));
    apply_event(ctx, event, effects);
}

fn apply_event(ctx: &mut ParticipantContext, event: GameEvent, effects: &mut Vec<Effect>) {
    debug!(participant = %ctx.id(), kind = event.kind(), "applying game event");
    match event {
        GameEvent::GameStarted { .. } => on_game_started(ctx, effects),
        GameEvent::QuestionStarted {
            sequence,
            question_id,
            text,
            answer,
            excluded,
        } => on_question_started(ctx, sequence, question_id, text, answer, excluded, effects),
        GameEvent::BuzzRequest { participant } => on_buzz_request(ctx, participant, effects),
        GameEvent::BuzzWinner { participant } => on_buzz_winner(ctx, participant, effects),
        GameEvent::AnswerRevealed { answer } => on_answer_revealed(answer, effects),
        GameEvent::JudgeResult {
            participant,
            delta,
            correct,
            ..
        } => on_judge_result(ctx, participant, delta, correct, effects),
        GameEvent::ResumeQuestion { excluded } => on_resume_question(ctx, excluded, effects),
    }
}

fn on_game_started(ctx: &mut ParticipantContext, effects: &mut Vec<Effect>) {
    ctx.show_view(View::Game, effects);
}

fn on_question_started(
    ctx: &mut ParticipantContext,
    sequence: u32,
    question_id: QuestionId,
    text: String,
    answer: String,
    excluded: Option<ParticipantId>,
    effects: &mut Vec<Effect>,
) {
    effects.push(Effect::CancelCountdown);

    if ctx.view != View::Game {
        ctx.show_view(View::Game, effects);
    }

    let seconds = ctx.timings.countdown_secs;
    ctx.round.begin(
        sequence,
        CurrentQuestion {
            id: question_id,
            text: text.clone(),
            answer,
        },
        excluded,
        seconds,
    );

    effects.push(Effect::Present(Notification::Question {
        number: sequence,
        text,
    }));

    let me = ctx.id();
    let notice = (excluded == Some(me)).then_some(Notice::Excluded);
    effects.push(Effect::Present(Notification::Notice { notice }));
    effects.push(Effect::Present(Notification::Buzzer {
        enabled: ctx.buzzer_enabled(),
    }));
    effects.push(Effect::Present(ctx.roster_notification()));
    effects.push(Effect::Present(Notification::Timer {
        remaining: Some(seconds),
        warning: seconds <= ctx.timings.warning_secs,
    }));
    effects.push(Effect::Present(Notification::Cue {
        cue: Cue::QuestionStart,
    }));
    effects.push(Effect::StartCountdown { sequence, seconds });
}

fn on_buzz_request(
    ctx: &mut ParticipantContext,
    participant: ParticipantId,
    effects: &mut Vec<Effect>,
) {
    if !ctx.is_host() {
        return;
    }

    if !ctx.round.can_buzz(&participant) {
        debug!(%participant, "buzz request ignored; buzzer not available");
        return;
    }

    ctx.round.buzz_lock = BuzzLock::Held(participant);
    emit(ctx, GameEvent::BuzzWinner { participant }, effects);
}

fn on_buzz_winner(
    ctx: &mut ParticipantContext,
    participant: ParticipantId,
    effects: &mut Vec<Effect>,
) {
    effects.push(Effect::CancelCountdown);
    ctx.round.time_remaining = None;
    ctx.round.buzz_lock = BuzzLock::Held(participant);

    let name = ctx.display_name(&participant);
    effects.push(Effect::Present(Notification::Timer {
        remaining: None,
        warning: false,
    }));
    effects.push(Effect::Present(Notification::Buzzer { enabled: false }));
    effects.push(Effect::Present(Notification::Cue { cue: Cue::Buzz }));
    effects.push(Effect::Present(Notification::Notice {
        notice: Some(Notice::BuzzWinner { name }),
    }));
    effects.push(Effect::Present(ctx.roster_notification()));
}

fn on_answer_revealed(answer: String, effects: &mut Vec<Effect>) {
    effects.push(Effect::Present(Notification::Answer { answer }));
}

fn on_judge_result(
    ctx: &mut ParticipantContext,
    participant: ParticipantId,
    delta: i32,
    correct: bool,
    effects: &mut Vec<Effect>,
) {
    ctx.round.buzz_lock = BuzzLock::Free;
    if correct {
        ctx.round.buzz_closed = true;
    } else {
        ctx.round.resumed_without = Some(participant);
    }

    let cue = if correct { Cue::Correct } else { Cue::Incorrect };
    effects.push(Effect::Present(Notification::Cue { cue }));

    if participant == ctx.id() {
        ctx.score += delta;
        let me = ctx.id();
        let score = ctx.score;
        ctx.presence.record_score(&me, score);
        let meta = ctx.announce();
        effects.push(Effect::Announce(meta));
        effects.push(Effect::Present(ctx.roster_notification()));
    }
}

fn on_resume_question(
    ctx: &mut ParticipantContext,
    excluded: Option<ParticipantId>,
    effects: &mut Vec<Effect>,
) {
    ctx.round.buzz_lock = BuzzLock::Free;
    ctx.round.buzz_closed = false;
    ctx.round.resumed_without = excluded;

    effects.push(Effect::Present(Notification::Notice { notice: None }));
    effects.push(Effect::Present(ctx.roster_notification()));
    effects.push(Effect::Present(Notification::Buzzer {
        enabled: ctx.buzzer_enabled(),
    }));
}

fn on_membership(
    ctx: &mut ParticipantContext,
    snapshot: &MembershipSnapshot,
    effects: &mut Vec<Effect>,
) {
    let participants = ctx.presence.apply_membership_snapshot(snapshot);
    effects.push(Effect::Present(Notification::Roster {
        participants,
        active: ctx.round.holder(),
    }));
    effects.push(Effect::Present(Notification::HostControls {
        visible: ctx.session.is_host(),
    }));
}

fn on_refresh(ctx: &ParticipantContext, effects: &mut Vec<Effect>) {
    effects.push(Effect::Present(Notification::View { view: ctx.view }));
    effects.push(Effect::Present(Notification::HostControls {
        visible: ctx.session.is_host(),
    }));
    effects.push(Effect::Present(ctx.roster_notification()));

    let Some(question) = &ctx.round.current_question else {
        return;
    };
    effects.push(Effect::Present(Notification::Question {
        number: ctx.round.sequence,
        text: question.text.clone(),
    }));
    effects.push(Effect::Present(Notification::Timer {
        remaining: ctx.round.time_remaining,
        warning: ctx
            .round
            .time_remaining
            .is_some_and(|remaining| remaining <= ctx.timings.warning_secs),
    }));
    effects.push(Effect::Present(Notification::Buzzer {
        enabled: ctx.buzzer_enabled(),
    }));
}

fn on_tick(ctx: &mut ParticipantContext, sequence: u32, remaining: u32, effects: &mut Vec<Effect>) {
    if sequence != ctx.round.sequence
        || ctx.round.time_remaining.is_none()
        || !ctx.round.is_active()
    {
        debug!(sequence, remaining, "dropping stale countdown tick");
        return;
    }

    if remaining > 0 {
        ctx.round.time_remaining = Some(remaining);
        effects.push(Effect::Present(Notification::Timer {
            remaining: Some(remaining),
            warning: remaining <= ctx.timings.warning_secs,
        }));
        return;
    }

    ctx.round.time_remaining = None;
    ctx.round.buzz_closed = true;
    effects.push(Effect::Present(Notification::Timer {
        remaining: None,
        warning: false,
    }));
    effects.push(Effect::Present(Notification::Buzzer { enabled: false }));
    effects.push(Effect::Present(Notification::Notice {
        notice: Some(Notice::TimeUp),
    }));
    effects.push(Effect::Present(Notification::Cue { cue: Cue::Timeout }));

    if ctx.is_host() {
        effects.push(Effect::Schedule {
            after: ctx.timings.reveal_delay,
            command: Command::RevealAfterTimeout { sequence },
        });
    }
}
