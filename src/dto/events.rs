use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::{question::QuestionId, session::ParticipantId};

/// Application-level events broadcast on a room channel.
///
/// Every participant, the sender included, applies the same handler for each
/// variant; the channel itself never echoes an event back to its sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// The host left the lobby; `order` is the shuffled bank order.
    GameStarted { order: Vec<QuestionId> },
    /// A new question is live. The answer travels with it so it can be shown
    /// on reveal without being sent again.
    QuestionStarted {
        sequence: u32,
        question_id: QuestionId,
        text: String,
        answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[schema(value_type = Option<String>)]
        excluded: Option<ParticipantId>,
    },
    /// A participant pressed its buzzer. Only the host acts on it.
    BuzzRequest {
        #[schema(value_type = String)]
        participant: ParticipantId,
    },
    /// The host granted the buzz lock to `participant`.
    BuzzWinner {
        #[schema(value_type = String)]
        participant: ParticipantId,
    },
    /// The answer of the current question is shown.
    AnswerRevealed { answer: String },
    /// The host judged the buzzing participant's answer.
    JudgeResult {
        #[schema(value_type = String)]
        participant: ParticipantId,
        delta: i32,
        correct: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[schema(value_type = Option<String>)]
        excluded: Option<ParticipantId>,
    },
    /// The buzzer reopens after a wrong answer, except for `excluded`.
    ResumeQuestion {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[schema(value_type = Option<String>)]
        excluded: Option<ParticipantId>,
    },
}

impl GameEvent {
    /// Decode an event from its JSON wire form.
    pub fn from_json_str(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Encode the event into its JSON wire form.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::GameStarted { .. } => "game_started",
            GameEvent::QuestionStarted { .. } => "question_started",
            GameEvent::BuzzRequest { .. } => "buzz_request",
            GameEvent::BuzzWinner { .. } => "buzz_winner",
            GameEvent::AnswerRevealed { .. } => "answer_revealed",
            GameEvent::JudgeResult { .. } => "judge_result",
            GameEvent::ResumeQuestion { .. } => "resume_question",
        }
    }
}
