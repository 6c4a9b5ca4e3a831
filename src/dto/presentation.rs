use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{presence::Participant, session::ParticipantId};

/// Audio feedback the presentation layer should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Someone won the buzz.
    Buzz,
    /// The answer was judged correct.
    Correct,
    /// The answer was judged wrong.
    Incorrect,
    /// A new question appeared.
    QuestionStart,
    /// The countdown ran out.
    Timeout,
}

/// Short message shown next to the buzzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// The local participant sits this question out.
    Excluded,
    /// The countdown ran out.
    TimeUp,
    /// Someone won the buzz.
    BuzzWinner {
        /// Display name of the winner.
        name: String,
    },
}

/// Screen shown by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Waiting room with the share link.
    Lobby,
    /// Question, buzzer and scores.
    Game,
}

/// State-change notifications consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Switch to another screen.
    View {
        /// Screen to show.
        view: View,
    },
    /// Display a new question and hide the previous answer.
    Question {
        /// Question sequence number.
        number: u32,
        /// Prompt text.
        text: String,
    },
    /// Display the answer of the current question.
    Answer {
        /// Answer text.
        answer: String,
    },
    /// Enable or disable the local buzzer.
    Buzzer {
        /// Whether pressing is allowed.
        enabled: bool,
    },
    /// Update the countdown; `None` hides it.
    Timer {
        /// Seconds left.
        remaining: Option<u32>,
        /// Render in the warning style.
        warning: bool,
    },
    /// Show a notice, or hide it with `None`.
    Notice {
        /// Notice to show.
        notice: Option<Notice>,
    },
    /// Re-render the roster and score bar.
    Roster {
        /// Participants ordered by slot then name.
        participants: Vec<Participant>,
        /// Current buzz holder, highlighted in the roster.
        #[schema(value_type = Option<String>)]
        active: Option<ParticipantId>,
    },
    /// Show or hide the host-only controls.
    HostControls {
        /// Whether the controls are shown.
        visible: bool,
    },
    /// Play an audio cue.
    Cue {
        /// Cue to play.
        cue: Cue,
    },
}

impl Notification {
    /// Event name used on the SSE stream.
    pub fn event_name(&self) -> &'static str {
        match self {
            Notification::View { .. } => "view",
            Notification::Question { .. } => "question",
            Notification::Answer { .. } => "answer",
            Notification::Buzzer { .. } => "buzzer",
            Notification::Timer { .. } => "timer",
            Notification::Notice { .. } => "notice",
            Notification::Roster { .. } => "roster",
            Notification::HostControls { .. } => "host_controls",
            Notification::Cue { .. } => "cue",
        }
    }
}
