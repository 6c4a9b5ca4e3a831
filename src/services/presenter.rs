use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dto::{presentation::Notification, sse::ServerEvent},
    state::{SseHub, session::ParticipantId},
};

/// Sink for the state-change notifications of one participant.
pub trait Presenter: Send + Sync {
    /// Render `notification`.
    fn present(&self, notification: &Notification);
}

/// Forwards notifications to the participant's SSE streams, one named event
/// per notification kind.
pub struct SsePresenter {
    participant: ParticipantId,
    hub: Arc<SseHub>,
}

impl SsePresenter {
    /// Presenter writing to `hub` on behalf of `participant`.
    pub fn new(participant: ParticipantId, hub: Arc<SseHub>) -> Self {
        Self { participant, hub }
    }
}

impl Presenter for SsePresenter {
    fn present(&self, notification: &Notification) {
        match ServerEvent::json(notification.event_name().to_string(), notification) {
            Ok(event) => self.hub.broadcast(event),
            Err(err) => warn!(
                participant = %self.participant,
                event = notification.event_name(),
                error = %err,
                "failed to serialise notification"
            ),
        }
    }
}

/// Logs notifications; used for participants nobody is watching.
pub struct TracingPresenter {
    participant: ParticipantId,
}

impl TracingPresenter {
    /// Presenter logging on behalf of `participant`.
    pub fn new(participant: ParticipantId) -> Self {
        Self { participant }
    }
}

impl Presenter for TracingPresenter {
    fn present(&self, notification: &Notification) {
        debug!(participant = %self.participant, ?notification, "presentation update");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::presentation::Cue;

    #[test]
    fn sse_presenter_names_events_after_the_notification() {
        let hub = Arc::new(SseHub::new(4));
        let mut receiver = hub.subscribe();
        let presenter = SsePresenter::new(ParticipantId::new(), hub);

        presenter.present(&Notification::Cue { cue: Cue::Buzz });

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some("cue"));
        let data: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(data["type"], "cue");
        assert_eq!(data["cue"], "buzz");
    }
}
