//! Single task driving one participant's state machine.
//!
//! The task drains its inbox (local commands, countdown ticks, scheduled host
//! commands) and its room subscription, runs every input through
//! [`state_machine::apply`] to completion, then executes the effects in order.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, mpsc, oneshot},
    task::{JoinHandle, JoinSet},
    time::{Instant, interval_at, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    dao::usage_store::UsageStore,
    services::{
        presenter::Presenter,
        transport::{Inbound, RoomChannel, RoomSubscription},
    },
    state::{
        session::{ParticipantId, Role, RoomId},
        state_machine::{self, Effect, Input, ParticipantContext},
    },
};

/// Local countdown posting one [`Input::Tick`] per second; aborted on drop.
pub struct Countdown {
    sequence: u32,
    task: JoinHandle<()>,
}

impl Countdown {
    /// Start counting `seconds` down for question `sequence`.
    pub fn start(sequence: u32, seconds: u32, inbox: mpsc::Sender<Input>) -> Self {
        let task = tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + period, period);
            for remaining in (0..seconds).rev() {
                ticker.tick().await;
                if inbox
                    .send(Input::Tick {
                        sequence,
                        remaining,
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
        Self { sequence, task }
    }

    /// Question the countdown belongs to.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Collaborators a participant task talks to.
pub struct RuntimeDeps {
    /// Room the participant plays in.
    pub channel: Arc<dyn RoomChannel>,
    /// Where notifications are rendered.
    pub presenter: Arc<dyn Presenter>,
    /// Where the host persists question usage.
    pub usage_store: Arc<dyn UsageStore>,
}

/// Handle kept by the process to talk to a running participant.
pub struct ParticipantHandle {
    id: ParticipantId,
    room_id: RoomId,
    role: Role,
    inbox: mpsc::Sender<Input>,
    shutdown: Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
}

impl ParticipantHandle {
    /// Participant identity.
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Room the participant plays in.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Host or follower.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Queue `input` for the participant task; `false` once it stopped.
    pub async fn send(&self, input: Input) -> bool {
        self.inbox.send(input).await.is_ok()
    }

    /// Stop the task and wait until its presence was withdrawn.
    pub async fn shutdown(&self) {
        let Some((stop, task)) = self.shutdown.lock().await.take() else {
            return;
        };
        let _ = stop.send(());
        if let Err(err) = task.await {
            warn!(participant = %self.id, error = %err, "participant task ended abnormally");
        }
    }
}

/// Spawn the task of the participant described by `ctx`.
///
/// The room subscription is opened before returning so nothing published
/// after the join is missed.
pub fn spawn(ctx: ParticipantContext, deps: RuntimeDeps, inbox_capacity: usize) -> ParticipantHandle {
    let id = ctx.id();
    let room_id = ctx.session().room_id.clone();
    let role = ctx.session().role;

    let (inbox_tx, inbox_rx) = mpsc::channel(inbox_capacity.max(1));
    let (stop_tx, stop_rx) = oneshot::channel();
    let subscription = deps.channel.subscribe(id);

    let runtime = ParticipantRuntime {
        ctx,
        deps,
        inbox_tx: inbox_tx.clone(),
        countdown: None,
        scheduled: JoinSet::new(),
    };
    let task = tokio::spawn(runtime.run(inbox_rx, subscription, stop_rx));

    ParticipantHandle {
        id,
        room_id,
        role,
        inbox: inbox_tx,
        shutdown: Mutex::new(Some((stop_tx, task))),
    }
}

struct ParticipantRuntime {
    ctx: ParticipantContext,
    deps: RuntimeDeps,
    inbox_tx: mpsc::Sender<Input>,
    countdown: Option<Countdown>,
    scheduled: JoinSet<()>,
}

impl ParticipantRuntime {
    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Input>,
        mut subscription: RoomSubscription,
        mut stop: oneshot::Receiver<()>,
    ) {
        let id = self.ctx.id();
        info!(participant = %id, room = %self.ctx.session().room_id, role = ?self.ctx.session().role, "participant joined");

        let meta = self.ctx.announce();
        self.execute(vec![Effect::Announce(meta)]).await;
        self.handle(Input::Refresh).await;

        loop {
            tokio::select! {
                _ = &mut stop => break,
                Some(input) = inbox.recv() => self.handle(input).await,
                inbound = subscription.recv() => match inbound {
                    Some(Inbound::Event(event)) => self.handle(Input::Remote(event)).await,
                    Some(Inbound::Presence(snapshot)) => self.handle(Input::Presence(snapshot)).await,
                    None => {
                        warn!(participant = %id, "room channel closed");
                        break;
                    }
                },
            }
        }

        self.countdown = None;
        self.scheduled.abort_all();
        if let Err(err) = self.deps.channel.untrack(id).await {
            debug!(participant = %id, error = %err, "untrack after leave failed");
        }
        info!(participant = %id, "participant left");
    }

    async fn handle(&mut self, input: Input) {
        let effects = state_machine::apply(&mut self.ctx, input);
        self.execute(effects).await;
    }

    async fn execute(&mut self, effects: Vec<Effect>) {
        let id = self.ctx.id();
        for effect in effects {
            match effect {
                Effect::Publish(event) => {
                    if let Err(err) = self.deps.channel.publish(id, &event).await {
                        warn!(participant = %id, kind = event.kind(), error = %err, "failed to publish event");
                    }
                }
                Effect::Announce(meta) => {
                    if let Err(err) = self.deps.channel.track(meta).await {
                        warn!(participant = %id, error = %err, "failed to announce presence");
                    }
                }
                Effect::Present(notification) => self.deps.presenter.present(&notification),
                Effect::StartCountdown { sequence, seconds } => {
                    self.countdown = Some(Countdown::start(
                        sequence,
                        seconds,
                        self.inbox_tx.clone(),
                    ));
                }
                Effect::CancelCountdown => {
                    if let Some(countdown) = self.countdown.take() {
                        debug!(participant = %id, sequence = countdown.sequence(), "countdown cancelled");
                    }
                }
                Effect::Schedule { after, command } => {
                    while self.scheduled.try_join_next().is_some() {}
                    let inbox = self.inbox_tx.clone();
                    self.scheduled.spawn(async move {
                        sleep(after).await;
                        let _ = inbox.send(Input::Command(command)).await;
                    });
                }
                Effect::PersistUsage(history) => {
                    if let Err(err) = self.deps.usage_store.save(history).await {
                        warn!(error = %err, "failed to persist question usage");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        dao::usage_store::MemoryUsageStore,
        dto::presentation::{Cue, Notification},
        services::{presenter::TracingPresenter, transport::LocalRoomHub},
        state::{
            question::sample_bank,
            session::RoomSession,
            state_machine::{Command, Timings},
            usage::{UsageHistory, UsageTracker},
        },
    };

    #[derive(Default)]
    struct Recorder {
        seen: StdMutex<Vec<Notification>>,
    }

    impl Presenter for Recorder {
        fn present(&self, notification: &Notification) {
            self.seen.lock().unwrap().push(notification.clone());
        }
    }

    impl Recorder {
        fn has(&self, wanted: &Notification) -> bool {
            self.seen.lock().unwrap().iter().any(|n| n == wanted)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_every_second_until_zero() {
        let (tx, mut rx) = mpsc::channel(8);
        let _countdown = Countdown::start(3, 2, tx);

        let mut ticks = Vec::new();
        while let Some(Input::Tick { sequence, remaining }) = rx.recv().await {
            ticks.push((sequence, remaining));
        }
        assert_eq!(ticks, vec![(3, 1), (3, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_countdown_stops_ticking() {
        let (tx, mut rx) = mpsc::channel(8);
        let countdown = Countdown::start(1, 20, tx);
        drop(countdown);
        sleep(Duration::from_secs(5)).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn host_alone_runs_a_timed_out_question() {
        let hub = Arc::new(LocalRoomHub::new("SOLO01".parse().unwrap(), 32));
        let session = RoomSession {
            room_id: hub.room_id().clone(),
            participant_id: ParticipantId::new(),
            role: Role::Host,
            slot: 1,
            display_name: "Host".into(),
        };
        let tracker = Arc::new(UsageTracker::new(
            Arc::new(sample_bank(3)),
            UsageHistory::default(),
        ));
        let usage = MemoryUsageStore::default();
        let recorder = Arc::new(Recorder::default());
        let ctx = ParticipantContext::new(
            session,
            Timings::default(),
            tracker,
            StdRng::seed_from_u64(2),
        );

        let handle = spawn(
            ctx,
            RuntimeDeps {
                channel: hub.clone(),
                presenter: recorder.clone(),
                usage_store: Arc::new(usage.clone()),
            },
            16,
        );

        assert!(handle.send(Input::Command(Command::StartGame)).await);
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(usage.snapshot().len(), 1);
        assert!(recorder.has(&Notification::Cue {
            cue: Cue::QuestionStart
        }));

        sleep(Duration::from_secs(20)).await;
        assert!(recorder.has(&Notification::Cue { cue: Cue::Timeout }));
        assert!(recorder.has(&Notification::Buzzer { enabled: false }));

        sleep(Duration::from_secs(1)).await;
        assert!(
            recorder
                .seen
                .lock()
                .unwrap()
                .iter()
                .any(|n| matches!(n, Notification::Answer { .. }))
        );

        handle.shutdown().await;
        assert!(hub.is_empty());
        assert!(!handle.send(Input::Refresh).await);
    }

    #[tokio::test]
    async fn tracing_presenter_participant_leaves_cleanly() {
        let hub = Arc::new(LocalRoomHub::new("QUIET1".parse().unwrap(), 8));
        let session = RoomSession {
            room_id: hub.room_id().clone(),
            participant_id: ParticipantId::new(),
            role: Role::Follower,
            slot: 2,
            display_name: "Quiet".into(),
        };
        let id = session.participant_id;
        let tracker = Arc::new(UsageTracker::new(
            Arc::new(sample_bank(1)),
            UsageHistory::default(),
        ));
        let ctx = ParticipantContext::new(
            session,
            Timings::default(),
            tracker,
            StdRng::seed_from_u64(3),
        );

        let handle = spawn(
            ctx,
            RuntimeDeps {
                channel: hub.clone(),
                presenter: Arc::new(TracingPresenter::new(id)),
                usage_store: Arc::new(MemoryUsageStore::default()),
            },
            4,
        );
        tokio::task::yield_now().await;
        handle.shutdown().await;

        assert!(hub.is_empty());
        handle.shutdown().await;
    }
}
