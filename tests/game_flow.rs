use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use buzzer_quiz::{
    dao::usage_store::MemoryUsageStore,
    dto::{
        events::GameEvent,
        presentation::{Cue, Notice, Notification, View},
    },
    services::{
        participant_runtime::{self, ParticipantHandle, RuntimeDeps},
        presenter::Presenter,
        transport::{LocalRoomHub, RoomChannel},
    },
    state::{
        question::{Question, QuestionBank},
        session::{ParticipantId, Role, RoomId, RoomSession},
        state_machine::{Command, Input, ParticipantContext, Timings},
        usage::{UsageHistory, UsageTracker},
    },
};
use rand::{SeedableRng, rngs::StdRng};
use tokio::time::sleep;

#[derive(Default)]
struct Screen {
    seen: Mutex<Vec<Notification>>,
}

impl Presenter for Screen {
    fn present(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }
}

impl Screen {
    fn contains(&self, wanted: &Notification) -> bool {
        self.seen.lock().unwrap().iter().any(|n| n == wanted)
    }

    fn last_buzzer(&self) -> Option<bool> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|n| match n {
                Notification::Buzzer { enabled } => Some(*enabled),
                _ => None,
            })
    }

    fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }
}

struct Player {
    id: ParticipantId,
    handle: ParticipantHandle,
    screen: Arc<Screen>,
}

impl Player {
    async fn press(&self, command: Command) {
        assert!(self.handle.send(Input::Command(command)).await);
        settle().await;
    }
}

fn bank() -> QuestionBank {
    QuestionBank::new(vec![
        Question {
            id: 1,
            question: "Capital of Italy?".into(),
            answer: "Rome".into(),
        },
        Question {
            id: 2,
            question: "Smallest prime?".into(),
            answer: "2".into(),
        },
        Question {
            id: 3,
            question: "Author of Hamlet?".into(),
            answer: "Shakespeare".into(),
        },
    ])
    .unwrap()
}

fn join(
    hub: &Arc<LocalRoomHub>,
    tracker: &Arc<UsageTracker>,
    usage: &MemoryUsageStore,
    role: Role,
    slot: u32,
) -> Player {
    let session = RoomSession {
        room_id: hub.room_id().clone(),
        participant_id: ParticipantId::new(),
        role,
        slot,
        display_name: format!("Player {slot}"),
    };
    let id = session.participant_id;
    let screen = Arc::new(Screen::default());
    let ctx = ParticipantContext::new(
        session,
        Timings::default(),
        tracker.clone(),
        StdRng::seed_from_u64(u64::from(slot)),
    );
    let handle = participant_runtime::spawn(
        ctx,
        RuntimeDeps {
            channel: hub.clone(),
            presenter: screen.clone(),
            usage_store: Arc::new(usage.clone()),
        },
        32,
    );
    Player { id, handle, screen }
}

async fn settle() {
    sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn full_round_with_wrong_then_right_answer() {
    let room: RoomId = "GAME42".parse().unwrap();
    let hub = Arc::new(LocalRoomHub::new(room, 64));
    let tracker = Arc::new(UsageTracker::new(Arc::new(bank()), UsageHistory::default()));
    let usage = MemoryUsageStore::default();

    let host = join(&hub, &tracker, &usage, Role::Host, 1);
    let alice = join(&hub, &tracker, &usage, Role::Follower, 2);
    let bob = join(&hub, &tracker, &usage, Role::Follower, 3);
    settle().await;
    assert_eq!(hub.snapshot().len(), 3);

    host.press(Command::StartGame).await;
    for player in [&host, &alice, &bob] {
        assert!(player.screen.contains(&Notification::View { view: View::Game }));
    }

    sleep(Duration::from_secs(1)).await;
    assert_eq!(usage.snapshot().len(), 1);
    for player in [&host, &alice, &bob] {
        assert!(player.screen.contains(&Notification::Cue {
            cue: Cue::QuestionStart
        }));
        assert_eq!(player.screen.last_buzzer(), Some(true));
    }

    alice.press(Command::Buzz).await;
    assert!(bob.screen.contains(&Notification::Notice {
        notice: Some(Notice::BuzzWinner {
            name: "Player 2".into()
        })
    }));
    assert_eq!(bob.screen.last_buzzer(), Some(false));

    host.press(Command::Judge { correct: false }).await;
    assert_eq!(hub.snapshot()[&alice.id][0].score, -1);
    assert_eq!(alice.screen.last_buzzer(), Some(false));
    assert_eq!(bob.screen.last_buzzer(), Some(true));
    assert!(bob.screen.contains(&Notification::Cue { cue: Cue::Incorrect }));

    bob.press(Command::Buzz).await;
    host.press(Command::Judge { correct: true }).await;
    assert_eq!(hub.snapshot()[&bob.id][0].score, 1);
    assert!(alice.screen.contains(&Notification::Cue { cue: Cue::Correct }));

    // A correct answer wipes the earlier exclusion.
    alice.screen.clear();
    host.press(Command::StartQuestion).await;
    assert!(!alice.screen.contains(&Notification::Notice {
        notice: Some(Notice::Excluded)
    }));
    assert_eq!(alice.screen.last_buzzer(), Some(true));

    alice.press(Command::Buzz).await;
    host.press(Command::Judge { correct: false }).await;
    assert_eq!(hub.snapshot()[&alice.id][0].score, -2);

    alice.screen.clear();
    host.press(Command::StartQuestion).await;
    assert!(alice.screen.contains(&Notification::Notice {
        notice: Some(Notice::Excluded)
    }));
    assert_eq!(alice.screen.last_buzzer(), Some(false));
    assert_eq!(bob.screen.last_buzzer(), Some(true));

    // Excluded players cannot steal the buzz.
    host.screen.clear();
    alice.press(Command::Buzz).await;
    assert!(!host.screen.contains(&Notification::Cue { cue: Cue::Buzz }));
    bob.press(Command::Buzz).await;
    assert!(host.screen.contains(&Notification::Notice {
        notice: Some(Notice::BuzzWinner {
            name: "Player 3".into()
        })
    }));

    for player in [&host, &alice, &bob] {
        player.handle.shutdown().await;
    }
    assert!(hub.is_empty());
}

#[tokio::test(start_paused = true)]
async fn unanswered_question_times_out_and_host_reveals() {
    let hub = Arc::new(LocalRoomHub::new("TIME01".parse().unwrap(), 64));
    let tracker = Arc::new(UsageTracker::new(Arc::new(bank()), UsageHistory::default()));
    let usage = MemoryUsageStore::default();

    let host = join(&hub, &tracker, &usage, Role::Host, 1);
    let follower = join(&hub, &tracker, &usage, Role::Follower, 2);
    settle().await;

    host.press(Command::StartQuestion).await;
    assert!(follower.screen.contains(&Notification::View { view: View::Game }));

    sleep(Duration::from_secs(15)).await;
    assert!(follower.screen.contains(&Notification::Timer {
        remaining: Some(5),
        warning: true,
    }));

    sleep(Duration::from_secs(5)).await;
    assert!(follower.screen.contains(&Notification::Notice {
        notice: Some(Notice::TimeUp)
    }));
    assert_eq!(follower.screen.last_buzzer(), Some(false));

    sleep(Duration::from_millis(1100)).await;
    let answer = follower.screen.seen.lock().unwrap().iter().find_map(|n| match n {
        Notification::Answer { answer } => Some(answer.clone()),
        _ => None,
    });
    assert!(answer.is_some());

    follower.press(Command::Buzz).await;
    assert!(!host.screen.contains(&Notification::Cue { cue: Cue::Buzz }));
}

#[tokio::test]
async fn wire_events_reach_runtimes_from_foreign_publishers() {
    let hub = Arc::new(LocalRoomHub::new("WIRE01".parse().unwrap(), 16));
    let tracker = Arc::new(UsageTracker::new(Arc::new(bank()), UsageHistory::default()));
    let usage = MemoryUsageStore::default();
    let follower = join(&hub, &tracker, &usage, Role::Follower, 2);
    tokio::task::yield_now().await;

    hub.publish(
        ParticipantId::new(),
        &GameEvent::AnswerRevealed {
            answer: "Rome".into(),
        },
    )
    .await
    .unwrap();

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    sleep(Duration::from_millis(20)).await;
    assert!(follower.screen.contains(&Notification::Answer {
        answer: "Rome".into()
    }));
}
