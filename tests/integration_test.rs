use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use mystery_room::auth::AdminAuth;
use mystery_room::config::GameConfig;
use mystery_room::lock::{DeviceFlags, KeyCombo, LockPolicy, ViolationKind};
use mystery_room::progress::RedirectReason;
use mystery_room::protocol::{ClientMessage, ServerMessage};
use mystery_room::puzzles::{Answer, AnswerKey, BriefingBody};
use mystery_room::state::AppState;
use mystery_room::store::MemoryStore;
use mystery_room::types::{now_ms, PuzzleId, Screen};
use mystery_room::ws::handlers::{handle_message, welcome};
use mystery_room::ws::session::{Outbound, Session};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(GameConfig {
        lock: LockPolicy {
            admin_pin: Some("4821".to_string()),
            ..LockPolicy::default()
        },
        ..GameConfig::default()
    }))
}

/// Messages to send right away
fn now(out: &[Outbound]) -> Vec<ServerMessage> {
    out.iter()
        .filter_map(|o| match o {
            Outbound::Now(msg) => Some(msg.clone()),
            Outbound::After(..) => None,
        })
        .collect()
}

async fn send(msg: ClientMessage, session: &mut Session, state: &Arc<AppState>) -> Vec<ServerMessage> {
    now(&handle_message(msg, session, state).await)
}

async fn submit(answer: Answer, session: &mut Session, state: &Arc<AppState>) -> Vec<ServerMessage> {
    send(ClientMessage::Submit { answer }, session, state).await
}

async fn enter_identity(session: &mut Session, state: &Arc<AppState>) -> Vec<ServerMessage> {
    send(
        ClientMessage::EnterIdentity {
            player_name: "Ada".to_string(),
            team_id: "red".to_string(),
        },
        session,
        state,
    )
    .await
}

fn accepted(replies: &[ServerMessage]) -> bool {
    replies
        .iter()
        .any(|m| matches!(m, ServerMessage::Accepted { .. }))
}

fn has_locked(replies: &[ServerMessage]) -> bool {
    replies.iter().any(|m| matches!(m, ServerMessage::Locked { .. }))
}

/// Correct answers for the whole case, including stage gates
fn solution(key: &AnswerKey) -> Vec<Answer> {
    let mut placements = BTreeMap::new();
    for suspect in &key.alibis {
        placements.insert(suspect.id.clone(), suspect.timeslot.clone());
    }
    let mut script = vec![
        Answer::Weapon {
            word: "dagger".to_string(),
        },
        Answer::Timeline {
            order: key.timeline.iter().map(|e| e.id.clone()).collect(),
        },
    ];
    for suspect in &key.alibis {
        script.push(Answer::AlibiRiddle {
            suspect: suspect.id.clone(),
            answer: suspect.riddle_answer.to_lowercase(),
        });
    }
    script.extend([
        Answer::Alibis { placements },
        Answer::Deduction {
            suspect: key.killer.clone(),
            weapon: key.weapon_name.clone(),
        },
        Answer::Contradictions {
            selected: key
                .contradictions
                .iter()
                .filter(|c| c.correct)
                .map(|c| c.id.clone())
                .collect(),
        },
        Answer::Query {
            text: "SELECT * FROM ledger WHERE amount > 10000".to_string(),
        },
        Answer::CipherMessage {
            text: key.cipher_plaintext.clone(),
        },
        Answer::ClueDump {
            text: key.clue_keywords.join(" "),
        },
        Answer::Inspection {
            found: key.hidden_clues.clone(),
        },
        Answer::FinalMessage {
            text: key.final_plaintext.clone(),
        },
        Answer::Accusation {
            text: key.final_plaintext.clone(),
        },
    ]);
    script
}

/// End-to-end: a complete play-through locks the device, the keyword unlocks it
#[tokio::test]
async fn test_full_play_through() {
    let state = test_state();
    let mut session = Session::new(&state, "tablet-1");

    let hello = now(&welcome(&session).await);
    assert!(matches!(
        hello[0],
        ServerMessage::Welcome { locked: false, .. }
    ));

    // 1. Identity goes straight to puzzle 1
    let replies = enter_identity(&mut session, &state).await;
    assert!(replies.contains(&ServerMessage::Screen {
        screen: Screen::Puzzle(PuzzleId::FIRST)
    }));
    match &replies[1] {
        ServerMessage::Puzzle { briefing } => {
            assert!(matches!(briefing.body, BriefingBody::Weapon { .. }));
        }
        other => panic!("Expected puzzle briefing, got {:?}", other),
    }

    // 2. A wrong arrangement is rejected and changes nothing
    let replies = submit(
        Answer::Weapon {
            word: "GADGER".to_string(),
        },
        &mut session,
        &state,
    )
    .await;
    assert!(matches!(replies[0], ServerMessage::Rejected { .. }));
    assert_eq!(session.record.as_ref().unwrap().solved_count(), 0);

    // 3. Play the whole case
    let key = AnswerKey::default();
    let mut solves = 0;
    for answer in solution(&key) {
        let replies = submit(answer.clone(), &mut session, &state).await;
        if accepted(&replies) {
            solves += 1;
        } else {
            assert!(
                matches!(replies[0], ServerMessage::StageCleared { .. }),
                "{:?} gave {:?}",
                answer,
                replies
            );
        }
    }
    assert_eq!(solves, 9);

    let record = session.record.clone().unwrap();
    assert!(record.is_complete());
    assert_eq!(record.weapon, "Dagger");
    assert_eq!(record.killer, key.killer);
    assert!(record.completion_time.is_some());

    // 4. The device is now locked; results stay visible for the finisher
    assert!(session.guard.is_locked().await);
    let replies = send(
        ClientMessage::Navigate {
            screen: Screen::Results,
        },
        &mut session,
        &state,
    )
    .await;
    assert!(matches!(replies[1], ServerMessage::Results { .. }));

    // 5. A new session on the same device is refused
    let mut next = Session::new(&state, "tablet-1");
    let hello = now(&welcome(&next).await);
    assert!(matches!(hello[0], ServerMessage::Welcome { locked: true, .. }));
    assert!(has_locked(&enter_identity(&mut next, &state).await));

    // 6. Typing the keyword on the lock screen unlocks it
    let mut last = vec![];
    for key in ["u", "n", "l", "Shift", "o", "c", "k", "2", "0", "2", "4"] {
        last = send(
            ClientMessage::KeyPress {
                key: KeyCombo::plain(key),
            },
            &mut next,
            &state,
        )
        .await;
    }
    assert_eq!(last, vec![ServerMessage::Unlocked]);
    assert!(!next.guard.is_locked().await);

    // Progress survives the unlock; continuing lands on results
    let replies = enter_identity(&mut next, &state).await;
    assert!(matches!(replies[1], ServerMessage::Results { .. }));

    // 7. Leaderboard shows the finisher
    let replies = send(
        ClientMessage::RequestLeaderboard { limit: Some(3) },
        &mut next,
        &state,
    )
    .await;
    match &replies[0] {
        ServerMessage::Leaderboard { entries } => {
            assert_eq!(entries.len(), 1);
            assert!(entries[0].is_complete);
        }
        other => panic!("Expected leaderboard, got {:?}", other),
    }
}

/// Default timing: solving puzzle 3 stamps the elapsed time on the record
#[tokio::test]
async fn test_puzzle_three_stamps_completion_time() {
    let state = test_state();
    let mut session = Session::new(&state, "tablet-3");
    enter_identity(&mut session, &state).await;
    let start_time = session.record.as_ref().unwrap().start_time;

    let key = AnswerKey::default();
    let script = solution(&key);
    // Weapon, timeline, three riddles, then the alibi grid
    let (up_to_two, alibis) = script[..6].split_at(5);
    for answer in up_to_two {
        submit(answer.clone(), &mut session, &state).await;
    }
    let record = session.record.clone().unwrap();
    assert_eq!(record.solved_count(), 2);
    assert_eq!(record.completion_time, None);

    let before = now_ms();
    let replies = submit(alibis[0].clone(), &mut session, &state).await;
    let after = now_ms();
    assert!(accepted(&replies));

    let stored = state
        .load(&session.identity().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.solved_count(), 3);
    let elapsed = stored.completion_time.expect("puzzle 3 stamps completion time");
    assert!(elapsed >= before - start_time && elapsed <= after - start_time);
    assert_eq!(session.record.as_ref().unwrap().completion_time, Some(elapsed));
}

#[tokio::test]
async fn test_navigation_without_identity() {
    let state = test_state();
    let mut session = Session::new(&state, "tablet-1");

    let replies = send(
        ClientMessage::Navigate {
            screen: Screen::Puzzle(PuzzleId::of(4)),
        },
        &mut session,
        &state,
    )
    .await;
    assert_eq!(
        replies[0],
        ServerMessage::Redirect {
            to: Screen::Identity,
            reason: RedirectReason::MissingIdentity
        }
    );

    let replies = send(
        ClientMessage::EnterIdentity {
            player_name: "   ".to_string(),
            team_id: "red".to_string(),
        },
        &mut session,
        &state,
    )
    .await;
    match &replies[0] {
        ServerMessage::Error { code, .. } => assert_eq!(code, "MISSING_IDENTITY"),
        other => panic!("Expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_out_of_order_navigation_redirects() {
    let state = test_state();
    let mut session = Session::new(&state, "tablet-1");
    enter_identity(&mut session, &state).await;
    submit(
        Answer::Weapon {
            word: "DAGGER".to_string(),
        },
        &mut session,
        &state,
    )
    .await;

    let replies = send(
        ClientMessage::Navigate {
            screen: Screen::Puzzle(PuzzleId::of(6)),
        },
        &mut session,
        &state,
    )
    .await;
    assert_eq!(
        replies[0],
        ServerMessage::Redirect {
            to: Screen::Puzzle(PuzzleId::of(2)),
            reason: RedirectReason::PrerequisiteIncomplete
        }
    );

    // Submitting ahead is redirected the same way and saves nothing
    let replies = submit(
        Answer::Query {
            text: "amount > 10000".to_string(),
        },
        &mut session,
        &state,
    )
    .await;
    assert!(matches!(
        replies[0],
        ServerMessage::Redirect {
            reason: RedirectReason::PrerequisiteIncomplete,
            ..
        }
    ));
    assert_eq!(session.record.as_ref().unwrap().solved_count(), 1);

    // Going back to a solved puzzle skips forward
    let replies = send(
        ClientMessage::Navigate {
            screen: Screen::Puzzle(PuzzleId::FIRST),
        },
        &mut session,
        &state,
    )
    .await;
    assert_eq!(
        replies[0],
        ServerMessage::Redirect {
            to: Screen::Puzzle(PuzzleId::of(2)),
            reason: RedirectReason::AlreadySolved
        }
    );
}

#[tokio::test]
async fn test_two_strikes_lock_the_device() {
    let state = test_state();
    let mut session = Session::new(&state, "tablet-1");
    enter_identity(&mut session, &state).await;
    assert!(send(ClientMessage::StartGame, &mut session, &state)
        .await
        .is_empty());

    // First strike: warning plus a deferred fullscreen restore
    let out = handle_message(
        ClientMessage::Violation {
            kind: ViolationKind::FullscreenExit,
        },
        &mut session,
        &state,
    )
    .await;
    assert!(matches!(
        now(&out)[0],
        ServerMessage::LockWarning {
            violation: ViolationKind::FullscreenExit,
            ..
        }
    ));
    assert!(out.contains(&Outbound::After(
        Duration::from_millis(1000),
        ServerMessage::RestoreFullscreen
    )));
    assert!(!session.guard.is_locked().await);

    // Second strike of another kind locks and schedules the redirect
    let out = handle_message(
        ClientMessage::Violation {
            kind: ViolationKind::VisibilityLost,
        },
        &mut session,
        &state,
    )
    .await;
    assert!(has_locked(&now(&out)));
    assert!(out.contains(&Outbound::After(
        Duration::from_millis(3000),
        ServerMessage::Redirect {
            to: Screen::Identity,
            reason: RedirectReason::DeviceLocked
        }
    )));
    assert!(session.guard.is_locked().await);
    assert!(session.record.is_none());
    assert!(session.guard.remembered_identity().await.is_none());

    // Further events are ignored, answers are refused
    assert!(send(
        ClientMessage::Violation {
            kind: ViolationKind::VisibilityLost
        },
        &mut session,
        &state
    )
    .await
    .is_empty());
    let replies = submit(
        Answer::Weapon {
            word: "DAGGER".to_string(),
        },
        &mut session,
        &state,
    )
    .await;
    assert!(has_locked(&replies));
}

#[tokio::test]
async fn test_admin_pin_unlock() {
    let state = test_state();
    let mut session = Session::new(&state, "tablet-1");
    session.guard.mark_completed().await.unwrap();

    let replies = send(
        ClientMessage::AdminUnlock {
            pin: "1111".to_string(),
        },
        &mut session,
        &state,
    )
    .await;
    assert!(matches!(replies[0], ServerMessage::Error { .. }));
    assert!(session.guard.is_locked().await);

    let replies = send(
        ClientMessage::AdminUnlock {
            pin: "4821".to_string(),
        },
        &mut session,
        &state,
    )
    .await;
    assert_eq!(replies, vec![ServerMessage::Unlocked]);
    assert!(!session.guard.is_locked().await);
}

#[tokio::test]
async fn test_play_again_resets_progress() {
    let state = test_state();
    let mut session = Session::new(&state, "tablet-1");
    enter_identity(&mut session, &state).await;
    submit(
        Answer::Weapon {
            word: "DAGGER".to_string(),
        },
        &mut session,
        &state,
    )
    .await;

    let replies = send(ClientMessage::Reset, &mut session, &state).await;
    assert_eq!(
        replies,
        vec![ServerMessage::Screen {
            screen: Screen::Identity
        }]
    );
    assert!(session.record.is_none());
    assert!(state.leaderboard(None).await.unwrap().is_empty());

    // Starting again begins from scratch
    let replies = enter_identity(&mut session, &state).await;
    assert_eq!(
        replies[0],
        ServerMessage::Screen {
            screen: Screen::Puzzle(PuzzleId::FIRST)
        }
    );
}

#[tokio::test]
async fn test_storage_failure_does_not_advance() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::open(dir.path(), 0).await.unwrap();
    let state = Arc::new(AppState::with_parts(
        Arc::new(store),
        Arc::new(DeviceFlags::new()),
        AnswerKey::default(),
        GameConfig::default(),
    ));
    let mut session = Session::new(&state, "tablet-1");
    enter_identity(&mut session, &state).await;

    // Block the progress snapshot
    let blocker = dir.path().join("progress.json");
    std::fs::remove_file(&blocker).unwrap();
    std::fs::create_dir(&blocker).unwrap();

    let dagger = Answer::Weapon {
        word: "DAGGER".to_string(),
    };
    let replies = submit(dagger.clone(), &mut session, &state).await;
    match &replies[0] {
        ServerMessage::Error { code, .. } => assert_eq!(code, "STORAGE_FAILURE"),
        other => panic!("Expected storage error, got {:?}", other),
    }
    assert_eq!(session.record.as_ref().unwrap().solved_count(), 0);

    // Retrying once storage is back works
    std::fs::remove_dir(&blocker).unwrap();
    let replies = submit(dagger, &mut session, &state).await;
    assert!(accepted(&replies));
    assert_eq!(session.record.as_ref().unwrap().solved_count(), 1);
}

#[tokio::test]
async fn test_leaderboard_endpoint() {
    let state = test_state();
    let mut session = Session::new(&state, "tablet-1");
    enter_identity(&mut session, &state).await;
    submit(
        Answer::Weapon {
            word: "DAGGER".to_string(),
        },
        &mut session,
        &state,
    )
    .await;

    let app = mystery_room::build_router(state, Arc::new(AdminAuth::disabled()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/leaderboard?limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let entries: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(entries[0]["player_name"], "Ada");
    assert_eq!(entries[0]["puzzles_completed"], 1);
}

#[tokio::test]
async fn test_admin_export_requires_auth() {
    let state = test_state();
    let admin = Arc::new(AdminAuth {
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
    });
    let app = mystery_room::build_router(state, admin);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/export")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/export")
                // admin:secret
                .header(header::AUTHORIZATION, "Basic YWRtaW46c2VjcmV0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let export: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(export["schema_version"], 1);
    assert!(export["records"].as_array().unwrap().is_empty());
}
