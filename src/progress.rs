//! Progression controller.
//!
//! Pure functions over `ProgressRecord`: which screen a player may see, what
//! a solve does to the record, and where to resume. Nothing here touches
//! storage; the caller persists the returned record and only then treats the
//! solve as accepted.

use crate::error::{GameError, GameResult};
use crate::puzzles::{self, Answer, AnswerKey, CompletionStamp, Patch, PuzzleStages, Stage, Verdict};
use crate::types::{CompletionPolicy, Millis, ProgressRecord, PuzzleId, Screen};
use serde::{Deserialize, Serialize};

/// Where a player is in the play-through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "puzzle", rename_all = "snake_case")]
pub enum ProgressState {
    NotStarted,
    AtPuzzle(PuzzleId),
    Complete,
}

pub fn progress_state(record: Option<&ProgressRecord>) -> ProgressState {
    match record {
        None => ProgressState::NotStarted,
        Some(record) => match record.first_unsolved() {
            Some(puzzle) => ProgressState::AtPuzzle(puzzle),
            None => ProgressState::Complete,
        },
    }
}

/// "Continue": first unsolved puzzle, or the results screen
pub fn resolve_entry_point(record: &ProgressRecord) -> Screen {
    match record.first_unsolved() {
        Some(puzzle) => Screen::Puzzle(puzzle),
        None => Screen::Results,
    }
}

/// Why the controller sent the player somewhere else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    MissingIdentity,
    PrerequisiteIncomplete,
    AlreadySolved,
    NotFinished,
    DeviceLocked,
}

/// Outcome of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Show(Screen),
    Redirect { to: Screen, reason: RedirectReason },
}

/// Screen after `puzzle` is solved
fn screen_after(puzzle: PuzzleId) -> Screen {
    match puzzle.next() {
        Some(next) => Screen::Puzzle(next),
        None => Screen::Results,
    }
}

/// Gate a navigation request.
///
/// Out-of-order requests are redirected to the first incomplete prerequisite
/// instead of being refused.
pub fn enter(requested: Screen, record: Option<&ProgressRecord>) -> Entry {
    let Some(record) = record else {
        return match requested {
            Screen::Identity => Entry::Show(Screen::Identity),
            _ => Entry::Redirect {
                to: Screen::Identity,
                reason: RedirectReason::MissingIdentity,
            },
        };
    };

    match requested {
        Screen::Identity => Entry::Show(Screen::Identity),
        Screen::Puzzle(puzzle) => {
            if let Some(missing) = first_missing_prerequisite(record, puzzle) {
                return Entry::Redirect {
                    to: Screen::Puzzle(missing),
                    reason: RedirectReason::PrerequisiteIncomplete,
                };
            }
            if record.is_solved(puzzle) && record.current_page >= puzzle.get() {
                return Entry::Redirect {
                    to: screen_after(puzzle),
                    reason: RedirectReason::AlreadySolved,
                };
            }
            Entry::Show(Screen::Puzzle(puzzle))
        }
        Screen::Results => {
            if record.is_complete() {
                Entry::Show(Screen::Results)
            } else {
                Entry::Redirect {
                    to: resolve_entry_point(record),
                    reason: RedirectReason::NotFinished,
                }
            }
        }
    }
}

fn first_missing_prerequisite(record: &ProgressRecord, puzzle: PuzzleId) -> Option<PuzzleId> {
    PuzzleId::all()
        .take_while(|p| *p < puzzle)
        .find(|p| !record.is_solved(*p))
}

/// Result of a submission that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Solved; `record` must be persisted before it is shown
    Advanced { record: ProgressRecord, next: Screen },
    /// A gate inside a multi-stage puzzle opened
    StageCleared(Stage),
    /// Puzzle was already solved; nothing changes
    AlreadySolved { next: Screen },
}

/// Validate `answer` against `record` and build the next record.
pub fn submit(
    record: &ProgressRecord,
    stages: &PuzzleStages,
    answer: &Answer,
    key: &AnswerKey,
    policy: CompletionPolicy,
    now: Millis,
) -> GameResult<Submission> {
    let puzzle = answer.puzzle();

    if let Some(missing) = first_missing_prerequisite(record, puzzle) {
        return Err(GameError::PrerequisiteIncomplete {
            redirect: Screen::Puzzle(missing),
        });
    }
    if record.is_solved(puzzle) {
        return Ok(Submission::AlreadySolved {
            next: screen_after(puzzle),
        });
    }

    match puzzles::validate(answer, stages, key) {
        Verdict::Reject(hint) => Err(GameError::rejected(hint)),
        Verdict::StageCleared(stage) => Ok(Submission::StageCleared(stage)),
        Verdict::Accept(patch) => Ok(Submission::Advanced {
            record: apply_patch(record, &patch, policy, now),
            next: screen_after(puzzle),
        }),
    }
}

/// Apply an accepted patch. Flags only turn on and `current_page` only moves
/// forward.
pub fn apply_patch(
    record: &ProgressRecord,
    patch: &Patch,
    policy: CompletionPolicy,
    now: Millis,
) -> ProgressRecord {
    let mut next = record.clone();
    next.solved[patch.puzzle.index()] = true;
    if let Some(weapon) = &patch.weapon {
        next.weapon = weapon.clone();
    }
    if let Some(killer) = &patch.killer {
        next.killer = killer.clone();
    }
    if let Some(page) = patch.current_page {
        next.current_page = next.current_page.max(page);
    }

    let elapsed = now - record.start_time;
    match (patch.completion, policy) {
        (CompletionStamp::None, _) => {}
        (CompletionStamp::Checkpoint, CompletionPolicy::FinalOnly) => {}
        (CompletionStamp::Checkpoint, CompletionPolicy::Checkpoint) => {
            if next.completion_time.is_none() {
                next.completion_time = Some(elapsed);
            }
        }
        (CompletionStamp::Final, CompletionPolicy::FinalOnly) => {
            if next.completion_time.is_none() && next.is_complete() {
                next.completion_time = Some(elapsed);
            }
        }
        (CompletionStamp::Final, CompletionPolicy::Checkpoint) => {
            // Rolling checkpoint: the final solve replaces the puzzle 3 stamp
            next.completion_time = Some(elapsed);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Identity;
    use std::collections::BTreeMap;

    const START: Millis = 1_000_000;

    fn fresh() -> ProgressRecord {
        ProgressRecord::fresh(&Identity::new("Ada", "red").unwrap(), START)
    }

    fn solved_through(n: u8) -> ProgressRecord {
        let mut record = fresh();
        for p in PuzzleId::all().take(usize::from(n)) {
            record.solved[p.index()] = true;
        }
        record.current_page = n;
        record
    }

    fn key() -> AnswerKey {
        AnswerKey::default()
    }

    /// A wrong answer for every puzzle
    fn wrong_answers() -> Vec<Answer> {
        vec![
            Answer::Weapon {
                word: "RAGGED".to_string(),
            },
            Answer::Timeline {
                order: vec!["scream".to_string()],
            },
            Answer::Alibis {
                placements: BTreeMap::new(),
            },
            Answer::Deduction {
                suspect: "Thomas Finch".to_string(),
                weapon: "Rope".to_string(),
            },
            Answer::Contradictions {
                selected: vec!["red_wine".to_string()],
            },
            Answer::Query {
                text: "amount > 9000".to_string(),
            },
            Answer::ClueDump {
                text: "ledger".to_string(),
            },
            Answer::Inspection { found: vec![] },
            Answer::Accusation {
                text: "nobody".to_string(),
            },
        ]
    }

    #[test]
    fn test_resolve_entry_point() {
        assert_eq!(
            resolve_entry_point(&fresh()),
            Screen::Puzzle(PuzzleId::of(1))
        );
        assert_eq!(
            resolve_entry_point(&solved_through(6)),
            Screen::Puzzle(PuzzleId::of(7))
        );
        assert_eq!(resolve_entry_point(&solved_through(9)), Screen::Results);
    }

    #[test]
    fn test_progress_state() {
        assert_eq!(progress_state(None), ProgressState::NotStarted);
        assert_eq!(
            progress_state(Some(&solved_through(2))),
            ProgressState::AtPuzzle(PuzzleId::of(3))
        );
        assert_eq!(
            progress_state(Some(&solved_through(9))),
            ProgressState::Complete
        );
    }

    #[test]
    fn test_enter_without_identity() {
        assert_eq!(
            enter(Screen::Puzzle(PuzzleId::of(1)), None),
            Entry::Redirect {
                to: Screen::Identity,
                reason: RedirectReason::MissingIdentity
            }
        );
        assert_eq!(enter(Screen::Identity, None), Entry::Show(Screen::Identity));
    }

    #[test]
    fn test_out_of_order_entry_redirects_to_prerequisite() {
        for n in 2..=9u8 {
            for solved in 0..n - 1 {
                let record = solved_through(solved);
                let entry = enter(Screen::Puzzle(PuzzleId::of(n)), Some(&record));
                assert_eq!(
                    entry,
                    Entry::Redirect {
                        to: Screen::Puzzle(PuzzleId::of(solved + 1)),
                        reason: RedirectReason::PrerequisiteIncomplete
                    },
                    "entering {} with {} solved",
                    n,
                    solved
                );
            }
        }
    }

    #[test]
    fn test_solved_puzzle_skips_forward() {
        let record = solved_through(4);
        assert_eq!(
            enter(Screen::Puzzle(PuzzleId::of(2)), Some(&record)),
            Entry::Redirect {
                to: Screen::Puzzle(PuzzleId::of(3)),
                reason: RedirectReason::AlreadySolved
            }
        );
        assert_eq!(
            enter(Screen::Puzzle(PuzzleId::of(5)), Some(&record)),
            Entry::Show(Screen::Puzzle(PuzzleId::of(5)))
        );
    }

    #[test]
    fn test_stale_current_page_still_shows_puzzle() {
        let mut record = solved_through(6);
        record.current_page = 5;
        // p6 solved but current_page lags: no short-circuit
        assert_eq!(
            enter(Screen::Puzzle(PuzzleId::of(6)), Some(&record)),
            Entry::Show(Screen::Puzzle(PuzzleId::of(6)))
        );
    }

    #[test]
    fn test_results_requires_completion() {
        assert_eq!(
            enter(Screen::Results, Some(&solved_through(3))),
            Entry::Redirect {
                to: Screen::Puzzle(PuzzleId::of(4)),
                reason: RedirectReason::NotFinished
            }
        );
        assert_eq!(
            enter(Screen::Results, Some(&solved_through(9))),
            Entry::Show(Screen::Results)
        );
    }

    #[test]
    fn test_weapon_solve_patch() {
        let outcome = submit(
            &fresh(),
            &PuzzleStages::default(),
            &Answer::Weapon {
                word: "DAGGER".to_string(),
            },
            &key(),
            CompletionPolicy::FinalOnly,
            START + 10,
        )
        .unwrap();

        let Submission::Advanced { record, next } = outcome else {
            panic!("expected advance");
        };
        assert!(record.is_solved(PuzzleId::of(1)));
        assert_eq!(record.weapon, "Dagger");
        assert_eq!(record.current_page, 1);
        assert_eq!(record.start_time, START);
        assert_eq!(next, Screen::Puzzle(PuzzleId::of(2)));
    }

    #[test]
    fn test_rejections_leave_record_unchanged() {
        for (i, answer) in wrong_answers().into_iter().enumerate() {
            let record = solved_through(i as u8);
            let before = record.clone();
            let result = submit(
                &record,
                &PuzzleStages::default(),
                &answer,
                &key(),
                CompletionPolicy::FinalOnly,
                START + 5,
            );
            assert!(
                matches!(result, Err(GameError::ValidationRejected { .. })),
                "answer {:?} should be rejected",
                answer
            );
            assert_eq!(record, before);
        }
    }

    #[test]
    fn test_submit_out_of_order_is_refused() {
        let result = submit(
            &solved_through(1),
            &PuzzleStages::default(),
            &Answer::Query {
                text: "amount > 10000".to_string(),
            },
            &key(),
            CompletionPolicy::FinalOnly,
            START,
        );
        match result {
            Err(GameError::PrerequisiteIncomplete { redirect }) => {
                assert_eq!(redirect, Screen::Puzzle(PuzzleId::of(2)));
            }
            other => panic!("expected prerequisite error, got {:?}", other),
        }
    }

    #[test]
    fn test_resubmitting_solved_puzzle_is_noop() {
        let record = solved_through(1);
        let outcome = submit(
            &record,
            &PuzzleStages::default(),
            &Answer::Weapon {
                word: "DAGGER".to_string(),
            },
            &key(),
            CompletionPolicy::FinalOnly,
            START + 99,
        )
        .unwrap();
        assert_eq!(
            outcome,
            Submission::AlreadySolved {
                next: Screen::Puzzle(PuzzleId::of(2))
            }
        );
    }

    #[test]
    fn test_current_page_never_regresses() {
        let mut record = solved_through(5);
        record.current_page = 8;
        let patch = Patch::solve(PuzzleId::of(6)).with_page();
        let next = apply_patch(&record, &patch, CompletionPolicy::FinalOnly, START);
        assert_eq!(next.current_page, 8);
    }

    #[test]
    fn test_final_only_completion_time() {
        let mut patch = Patch::solve(PuzzleId::of(3)).with_page();
        patch.completion = CompletionStamp::Checkpoint;
        let after_three = apply_patch(&solved_through(2), &patch, CompletionPolicy::FinalOnly, START + 50);
        assert_eq!(after_three.completion_time, None);

        let mut last = Patch::solve(PuzzleId::of(9));
        last.completion = CompletionStamp::Final;
        let done = apply_patch(&solved_through(8), &last, CompletionPolicy::FinalOnly, START + 7_000);
        assert!(done.is_complete());
        assert_eq!(done.completion_time, Some(7_000));
    }

    #[test]
    fn test_checkpoint_policy_completion_time() {
        let mut patch = Patch::solve(PuzzleId::of(3)).with_page();
        patch.completion = CompletionStamp::Checkpoint;
        let after_three = apply_patch(&solved_through(2), &patch, CompletionPolicy::Checkpoint, START + 50);
        assert_eq!(after_three.completion_time, Some(50));

        // Intermediate saves keep the checkpoint
        let four = apply_patch(
            &after_three,
            &Patch::solve(PuzzleId::of(4)).with_page(),
            CompletionPolicy::Checkpoint,
            START + 80,
        );
        assert_eq!(four.completion_time, Some(50));

        let mut record = solved_through(8);
        record.completion_time = Some(50);
        let mut last = Patch::solve(PuzzleId::of(9));
        last.completion = CompletionStamp::Final;
        let done = apply_patch(&record, &last, CompletionPolicy::Checkpoint, START + 9_000);
        assert_eq!(done.completion_time, Some(9_000));
    }

    #[test]
    fn test_full_play_through_is_monotonic() {
        let key = key();
        let mut stages = PuzzleStages::default();
        let mut record = fresh();
        let mut now = START;

        let mut placements = BTreeMap::new();
        for suspect in &key.alibis {
            placements.insert(suspect.id.clone(), suspect.timeslot.clone());
        }

        let script = vec![
            Answer::Weapon {
                word: "dagger".to_string(),
            },
            Answer::Timeline {
                order: key.timeline.iter().map(|e| e.id.clone()).collect(),
            },
            Answer::AlibiRiddle {
                suspect: "graves".to_string(),
                answer: "piano".to_string(),
            },
            Answer::AlibiRiddle {
                suspect: "lane".to_string(),
                answer: "footsteps".to_string(),
            },
            Answer::AlibiRiddle {
                suspect: "finch".to_string(),
                answer: "clock".to_string(),
            },
            Answer::Alibis { placements },
            Answer::Deduction {
                suspect: key.killer.clone(),
                weapon: "Dagger".to_string(),
            },
            Answer::Contradictions {
                selected: vec![
                    "sealed_windows".to_string(),
                    "dry_boots".to_string(),
                    "stopped_clock".to_string(),
                ],
            },
            Answer::Query {
                text: "where amount > 10000".to_string(),
            },
            Answer::CipherMessage {
                text: key.cipher_plaintext.clone(),
            },
            Answer::ClueDump {
                text: "ledger, transfer at midnight".to_string(),
            },
            Answer::Inspection {
                found: vec!["safe_button".to_string(), "portrait_hover".to_string()],
            },
            Answer::FinalMessage {
                text: key.final_plaintext.clone(),
            },
            Answer::Accusation {
                text: key.final_plaintext.to_lowercase(),
            },
        ];

        for answer in script {
            now += 1_000;
            let solved_before = record.solved_count();
            match submit(&record, &stages, &answer, &key, CompletionPolicy::FinalOnly, now).unwrap() {
                Submission::Advanced { record: next, .. } => {
                    assert_eq!(next.solved_count(), solved_before + 1);
                    record = next;
                }
                Submission::StageCleared(stage) => stages.apply(&stage),
                Submission::AlreadySolved { .. } => panic!("unexpected no-op"),
            }
            // Garbage after every step never takes anything away
            for wrong in wrong_answers() {
                let _ = submit(&record, &stages, &wrong, &key, CompletionPolicy::FinalOnly, now);
            }
        }

        assert!(record.is_complete());
        assert_eq!(record.killer, key.killer);
        assert_eq!(record.weapon, "Dagger");
        assert_eq!(record.completion_time, Some(now - START));
        assert_eq!(resolve_entry_point(&record), Screen::Results);
    }
}
