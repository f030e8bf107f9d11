use super::{normalize, Answer, AnswerKey, CompletionStamp, Patch, PuzzleStages, Stage, Verdict};
use crate::types::PuzzleId;
use std::collections::{BTreeMap, HashSet};

/// Check a candidate answer. Prerequisite gating is the caller's job.
pub fn validate(answer: &Answer, stages: &PuzzleStages, key: &AnswerKey) -> Verdict {
    match answer {
        Answer::Weapon { word } => weapon(word, key),
        Answer::Timeline { order } => timeline(order, key),
        Answer::AlibiRiddle { suspect, answer } => alibi_riddle(suspect, answer, key),
        Answer::Alibis { placements } => alibis(placements, stages, key),
        Answer::Deduction { suspect, weapon } => deduction(suspect, weapon, key),
        Answer::Contradictions { selected } => contradictions(selected, key),
        Answer::Query { text } => query(text, key),
        Answer::CipherMessage { text } => cipher_message(text, key),
        Answer::ClueDump { text } => clue_dump(text, stages, key),
        Answer::Inspection { found } => inspection(found, key),
        Answer::FinalMessage { text } => final_message(text, key),
        Answer::Accusation { text } => accusation(text, stages, key),
    }
}

fn reject(hint: &str) -> Verdict {
    Verdict::Reject(hint.to_string())
}

fn weapon(word: &str, key: &AnswerKey) -> Verdict {
    let word = normalize(word);
    if word.chars().count() > 6 || word.contains(char::is_whitespace) {
        return reject("The answer is a single word of at most six letters.");
    }
    if word != normalize(&key.weapon_word) {
        return reject("Those letters don't spell the weapon. Try another arrangement.");
    }
    let mut patch = Patch::solve(PuzzleId::of(1)).with_page();
    patch.weapon = Some(key.weapon_name.clone());
    Verdict::Accept(patch)
}

fn timeline(order: &[String], key: &AnswerKey) -> Verdict {
    let order: Vec<String> = order.iter().map(|id| normalize(id)).collect();
    let distinct: HashSet<&String> = order.iter().collect();
    if order.len() != key.timeline.len() || distinct.len() != order.len() {
        return reject("Place every event exactly once.");
    }
    let correct = order
        .iter()
        .zip(key.timeline.iter())
        .all(|(given, event)| *given == normalize(&event.id));
    if !correct {
        return reject("The events are out of order. Think about what had to happen first.");
    }
    Verdict::Accept(Patch::solve(PuzzleId::of(2)).with_page())
}

fn alibi_riddle(suspect: &str, answer: &str, key: &AnswerKey) -> Verdict {
    let Some(alibi) = key.alibi(suspect) else {
        return reject("That suspect is not part of this puzzle.");
    };
    if normalize(answer) != normalize(&alibi.riddle_answer) {
        return reject("That doesn't answer the riddle.");
    }
    Verdict::StageCleared(Stage::SuspectUnlocked(alibi.id.clone()))
}

fn alibis(
    placements: &BTreeMap<String, String>,
    stages: &PuzzleStages,
    key: &AnswerKey,
) -> Verdict {
    if key.alibis.iter().any(|s| !stages.is_unlocked(&s.id)) {
        return reject("Solve every suspect's riddle before placing them.");
    }
    let placements: BTreeMap<String, String> = placements
        .iter()
        .map(|(suspect, slot)| (normalize(suspect), normalize(slot)))
        .collect();
    let all_match = key.alibis.iter().all(|s| {
        placements
            .get(&normalize(&s.id))
            .is_some_and(|slot| *slot == normalize(&s.timeslot))
    });
    if !all_match {
        return reject("At least one alibi doesn't hold up. Check the timeslots again.");
    }
    let mut patch = Patch::solve(PuzzleId::of(3)).with_page();
    patch.completion = CompletionStamp::Checkpoint;
    Verdict::Accept(patch)
}

fn deduction(suspect: &str, weapon: &str, key: &AnswerKey) -> Verdict {
    let suspect = normalize(suspect);
    let weapon = normalize(weapon);
    let known_suspect = key.suspects.iter().any(|s| normalize(s) == suspect);
    let known_weapon = key.weapons.iter().any(|w| normalize(w) == weapon);
    if !known_suspect || !known_weapon {
        return reject("Choose one suspect and one weapon from the lists.");
    }
    if suspect != normalize(&key.killer) || weapon != normalize(&key.weapon_name) {
        return reject("The evidence doesn't support that conclusion.");
    }
    let mut patch = Patch::solve(PuzzleId::of(4)).with_page();
    patch.killer = Some(key.killer.clone());
    Verdict::Accept(patch)
}

fn contradictions(selected: &[String], key: &AnswerKey) -> Verdict {
    let selected: HashSet<String> = selected.iter().map(|id| normalize(id)).collect();
    let correct = key.correct_contradictions();
    if selected.len() < correct.len() {
        return reject(&format!("There are {} contradictions to find.", correct.len()));
    }
    if selected != correct {
        return reject("One of your picks is consistent with the facts.");
    }
    Verdict::Accept(Patch::solve(PuzzleId::of(5)).with_page())
}

fn query(text: &str, key: &AnswerKey) -> Verdict {
    if !normalize(text).contains(&normalize(&key.query_needle)) {
        return reject("The query doesn't isolate the suspicious transactions.");
    }
    Verdict::Accept(Patch::solve(PuzzleId::of(6)))
}

fn cipher_message(text: &str, key: &AnswerKey) -> Verdict {
    if normalize(text) != normalize(&key.cipher_plaintext) {
        return reject("That isn't the decrypted message. Check your substitutions.");
    }
    Verdict::StageCleared(Stage::CipherDecoded)
}

fn clue_dump(text: &str, stages: &PuzzleStages, key: &AnswerKey) -> Verdict {
    if !stages.cipher_decoded {
        return reject("Decrypt the message first.");
    }
    let text = normalize(text);
    let found = key
        .clue_keywords
        .iter()
        .filter(|keyword| text.contains(&normalize(keyword)))
        .count();
    if found < key.clue_keyword_threshold {
        return reject("Your notes are missing key details from the ledger.");
    }
    Verdict::Accept(Patch::solve(PuzzleId::of(7)))
}

fn inspection(found: &[String], key: &AnswerKey) -> Verdict {
    let found: HashSet<String> = found.iter().map(|id| normalize(id)).collect();
    let discovered = key
        .hidden_clues
        .iter()
        .filter(|clue| found.contains(&normalize(clue)))
        .count();
    if discovered < key.hidden_clue_threshold {
        return reject("You haven't inspected the room closely enough.");
    }
    Verdict::Accept(Patch::solve(PuzzleId::of(8)).with_page())
}

fn final_message(text: &str, key: &AnswerKey) -> Verdict {
    if normalize(text) != normalize(&key.final_plaintext) {
        return reject("That isn't the decrypted message. Check your substitutions.");
    }
    Verdict::StageCleared(Stage::FinalDecoded)
}

fn accusation(text: &str, stages: &PuzzleStages, key: &AnswerKey) -> Verdict {
    if !stages.final_decoded {
        return reject("Decrypt the final message first.");
    }
    if normalize(text) != normalize(&key.final_plaintext) {
        return reject("Your accusation must name who, where and with what.");
    }
    let mut patch = Patch::solve(PuzzleId::of(9));
    patch.killer = Some(key.killer.clone());
    patch.completion = CompletionStamp::Final;
    Verdict::Accept(patch)
}
