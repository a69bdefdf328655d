//! Validation and unlock scenarios
//!
//! Drives sessions the way a learner would: wrong answers, correct answers,
//! auto-completing displays, and resets.

use matrix_tutor::{
    Grading, Lesson, LessonKind, Outcome, Session, StepId, StepStatus, TOLERANCE,
};
use std::collections::BTreeSet;

fn load(kind: LessonKind) -> Lesson {
    Lesson::load(kind).expect("built-in lesson must build")
}

fn answer(lesson: &Lesson, id: &StepId) -> Vec<Vec<f64>> {
    lesson.compute_expected(id).unwrap().to_rows()
}

/// Solve `names` in order with their expected values, revealing auto steps
/// as they unlock
fn solve(session: &mut Session<'_>, names: &[StepId]) {
    let lesson = session.lesson();
    for id in names {
        session.reveal_unlocked();
        let result = session.submit(id, &answer(lesson, id)).unwrap();
        assert_eq!(result.outcome, Outcome::Completed, "{}", id);
    }
    session.reveal_unlocked();
}

fn unlocked_set(session: &Session<'_>) -> BTreeSet<StepId> {
    session
        .statuses()
        .into_iter()
        .filter(|(_, s)| *s != StepStatus::Locked)
        .map(|(id, _)| id)
        .collect()
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_self_attention_partial_query() {
    let lesson = load(LessonKind::SelfAttention);
    let q = StepId::new("calc-q");
    let mut candidate = vec![vec![0.0; 4]; 5];
    candidate[0][0] = 10.0;

    let v = lesson.validate(&q, &candidate).unwrap();
    assert!(!v.is_valid);
    assert_eq!(v.error_cells(), vec![(1, 0), (2, 0), (3, 1), (4, 1)]);
    assert!(!v.error_mask[0][1]);
}

#[test]
fn test_expected_value_always_validates() {
    for kind in LessonKind::ALL {
        let lesson = load(kind);
        for meta in lesson.steps() {
            let v = lesson.validate(&meta.id, &meta.expected.to_rows()).unwrap();
            assert!(v.is_valid, "{} {}", kind, meta.id);
            assert_eq!(v.error_count(), 0);
        }
    }
}

#[test]
fn test_single_cell_perturbation_flags_exactly_that_cell() {
    for kind in LessonKind::ALL {
        let lesson = load(kind);
        for meta in lesson.steps() {
            let (rows, cols) = meta.expected.shape();
            for i in 0..rows {
                for j in 0..cols {
                    let mut candidate = meta.expected.to_rows();
                    candidate[i][j] += 10.0 * TOLERANCE;
                    let v = lesson.validate(&meta.id, &candidate).unwrap();
                    assert!(!v.is_valid);
                    assert_eq!(v.error_cells(), vec![(i, j)], "{} {}", kind, meta.id);
                }
            }
        }
    }
}

#[test]
fn test_wrong_shape_flags_every_cell() {
    let lesson = load(LessonKind::NeuralNetwork);
    let z1 = StepId::new("calc-z1");
    let v = lesson.validate(&z1, &[vec![0.09, 0.5, -0.12]]).unwrap();
    assert!(!v.is_valid);
    assert_eq!(v.error_mask, vec![vec![true; 4]]);

    let transposed = lesson.compute_expected(&z1).unwrap().transpose().to_rows();
    assert_eq!(lesson.validate(&z1, &transposed).unwrap().error_count(), 4);
}

// ============================================================================
// Unlocking
// ============================================================================

#[test]
fn test_multi_head_scores_unlock_softmax() {
    let lesson = load(LessonKind::MultiHeadAttention);
    let mut session = Session::new(&lesson);
    let scores = StepId::head("calc-scores", 1);
    let softmax = StepId::head("calc-softmax", 1);

    solve(
        &mut session,
        &[
            StepId::head("calc-q", 1),
            StepId::head("calc-k", 1),
            StepId::head("calc-v", 1),
            StepId::head("k-transpose", 1),
        ],
    );
    assert_eq!(session.status(&scores).unwrap(), StepStatus::Unlocked);
    assert_eq!(session.status(&softmax).unwrap(), StepStatus::Locked);

    let result = session.submit(&scores, &answer(&lesson, &scores)).unwrap();
    assert_eq!(result.outcome, Outcome::Completed);
    assert_eq!(session.status(&scores).unwrap(), StepStatus::Completed);
    assert_eq!(result.unlocked, vec![softmax.clone()]);
    assert_eq!(session.status(&softmax).unwrap(), StepStatus::Unlocked);

    // other heads are untouched
    assert_eq!(
        session.status(&StepId::head("calc-scores", 2)).unwrap(),
        StepStatus::Locked
    );
}

#[test]
fn test_network_dz3_fans_out() {
    let lesson = load(LessonKind::NeuralNetwork);
    let mut session = Session::new(&lesson);
    solve(
        &mut session,
        &["calc-z1", "calc-z2", "calc-z3"].map(StepId::new),
    );
    assert!(session.is_completed(&StepId::new("activate-a3")));

    let dz3 = StepId::new("calc-dz3");
    let result = session.submit(&dz3, &answer(&lesson, &dz3)).unwrap();
    assert!(result.unlocked.contains(&StepId::new("calc-dw3")));
    assert!(result.unlocked.contains(&StepId::new("calc-db3")));
    assert_eq!(
        session.status(&StepId::new("calc-dw3")).unwrap(),
        StepStatus::Unlocked
    );
    assert_eq!(
        session.status(&StepId::new("calc-db3")).unwrap(),
        StepStatus::Unlocked
    );
}

#[test]
fn test_unlocking_is_monotonic() {
    for kind in LessonKind::ALL {
        let lesson = load(kind);
        let mut session = Session::new(&lesson);
        let mut before = unlocked_set(&session);

        for id in lesson.solve_order() {
            if lesson.metadata(id).unwrap().grading == Grading::Auto {
                session.reveal(id).unwrap();
            } else {
                session.submit(id, &answer(&lesson, id)).unwrap();
            }
            let after = unlocked_set(&session);
            assert!(before.is_subset(&after), "{}: {} relocked something", kind, id);
            before = after;
        }
        assert!(session.is_finished(), "{} not finished", kind);
    }
}

#[test]
fn test_is_unlocked_is_monotonic_in_completion_set() {
    let lesson = load(LessonKind::Word2Vec);
    let mut completed = lesson.seed().clone();
    let ids: Vec<StepId> = lesson.solve_order().into_iter().cloned().collect();
    for id in &ids {
        let before: Vec<bool> = ids
            .iter()
            .map(|s| lesson.is_unlocked(s, &completed).unwrap())
            .collect();
        completed.insert(id.clone());
        for (s, was) in ids.iter().zip(before) {
            if was {
                assert!(lesson.is_unlocked(s, &completed).unwrap(), "{}", s);
            }
        }
    }
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_returns_to_seed() {
    for kind in LessonKind::ALL {
        let lesson = load(kind);
        let mut session = Session::new(&lesson);
        let initial = session.statuses();

        let manual: Vec<StepId> = lesson
            .solve_order()
            .into_iter()
            .filter(|id| lesson.metadata(id).unwrap().grading == Grading::Manual)
            .take(4)
            .cloned()
            .collect();
        solve(&mut session, &manual);
        assert!(session.completed().len() > lesson.seed().len());

        let seed = session.reset().clone();
        assert_eq!(&seed, lesson.seed());
        assert_eq!(session.statuses(), initial, "{}", kind);
    }
}

#[test]
fn test_sessions_are_isolated() {
    let lesson = load(LessonKind::SelfAttention);
    let mut first = Session::new(&lesson);
    let second = Session::new(&lesson);
    let q = StepId::new("calc-q");
    first.submit(&q, &answer(&lesson, &q)).unwrap();
    assert!(first.is_completed(&q));
    assert!(!second.is_completed(&q));
}
