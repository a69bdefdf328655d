//! Script files on disk: loading, rejection and replay

use matrix_tutor::config::{load_script, ReplayEvent, ScriptAction};
use matrix_tutor::{Lesson, LessonKind, Outcome, Session, StepId, TutorError};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_script(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_and_replay_self_attention() {
    let lesson = Lesson::load(LessonKind::SelfAttention).unwrap();
    let k = lesson
        .compute_expected(&StepId::new("calc-k"))
        .unwrap()
        .to_rows();
    let script = serde_json::json!({
        "lesson": "self-attention",
        "steps": [
            { "step": "calc-kt", "matrix": [[0.0]] },
            { "step": "calc-k", "matrix": k },
            { "step": "calc-k", "matrix": k },
            { "reset": true }
        ]
    });
    let file = write_script(&script.to_string());

    let loaded = load_script(file.path()).unwrap();
    assert_eq!(loaded.lesson, LessonKind::SelfAttention);
    assert!(matches!(loaded.steps[3], ScriptAction::Reset { reset: true }));

    let mut session = Session::new(&lesson);
    let events = loaded.replay(&mut session).unwrap();
    assert_eq!(
        events,
        vec![
            ReplayEvent::Submit {
                step: StepId::new("calc-kt"),
                outcome: Outcome::Locked,
                wrong_cells: 20,
                unlocked: vec![],
            },
            ReplayEvent::Submit {
                step: StepId::new("calc-k"),
                outcome: Outcome::Completed,
                wrong_cells: 0,
                unlocked: vec![StepId::new("calc-kt")],
            },
            ReplayEvent::Submit {
                step: StepId::new("calc-k"),
                outcome: Outcome::AlreadyCompleted,
                wrong_cells: 0,
                unlocked: vec![],
            },
            ReplayEvent::Reset,
        ]
    );
    assert!(session.completed().is_empty());
}

#[test]
fn test_replay_cascades_auto_steps() {
    let file = write_script(
        r#"{
            "lesson": "word2vec",
            "steps": [
                { "reveal_unlocked": true },
                { "reveal": "activate-y-pred" }
            ]
        }"#,
    );
    let script = load_script(file.path()).unwrap();
    let lesson = Lesson::load(LessonKind::Word2Vec).unwrap();
    let mut session = Session::new(&lesson);
    let events = script.replay(&mut session).unwrap();

    // seed displays are already complete and calc-z is still unsolved
    assert_eq!(events[0], ReplayEvent::RevealUnlocked { revealed: vec![] });
    assert_eq!(
        events[1],
        ReplayEvent::Reveal {
            step: StepId::new("activate-y-pred"),
            unlocked: vec![],
        }
    );
    assert_eq!(session.progress().0, lesson.seed().len());
}

#[test]
fn test_replay_rejects_other_lesson() {
    let file = write_script(r#"{ "lesson": "neural-network", "steps": [ { "reset": true } ] }"#);
    let script = load_script(file.path()).unwrap();
    let lesson = Lesson::load(LessonKind::SelfAttention).unwrap();
    let mut session = Session::new(&lesson);
    assert!(matches!(
        script.replay(&mut session),
        Err(TutorError::InvalidConfig(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_script(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, TutorError::Io(_)));
}

#[test]
fn test_malformed_json_is_json_error() {
    let file = write_script(r#"{ "lesson": "word2vec", "steps": [ "#);
    assert!(matches!(
        load_script(file.path()).unwrap_err(),
        TutorError::Json(_)
    ));
}

#[test]
fn test_invalid_head_is_config_error() {
    let file = write_script(
        r#"{ "lesson": "multi-head-attention",
             "steps": [ { "step": "calc-q-head4", "matrix": [[1.0]] } ] }"#,
    );
    assert!(matches!(
        load_script(file.path()).unwrap_err(),
        TutorError::InvalidConfig(_)
    ));
}
