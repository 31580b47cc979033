use taskmirror::metadata::{decode, encode, TaskExtras};
use taskmirror::model::{Frequency, Priority, Recurrence, Subtask};

fn sample_extras() -> TaskExtras {
    TaskExtras {
        labels: vec!["home".to_string(), "errands".to_string(), "home".to_string()],
        priority: Priority::Urgent,
        subtasks: vec![Subtask {
            id: "s1".to_string(),
            title: "buy stamps".to_string(),
            completed: true,
            due: None,
        }],
        recurring: Recurrence {
            enabled: true,
            frequency: Frequency::Monthly,
            interval: 2,
            end_date: chrono::NaiveDate::from_ymd_opt(2026, 12, 31),
        },
    }
}

#[test]
fn test_round_trip_preserves_notes_and_extras() {
    let extras = sample_extras();
    let encoded = encode("Visit the post office", &extras);

    let decoded = decode(&encoded);
    assert_eq!(decoded.clean_notes, "Visit the post office");
    assert_eq!(decoded.extras, extras);
}

#[test]
fn test_round_trip_with_empty_notes() {
    let extras = sample_extras();
    let decoded = decode(&encode("", &extras));
    assert_eq!(decoded.clean_notes, "");
    assert_eq!(decoded.extras, extras);
}

#[test]
fn test_empty_extras_encode_to_bare_notes() {
    let encoded = encode("just notes", &TaskExtras::default());
    assert_eq!(encoded, "just notes");

    let decoded = decode(&encoded);
    assert_eq!(decoded.clean_notes, "just notes");
    assert_eq!(decoded.extras, TaskExtras::default());
}

#[test]
fn test_marker_appears_at_most_once() {
    let extras = sample_extras();
    let encoded = encode("notes", &extras);
    assert_eq!(encoded.matches("[TASKMIRROR:").count(), 1);
}

#[test]
fn test_decode_without_marker() {
    let decoded = decode("plain notes, nothing hidden");
    assert_eq!(decoded.clean_notes, "plain notes, nothing hidden");
    assert_eq!(decoded.extras, TaskExtras::default());
}

#[test]
fn test_decode_legacy_unversioned_marker() {
    let raw = r#"old note[TASKMIRROR:{"labels":["legacy"]}]"#;
    let decoded = decode(raw);
    assert_eq!(decoded.clean_notes, "old note");
    assert_eq!(decoded.extras.labels, vec!["legacy".to_string()]);
}

#[test]
fn test_malformed_marker_recovers_raw_notes() {
    // Truncated JSON payload: decode must not error and must not lose the
    // user's text.
    let raw = "my notes[TASKMIRROR:v1:{\"labels\":[\"x\"]";
    let decoded = decode(raw);
    assert_eq!(decoded.clean_notes, raw);
    assert_eq!(decoded.extras, TaskExtras::default());

    let raw = "my notes[TASKMIRROR:v1:not json at all]";
    let decoded = decode(raw);
    assert_eq!(decoded.clean_notes, raw);
    assert_eq!(decoded.extras, TaskExtras::default());
}

#[test]
fn test_duplicate_labels_survive_round_trip() {
    // Labels are an ordered collection that permits duplicates.
    let extras = TaskExtras {
        labels: vec!["a".into(), "a".into(), "b".into()],
        ..Default::default()
    };
    let decoded = decode(&encode("n", &extras));
    assert_eq!(decoded.extras.labels, vec!["a", "a", "b"]);
}

#[test]
fn test_notes_containing_brackets_are_not_confused() {
    let extras = TaskExtras {
        priority: Priority::High,
        ..Default::default()
    };
    let encoded = encode("checklist [done] and [pending]", &extras);
    let decoded = decode(&encoded);
    assert_eq!(decoded.clean_notes, "checklist [done] and [pending]");
    assert_eq!(decoded.extras.priority, Priority::High);
}
