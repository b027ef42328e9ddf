// On-disk snapshot format: a JSON object keyed by event id. Files written by
// earlier deployments must keep loading so upgrades do not re-announce every
// event.

use calwatch_core::Event;
use calwatch_store::EventStore;

fn sample() -> Vec<Event> {
    vec![
        Event {
            id: "evt-1".to_string(),
            title: "チームミーティング".to_string(),
            start: "2026-02-05T14:00:00+09:00".to_string(),
            end: "2026-02-05T15:00:00+09:00".to_string(),
            source_tag: "primary".to_string(),
        },
        Event {
            id: "evt-2".to_string(),
            title: "Holiday".to_string(),
            start: "2026-02-11".to_string(),
            end: "2026-02-12".to_string(),
            source_tag: "team@group.calendar.google.com".to_string(),
        },
    ]
}

#[test]
fn written_file_is_object_keyed_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = EventStore::new(dir.path().join("previous_events.json"));
    store.save(&sample()).unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let obj = value.as_object().expect("snapshot must be a JSON object");

    assert_eq!(obj.len(), 2);
    assert_eq!(obj["evt-1"]["id"], "evt-1");
    assert_eq!(obj["evt-1"]["title"], "チームミーティング");
    assert_eq!(obj["evt-2"]["start"], "2026-02-11");
    assert_eq!(obj["evt-2"]["source_tag"], "team@group.calendar.google.com");
}

#[test]
fn non_ascii_titles_are_stored_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let store = EventStore::new(dir.path().join("previous_events.json"));
    store.save(&sample()).unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("チームミーティング"));
}

#[test]
fn legacy_snapshot_with_calendar_id_key_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("previous_events.json");
    std::fs::write(
        &path,
        r#"{
  "evt-1": {
    "id": "evt-1",
    "title": "チームミーティング",
    "start": "2026-02-05T14:00:00+09:00",
    "end": "2026-02-05T15:00:00+09:00",
    "calendar_id": "primary"
  }
}"#,
    )
    .unwrap();

    let store = EventStore::new(&path);
    let snapshot = store.load();
    assert_eq!(snapshot["evt-1"].source_tag, "primary");

    let current = sample();
    let new: Vec<_> = store
        .new_events(&current)
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(new, vec!["evt-2"]);
}

#[test]
fn indentation_is_not_significant() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("previous_events.json");
    let compact = serde_json::json!({
        "evt-1": {
            "id": "evt-1",
            "title": "x",
            "start": "2026-02-05",
            "end": "2026-02-06",
            "source_tag": "primary"
        }
    })
    .to_string();
    std::fs::write(&path, compact).unwrap();

    assert_eq!(EventStore::new(&path).load().len(), 1);
}
