use serde_json::json;
use stepchain_core::{ChainError, Store};

#[test]
fn extend_after_last_step_appends_in_place() {
    let store = Store::in_memory();
    let u = store.create_user("tail", "t@x.org", None).expect("user");
    let h = store.create_history(u.id, "hist1").expect("history");
    let a = store.append_step(h.id, "text/plain", "a").expect("append A");

    let (target, b) = store.extend_at(h.id, 0, "text/plain", "b").expect("extend at tail");
    assert_eq!(target.id, h.id);
    assert_eq!(target.steps, vec![a.id, b.id]);
    assert_eq!(b.previous, Some(a.id));
    assert_eq!(store.list_histories(u.id).expect("list").len(), 1, "no fork for a tail extension");
}

#[test]
fn extend_on_empty_history_starts_the_chain() {
    let store = Store::in_memory();
    let u = store.create_user("empty", "e@x.org", None).expect("user");
    let h = store.create_history(u.id, "blank").expect("history");
    let (target, root) = store.extend_at(h.id, -1, "text/plain", "root").expect("extend empty");
    assert_eq!(target.id, h.id);
    assert!(root.is_root());
}

#[test]
fn extend_in_the_middle_forks_and_appends() {
    let store = Store::in_memory();
    let u = store.create_user("middle", "m@x.org", None).expect("user");
    let h = store.create_history(u.id, "hist1").expect("history");
    let a = store.append_step(h.id, "text/plain", "a").expect("A");
    let b = store.append_step(h.id, "text/plain", "b").expect("B");

    let (fork, c) = store.extend_at(h.id, 0, "app/json", json!({"c": 1})).expect("extend at 0");
    assert_ne!(fork.id, h.id);
    assert_eq!(fork.name, "hist1 (fork @1)");
    assert_eq!(fork.steps, vec![a.id, c.id]);
    assert_eq!(c.previous, Some(a.id));
    assert_eq!(store.fetch_history(&h.id.into()).expect("source").steps, vec![a.id, b.id]);

    let next: Vec<_> = store.next_steps(a.id).expect("next").into_iter().map(|s| s.id).collect();
    assert_eq!(next, vec![b.id, c.id]);
}

#[test]
fn extend_out_of_range_creates_nothing() {
    let store = Store::in_memory();
    let u = store.create_user("range", "r@x.org", None).expect("user");
    let h = store.create_history(u.id, "short").expect("history");
    store.append_step(h.id, "text/plain", "a").expect("A");

    for index in [1, 5, -2, i64::MAX] {
        let err = store.extend_at(h.id, index, "text/plain", "x").unwrap_err();
        assert!(matches!(err, ChainError::Range { len: 1, .. }), "index={index}: {err:?}");
    }
    assert_eq!(store.list_histories(u.id).expect("list").len(), 1);
    assert_eq!(store.fetch_history(&h.id.into()).expect("source").steps.len(), 1);
}

#[test]
fn failed_append_after_fork_rolls_back_the_fork() {
    let store = Store::in_memory();
    let u = store.create_user("atomic", "a@x.org", None).expect("user");
    let h = store.create_history(u.id, "hist1").expect("history");
    store.append_step(h.id, "text/plain", "a").expect("A");
    store.append_step(h.id, "text/plain", "b").expect("B");

    let err = store.extend_at(h.id, 0, "   ", "c").unwrap_err();
    assert!(matches!(err, ChainError::Validation(_)), "got {err:?}");
    assert_eq!(store.list_histories(u.id).expect("list").len(), 1, "fork must not survive the failed append");
}
