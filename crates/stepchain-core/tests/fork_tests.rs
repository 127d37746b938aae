use serde_json::json;
use stepchain_core::{ChainError, History, HistoryId, Store, InMemoryBackend};

fn history_with_steps(store: &Store<InMemoryBackend>, n: usize) -> History {
    let u = store.create_user(&format!("owner-{n}"), "o@x.org", None).expect("user");
    let h = store.create_history(u.id, "source").expect("history");
    for i in 0..n {
        store.append_step(h.id, "app/step", json!({"i": i})).expect("append");
    }
    store.fetch_history(&h.id.into()).expect("reload")
}

#[test]
fn every_valid_index_yields_a_shared_prefix() {
    let store = Store::in_memory();
    let h = history_with_steps(&store, 4);
    for k in 0..=h.len() {
        let fork = store.fork_history(&h.id.into(), k as i64).expect("fork");
        assert_eq!(fork.len(), k);
        assert_eq!(fork.steps[..], h.steps[..k], "fork at {k} must reference the same steps");
        store.verify_history(fork.id).expect("fork keeps the chain invariant");
    }
}

#[test]
fn out_of_range_indexes_are_rejected() {
    let store = Store::in_memory();
    let h = history_with_steps(&store, 2);
    for bad in [-1_i64, 3, i64::MAX, i64::MIN] {
        let err = store.fork_history(&h.id.into(), bad).unwrap_err();
        assert_eq!(err, ChainError::Range { index: bad, len: 2 });
    }
    assert_eq!(store.list_histories(h.user_id).expect("list").len(), 1, "failed forks leave nothing behind");
}

#[test]
fn unknown_source_is_not_found() {
    let store = Store::in_memory();
    let err = store.fork_history(&HistoryId::generate().into(), 0).unwrap_err();
    assert!(matches!(err, ChainError::NotFound { entity: "history", .. }), "got {err:?}");
}

#[test]
fn full_fork_creates_no_steps() {
    let store = Store::in_memory();
    let h = history_with_steps(&store, 3);
    let last = h.last_step().expect("last step");
    let fork = store.fork_history(&h.id.into(), 3).expect("full fork");
    assert_eq!(fork.steps, h.steps);
    assert!(store.next_steps(last).expect("next").is_empty(), "forking alone must not register new steps");
    let chain: Vec<_> = store.chain(last).expect("chain").into_iter().map(|s| s.id).collect();
    assert_eq!(chain, h.steps);
}

#[test]
fn source_and_fork_evolve_independently() {
    let store = Store::in_memory();
    let h = history_with_steps(&store, 2);
    let fork = store.fork_history(&h.id.into(), 2).expect("fork");

    let on_source = store.append_step(h.id, "text/plain", "source only").expect("append source");
    let on_fork = store.append_step(fork.id, "text/csv", "Gene 1,Value 1\nGene 2,Value 2").expect("append fork");

    let h = store.fetch_history(&h.id.into()).expect("h");
    let fork = store.fetch_history(&fork.id.into()).expect("fork");
    assert_eq!(h.len(), 3);
    assert_eq!(fork.len(), 3);
    assert!(!fork.steps.contains(&on_source.id));
    assert!(!h.steps.contains(&on_fork.id));
    let siblings: Vec<_> = store.next_steps(h.steps[1]).expect("next").into_iter().map(|s| s.id).collect();
    assert_eq!(siblings, vec![on_source.id, on_fork.id]);
}

#[test]
fn fork_of_fork_keeps_owner_and_derives_name() {
    let store = Store::in_memory();
    let h = history_with_steps(&store, 2);
    let f1 = store.fork_history(&h.id.into(), 2).expect("f1");
    let f2 = store.fork_history(&f1.id.into(), 1).expect("f2");
    assert_eq!(f1.name, "source (fork @2)");
    assert_eq!(f2.name, "source (fork @2) (fork @1)");
    assert_eq!(f2.user_id, h.user_id);
    assert_eq!(f2.steps, vec![h.steps[0]]);
}

#[test]
fn fork_of_empty_history() {
    let store = Store::in_memory();
    let h = history_with_steps(&store, 0);
    let fork = store.fork_history(&h.id.into(), 0).expect("fork empty");
    assert!(fork.is_empty());
    let root = store.append_step(fork.id, "text/plain", "first").expect("append");
    assert!(root.is_root());
}
