use std::collections::BTreeSet;

use serde_json::json;
use stepchain_core::{HistorySelector, Store, StepId};

#[test]
fn fork_and_diverge_scenario() {
    let store = Store::in_memory();
    let u = store.create_user("test user", "foo@bar.com", Some("opaque-hash")).expect("create user");

    let h = store.create_history(u.id, "hist1").expect("create history");
    let a = store.append_step(h.id, "text/plain", "x").expect("append A");
    let b = store.append_step(h.id, "app/query", json!({"k": [1, 2, 3]})).expect("append B");

    let h2 = store.fork_history(&HistorySelector { id: h.id }, 1).expect("fork at 1");
    assert_eq!(h2.steps, vec![a.id]);
    assert_eq!(h2.user_id, u.id, "fork keeps the owner");

    let c = store.append_step(h2.id, "text/plain", "y").expect("append C");

    let h = store.fetch_history(&h.id.into()).expect("reload h");
    let h2 = store.fetch_history(&h2.id.into()).expect("reload h2");
    assert_eq!(h.steps, vec![a.id, b.id]);
    assert_eq!(h2.steps, vec![a.id, c.id]);

    let next_of_a: BTreeSet<StepId> = store.next_steps(a.id).expect("next of A").into_iter().map(|s| s.id).collect();
    assert_eq!(next_of_a, BTreeSet::from([b.id, c.id]));
    assert_eq!(store.fetch_step(b.id).expect("B").previous, Some(a.id));
    assert_eq!(store.fetch_step(c.id).expect("C").previous, Some(a.id));

    let b_loaded = store.fetch_step(b.id).expect("B");
    assert_eq!(b_loaded.payload["k"], json!([1, 2, 3]));
    assert_eq!(b_loaded.type_tag, "app/query");
}

#[test]
fn histories_are_listed_in_creation_order_with_forks_last() {
    let store = Store::in_memory();
    let u = store.create_user("lister", "l@x.org", None).expect("user");
    let names = ["hist1", "hist2", "hist3"];
    let created: Vec<_> = names.iter()
                               .map(|n| store.create_history(u.id, n).expect("history"))
                               .collect();
    store.append_step(created[1].id, "text/plain", "my search string").expect("append");

    let fork = store.fork_history(&created[0].id.into(), 0).expect("fork first history");

    let listed = store.list_histories(u.id).expect("list");
    let ids: Vec<_> = listed.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![created[0].id, created[1].id, created[2].id, fork.id]);
    assert!(listed.windows(2).all(|w| w[0].created_at < w[1].created_at));
    assert_eq!(listed[1].steps.len(), 1);
}

#[test]
fn new_user_has_no_histories() {
    let store = Store::in_memory();
    let u = store.create_user("fresh", "f@x.org", None).expect("user");
    assert!(store.list_histories(u.id).expect("list").is_empty());
    let same = store.fetch_user(&stepchain_core::UserSelector::Name("fresh".into())).expect("by name");
    assert_eq!(same, u);
}
