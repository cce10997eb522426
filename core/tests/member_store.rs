//! Member store tests: CRUD, snapshot shifting, ordering.

use chrono::{DateTime, TimeZone, Utc};
use crimetrack_core::{
    error::TrackerError,
    store::{MemberStore, StatSnapshot},
};

fn fresh_store() -> MemberStore {
    let store = MemberStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[test]
fn upsert_creates_a_member_with_no_snapshots() {
    let store = fresh_store();
    let member = store.upsert(2_296_830, "abc123", Some("Vinkuun")).unwrap();

    assert_eq!(member.member_id, 2_296_830);
    assert_eq!(member.api_key, "abc123");
    assert_eq!(member.display_name.as_deref(), Some("Vinkuun"));
    assert!(member.current.is_none(), "fresh member should have no current snapshot");
    assert!(member.previous.is_none(), "fresh member should have no previous snapshot");
    assert_eq!(
        store.get(2_296_830).unwrap(),
        Some(member),
        "upsert should hand back exactly what a follow-up get sees"
    );
}

/// Re-registering an id updates the credential and name but must not
/// disturb the stored snapshot history.
#[test]
fn upsert_refreshes_key_and_name_but_not_snapshots() {
    let store = fresh_store();
    store.upsert(7, "old-key", Some("Old Name")).unwrap();
    store.record_fetch(7, 120, ts(1_000)).unwrap();
    store.record_fetch(7, 150, ts(2_000)).unwrap();

    let member = store.upsert(7, "new-key", Some("New Name")).unwrap();

    assert_eq!(member.api_key, "new-key");
    assert_eq!(member.display_name.as_deref(), Some("New Name"));
    assert_eq!(
        member.previous,
        Some(StatSnapshot { crime_count: 120, fetched_at: ts(1_000) })
    );
    assert_eq!(
        member.current,
        Some(StatSnapshot { crime_count: 150, fetched_at: ts(2_000) })
    );
}

/// The two-generation shift: first fetch fills current, the second moves
/// it to previous, the third discards the oldest pair.
#[test]
fn record_fetch_shifts_current_into_previous() {
    let store = fresh_store();
    store.upsert(1, "key", None).unwrap();

    store.record_fetch(1, 10, ts(100)).unwrap();
    let after_first = store.get(1).unwrap().unwrap();
    assert_eq!(
        after_first.current,
        Some(StatSnapshot { crime_count: 10, fetched_at: ts(100) })
    );
    assert!(after_first.previous.is_none(), "one fetch fills only the current slot");

    store.record_fetch(1, 17, ts(200)).unwrap();
    let after_second = store.get(1).unwrap().unwrap();
    assert_eq!(
        after_second.previous,
        Some(StatSnapshot { crime_count: 10, fetched_at: ts(100) })
    );
    assert_eq!(
        after_second.current,
        Some(StatSnapshot { crime_count: 17, fetched_at: ts(200) })
    );

    store.record_fetch(1, 21, ts(300)).unwrap();
    let after_third = store.get(1).unwrap().unwrap();
    assert_eq!(
        after_third.previous,
        Some(StatSnapshot { crime_count: 17, fetched_at: ts(200) }),
        "the oldest snapshot should have been discarded"
    );
    assert_eq!(
        after_third.current,
        Some(StatSnapshot { crime_count: 21, fetched_at: ts(300) })
    );
}

#[test]
fn record_fetch_for_unknown_member_is_an_error() {
    let store = fresh_store();
    let err = store.record_fetch(404, 10, ts(1)).unwrap_err();
    assert!(
        matches!(err, TrackerError::MemberNotFound { member_id: 404 }),
        "expected MemberNotFound, got: {err}"
    );
}

#[test]
fn remove_deletes_the_member_and_reports_it() {
    let store = fresh_store();
    store.upsert(5, "key", Some("Bye")).unwrap();

    assert!(store.remove(5).unwrap());
    assert!(store.get(5).unwrap().is_none());
    assert_eq!(store.member_count().unwrap(), 0);
}

#[test]
fn remove_of_missing_id_changes_nothing() {
    let store = fresh_store();
    store.upsert(1, "k1", Some("Keep Me")).unwrap();
    let before = store.list_all().unwrap();

    assert!(!store.remove(999).unwrap(), "removing an unknown id should report false");
    assert_eq!(store.list_all().unwrap(), before, "table must be unchanged");
}

#[test]
fn get_of_unknown_id_is_none() {
    let store = fresh_store();
    assert!(store.get(12_345).unwrap().is_none());
}

#[test]
fn list_orders_by_name_case_insensitively() {
    let store = fresh_store();
    store.upsert(3, "k", Some("charlie")).unwrap();
    store.upsert(1, "k", Some("Alice")).unwrap();
    store.upsert(2, "k", Some("bob")).unwrap();

    let ids: Vec<_> = store
        .list_all()
        .unwrap()
        .into_iter()
        .map(|m| m.member_id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

/// Members with no name sort under their id-derived label instead of
/// clumping at one end of the list.
#[test]
fn unnamed_members_sort_under_their_fallback_label() {
    let store = fresh_store();
    store.upsert(9, "k", Some("Alice")).unwrap();
    store.upsert(5, "k", None).unwrap(); // sorts as "User 5"
    store.upsert(2, "k", Some("zed")).unwrap();

    let ids: Vec<_> = store
        .list_all()
        .unwrap()
        .into_iter()
        .map(|m| m.member_id)
        .collect();
    assert_eq!(ids, vec![9, 5, 2], "'User 5' lands between Alice and zed");
}

#[test]
fn empty_store_lists_nothing() {
    let store = fresh_store();
    assert!(store.list_all().unwrap().is_empty());
    assert_eq!(store.member_count().unwrap(), 0);
}

#[test]
fn snapshot_timestamps_survive_storage_exactly() {
    let store = fresh_store();
    store.upsert(1, "k", None).unwrap();

    let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    store.record_fetch(1, 42, at).unwrap();

    let member = store.get(1).unwrap().unwrap();
    assert_eq!(
        member.current.unwrap().fetched_at,
        at,
        "RFC 3339 round-trip should be lossless"
    );
}
