//! Report engine tests: deltas, ranking, skips, and the covered period.

use chrono::{DateTime, TimeZone, Utc};
use crimetrack_core::{
    report::build_report,
    store::{Member, StatSnapshot},
};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Snapshot pairs are (count, seconds) for brevity.
fn member(
    member_id: i64,
    name: Option<&str>,
    previous: Option<(i64, i64)>,
    current: Option<(i64, i64)>,
) -> Member {
    let snap = |(crime_count, secs): (i64, i64)| StatSnapshot {
        crime_count,
        fetched_at: ts(secs),
    };
    Member {
        member_id,
        api_key: "unused".into(),
        display_name: name.map(str::to_string),
        current: current.map(snap),
        previous: previous.map(snap),
    }
}

#[test]
fn forward_progress_is_ranked() {
    let report = build_report(&[member(1, Some("Ava"), Some((10, 100)), Some((15, 200)))]);

    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert_eq!(row.rank, 1);
    assert_eq!(row.delta, 5);
    assert_eq!(row.label, "Ava");
    assert_eq!(row.period_start, ts(100));
    assert_eq!(row.period_end, ts(200));
    assert!(report.skipped.is_empty());
}

/// A count that went backwards excludes the member with a reason naming
/// both values. It must never show up as a negative delta.
#[test]
fn regressed_count_is_skipped_with_reason() {
    let report = build_report(&[member(2, Some("Reset"), Some((500, 100)), Some((3, 200)))]);

    assert!(report.rows.is_empty(), "a regressed member must not be ranked");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason(), "End count (3) < Start count (500)");
}

/// Zero is a valid delta: inactivity is shown, not hidden.
#[test]
fn zero_delta_is_included() {
    let report = build_report(&[member(3, None, Some((7, 100)), Some((7, 200)))]);

    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].delta, 0);
    assert_eq!(report.rows[0].label, "User 3");
}

/// Members without both snapshot generations are invisible to the report.
#[test]
fn members_without_two_snapshots_are_ignored() {
    let report = build_report(&[
        member(1, Some("NeverFetched"), None, None),
        member(2, Some("FetchedOnce"), None, Some((40, 100))),
    ]);

    assert!(report.rows.is_empty());
    assert!(report.skipped.is_empty());
    assert!(report.period.is_none());
}

/// Deltas rank descending; equal deltas keep the input (name) order.
#[test]
fn ranking_is_descending_and_ties_keep_input_order() {
    let report = build_report(&[
        member(10, Some("Ada"), Some((0, 100)), Some((5, 200))),
        member(11, Some("Bo"), Some((0, 100)), Some((20, 200))),
        member(12, Some("Cy"), Some((0, 100)), Some((5, 200))),
        member(13, Some("Di"), Some((9, 100)), Some((9, 200))),
    ]);

    let ranked: Vec<_> = report
        .rows
        .iter()
        .map(|row| (row.rank, row.member_id, row.delta))
        .collect();
    assert_eq!(
        ranked,
        vec![(1, 11, 20), (2, 10, 5), (3, 12, 5), (4, 13, 0)],
        "ties must keep their input order (Ada before Cy)"
    );
}

/// The covered period spans only ranked members; a skipped member's
/// timestamps must not widen it.
#[test]
fn period_ignores_skipped_members() {
    let report = build_report(&[
        member(1, None, Some((10, 50)), Some((12, 300))),
        member(2, None, Some((10, 100)), Some((11, 400))),
        member(3, None, Some((900, 1)), Some((2, 999))),
    ]);

    assert_eq!(report.period, Some((ts(50), ts(400))));
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn empty_roster_produces_an_empty_report() {
    let report = build_report(&[]);

    assert!(report.rows.is_empty());
    assert!(report.skipped.is_empty());
    assert!(report.period.is_none());
}
