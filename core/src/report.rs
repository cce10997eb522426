//! Delta computation and ranking over stored snapshots.
//!
//! RULE: the report only reads; nothing here writes to the store.
//! A member needs both snapshot generations to be considered at all, and
//! a count that went backwards (resets, rollbacks) excludes them from the
//! ranking rather than showing up as negative activity.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{store::Member, types::MemberId};

/// One ranked line of the activity report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeltaRow {
    /// 1-based position after sorting.
    pub rank:         usize,
    pub member_id:    MemberId,
    /// Display name, or the id-derived fallback for unnamed members.
    pub label:        String,
    /// Crimes committed between the two snapshots. Zero is a valid delta.
    pub delta:        i64,
    pub period_start: DateTime<Utc>,
    pub period_end:   DateTime<Utc>,
}

/// A member left out of the ranking because their count went backwards.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkippedMember {
    pub member_id:      MemberId,
    pub label:          String,
    pub current_count:  i64,
    pub previous_count: i64,
}

impl SkippedMember {
    /// Human-readable reason citing both observed values.
    pub fn reason(&self) -> String {
        format!(
            "End count ({}) < Start count ({})",
            self.current_count, self.previous_count
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ActivityReport {
    pub rows:    Vec<DeltaRow>,
    pub skipped: Vec<SkippedMember>,
    /// Earliest previous fetch and latest current fetch across ranked
    /// members. `None` when nothing ranked.
    pub period:  Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Rank everyone with two snapshots by crimes committed between them,
/// most active first. Equal deltas keep their input order, so callers
/// passing a name-sorted roster get name-sorted ties.
pub fn build_report(members: &[Member]) -> ActivityReport {
    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for member in members {
        let (current, previous) = match (member.current, member.previous) {
            (Some(current), Some(previous)) => (current, previous),
            // Fewer than two snapshots: nothing to compare yet.
            _ => continue,
        };
        if current.crime_count < previous.crime_count {
            skipped.push(SkippedMember {
                member_id: member.member_id,
                label: member.label(),
                current_count: current.crime_count,
                previous_count: previous.crime_count,
            });
            continue;
        }
        rows.push(DeltaRow {
            rank: 0, // assigned below, once sorted
            member_id: member.member_id,
            label: member.label(),
            delta: current.crime_count - previous.crime_count,
            period_start: previous.fetched_at,
            period_end: current.fetched_at,
        });
    }

    // sort_by is stable, which is what keeps ties in input order.
    rows.sort_by(|a, b| b.delta.cmp(&a.delta));
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }

    let period = match (
        rows.iter().map(|row| row.period_start).min(),
        rows.iter().map(|row| row.period_end).max(),
    ) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };

    ActivityReport {
        rows,
        skipped,
        period,
    }
}
