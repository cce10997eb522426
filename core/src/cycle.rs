//! Bulk fetch cycle.
//!
//! One sequential pass over the whole roster: fetch each member's count
//! with their own key, shift their snapshots on success, skip them on
//! failure. A pause between consecutive calls keeps the remote service's
//! rate limiter happy; there is no pause before the first call or after
//! the last.

use std::time::Duration;

use chrono::Utc;

use crate::{
    error::TrackerResult,
    fetcher::{FetchError, StatFetcher},
    store::MemberStore,
    types::MemberId,
};

/// Progress notifications emitted while the cycle runs, in roster order.
/// The interactive session renders them live; tests collect them.
#[derive(Debug, Clone)]
pub enum CycleEvent {
    /// About to call the remote service for this member.
    Fetching {
        position:  usize,
        total:     usize,
        member_id: MemberId,
        label:     String,
    },
    /// The member's new count was stored and their snapshots shifted.
    Fetched { member_id: MemberId, crime_count: i64 },
    /// The member is skipped this cycle; their snapshots are untouched.
    Failed { member_id: MemberId, error: FetchError },
}

/// Totals for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed:    usize,
}

/// Fetch every tracked member once. Per-member failures are reported
/// through the observer and counted; only storage errors abort the cycle.
pub fn run_fetch_cycle(
    store: &MemberStore,
    fetcher: &dyn StatFetcher,
    delay: Duration,
    observer: &mut dyn FnMut(CycleEvent),
) -> TrackerResult<CycleReport> {
    let members = store.list_all()?;
    let total = members.len();
    let mut report = CycleReport::default();

    for (index, member) in members.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            std::thread::sleep(delay);
        }
        report.attempted += 1;
        observer(CycleEvent::Fetching {
            position: index + 1,
            total,
            member_id: member.member_id,
            label: member.label(),
        });

        match fetcher.fetch(member.member_id, &member.api_key) {
            Ok(crime_count) => {
                store.record_fetch(member.member_id, crime_count, Utc::now())?;
                report.succeeded += 1;
                log::info!(
                    "fetched member {} ({}): {} crimes",
                    member.member_id,
                    member.label(),
                    crime_count
                );
                observer(CycleEvent::Fetched {
                    member_id: member.member_id,
                    crime_count,
                });
            }
            Err(error) => {
                report.failed += 1;
                log::warn!(
                    "fetch failed for member {} ({}): {}",
                    member.member_id,
                    member.label(),
                    error
                );
                observer(CycleEvent::Failed {
                    member_id: member.member_id,
                    error,
                });
            }
        }
    }

    log::debug!(
        "cycle complete: {}/{} succeeded, {} failed",
        report.succeeded,
        report.attempted,
        report.failed
    );
    Ok(report)
}
