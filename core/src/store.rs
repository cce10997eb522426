//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The fetch cycle, report engine, and session call store methods; they
//! never execute SQL directly.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::{
    error::{TrackerError, TrackerResult},
    types::MemberId,
};

/// One observed (count, time) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub crime_count: i64,
    pub fetched_at: DateTime<Utc>,
}

/// A tracked faction member as stored: identity, credential, and up to two
/// generations of crime-count snapshots.
///
/// A generation's count and timestamp travel together: either the pair is
/// fully present or fully absent. The schema enforces the same rule with
/// CHECK constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id:    MemberId,
    pub api_key:      String,
    pub display_name: Option<String>,
    pub current:      Option<StatSnapshot>,
    pub previous:     Option<StatSnapshot>,
}

impl Member {
    /// Name for display. Members without one get a stable label derived
    /// from their id.
    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => format!("User {}", self.member_id),
        }
    }
}

pub struct MemberStore {
    conn: Connection,
}

impl MemberStore {
    /// Open (or create) the tracker database at `path`.
    pub fn open(path: &str) -> TrackerResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> TrackerResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> TrackerResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_members.sql"))?;
        Ok(())
    }

    // ── Member rows ────────────────────────────────────────────

    /// Insert a member, or refresh the key and name of an existing one.
    /// Stored snapshots are never touched here; only `record_fetch` moves
    /// them.
    pub fn upsert(
        &self,
        member_id: MemberId,
        api_key: &str,
        display_name: Option<&str>,
    ) -> TrackerResult<Member> {
        self.conn.execute(
            "INSERT INTO members (member_id, api_key, display_name)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(member_id) DO UPDATE SET
                api_key = excluded.api_key,
                display_name = excluded.display_name",
            params![member_id, api_key, display_name],
        )?;
        self.get(member_id)?
            .ok_or(TrackerError::MemberNotFound { member_id })
    }

    /// Delete a member and their snapshots. Returns whether a row existed.
    pub fn remove(&self, member_id: MemberId) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM members WHERE member_id = ?1", params![member_id])?;
        Ok(changed > 0)
    }

    pub fn get(&self, member_id: MemberId) -> TrackerResult<Option<Member>> {
        let raw = self
            .conn
            .query_row(
                "SELECT member_id, api_key, display_name,
                        current_crime_count, current_fetched_at,
                        previous_crime_count, previous_fetched_at
                 FROM members WHERE member_id = ?1",
                params![member_id],
                read_member_row,
            )
            .optional()?;
        raw.map(assemble_member).transpose()
    }

    /// Every member, ordered by name (case-insensitive). Unnamed members
    /// slot in under their fallback label, and ties break by id.
    pub fn list_all(&self) -> TrackerResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(
            "SELECT member_id, api_key, display_name,
                    current_crime_count, current_fetched_at,
                    previous_crime_count, previous_fetched_at
             FROM members
             ORDER BY COALESCE(display_name, 'User ' || member_id) COLLATE NOCASE,
                      member_id",
        )?;
        let raw = stmt
            .query_map([], read_member_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(assemble_member).collect()
    }

    /// Store a freshly fetched count, shifting the stored current snapshot
    /// into the previous slot. A single UPDATE: SQLite evaluates the
    /// right-hand sides against the pre-update row, so the shift and the
    /// write land together or not at all.
    pub fn record_fetch(
        &self,
        member_id: MemberId,
        crime_count: i64,
        fetched_at: DateTime<Utc>,
    ) -> TrackerResult<()> {
        let changed = self.conn.execute(
            "UPDATE members SET
                previous_crime_count = current_crime_count,
                previous_fetched_at  = current_fetched_at,
                current_crime_count  = ?1,
                current_fetched_at   = ?2
             WHERE member_id = ?3",
            params![crime_count, fetched_at.to_rfc3339(), member_id],
        )?;
        if changed == 0 {
            return Err(TrackerError::MemberNotFound { member_id });
        }
        Ok(())
    }

    pub fn member_count(&self) -> TrackerResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
        Ok(count)
    }
}

type RawMemberRow = (
    MemberId,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<i64>,
    Option<String>,
);

fn read_member_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMemberRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn assemble_member(raw: RawMemberRow) -> TrackerResult<Member> {
    let (member_id, api_key, display_name, cur_count, cur_at, prev_count, prev_at) = raw;
    Ok(Member {
        member_id,
        api_key,
        display_name,
        current: pair_snapshot(member_id, cur_count, cur_at)?,
        previous: pair_snapshot(member_id, prev_count, prev_at)?,
    })
}

fn pair_snapshot(
    member_id: MemberId,
    count: Option<i64>,
    fetched_at: Option<String>,
) -> TrackerResult<Option<StatSnapshot>> {
    match (count, fetched_at) {
        (None, None) => Ok(None),
        (Some(crime_count), Some(raw)) => {
            let fetched_at = DateTime::parse_from_rfc3339(&raw)
                .map_err(|_| TrackerError::CorruptSnapshot { member_id })?
                .with_timezone(&Utc);
            Ok(Some(StatSnapshot {
                crime_count,
                fetched_at,
            }))
        }
        // The schema CHECKs forbid half a pair, but a foreign database
        // file might not carry them.
        _ => Err(TrackerError::CorruptSnapshot { member_id }),
    }
}
