//! Anchor-relative task-set generation and the scheduled sweep.
//!
//! Each editorial event carries two anchor dates: the day preparation
//! starts and the go-live ("post") day. A fixed seven-task checklist is
//! derived from offsets against those anchors and materialized
//! idempotently; the hourly sweep re-applies the generator to every event
//! whose preparation date has arrived.

use super::events::{
    comm_task_titles_in, get_event_internal, insert_comm_task_in, list_due_events_in,
    stamp_template_applied_in, NewCommTask,
};
use super::Database;
use crate::clock::Clock;
use crate::dates::{add_days, format_date, parse_date};
use crate::error::EngineError;
use crate::types::{AnchorGeneration, EditorialEvent, SweepOutcome};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{debug, info};

/// Which anchor a checklist offset is relative to.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    Prep,
    Post,
}

/// The fixed checklist: title, anchor, and day offset.
const ANCHOR_CHECKLIST: [(&str, Anchor, i64); 7] = [
    ("Brief", Anchor::Prep, 0),
    ("Angles", Anchor::Prep, 2),
    ("Copy", Anchor::Post, -7),
    ("Visuels", Anchor::Post, -5),
    ("Validation", Anchor::Post, -2),
    ("Programmation", Anchor::Post, -1),
    ("REX", Anchor::Post, 2),
];

/// Due dates for the checklist, clamped so no task is due before
/// preparation officially starts.
fn anchor_due_dates(prep: NaiveDate, post: NaiveDate) -> Vec<(&'static str, NaiveDate)> {
    ANCHOR_CHECKLIST
        .iter()
        .map(|&(title, anchor, offset)| {
            let base = match anchor {
                Anchor::Prep => prep,
                Anchor::Post => post,
            };
            let raw = add_days(base, offset);
            (title, raw.max(prep))
        })
        .collect()
}

/// Apply the anchor generator to one event inside an existing transaction.
///
/// The duplicate check is title-only: a task renamed by a user no longer
/// counts, so the next pass re-creates its original title.
fn ensure_anchor_tasks_in(
    conn: &Connection,
    clock: &dyn Clock,
    event: &EditorialEvent,
    actor_id: Option<&str>,
) -> Result<AnchorGeneration> {
    let assignee = event
        .owner_profile_id
        .as_deref()
        .or(event.backup_owner_profile_id.as_deref())
        .ok_or_else(|| EngineError::no_assignable_owner(&event.id))?;

    let prep = parse_date("prepStartDate", &event.prep_start_date)?;
    let post = parse_date("startDate", &event.start_date)?;

    let mut titles: HashSet<String> = comm_task_titles_in(conn, &event.id)?.into_iter().collect();

    let mut created_count = 0;
    for (title, due) in anchor_due_dates(prep, post) {
        if titles.contains(title) {
            continue;
        }

        insert_comm_task_in(
            conn,
            &NewCommTask {
                event_id: &event.id,
                title,
                due_date: &format_date(due),
                assignee_id: assignee,
                created_by_profile_id: actor_id,
            },
        )?;
        titles.insert(title.to_string());
        created_count += 1;
    }

    let all_present = ANCHOR_CHECKLIST
        .iter()
        .all(|(title, _, _)| titles.contains(*title));

    let patched_template_applied_at = if all_present {
        stamp_template_applied_in(conn, &event.id, &format_date(clock.today()))?
    } else {
        false
    };

    debug!(
        event_id = %event.id,
        created = created_count,
        patched = patched_template_applied_at,
        "anchor task generation finished"
    );

    Ok(AnchorGeneration {
        created_count,
        patched_template_applied_at,
    })
}

impl Database {
    /// Materialize the seven-task checklist for one event.
    ///
    /// Idempotent per title; fails with a precondition error (writing
    /// nothing) when the event has neither owner nor backup owner.
    pub fn ensure_anchor_tasks(
        &self,
        clock: &dyn Clock,
        event_id: &str,
        actor_id: Option<&str>,
    ) -> Result<AnchorGeneration> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let event = get_event_internal(&tx, event_id)?
                .ok_or_else(|| EngineError::event_not_found(event_id))?;
            let result = ensure_anchor_tasks_in(&tx, clock, &event, actor_id)?;
            tx.commit()?;
            Ok(result)
        })
    }

    /// One scheduled sweep pass: apply the anchor generator to every due
    /// event whose auto-generation flag is set.
    ///
    /// The entire pass is a single transaction. A failure on any candidate
    /// rolls back everything the run wrote, including tasks created for
    /// earlier events; the next tick retries the whole batch, which is
    /// safe because generation is idempotent.
    pub fn sweep_due_events(&self, clock: &dyn Clock) -> Result<SweepOutcome> {
        let today = format_date(clock.today());

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let candidates = list_due_events_in(&tx, &today)?;
            let scanned = candidates.len();
            let mut created = 0;
            let mut patched = 0;

            for event in &candidates {
                if !event.auto_create_template_tasks {
                    continue;
                }
                let result =
                    ensure_anchor_tasks_in(&tx, clock, event, event.owner_profile_id.as_deref())?;
                created += result.created_count;
                if result.patched_template_applied_at {
                    patched += 1;
                }
            }

            tx.commit()?;

            info!(today = %today, scanned, created, patched, "sweep finished");
            Ok(SweepOutcome {
                today,
                scanned,
                created,
                patched,
            })
        })
    }
}
