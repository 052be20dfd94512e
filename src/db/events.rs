//! Editorial event and communication-task store.
//!
//! Events are read-mostly to the engine: the only field it ever writes is
//! `template_applied_at`, stamped once by the anchor task-set generator.
//! Communication tasks are keyed to an event by a plain `event_id` column.

use super::{now_ms, Database};
use crate::dates::parse_date;
use crate::error::EngineError;
use crate::types::{CommunicationTask, EditorialEvent};
use anyhow::Result;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Input for creating an editorial event.
#[derive(Debug, Clone, Default)]
pub struct EventInput {
    pub title: String,
    /// Anchor: the date preparation work starts.
    pub prep_start_date: String,
    /// Anchor: the go-live ("post") date.
    pub start_date: String,
    pub owner_profile_id: Option<String>,
    pub backup_owner_profile_id: Option<String>,
    pub auto_create_template_tasks: bool,
}

pub(crate) fn parse_event_row(row: &Row) -> rusqlite::Result<EditorialEvent> {
    Ok(EditorialEvent {
        id: row.get("id")?,
        title: row.get("title")?,
        prep_start_date: row.get("prep_start_date")?,
        start_date: row.get("start_date")?,
        owner_profile_id: row.get("owner_profile_id")?,
        backup_owner_profile_id: row.get("backup_owner_profile_id")?,
        auto_create_template_tasks: row.get("auto_create_template_tasks")?,
        template_applied_at: row.get("template_applied_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_comm_task_row(row: &Row) -> rusqlite::Result<CommunicationTask> {
    let checklist_json: String = row.get("checklist")?;

    Ok(CommunicationTask {
        id: row.get("id")?,
        event_id: row.get("event_id")?,
        title: row.get("title")?,
        due_date: row.get("due_date")?,
        status: row.get("status")?,
        assignee_id: row.get("assignee_id")?,
        created_by_profile_id: row.get("created_by_profile_id")?,
        checklist: serde_json::from_str(&checklist_json).unwrap_or_default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn get_event_internal(conn: &Connection, event_id: &str) -> Result<Option<EditorialEvent>> {
    let mut stmt = conn.prepare("SELECT * FROM events WHERE id = ?1")?;

    let result = stmt.query_row(params![event_id], parse_event_row);

    match result {
        Ok(event) => Ok(Some(event)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Events whose preparation date has arrived (unbounded below: an event due
/// months ago is still a candidate on every run).
pub(crate) fn list_due_events_in(conn: &Connection, today: &str) -> Result<Vec<EditorialEvent>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM events
         WHERE prep_start_date <= ?1
         ORDER BY prep_start_date, id",
    )?;

    let events = stmt
        .query_map(params![today], parse_event_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Existing communication-task titles for one event. This is the anchor
/// generator's entire duplicate check.
pub(crate) fn comm_task_titles_in(conn: &Connection, event_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT title FROM comm_tasks WHERE event_id = ?1")?;

    let titles = stmt
        .query_map(params![event_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(titles)
}

pub(crate) struct NewCommTask<'a> {
    pub event_id: &'a str,
    pub title: &'a str,
    pub due_date: &'a str,
    pub assignee_id: &'a str,
    pub created_by_profile_id: Option<&'a str>,
}

pub(crate) fn insert_comm_task_in(conn: &Connection, input: &NewCommTask) -> Result<String> {
    let id = Uuid::now_v7().to_string();
    let now = now_ms();

    conn.execute(
        "INSERT INTO comm_tasks (
            id, event_id, title, due_date, status, assignee_id,
            created_by_profile_id, checklist, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, 'todo', ?5, ?6, '[]', ?7, ?8)",
        params![
            &id,
            input.event_id,
            input.title,
            input.due_date,
            input.assignee_id,
            input.created_by_profile_id,
            now,
            now,
        ],
    )?;

    Ok(id)
}

/// Stamp `template_applied_at` if it is still unset. Returns whether the
/// stamp was written; a previously stamped event is left untouched.
pub(crate) fn stamp_template_applied_in(
    conn: &Connection,
    event_id: &str,
    today: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE events SET template_applied_at = ?2, updated_at = ?3
         WHERE id = ?1 AND template_applied_at IS NULL",
        params![event_id, today, now_ms()],
    )?;
    Ok(changed > 0)
}

impl Database {
    /// Create an editorial event.
    pub fn create_event(&self, input: EventInput) -> Result<EditorialEvent> {
        parse_date("prepStartDate", &input.prep_start_date)?;
        parse_date("startDate", &input.start_date)?;

        let id = Uuid::now_v7().to_string();
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (
                    id, title, prep_start_date, start_date, owner_profile_id,
                    backup_owner_profile_id, auto_create_template_tasks,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    &id,
                    &input.title,
                    &input.prep_start_date,
                    &input.start_date,
                    &input.owner_profile_id,
                    &input.backup_owner_profile_id,
                    input.auto_create_template_tasks,
                    now,
                    now,
                ],
            )?;

            Ok(EditorialEvent {
                id,
                title: input.title,
                prep_start_date: input.prep_start_date,
                start_date: input.start_date,
                owner_profile_id: input.owner_profile_id,
                backup_owner_profile_id: input.backup_owner_profile_id,
                auto_create_template_tasks: input.auto_create_template_tasks,
                template_applied_at: None,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get an event by ID.
    pub fn get_event(&self, event_id: &str) -> Result<Option<EditorialEvent>> {
        self.with_conn(|conn| get_event_internal(conn, event_id))
    }

    /// Communication tasks for one event, in store order.
    pub fn list_comm_tasks(&self, event_id: &str) -> Result<Vec<CommunicationTask>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM comm_tasks WHERE event_id = ?1 ORDER BY created_at, id",
            )?;
            let tasks = stmt
                .query_map(params![event_id], parse_comm_task_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    /// Delete a communication task (user edit path). The engine itself
    /// never deletes these; `template_applied_at` stays stamped regardless.
    pub fn delete_comm_task(&self, task_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM comm_tasks WHERE id = ?1", params![task_id])?;
            Ok(())
        })
    }

    /// Rename a communication task (user edit path).
    pub fn rename_comm_task(&self, task_id: &str, title: &str) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comm_tasks SET title = ?2, updated_at = ?3 WHERE id = ?1",
                params![task_id, title, now_ms()],
            )?;
            if changed == 0 {
                return Err(EngineError::instance_not_found(task_id).into());
            }
            Ok(())
        })
    }
}
