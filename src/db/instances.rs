//! Instance store: concrete dated work items.
//!
//! Lookups used by the generators are indexed two ways: `(assignee_id, date)`
//! for the daily duplicate check and `(template_id, date)` for weekly
//! reconciliation. Store order within one call is `created_at, id`, which is
//! what makes "first existing instance wins" a deterministic tie-break.

use super::{now_ms, Database};
use crate::error::EngineError;
use crate::types::{Period, Priority, TaskInstance};
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

/// Input for inserting an instance.
#[derive(Debug, Clone, Default)]
pub struct NewInstance {
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub due_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub priority: Priority,
    pub status: Option<String>,
    pub assignee_id: Option<String>,
    pub period: Option<Period>,
    pub entry_type: Option<String>,
    pub is_recurring_instance: bool,
    pub template_id: Option<String>,
}

pub(crate) fn parse_instance_row(row: &Row) -> rusqlite::Result<TaskInstance> {
    let period_str: String = row.get("period")?;

    Ok(TaskInstance {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        date: row.get("date")?,
        due_date: row.get("due_date")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        priority: row.get("priority")?,
        status: row.get("status")?,
        assignee_id: row.get("assignee_id")?,
        period: Period::parse(&period_str),
        entry_type: row.get("entry_type")?,
        is_recurring_instance: row.get("is_recurring_instance")?,
        template_id: row.get("template_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Instances on one date for one assignee (NULL assignee matches NULL).
pub(crate) fn instances_for_assignee_on(
    conn: &Connection,
    assignee_id: Option<&str>,
    date: &str,
) -> Result<Vec<TaskInstance>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM instances
         WHERE assignee_id IS ?1 AND date = ?2
         ORDER BY created_at, id",
    )?;

    let instances = stmt
        .query_map(params![assignee_id, date], parse_instance_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(instances)
}

/// Weekly recurring instances for one `(template_id, date)` pair, in stable
/// store order. The first element is the canonical survivor when duplicates
/// need healing.
pub(crate) fn weekly_instances_for(
    conn: &Connection,
    template_id: &str,
    date: &str,
) -> Result<Vec<TaskInstance>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM instances
         WHERE template_id = ?1 AND date = ?2
           AND is_recurring_instance = 1 AND period = 'weekly'
         ORDER BY created_at, id",
    )?;

    let instances = stmt
        .query_map(params![template_id, date], parse_instance_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(instances)
}

pub(crate) fn insert_instance_in(conn: &Connection, input: &NewInstance) -> Result<String> {
    let id = Uuid::now_v7().to_string();
    let now = now_ms();

    conn.execute(
        "INSERT INTO instances (
            id, title, description, date, due_date, start_time, end_time,
            priority, status, assignee_id, period, entry_type,
            is_recurring_instance, template_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            &id,
            &input.title,
            &input.description,
            &input.date,
            &input.due_date,
            &input.start_time,
            &input.end_time,
            input.priority,
            input.status.as_deref().unwrap_or("todo"),
            &input.assignee_id,
            input.period.unwrap_or(Period::None).as_str(),
            input.entry_type.as_deref().unwrap_or("task"),
            input.is_recurring_instance,
            &input.template_id,
            now,
            now,
        ],
    )?;

    Ok(id)
}

pub(crate) fn delete_instance_in(conn: &Connection, instance_id: &str) -> Result<()> {
    conn.execute("DELETE FROM instances WHERE id = ?1", params![instance_id])?;
    Ok(())
}

/// Patch a named subset of instance columns, refreshing `updated_at`.
/// `changes` pairs column names (engine-controlled, never caller input)
/// with new values.
pub(crate) fn patch_instance_in(
    conn: &Connection,
    instance_id: &str,
    changes: &[(&str, Value)],
) -> Result<()> {
    if changes.is_empty() {
        return Ok(());
    }

    let mut sets: Vec<String> = Vec::with_capacity(changes.len() + 1);
    let mut values: Vec<Value> = Vec::with_capacity(changes.len() + 2);

    for (i, (column, value)) in changes.iter().enumerate() {
        sets.push(format!("{} = ?{}", column, i + 1));
        values.push(value.clone());
    }
    sets.push(format!("updated_at = ?{}", changes.len() + 1));
    values.push(Value::Integer(now_ms()));
    values.push(Value::Text(instance_id.to_string()));

    let sql = format!(
        "UPDATE instances SET {} WHERE id = ?{}",
        sets.join(", "),
        changes.len() + 2
    );
    conn.execute(&sql, params_from_iter(values))?;

    Ok(())
}

impl Database {
    /// Insert an ad-hoc instance (not driven by a rule).
    pub fn insert_instance(&self, input: NewInstance) -> Result<TaskInstance> {
        self.with_conn(|conn| {
            let id = insert_instance_in(conn, &input)?;
            get_instance_internal(conn, &id)?
                .ok_or_else(|| EngineError::instance_not_found(&id).into())
        })
    }

    /// Get an instance by ID.
    pub fn get_instance(&self, instance_id: &str) -> Result<Option<TaskInstance>> {
        self.with_conn(|conn| get_instance_internal(conn, instance_id))
    }

    /// Delete an instance by ID.
    pub fn delete_instance(&self, instance_id: &str) -> Result<()> {
        self.with_conn(|conn| delete_instance_in(conn, instance_id))
    }

    /// All instances dated within the inclusive range, in store order.
    pub fn list_instances_between(&self, start: &str, end: &str) -> Result<Vec<TaskInstance>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM instances
                 WHERE date >= ?1 AND date <= ?2
                 ORDER BY date, created_at, id",
            )?;
            let instances = stmt
                .query_map(params![start, end], parse_instance_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(instances)
        })
    }

    /// Instances produced by one rule, in store order.
    pub fn list_instances_for_template(&self, template_id: &str) -> Result<Vec<TaskInstance>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM instances
                 WHERE template_id = ?1
                 ORDER BY date, created_at, id",
            )?;
            let instances = stmt
                .query_map(params![template_id], parse_instance_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(instances)
        })
    }
}

fn get_instance_internal(conn: &Connection, instance_id: &str) -> Result<Option<TaskInstance>> {
    let mut stmt = conn.prepare("SELECT * FROM instances WHERE id = ?1")?;

    let result = stmt.query_row(params![instance_id], parse_instance_row);

    match result {
        Ok(instance) => Ok(Some(instance)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
