//! Template rule store: persisted recurrence declarations.
//!
//! User-facing CRUD mutates rules; the generators only read them. Rules are
//! never deleted by the engine, so instances holding a `template_id`
//! back-reference can outlive the rule that produced them.

use super::{now_ms, Database};
use crate::dates::parse_date;
use crate::error::EngineError;
use crate::types::{Priority, RuleKind, RuleScope, TemplateRule, Weekday, PRIORITY_DEFAULT};
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

/// Input for creating a daily fixed-block rule.
#[derive(Debug, Clone, Default)]
pub struct DailyTemplateInput {
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<String>,
    pub creator_id: Option<String>,
}

/// Input for creating a weekly reminder rule.
#[derive(Debug, Clone)]
pub struct WeeklyTemplateInput {
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub priority: Option<Priority>,
    pub weekday: Weekday,
    /// Inclusive start of the active window.
    pub start_date: String,
    /// Inclusive end of the active window; `None` leaves it open-ended.
    pub end_date: Option<String>,
    pub assignee_id: Option<String>,
    pub creator_id: Option<String>,
}

/// Partial update of a rule. `Option<Option<_>>` fields distinguish
/// "leave unchanged" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_time: Option<Option<String>>,
    pub end_time: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub weekday: Option<Weekday>,
    pub start_date: Option<String>,
    pub end_date: Option<Option<String>>,
    pub assignee_id: Option<Option<String>>,
    pub active: Option<bool>,
}

pub(crate) fn parse_template_row(row: &Row) -> rusqlite::Result<TemplateRule> {
    let kind_str: String = row.get("kind")?;
    let weekday_str: Option<String> = row.get("weekday")?;

    Ok(TemplateRule {
        id: row.get("id")?,
        // The CHECK constraint keeps kind within the known set.
        kind: RuleKind::parse(&kind_str).unwrap_or(RuleKind::DailyBlock),
        title: row.get("title")?,
        description: row.get("description")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        priority: row.get("priority")?,
        weekday: weekday_str.as_deref().and_then(Weekday::parse),
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        assignee_id: row.get("assignee_id")?,
        creator_id: row.get("creator_id")?,
        active: row.get("active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// List rules of one kind within a caller scope, in stable store order.
/// `active_only` drops deactivated rules; the weekly reconciler needs them
/// (a deactivated rule still owns instances to delete), the daily generator
/// does not.
pub(crate) fn list_templates_in(
    conn: &Connection,
    kind: RuleKind,
    scope: &RuleScope,
    active_only: bool,
) -> Result<Vec<TemplateRule>> {
    let mut sql = String::from("SELECT * FROM templates WHERE kind = ?1");
    let mut values: Vec<Value> = vec![Value::Text(kind.as_str().to_string())];

    if active_only {
        sql.push_str(" AND active = 1");
    }
    if let Some(ref assignee) = scope.assignee_id {
        sql.push_str(&format!(" AND assignee_id = ?{}", values.len() + 1));
        values.push(Value::Text(assignee.clone()));
    }
    sql.push_str(" ORDER BY created_at, id");

    let mut stmt = conn.prepare(&sql)?;
    let templates = stmt
        .query_map(params_from_iter(values), parse_template_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(templates)
}

fn get_template_internal(conn: &Connection, template_id: &str) -> Result<Option<TemplateRule>> {
    let mut stmt = conn.prepare("SELECT * FROM templates WHERE id = ?1")?;

    let result = stmt.query_row(params![template_id], parse_template_row);

    match result {
        Ok(template) => Ok(Some(template)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Create a daily fixed-block rule.
    pub fn create_daily_template(&self, input: DailyTemplateInput) -> Result<TemplateRule> {
        let id = Uuid::now_v7().to_string();
        let now = now_ms();
        let priority = input.priority.unwrap_or(PRIORITY_DEFAULT);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO templates (
                    id, kind, title, description, start_time, end_time, priority,
                    assignee_id, creator_id, active, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?11)",
                params![
                    &id,
                    RuleKind::DailyBlock.as_str(),
                    &input.title,
                    &input.description,
                    &input.start_time,
                    &input.end_time,
                    priority,
                    &input.assignee_id,
                    &input.creator_id,
                    now,
                    now,
                ],
            )?;

            Ok(TemplateRule {
                id,
                kind: RuleKind::DailyBlock,
                title: input.title,
                description: input.description,
                start_time: input.start_time,
                end_time: input.end_time,
                priority,
                weekday: None,
                start_date: None,
                end_date: None,
                assignee_id: input.assignee_id,
                creator_id: input.creator_id,
                active: true,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Create a weekly reminder rule bound to a weekday and active window.
    pub fn create_weekly_template(&self, input: WeeklyTemplateInput) -> Result<TemplateRule> {
        parse_date("startDate", &input.start_date)?;
        if let Some(ref end) = input.end_date {
            parse_date("endDate", end)?;
        }

        let id = Uuid::now_v7().to_string();
        let now = now_ms();
        let priority = input.priority.unwrap_or(PRIORITY_DEFAULT);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO templates (
                    id, kind, title, description, start_time, end_time, priority,
                    weekday, start_date, end_date, assignee_id, creator_id,
                    active, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, ?13, ?14)",
                params![
                    &id,
                    RuleKind::WeeklyReminder.as_str(),
                    &input.title,
                    &input.description,
                    &input.start_time,
                    &input.end_time,
                    priority,
                    input.weekday.as_str(),
                    &input.start_date,
                    &input.end_date,
                    &input.assignee_id,
                    &input.creator_id,
                    now,
                    now,
                ],
            )?;

            Ok(TemplateRule {
                id,
                kind: RuleKind::WeeklyReminder,
                title: input.title,
                description: input.description,
                start_time: input.start_time,
                end_time: input.end_time,
                priority,
                weekday: Some(input.weekday),
                start_date: Some(input.start_date),
                end_date: input.end_date,
                assignee_id: input.assignee_id,
                creator_id: input.creator_id,
                active: true,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get a rule by ID.
    pub fn get_template(&self, template_id: &str) -> Result<Option<TemplateRule>> {
        self.with_conn(|conn| get_template_internal(conn, template_id))
    }

    /// List rules of one kind visible in the given scope.
    pub fn list_templates(
        &self,
        kind: RuleKind,
        scope: &RuleScope,
        active_only: bool,
    ) -> Result<Vec<TemplateRule>> {
        self.with_conn(|conn| list_templates_in(conn, kind, scope, active_only))
    }

    /// Apply a partial update to a rule.
    pub fn update_template(&self, template_id: &str, update: TemplateUpdate) -> Result<TemplateRule> {
        if let Some(ref start) = update.start_date {
            parse_date("startDate", start)?;
        }
        if let Some(Some(ref end)) = update.end_date {
            parse_date("endDate", end)?;
        }

        let now = now_ms();

        self.with_conn(|conn| {
            let current = get_template_internal(conn, template_id)?
                .ok_or_else(|| EngineError::template_not_found(template_id))?;

            let title = update.title.unwrap_or(current.title);
            let description = update.description.unwrap_or(current.description);
            let start_time = update.start_time.unwrap_or(current.start_time);
            let end_time = update.end_time.unwrap_or(current.end_time);
            let priority = update.priority.unwrap_or(current.priority);
            let weekday = update.weekday.or(current.weekday);
            let start_date = update.start_date.or(current.start_date);
            let end_date = update.end_date.unwrap_or(current.end_date);
            let assignee_id = update.assignee_id.unwrap_or(current.assignee_id);
            let active = update.active.unwrap_or(current.active);

            conn.execute(
                "UPDATE templates SET
                    title = ?2, description = ?3, start_time = ?4, end_time = ?5,
                    priority = ?6, weekday = ?7, start_date = ?8, end_date = ?9,
                    assignee_id = ?10, active = ?11, updated_at = ?12
                 WHERE id = ?1",
                params![
                    template_id,
                    &title,
                    &description,
                    &start_time,
                    &end_time,
                    priority,
                    weekday.map(|w| w.as_str()),
                    &start_date,
                    &end_date,
                    &assignee_id,
                    active,
                    now,
                ],
            )?;

            Ok(TemplateRule {
                id: template_id.to_string(),
                kind: current.kind,
                title,
                description,
                start_time,
                end_time,
                priority,
                weekday,
                start_date,
                end_date,
                assignee_id,
                creator_id: current.creator_id,
                active,
                created_at: current.created_at,
                updated_at: now,
            })
        })
    }

    /// Toggle a rule on or off. An inactive rule contributes nothing; the
    /// weekly reconciler deletes its instances on the next pass.
    pub fn set_template_active(&self, template_id: &str, active: bool) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE templates SET active = ?2, updated_at = ?3 WHERE id = ?1",
                params![template_id, active, now_ms()],
            )?;
            if changed == 0 {
                return Err(EngineError::template_not_found(template_id).into());
            }
            Ok(())
        })
    }
}
