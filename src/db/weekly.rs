//! Weekly instance reconciliation: full create/update/delete sync between
//! weekly reminder rules and their materialized instances.
//!
//! For every `(rule, day)` pair in the range the reconciler computes whether
//! an instance should exist, then converges the store onto that answer:
//! missing instances are created, stale ones deleted, drifted fields
//! patched, and duplicate rows (possible under concurrent generation calls)
//! healed down to one canonical survivor per pair.

use super::instances::{
    delete_instance_in, insert_instance_in, patch_instance_in, weekly_instances_for, NewInstance,
};
use super::templates::list_templates_in;
use super::Database;
use crate::config::EngineConfig;
use crate::dates::{date_range, format_date, parse_date, range_len, weekday_of};
use crate::error::EngineError;
use crate::types::{
    Period, RuleKind, RuleScope, TaskInstance, TemplateRule, Weekday, WeeklyReconciliation,
};
use anyhow::Result;
use rusqlite::types::Value;
use tracing::debug;

/// Should an instance of `template` exist on `date`?
///
/// True when the rule is active, the weekday matches, and the date falls in
/// the inclusive `[start_date, end_date]` window (`end_date` unset leaves
/// the window open-ended). Date comparison is on the ISO strings, which
/// order correctly because they are zero-padded.
fn should_exist(template: &TemplateRule, date: &str, weekday: Weekday) -> bool {
    if !template.active {
        return false;
    }
    let Some(rule_weekday) = template.weekday else {
        return false;
    };
    let Some(ref window_start) = template.start_date else {
        return false;
    };
    rule_weekday == weekday
        && date >= window_start.as_str()
        && template
            .end_date
            .as_deref()
            .is_none_or(|window_end| date <= window_end)
}

/// Columns to patch so `canonical` matches what the rule says an instance
/// on `date` should look like. Empty when nothing drifted.
fn drifted_fields(
    template: &TemplateRule,
    date: &str,
    canonical: &TaskInstance,
) -> Vec<(&'static str, Value)> {
    fn opt_text(v: &Option<String>) -> Value {
        v.as_ref()
            .map(|s| Value::Text(s.clone()))
            .unwrap_or(Value::Null)
    }

    let mut changes = Vec::new();

    if canonical.title != template.title {
        changes.push(("title", Value::Text(template.title.clone())));
    }
    if canonical.description != template.description {
        changes.push(("description", opt_text(&template.description)));
    }
    if canonical.priority != template.priority {
        changes.push(("priority", Value::Integer(template.priority as i64)));
    }
    if canonical.start_time != template.start_time {
        changes.push(("start_time", opt_text(&template.start_time)));
    }
    if canonical.end_time != template.end_time {
        changes.push(("end_time", opt_text(&template.end_time)));
    }
    if canonical.due_date.as_deref() != Some(date) {
        changes.push(("due_date", Value::Text(date.to_string())));
    }
    if canonical.entry_type != "task" {
        changes.push(("entry_type", Value::Text("task".to_string())));
    }

    changes
}

impl Database {
    /// Reconcile weekly reminder instances over the inclusive range
    /// `start..=end`.
    ///
    /// Re-invoking with unchanged rules and range yields all-zero counts.
    /// Fails with a validation error when `end < start` or the range
    /// exceeds the configured limit.
    pub fn generate_weekly_instances(
        &self,
        scope: &RuleScope,
        start: &str,
        end: &str,
        engine_config: &EngineConfig,
    ) -> Result<WeeklyReconciliation> {
        let start_date = parse_date("startDate", start)?;
        let end_date = parse_date("endDate", end)?;

        if end_date < start_date {
            return Err(EngineError::invalid_range(format!(
                "endDate {} precedes startDate {}",
                end, start
            ))
            .into());
        }
        if range_len(start_date, end_date) > engine_config.max_range_days {
            return Err(EngineError::invalid_range(format!(
                "Range {}..{} exceeds the {}-day generation limit",
                start, end, engine_config.max_range_days
            ))
            .into());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut result = WeeklyReconciliation::default();

            // Inactive rules are visited too: their instances must go.
            let templates = list_templates_in(
                &tx,
                RuleKind::WeeklyReminder,
                scope,
                /* active_only */ false,
            )?;

            for day in date_range(start_date, end_date) {
                let date = format_date(day);
                let weekday = weekday_of(day);

                for template in &templates {
                    let wanted = should_exist(template, &date, weekday);
                    let existing = weekly_instances_for(&tx, &template.id, &date)?;

                    if !wanted {
                        // Covers deactivation, a narrowed window, and a
                        // changed weekday alike.
                        for instance in &existing {
                            delete_instance_in(&tx, &instance.id)?;
                            result.deleted_ids.push(instance.id.clone());
                        }
                        continue;
                    }

                    if existing.is_empty() {
                        let id = insert_instance_in(
                            &tx,
                            &NewInstance {
                                title: template.title.clone(),
                                description: template.description.clone(),
                                date: date.clone(),
                                due_date: Some(date.clone()),
                                start_time: template.start_time.clone(),
                                end_time: template.end_time.clone(),
                                priority: template.priority,
                                status: None,
                                assignee_id: template.assignee_id.clone(),
                                period: Some(Period::Weekly),
                                entry_type: Some("task".to_string()),
                                is_recurring_instance: true,
                                template_id: Some(template.id.clone()),
                            },
                        )?;
                        result.created_ids.push(id);
                        continue;
                    }

                    // First in store order is canonical; the rest are
                    // duplicates from racing generation calls.
                    if let Some((canonical, duplicates)) = existing.split_first() {
                        for duplicate in duplicates {
                            delete_instance_in(&tx, &duplicate.id)?;
                            result.deleted_ids.push(duplicate.id.clone());
                        }

                        let changes = drifted_fields(template, &date, canonical);
                        if !changes.is_empty() {
                            patch_instance_in(&tx, &canonical.id, &changes)?;
                            result.updated_ids.push(canonical.id.clone());
                        }
                    }
                }
            }

            result.created_count = result.created_ids.len();
            result.updated_count = result.updated_ids.len();
            result.deleted_count = result.deleted_ids.len();
            tx.commit()?;

            debug!(
                created = result.created_count,
                updated = result.updated_count,
                deleted = result.deleted_count,
                start,
                end,
                "weekly reconciliation finished"
            );
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::templates::WeeklyTemplateInput;
    use crate::types::Weekday;

    fn setup_db() -> Database {
        Database::open_in_memory().expect("Failed to create in-memory database")
    }

    fn monday_rule(db: &Database, start_date: &str, end_date: Option<&str>) -> String {
        db.create_weekly_template(WeeklyTemplateInput {
            title: "Weekly review".into(),
            description: Some("Review the board".into()),
            start_time: Some("10:00".into()),
            end_time: Some("11:00".into()),
            priority: Some(1),
            weekday: Weekday::Monday,
            start_date: start_date.into(),
            end_date: end_date.map(String::from),
            assignee_id: Some("alice".into()),
            creator_id: Some("alice".into()),
        })
        .unwrap()
        .id
    }

    #[test]
    fn creates_instances_on_matching_weekdays_only() {
        let db = setup_db();
        let id = monday_rule(&db, "2024-01-01", None);

        // 2024-01-01 is a Monday; Mondays in range: Jan 1, 8, 15.
        let result = db
            .generate_weekly_instances(
                &RuleScope::all(),
                "2024-01-01",
                "2024-01-15",
                &EngineConfig::default(),
            )
            .unwrap();

        assert_eq!(result.created_count, 3);
        assert_eq!(result.updated_count, 0);
        assert_eq!(result.deleted_count, 0);

        let instances = db.list_instances_for_template(&id).unwrap();
        let dates: Vec<&str> = instances.iter().map(|i| i.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-08", "2024-01-15"]);
        for instance in &instances {
            assert_eq!(instance.due_date.as_deref(), Some(instance.date.as_str()));
            assert_eq!(instance.entry_type, "task");
            assert_eq!(instance.period, Period::Weekly);
            assert!(instance.is_recurring_instance);
        }
    }

    #[test]
    fn window_clamps_both_edges() {
        let db = setup_db();
        monday_rule(&db, "2024-01-08", Some("2024-01-14"));

        // Only Jan 8 falls inside [start_date, end_date].
        let result = db
            .generate_weekly_instances(
                &RuleScope::all(),
                "2024-01-01",
                "2024-01-31",
                &EngineConfig::default(),
            )
            .unwrap();
        assert_eq!(result.created_count, 1);
    }

    #[test]
    fn rejects_inverted_range() {
        let db = setup_db();
        let err = db
            .generate_weekly_instances(
                &RuleScope::all(),
                "2024-01-15",
                "2024-01-01",
                &EngineConfig::default(),
            )
            .unwrap_err();
        let engine_err: EngineError = err.into();
        assert_eq!(engine_err.code, crate::error::ErrorCode::InvalidRange);
    }

    #[test]
    fn should_exist_respects_window_and_active_flag() {
        let mut template = TemplateRule {
            id: "t".into(),
            kind: RuleKind::WeeklyReminder,
            title: "T".into(),
            description: None,
            start_time: None,
            end_time: None,
            priority: 0,
            weekday: Some(Weekday::Monday),
            start_date: Some("2024-01-08".into()),
            end_date: Some("2024-01-21".into()),
            assignee_id: None,
            creator_id: None,
            active: true,
            created_at: 0,
            updated_at: 0,
        };

        assert!(should_exist(&template, "2024-01-08", Weekday::Monday));
        assert!(should_exist(&template, "2024-01-15", Weekday::Monday));
        // Before the window.
        assert!(!should_exist(&template, "2024-01-01", Weekday::Monday));
        // After the window.
        assert!(!should_exist(&template, "2024-01-22", Weekday::Monday));
        // Wrong weekday.
        assert!(!should_exist(&template, "2024-01-09", Weekday::Tuesday));

        template.active = false;
        assert!(!should_exist(&template, "2024-01-08", Weekday::Monday));

        template.active = true;
        template.end_date = None;
        assert!(should_exist(&template, "2030-01-07", Weekday::Monday));
    }
}
