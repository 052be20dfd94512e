//! Daily instance generation: expand active daily block rules over a date
//! range into create-only instances.
//!
//! This generator is deliberately asymmetric with the weekly reconciler: it
//! only ever inserts. Instances created from an earlier version of a rule
//! are never patched or deleted, so editing a daily rule changes future
//! expansions only.

use super::instances::{insert_instance_in, instances_for_assignee_on, NewInstance};
use super::templates::list_templates_in;
use super::Database;
use crate::config::EngineConfig;
use crate::dates::{date_range, format_date, parse_date, range_len};
use crate::error::EngineError;
use crate::types::{DailyGeneration, Period, RuleKind, RuleScope};
use anyhow::Result;
use tracing::debug;

impl Database {
    /// Materialize daily block instances over the inclusive range
    /// `start..=end`.
    ///
    /// `start <= end` is the caller's responsibility; an inverted range
    /// walks zero days and returns empty counts. Idempotent: a day that
    /// already holds an instance with the rule's id and current title is
    /// skipped.
    pub fn generate_daily_instances(
        &self,
        scope: &RuleScope,
        start: &str,
        end: &str,
        engine_config: &EngineConfig,
    ) -> Result<DailyGeneration> {
        let start_date = parse_date("startDate", start)?;
        let end_date = parse_date("endDate", end)?;

        if range_len(start_date, end_date) > engine_config.max_range_days {
            return Err(EngineError::invalid_range(format!(
                "Range {}..{} exceeds the {}-day generation limit",
                start, end, engine_config.max_range_days
            ))
            .into());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut result = DailyGeneration::default();

            let templates =
                list_templates_in(&tx, RuleKind::DailyBlock, scope, /* active_only */ true)?;

            for day in date_range(start_date, end_date) {
                let date = format_date(day);

                for template in &templates {
                    let existing =
                        instances_for_assignee_on(&tx, template.assignee_id.as_deref(), &date)?;

                    // Duplicate check: the rule's id AND its current title.
                    // A renamed rule therefore spawns a fresh instance
                    // alongside the old one; prior instances are never
                    // touched.
                    let already_there = existing.iter().any(|i| {
                        i.template_id.as_deref() == Some(template.id.as_str())
                            && i.title == template.title
                    });
                    if already_there {
                        continue;
                    }

                    let id = insert_instance_in(
                        &tx,
                        &NewInstance {
                            title: template.title.clone(),
                            description: template.description.clone(),
                            date: date.clone(),
                            due_date: None,
                            start_time: template.start_time.clone(),
                            end_time: template.end_time.clone(),
                            priority: template.priority,
                            status: None,
                            assignee_id: template.assignee_id.clone(),
                            period: Some(Period::Daily),
                            entry_type: Some("daily_block".to_string()),
                            is_recurring_instance: true,
                            template_id: Some(template.id.clone()),
                        },
                    )?;
                    result.created_ids.push(id);
                }
            }

            result.created_count = result.created_ids.len();
            tx.commit()?;

            debug!(
                created = result.created_count,
                start, end, "daily generation finished"
            );
            Ok(result)
        })
    }
}
