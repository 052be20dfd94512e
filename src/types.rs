//! Core types for the opsboard materialization engine.

use serde::{Deserialize, Serialize};

/// Recurrence kind of a template rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    DailyBlock,
    WeeklyReminder,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::DailyBlock => "daily_block",
            RuleKind::WeeklyReminder => "weekly_reminder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily_block" => Some(RuleKind::DailyBlock),
            "weekly_reminder" => Some(RuleKind::WeeklyReminder),
            _ => None,
        }
    }
}

/// Weekday symbol for weekly reminder rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monday" => Some(Weekday::Monday),
            "tuesday" => Some(Weekday::Tuesday),
            "wednesday" => Some(Weekday::Wednesday),
            "thursday" => Some(Weekday::Thursday),
            "friday" => Some(Weekday::Friday),
            "saturday" => Some(Weekday::Saturday),
            "sunday" => Some(Weekday::Sunday),
            _ => None,
        }
    }

    pub fn from_chrono(w: chrono::Weekday) -> Self {
        match w {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

/// Recurrence tag carried by generated instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    None,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::None => "none",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "daily" => Period::Daily,
            "weekly" => Period::Weekly,
            _ => Period::None,
        }
    }
}

/// Task priority as an integer (higher = more important).
/// Default is 0. Typical range: -100 to 100.
pub type Priority = i32;

pub const PRIORITY_DEFAULT: Priority = 0;

/// A persisted recurrence rule.
///
/// `weekday`, `start_date`, and `end_date` are populated for weekly reminders
/// only; daily blocks leave them unset. The engine reads rules but never
/// deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRule {
    pub id: String,
    pub kind: RuleKind,
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub priority: Priority,
    pub weekday: Option<Weekday>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub assignee_id: Option<String>,
    pub creator_id: Option<String>,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A concrete dated work item.
///
/// `template_id` is a weak back-reference to the rule that produced the
/// instance. The instance is independently owned; deleting the rule does
/// not cascade here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub due_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub priority: Priority,
    pub status: String,
    pub assignee_id: Option<String>,
    pub period: Period,
    pub entry_type: String,
    pub is_recurring_instance: bool,
    pub template_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An editorial planning event with its two anchor dates.
///
/// `template_applied_at` is stamped once by the anchor task-set generator
/// when all seven checklist titles exist, and never cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorialEvent {
    pub id: String,
    pub title: String,
    pub prep_start_date: String,
    pub start_date: String,
    pub owner_profile_id: Option<String>,
    pub backup_owner_profile_id: Option<String>,
    pub auto_create_template_tasks: bool,
    pub template_applied_at: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A follow-up checklist task derived from an event's anchor dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationTask {
    pub id: String,
    pub event_id: String,
    pub title: String,
    pub due_date: Option<String>,
    pub status: String,
    pub assignee_id: Option<String>,
    pub created_by_profile_id: Option<String>,
    pub checklist: Vec<serde_json::Value>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Which template rules a caller may see.
///
/// Scope resolution (who may see which rules) is delegated to the caller;
/// the engine only applies the resolved filter.
#[derive(Debug, Clone, Default)]
pub struct RuleScope {
    /// Restrict to rules assigned to this profile. `None` means all rules.
    pub assignee_id: Option<String>,
}

impl RuleScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_assignee(assignee_id: impl Into<String>) -> Self {
        Self {
            assignee_id: Some(assignee_id.into()),
        }
    }
}

/// Result of a daily instance generation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyGeneration {
    pub created_count: usize,
    pub created_ids: Vec<String>,
}

/// Result of a weekly reconciliation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyReconciliation {
    pub created_count: usize,
    pub updated_count: usize,
    pub deleted_count: usize,
    pub created_ids: Vec<String>,
    pub updated_ids: Vec<String>,
    pub deleted_ids: Vec<String>,
}

/// Result of an anchor task-set generation pass for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorGeneration {
    pub created_count: usize,
    pub patched_template_applied_at: bool,
}

/// Accumulated result of one scheduled sweep run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub today: String,
    pub scanned: usize,
    pub created: usize,
    pub patched: usize,
}
