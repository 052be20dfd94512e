//! Structured error types for engine operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (4xx-like)
    InvalidDate,
    InvalidRange,

    // Precondition errors
    NoAssignableOwner,

    // Not found errors
    TemplateNotFound,
    EventNotFound,
    InstanceNotFound,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error for engine operations.
#[derive(Debug, Serialize)]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn invalid_date(field: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::InvalidDate,
            format!("Invalid calendar date (expected YYYY-MM-DD): {}", value),
        )
        .with_field(field)
    }

    pub fn invalid_range(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRange, reason)
    }

    pub fn no_assignable_owner(event_id: &str) -> Self {
        Self::new(
            ErrorCode::NoAssignableOwner,
            format!("Event {} has no owner and no backup owner", event_id),
        )
    }

    pub fn template_not_found(template_id: &str) -> Self {
        Self::new(
            ErrorCode::TemplateNotFound,
            format!("Template not found: {}", template_id),
        )
    }

    pub fn event_not_found(event_id: &str) -> Self {
        Self::new(
            ErrorCode::EventNotFound,
            format!("Event not found: {}", event_id),
        )
    }

    pub fn instance_not_found(instance_id: &str) -> Self {
        Self::new(
            ErrorCode::InstanceNotFound,
            format!("Instance not found: {}", instance_id),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to EngineError first
        match err.downcast::<EngineError>() {
            Ok(engine_err) => engine_err,
            Err(err) => EngineError::internal(err),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
