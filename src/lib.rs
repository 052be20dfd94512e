//! Recurring-entry materialization engine for the opsboard internal
//! operations tool.
//!
//! This module exports the core components for testing and integration.

pub mod clock;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod server;
pub mod types;
