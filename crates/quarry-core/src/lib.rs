//! Shared configuration and task tracking for the quarry RAG core.

pub mod config;
pub mod tasks;

pub use config::Config;
pub use tasks::{TaskRecord, TaskStatus, TaskTracker};
