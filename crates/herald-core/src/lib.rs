//! herald-core
//!
//! Reminder scheduling and notification engine.
//!
//! # Modules
//! - **domain**: reminder model, status state machine, notification content, errors
//! - **ports**: ReminderStore, Notifier, Clock, IdGenerator
//! - **app**: configuration, scan engine, scheduler loop, reminder service
//! - **impls**: in-memory store and notifiers for development and tests

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
