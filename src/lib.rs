//! # Taskboard
//!
//! A small multi-user task tracker: an HTTP API over a SQLite task store,
//! plus a terminal Kanban board client.
//!
//! This library provides:
//! - Task lifecycle rules (defaults, partial updates, archiving, notes)
//! - Filtered and ordered task queries with an auto-archive sweep
//! - An HTTP API with Google ID-token / API-key authentication
//! - Board view logic (column grouping, drag translation, polling)
//!
//! ## Control Flow
//!
//! ```text
//! board client ──► api ──► TaskService ──► TaskStore (SQLite)
//!      ▲                                        │
//!      └────────────── response ◄───────────────┘
//! ```
//!
//! ## Modules
//! - `task`: Task model, status/priority enums, patch and filter types
//! - `store`: SQLite persistence and queries
//! - `service`: lifecycle rules over the store
//! - `api`: HTTP routes, auth middleware, error mapping
//! - `board`: Kanban column grouping, drag gestures, poll gating

pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod task;

pub use config::Config;
pub use error::{TaskError, TaskResult};
