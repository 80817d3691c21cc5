// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audits server implementation for Loom.
//!
//! This crate provides the server side of the sales audit tracking system:
//! the role-gated mutation path, SQLite persistence, real-time fan-out to
//! connected dashboards, and the bulk spreadsheet import.
//!
//! # Architecture
//!
//! - `authority` - Pure evaluation of mutation requests against role rules
//! - `repository` - Database operations for audit records
//! - `broadcast` - Per-room event fan-out plus the write-path outbox
//! - `import` - Bulk reconciliation of spreadsheet rows
//! - `service` - Operation surface wiring the pieces together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use loom_server_audits::{
//!     Actor, AuditsBroadcaster, AuditsConfig, AuditsService, NewAudit, Role,
//!     SqliteAuditsRepository, UserId,
//! };
//!
//! let repository = Arc::new(SqliteAuditsRepository::new(pool));
//! let broadcaster = Arc::new(AuditsBroadcaster::with_defaults());
//! let service = AuditsService::new(repository, broadcaster, AuditsConfig::default());
//!
//! let advisor = Actor::new(UserId::new(), Role::Advisor);
//! let audit = service
//!     .create(NewAudit::new("Maria Lopez", "1144445555", "OSDE 210"), &advisor)
//!     .await?;
//! ```

pub mod authority;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod repository;
pub mod service;
pub mod testing;

pub use authority::{admit, evaluate, Decision, TrailAppend};
pub use broadcast::{
	AuditsBroadcaster, AuditsRoom, BroadcasterStats, ChannelStats, EventOutbox,
};
pub use config::{AuditsConfig, AuditsConfigLayer};
pub use db::{create_pool, ensure_schema};
pub use error::{AuditsServerError, Result};
pub use import::{ImportOutcome, ImportReport, RawRow, RowRejection};
pub use repository::{AuditFilter, AuditsRepository, DuplicateMatch, SqliteAuditsRepository};
pub use service::{AuditsService, ProductCount, SalesStats, SlotAvailability};

// Re-export core types for convenience
pub use loom_audits_core::*;
