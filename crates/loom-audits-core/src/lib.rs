// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom sales audit tracking system.
//!
//! This crate provides the shared domain types for audit records: the record
//! entity and its workflow statuses, roles and the acting user, append-only
//! change trails, mutation requests, the stream events used for real-time
//! synchronization, and the client-side replica that folds those events into
//! local state. It is used by the server implementation
//! (`loom-server-audits`) and by connected dashboard clients.
//!
//! # Overview
//!
//! An audit record tracks one sale/affiliation from first contact to payroll
//! registration:
//! - Role-scoped status vocabulary (advisors read, auditors and supervisors
//!   drive verification, administrative staff drive documentation, management
//!   does everything)
//! - Append-only trails for status, advisor assignment and notes
//! - Full-snapshot stream events so every connected client converges
//!
//! # Example
//!
//! ```
//! use loom_audits_core::{Actor, AuditStatus, Role, UserId};
//!
//! let auditor = Actor::new(UserId::new(), Role::Auditor);
//! assert!(auditor.role.may_set_status(AuditStatus::Audited));
//! assert!(!auditor.role.may_set_status(AuditStatus::QrDone));
//! ```

pub mod audit;
pub mod error;
pub mod event;
pub mod replica;
pub mod request;
pub mod role;
pub mod trail;

pub use audit::{Audit, AuditId, AuditStatus, SupervisorSnapshot, UserId, ALL_STATUSES};
pub use error::{AuditsError, Result};
pub use event::{AuditEventData, AuditStreamEvent};
pub use replica::{AuditReplica, EditSession, SyncOutcome};
pub use request::{NewAudit, Patch, UpdateRequest};
pub use role::{Actor, Role};
pub use trail::{
	record_assignee, record_note, record_status, AssigneeChange, NoteChange, StatusChange,
};
