// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stream events for real-time record synchronization.
//!
//! Every event carries the full record snapshot, not a diff: consumers
//! replace their local copy wholesale, which makes delivery idempotent and
//! lets late subscribers catch up from any event.
//!
//! # Events
//!
//! - `audit.created` - Record admitted (interactive or imported)
//! - `audit.updated` - Any approved mutation, including supervisor re-assignment
//! - `audit.deleted` - Record removed; emitted before the row disappears

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{Audit, AuditId};

/// Stream event types for audit record synchronization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum AuditStreamEvent {
	/// A record was created.
	#[serde(rename = "audit.created")]
	Created(AuditEventData),

	/// A record was mutated.
	#[serde(rename = "audit.updated")]
	Updated(AuditEventData),

	/// A record was removed. The snapshot is the final state.
	#[serde(rename = "audit.deleted")]
	Deleted(AuditEventData),
}

/// Payload shared by all audit stream events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEventData {
	pub audit: Audit,
	pub timestamp: DateTime<Utc>,
}

impl AuditStreamEvent {
	/// Returns the event type name as a string.
	pub fn event_type(&self) -> &'static str {
		match self {
			AuditStreamEvent::Created(_) => "audit.created",
			AuditStreamEvent::Updated(_) => "audit.updated",
			AuditStreamEvent::Deleted(_) => "audit.deleted",
		}
	}

	/// Creates a new created event.
	pub fn created(audit: Audit) -> Self {
		AuditStreamEvent::Created(AuditEventData {
			audit,
			timestamp: Utc::now(),
		})
	}

	/// Creates a new updated event.
	pub fn updated(audit: Audit) -> Self {
		AuditStreamEvent::Updated(AuditEventData {
			audit,
			timestamp: Utc::now(),
		})
	}

	/// Creates a new deleted event carrying the final snapshot.
	pub fn deleted(audit: Audit) -> Self {
		AuditStreamEvent::Deleted(AuditEventData {
			audit,
			timestamp: Utc::now(),
		})
	}

	/// The record snapshot this event carries.
	pub fn audit(&self) -> &Audit {
		match self {
			AuditStreamEvent::Created(data)
			| AuditStreamEvent::Updated(data)
			| AuditStreamEvent::Deleted(data) => &data.audit,
		}
	}

	/// Id of the record this event concerns.
	pub fn audit_id(&self) -> AuditId {
		self.audit().id
	}
}
