// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only change trails.
//!
//! Every value-changing mutation of status, advisor assignment or notes
//! appends exactly one entry. Entries are stored oldest-first and are never
//! mutated or removed; readers wanting most-recent-first reverse at read
//! time. Timestamps are clamped so each entry is at or after the previous
//! one even when the wall clock steps backwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditStatus, UserId};

/// One status change on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
	pub status: AuditStatus,
	pub changed_by: UserId,
	pub changed_at: DateTime<Utc>,
}

/// One advisor assignment change on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeChange {
	pub previous: Option<UserId>,
	pub new: Option<UserId>,
	pub changed_by: UserId,
	pub changed_at: DateTime<Utc>,
}

/// One notes change on a record. `note: None` records a clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteChange {
	pub note: Option<String>,
	pub changed_by: UserId,
	pub changed_at: DateTime<Utc>,
}

fn clamp(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
	match last {
		Some(prev) if prev > now => prev,
		_ => now,
	}
}

/// Appends a status entry, keeping `changed_at` monotonically non-decreasing.
/// Returns a copy of the appended entry.
pub fn record_status(
	history: &mut Vec<StatusChange>,
	status: AuditStatus,
	changed_by: UserId,
	now: DateTime<Utc>,
) -> StatusChange {
	let changed_at = clamp(history.last().map(|e| e.changed_at), now);
	let entry = StatusChange {
		status,
		changed_by,
		changed_at,
	};
	history.push(entry.clone());
	entry
}

/// Appends an assignee entry, keeping `changed_at` monotonically non-decreasing.
/// Returns a copy of the appended entry.
pub fn record_assignee(
	history: &mut Vec<AssigneeChange>,
	previous: Option<UserId>,
	new: Option<UserId>,
	changed_by: UserId,
	now: DateTime<Utc>,
) -> AssigneeChange {
	let changed_at = clamp(history.last().map(|e| e.changed_at), now);
	let entry = AssigneeChange {
		previous,
		new,
		changed_by,
		changed_at,
	};
	history.push(entry.clone());
	entry
}

/// Appends a notes entry, keeping `changed_at` monotonically non-decreasing.
/// Returns a copy of the appended entry.
pub fn record_note(
	history: &mut Vec<NoteChange>,
	note: Option<String>,
	changed_by: UserId,
	now: DateTime<Utc>,
) -> NoteChange {
	let changed_at = clamp(history.last().map(|e| e.changed_at), now);
	let entry = NoteChange {
		note,
		changed_by,
		changed_at,
	};
	history.push(entry.clone());
	entry
}
