// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client-side record replica.
//!
//! Each connected client keeps a local copy of the records it has loaded and
//! folds incoming stream events into it. The server always wins: snapshots
//! replace local state wholesale. The replica also tracks the single open
//! edit form so the UI can warn on concurrent edits and abandon the form
//! when the record is deleted under it.

use std::collections::HashMap;

use crate::audit::{Audit, AuditId};
use crate::event::AuditStreamEvent;

/// The edit form currently open on a record, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
	pub audit_id: AuditId,
	/// Set when the record changed on the server while the form was open.
	pub stale: bool,
}

/// What applying one stream event did to the replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
	/// Snapshot stored or replaced.
	Applied,
	/// Event concerned a record this client never loaded.
	Ignored,
	/// Snapshot applied and the open edit form was flagged stale.
	EditFlaggedStale,
	/// Record deleted; the open edit form was cancelled.
	EditCancelled,
}

/// Local reconciliation state for one connected client.
#[derive(Debug, Default)]
pub struct AuditReplica {
	records: HashMap<AuditId, Audit>,
	edit: Option<EditSession>,
}

impl AuditReplica {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Loads an initial query result, replacing anything already held.
	pub fn seed(&mut self, records: impl IntoIterator<Item = Audit>) {
		self.records = records.into_iter().map(|a| (a.id, a)).collect();
	}

	/// Folds one stream event into local state.
	///
	/// `Created` always inserts: a new record entering the system is by
	/// definition unknown locally. `Updated` for an unknown id is dropped,
	/// since the client either filtered the record out or never loaded it.
	pub fn apply(&mut self, event: &AuditStreamEvent) -> SyncOutcome {
		match event {
			AuditStreamEvent::Created(data) => {
				self.records.insert(data.audit.id, data.audit.clone());
				self.flag_if_editing(data.audit.id)
			}
			AuditStreamEvent::Updated(data) => {
				if !self.records.contains_key(&data.audit.id) {
					return SyncOutcome::Ignored;
				}
				self.records.insert(data.audit.id, data.audit.clone());
				self.flag_if_editing(data.audit.id)
			}
			AuditStreamEvent::Deleted(data) => {
				let known = self.records.remove(&data.audit.id).is_some();
				if self.edit.as_ref().is_some_and(|e| e.audit_id == data.audit.id) {
					self.edit = None;
					return SyncOutcome::EditCancelled;
				}
				if known {
					SyncOutcome::Applied
				} else {
					SyncOutcome::Ignored
				}
			}
		}
	}

	fn flag_if_editing(&mut self, id: AuditId) -> SyncOutcome {
		match self.edit.as_mut() {
			Some(edit) if edit.audit_id == id => {
				edit.stale = true;
				SyncOutcome::EditFlaggedStale
			}
			_ => SyncOutcome::Applied,
		}
	}

	/// Opens the edit form on a loaded record. Any previous form is dropped.
	/// Returns false when the record is not held locally.
	pub fn begin_edit(&mut self, id: AuditId) -> bool {
		if !self.records.contains_key(&id) {
			return false;
		}
		self.edit = Some(EditSession {
			audit_id: id,
			stale: false,
		});
		true
	}

	/// Closes the edit form, returning it so callers can inspect staleness.
	pub fn finish_edit(&mut self) -> Option<EditSession> {
		self.edit.take()
	}

	#[must_use]
	pub fn editing(&self) -> Option<&EditSession> {
		self.edit.as_ref()
	}

	#[must_use]
	pub fn get(&self, id: AuditId) -> Option<&Audit> {
		self.records.get(&id)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.records.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::audit::{AuditStatus, UserId};
	use chrono::Utc;

	fn sample_audit() -> Audit {
		let now = Utc::now();
		Audit {
			id: AuditId::new(),
			name: "Jorge Diaz".to_string(),
			national_id: None,
			phone: "1155556666".to_string(),
			prior_product: None,
			sold_product: "Swiss Medical".to_string(),
			status: AuditStatus::Pending,
			status_updated_at: now,
			advisor_id: None,
			auditor_id: None,
			admin_id: None,
			supervisor: None,
			scheduled_at: None,
			qr_created_at: None,
			notes: None,
			is_recovered: false,
			is_available_for_sale: false,
			contribution: None,
			cuit: None,
			access_credential: None,
			email: None,
			payroll_month: None,
			status_history: vec![],
			assignee_history: vec![],
			notes_history: vec![],
			created_at: now,
			updated_at: now,
			created_by: UserId::new(),
		}
	}

	#[test]
	fn test_created_inserts_unknown_record() {
		let mut replica = AuditReplica::new();
		let audit = sample_audit();
		let outcome = replica.apply(&AuditStreamEvent::created(audit.clone()));
		assert_eq!(outcome, SyncOutcome::Applied);
		assert_eq!(replica.get(audit.id), Some(&audit));
	}

	#[test]
	fn test_updated_replaces_known_record() {
		let mut replica = AuditReplica::new();
		let mut audit = sample_audit();
		replica.seed([audit.clone()]);

		audit.status = AuditStatus::Audited;
		let outcome = replica.apply(&AuditStreamEvent::updated(audit.clone()));
		assert_eq!(outcome, SyncOutcome::Applied);
		assert_eq!(replica.get(audit.id).unwrap().status, AuditStatus::Audited);
	}

	#[test]
	fn test_updated_for_unknown_record_is_ignored() {
		let mut replica = AuditReplica::new();
		let outcome = replica.apply(&AuditStreamEvent::updated(sample_audit()));
		assert_eq!(outcome, SyncOutcome::Ignored);
		assert!(replica.is_empty());
	}

	#[test]
	fn test_update_flags_open_edit_stale() {
		let mut replica = AuditReplica::new();
		let mut audit = sample_audit();
		replica.seed([audit.clone()]);
		assert!(replica.begin_edit(audit.id));

		audit.notes = Some("llamar de nuevo".to_string());
		let outcome = replica.apply(&AuditStreamEvent::updated(audit.clone()));
		assert_eq!(outcome, SyncOutcome::EditFlaggedStale);
		assert!(replica.editing().unwrap().stale);
		// The form stays open; the user decides what to do with it.
		assert_eq!(replica.editing().unwrap().audit_id, audit.id);
	}

	#[test]
	fn test_delete_cancels_open_edit() {
		let mut replica = AuditReplica::new();
		let audit = sample_audit();
		replica.seed([audit.clone()]);
		assert!(replica.begin_edit(audit.id));

		let outcome = replica.apply(&AuditStreamEvent::deleted(audit.clone()));
		assert_eq!(outcome, SyncOutcome::EditCancelled);
		assert!(replica.editing().is_none());
		assert!(replica.get(audit.id).is_none());
	}

	#[test]
	fn test_delete_of_other_record_keeps_edit_open() {
		let mut replica = AuditReplica::new();
		let edited = sample_audit();
		let other = sample_audit();
		replica.seed([edited.clone(), other.clone()]);
		assert!(replica.begin_edit(edited.id));

		let outcome = replica.apply(&AuditStreamEvent::deleted(other));
		assert_eq!(outcome, SyncOutcome::Applied);
		assert_eq!(replica.editing().unwrap().audit_id, edited.id);
		assert!(!replica.editing().unwrap().stale);
	}

	#[test]
	fn test_begin_edit_requires_loaded_record() {
		let mut replica = AuditReplica::new();
		assert!(!replica.begin_edit(AuditId::new()));
		assert!(replica.editing().is_none());
	}

	#[test]
	fn test_finish_edit_reports_staleness() {
		let mut replica = AuditReplica::new();
		let mut audit = sample_audit();
		replica.seed([audit.clone()]);
		replica.begin_edit(audit.id);

		audit.status = AuditStatus::NoAnswer;
		replica.apply(&AuditStreamEvent::updated(audit));

		let session = replica.finish_edit().unwrap();
		assert!(session.stale);
		assert!(replica.editing().is_none());
	}
}
