// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Roles and the acting user.
//!
//! `Role` is the single place the status vocabulary per role category is
//! defined. Everything downstream asks the role; nothing else compares role
//! variants directly.

use serde::{Deserialize, Serialize};

use crate::audit::{AuditStatus, UserId, ALL_STATUSES};

const AUDIT_STATUSES: [AuditStatus; 6] = [
	AuditStatus::Pending,
	AuditStatus::NoAnswer,
	AuditStatus::Audited,
	AuditStatus::Rejected,
	AuditStatus::Rescheduled,
	AuditStatus::Fallen,
];

const ADMINISTRATIVE_STATUSES: [AuditStatus; 5] = [
	AuditStatus::Pending,
	AuditStatus::MissingDocs,
	AuditStatus::QrDone,
	AuditStatus::PayrollReleased,
	AuditStatus::Rescheduled,
];

/// Role of a dashboard user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Sells; sees own records, cannot drive the workflow
	Advisor,
	/// Leads a team of advisors
	Supervisor,
	/// Runs verification calls
	Auditor,
	/// Handles documentation, QR and payroll
	Administrative,
	/// Full access
	Management,
}

impl Role {
	/// Statuses this role may set on a record.
	#[must_use]
	pub fn allowed_statuses(&self) -> &'static [AuditStatus] {
		match self {
			Role::Advisor => &[],
			Role::Supervisor | Role::Auditor => &AUDIT_STATUSES,
			Role::Administrative => &ADMINISTRATIVE_STATUSES,
			Role::Management => &ALL_STATUSES,
		}
	}

	#[must_use]
	pub fn may_set_status(&self, status: AuditStatus) -> bool {
		self.allowed_statuses().contains(&status)
	}

	#[must_use]
	pub fn is_management(&self) -> bool {
		matches!(self, Role::Management)
	}

	/// Whether this role may hard-delete records.
	#[must_use]
	pub fn may_delete(&self) -> bool {
		matches!(self, Role::Management | Role::Supervisor)
	}
}

impl std::fmt::Display for Role {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Role::Advisor => write!(f, "advisor"),
			Role::Supervisor => write!(f, "supervisor"),
			Role::Auditor => write!(f, "auditor"),
			Role::Administrative => write!(f, "administrative"),
			Role::Management => write!(f, "management"),
		}
	}
}

impl std::str::FromStr for Role {
	type Err = crate::error::AuditsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"advisor" => Ok(Role::Advisor),
			"supervisor" => Ok(Role::Supervisor),
			"auditor" => Ok(Role::Auditor),
			"administrative" => Ok(Role::Administrative),
			"management" => Ok(Role::Management),
			_ => Err(crate::error::AuditsError::InvalidRole(s.to_string())),
		}
	}
}

/// The authenticated user performing an operation.
///
/// Role and team always come from the caller's session, never from the
/// record being edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
	pub id: UserId,
	pub role: Role,
	pub team: Option<String>,
}

impl Actor {
	#[must_use]
	pub fn new(id: UserId, role: Role) -> Self {
		Self {
			id,
			role,
			team: None,
		}
	}

	#[must_use]
	pub fn with_team(mut self, team: impl Into<String>) -> Self {
		self.team = Some(team.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const ALL_ROLES: [Role; 5] = [
		Role::Advisor,
		Role::Supervisor,
		Role::Auditor,
		Role::Administrative,
		Role::Management,
	];

	proptest! {
		#[test]
		fn role_roundtrip(idx in 0usize..ALL_ROLES.len()) {
			let role = ALL_ROLES[idx];
			let s = role.to_string();
			let parsed: Role = s.parse().unwrap();
			prop_assert_eq!(role, parsed);
		}

		#[test]
		fn management_may_set_everything(idx in 0usize..ALL_STATUSES.len()) {
			prop_assert!(Role::Management.may_set_status(ALL_STATUSES[idx]));
		}

		#[test]
		fn advisor_may_set_nothing(idx in 0usize..ALL_STATUSES.len()) {
			prop_assert!(!Role::Advisor.may_set_status(ALL_STATUSES[idx]));
		}

		#[test]
		fn supervisor_and_auditor_share_vocabulary(idx in 0usize..ALL_STATUSES.len()) {
			let status = ALL_STATUSES[idx];
			prop_assert_eq!(
				Role::Supervisor.may_set_status(status),
				Role::Auditor.may_set_status(status)
			);
		}
	}

	#[test]
	fn test_administrative_vocabulary() {
		assert!(Role::Administrative.may_set_status(AuditStatus::QrDone));
		assert!(Role::Administrative.may_set_status(AuditStatus::MissingDocs));
		assert!(Role::Administrative.may_set_status(AuditStatus::PayrollReleased));
		assert!(!Role::Administrative.may_set_status(AuditStatus::Audited));
		assert!(!Role::Administrative.may_set_status(AuditStatus::Fallen));
	}

	#[test]
	fn test_audit_vocabulary_excludes_administrative_statuses() {
		assert!(!Role::Auditor.may_set_status(AuditStatus::QrDone));
		assert!(!Role::Supervisor.may_set_status(AuditStatus::PayrollReleased));
		assert!(Role::Auditor.may_set_status(AuditStatus::NoAnswer));
	}

	#[test]
	fn test_rescheduled_is_shared_ground() {
		// Every workflow role can push a record back into the scheduling queue.
		assert!(Role::Supervisor.may_set_status(AuditStatus::Rescheduled));
		assert!(Role::Auditor.may_set_status(AuditStatus::Rescheduled));
		assert!(Role::Administrative.may_set_status(AuditStatus::Rescheduled));
		assert!(Role::Management.may_set_status(AuditStatus::Rescheduled));
	}

	#[test]
	fn test_delete_authority() {
		assert!(Role::Management.may_delete());
		assert!(Role::Supervisor.may_delete());
		assert!(!Role::Auditor.may_delete());
		assert!(!Role::Administrative.may_delete());
		assert!(!Role::Advisor.may_delete());
	}

	#[test]
	fn test_actor_builder() {
		let actor = Actor::new(UserId::new(), Role::Supervisor).with_team("norte");
		assert_eq!(actor.role, Role::Supervisor);
		assert_eq!(actor.team.as_deref(), Some("norte"));
	}
}
