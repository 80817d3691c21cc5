// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit record types for sale/affiliation tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::trail::{AssigneeChange, NoteChange, StatusChange};

/// Unique identifier for an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditId(pub Uuid);

impl AuditId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}

	#[must_use]
	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl Default for AuditId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for AuditId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for AuditId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Unique identifier for a dashboard user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for UserId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for UserId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for UserId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Point-in-time copy of the supervising user, captured at assignment.
///
/// Never derived from live user records after assignment; the explicit
/// supervisor re-assignment operation is the only thing that replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorSnapshot {
	pub supervisor_id: UserId,
	pub name: String,
	pub team: String,
}

/// One sale/affiliation under review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
	pub id: AuditId,

	/// Affiliate full name
	pub name: String,
	/// National identity document (DNI)
	pub national_id: Option<String>,
	pub phone: String,
	/// Insurer the affiliate is coming from
	pub prior_product: Option<String>,
	/// Insurer that was sold
	pub sold_product: String,

	pub status: AuditStatus,
	pub status_updated_at: DateTime<Utc>,

	pub advisor_id: Option<UserId>,
	pub auditor_id: Option<UserId>,
	pub admin_id: Option<UserId>,
	pub supervisor: Option<SupervisorSnapshot>,

	/// When the verification call is scheduled
	pub scheduled_at: Option<DateTime<Utc>>,
	/// When the QR affiliation code was generated
	pub qr_created_at: Option<DateTime<Utc>>,

	pub notes: Option<String>,

	pub is_recovered: bool,
	pub is_available_for_sale: bool,

	/// Monthly contribution amount
	pub contribution: Option<f64>,
	/// Employer tax id (CUIT)
	pub cuit: Option<String>,
	pub access_credential: Option<String>,
	pub email: Option<String>,
	/// Month the affiliate enters the payroll, e.g. "2025-07"
	pub payroll_month: Option<String>,

	pub status_history: Vec<StatusChange>,
	pub assignee_history: Vec<AssigneeChange>,
	pub notes_history: Vec<NoteChange>,

	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub created_by: UserId,
}

/// Workflow status of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
	/// Awaiting first contact (intake default)
	Pending,
	/// Contact attempted, affiliate did not answer
	NoAnswer,
	/// Verification call completed
	Audited,
	/// Affiliate rejected during verification
	Rejected,
	/// Verification call moved to a new slot
	Rescheduled,
	/// Sale fell through
	Fallen,
	/// Documentation incomplete
	MissingDocs,
	/// QR affiliation code generated
	QrDone,
	/// Affiliate registered on the payroll
	PayrollReleased,
}

impl AuditStatus {
	/// Whether this status requires a payroll month on the record.
	#[must_use]
	pub fn requires_payroll_month(&self) -> bool {
		matches!(self, AuditStatus::PayrollReleased)
	}
}

impl std::fmt::Display for AuditStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			AuditStatus::Pending => write!(f, "pending"),
			AuditStatus::NoAnswer => write!(f, "no_answer"),
			AuditStatus::Audited => write!(f, "audited"),
			AuditStatus::Rejected => write!(f, "rejected"),
			AuditStatus::Rescheduled => write!(f, "rescheduled"),
			AuditStatus::Fallen => write!(f, "fallen"),
			AuditStatus::MissingDocs => write!(f, "missing_docs"),
			AuditStatus::QrDone => write!(f, "qr_done"),
			AuditStatus::PayrollReleased => write!(f, "payroll_released"),
		}
	}
}

impl std::str::FromStr for AuditStatus {
	type Err = crate::error::AuditsError;

	// Accepts the canonical names plus the Spanish labels that older
	// clients and imported spreadsheets still carry.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"pending" | "pendiente" => Ok(AuditStatus::Pending),
			"no_answer" | "no contesta" => Ok(AuditStatus::NoAnswer),
			"audited" | "auditada" => Ok(AuditStatus::Audited),
			"rejected" | "rechazada" => Ok(AuditStatus::Rejected),
			"rescheduled" | "reprogramada" => Ok(AuditStatus::Rescheduled),
			"fallen" | "caida" | "caída" => Ok(AuditStatus::Fallen),
			"missing_docs" | "falta documentacion" | "falta documentación" => {
				Ok(AuditStatus::MissingDocs)
			}
			"qr_done" | "qr hecho" => Ok(AuditStatus::QrDone),
			"payroll_released" | "padron" | "padrón" => Ok(AuditStatus::PayrollReleased),
			_ => Err(crate::error::AuditsError::InvalidStatus(s.to_string())),
		}
	}
}

/// All statuses, in workflow order. Used for allow-lists and tests.
pub const ALL_STATUSES: [AuditStatus; 9] = [
	AuditStatus::Pending,
	AuditStatus::NoAnswer,
	AuditStatus::Audited,
	AuditStatus::Rejected,
	AuditStatus::Rescheduled,
	AuditStatus::Fallen,
	AuditStatus::MissingDocs,
	AuditStatus::QrDone,
	AuditStatus::PayrollReleased,
];

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn audit_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let uuid = Uuid::from_bytes(uuid_bytes);
			let id = AuditId(uuid);
			let s = id.to_string();
			let parsed: AuditId = s.parse().unwrap();
			prop_assert_eq!(id, parsed);
		}

		#[test]
		fn status_display_roundtrip(idx in 0usize..ALL_STATUSES.len()) {
			let status = ALL_STATUSES[idx];
			let s = status.to_string();
			let parsed: AuditStatus = s.parse().unwrap();
			prop_assert_eq!(status, parsed);
		}

		#[test]
		fn status_serde_roundtrip(idx in 0usize..ALL_STATUSES.len()) {
			let status = ALL_STATUSES[idx];
			let json = serde_json::to_string(&status).unwrap();
			let parsed: AuditStatus = serde_json::from_str(&json).unwrap();
			prop_assert_eq!(status, parsed);
		}

		#[test]
		fn status_parse_ignores_case_and_whitespace(idx in 0usize..ALL_STATUSES.len()) {
			let status = ALL_STATUSES[idx];
			let shouty = format!("  {}  ", status.to_string().to_uppercase());
			let parsed: AuditStatus = shouty.parse().unwrap();
			prop_assert_eq!(status, parsed);
		}
	}

	#[test]
	fn test_audit_id_new_is_unique() {
		let a = AuditId::new();
		let b = AuditId::new();
		assert_ne!(a, b);
	}

	#[test]
	fn test_status_parses_legacy_labels() {
		assert_eq!(
			"Pendiente".parse::<AuditStatus>().unwrap(),
			AuditStatus::Pending
		);
		assert_eq!(
			"QR hecho".parse::<AuditStatus>().unwrap(),
			AuditStatus::QrDone
		);
		assert_eq!(
			"Padrón".parse::<AuditStatus>().unwrap(),
			AuditStatus::PayrollReleased
		);
		assert_eq!(
			"padron".parse::<AuditStatus>().unwrap(),
			AuditStatus::PayrollReleased
		);
		assert_eq!(
			"no contesta".parse::<AuditStatus>().unwrap(),
			AuditStatus::NoAnswer
		);
	}

	#[test]
	fn test_status_rejects_unknown() {
		let err = "afiliada".parse::<AuditStatus>().unwrap_err();
		assert!(matches!(
			err,
			crate::error::AuditsError::InvalidStatus(_)
		));
	}

	#[test]
	fn test_status_wire_names_are_snake_case() {
		assert_eq!(
			serde_json::to_string(&AuditStatus::QrDone).unwrap(),
			"\"qr_done\""
		);
		assert_eq!(
			serde_json::to_string(&AuditStatus::PayrollReleased).unwrap(),
			"\"payroll_released\""
		);
	}

	#[test]
	fn test_requires_payroll_month() {
		assert!(AuditStatus::PayrollReleased.requires_payroll_month());
		assert!(!AuditStatus::QrDone.requires_payroll_month());
		assert!(!AuditStatus::Pending.requires_payroll_month());
	}
}
