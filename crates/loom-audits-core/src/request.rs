// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mutation requests.
//!
//! Requests say what the caller wants changed; whether the change is allowed
//! is decided elsewhere. `Option` fields mean "set when present". Fields
//! that can also be cleared use [`Patch`], which distinguishes keep, clear
//! and set.

use chrono::{DateTime, Utc};

use crate::audit::{AuditStatus, SupervisorSnapshot, UserId};

/// Three-state field update: leave untouched, clear, or set a new value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Patch<T> {
	#[default]
	Keep,
	Clear,
	Set(T),
}

impl<T: Clone + PartialEq> Patch<T> {
	#[must_use]
	pub fn is_keep(&self) -> bool {
		matches!(self, Patch::Keep)
	}

	/// The value this patch would leave on the field, or `None` when it
	/// changes nothing (keep, clearing an empty field, setting the value
	/// already present).
	#[must_use]
	pub fn resolve(&self, current: &Option<T>) -> Option<Option<T>> {
		match self {
			Patch::Keep => None,
			Patch::Clear => current.is_some().then_some(None),
			Patch::Set(value) => (current.as_ref() != Some(value)).then(|| Some(value.clone())),
		}
	}
}

/// Intake data for a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAudit {
	pub name: String,
	pub phone: String,
	pub sold_product: String,
	pub national_id: Option<String>,
	pub prior_product: Option<String>,
	pub notes: Option<String>,
	pub advisor_id: Option<UserId>,
	pub supervisor: Option<SupervisorSnapshot>,
	pub scheduled_at: Option<DateTime<Utc>>,
	pub contribution: Option<f64>,
	pub cuit: Option<String>,
	pub email: Option<String>,
}

impl NewAudit {
	#[must_use]
	pub fn new(
		name: impl Into<String>,
		phone: impl Into<String>,
		sold_product: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			phone: phone.into(),
			sold_product: sold_product.into(),
			national_id: None,
			prior_product: None,
			notes: None,
			advisor_id: None,
			supervisor: None,
			scheduled_at: None,
			contribution: None,
			cuit: None,
			email: None,
		}
	}
}

/// A requested change to an existing record.
///
/// `scheduled_at` is only honored when `reschedule` is set; without the flag
/// a stray scheduling value is dropped rather than rejected.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateRequest {
	pub status: Option<AuditStatus>,

	pub notes: Patch<String>,
	pub advisor_id: Patch<UserId>,
	pub auditor_id: Patch<UserId>,
	pub admin_id: Patch<UserId>,
	pub supervisor: Patch<SupervisorSnapshot>,

	pub scheduled_at: Option<DateTime<Utc>>,
	pub reschedule: bool,
	pub qr_created_at: Option<DateTime<Utc>>,
	pub payroll_month: Option<String>,

	pub name: Option<String>,
	pub phone: Option<String>,
	pub national_id: Option<String>,
	pub prior_product: Option<String>,
	pub sold_product: Option<String>,
	pub contribution: Option<f64>,
	pub cuit: Option<String>,
	pub access_credential: Option<String>,
	pub email: Option<String>,

	pub is_recovered: Option<bool>,
	pub is_available_for_sale: Option<bool>,
}

impl UpdateRequest {
	/// Request that only moves the workflow status.
	#[must_use]
	pub fn set_status(status: AuditStatus) -> Self {
		Self {
			status: Some(status),
			..Self::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_patch_keep_changes_nothing() {
		let patch: Patch<String> = Patch::Keep;
		assert_eq!(patch.resolve(&Some("x".to_string())), None);
		assert_eq!(patch.resolve(&None), None);
	}

	#[test]
	fn test_patch_clear_only_when_set() {
		let patch: Patch<String> = Patch::Clear;
		assert_eq!(patch.resolve(&Some("x".to_string())), Some(None));
		assert_eq!(patch.resolve(&None), None);
	}

	#[test]
	fn test_patch_set_skips_same_value() {
		let patch = Patch::Set("x".to_string());
		assert_eq!(patch.resolve(&Some("x".to_string())), None);
		assert_eq!(
			patch.resolve(&Some("y".to_string())),
			Some(Some("x".to_string()))
		);
		assert_eq!(patch.resolve(&None), Some(Some("x".to_string())));
	}

	#[test]
	fn test_default_request_is_all_keep() {
		let request = UpdateRequest::default();
		assert!(request.status.is_none());
		assert!(request.notes.is_keep());
		assert!(request.advisor_id.is_keep());
		assert!(!request.reschedule);
	}

	#[test]
	fn test_set_status_helper() {
		let request = UpdateRequest::set_status(AuditStatus::Audited);
		assert_eq!(request.status, Some(AuditStatus::Audited));
		assert!(request.admin_id.is_keep());
	}
}
