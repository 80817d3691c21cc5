// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pure decision logic for record mutations.
//!
//! Nothing in this module touches storage or the network: callers pass the
//! current record, the requested change and the acting user, and receive
//! either a fully updated copy plus the trail entries it produced, or the
//! first rule violation. On error the input record is untouched.
//!
//! The check order is:
//! 1. Field locks (advisor, supervisor snapshot, admin assignment)
//! 2. Unassignment standing (clearing auditor/admin)
//! 3. Reschedule intent (scheduled_at only applies with the flag, and
//!    forces the requested status to rescheduled)
//! 4. Role status vocabulary
//! 5. Payroll month requirement

use chrono::{DateTime, Utc};

use loom_audits_core::{
	record_assignee, record_note, record_status, Actor, Audit, AuditStatus, AuditsError,
	AssigneeChange, NewAudit, NoteChange, Role, StatusChange, UpdateRequest, UserId,
};

/// One trail entry produced by an approved mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum TrailAppend {
	Status(StatusChange),
	Assignee(AssigneeChange),
	Note(NoteChange),
}

/// The outcome of an approved mutation request.
#[derive(Debug, Clone)]
pub struct Decision {
	/// Updated copy of the record.
	pub audit: Audit,
	/// Trail entries the mutation appended, in append order.
	pub appends: Vec<TrailAppend>,
	/// False when the request turned out to be a no-op.
	pub changed: bool,
}

fn may_unassign(audit: &Audit, actor: &Actor, assigned: Option<UserId>) -> bool {
	if actor.role.is_management() {
		return true;
	}
	// The assigned person may always step away themself.
	if assigned == Some(actor.id) {
		return true;
	}
	// A supervisor may unassign within their own team, matched against the
	// record's supervisor snapshot.
	if matches!(actor.role, Role::Supervisor) {
		let record_team = audit.supervisor.as_ref().map(|s| s.team.as_str());
		return record_team.is_some() && record_team == actor.team.as_deref();
	}
	false
}

fn require_non_empty(value: &Option<String>, field: &'static str) -> Result<(), AuditsError> {
	if let Some(v) = value {
		if v.trim().is_empty() {
			return Err(AuditsError::Validation(format!("{field} must not be empty")));
		}
	}
	Ok(())
}

fn set_required(target: &mut String, value: &Option<String>, changed: &mut bool) {
	if let Some(v) = value {
		if target != v {
			*target = v.clone();
			*changed = true;
		}
	}
}

fn set_optional<T: Clone + PartialEq>(
	target: &mut Option<T>,
	value: &Option<T>,
	changed: &mut bool,
) {
	if let Some(v) = value {
		if target.as_ref() != Some(v) {
			*target = Some(v.clone());
			*changed = true;
		}
	}
}

fn set_flag(target: &mut bool, value: Option<bool>, changed: &mut bool) {
	if let Some(v) = value {
		if *target != v {
			*target = v;
			*changed = true;
		}
	}
}

/// Evaluates an update request against the current record.
///
/// Pure: returns the updated copy without persisting anything. Values equal
/// to what the record already holds are treated as no-ops and produce no
/// trail entries.
pub fn evaluate(
	current: &Audit,
	request: &UpdateRequest,
	actor: &Actor,
	now: DateTime<Utc>,
) -> Result<Decision, AuditsError> {
	// 1. Field locks
	let advisor_change = request.advisor_id.resolve(&current.advisor_id);
	if advisor_change.is_some() && !actor.role.is_management() {
		return Err(AuditsError::ForbiddenFieldChange {
			field: "advisor_id",
		});
	}

	let supervisor_change = request.supervisor.resolve(&current.supervisor);
	if supervisor_change.is_some() && !actor.role.is_management() {
		return Err(AuditsError::ForbiddenFieldChange {
			field: "supervisor",
		});
	}

	let admin_change = request.admin_id.resolve(&current.admin_id);
	if let Some(new_admin) = &admin_change {
		match new_admin {
			// Claiming or handing off: management, claiming an unset slot,
			// or the currently assigned person.
			Some(_) => {
				let may_set = actor.role.is_management()
					|| current.admin_id.is_none()
					|| current.admin_id == Some(actor.id);
				if !may_set {
					return Err(AuditsError::ForbiddenFieldChange { field: "admin_id" });
				}
			}
			// 2. Unassignment standing
			None => {
				if !may_unassign(current, actor, current.admin_id) {
					return Err(AuditsError::ForbiddenUnassign { field: "admin_id" });
				}
			}
		}
	}

	let auditor_change = request.auditor_id.resolve(&current.auditor_id);
	if let Some(None) = &auditor_change {
		if !may_unassign(current, actor, current.auditor_id) {
			return Err(AuditsError::ForbiddenUnassign {
				field: "auditor_id",
			});
		}
	}

	// 3. Reschedule intent
	let mut requested_status = request.status;
	let mut new_scheduled_at = None;
	if request.reschedule {
		let Some(when) = request.scheduled_at else {
			return Err(AuditsError::Validation(
				"rescheduling requires scheduled_at".to_string(),
			));
		};
		if current.scheduled_at != Some(when) {
			new_scheduled_at = Some(when);
		}
		requested_status = Some(AuditStatus::Rescheduled);
	}

	// 4. Role status vocabulary. Re-submitting the current status is not a
	// transition and passes for every role.
	if let Some(status) = requested_status {
		if status != current.status && !actor.role.may_set_status(status) {
			return Err(AuditsError::ForbiddenTransition {
				role: actor.role.to_string(),
				status: status.to_string(),
			});
		}
	}

	// 5. Payroll month requirement, validated against the effective values.
	let effective_status = requested_status.unwrap_or(current.status);
	if effective_status.requires_payroll_month() {
		let effective_month = request
			.payroll_month
			.as_deref()
			.or(current.payroll_month.as_deref());
		if !effective_month.is_some_and(|m| !m.trim().is_empty()) {
			return Err(AuditsError::Validation(
				"payroll_month is required for payroll_released".to_string(),
			));
		}
	}

	require_non_empty(&request.name, "name")?;
	require_non_empty(&request.phone, "phone")?;
	require_non_empty(&request.sold_product, "sold_product")?;

	// All checks passed; apply to a copy.
	let mut audit = current.clone();
	let mut appends = Vec::new();
	let mut changed = false;

	set_required(&mut audit.name, &request.name, &mut changed);
	set_required(&mut audit.phone, &request.phone, &mut changed);
	set_required(&mut audit.sold_product, &request.sold_product, &mut changed);
	set_optional(&mut audit.national_id, &request.national_id, &mut changed);
	set_optional(&mut audit.prior_product, &request.prior_product, &mut changed);
	set_optional(&mut audit.contribution, &request.contribution, &mut changed);
	set_optional(&mut audit.cuit, &request.cuit, &mut changed);
	set_optional(
		&mut audit.access_credential,
		&request.access_credential,
		&mut changed,
	);
	set_optional(&mut audit.email, &request.email, &mut changed);
	set_optional(&mut audit.payroll_month, &request.payroll_month, &mut changed);
	set_optional(&mut audit.qr_created_at, &request.qr_created_at, &mut changed);
	set_flag(&mut audit.is_recovered, request.is_recovered, &mut changed);
	set_flag(
		&mut audit.is_available_for_sale,
		request.is_available_for_sale,
		&mut changed,
	);

	if let Some(when) = new_scheduled_at {
		audit.scheduled_at = Some(when);
		changed = true;
	}

	if let Some(new_advisor) = advisor_change {
		let previous = audit.advisor_id;
		audit.advisor_id = new_advisor;
		appends.push(TrailAppend::Assignee(record_assignee(
			&mut audit.assignee_history,
			previous,
			new_advisor,
			actor.id,
			now,
		)));
		changed = true;
	}
	if let Some(new_auditor) = auditor_change {
		audit.auditor_id = new_auditor;
		changed = true;
	}
	if let Some(new_admin) = admin_change {
		audit.admin_id = new_admin;
		changed = true;
	}
	if let Some(new_supervisor) = supervisor_change {
		audit.supervisor = new_supervisor;
		changed = true;
	}

	if let Some(new_notes) = request.notes.resolve(&audit.notes) {
		audit.notes = new_notes.clone();
		appends.push(TrailAppend::Note(record_note(
			&mut audit.notes_history,
			new_notes,
			actor.id,
			now,
		)));
		changed = true;
	}

	if let Some(status) = requested_status {
		if status != audit.status {
			audit.status = status;
			audit.status_updated_at = now;
			appends.push(TrailAppend::Status(record_status(
				&mut audit.status_history,
				status,
				actor.id,
				now,
			)));
			changed = true;

			// First entry into qr_done stamps the QR timestamp, unless the
			// request carried an explicit one.
			if status == AuditStatus::QrDone && audit.qr_created_at.is_none() {
				audit.qr_created_at = Some(now);
			}
		}
	}

	if changed {
		audit.updated_at = now;
	}

	Ok(Decision {
		audit,
		appends,
		changed,
	})
}

/// Builds a new record from intake data.
///
/// Every record starts at `pending` with exactly one intake entry on the
/// status trail. Only management may pre-assign an arbitrary advisor; an
/// advisor creating a record becomes its advisor automatically.
pub fn admit(intake: &NewAudit, actor: &Actor, now: DateTime<Utc>) -> Result<Audit, AuditsError> {
	let mut missing = Vec::new();
	if intake.name.trim().is_empty() {
		missing.push("name");
	}
	if intake.phone.trim().is_empty() {
		missing.push("phone");
	}
	if intake.sold_product.trim().is_empty() {
		missing.push("sold_product");
	}
	if !missing.is_empty() {
		return Err(AuditsError::Validation(format!(
			"missing required fields: {}",
			missing.join(", ")
		)));
	}

	let advisor_id = match (intake.advisor_id, actor.role) {
		(None, Role::Advisor) => Some(actor.id),
		(None, _) => None,
		(Some(id), Role::Management) => Some(id),
		(Some(id), Role::Advisor) if id == actor.id => Some(id),
		(Some(_), _) => {
			return Err(AuditsError::ForbiddenFieldChange {
				field: "advisor_id",
			})
		}
	};

	let mut status_history = Vec::new();
	record_status(&mut status_history, AuditStatus::Pending, actor.id, now);

	Ok(Audit {
		id: loom_audits_core::AuditId::new(),
		name: intake.name.trim().to_string(),
		national_id: intake.national_id.clone(),
		phone: intake.phone.trim().to_string(),
		prior_product: intake.prior_product.clone(),
		sold_product: intake.sold_product.trim().to_string(),
		status: AuditStatus::Pending,
		status_updated_at: now,
		advisor_id,
		auditor_id: None,
		admin_id: None,
		supervisor: intake.supervisor.clone(),
		scheduled_at: intake.scheduled_at,
		qr_created_at: None,
		notes: intake.notes.clone(),
		is_recovered: false,
		is_available_for_sale: false,
		contribution: intake.contribution,
		cuit: intake.cuit.clone(),
		access_credential: None,
		email: intake.email.clone(),
		payroll_month: None,
		status_history,
		assignee_history: Vec::new(),
		notes_history: Vec::new(),
		created_at: now,
		updated_at: now,
		created_by: actor.id,
	})
}
