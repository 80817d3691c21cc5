// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Service layer for audit record operations.
//!
//! `AuditsService` wires the pure decision logic, the repository and the
//! event outbox into the operation surface the transport layer calls. Every
//! persisted mutation enqueues a stream event; delivery is fire-and-forget
//! relative to the write path.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use loom_audits_core::{
	Actor, Audit, AuditId, AuditStreamEvent, AuditsError, NewAudit, Patch, SupervisorSnapshot,
	UpdateRequest,
};

use crate::authority::{admit, evaluate};
use crate::broadcast::{AuditsBroadcaster, EventOutbox};
use crate::config::AuditsConfig;
use crate::error::Result;
use crate::import::{run_import, ImportReport, RawRow};
use crate::repository::{AuditFilter, AuditsRepository};

/// Availability of one scheduling hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
	/// Hour of day, 24h clock.
	pub hour: u32,
	pub capacity: u32,
	pub taken: u32,
	pub available: u32,
}

/// Sales totals for one day, grouped by the product being replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesStats {
	pub total: u64,
	pub by_prior_product: Vec<ProductCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCount {
	/// `None` groups records with no prior product recorded.
	pub product: Option<String>,
	pub count: u64,
}

/// Operation surface over audit records.
pub struct AuditsService {
	repository: Arc<dyn AuditsRepository>,
	outbox: EventOutbox,
	config: AuditsConfig,
}

impl AuditsService {
	/// Create a service publishing through the given broadcaster.
	pub fn new(
		repository: Arc<dyn AuditsRepository>,
		broadcaster: Arc<AuditsBroadcaster>,
		config: AuditsConfig,
	) -> Self {
		let outbox = EventOutbox::new(broadcaster, config.outbox_capacity);
		Self {
			repository,
			outbox,
			config,
		}
	}

	/// Create a record from intake data and announce it.
	#[instrument(skip(self, intake, actor), fields(actor_id = %actor.id))]
	pub async fn create(&self, intake: NewAudit, actor: &Actor) -> Result<Audit> {
		let audit = admit(&intake, actor, Utc::now())?;
		self.repository.create(&audit).await?;
		self.outbox.enqueue(AuditStreamEvent::created(audit.clone()));

		info!(audit_id = %audit.id, "Created audit record");
		Ok(audit)
	}

	/// Apply an update request to a record.
	///
	/// A request that changes nothing persists nothing and publishes
	/// nothing; the current record is returned as-is. A record deleted
	/// between load and write surfaces `ConflictOnDelete`.
	#[instrument(skip(self, request, actor), fields(audit_id = %id, actor_id = %actor.id))]
	pub async fn update(
		&self,
		id: AuditId,
		request: UpdateRequest,
		actor: &Actor,
	) -> Result<Audit> {
		let current = self
			.repository
			.get_by_id(id)
			.await?
			.ok_or(AuditsError::NotFound(id))?;

		let decision = evaluate(&current, &request, actor, Utc::now())?;
		if !decision.changed {
			debug!(audit_id = %id, "Update request changed nothing");
			return Ok(decision.audit);
		}

		if !self.repository.update(&decision.audit).await? {
			return Err(AuditsError::ConflictOnDelete(id).into());
		}
		self.outbox
			.enqueue(AuditStreamEvent::updated(decision.audit.clone()));

		info!(
			audit_id = %id,
			status = %decision.audit.status,
			appends = decision.appends.len(),
			"Updated audit record"
		);
		Ok(decision.audit)
	}

	/// Delete a record. Management and supervisors only.
	///
	/// The `Deleted` event is enqueued before the row is removed, so
	/// subscribers hear about the removal no later than it becomes visible
	/// to readers.
	#[instrument(skip(self, actor), fields(audit_id = %id, actor_id = %actor.id))]
	pub async fn delete(&self, id: AuditId, actor: &Actor) -> Result<()> {
		if !actor.role.may_delete() {
			return Err(AuditsError::ForbiddenFieldChange { field: "record" }.into());
		}

		let audit = self
			.repository
			.get_by_id(id)
			.await?
			.ok_or(AuditsError::NotFound(id))?;

		self.outbox.enqueue(AuditStreamEvent::deleted(audit));

		if !self.repository.delete(id).await? {
			return Err(AuditsError::ConflictOnDelete(id).into());
		}

		info!(audit_id = %id, "Deleted audit record");
		Ok(())
	}

	/// Replace the record's supervisor snapshot. Management only.
	#[instrument(skip(self, snapshot, actor), fields(audit_id = %id, actor_id = %actor.id))]
	pub async fn reassign_supervisor(
		&self,
		id: AuditId,
		snapshot: SupervisorSnapshot,
		actor: &Actor,
	) -> Result<Audit> {
		let request = UpdateRequest {
			supervisor: Patch::Set(snapshot),
			..Default::default()
		};
		self.update(id, request, actor).await
	}

	pub async fn get(&self, id: AuditId) -> Result<Audit> {
		self.repository
			.get_by_id(id)
			.await?
			.ok_or_else(|| AuditsError::NotFound(id).into())
	}

	pub async fn list(&self, filter: &AuditFilter) -> Result<Vec<Audit>> {
		self.repository.list(filter).await
	}

	pub async fn count(&self, filter: &AuditFilter) -> Result<u64> {
		self.repository.count(filter).await
	}

	/// Run a bulk import under the given actor and announce every record
	/// it created.
	#[instrument(skip(self, rows, actor), fields(rows = rows.len(), actor_id = %actor.id))]
	pub async fn import(&self, rows: Vec<RawRow>, actor: &Actor) -> ImportReport {
		let outcome = run_import(
			self.repository.as_ref(),
			self.config.import_batch_size,
			rows,
			actor,
		)
		.await;

		for audit in outcome.admitted {
			self.outbox.enqueue(AuditStreamEvent::created(audit));
		}

		outcome.report
	}

	/// Free scheduling capacity per business hour of the given day.
	#[instrument(skip(self), fields(day = %day))]
	pub async fn available_slots(&self, day: NaiveDate) -> Result<Vec<SlotAvailability>> {
		let start_hour = self.config.business_hours_start;
		let end_hour = self.config.business_hours_end;
		let capacity = self.config.slot_capacity;

		let day_start = day
			.and_hms_opt(0, 0, 0)
			.ok_or_else(|| AuditsError::Validation(format!("invalid day: {day}")))?
			.and_utc();
		let from = day_start + Duration::hours(i64::from(start_hour));
		let to = day_start + Duration::hours(i64::from(end_hour));

		let scheduled = self.repository.list_scheduled_between(from, to).await?;
		let mut taken_by_hour: HashMap<u32, u32> = HashMap::new();
		for timestamp in scheduled {
			*taken_by_hour.entry(timestamp.hour()).or_insert(0) += 1;
		}

		Ok((start_hour..end_hour)
			.map(|hour| {
				let taken = taken_by_hour.get(&hour).copied().unwrap_or(0);
				SlotAvailability {
					hour,
					capacity,
					taken,
					available: capacity.saturating_sub(taken),
				}
			})
			.collect())
	}

	/// Sales totals by prior product for records created on the given day.
	#[instrument(skip(self), fields(day = %day))]
	pub async fn sales_stats(&self, day: NaiveDate) -> Result<SalesStats> {
		let from = day
			.and_hms_opt(0, 0, 0)
			.ok_or_else(|| AuditsError::Validation(format!("invalid day: {day}")))?
			.and_utc();
		let to = from + Duration::days(1);

		let counts = self
			.repository
			.count_created_by_prior_product(from, to)
			.await?;
		let total = counts.iter().map(|(_, count)| count).sum();

		Ok(SalesStats {
			total,
			by_prior_product: counts
				.into_iter()
				.map(|(product, count)| ProductCount { product, count })
				.collect(),
		})
	}
}
