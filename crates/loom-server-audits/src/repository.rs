// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Repository layer for audit record database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use loom_audits_core::{Audit, AuditId, AuditStatus, UserId};

use crate::error::{AuditsServerError, Result};

/// Filter for listing audit records.
///
/// All fields are optional and combine with AND; `statuses` matches any of
/// the given values. `search` is a case-insensitive needle over name, phone
/// and national id.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
	pub statuses: Vec<AuditStatus>,
	pub advisor_id: Option<UserId>,
	pub auditor_id: Option<UserId>,
	pub admin_id: Option<UserId>,
	pub scheduled_from: Option<DateTime<Utc>>,
	pub scheduled_to: Option<DateTime<Utc>>,
	pub created_from: Option<DateTime<Utc>>,
	pub created_to: Option<DateTime<Utc>>,
	pub search: Option<String>,
	pub limit: Option<u32>,
	pub offset: Option<u32>,
}

/// Which criterion an existing record matched during duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateMatch {
	NationalId,
	Phone,
}

impl std::fmt::Display for DuplicateMatch {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			DuplicateMatch::NationalId => write!(f, "national id"),
			DuplicateMatch::Phone => write!(f, "phone"),
		}
	}
}

/// Repository trait for audit record operations.
#[async_trait]
pub trait AuditsRepository: Send + Sync {
	// Record operations
	async fn create(&self, audit: &Audit) -> Result<()>;
	/// Inserts all records in one transaction; none persist on failure.
	async fn create_many(&self, audits: &[Audit]) -> Result<()>;
	async fn get_by_id(&self, id: AuditId) -> Result<Option<Audit>>;
	/// Returns false when the record no longer exists.
	async fn update(&self, audit: &Audit) -> Result<bool>;
	/// Returns false when no row was removed.
	async fn delete(&self, id: AuditId) -> Result<bool>;

	// Listing
	async fn list(&self, filter: &AuditFilter) -> Result<Vec<Audit>>;
	async fn count(&self, filter: &AuditFilter) -> Result<u64>;

	// Import support
	async fn find_duplicate(
		&self,
		national_id: Option<&str>,
		phone: &str,
	) -> Result<Option<DuplicateMatch>>;

	// Projections
	async fn list_scheduled_between(
		&self,
		from: DateTime<Utc>,
		to: DateTime<Utc>,
	) -> Result<Vec<DateTime<Utc>>>;
	async fn count_created_by_prior_product(
		&self,
		from: DateTime<Utc>,
		to: DateTime<Utc>,
	) -> Result<Vec<(Option<String>, u64)>>;
}

/// SQLite implementation of the audits repository.
#[derive(Clone)]
pub struct SqliteAuditsRepository {
	pool: SqlitePool,
}

impl SqliteAuditsRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

const AUDIT_COLUMNS: &str = "id, name, national_id, phone, prior_product, sold_product, \
	status, status_updated_at, advisor_id, auditor_id, admin_id, supervisor, \
	scheduled_at, qr_created_at, notes, is_recovered, is_available_for_sale, \
	contribution, cuit, access_credential, email, payroll_month, \
	status_history, assignee_history, notes_history, created_at, updated_at, created_by";

const INSERT_AUDIT: &str = r#"
	INSERT INTO audits (
		id, name, national_id, phone, prior_product, sold_product,
		status, status_updated_at,
		advisor_id, auditor_id, admin_id, supervisor,
		scheduled_at, qr_created_at, notes,
		is_recovered, is_available_for_sale,
		contribution, cuit, access_credential, email, payroll_month,
		status_history, assignee_history, notes_history,
		created_at, updated_at, created_by
	)
	VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

fn bind_audit_insert<'q>(
	query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
	audit: &'q Audit,
) -> Result<sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>> {
	Ok(query
		.bind(audit.id.to_string())
		.bind(&audit.name)
		.bind(&audit.national_id)
		.bind(&audit.phone)
		.bind(&audit.prior_product)
		.bind(&audit.sold_product)
		.bind(audit.status.to_string())
		.bind(audit.status_updated_at.to_rfc3339())
		.bind(audit.advisor_id.map(|id| id.to_string()))
		.bind(audit.auditor_id.map(|id| id.to_string()))
		.bind(audit.admin_id.map(|id| id.to_string()))
		.bind(
			audit
				.supervisor
				.as_ref()
				.map(serde_json::to_string)
				.transpose()?,
		)
		.bind(audit.scheduled_at.map(|dt| dt.to_rfc3339()))
		.bind(audit.qr_created_at.map(|dt| dt.to_rfc3339()))
		.bind(&audit.notes)
		.bind(if audit.is_recovered { 1 } else { 0 })
		.bind(if audit.is_available_for_sale { 1 } else { 0 })
		.bind(audit.contribution)
		.bind(&audit.cuit)
		.bind(&audit.access_credential)
		.bind(&audit.email)
		.bind(&audit.payroll_month)
		.bind(serde_json::to_string(&audit.status_history)?)
		.bind(serde_json::to_string(&audit.assignee_history)?)
		.bind(serde_json::to_string(&audit.notes_history)?)
		.bind(audit.created_at.to_rfc3339())
		.bind(audit.updated_at.to_rfc3339())
		.bind(audit.created_by.to_string()))
}

// Database row struct for mapping
#[derive(sqlx::FromRow)]
struct AuditRow {
	id: String,
	name: String,
	national_id: Option<String>,
	phone: String,
	prior_product: Option<String>,
	sold_product: String,
	status: String,
	status_updated_at: String,
	advisor_id: Option<String>,
	auditor_id: Option<String>,
	admin_id: Option<String>,
	supervisor: Option<String>,
	scheduled_at: Option<String>,
	qr_created_at: Option<String>,
	notes: Option<String>,
	is_recovered: i32,
	is_available_for_sale: i32,
	contribution: Option<f64>,
	cuit: Option<String>,
	access_credential: Option<String>,
	email: Option<String>,
	payroll_month: Option<String>,
	status_history: String,
	assignee_history: String,
	notes_history: String,
	created_at: String,
	updated_at: String,
	created_by: String,
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| AuditsServerError::InvalidData(format!("invalid {column}: {e}")))
}

fn parse_optional_timestamp(value: Option<String>, column: &str) -> Result<Option<DateTime<Utc>>> {
	value.map(|s| parse_timestamp(&s, column)).transpose()
}

fn parse_user_id(value: &str, column: &str) -> Result<UserId> {
	value
		.parse()
		.map_err(|_| AuditsServerError::InvalidData(format!("invalid {column}")))
}

fn parse_optional_user_id(value: Option<String>, column: &str) -> Result<Option<UserId>> {
	value.map(|s| parse_user_id(&s, column)).transpose()
}

impl TryFrom<AuditRow> for Audit {
	type Error = AuditsServerError;

	fn try_from(row: AuditRow) -> Result<Self> {
		Ok(Audit {
			id: AuditId(
				row
					.id
					.parse()
					.map_err(|_| AuditsServerError::InvalidData("invalid audit ID".into()))?,
			),
			name: row.name,
			national_id: row.national_id,
			phone: row.phone,
			prior_product: row.prior_product,
			sold_product: row.sold_product,
			status: row
				.status
				.parse()
				.map_err(|e| AuditsServerError::InvalidData(format!("invalid status: {e}")))?,
			status_updated_at: parse_timestamp(&row.status_updated_at, "status_updated_at")?,
			advisor_id: parse_optional_user_id(row.advisor_id, "advisor_id")?,
			auditor_id: parse_optional_user_id(row.auditor_id, "auditor_id")?,
			admin_id: parse_optional_user_id(row.admin_id, "admin_id")?,
			supervisor: row
				.supervisor
				.map(|s| serde_json::from_str(&s))
				.transpose()?,
			scheduled_at: parse_optional_timestamp(row.scheduled_at, "scheduled_at")?,
			qr_created_at: parse_optional_timestamp(row.qr_created_at, "qr_created_at")?,
			notes: row.notes,
			is_recovered: row.is_recovered != 0,
			is_available_for_sale: row.is_available_for_sale != 0,
			contribution: row.contribution,
			cuit: row.cuit,
			access_credential: row.access_credential,
			email: row.email,
			payroll_month: row.payroll_month,
			status_history: serde_json::from_str(&row.status_history)?,
			assignee_history: serde_json::from_str(&row.assignee_history)?,
			notes_history: serde_json::from_str(&row.notes_history)?,
			created_at: parse_timestamp(&row.created_at, "created_at")?,
			updated_at: parse_timestamp(&row.updated_at, "updated_at")?,
			created_by: parse_user_id(&row.created_by, "created_by")?,
		})
	}
}

/// Builds the WHERE clause for a filter. Bind order must match
/// `bind_filter`.
fn filter_conditions(filter: &AuditFilter) -> String {
	let mut conditions = vec!["1=1".to_string()];

	if !filter.statuses.is_empty() {
		let placeholders = vec!["?"; filter.statuses.len()].join(", ");
		conditions.push(format!("status IN ({placeholders})"));
	}
	if filter.advisor_id.is_some() {
		conditions.push("advisor_id = ?".to_string());
	}
	if filter.auditor_id.is_some() {
		conditions.push("auditor_id = ?".to_string());
	}
	if filter.admin_id.is_some() {
		conditions.push("admin_id = ?".to_string());
	}
	if filter.scheduled_from.is_some() {
		conditions.push("scheduled_at >= ?".to_string());
	}
	if filter.scheduled_to.is_some() {
		conditions.push("scheduled_at < ?".to_string());
	}
	if filter.created_from.is_some() {
		conditions.push("created_at >= ?".to_string());
	}
	if filter.created_to.is_some() {
		conditions.push("created_at < ?".to_string());
	}
	if filter.search.is_some() {
		conditions.push("(name LIKE ? OR phone LIKE ? OR national_id LIKE ?)".to_string());
	}

	conditions.join(" AND ")
}

fn bind_filter<'q, O>(
	mut query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, sqlx::sqlite::SqliteArguments<'q>>,
	filter: &AuditFilter,
) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, sqlx::sqlite::SqliteArguments<'q>> {
	for status in &filter.statuses {
		query = query.bind(status.to_string());
	}
	if let Some(v) = filter.advisor_id {
		query = query.bind(v.to_string());
	}
	if let Some(v) = filter.auditor_id {
		query = query.bind(v.to_string());
	}
	if let Some(v) = filter.admin_id {
		query = query.bind(v.to_string());
	}
	if let Some(v) = filter.scheduled_from {
		query = query.bind(v.to_rfc3339());
	}
	if let Some(v) = filter.scheduled_to {
		query = query.bind(v.to_rfc3339());
	}
	if let Some(v) = filter.created_from {
		query = query.bind(v.to_rfc3339());
	}
	if let Some(v) = filter.created_to {
		query = query.bind(v.to_rfc3339());
	}
	if let Some(v) = &filter.search {
		let needle = format!("%{v}%");
		query = query
			.bind(needle.clone())
			.bind(needle.clone())
			.bind(needle);
	}
	query
}

#[async_trait]
impl AuditsRepository for SqliteAuditsRepository {
	#[instrument(skip(self, audit), fields(audit_id = %audit.id))]
	async fn create(&self, audit: &Audit) -> Result<()> {
		bind_audit_insert(sqlx::query(INSERT_AUDIT), audit)?
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	#[instrument(skip(self, audits), fields(count = audits.len()))]
	async fn create_many(&self, audits: &[Audit]) -> Result<()> {
		let mut tx = self.pool.begin().await?;

		for audit in audits {
			bind_audit_insert(sqlx::query(INSERT_AUDIT), audit)?
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;
		Ok(())
	}

	#[instrument(skip(self), fields(audit_id = %id))]
	async fn get_by_id(&self, id: AuditId) -> Result<Option<Audit>> {
		let sql = format!("SELECT {AUDIT_COLUMNS} FROM audits WHERE id = ?");
		let row = sqlx::query_as::<_, AuditRow>(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, audit), fields(audit_id = %audit.id))]
	async fn update(&self, audit: &Audit) -> Result<bool> {
		let result = sqlx::query(
			r#"
			UPDATE audits SET
				name = ?,
				national_id = ?,
				phone = ?,
				prior_product = ?,
				sold_product = ?,
				status = ?,
				status_updated_at = ?,
				advisor_id = ?,
				auditor_id = ?,
				admin_id = ?,
				supervisor = ?,
				scheduled_at = ?,
				qr_created_at = ?,
				notes = ?,
				is_recovered = ?,
				is_available_for_sale = ?,
				contribution = ?,
				cuit = ?,
				access_credential = ?,
				email = ?,
				payroll_month = ?,
				status_history = ?,
				assignee_history = ?,
				notes_history = ?,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&audit.name)
		.bind(&audit.national_id)
		.bind(&audit.phone)
		.bind(&audit.prior_product)
		.bind(&audit.sold_product)
		.bind(audit.status.to_string())
		.bind(audit.status_updated_at.to_rfc3339())
		.bind(audit.advisor_id.map(|id| id.to_string()))
		.bind(audit.auditor_id.map(|id| id.to_string()))
		.bind(audit.admin_id.map(|id| id.to_string()))
		.bind(
			audit
				.supervisor
				.as_ref()
				.map(serde_json::to_string)
				.transpose()?,
		)
		.bind(audit.scheduled_at.map(|dt| dt.to_rfc3339()))
		.bind(audit.qr_created_at.map(|dt| dt.to_rfc3339()))
		.bind(&audit.notes)
		.bind(if audit.is_recovered { 1 } else { 0 })
		.bind(if audit.is_available_for_sale { 1 } else { 0 })
		.bind(audit.contribution)
		.bind(&audit.cuit)
		.bind(&audit.access_credential)
		.bind(&audit.email)
		.bind(&audit.payroll_month)
		.bind(serde_json::to_string(&audit.status_history)?)
		.bind(serde_json::to_string(&audit.assignee_history)?)
		.bind(serde_json::to_string(&audit.notes_history)?)
		.bind(audit.updated_at.to_rfc3339())
		.bind(audit.id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self), fields(audit_id = %id))]
	async fn delete(&self, id: AuditId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM audits WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self, filter))]
	async fn list(&self, filter: &AuditFilter) -> Result<Vec<Audit>> {
		let limit = filter.limit.unwrap_or(500).min(1000);
		let offset = filter.offset.unwrap_or(0);

		let sql = format!(
			"SELECT {AUDIT_COLUMNS} FROM audits WHERE {} ORDER BY created_at ASC LIMIT ? OFFSET ?",
			filter_conditions(filter)
		);

		let rows = bind_filter(sqlx::query_as::<_, AuditRow>(&sql), filter)
			.bind(limit as i32)
			.bind(offset as i32)
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, filter))]
	async fn count(&self, filter: &AuditFilter) -> Result<u64> {
		let sql = format!(
			"SELECT COUNT(*) FROM audits WHERE {}",
			filter_conditions(filter)
		);

		let row: (i64,) = bind_filter(sqlx::query_as(&sql), filter)
			.fetch_one(&self.pool)
			.await?;

		Ok(row.0 as u64)
	}

	#[instrument(skip(self))]
	async fn find_duplicate(
		&self,
		national_id: Option<&str>,
		phone: &str,
	) -> Result<Option<DuplicateMatch>> {
		if let Some(nid) = national_id {
			let row: Option<(Option<String>,)> = sqlx::query_as(
				r#"
				SELECT national_id FROM audits
				WHERE national_id = ? OR phone = ?
				LIMIT 1
				"#,
			)
			.bind(nid)
			.bind(phone)
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(|(existing_nid,)| {
				if existing_nid.as_deref() == Some(nid) {
					DuplicateMatch::NationalId
				} else {
					DuplicateMatch::Phone
				}
			}))
		} else {
			let row: Option<(String,)> =
				sqlx::query_as("SELECT phone FROM audits WHERE phone = ? LIMIT 1")
					.bind(phone)
					.fetch_optional(&self.pool)
					.await?;

			Ok(row.map(|_| DuplicateMatch::Phone))
		}
	}

	#[instrument(skip(self), fields(from = %from, to = %to))]
	async fn list_scheduled_between(
		&self,
		from: DateTime<Utc>,
		to: DateTime<Utc>,
	) -> Result<Vec<DateTime<Utc>>> {
		let rows: Vec<(String,)> = sqlx::query_as(
			r#"
			SELECT scheduled_at FROM audits
			WHERE scheduled_at IS NOT NULL AND scheduled_at >= ? AND scheduled_at < ?
			ORDER BY scheduled_at ASC
			"#,
		)
		.bind(from.to_rfc3339())
		.bind(to.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		rows
			.into_iter()
			.map(|(s,)| parse_timestamp(&s, "scheduled_at"))
			.collect()
	}

	#[instrument(skip(self), fields(from = %from, to = %to))]
	async fn count_created_by_prior_product(
		&self,
		from: DateTime<Utc>,
		to: DateTime<Utc>,
	) -> Result<Vec<(Option<String>, u64)>> {
		let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
			r#"
			SELECT prior_product, COUNT(*) FROM audits
			WHERE created_at >= ? AND created_at < ?
			GROUP BY prior_product
			ORDER BY COUNT(*) DESC
			"#,
		)
		.bind(from.to_rfc3339())
		.bind(to.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		Ok(rows.into_iter().map(|(p, n)| (p, n as u64)).collect())
	}
}
