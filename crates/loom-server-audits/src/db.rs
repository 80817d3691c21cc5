// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database pool and schema bootstrap for the audits store.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::{AuditsServerError, Result};

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./audits.db")
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| AuditsServerError::InvalidData(format!("invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("audits database pool created");
	Ok(pool)
}

/// Create the audits table and its indexes if they do not exist.
///
/// Trails and the supervisor snapshot are JSON TEXT columns; a record and
/// its trails always commit in one statement.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS audits (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			national_id TEXT,
			phone TEXT NOT NULL,
			prior_product TEXT,
			sold_product TEXT NOT NULL,
			status TEXT NOT NULL,
			status_updated_at TEXT NOT NULL,
			advisor_id TEXT,
			auditor_id TEXT,
			admin_id TEXT,
			supervisor TEXT,
			scheduled_at TEXT,
			qr_created_at TEXT,
			notes TEXT,
			is_recovered INTEGER NOT NULL DEFAULT 0,
			is_available_for_sale INTEGER NOT NULL DEFAULT 0,
			contribution REAL,
			cuit TEXT,
			access_credential TEXT,
			email TEXT,
			payroll_month TEXT,
			status_history TEXT NOT NULL DEFAULT '[]',
			assignee_history TEXT NOT NULL DEFAULT '[]',
			notes_history TEXT NOT NULL DEFAULT '[]',
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL,
			created_by TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_audits_status ON audits(status)")
		.execute(pool)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_audits_advisor ON audits(advisor_id)")
		.execute(pool)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_audits_scheduled_at ON audits(scheduled_at)")
		.execute(pool)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_audits_created_at ON audits(created_at)")
		.execute(pool)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_audits_phone ON audits(phone)")
		.execute(pool)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_audits_national_id ON audits(national_id)")
		.execute(pool)
		.await?;

	tracing::debug!("audits schema ensured");
	Ok(())
}
