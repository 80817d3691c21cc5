// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bulk reconciliation of spreadsheet rows into audit records.
//!
//! Rows arrive as string-keyed maps from the spreadsheet decoder. Each row
//! is normalized (headers mapped through a synonym table, values trimmed),
//! validated, checked for duplicates against the store and against rows
//! already admitted earlier in the same import, and created through the
//! regular intake path. Rows are processed in fixed-size batches; each
//! batch persists in one transaction, and a storage failure rejects that
//! batch without stopping the ones after it.
//!
//! The caller receives an [`ImportReport`] for the rejected-rows download
//! plus the admitted records, so it can fan out creation events exactly
//! like interactive creates.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use loom_audits_core::{Actor, Audit, AuditsError, NewAudit};

use crate::authority::admit;
use crate::error::Result;
use crate::repository::AuditsRepository;

/// One spreadsheet row, keyed by column header.
pub type RawRow = HashMap<String, String>;

/// Reason used for every row of a batch that failed to persist.
const BATCH_FAILURE_REASON: &str = "storage failure, batch not imported";

/// A rejected row with the reason it was turned away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRejection {
	/// Position of the row in the submitted input, starting at 0.
	pub row_index: usize,
	/// The original row as submitted, unknown columns included.
	pub payload: RawRow,
	pub reason: String,
}

/// Summary of an import run, serializable for the rejected-rows report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
	pub accepted: usize,
	pub rejected: usize,
	pub rejections: Vec<RowRejection>,
}

/// Report plus the records the import created.
#[derive(Debug)]
pub struct ImportOutcome {
	pub report: ImportReport,
	pub admitted: Vec<Audit>,
}

/// Maps a spreadsheet header to its canonical field name.
///
/// Headers are matched after trimming and lower-casing. Unknown headers
/// return `None` and are ignored by validation.
fn normalize_header(header: &str) -> Option<&'static str> {
	let key = header.trim().to_lowercase();
	let canonical = match key.as_str() {
		"name" | "nombre" | "afiliado" | "apellido y nombre" => "name",
		"phone" | "celular" | "telefono" | "teléfono" => "phone",
		"sold_product" | "os vendida" | "obra social" => "sold_product",
		"national_id" | "dni" | "documento" => "national_id",
		"prior_product" | "os anterior" | "obra social anterior" => "prior_product",
		"cuit" | "cuil" => "cuit",
		"email" | "mail" | "correo" => "email",
		"notes" | "observaciones" | "comentarios" => "notes",
		"contribution" | "aporte" | "aportes" => "contribution",
		_ => return None,
	};
	Some(canonical)
}

fn normalize_row(row: &RawRow) -> HashMap<&'static str, String> {
	let mut fields = HashMap::new();
	for (header, value) in row {
		let Some(key) = normalize_header(header) else {
			continue;
		};
		let value = value.trim().to_string();
		match fields.entry(key) {
			Entry::Vacant(slot) => {
				slot.insert(value);
			}
			Entry::Occupied(mut slot) => {
				// Competing synonym columns: a non-empty value beats an
				// empty one.
				if slot.get().is_empty() && !value.is_empty() {
					slot.insert(value);
				}
			}
		}
	}
	fields
}

/// Accepts both `1234.56` and the spreadsheet-typical `1234,56`.
fn parse_contribution(raw: &str) -> Option<f64> {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return None;
	}
	trimmed
		.parse()
		.ok()
		.or_else(|| trimmed.replace(',', ".").parse().ok())
}

fn build_intake(fields: &HashMap<&'static str, String>) -> NewAudit {
	let get = |key: &str| fields.get(key).filter(|v| !v.is_empty()).cloned();

	let mut intake = NewAudit::new(
		fields.get("name").cloned().unwrap_or_default(),
		fields.get("phone").cloned().unwrap_or_default(),
		fields.get("sold_product").cloned().unwrap_or_default(),
	);
	intake.national_id = get("national_id");
	intake.prior_product = get("prior_product");
	intake.notes = get("notes");
	intake.cuit = get("cuit");
	intake.email = get("email");
	intake.contribution = fields.get("contribution").and_then(|v| parse_contribution(v));
	intake
}

struct BatchOutcome {
	admitted: Vec<Audit>,
	rejections: Vec<RowRejection>,
	phones: HashSet<String>,
	national_ids: HashSet<String>,
}

fn in_import_duplicate(
	audit: &Audit,
	seen_phones: &HashSet<String>,
	seen_national_ids: &HashSet<String>,
	batch: &BatchOutcome,
) -> Option<&'static str> {
	if let Some(nid) = &audit.national_id {
		if seen_national_ids.contains(nid) || batch.national_ids.contains(nid) {
			return Some("national id");
		}
	}
	if seen_phones.contains(&audit.phone) || batch.phones.contains(&audit.phone) {
		return Some("phone");
	}
	None
}

/// Vets every row, then persists the admissible ones in one transaction.
/// Any error aborts the whole batch.
async fn process_batch(
	repository: &dyn AuditsRepository,
	offset: usize,
	rows: &[RawRow],
	actor: &Actor,
	seen_phones: &HashSet<String>,
	seen_national_ids: &HashSet<String>,
) -> Result<BatchOutcome> {
	let mut batch = BatchOutcome {
		admitted: Vec::new(),
		rejections: Vec::new(),
		phones: HashSet::new(),
		national_ids: HashSet::new(),
	};

	for (i, row) in rows.iter().enumerate() {
		let row_index = offset + i;
		let intake = build_intake(&normalize_row(row));

		let audit = match admit(&intake, actor, Utc::now()) {
			Ok(audit) => audit,
			Err(e) => {
				batch.rejections.push(RowRejection {
					row_index,
					payload: row.clone(),
					reason: e.to_string(),
				});
				continue;
			}
		};

		if let Some(criterion) =
			in_import_duplicate(&audit, seen_phones, seen_national_ids, &batch)
		{
			batch.rejections.push(RowRejection {
				row_index,
				payload: row.clone(),
				reason: AuditsError::DuplicateRow(format!(
					"{criterion} already appears in this import"
				))
				.to_string(),
			});
			continue;
		}

		if let Some(matched) = repository
			.find_duplicate(audit.national_id.as_deref(), &audit.phone)
			.await?
		{
			batch.rejections.push(RowRejection {
				row_index,
				payload: row.clone(),
				reason: AuditsError::DuplicateRow(format!(
					"{matched} matches an existing record"
				))
				.to_string(),
			});
			continue;
		}

		batch.phones.insert(audit.phone.clone());
		if let Some(nid) = &audit.national_id {
			batch.national_ids.insert(nid.clone());
		}
		batch.admitted.push(audit);
	}

	repository.create_many(&batch.admitted).await?;
	Ok(batch)
}

/// Runs a full import under the given actor.
///
/// Batches are processed sequentially; duplicates admitted by an earlier
/// batch are visible to later ones. Rows of a failed batch are rejected
/// with [`BATCH_FAILURE_REASON`] and do not count as admitted for
/// duplicate detection.
#[instrument(skip(repository, rows, actor), fields(rows = rows.len(), actor_id = %actor.id))]
pub async fn run_import(
	repository: &dyn AuditsRepository,
	batch_size: usize,
	rows: Vec<RawRow>,
	actor: &Actor,
) -> ImportOutcome {
	let batch_size = batch_size.max(1);
	let mut report = ImportReport::default();
	let mut admitted = Vec::new();
	let mut seen_phones = HashSet::new();
	let mut seen_national_ids = HashSet::new();

	for (batch_index, rows) in rows.chunks(batch_size).enumerate() {
		let offset = batch_index * batch_size;
		match process_batch(
			repository,
			offset,
			rows,
			actor,
			&seen_phones,
			&seen_national_ids,
		)
		.await
		{
			Ok(batch) => {
				report.accepted += batch.admitted.len();
				report.rejections.extend(batch.rejections);
				seen_phones.extend(batch.phones);
				seen_national_ids.extend(batch.national_ids);
				admitted.extend(batch.admitted);
			}
			Err(e) => {
				warn!(
					batch_index,
					rows = rows.len(),
					error = %e,
					"Import batch failed, rejecting its rows"
				);
				for (i, row) in rows.iter().enumerate() {
					report.rejections.push(RowRejection {
						row_index: offset + i,
						payload: row.clone(),
						reason: BATCH_FAILURE_REASON.to_string(),
					});
				}
			}
		}
	}

	report.rejected = report.rejections.len();
	info!(
		accepted = report.accepted,
		rejected = report.rejected,
		"Import finished"
	);

	ImportOutcome { report, admitted }
}
