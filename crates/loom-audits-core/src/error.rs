// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the audits system.

use thiserror::Error;

use crate::audit::AuditId;

/// Errors that can occur in the audits workflow.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuditsError {
	/// Actor's role may not set the requested status
	#[error("role {role} may not set status {status}")]
	ForbiddenTransition { role: String, status: String },

	/// Actor may not change the named field
	#[error("changing {field} is not permitted for this actor")]
	ForbiddenFieldChange { field: &'static str },

	/// Actor may not clear the named assignment
	#[error("unassigning {field} is not permitted for this actor")]
	ForbiddenUnassign { field: &'static str },

	/// A required field is missing or malformed
	#[error("validation failed: {0}")]
	Validation(String),

	/// Imported row duplicates an existing record
	#[error("duplicate row: {0}")]
	DuplicateRow(String),

	/// Audit not found
	#[error("audit not found: {0}")]
	NotFound(AuditId),

	/// Audit disappeared while a write was in flight
	#[error("audit {0} was removed concurrently")]
	ConflictOnDelete(AuditId),

	/// Invalid audit status string
	#[error("invalid audit status: {0}")]
	InvalidStatus(String),

	/// Invalid role string
	#[error("invalid role: {0}")]
	InvalidRole(String),
}

/// Result type alias for audits operations.
pub type Result<T> = std::result::Result<T, AuditsError>;
