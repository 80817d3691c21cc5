// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the audits server.

use thiserror::Error;

/// Errors that can occur in the audits server.
#[derive(Debug, Error)]
pub enum AuditsServerError {
	/// Database error
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	/// JSON serialization error
	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),

	/// Invalid persisted data
	#[error("invalid audit data: {0}")]
	InvalidData(String),

	/// Core workflow error
	#[error("audits core error: {0}")]
	Core(#[from] loom_audits_core::AuditsError),
}

/// Result type for audits server operations.
pub type Result<T> = std::result::Result<T, AuditsServerError>;

impl AuditsServerError {
	/// Whether this error is a workflow refusal rather than a server fault.
	#[must_use]
	pub fn is_rejection(&self) -> bool {
		matches!(self, AuditsServerError::Core(_))
	}
}
