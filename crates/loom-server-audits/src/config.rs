// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audits configuration section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditsConfigLayer {
	pub import_batch_size: Option<usize>,
	pub outbox_capacity: Option<usize>,
	pub channel_capacity: Option<usize>,
	pub slot_capacity: Option<u32>,
	pub business_hours_start: Option<u32>,
	pub business_hours_end: Option<u32>,
}

impl AuditsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.import_batch_size.is_some() {
			self.import_batch_size = other.import_batch_size;
		}
		if other.outbox_capacity.is_some() {
			self.outbox_capacity = other.outbox_capacity;
		}
		if other.channel_capacity.is_some() {
			self.channel_capacity = other.channel_capacity;
		}
		if other.slot_capacity.is_some() {
			self.slot_capacity = other.slot_capacity;
		}
		if other.business_hours_start.is_some() {
			self.business_hours_start = other.business_hours_start;
		}
		if other.business_hours_end.is_some() {
			self.business_hours_end = other.business_hours_end;
		}
	}

	pub fn finalize(self) -> AuditsConfig {
		AuditsConfig {
			import_batch_size: self.import_batch_size.unwrap_or(500),
			outbox_capacity: self.outbox_capacity.unwrap_or(1024),
			channel_capacity: self.channel_capacity.unwrap_or(256),
			slot_capacity: self.slot_capacity.unwrap_or(4),
			business_hours_start: self.business_hours_start.unwrap_or(9),
			business_hours_end: self.business_hours_end.unwrap_or(18),
		}
	}
}

/// Settings for the audits subsystem.
///
/// Scheduling slots run hourly from `business_hours_start` (inclusive) to
/// `business_hours_end` (exclusive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditsConfig {
	pub import_batch_size: usize,
	pub outbox_capacity: usize,
	pub channel_capacity: usize,
	pub slot_capacity: u32,
	pub business_hours_start: u32,
	pub business_hours_end: u32,
}

impl Default for AuditsConfig {
	fn default() -> Self {
		Self {
			import_batch_size: 500,
			outbox_capacity: 1024,
			channel_capacity: 256,
			slot_capacity: 4,
			business_hours_start: 9,
			business_hours_end: 18,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = AuditsConfig::default();
		assert_eq!(config.import_batch_size, 500);
		assert_eq!(config.outbox_capacity, 1024);
		assert_eq!(config.channel_capacity, 256);
		assert_eq!(config.slot_capacity, 4);
	}

	#[test]
	fn test_layer_finalize_defaults() {
		let layer = AuditsConfigLayer::default();
		let config = layer.finalize();
		assert_eq!(config, AuditsConfig::default());
	}

	#[test]
	fn test_layer_finalize_with_values() {
		let layer = AuditsConfigLayer {
			import_batch_size: Some(100),
			slot_capacity: Some(6),
			..Default::default()
		};
		let config = layer.finalize();
		assert_eq!(config.import_batch_size, 100);
		assert_eq!(config.slot_capacity, 6);
		assert_eq!(config.channel_capacity, 256);
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = AuditsConfigLayer {
			import_batch_size: Some(500),
			slot_capacity: Some(4),
			..Default::default()
		};
		let overlay = AuditsConfigLayer {
			import_batch_size: Some(250),
			slot_capacity: None,
			..Default::default()
		};
		base.merge(overlay);
		assert_eq!(base.import_batch_size, Some(250));
		assert_eq!(base.slot_capacity, Some(4));
	}

	#[test]
	fn test_serde_roundtrip() {
		let config = AuditsConfig {
			import_batch_size: 200,
			business_hours_start: 8,
			..Default::default()
		};
		let toml_str = toml::to_string(&config).unwrap();
		let parsed: AuditsConfig = toml::from_str(&toml_str).unwrap();
		assert_eq!(config, parsed);
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let toml_str = r#"
import_batch_size = 50
"#;
		let layer: AuditsConfigLayer = toml::from_str(toml_str).unwrap();
		assert_eq!(layer.import_batch_size, Some(50));
		assert!(layer.channel_capacity.is_none());
	}
}
