// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Broadcast infrastructure for real-time record synchronization.
//!
//! Persisted mutations are pushed to every connected dashboard client so
//! that all open views converge without polling.
//!
//! # Architecture
//!
//! Events flow through a bounded outbox into per-room broadcast channels:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        EventOutbox                           │
//! │   enqueue (never blocks) ──> mpsc ──> forwarder task         │
//! └───────────────────────────────┬──────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      AuditsBroadcaster                       │
//! │        channels: HashMap<AuditsRoom, broadcast::Sender>      │
//! │                                                              │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌────────────────┐  │
//! │  │ audits       │  │ audit:{id}       │  │ audit:{id}     │  │
//! │  │ (collection) │  │ (single record)  │  │ ...            │  │
//! │  └──────────────┘  └──────────────────┘  └────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every event is delivered to the collection room and to the room of the
//! record it concerns. Enqueue order is delivery order.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

use loom_audits_core::{AuditId, AuditStreamEvent};

/// Default channel capacity per room.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// A broadcast room clients can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditsRoom {
	/// All record events.
	Collection,
	/// Events for a single record.
	Record(AuditId),
}

impl fmt::Display for AuditsRoom {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AuditsRoom::Collection => write!(f, "audits"),
			AuditsRoom::Record(id) => write!(f, "audit:{id}"),
		}
	}
}

/// Statistics for a broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
	/// Number of active receivers.
	pub receiver_count: usize,
	/// When the channel was created.
	pub created_at: DateTime<Utc>,
}

struct ChannelState {
	sender: broadcast::Sender<AuditStreamEvent>,
	created_at: DateTime<Utc>,
}

/// Broadcasts record events to connected dashboard clients.
///
/// Manages per-room broadcast channels and tracks connection statistics.
/// Channels are created lazily on first subscription and reaped by
/// [`cleanup_empty_channels`](Self::cleanup_empty_channels) once their last
/// receiver is gone.
pub struct AuditsBroadcaster {
	channel_capacity: usize,
	channels: RwLock<HashMap<AuditsRoom, ChannelState>>,
	total_events: AtomicU64,
	total_connections: AtomicU64,
}

impl AuditsBroadcaster {
	/// Create a new broadcaster with the given per-room channel capacity.
	pub fn new(channel_capacity: usize) -> Self {
		Self {
			channel_capacity,
			channels: RwLock::new(HashMap::new()),
			total_events: AtomicU64::new(0),
			total_connections: AtomicU64::new(0),
		}
	}

	/// Create a new broadcaster with the default channel capacity.
	pub fn with_defaults() -> Self {
		Self::new(DEFAULT_CHANNEL_CAPACITY)
	}

	/// Subscribe to events for a room.
	///
	/// A slow subscriber that falls behind the channel capacity misses the
	/// overwritten events but keeps receiving newer ones.
	pub async fn subscribe(&self, room: AuditsRoom) -> broadcast::Receiver<AuditStreamEvent> {
		// First, try to get an existing channel with a read lock
		{
			let channels = self.channels.read().await;
			if let Some(state) = channels.get(&room) {
				self.total_connections.fetch_add(1, Ordering::Relaxed);
				debug!(
					room = %room,
					receiver_count = state.sender.receiver_count(),
					"Client subscribed to existing audits channel"
				);
				return state.sender.subscribe();
			}
		}

		// Channel doesn't exist, create it with a write lock
		let mut channels = self.channels.write().await;

		// Double-check in case another task created it while we were waiting
		if let Some(state) = channels.get(&room) {
			self.total_connections.fetch_add(1, Ordering::Relaxed);
			return state.sender.subscribe();
		}

		let (sender, receiver) = broadcast::channel(self.channel_capacity);
		channels.insert(
			room,
			ChannelState {
				sender,
				created_at: Utc::now(),
			},
		);
		self.total_connections.fetch_add(1, Ordering::Relaxed);

		info!(
			room = %room,
			"Created new broadcast channel for audits"
		);

		receiver
	}

	/// Broadcast an event to all subscribers of a room.
	///
	/// Returns the number of clients that received the event.
	pub async fn broadcast(&self, room: AuditsRoom, event: AuditStreamEvent) -> usize {
		let channels = self.channels.read().await;

		if let Some(state) = channels.get(&room) {
			let receiver_count = state.sender.receiver_count();
			if receiver_count == 0 {
				debug!(
					room = %room,
					event_type = event.event_type(),
					"No receivers for audits broadcast"
				);
				return 0;
			}

			match state.sender.send(event.clone()) {
				Ok(count) => {
					self.total_events.fetch_add(1, Ordering::Relaxed);
					debug!(
						room = %room,
						event_type = event.event_type(),
						receiver_count = count,
						"Broadcast audit event to receivers"
					);
					count
				}
				Err(e) => {
					warn!(
						room = %room,
						error = %e,
						"Failed to broadcast audit event"
					);
					0
				}
			}
		} else {
			debug!(
				room = %room,
				event_type = event.event_type(),
				"No channel exists for room"
			);
			0
		}
	}

	/// Deliver an event to the collection room and the record's own room.
	///
	/// Returns the total number of deliveries across both rooms.
	pub async fn publish(&self, event: AuditStreamEvent) -> usize {
		let record_room = AuditsRoom::Record(event.audit_id());
		let mut delivered = self.broadcast(AuditsRoom::Collection, event.clone()).await;
		delivered += self.broadcast(record_room, event).await;
		delivered
	}

	/// Get statistics for a specific channel.
	pub async fn channel_stats(&self, room: AuditsRoom) -> Option<ChannelStats> {
		let channels = self.channels.read().await;

		channels.get(&room).map(|state| ChannelStats {
			receiver_count: state.sender.receiver_count(),
			created_at: state.created_at,
		})
	}

	/// Get total number of active channels.
	pub async fn channel_count(&self) -> usize {
		self.channels.read().await.len()
	}

	/// Get total number of connected receivers across all channels.
	pub async fn total_receiver_count(&self) -> usize {
		let channels = self.channels.read().await;
		channels.values().map(|s| s.sender.receiver_count()).sum()
	}

	/// Get total events sent across all channels.
	pub fn total_events_sent(&self) -> u64 {
		self.total_events.load(Ordering::Relaxed)
	}

	/// Get total connections ever made.
	pub fn total_connections(&self) -> u64 {
		self.total_connections.load(Ordering::Relaxed)
	}

	/// Clean up channels with no active receivers.
	pub async fn cleanup_empty_channels(&self) -> usize {
		let mut channels = self.channels.write().await;
		let initial_count = channels.len();

		channels.retain(|room, state| {
			let keep = state.sender.receiver_count() > 0;
			if !keep {
				debug!(
					room = %room,
					"Removing empty audits broadcast channel"
				);
			}
			keep
		});

		let removed = initial_count - channels.len();
		if removed > 0 {
			info!(
				removed_channels = removed,
				"Cleaned up empty audits broadcast channels"
			);
		}
		removed
	}

	/// Get global broadcaster statistics.
	pub async fn stats(&self) -> BroadcasterStats {
		BroadcasterStats {
			channel_count: self.channel_count().await,
			total_receivers: self.total_receiver_count().await,
			total_events_sent: self.total_events_sent(),
			total_connections: self.total_connections(),
		}
	}
}

/// Global broadcaster stats for monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcasterStats {
	/// Total number of active channels.
	pub channel_count: usize,
	/// Total number of connected receivers.
	pub total_receivers: usize,
	/// Total events sent since start.
	pub total_events_sent: u64,
	/// Total connections ever made.
	pub total_connections: u64,
}

/// Bounded queue between the write path and the broadcaster.
///
/// Mutations enqueue their event after the database write commits and
/// return immediately; a background forwarder drains the queue in FIFO
/// order and fans each event out to its rooms. When the queue is full the
/// event is dropped with a warning rather than stalling the write path.
pub struct EventOutbox {
	tx: mpsc::Sender<AuditStreamEvent>,
}

impl EventOutbox {
	/// Create an outbox draining into the given broadcaster.
	///
	/// Spawns the forwarder task; it exits when the outbox is dropped.
	pub fn new(broadcaster: Arc<AuditsBroadcaster>, capacity: usize) -> Self {
		let (tx, rx) = mpsc::channel(capacity);

		tokio::spawn(Self::forward_task(rx, broadcaster));

		Self { tx }
	}

	async fn forward_task(
		mut rx: mpsc::Receiver<AuditStreamEvent>,
		broadcaster: Arc<AuditsBroadcaster>,
	) {
		while let Some(event) = rx.recv().await {
			broadcaster.publish(event).await;
		}
		debug!("Audits event outbox forwarder stopped");
	}

	/// Queue an event for delivery.
	///
	/// Returns `true` if the event was queued, `false` if the outbox was
	/// full and the event was dropped. Never blocks the caller.
	pub fn enqueue(&self, event: AuditStreamEvent) -> bool {
		let event_type = event.event_type();
		let audit_id = event.audit_id();
		if self.tx.try_send(event).is_ok() {
			true
		} else {
			warn!(
				audit_id = %audit_id,
				event_type,
				"Audits event outbox full, dropping event"
			);
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use tokio::time::timeout;

	use loom_audits_core::{Actor, NewAudit, Role, UserId};

	use crate::authority::admit;

	fn create_test_event() -> AuditStreamEvent {
		let actor = Actor::new(UserId::new(), Role::Management);
		let intake = NewAudit::new("Ana Diaz", "1155556666", "Swiss Medical");
		let audit = admit(&intake, &actor, Utc::now()).unwrap();
		AuditStreamEvent::created(audit)
	}

	#[tokio::test]
	async fn test_subscribe_creates_channel() {
		let broadcaster = AuditsBroadcaster::with_defaults();

		assert_eq!(broadcaster.channel_count().await, 0);

		let _receiver = broadcaster.subscribe(AuditsRoom::Collection).await;

		assert_eq!(broadcaster.channel_count().await, 1);
		assert_eq!(broadcaster.total_receiver_count().await, 1);
	}

	#[tokio::test]
	async fn test_multiple_subscribers_same_room() {
		let broadcaster = AuditsBroadcaster::with_defaults();

		let _r1 = broadcaster.subscribe(AuditsRoom::Collection).await;
		let _r2 = broadcaster.subscribe(AuditsRoom::Collection).await;
		let _r3 = broadcaster.subscribe(AuditsRoom::Collection).await;

		assert_eq!(broadcaster.channel_count().await, 1);
		assert_eq!(broadcaster.total_receiver_count().await, 3);
	}

	#[tokio::test]
	async fn test_record_rooms_are_distinct() {
		let broadcaster = AuditsBroadcaster::with_defaults();

		let _r1 = broadcaster.subscribe(AuditsRoom::Record(AuditId::new())).await;
		let _r2 = broadcaster.subscribe(AuditsRoom::Record(AuditId::new())).await;

		assert_eq!(broadcaster.channel_count().await, 2);
	}

	#[tokio::test]
	async fn test_broadcast_reaches_subscriber() {
		let broadcaster = AuditsBroadcaster::with_defaults();
		let mut receiver = broadcaster.subscribe(AuditsRoom::Collection).await;

		let event = create_test_event();
		let count = broadcaster
			.broadcast(AuditsRoom::Collection, event.clone())
			.await;
		assert_eq!(count, 1);

		let received = timeout(Duration::from_millis(100), receiver.recv())
			.await
			.unwrap()
			.unwrap();
		assert_eq!(received.event_type(), "audit.created");
	}

	#[tokio::test]
	async fn test_broadcast_to_nonexistent_room() {
		let broadcaster = AuditsBroadcaster::with_defaults();
		let event = create_test_event();

		let count = broadcaster.broadcast(AuditsRoom::Collection, event).await;

		assert_eq!(count, 0);
	}

	#[tokio::test]
	async fn test_publish_reaches_collection_and_record_rooms() {
		let broadcaster = AuditsBroadcaster::with_defaults();
		let event = create_test_event();
		let record_room = AuditsRoom::Record(event.audit_id());

		let mut collection = broadcaster.subscribe(AuditsRoom::Collection).await;
		let mut record = broadcaster.subscribe(record_room).await;

		let delivered = broadcaster.publish(event.clone()).await;
		assert_eq!(delivered, 2);

		let from_collection = timeout(Duration::from_millis(100), collection.recv())
			.await
			.unwrap()
			.unwrap();
		let from_record = timeout(Duration::from_millis(100), record.recv())
			.await
			.unwrap()
			.unwrap();
		assert_eq!(from_collection, event);
		assert_eq!(from_record, event);
	}

	#[tokio::test]
	async fn test_publish_skips_unrelated_record_room() {
		let broadcaster = AuditsBroadcaster::with_defaults();
		let event = create_test_event();

		let mut other = broadcaster
			.subscribe(AuditsRoom::Record(AuditId::new()))
			.await;

		broadcaster.publish(event).await;

		let received = timeout(Duration::from_millis(50), other.recv()).await;
		assert!(received.is_err());
	}

	#[tokio::test]
	async fn test_cleanup_empty_channels() {
		let broadcaster = AuditsBroadcaster::with_defaults();

		{
			let _receiver = broadcaster.subscribe(AuditsRoom::Collection).await;
			assert_eq!(broadcaster.channel_count().await, 1);
		}
		// Receiver dropped here

		let removed = broadcaster.cleanup_empty_channels().await;
		assert_eq!(removed, 1);
		assert_eq!(broadcaster.channel_count().await, 0);
	}

	#[tokio::test]
	async fn test_stats() {
		let broadcaster = AuditsBroadcaster::with_defaults();
		let _receiver = broadcaster.subscribe(AuditsRoom::Collection).await;

		broadcaster
			.broadcast(AuditsRoom::Collection, create_test_event())
			.await;

		let stats = broadcaster.stats().await;
		assert_eq!(stats.channel_count, 1);
		assert_eq!(stats.total_receivers, 1);
		assert_eq!(stats.total_events_sent, 1);
		assert!(stats.total_connections >= 1);
	}

	#[tokio::test]
	async fn test_outbox_delivers_in_enqueue_order() {
		let broadcaster = Arc::new(AuditsBroadcaster::with_defaults());
		let outbox = EventOutbox::new(Arc::clone(&broadcaster), 16);

		let mut receiver = broadcaster.subscribe(AuditsRoom::Collection).await;

		let first = create_test_event();
		let second = create_test_event();
		assert!(outbox.enqueue(first.clone()));
		assert!(outbox.enqueue(second.clone()));

		let got_first = timeout(Duration::from_millis(200), receiver.recv())
			.await
			.unwrap()
			.unwrap();
		let got_second = timeout(Duration::from_millis(200), receiver.recv())
			.await
			.unwrap()
			.unwrap();
		assert_eq!(got_first.audit_id(), first.audit_id());
		assert_eq!(got_second.audit_id(), second.audit_id());
	}

	#[tokio::test]
	async fn test_outbox_fans_out_to_record_room() {
		let broadcaster = Arc::new(AuditsBroadcaster::with_defaults());
		let outbox = EventOutbox::new(Arc::clone(&broadcaster), 16);

		let event = create_test_event();
		let mut record = broadcaster
			.subscribe(AuditsRoom::Record(event.audit_id()))
			.await;

		outbox.enqueue(event.clone());

		let received = timeout(Duration::from_millis(200), record.recv())
			.await
			.unwrap()
			.unwrap();
		assert_eq!(received, event);
	}

	#[test]
	fn test_room_names() {
		let id = AuditId::new();
		assert_eq!(AuditsRoom::Collection.to_string(), "audits");
		assert_eq!(AuditsRoom::Record(id).to_string(), format!("audit:{id}"));
	}
}
