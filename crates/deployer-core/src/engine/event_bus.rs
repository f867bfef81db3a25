//! Event bus implementation for inter-service communication.
//!
//! This module provides a broadcast-based event bus that allows the queue,
//! executor and alert pipeline to communicate asynchronously through
//! events.

use deployer_types::DeployerEvent;
use tokio::sync::broadcast;

/// Event bus for broadcasting orchestrator events to multiple subscribers.
///
/// Uses tokio's broadcast channel so multiple services can subscribe to
/// and publish events. This keeps components loosely coupled while
/// maintaining a clear communication pattern.
pub struct EventBus {
	/// The broadcast sender used to publish events.
	sender: broadcast::Sender<DeployerEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	///
	/// The capacity determines how many events can be buffered before old
	/// events start being dropped for lagging subscribers.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Creates a new subscriber to receive events from this bus.
	///
	/// Each subscriber receives its own copy of all events published after
	/// the subscription is created.
	pub fn subscribe(&self) -> broadcast::Receiver<DeployerEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error if there are no active subscribers; callers treat
	/// that as non-critical.
	pub fn publish(
		&self,
		event: DeployerEvent,
	) -> Result<(), broadcast::error::SendError<DeployerEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

/// Cloning an EventBus creates a new handle to the same underlying
/// broadcast channel, allowing multiple services to publish events.
impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use deployer_types::QueueEvent;

	fn queued_event(job_id: &str) -> DeployerEvent {
		DeployerEvent::Queue(QueueEvent::JobQueued {
			job_id: job_id.to_string(),
			kind: "binary_market".to_string(),
		})
	}

	#[tokio::test]
	async fn test_publish_and_receive_event() {
		let event_bus = EventBus::new(10);
		let mut receiver = event_bus.subscribe();

		event_bus.publish(queued_event("job-1")).unwrap();

		match receiver.recv().await.unwrap() {
			DeployerEvent::Queue(QueueEvent::JobQueued { job_id, .. }) => {
				assert_eq!(job_id, "job-1");
			},
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_multiple_subscribers_receive_same_event() {
		let event_bus = EventBus::new(10);
		let mut receiver1 = event_bus.subscribe();
		let mut receiver2 = event_bus.subscribe();

		event_bus.publish(queued_event("job-2")).unwrap();

		assert!(matches!(
			receiver1.recv().await.unwrap(),
			DeployerEvent::Queue(QueueEvent::JobQueued { .. })
		));
		assert!(matches!(
			receiver2.recv().await.unwrap(),
			DeployerEvent::Queue(QueueEvent::JobQueued { .. })
		));
	}

	#[test]
	fn test_publish_with_no_subscribers_errors() {
		let event_bus = EventBus::new(10);
		assert!(event_bus.publish(queued_event("job-3")).is_err());
	}

	#[tokio::test]
	async fn test_cloned_bus_shares_channel() {
		let event_bus1 = EventBus::new(10);
		let event_bus2 = event_bus1.clone();
		let mut receiver = event_bus1.subscribe();

		event_bus2.publish(queued_event("job-4")).unwrap();
		assert!(receiver.recv().await.is_ok());
	}
}
