//! Per-table event bus.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

/// Callback invoked with an event's payload.
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Emitted once binding has completed and initial data is loaded.
pub const TABLE_BUILT: &str = "tableBuilt";
/// Emitted after every run of the data pipeline.
pub const DATA_PROCESSED: &str = "dataProcessed";
/// Emitted after every module's `destroy` hook has run.
pub const TABLE_DESTROYED: &str = "tableDestroyed";

/// Named events with ordered subscribers.
#[derive(Default)]
pub struct EventBus {
	subscribers: IndexMap<String, Vec<(SubscriptionId, EventCallback)>>,
	next_id: u64,
}

impl EventBus {
	/// Creates a bus with no subscribers.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `callback` for `event`, after earlier subscribers.
	pub fn subscribe(&mut self, event: impl Into<String>, callback: EventCallback) -> SubscriptionId {
		self.next_id += 1;
		let id = SubscriptionId(self.next_id);
		self.subscribers
			.entry(event.into())
			.or_default()
			.push((id, callback));
		id
	}

	/// Removes a subscription; returns false if it was not found.
	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		for callbacks in self.subscribers.values_mut() {
			if let Some(index) = callbacks.iter().position(|(sub, _)| *sub == id) {
				callbacks.remove(index);
				return true;
			}
		}
		false
	}

	/// Invokes every subscriber of `event` in subscription order and returns
	/// how many ran.
	pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
		let Some(callbacks) = self.subscribers.get(event) else {
			return 0;
		};
		tracing::trace!(event, subscribers = callbacks.len(), "dispatching event");
		for (_, callback) in callbacks {
			callback(payload);
		}
		callbacks.len()
	}

	/// True if anything listens for `event`.
	pub fn has_subscribers(&self, event: &str) -> bool {
		self.subscribers.get(event).is_some_and(|c| !c.is_empty())
	}
}

impl fmt::Debug for EventBus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		for (event, callbacks) in &self.subscribers {
			map.entry(event, &callbacks.len());
		}
		map.finish()
	}
}
