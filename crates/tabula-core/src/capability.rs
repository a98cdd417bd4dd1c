//! Typed services published by modules for other modules to consume.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-table map from capability name to a shared, typed service.
///
/// Values are stored as `Arc<T>` behind `dyn Any`, so `T` may itself be a
/// trait object (`Arc<dyn Localize>`); consumers must ask for the same `T`
/// the publisher used.
#[derive(Default)]
pub struct Capabilities {
	services: HashMap<String, Published>,
}

struct Published {
	type_name: &'static str,
	value: Box<dyn Any + Send + Sync>,
}

impl Capabilities {
	/// Creates an empty capability map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Publishes `service` under `name`, replacing any previous value.
	pub fn publish<T>(&mut self, name: impl Into<String>, service: Arc<T>)
	where
		T: ?Sized + Send + Sync + 'static,
	{
		let name = name.into();
		let published = Published {
			type_name: type_name::<T>(),
			value: Box::new(service),
		};
		if let Some(previous) = self.services.insert(name.clone(), published) {
			tracing::debug!(capability = %name, previous = previous.type_name, "capability replaced");
		}
	}

	/// Returns the service published under `name` if it has type `T`.
	pub fn get<T>(&self, name: &str) -> Option<Arc<T>>
	where
		T: ?Sized + Send + Sync + 'static,
	{
		let published = self.services.get(name)?;
		match published.value.downcast_ref::<Arc<T>>() {
			Some(service) => Some(Arc::clone(service)),
			None => {
				tracing::debug!(
					capability = name,
					published = published.type_name,
					requested = type_name::<T>(),
					"capability type mismatch"
				);
				None
			}
		}
	}

	/// True if something is published as `name`.
	pub fn contains(&self, name: &str) -> bool {
		self.services.contains_key(name)
	}

	/// Withdraws `name`; returns false if it was not published.
	pub fn remove(&mut self, name: &str) -> bool {
		self.services.remove(name).is_some()
	}

	/// Published names.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.services.keys().map(String::as_str)
	}
}
