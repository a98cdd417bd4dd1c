//! First-writer-wins default registry.
//!
//! Modules declare their configuration keys here without coordinating with
//! each other. The first default registered for a key is kept; later attempts
//! for the same key are ignored so that module load order can never silently
//! replace another module's default.

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde_json::{Map, Value};

/// Which configuration surface an [`OptionsList`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionScope {
	/// Options passed to the table constructor.
	Table,
	/// Options found on individual column definitions.
	Column,
}

impl OptionScope {
	/// Human readable name used in diagnostics.
	pub fn description(self) -> &'static str {
		match self {
			Self::Table => "table constructor",
			Self::Column => "column definition",
		}
	}
}

/// Effective options produced by [`OptionsList::generate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedOptions {
	/// Registered defaults overlaid with configured values.
	pub values: Map<String, Value>,
	/// Configured keys that no module registered, in configuration order.
	pub unknown: Vec<String>,
}

/// Registry of option keys and their default values for one scope.
#[derive(Debug, Clone)]
pub struct OptionsList {
	scope: OptionScope,
	defaults: IndexMap<String, Value>,
}

impl OptionsList {
	/// Creates an empty list for the given scope.
	pub fn new(scope: OptionScope) -> Self {
		Self {
			scope,
			defaults: IndexMap::new(),
		}
	}

	/// Returns the scope of this list.
	pub fn scope(&self) -> OptionScope {
		self.scope
	}

	/// Registers a default for `key`.
	///
	/// Returns `true` when the key was inserted and `false` when it was
	/// already present, in which case the existing default is kept.
	pub fn register(&mut self, key: impl Into<String>, default: Value) -> bool {
		match self.defaults.entry(key.into()) {
			Entry::Occupied(entry) => {
				if *entry.get() != default {
					tracing::debug!(
						key = %entry.key(),
						scope = self.scope.description(),
						"option already registered, keeping the first default"
					);
				}
				false
			}
			Entry::Vacant(entry) => {
				entry.insert(default);
				true
			}
		}
	}

	/// Returns the registered default for `key`.
	pub fn default_for(&self, key: &str) -> Option<&Value> {
		self.defaults.get(key)
	}

	/// Checks whether `key` has been registered.
	pub fn contains(&self, key: &str) -> bool {
		self.defaults.contains_key(key)
	}

	/// Iterates registered keys in registration order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.defaults.keys().map(String::as_str)
	}

	/// Number of registered keys.
	pub fn len(&self) -> usize {
		self.defaults.len()
	}

	/// Returns `true` if nothing has been registered.
	pub fn is_empty(&self) -> bool {
		self.defaults.is_empty()
	}

	/// Resolves `key` against `configured`: configured value, then default.
	pub fn resolve<'a>(&'a self, configured: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
		configured.get(key).or_else(|| self.defaults.get(key))
	}

	/// Configured keys that were never registered.
	///
	/// When `warn` is set each of them is also reported.
	pub fn unknown_keys(&self, configured: &Map<String, Value>, warn: bool) -> Vec<String> {
		configured
			.keys()
			.filter(|key| !self.defaults.contains_key(key.as_str()))
			.inspect(|key| {
				if warn {
					tracing::warn!("Invalid {} option: {}", self.scope.description(), key);
				}
			})
			.cloned()
			.collect()
	}

	/// Builds the effective option map for `configured`.
	///
	/// Configured keys that were never registered are kept in the output and
	/// listed in [`GeneratedOptions::unknown`]. When `warn_unknown` is set each
	/// of them is also reported.
	pub fn generate(&self, configured: &Map<String, Value>, warn_unknown: bool) -> GeneratedOptions {
		let unknown = self.unknown_keys(configured, warn_unknown);
		let mut values: Map<String, Value> = self
			.defaults
			.iter()
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect();
		values.extend(configured.iter().map(|(key, value)| (key.clone(), value.clone())));

		GeneratedOptions { values, unknown }
	}
}
