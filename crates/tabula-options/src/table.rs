//! Table level configuration.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{OptionError, OptionResult};
use crate::list::{GeneratedOptions, OptionScope, OptionsList};

/// Caller configuration for one table together with the registered defaults.
///
/// Reads are lazy: [`TableOptions::get`] checks the configured value first and
/// falls back to the registered default, so an option registered late is still
/// visible to every later reader.
#[derive(Debug, Clone)]
pub struct TableOptions {
	list: OptionsList,
	configured: Map<String, Value>,
}

impl Default for TableOptions {
	fn default() -> Self {
		Self::new(Map::new())
	}
}

impl TableOptions {
	/// Wraps caller supplied configuration.
	pub fn new(configured: Map<String, Value>) -> Self {
		Self {
			list: OptionsList::new(OptionScope::Table),
			configured,
		}
	}

	/// Parses configuration from a JSON object string.
	///
	/// # Examples
	///
	/// ```rust
	/// use tabula_options::TableOptions;
	///
	/// let options = TableOptions::from_json(r#"{"layout": "fitColumns"}"#).unwrap();
	/// assert!(options.is_configured("layout"));
	/// ```
	pub fn from_json(json: &str) -> OptionResult<Self> {
		let value: Value = serde_json::from_str(json)?;
		Self::from_value(value)
	}

	/// Builds configuration from a JSON value, which must be an object.
	pub fn from_value(value: Value) -> OptionResult<Self> {
		match value {
			Value::Object(map) => Ok(Self::new(map)),
			Value::Null => Err(OptionError::NotAnObject("null")),
			Value::Bool(_) => Err(OptionError::NotAnObject("boolean")),
			Value::Number(_) => Err(OptionError::NotAnObject("number")),
			Value::String(_) => Err(OptionError::NotAnObject("string")),
			Value::Array(_) => Err(OptionError::NotAnObject("array")),
		}
	}

	/// Registers a table option default. First registration wins.
	pub fn register(&mut self, key: impl Into<String>, default: Value) -> bool {
		self.list.register(key, default)
	}

	/// Effective value of `key`: configured, else default, else `None`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.list.resolve(&self.configured, key)
	}

	/// Effective value of `key` deserialized into `T`.
	pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> OptionResult<Option<T>> {
		match self.get(key) {
			Some(value) => serde_json::from_value(value.clone())
				.map(Some)
				.map_err(|source| OptionError::InvalidType {
					key: key.to_string(),
					source,
				}),
			None => Ok(None),
		}
	}

	/// Effective boolean value of `key`; anything that is not `false` or
	/// `null` counts as enabled, a missing key as disabled.
	pub fn flag(&self, key: &str) -> bool {
		!matches!(self.get(key), None | Some(Value::Null) | Some(Value::Bool(false)))
	}

	/// Returns `true` if the caller supplied a value for `key`.
	pub fn is_configured(&self, key: &str) -> bool {
		self.configured.contains_key(key)
	}

	/// Overrides the configured value of `key`.
	pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
		self.configured.insert(key.into(), value)
	}

	/// Caller supplied values.
	pub fn configured(&self) -> &Map<String, Value> {
		&self.configured
	}

	/// Registered table defaults.
	pub fn list(&self) -> &OptionsList {
		&self.list
	}

	/// Configured keys no module registered, reported when `warn` is set.
	pub fn unknown_keys(&self, warn: bool) -> Vec<String> {
		self.list.unknown_keys(&self.configured, warn)
	}

	/// Builds the effective option map, reporting unregistered keys when
	/// `warn_unknown` is set.
	pub fn generate(&self, warn_unknown: bool) -> GeneratedOptions {
		self.list.generate(&self.configured, warn_unknown)
	}
}
