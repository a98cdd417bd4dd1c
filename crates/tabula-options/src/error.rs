//! Option registry error types.

use thiserror::Error;

/// Result type for option operations.
pub type OptionResult<T> = Result<T, OptionError>;

/// Errors raised while reading or building table configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OptionError {
	/// A configured or default value could not be read as the requested type.
	#[error("option '{key}' has an unexpected type: {source}")]
	InvalidType {
		/// Option key.
		key: String,
		/// Underlying deserialization error.
		#[source]
		source: serde_json::Error,
	},

	/// The configuration text was not valid JSON.
	#[error("failed to parse table configuration: {0}")]
	Parse(#[from] serde_json::Error),

	/// The configuration was valid JSON but not an object.
	#[error("table configuration must be a JSON object, got {0}")]
	NotAnObject(&'static str),
}
