use thiserror::Error;

/// Errors returned by the built-in modules' table functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BuiltinError {
	/// A table function was called with an argument of the wrong shape.
	#[error("{function} expects {expected}")]
	InvalidArgument {
		/// Table function name.
		function: &'static str,
		/// Description of the expected argument.
		expected: &'static str,
	},
}
