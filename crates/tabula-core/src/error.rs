//! Module system error types.

use thiserror::Error;

use crate::functions::ComponentKind;
use crate::table::TableId;

/// Error type returned by module hooks, table functions and component
/// functions.
pub type ModuleError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for module hooks.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Non-fatal registration diagnostics.
///
/// The registry never aborts on these: the offending descriptor or extension
/// is skipped, the error is logged and returned to the caller as part of the
/// registration report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistryError {
	/// A descriptor without a name was offered for registration.
	#[error("unable to bind module, no module name defined")]
	MissingName,

	/// A descriptor replaced an earlier registration with the same name.
	#[error("module '{0}' was already registered, the earlier registration has been replaced")]
	Replaced(String),

	/// An extension targeted a module that is not registered.
	#[error("unable to extend module '{target}', module is not registered")]
	UnknownModule {
		/// Target module name.
		target: String,
	},

	/// An extension targeted an extension point the module does not declare.
	#[error("unable to extend module '{target}', no extension point named '{point}'")]
	UnknownExtensionPoint {
		/// Target module name.
		target: String,
		/// Requested extension point.
		point: String,
	},

	/// An extension's values do not match the extension point's type.
	#[error("unable to extend '{target}.{point}': expected entries of type {expected}, found {found}")]
	ExtensionTypeMismatch {
		/// Target module name.
		target: String,
		/// Extension point name.
		point: String,
		/// Value type declared by the extension point.
		expected: &'static str,
		/// Value type supplied by the extension.
		found: &'static str,
	},
}

/// Errors raised while building or operating a table.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TableError {
	/// A module's `initialize` failed; the table was not built.
	#[error("module '{module}' failed to initialize: {source}")]
	ModuleInit {
		/// Module name.
		module: String,
		/// Error returned by the module.
		#[source]
		source: ModuleError,
	},

	/// A pipeline run failed.
	#[error(transparent)]
	Pipeline(#[from] tabula_pipeline::PipelineError),

	/// Configuration could not be read.
	#[error(transparent)]
	Option(#[from] tabula_options::OptionError),

	/// No table function is registered under this name.
	#[error("no table function named '{0}'")]
	UnknownFunction(String),

	/// No component function is bound under this name.
	#[error("no {kind} component function named '{name}'")]
	UnknownComponentFunction {
		/// Component kind.
		kind: ComponentKind,
		/// Function name.
		name: String,
	},

	/// A table or component function returned an error.
	#[error("function '{name}' failed: {source}")]
	Function {
		/// Function name.
		name: String,
		/// Error returned by the function.
		#[source]
		source: ModuleError,
	},

	/// A module failed while handling an inter-table message.
	#[error("module '{module}' failed to handle comms action '{action}': {source}")]
	Comms {
		/// Receiving module.
		module: String,
		/// Message action.
		action: String,
		/// Error returned by the module.
		#[source]
		source: ModuleError,
	},

	/// The table has already been destroyed.
	#[error("table {0} has been destroyed")]
	Destroyed(TableId),
}
