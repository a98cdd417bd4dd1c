//! Pipeline error types.

use thiserror::Error;

use crate::pipeline::HandlerId;

/// Error type returned by pipeline handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised while running the row pipelines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
	/// A refresh was requested from a handler that is in neither pipeline.
	#[error("unable to refresh data, unknown pipeline handler {0}")]
	UnknownHandler(HandlerId),

	/// A handler failed; the pipeline run was aborted at that stage.
	#[error("pipeline stage registered by '{owner}' (priority {priority}) failed: {source}")]
	HandlerFailed {
		/// Module that registered the failing handler.
		owner: String,
		/// Priority of the failing stage.
		priority: i32,
		/// Error returned by the handler.
		#[source]
		source: HandlerError,
	},
}
