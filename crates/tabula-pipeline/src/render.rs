//! Renderer seam between the row manager and the host's view layer.

use crate::row::Row;

/// Receives the final display rows after every pipeline run.
pub trait RowRenderer: Send {
	/// Render `rows`. `in_position` asks the renderer to keep the current
	/// scroll position instead of resetting to the top.
	fn render(&mut self, rows: &[Row], in_position: bool);
}

/// Renderer that discards its input.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl RowRenderer for NullRenderer {
	fn render(&mut self, _rows: &[Row], _in_position: bool) {}
}
