//! Row manager: owns the table's rows and runs both pipelines.
//!
//! A refresh cascades through four stages, and may start at any of them:
//!
//! ```text
//! DataPipeline(i) -> Display -> DisplayPipeline(i) -> End
//! ```
//!
//! The output of every stage is cached so that a module can inspect the rows
//! as they were immediately before or after its own handler.

use crate::error::{HandlerError, PipelineError, PipelineResult};
use crate::pipeline::{HandlerId, Pipeline, PipelineKind, StageContext};
use crate::render::{NullRenderer, RowRenderer};
use crate::row::{Row, RowData, RowId};

/// Where a refresh starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTarget {
	/// Re-run everything from the raw rows.
	All,
	/// Re-run only the display pipeline, from the active rows.
	Display,
	/// Re-run from the stage registered as this handler.
	Handler(HandlerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
	DataPipeline(usize),
	Display,
	DisplayPipeline(usize),
	End,
}

/// Owns the rows of one table and the pipelines that transform them.
pub struct RowManager {
	rows: Vec<Row>,
	next_row_id: u64,
	data_pipeline: Pipeline,
	display_pipeline: Pipeline,
	/// `[0]` is the raw rows, `[i + 1]` the output of data stage `i`.
	active_rows_pipeline: Vec<Vec<Row>>,
	active_rows: Vec<Row>,
	/// `[i]` is the output of display stage `i`.
	display_rows: Vec<Vec<Row>>,
	renderer: Box<dyn RowRenderer>,
}

impl Default for RowManager {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for RowManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RowManager")
			.field("rows", &self.rows.len())
			.field("active_rows", &self.active_rows.len())
			.field("data_pipeline", &self.data_pipeline)
			.field("display_pipeline", &self.display_pipeline)
			.finish_non_exhaustive()
	}
}

impl RowManager {
	/// Creates an empty row manager with a [`NullRenderer`].
	pub fn new() -> Self {
		Self::with_renderer(Box::new(NullRenderer))
	}

	/// Creates an empty row manager that hands display rows to `renderer`.
	pub fn with_renderer(renderer: Box<dyn RowRenderer>) -> Self {
		Self {
			rows: Vec::new(),
			next_row_id: 1,
			data_pipeline: Pipeline::new(PipelineKind::Data),
			display_pipeline: Pipeline::new(PipelineKind::Display),
			active_rows_pipeline: Vec::new(),
			active_rows: Vec::new(),
			display_rows: Vec::new(),
			renderer,
		}
	}

	/// Replaces the renderer.
	pub fn set_renderer(&mut self, renderer: Box<dyn RowRenderer>) {
		self.renderer = renderer;
	}

	/// Registers a data pipeline handler.
	pub fn register_data_handler<F>(&mut self, owner: impl Into<String>, priority: i32, handler: F) -> HandlerId
	where
		F: Fn(Vec<Row>, &StageContext) -> Result<Vec<Row>, HandlerError> + Send + Sync + 'static,
	{
		self.data_pipeline.register(owner, priority, handler)
	}

	/// Registers a display pipeline handler.
	pub fn register_display_handler<F>(
		&mut self,
		owner: impl Into<String>,
		priority: i32,
		handler: F,
	) -> HandlerId
	where
		F: Fn(Vec<Row>, &StageContext) -> Result<Vec<Row>, HandlerError> + Send + Sync + 'static,
	{
		self.display_pipeline.register(owner, priority, handler)
	}

	/// Data pipeline in execution order.
	pub fn data_pipeline(&self) -> &Pipeline {
		&self.data_pipeline
	}

	/// Display pipeline in execution order.
	pub fn display_pipeline(&self) -> &Pipeline {
		&self.display_pipeline
	}

	/// Replaces all rows and refreshes both pipelines.
	pub fn set_data(&mut self, data: impl IntoIterator<Item = RowData>) -> PipelineResult<()> {
		let rows: Vec<Row> = data.into_iter().map(|data| self.make_row(data)).collect();
		self.rows = rows;
		self.refresh_active_data(RefreshTarget::All, false, false)
	}

	/// Appends one row and refreshes both pipelines.
	pub fn add_row(&mut self, data: RowData) -> PipelineResult<RowId> {
		let row = self.make_row(data);
		let id = row.id();
		self.rows.push(row);
		self.refresh_active_data(RefreshTarget::All, false, true)?;
		Ok(id)
	}

	fn make_row(&mut self, data: RowData) -> Row {
		let id = RowId(self.next_row_id);
		self.next_row_id += 1;
		Row::new(id, data)
	}

	/// All rows in load order, before any pipeline.
	pub fn rows(&self) -> &[Row] {
		&self.rows
	}

	/// Output of the data pipeline.
	pub fn active_rows(&self) -> &[Row] {
		&self.active_rows
	}

	/// Final display rows: the last display stage's output, or the active
	/// rows when the display pipeline is empty.
	pub fn display_rows(&self) -> &[Row] {
		self.display_rows
			.last()
			.map(Vec::as_slice)
			.unwrap_or(self.active_rows.as_slice())
	}

	/// Output of display stage `index`; empty when that stage has not run.
	pub fn display_rows_at(&self, index: usize) -> &[Row] {
		self.display_rows
			.get(index)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	/// Re-runs the pipelines from `target`.
	///
	/// With `skip_stage` a handler target starts at the stage after it. The
	/// final display rows are passed to the renderer.
	pub fn refresh_active_data(
		&mut self,
		target: RefreshTarget,
		skip_stage: bool,
		render_in_position: bool,
	) -> PipelineResult<()> {
		let stage = match target {
			RefreshTarget::All => Stage::DataPipeline(0),
			RefreshTarget::Display => Stage::Display,
			RefreshTarget::Handler(id) => self.stage_for(id, skip_stage)?,
		};
		let ctx = StageContext { render_in_position };

		tracing::trace!(?stage, render_in_position, "refreshing active data");

		let display_from = match stage {
			Stage::DataPipeline(index) => {
				self.run_data_pipeline(index, &ctx)?;
				Some(0)
			}
			Stage::Display => Some(0),
			Stage::DisplayPipeline(index) => Some(index),
			Stage::End => None,
		};

		if let Some(index) = display_from {
			self.run_display_pipeline(index, &ctx)?;
		}

		let rows = self.display_rows().to_vec();
		self.renderer.render(&rows, render_in_position);
		Ok(())
	}

	fn stage_for(&self, id: HandlerId, skip_stage: bool) -> PipelineResult<Stage> {
		if let Some(index) = self.data_pipeline.position(id) {
			return Ok(match (skip_stage, index + 1 == self.data_pipeline.len()) {
				(false, _) => Stage::DataPipeline(index),
				(true, true) => Stage::Display,
				(true, false) => Stage::DataPipeline(index + 1),
			});
		}

		if let Some(index) = self.display_pipeline.position(id) {
			return Ok(match (skip_stage, index + 1 == self.display_pipeline.len()) {
				(false, _) => Stage::DisplayPipeline(index),
				(true, true) => Stage::End,
				(true, false) => Stage::DisplayPipeline(index + 1),
			});
		}

		tracing::error!("Unable to refresh data, invalid handler provided: {id}");
		Err(PipelineError::UnknownHandler(id))
	}

	fn run_data_pipeline(&mut self, from: usize, ctx: &StageContext) -> PipelineResult<()> {
		// a stale cache cannot seed a partial run
		let from = if from < self.active_rows_pipeline.len() { from } else { 0 };
		if from == 0 {
			self.active_rows_pipeline = vec![self.rows.clone()];
		} else {
			self.active_rows_pipeline.truncate(from + 1);
		}

		for index in from..self.data_pipeline.len() {
			let input = self.active_rows_pipeline[index].clone();
			let output = self.data_pipeline.run_stage(index, input, ctx)?;
			self.active_rows_pipeline.push(output);
		}

		self.active_rows = self
			.active_rows_pipeline
			.last()
			.cloned()
			.unwrap_or_default();
		Ok(())
	}

	fn run_display_pipeline(&mut self, from: usize, ctx: &StageContext) -> PipelineResult<()> {
		let from = if from <= self.display_rows.len() { from } else { 0 };
		self.display_rows.truncate(from);

		for index in from..self.display_pipeline.len() {
			let input = match index {
				0 => self.active_rows.clone(),
				_ => self.display_rows[index - 1].clone(),
			};
			let output = self.display_pipeline.run_stage(index, input, ctx)?;
			self.display_rows.push(output);
		}
		Ok(())
	}
}
