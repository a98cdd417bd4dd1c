//! Priority-ordered handler lists.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{HandlerError, PipelineError, PipelineResult};
use crate::row::Row;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registered handler.
///
/// Returned at registration so the owning module can later find its own
/// stage without comparing closures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
	fn next() -> Self {
		Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for HandlerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "handler#{}", self.0)
	}
}

/// Per-run information handed to every stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageContext {
	/// The run was requested with the current render position preserved.
	pub render_in_position: bool,
}

/// A pipeline handler: takes the previous stage's rows, returns its own.
pub type PipelineHandler =
	Arc<dyn Fn(Vec<Row>, &StageContext) -> Result<Vec<Row>, HandlerError> + Send + Sync>;

/// Which row set a pipeline transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
	/// Raw data rows to active rows (filtering, sorting).
	Data,
	/// Active rows to display rows (grouping, pagination).
	Display,
}

/// One registered stage.
#[derive(Clone)]
pub struct PipelineStage {
	id: HandlerId,
	priority: i32,
	owner: String,
	handler: PipelineHandler,
}

impl PipelineStage {
	/// Handler identity.
	pub fn id(&self) -> HandlerId {
		self.id
	}

	/// Sort key; lower runs earlier.
	pub fn priority(&self) -> i32 {
		self.priority
	}

	/// Name of the module that registered the stage.
	pub fn owner(&self) -> &str {
		&self.owner
	}
}

impl fmt::Debug for PipelineStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PipelineStage")
			.field("id", &self.id)
			.field("priority", &self.priority)
			.field("owner", &self.owner)
			.finish_non_exhaustive()
	}
}

/// Ordered list of stages.
///
/// Stages run in ascending priority; stages with equal priority run in the
/// order they were registered.
#[derive(Debug, Clone)]
pub struct Pipeline {
	kind: PipelineKind,
	stages: Vec<PipelineStage>,
}

impl Pipeline {
	/// Creates an empty pipeline.
	pub fn new(kind: PipelineKind) -> Self {
		Self {
			kind,
			stages: Vec::new(),
		}
	}

	/// Which row set this pipeline transforms.
	pub fn kind(&self) -> PipelineKind {
		self.kind
	}

	/// Registers `handler` at `priority` and returns its identity.
	pub fn register<F>(&mut self, owner: impl Into<String>, priority: i32, handler: F) -> HandlerId
	where
		F: Fn(Vec<Row>, &StageContext) -> Result<Vec<Row>, HandlerError> + Send + Sync + 'static,
	{
		let stage = PipelineStage {
			id: HandlerId::next(),
			priority,
			owner: owner.into(),
			handler: Arc::new(handler),
		};
		let id = stage.id;

		// after every stage with priority <= the new one
		let index = self
			.stages
			.iter()
			.position(|existing| existing.priority > priority)
			.unwrap_or(self.stages.len());

		tracing::trace!(
			kind = ?self.kind,
			owner = %stage.owner,
			priority,
			index,
			"registered pipeline handler"
		);
		self.stages.insert(index, stage);
		id
	}

	/// Index of the stage registered as `id`.
	pub fn position(&self, id: HandlerId) -> Option<usize> {
		self.stages.iter().position(|stage| stage.id == id)
	}

	/// Stages in execution order.
	pub fn stages(&self) -> &[PipelineStage] {
		&self.stages
	}

	/// Number of stages.
	pub fn len(&self) -> usize {
		self.stages.len()
	}

	/// Returns `true` if no stage is registered.
	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	/// Runs the stage at `index` on `rows`.
	///
	/// # Panics
	///
	/// Panics if `index` is out of bounds.
	pub fn run_stage(&self, index: usize, rows: Vec<Row>, ctx: &StageContext) -> PipelineResult<Vec<Row>> {
		let stage = &self.stages[index];
		(stage.handler)(rows, ctx).map_err(|source| PipelineError::HandlerFailed {
			owner: stage.owner.clone(),
			priority: stage.priority,
			source,
		})
	}

	/// Folds `rows` through every stage in order.
	pub fn run(&self, rows: Vec<Row>, ctx: &StageContext) -> PipelineResult<Vec<Row>> {
		(0..self.stages.len()).try_fold(rows, |rows, index| self.run_stage(index, rows, ctx))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::row::{Row, RowId};
	use parking_lot::Mutex;
	use rstest::rstest;
	use serde_json::Map;

	fn rows(count: u64) -> Vec<Row> {
		(0..count).map(|id| Row::new(RowId(id), Map::new())).collect()
	}

	#[rstest]
	fn test_stages_run_in_priority_order() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let mut pipeline = Pipeline::new(PipelineKind::Data);

		for priority in [10, 1, 5] {
			let calls = calls.clone();
			pipeline.register("recorder", priority, move |rows, _| {
				calls.lock().push(priority);
				Ok(rows)
			});
		}

		pipeline.run(rows(2), &StageContext::default()).unwrap();
		assert_eq!(*calls.lock(), vec![1, 5, 10]);
	}

	#[rstest]
	fn test_equal_priorities_keep_registration_order() {
		let mut pipeline = Pipeline::new(PipelineKind::Display);
		let first = pipeline.register("first", 5, |rows, _| Ok(rows));
		let early = pipeline.register("early", 0, |rows, _| Ok(rows));
		let second = pipeline.register("second", 5, |rows, _| Ok(rows));

		assert_eq!(pipeline.position(early), Some(0));
		assert_eq!(pipeline.position(first), Some(1));
		assert_eq!(pipeline.position(second), Some(2));

		let owners: Vec<&str> = pipeline.stages().iter().map(PipelineStage::owner).collect();
		assert_eq!(owners, vec!["early", "first", "second"]);
	}

	#[rstest]
	fn test_each_stage_receives_previous_output() {
		let mut pipeline = Pipeline::new(PipelineKind::Data);
		pipeline.register("drop-first", 1, |mut rows, _| {
			rows.remove(0);
			Ok(rows)
		});
		pipeline.register("reverse", 2, |mut rows, _| {
			rows.reverse();
			Ok(rows)
		});

		let output = pipeline.run(rows(4), &StageContext::default()).unwrap();
		let ids: Vec<u64> = output.iter().map(|row| row.id().0).collect();
		assert_eq!(ids, vec![3, 2, 1]);
	}

	#[rstest]
	fn test_failing_stage_aborts_run() {
		let reached = Arc::new(Mutex::new(false));
		let mut pipeline = Pipeline::new(PipelineKind::Data);
		pipeline.register("broken", 1, |_, _| Err("comparator exploded".into()));
		{
			let reached = reached.clone();
			pipeline.register("after", 2, move |rows, _| {
				*reached.lock() = true;
				Ok(rows)
			});
		}

		let err = pipeline.run(rows(1), &StageContext::default()).unwrap_err();
		assert!(matches!(err, PipelineError::HandlerFailed { ref owner, priority: 1, .. } if owner == "broken"));
		assert!(!*reached.lock());
	}

	#[rstest]
	fn test_unknown_handler_has_no_position() {
		let mut other = Pipeline::new(PipelineKind::Data);
		let foreign = other.register("other", 0, |rows, _| Ok(rows));

		let pipeline = Pipeline::new(PipelineKind::Data);
		assert_eq!(pipeline.position(foreign), None);
		assert!(pipeline.is_empty());
	}
}
