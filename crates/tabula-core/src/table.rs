//! Table construction and the host API modules are bound into.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_options::{ColumnDefinition, TableOptions};
use tabula_pipeline::{Row, RowData, RowId, RowManager, RowRenderer};

use crate::binder::resolve_init_order;
use crate::context::{ModuleContext, TableContext};
use crate::element::Element;
use crate::error::{TableError, TableResult};
use crate::events::{DATA_PROCESSED, EventCallback, SubscriptionId, TABLE_BUILT, TABLE_DESTROYED};
use crate::functions::ComponentRef;
use crate::module::Module;
use crate::registry::ModuleRegistry;

static NEXT_TABLE: AtomicU64 = AtomicU64::new(1);

/// Process-unique table identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(u64);

impl TableId {
	pub(crate) fn next() -> Self {
		Self(NEXT_TABLE.fetch_add(1, Ordering::Relaxed))
	}

	/// Rebuilds an id from its numeric form, e.g. one received as JSON.
	pub fn from_raw(id: u64) -> Self {
		Self(id)
	}

	/// The raw id.
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for TableId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "table#{}", self.0)
	}
}

/// Shared handle to a built table.
pub type TableHandle = Arc<Mutex<Table>>;

/// Configures a table before binding it against a registry.
pub struct TableBuilder {
	element: Element,
	options: TableOptions,
	renderer: Option<Box<dyn RowRenderer>>,
	listeners: Vec<(String, EventCallback)>,
}

impl TableBuilder {
	/// Sets the table configuration.
	pub fn options(mut self, options: TableOptions) -> Self {
		self.options = options;
		self
	}

	/// Receives the display rows after every pipeline run.
	pub fn renderer(mut self, renderer: impl RowRenderer + 'static) -> Self {
		self.renderer = Some(Box::new(renderer));
		self
	}

	/// Subscribes to a table event before any module is constructed, so
	/// `tableBuilt` can be observed.
	pub fn on<F>(mut self, event: impl Into<String>, callback: F) -> Self
	where
		F: Fn(&Value) + Send + Sync + 'static,
	{
		self.listeners.push((event.into(), Arc::new(callback)));
		self
	}

	/// Binds every module in `registry` to a new table.
	pub fn build(self, registry: &ModuleRegistry) -> TableResult<Table> {
		let row_manager = match self.renderer {
			Some(renderer) => RowManager::with_renderer(renderer),
			None => RowManager::new(),
		};
		let mut ctx = TableContext::new(TableId::next(), self.element, self.options, row_manager);
		for (event, callback) in self.listeners {
			ctx.events_mut().subscribe(event, callback);
		}
		Table::bind_context(registry, ctx)
	}
}

/// A table with its modules bound and initialized.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tabula_core::{Element, ModuleRegistry, Table};
/// use tabula_options::TableOptions;
///
/// let registry = ModuleRegistry::new();
/// let options = TableOptions::from_value(json!({"data": [{"id": 1}, {"id": 2}]})).unwrap();
///
/// let table = Table::bind(&registry, Element::new("div"), options).unwrap();
/// assert!(table.is_initialized());
/// assert_eq!(table.active_rows().len(), 2);
/// ```
pub struct Table {
	ctx: TableContext,
	modules: IndexMap<String, Box<dyn Module>>,
	init_sequence: Vec<String>,
	destroyed: bool,
}

impl Table {
	/// Starts a table bound to `element`.
	pub fn builder(element: Element) -> TableBuilder {
		TableBuilder {
			element,
			options: TableOptions::default(),
			renderer: None,
			listeners: Vec::new(),
		}
	}

	/// Builds a table on `element` with `options` and every module in
	/// `registry`.
	pub fn bind(registry: &ModuleRegistry, element: Element, options: TableOptions) -> TableResult<Self> {
		Self::builder(element).options(options).build(registry)
	}

	fn bind_context(registry: &ModuleRegistry, mut ctx: TableContext) -> TableResult<Self> {
		// Module code may touch the registry, so never run it under the lock.
		let descriptors = registry.descriptors();
		ctx.set_installed(descriptors.iter().map(|d| d.name().to_string()).collect());

		let mut modules = IndexMap::with_capacity(descriptors.len());
		for descriptor in &descriptors {
			let mut module_ctx = ModuleContext::new(descriptor.name(), &mut ctx);
			let module = descriptor.instantiate(&mut module_ctx);
			modules.insert(descriptor.name().to_string(), module);
		}

		let init_sequence: Vec<String> = resolve_init_order(
			descriptors
				.iter()
				.map(|d| (d.name(), d.is_core(), d.init_order())),
		)
		.into_iter()
		.map(str::to_string)
		.collect();
		tracing::debug!(table = %ctx.id(), sequence = ?init_sequence, "initializing modules");

		for name in &init_sequence {
			let Some(module) = modules.get_mut(name.as_str()) else {
				continue;
			};
			let mut module_ctx = ModuleContext::new(name, &mut ctx);
			module.initialize(&mut module_ctx).map_err(|source| {
				tracing::error!(table = %ctx.id(), module = %name, %source, "module failed to initialize");
				TableError::ModuleInit {
					module: name.clone(),
					source,
				}
			})?;
		}

		let mut table = Self {
			ctx,
			modules,
			init_sequence,
			destroyed: false,
		};
		table.finish_build()?;
		Ok(table)
	}

	fn finish_build(&mut self) -> TableResult<()> {
		let warn = self.ctx.options().flag("debugInvalidOptions");
		let mut unknown = self.ctx.options().unknown_keys(warn).len();

		let columns: Vec<ColumnDefinition> = self.ctx.options().get_as("columns")?.unwrap_or_default();
		for definition in &columns {
			unknown += self.ctx.column_options().unknown_keys(definition, warn).len();
		}
		if unknown > 0 {
			tracing::debug!(table = %self.ctx.id(), unknown, "unregistered options configured");
		}
		self.ctx.set_columns(columns);
		self.ctx.mark_initialized();

		let data: Vec<RowData> = self.ctx.options().get_as("data")?.unwrap_or_default();
		self.load(data)?;

		tracing::info!(
			table = %self.ctx.id(),
			modules = self.modules.len(),
			rows = self.ctx.row_manager().rows().len(),
			"table built"
		);
		self.ctx.events().dispatch(TABLE_BUILT, &Value::Null);
		Ok(())
	}

	fn load(&mut self, data: Vec<RowData>) -> TableResult<()> {
		self.ctx.row_manager_mut().set_data(data)?;
		let processed = Value::from(self.ctx.row_manager().active_rows().len());
		self.ctx.events().dispatch(DATA_PROCESSED, &processed);
		Ok(())
	}

	fn ensure_alive(&self) -> TableResult<()> {
		if self.destroyed {
			return Err(TableError::Destroyed(self.ctx.id()));
		}
		Ok(())
	}

	/// This table's id.
	pub fn id(&self) -> TableId {
		self.ctx.id()
	}

	/// The element this table is bound to.
	pub fn element(&self) -> &Element {
		self.ctx.element()
	}

	/// Shared table state.
	pub fn context(&self) -> &TableContext {
		&self.ctx
	}

	/// Mutable access to the shared table state.
	pub fn context_mut(&mut self) -> &mut TableContext {
		&mut self.ctx
	}

	/// Table options with every registered default.
	pub fn options(&self) -> &TableOptions {
		self.ctx.options()
	}

	/// True once binding has finished.
	pub fn is_initialized(&self) -> bool {
		self.ctx.is_initialized()
	}

	/// True after [`destroy`](Self::destroy).
	pub fn is_destroyed(&self) -> bool {
		self.destroyed
	}

	/// Module names in the order they were initialized.
	pub fn init_sequence(&self) -> &[String] {
		&self.init_sequence
	}

	/// True if `name` is installed in this table.
	pub fn mod_exists(&self, name: &str) -> bool {
		self.modules.contains_key(name)
	}

	/// A module instance downcast to its concrete type, with a context for
	/// calling into it.
	pub fn module<M: Module>(&mut self, name: &str) -> Option<(&mut M, ModuleContext<'_>)> {
		let (_, key, module) = self.modules.get_full_mut(name)?;
		let module = module.as_mut().as_any_mut().downcast_mut::<M>()?;
		Some((module, ModuleContext::new(key, &mut self.ctx)))
	}

	/// A service published by one of this table's modules.
	pub fn capability<T>(&self, name: &str) -> Option<Arc<T>>
	where
		T: ?Sized + Send + Sync + 'static,
	{
		self.ctx.capabilities().get(name)
	}

	/// Calls a table function registered by a module.
	pub fn call(&mut self, name: &str, args: &[Value]) -> TableResult<Value> {
		self.ensure_alive()?;
		self.ctx.call_function(name, args)
	}

	/// Calls a component function on a row, column or cell.
	pub fn call_component(&mut self, component: &ComponentRef, name: &str, args: &[Value]) -> TableResult<Value> {
		self.ensure_alive()?;
		self.ctx.call_component_function(component, name, args)
	}

	/// Replaces the table's data and re-runs both pipelines.
	pub fn set_data(&mut self, data: impl IntoIterator<Item = RowData>) -> TableResult<()> {
		self.ensure_alive()?;
		self.load(data.into_iter().collect())
	}

	/// Appends a row and refreshes the pipelines.
	pub fn add_row(&mut self, data: RowData) -> TableResult<RowId> {
		self.ensure_alive()?;
		let id = self.ctx.row_manager_mut().add_row(data)?;
		let processed = Value::from(self.ctx.row_manager().active_rows().len());
		self.ctx.events().dispatch(DATA_PROCESSED, &processed);
		Ok(id)
	}

	/// Every row, unfiltered.
	pub fn rows(&self) -> &[Row] {
		self.ctx.row_manager().rows()
	}

	/// Rows after the data pipeline.
	pub fn active_rows(&self) -> &[Row] {
		self.ctx.row_manager().active_rows()
	}

	/// Rows after the display pipeline.
	pub fn display_rows(&self) -> &[Row] {
		self.ctx.row_manager().display_rows()
	}

	/// Subscribes to a table event.
	pub fn on<F>(&mut self, event: &str, callback: F) -> SubscriptionId
	where
		F: Fn(&Value) + Send + Sync + 'static,
	{
		self.ctx.events_mut().subscribe(event, Arc::new(callback))
	}

	/// Removes a subscription; returns false if it was unknown.
	pub fn off(&mut self, subscription: SubscriptionId) -> bool {
		self.ctx.events_mut().unsubscribe(subscription)
	}

	/// Delivers an inter-table message to `module` on this table.
	///
	/// A missing module is logged and yields `Ok(None)`.
	pub fn receive_comms(
		&mut self,
		sender: &Element,
		module: &str,
		action: &str,
		data: &Value,
	) -> TableResult<Option<Value>> {
		self.ensure_alive()?;
		let Some((_, key, instance)) = self.modules.get_full_mut(module) else {
			tracing::warn!(
				table = %self.ctx.id(),
				module,
				action,
				"Inter-table Comms Error - no such module: {module}"
			);
			return Ok(None);
		};
		let mut ctx = ModuleContext::new(key, &mut self.ctx);
		instance
			.comms_received(&mut ctx, sender, action, data)
			.map_err(|source| TableError::Comms {
				module: module.to_string(),
				action: action.to_string(),
				source,
			})
	}

	/// Runs every module's `destroy` hook in reverse initialization order.
	///
	/// Destroying twice is a no-op.
	pub fn destroy(&mut self) {
		if self.destroyed {
			return;
		}
		for name in self.init_sequence.iter().rev() {
			if let Some((_, key, module)) = self.modules.get_full_mut(name.as_str()) {
				let mut ctx = ModuleContext::new(key, &mut self.ctx);
				module.destroy(&mut ctx);
			}
		}
		self.destroyed = true;
		tracing::debug!(table = %self.ctx.id(), "table destroyed");
		self.ctx.events().dispatch(TABLE_DESTROYED, &Value::Null);
	}

	/// Wraps the table for shared use.
	pub fn into_handle(self) -> TableHandle {
		Arc::new(Mutex::new(self))
	}
}

impl fmt::Debug for Table {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Table")
			.field("id", &self.ctx.id())
			.field("element", self.ctx.element())
			.field("init_sequence", &self.init_sequence)
			.field("destroyed", &self.destroyed)
			.finish_non_exhaustive()
	}
}
