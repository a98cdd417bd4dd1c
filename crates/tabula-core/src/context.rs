//! Per-table state shared by modules, and the module-scoped view of it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tabula_options::{ColumnDefinition, OptionScope, OptionsList, TableOptions};
use tabula_pipeline::{HandlerError, HandlerId, PipelineResult, RefreshTarget, Row, RowManager, StageContext};

use crate::capability::Capabilities;
use crate::element::Element;
use crate::error::{ModuleResult, TableError, TableResult};
use crate::events::{EventBus, EventCallback, SubscriptionId};
use crate::functions::{ComponentFunction, ComponentKind, ComponentRef, FunctionRegistry, TableFunction};
use crate::table::TableId;

/// Options the table itself owns, registered before any module is built.
pub(crate) fn table_defaults() -> [(&'static str, Value); 5] {
	[
		("data", Value::Array(Vec::new())),
		("columns", Value::Array(Vec::new())),
		("debugInvalidOptions", Value::Bool(true)),
		("debugInvalidComponentFuncs", Value::Bool(true)),
		("debugInitialization", Value::Bool(true)),
	]
}

/// Column options the table itself owns.
pub(crate) fn column_defaults() -> [(&'static str, Value); 6] {
	[
		("title", Value::Null),
		("field", Value::Null),
		("visible", Value::Bool(true)),
		("width", Value::Null),
		("minWidth", Value::Null),
		("maxWidth", Value::Null),
	]
}

/// State one table shares with all of its modules.
pub struct TableContext {
	id: TableId,
	element: Element,
	pub(crate) options: TableOptions,
	column_options: OptionsList,
	columns: Vec<ColumnDefinition>,
	row_manager: RowManager,
	capabilities: Capabilities,
	pub(crate) functions: FunctionRegistry,
	events: EventBus,
	installed: Vec<String>,
	handlers: HashMap<String, HandlerId>,
	initialized: bool,
}

impl TableContext {
	pub(crate) fn new(id: TableId, element: Element, mut options: TableOptions, row_manager: RowManager) -> Self {
		for (key, default) in table_defaults() {
			options.register(key, default);
		}
		let mut column_options = OptionsList::new(OptionScope::Column);
		for (key, default) in column_defaults() {
			column_options.register(key, default);
		}
		Self {
			id,
			element,
			options,
			column_options,
			columns: Vec::new(),
			row_manager,
			capabilities: Capabilities::new(),
			functions: FunctionRegistry::new(),
			events: EventBus::new(),
			installed: Vec::new(),
			handlers: HashMap::new(),
			initialized: false,
		}
	}

	/// The owning table's id.
	pub fn id(&self) -> TableId {
		self.id
	}

	/// The element the table is bound to.
	pub fn element(&self) -> &Element {
		&self.element
	}

	/// Table options with every registered default.
	pub fn options(&self) -> &TableOptions {
		&self.options
	}

	/// Registered column option defaults.
	pub fn column_options(&self) -> &OptionsList {
		&self.column_options
	}

	/// Column definitions as configured, available once the table is built.
	pub fn columns(&self) -> &[ColumnDefinition] {
		&self.columns
	}

	/// Resolves a column option: the definition's value, else the registered
	/// default.
	pub fn column_option(&self, column: usize, key: &str) -> Option<&Value> {
		self.columns
			.get(column)
			.and_then(|definition| self.column_options.resolve(definition, key))
	}

	/// Rows and their pipelines.
	pub fn row_manager(&self) -> &RowManager {
		&self.row_manager
	}

	/// Mutable access to rows and their pipelines.
	pub fn row_manager_mut(&mut self) -> &mut RowManager {
		&mut self.row_manager
	}

	/// Services published by installed modules.
	pub fn capabilities(&self) -> &Capabilities {
		&self.capabilities
	}

	/// Registered table and component functions.
	pub fn functions(&self) -> &FunctionRegistry {
		&self.functions
	}

	/// The table's event bus.
	pub fn events(&self) -> &EventBus {
		&self.events
	}

	/// Mutable access to the table's event bus.
	pub fn events_mut(&mut self) -> &mut EventBus {
		&mut self.events
	}

	/// Names of every module installed on this table, in registration order.
	pub fn installed_modules(&self) -> &[String] {
		&self.installed
	}

	/// True if `name` was bound into this table.
	pub fn is_installed(&self, name: &str) -> bool {
		self.installed.iter().any(|installed| installed == name)
	}

	/// True once every module has initialized.
	pub fn is_initialized(&self) -> bool {
		self.initialized
	}

	pub(crate) fn set_installed(&mut self, names: Vec<String>) {
		self.installed = names;
	}

	pub(crate) fn set_columns(&mut self, columns: Vec<ColumnDefinition>) {
		self.columns = columns;
	}

	pub(crate) fn mark_initialized(&mut self) {
		self.initialized = true;
	}

	/// Invokes a table function with its owning module's context.
	///
	/// Calling before the table has finished building is allowed but logged
	/// when `debugInitialization` is set.
	pub fn call_function(&mut self, name: &str, args: &[Value]) -> TableResult<Value> {
		if !self.initialized && self.options.flag("debugInitialization") {
			tracing::warn!(
				table = %self.id,
				function = name,
				"Table Not Initialized - Calling the {name} function before the table is initialized may result in inconsistent behavior, wait for the tableBuilt event before calling it"
			);
		}
		let bound = self
			.functions
			.table_function(name)
			.ok_or_else(|| TableError::UnknownFunction(name.to_string()))?;
		let mut ctx = ModuleContext::new(&bound.owner, self);
		(bound.function)(&mut ctx, args).map_err(|source| TableError::Function {
			name: name.to_string(),
			source,
		})
	}

	/// Invokes a component function bound for `component`'s kind.
	pub fn call_component_function(
		&mut self,
		component: &ComponentRef,
		name: &str,
		args: &[Value],
	) -> TableResult<Value> {
		let kind = component.kind();
		let Some(bound) = self.functions.component_function(kind, name) else {
			if self.options.flag("debugInvalidComponentFuncs") {
				tracing::warn!(
					table = %self.id,
					%kind,
					function = name,
					"Component Function Error - That function does not exist: {name}"
				);
			}
			return Err(TableError::UnknownComponentFunction {
				kind,
				name: name.to_string(),
			});
		};
		let mut ctx = ModuleContext::new(&bound.owner, self);
		(bound.function)(&mut ctx, component, args).map_err(|source| TableError::Function {
			name: name.to_string(),
			source,
		})
	}

	fn handler_of(&self, module: &str) -> Option<HandlerId> {
		self.handlers.get(module).copied()
	}
}

/// A table's state as seen from one module.
///
/// Registrations made through this view are attributed to the module, and
/// pipeline helpers act relative to the module's own handler.
pub struct ModuleContext<'a> {
	module: &'a str,
	table: &'a mut TableContext,
}

impl<'a> ModuleContext<'a> {
	pub(crate) fn new(module: &'a str, table: &'a mut TableContext) -> Self {
		Self { module, table }
	}

	/// Name of the module this context belongs to.
	pub fn module_name(&self) -> &str {
		self.module
	}

	/// The table being built.
	pub fn table(&self) -> &TableContext {
		&*self.table
	}

	/// Mutable access to the table being built.
	pub fn table_mut(&mut self) -> &mut TableContext {
		&mut *self.table
	}

	/// Registers a table option with its default. The first registration of
	/// a key wins.
	pub fn register_table_option(&mut self, key: &str, default: impl Into<Value>) -> bool {
		self.table.options.register(key, default.into())
	}

	/// Registers a column option; use `Value::Null` for options without a
	/// default.
	pub fn register_column_option(&mut self, key: &str, default: impl Into<Value>) -> bool {
		self.table.column_options.register(key, default.into())
	}

	/// The option's effective value: configured, else registered default.
	pub fn option(&self, key: &str) -> Option<&Value> {
		self.table.options.get(key)
	}

	/// Reads an option, deserialized into `T`.
	pub fn option_as<T: DeserializeOwned>(&self, key: &str) -> ModuleResult<Option<T>> {
		Ok(self.table.options.get_as(key)?)
	}

	/// Overrides the configured value of an option at runtime.
	pub fn set_option(&mut self, key: &str, value: impl Into<Value>) {
		self.table.options.set(key, value.into());
	}

	/// Registers a public table function owned by this module.
	pub fn register_table_function<F>(&mut self, name: &str, function: F) -> bool
	where
		F: Fn(&mut ModuleContext<'_>, &[Value]) -> ModuleResult<Value> + Send + Sync + 'static,
	{
		let function: TableFunction = Arc::new(function);
		self.table.functions.register_table(self.module, name, function)
	}

	/// Registers a function on row, column or cell components.
	pub fn register_component_function<F>(&mut self, kind: ComponentKind, name: &str, function: F) -> bool
	where
		F: Fn(&mut ModuleContext<'_>, &ComponentRef, &[Value]) -> ModuleResult<Value> + Send + Sync + 'static,
	{
		let function: ComponentFunction = Arc::new(function);
		self.table
			.functions
			.register_component(self.module, kind, name, function)
	}

	/// Adds a stage to the data pipeline and remembers it as this module's
	/// handler.
	pub fn register_data_handler<F>(&mut self, handler: F, priority: i32) -> HandlerId
	where
		F: Fn(Vec<Row>, &StageContext) -> Result<Vec<Row>, HandlerError> + Send + Sync + 'static,
	{
		let id = self
			.table
			.row_manager
			.register_data_handler(self.module, priority, handler);
		self.table.handlers.insert(self.module.to_string(), id);
		id
	}

	/// Adds a stage to the display pipeline and remembers it as this module's
	/// handler.
	pub fn register_display_handler<F>(&mut self, handler: F, priority: i32) -> HandlerId
	where
		F: Fn(Vec<Row>, &StageContext) -> Result<Vec<Row>, HandlerError> + Send + Sync + 'static,
	{
		let id = self
			.table
			.row_manager
			.register_display_handler(self.module, priority, handler);
		self.table.handlers.insert(self.module.to_string(), id);
		id
	}

	/// The handler most recently registered by this module.
	pub fn handler(&self) -> Option<HandlerId> {
		self.table.handler_of(self.module)
	}

	/// Rows at a display stage relative to this module's own stage.
	///
	/// `offset` 0 reads this module's output, -1 its input and so on. Without
	/// a display handler, or when the target lies before the first stage, the
	/// active rows are returned; past the last stage the result is empty.
	pub fn current_display_rows(&self, offset: isize) -> &[Row] {
		let manager = &self.table.row_manager;
		let position = self
			.handler()
			.and_then(|id| manager.display_pipeline().position(id));
		match position {
			Some(index) => {
				let target = index as isize + offset;
				if target < 0 {
					manager.active_rows()
				} else {
					manager.display_rows_at(target as usize)
				}
			}
			None => manager.active_rows(),
		}
	}

	/// Re-runs the pipelines from `handler`'s stage, or from this module's
	/// own stage when `handler` is `None`. Does nothing when neither exists.
	pub fn refresh_active_data(&mut self, render_in_position: bool, handler: Option<HandlerId>) -> PipelineResult<()> {
		let Some(handler) = handler.or_else(|| self.handler()) else {
			tracing::debug!(module = self.module, "refresh requested without a pipeline handler");
			return Ok(());
		};
		self.table
			.row_manager
			.refresh_active_data(RefreshTarget::Handler(handler), false, render_in_position)
	}

	/// Whether `name` is installed on this table; warns when a `required`
	/// module is missing.
	pub fn mod_exists(&self, name: &str, required: bool) -> bool {
		let exists = self.table.is_installed(name);
		if !exists && required {
			tracing::error!(
				module = self.module,
				required = name,
				"Table Module Not Installed: {name}"
			);
		}
		exists
	}

	/// Publishes a capability under this module's name.
	pub fn publish<T>(&mut self, service: Arc<T>)
	where
		T: ?Sized + Send + Sync + 'static,
	{
		self.table.capabilities.publish(self.module, service);
	}

	/// Publishes `service` under an explicit name.
	pub fn publish_as<T>(&mut self, name: &str, service: Arc<T>)
	where
		T: ?Sized + Send + Sync + 'static,
	{
		self.table.capabilities.publish(name, service);
	}

	/// A service published by any installed module.
	pub fn capability<T>(&self, name: &str) -> Option<Arc<T>>
	where
		T: ?Sized + Send + Sync + 'static,
	{
		self.table.capabilities.get(name)
	}

	/// Listens for `event` on this table.
	pub fn subscribe<F>(&mut self, event: &str, callback: F) -> SubscriptionId
	where
		F: Fn(&Value) + Send + Sync + 'static,
	{
		let callback: EventCallback = Arc::new(callback);
		self.table.events.subscribe(event, callback)
	}

	/// Dispatches `event`; returns the number of callbacks run.
	pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
		self.table.events.dispatch(event, payload)
	}

	/// Calls a table function bound by any module on this table.
	pub fn call(&mut self, name: &str, args: &[Value]) -> TableResult<Value> {
		self.table.call_function(name, args)
	}
}
