//! A module registry and a table registry wired together.

use std::sync::Arc;

use serde_json::Value;
use tabula_core::{
	Element, Extension, ModuleDescriptor, ModuleRegistry, RegistryError, Table, TableBuilder, TableHandle, TableResult,
};
use tabula_options::TableOptions;
use tabula_registry::{TableQuery, TableRegistry};

/// Everything tables need to find their modules and each other.
///
/// Cloning shares the same registries.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tabula::{Element, Tabula, TableOptions};
///
/// let tabula = Tabula::new();
/// tabula.initialize([]);
///
/// let options = TableOptions::from_value(json!({"data": [{"name": "Ada"}]})).unwrap();
/// let table = tabula
///     .build_table(Element::builder("div").id("people").build(), options)
///     .unwrap();
///
/// assert_eq!(table.lock().rows().len(), 1);
/// assert_eq!(tabula.lookup_table("#people", false).len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Tabula {
	modules: Arc<ModuleRegistry>,
	tables: Arc<TableRegistry>,
}

impl Tabula {
	/// Creates empty registries.
	pub fn new() -> Self {
		Self::default()
	}

	/// The shared module registry.
	pub fn modules(&self) -> &Arc<ModuleRegistry> {
		&self.modules
	}

	/// The shared table registry.
	pub fn tables(&self) -> &Arc<TableRegistry> {
		&self.tables
	}

	/// Registers the core module set followed by `extra`.
	///
	/// Only the first call has any effect.
	pub fn initialize<I>(&self, extra: I) -> Vec<RegistryError>
	where
		I: IntoIterator<Item = ModuleDescriptor>,
	{
		self.modules.initialize(self.core_modules(), extra)
	}

	#[cfg(feature = "builtins")]
	fn core_modules(&self) -> Vec<ModuleDescriptor> {
		tabula_builtins::core_modules(Arc::clone(&self.tables))
	}

	#[cfg(not(feature = "builtins"))]
	fn core_modules(&self) -> Vec<ModuleDescriptor> {
		Vec::new()
	}

	/// Registers one module descriptor.
	pub fn register_module(&self, descriptor: ModuleDescriptor) -> Vec<RegistryError> {
		self.modules.register_module(descriptor)
	}

	/// Registers several module descriptors in order.
	pub fn register_modules<I>(&self, descriptors: I) -> Vec<RegistryError>
	where
		I: IntoIterator<Item = ModuleDescriptor>,
	{
		self.modules.register_modules(descriptors, false)
	}

	/// Adds entries to a registered module's extension point.
	pub fn extend(&self, extension: Extension) -> Result<(), RegistryError> {
		self.modules.apply_extension(extension)
	}

	/// Starts a table on `element`; finish it with
	/// [`build`](Self::build).
	pub fn table(&self, element: Element) -> TableBuilder {
		Table::builder(element)
	}

	/// Binds a table and registers it for lookups.
	///
	/// Initializes the registry with the core set first if nobody has.
	pub fn build(&self, builder: TableBuilder) -> TableResult<TableHandle> {
		if !self.modules.is_initialized() {
			tracing::debug!("module registry not initialized, registering core modules");
			self.initialize([]);
		}
		let handle = builder.build(&self.modules)?.into_handle();
		self.tables.register(&handle);
		Ok(handle)
	}

	/// Builds and registers a table from `options`.
	pub fn build_table(&self, element: Element, options: TableOptions) -> TableResult<TableHandle> {
		self.build(self.table(element).options(options))
	}

	/// Destroys a table and removes it from lookups.
	pub fn destroy_table(&self, handle: &TableHandle) {
		let id = {
			let mut table = handle.lock();
			table.destroy();
			table.id()
		};
		self.tables.deregister(id);
		tracing::debug!(table = %id, "table destroyed and deregistered");
	}

	/// Finds registered tables, see [`TableRegistry::lookup_table`].
	pub fn lookup_table(&self, query: impl Into<TableQuery>, silent: bool) -> Vec<TableHandle> {
		self.tables.lookup_table(query, silent)
	}

	/// Finds registered tables from a JSON query.
	pub fn lookup_value(&self, query: &Value, silent: bool) -> Vec<TableHandle> {
		self.tables.lookup_value(query, silent)
	}
}

impl std::fmt::Debug for Tabula {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Tabula")
			.field("modules", &self.modules)
			.field("tables", &self.tables)
			.finish()
	}
}
