//! # Tabula
//!
//! The module composition system of a data-grid table.
//!
//! Features are packaged as modules. Each module kind is described once by a
//! [`ModuleDescriptor`] in a shared [`ModuleRegistry`]; every table built
//! afterwards gets its own instance of every registered module, initialized
//! in a deterministic order. Modules talk to their table through a
//! [`ModuleContext`]:
//!
//! - **Options**: table and column options with registered defaults and
//!   first-registration-wins semantics ([`tabula_options`]).
//! - **Pipelines**: priority-ordered data and display row handlers
//!   ([`tabula_pipeline`]).
//! - **Functions and capabilities**: public table functions, component
//!   functions and typed services other modules can consume.
//! - **Extension points**: named registries one module declares and others
//!   add to, even before the declaring module is registered.
//!
//! Live tables are tracked by a [`TableRegistry`] and found by element,
//! selector or id.
//!
//! ## Feature Flags
//!
//! - `builtins` (default) - registers the `layout`, `localize` and `comms`
//!   core modules in [`Tabula::initialize`]
//!
//! ## Quick Start
//!
//! ```
//! use serde_json::{Value, json};
//! use tabula::prelude::*;
//!
//! struct EvenRows;
//!
//! impl Module for EvenRows {
//!     fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
//!         ctx.register_data_handler(
//!             |rows: Vec<Row>, _: &StageContext| {
//!                 Ok(rows
//!                     .into_iter()
//!                     .filter(|row| row.get("n").and_then(Value::as_i64).is_some_and(|n| n % 2 == 0))
//!                     .collect())
//!             },
//!             10,
//!         );
//!         Ok(())
//!     }
//! }
//!
//! let tabula = Tabula::new();
//! tabula.initialize([ModuleDescriptor::new("even", |_points, _ctx| EvenRows)]);
//!
//! let options = TableOptions::from_value(json!({"data": [{"n": 1}, {"n": 2}, {"n": 4}]})).unwrap();
//! let table = tabula.build_table(Element::new("div"), options).unwrap();
//!
//! assert_eq!(table.lock().active_rows().len(), 2);
//! ```

mod environment;

pub use environment::Tabula;

pub use tabula_core::{
	AsAnyModule, Capabilities, ComponentFunction, ComponentKind, ComponentRef, Element, ElementBuilder, EventBus,
	EventCallback, Extension, ExtensionPoint, ExtensionPoints, FunctionRegistry, InitOrder, Module, ModuleContext,
	ModuleDescriptor, ModuleError, ModuleFactory, ModuleRegistry, ModuleResult, RegistryError, Selector, SelectorError,
	SubscriptionId, Table, TableBuilder, TableContext, TableError, TableFunction, TableHandle, TableId, TableResult,
	events, resolve_init_order,
};
pub use tabula_options::{
	ColumnDefinition, GeneratedOptions, OptionError, OptionResult, OptionScope, OptionsList, TableOptions,
};
pub use tabula_pipeline::{
	HandlerError, HandlerId, NullRenderer, Pipeline, PipelineError, PipelineHandler, PipelineKind, PipelineResult,
	PipelineStage, RefreshTarget, Row, RowData, RowId, RowManager, RowRenderer, StageContext,
};
pub use tabula_registry::{InvalidQuery, TableQuery, TableRegistry};

#[cfg(feature = "builtins")]
pub use tabula_builtins as builtins;

/// Commonly used types.
pub mod prelude {
	pub use crate::Tabula;
	pub use tabula_core::{
		ComponentKind, ComponentRef, Element, Extension, ExtensionPoint, InitOrder, Module, ModuleContext,
		ModuleDescriptor, ModuleResult, Table, TableError, TableHandle, TableResult,
	};
	pub use tabula_options::TableOptions;
	pub use tabula_pipeline::{HandlerId, Row, RowData, StageContext};
	pub use tabula_registry::TableQuery;
}
