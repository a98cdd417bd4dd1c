//! # Tabula Core
//!
//! The module system of a Tabula table: a global [`ModuleRegistry`] of
//! [`ModuleDescriptor`]s, the binder that instantiates and initializes one
//! instance of every registered module per [`Table`], and the
//! [`ModuleContext`] through which modules register options, functions and
//! pipeline handlers.
//!
//! ## Lifecycle
//!
//! 1. Descriptors are registered, usually once through
//!    [`ModuleRegistry::initialize`]. Extensions between modules are merged
//!    as their targets become available.
//! 2. [`Table::bind`] snapshots the registry, constructs every module, then
//!    initializes them: core modules first, then by [`InitOrder`].
//! 3. Configuration is validated against the registered options, initial
//!    data runs through the pipelines and `tableBuilt` is dispatched.
//! 4. [`Table::destroy`] tears modules down in reverse order.
//!
//! ## Example
//!
//! ```
//! use serde_json::{Value, json};
//! use tabula_core::{Element, Module, ModuleContext, ModuleDescriptor, ModuleRegistry, ModuleResult, Table};
//! use tabula_options::TableOptions;
//!
//! struct Counter;
//!
//! impl Module for Counter {
//!     fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
//!         ctx.register_table_function("rowCount", |ctx: &mut ModuleContext<'_>, _args: &[Value]| {
//!             Ok(Value::from(ctx.table().row_manager().rows().len()))
//!         });
//!         Ok(())
//!     }
//! }
//!
//! let registry = ModuleRegistry::new();
//! registry.initialize([ModuleDescriptor::new("counter", |_points, _ctx| Counter)], []);
//!
//! let options = TableOptions::from_value(json!({"data": [{"a": 1}]})).unwrap();
//! let mut table = Table::bind(&registry, Element::new("div"), options).unwrap();
//! assert_eq!(table.call("rowCount", &[]).unwrap(), json!(1));
//! ```

mod binder;
mod capability;
mod context;
mod descriptor;
mod element;
mod error;
pub mod events;
mod extension;
mod functions;
mod module;
mod order;
mod registry;
mod table;

pub use binder::resolve_init_order;
pub use capability::Capabilities;
pub use context::{ModuleContext, TableContext};
pub use descriptor::{ModuleDescriptor, ModuleFactory};
pub use element::{Element, ElementBuilder, Selector, SelectorError};
pub use error::{ModuleError, ModuleResult, RegistryError, TableError, TableResult};
pub use events::{EventBus, EventCallback, SubscriptionId};
pub use extension::{Extension, ExtensionPoint, ExtensionPoints};
pub use functions::{ComponentFunction, ComponentKind, ComponentRef, FunctionRegistry, TableFunction};
pub use module::{AsAnyModule, Module};
pub use order::InitOrder;
pub use registry::ModuleRegistry;
pub use table::{Table, TableBuilder, TableHandle, TableId};
