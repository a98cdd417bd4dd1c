//! # Tabula Registry
//!
//! Tracks live tables so they can find each other by element, selector or
//! id, e.g. for inter-table messages.
//!
//! ```
//! use tabula_core::{Element, ModuleRegistry, Table};
//! use tabula_registry::TableRegistry;
//!
//! let modules = ModuleRegistry::new();
//! let tables = TableRegistry::new();
//!
//! let element = Element::builder("div").id("orders").build();
//! let handle = Table::builder(element).build(&modules).unwrap().into_handle();
//! tables.register(&handle);
//!
//! assert_eq!(tables.lookup_table("#orders", false).len(), 1);
//! assert!(tables.lookup_table("#customers", true).is_empty());
//! ```

mod query;
mod registry;

pub use query::{InvalidQuery, TableQuery};
pub use registry::TableRegistry;
