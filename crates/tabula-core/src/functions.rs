//! Table-level and component-level function registries.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_pipeline::RowId;

use crate::context::ModuleContext;
use crate::error::ModuleResult;

/// A function exposed on the table's public API by a module.
pub type TableFunction =
	Arc<dyn Fn(&mut ModuleContext<'_>, &[Value]) -> ModuleResult<Value> + Send + Sync>;

/// A function exposed on rows, columns or cells by a module.
pub type ComponentFunction =
	Arc<dyn Fn(&mut ModuleContext<'_>, &ComponentRef, &[Value]) -> ModuleResult<Value> + Send + Sync>;

/// Kinds of table component that can carry module functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
	Row,
	Column,
	Cell,
}

impl fmt::Display for ComponentKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Row => "row",
			Self::Column => "column",
			Self::Cell => "cell",
		})
	}
}

/// A concrete component a component function is invoked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentRef {
	Row(RowId),
	/// Column by field name.
	Column(String),
	Cell { row: RowId, column: String },
}

impl ComponentRef {
	/// Which kind of component this refers to.
	pub fn kind(&self) -> ComponentKind {
		match self {
			Self::Row(_) => ComponentKind::Row,
			Self::Column(_) => ComponentKind::Column,
			Self::Cell { .. } => ComponentKind::Cell,
		}
	}
}

#[derive(Clone)]
pub(crate) struct Bound<F> {
	pub(crate) owner: String,
	pub(crate) function: F,
}

/// Name to function bindings for one table.
///
/// The first binding of a name wins; later attempts are refused with a
/// warning so one module cannot silently shadow another's API.
#[derive(Default)]
pub struct FunctionRegistry {
	table: IndexMap<String, Bound<TableFunction>>,
	components: IndexMap<(ComponentKind, String), Bound<ComponentFunction>>,
}

impl FunctionRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds a table function; returns false if the name is taken.
	pub fn register_table(&mut self, owner: &str, name: &str, function: TableFunction) -> bool {
		if let Some(existing) = self.table.get(name) {
			tracing::warn!(
				function = name,
				owner = %existing.owner,
				rejected = owner,
				"Unable to bind table function, name already in use"
			);
			return false;
		}
		self.table.insert(
			name.to_string(),
			Bound {
				owner: owner.to_string(),
				function,
			},
		);
		true
	}

	/// Binds a component function; returns false if the kind and name are
	/// already bound.
	pub fn register_component(
		&mut self,
		owner: &str,
		kind: ComponentKind,
		name: &str,
		function: ComponentFunction,
	) -> bool {
		let key = (kind, name.to_string());
		if let Some(existing) = self.components.get(&key) {
			tracing::warn!(
				%kind,
				function = name,
				owner = %existing.owner,
				rejected = owner,
				"Unable to bind component handler, a matching function name is already bound"
			);
			return false;
		}
		self.components.insert(
			key,
			Bound {
				owner: owner.to_string(),
				function,
			},
		);
		true
	}

	/// True if a table function named `name` is registered.
	pub fn has_table_function(&self, name: &str) -> bool {
		self.table.contains_key(name)
	}

	/// True if `kind` has a function named `name`.
	pub fn has_component_function(&self, kind: ComponentKind, name: &str) -> bool {
		self.components.contains_key(&(kind, name.to_string()))
	}

	/// Module that bound the table function `name`.
	pub fn table_function_owner(&self, name: &str) -> Option<&str> {
		self.table.get(name).map(|bound| bound.owner.as_str())
	}

	/// Table function names, in registration order.
	pub fn table_function_names(&self) -> impl Iterator<Item = &str> {
		self.table.keys().map(String::as_str)
	}

	/// Function names registered for `kind`.
	pub fn component_function_names(&self, kind: ComponentKind) -> impl Iterator<Item = &str> {
		self.components
			.keys()
			.filter(move |(k, _)| *k == kind)
			.map(|(_, name)| name.as_str())
	}

	pub(crate) fn table_function(&self, name: &str) -> Option<Bound<TableFunction>> {
		self.table.get(name).cloned()
	}

	pub(crate) fn component_function(
		&self,
		kind: ComponentKind,
		name: &str,
	) -> Option<Bound<ComponentFunction>> {
		self.components.get(&(kind, name.to_string())).cloned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn constant(value: i64) -> TableFunction {
		Arc::new(move |_ctx: &mut ModuleContext<'_>, _args: &[Value]| -> ModuleResult<Value> {
			Ok(Value::from(value))
		})
	}

	#[rstest]
	fn test_first_table_binding_wins() {
		let mut functions = FunctionRegistry::new();

		assert!(functions.register_table("sort", "getSorters", constant(1)));
		assert!(!functions.register_table("filter", "getSorters", constant(2)));

		assert_eq!(functions.table_function_owner("getSorters"), Some("sort"));
	}

	#[rstest]
	fn test_component_names_are_scoped_by_kind() {
		let mut functions = FunctionRegistry::new();
		let noop: ComponentFunction = Arc::new(|_ctx: &mut ModuleContext<'_>, _component: &ComponentRef, _args: &[Value]| -> ModuleResult<Value> {
			Ok(Value::Null)
		});

		assert!(functions.register_component("edit", ComponentKind::Cell, "edit", noop.clone()));
		assert!(functions.register_component("edit", ComponentKind::Row, "edit", noop.clone()));
		assert!(!functions.register_component("other", ComponentKind::Cell, "edit", noop));

		assert!(functions.has_component_function(ComponentKind::Row, "edit"));
		assert!(!functions.has_component_function(ComponentKind::Column, "edit"));
		assert_eq!(functions.component_function_names(ComponentKind::Cell).collect::<Vec<_>>(), vec!["edit"]);
	}

	#[rstest]
	#[case(ComponentRef::Row(RowId(1)), ComponentKind::Row)]
	#[case(ComponentRef::Column("name".into()), ComponentKind::Column)]
	#[case(ComponentRef::Cell { row: RowId(1), column: "name".into() }, ComponentKind::Cell)]
	fn test_component_ref_kind(#[case] component: ComponentRef, #[case] kind: ComponentKind) {
		assert_eq!(component.kind(), kind);
	}
}
