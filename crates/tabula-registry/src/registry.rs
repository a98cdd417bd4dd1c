//! The registry of live tables.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tabula_core::{Element, Selector, Table, TableHandle, TableId};

use crate::query::TableQuery;

struct Entry {
	id: TableId,
	element: Element,
	table: Weak<Mutex<Table>>,
}

/// Every live table, in construction order.
///
/// Holds weak references only: dropping the last [`TableHandle`] removes a
/// table from lookups even if it was never deregistered.
#[derive(Default)]
pub struct TableRegistry {
	tables: RwLock<Vec<Entry>>,
}

impl TableRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a table; registering the same table twice is a no-op.
	pub fn register(&self, handle: &TableHandle) {
		let (id, element) = {
			let table = handle.lock();
			(table.id(), table.element().clone())
		};
		let mut tables = self.tables.write();
		tables.retain(|entry| entry.table.strong_count() > 0);
		if tables.iter().any(|entry| entry.id == id) {
			tracing::debug!(table = %id, "table already registered");
			return;
		}
		tracing::debug!(table = %id, element = ?element, "table registered");
		tables.push(Entry {
			id,
			element,
			table: Arc::downgrade(handle),
		});
	}

	/// Removes a table; returns false if it was not registered.
	pub fn deregister(&self, id: TableId) -> bool {
		let mut tables = self.tables.write();
		let before = tables.len();
		tables.retain(|entry| entry.id != id);
		let removed = tables.len() != before;
		if removed {
			tracing::debug!(table = %id, "table deregistered");
		}
		removed
	}

	/// Number of registered tables still alive.
	pub fn len(&self) -> usize {
		self.tables
			.read()
			.iter()
			.filter(|entry| entry.table.strong_count() > 0)
			.count()
	}

	/// True if no registered table is alive.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// True if `id` is registered and alive.
	pub fn contains(&self, id: TableId) -> bool {
		self.get(id).is_some()
	}

	/// The registered table with `id`.
	pub fn get(&self, id: TableId) -> Option<TableHandle> {
		self.tables
			.read()
			.iter()
			.find(|entry| entry.id == id)
			.and_then(|entry| entry.table.upgrade())
	}

	/// The table bound to `element`.
	pub fn find_by_element(&self, element: &Element) -> Option<TableHandle> {
		self.tables
			.read()
			.iter()
			.find(|entry| entry.element == *element)
			.and_then(|entry| entry.table.upgrade())
	}

	/// Every live table whose element matches `selector`, in registration
	/// order.
	pub fn find_by_selector(&self, selector: &Selector) -> Vec<TableHandle> {
		self.tables
			.read()
			.iter()
			.filter(|entry| selector.matches(&entry.element))
			.filter_map(|entry| entry.table.upgrade())
			.collect()
	}

	/// Every live table, in registration order.
	pub fn tables(&self) -> Vec<TableHandle> {
		self.tables
			.read()
			.iter()
			.filter_map(|entry| entry.table.upgrade())
			.collect()
	}

	/// Resolves a query to tables.
	///
	/// Only registered tables are returned. Selectors that fail to parse or
	/// match nothing, elements without a table and handles of unregistered
	/// tables resolve to nothing, with a warning unless `silent`.
	pub fn lookup_table(&self, query: impl Into<TableQuery>, silent: bool) -> Vec<TableHandle> {
		self.lookup(query.into(), silent)
			.into_iter()
			.map(|(_, handle)| handle)
			.collect()
	}

	/// Like [`lookup_table`](Self::lookup_table) but leaves out `exclude`.
	///
	/// Never locks a table, so a table may call this on itself while its own
	/// handle is locked.
	pub fn lookup_excluding(&self, query: impl Into<TableQuery>, exclude: TableId, silent: bool) -> Vec<TableHandle> {
		self.lookup(query.into(), silent)
			.into_iter()
			.filter(|(id, _)| *id != exclude)
			.map(|(_, handle)| handle)
			.collect()
	}

	/// Resolves a query given as JSON, see [`TableQuery::from_value`].
	pub fn lookup_value(&self, query: &Value, silent: bool) -> Vec<TableHandle> {
		match TableQuery::from_value(query) {
			Ok(query) => self.lookup_table(query, silent),
			Err(error) => {
				if !silent {
					tracing::warn!(%error, "Table Connection Error - Invalid Query");
				}
				Vec::new()
			}
		}
	}

	fn lookup(&self, query: TableQuery, silent: bool) -> Vec<(TableId, TableHandle)> {
		let tables = self.tables.read();
		let mut found = Vec::new();
		resolve(&tables, query, silent, &mut found);
		found
	}
}

fn live(entry: &Entry) -> Option<(TableId, TableHandle)> {
	entry.table.upgrade().map(|handle| (entry.id, handle))
}

fn resolve(tables: &[Entry], query: TableQuery, silent: bool, found: &mut Vec<(TableId, TableHandle)>) {
	match query {
		TableQuery::Table(handle) => match tables
			.iter()
			.find(|entry| std::ptr::eq(entry.table.as_ptr(), Arc::as_ptr(&handle)))
			.and_then(live)
		{
			Some(table) => found.push(table),
			None if !silent => tracing::warn!("Table Connection Error - Table is not registered"),
			None => {}
		},
		TableQuery::Id(id) => match tables.iter().find(|entry| entry.id == id).and_then(live) {
			Some(table) => found.push(table),
			None if !silent => tracing::warn!(table = %id, "Table Connection Error - Invalid Table ID"),
			None => {}
		},
		TableQuery::Element(element) => match tables.iter().find(|entry| entry.element == element).and_then(live) {
			Some(table) => found.push(table),
			None if !silent => tracing::warn!(element = ?element, "Table Connection Error - Element has no table"),
			None => {}
		},
		TableQuery::Selector(text) => match Selector::parse(&text) {
			Ok(selector) => {
				let before = found.len();
				found.extend(
					tables
						.iter()
						.filter(|entry| selector.matches(&entry.element))
						.filter_map(live),
				);
				if found.len() == before && !silent {
					tracing::warn!(selector = %text, "Table Connection Error - Invalid Selector");
				}
			}
			Err(error) if !silent => {
				tracing::warn!(selector = %text, %error, "Table Connection Error - Invalid Selector")
			}
			Err(_) => {}
		},
		TableQuery::Many(queries) => {
			for query in queries {
				resolve(tables, query, silent, found);
			}
		}
	}
}

impl std::fmt::Debug for TableRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let tables = self.tables.read();
		f.debug_list()
			.entries(tables.iter().map(|entry| (entry.id, &entry.element)))
			.finish()
	}
}
