//! The `comms` module: messages between tables.

use std::sync::Arc;

use serde_json::Value;
use tabula_core::{Element, Module, ModuleContext, ModuleDescriptor, ModuleResult, TableHandle, TableId, TableResult};
use tabula_registry::{TableQuery, TableRegistry};

/// Module name.
pub const NAME: &str = "comms";

/// One table's connection to the other live tables, published as the
/// `comms` capability.
///
/// Delivery never waits on a table: a target that is locked elsewhere, such
/// as the sender of the message currently being handled, is skipped with a
/// warning.
pub struct Comms {
	tables: Arc<TableRegistry>,
	table: TableId,
	element: Element,
}

impl Comms {
	/// Connects `table`, bound to `element`, to every table in `tables`.
	pub fn new(tables: Arc<TableRegistry>, table: TableId, element: Element) -> Self {
		Self { tables, table, element }
	}

	/// Tables matching `query`, never including this one.
	pub fn connections(&self, query: impl Into<TableQuery>) -> Vec<TableHandle> {
		self.tables.lookup_excluding(query, self.table, false)
	}

	/// Delivers `action` to `module` on every connected table and collects
	/// the replies.
	///
	/// Busy targets are skipped, so a module may reply to the table that
	/// messaged it.
	pub fn send(
		&self,
		query: impl Into<TableQuery>,
		module: &str,
		action: &str,
		data: &Value,
	) -> TableResult<Vec<Value>> {
		let connections = self.connections(query);
		if connections.is_empty() {
			tracing::warn!(
				table = %self.table,
				module,
				action,
				"Table Connection Error - no tables found to send message to"
			);
			return Ok(Vec::new());
		}

		let mut replies = Vec::new();
		for connection in connections {
			let Some(mut target) = connection.try_lock() else {
				tracing::warn!(
					table = %self.table,
					module,
					action,
					"Table Connection Error - target table is busy, message skipped"
				);
				continue;
			};
			replies.extend(target.receive_comms(&self.element, module, action, data)?);
		}
		Ok(replies)
	}
}

impl std::fmt::Debug for Comms {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Comms")
			.field("table", &self.table)
			.field("element", &self.element)
			.finish_non_exhaustive()
	}
}

struct CommsModule {
	tables: Arc<TableRegistry>,
}

impl Module for CommsModule {
	fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
		let table = ctx.table();
		let comms = Comms::new(Arc::clone(&self.tables), table.id(), table.element().clone());
		ctx.publish(Arc::new(comms));
		Ok(())
	}
}

/// Descriptor of the `comms` module, delivering through `tables`.
pub fn descriptor(tables: Arc<TableRegistry>) -> ModuleDescriptor {
	ModuleDescriptor::new(NAME, move |_points, _ctx| CommsModule {
		tables: Arc::clone(&tables),
	})
}
