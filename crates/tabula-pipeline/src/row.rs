//! Row values passed through the pipelines.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field data of a single row.
pub type RowData = Map<String, Value>;

/// Stable identifier assigned to a row when it enters the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "row#{}", self.0)
	}
}

/// A row of table data.
///
/// Cloning is cheap: the field data is shared, so handlers can filter and
/// reorder row sets without copying cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
	id: RowId,
	data: Arc<RowData>,
}

impl Row {
	/// Creates a row with the given identifier.
	pub fn new(id: RowId, data: RowData) -> Self {
		Self {
			id,
			data: Arc::new(data),
		}
	}

	/// Row identifier.
	pub fn id(&self) -> RowId {
		self.id
	}

	/// Field data.
	pub fn data(&self) -> &RowData {
		&self.data
	}

	/// Value of one field.
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.data.get(field)
	}
}
