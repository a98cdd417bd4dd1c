//! Ways of naming the tables a lookup should return.

use serde_json::Value;
use tabula_core::{Element, TableHandle, TableId};
use thiserror::Error;

/// What a caller passes to [`TableRegistry::lookup_table`].
///
/// [`TableRegistry::lookup_table`]: crate::TableRegistry::lookup_table
#[derive(Clone)]
pub enum TableQuery {
	/// Tables whose element matches a selector.
	Selector(String),
	/// The table bound to this element.
	Element(Element),
	/// A table handle, returned as-is.
	Table(TableHandle),
	/// A table by id.
	Id(TableId),
	/// Several queries, resolved in order and concatenated.
	Many(Vec<TableQuery>),
}

/// A query value that does not name tables in any supported way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported table query: {0}")]
pub struct InvalidQuery(pub String);

impl TableQuery {
	/// Interprets a loosely typed query: a string is a selector, an array is
	/// a list of queries and an integer is a table id.
	pub fn from_value(value: &Value) -> Result<Self, InvalidQuery> {
		match value {
			Value::String(selector) => Ok(Self::Selector(selector.clone())),
			Value::Array(items) => items
				.iter()
				.map(Self::from_value)
				.collect::<Result<Vec<_>, _>>()
				.map(Self::Many),
			Value::Number(number) => number
				.as_u64()
				.map(|id| Self::Id(TableId::from_raw(id)))
				.ok_or_else(|| InvalidQuery(value.to_string())),
			other => Err(InvalidQuery(other.to_string())),
		}
	}
}

impl std::fmt::Debug for TableQuery {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Selector(selector) => f.debug_tuple("Selector").field(selector).finish(),
			Self::Element(element) => f.debug_tuple("Element").field(element).finish(),
			Self::Table(handle) => f.debug_tuple("Table").field(&handle.try_lock().map(|table| table.id())).finish(),
			Self::Id(id) => f.debug_tuple("Id").field(id).finish(),
			Self::Many(queries) => f.debug_tuple("Many").field(queries).finish(),
		}
	}
}

impl From<&str> for TableQuery {
	fn from(selector: &str) -> Self {
		Self::Selector(selector.to_string())
	}
}

impl From<String> for TableQuery {
	fn from(selector: String) -> Self {
		Self::Selector(selector)
	}
}

impl From<Element> for TableQuery {
	fn from(element: Element) -> Self {
		Self::Element(element)
	}
}

impl From<&Element> for TableQuery {
	fn from(element: &Element) -> Self {
		Self::Element(element.clone())
	}
}

impl From<TableHandle> for TableQuery {
	fn from(handle: TableHandle) -> Self {
		Self::Table(handle)
	}
}

impl From<TableId> for TableQuery {
	fn from(id: TableId) -> Self {
		Self::Id(id)
	}
}

impl<Q: Into<TableQuery>> From<Vec<Q>> for TableQuery {
	fn from(queries: Vec<Q>) -> Self {
		Self::Many(queries.into_iter().map(Into::into).collect())
	}
}
