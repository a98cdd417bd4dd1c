//! Extension points: named, typed registries a module exposes for other
//! modules to add entries to.
//!
//! A module declares its points on its [`ModuleDescriptor`]. Other
//! descriptors (or callers of [`ModuleRegistry::extend`]) contribute
//! [`Extension`]s, which the registry merges into the target's points,
//! queueing them until the target is registered if necessary.
//!
//! [`ModuleDescriptor`]: crate::ModuleDescriptor
//! [`ModuleRegistry::extend`]: crate::ModuleRegistry::extend

use std::any::{Any, type_name};
use std::fmt;

use indexmap::IndexMap;

/// An ordered, string-keyed collection of values of one type.
///
/// Inserting an existing key replaces its value in place, which is how
/// extensions override defaults shipped by the owning module.
#[derive(Clone)]
pub struct ExtensionPoint<V> {
	entries: IndexMap<String, V>,
}

impl<V> ExtensionPoint<V> {
	/// Creates an empty extension point.
	pub fn new() -> Self {
		Self {
			entries: IndexMap::new(),
		}
	}

	/// Adds a value and returns the one it replaced, if any.
	pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
		self.entries.insert(key.into(), value)
	}

	/// Builder form of [`insert`](Self::insert).
	pub fn with(mut self, key: impl Into<String>, value: V) -> Self {
		self.insert(key, value);
		self
	}

	/// The entry stored under `key`.
	pub fn get(&self, key: &str) -> Option<&V> {
		self.entries.get(key)
	}

	/// True if `key` has an entry.
	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Entry keys, in insertion order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	/// Entries, in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// True if there are no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<V> Default for ExtensionPoint<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> fmt::Debug for ExtensionPoint<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ExtensionPoint")
			.field("value_type", &type_name::<V>())
			.field("keys", &self.entries.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl<K: Into<String>, V> FromIterator<(K, V)> for ExtensionPoint<V> {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
		}
	}
}

pub(crate) trait ErasedPoint: Send + Sync {
	fn as_any(&self) -> &dyn Any;
	fn as_any_mut(&mut self) -> &mut dyn Any;
	fn clone_box(&self) -> Box<dyn ErasedPoint>;
	fn value_type(&self) -> &'static str;
	fn key_list(&self) -> Vec<String>;
}

impl<V: Clone + Send + Sync + 'static> ErasedPoint for ExtensionPoint<V> {
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}

	fn clone_box(&self) -> Box<dyn ErasedPoint> {
		Box::new(self.clone())
	}

	fn value_type(&self) -> &'static str {
		type_name::<V>()
	}

	fn key_list(&self) -> Vec<String> {
		self.entries.keys().cloned().collect()
	}
}

/// Why a set of entries could not be merged into a module's points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MergeError {
	UnknownPoint,
	TypeMismatch {
		expected: &'static str,
		found: &'static str,
	},
}

/// The extension points declared by one module, keyed by point name.
#[derive(Default)]
pub struct ExtensionPoints {
	points: IndexMap<String, Box<dyn ErasedPoint>>,
}

impl ExtensionPoints {
	/// Creates a set with no declared points.
	pub fn new() -> Self {
		Self::default()
	}

	/// Declares (or redeclares) a point.
	pub fn declare<V>(&mut self, name: impl Into<String>, point: ExtensionPoint<V>)
	where
		V: Clone + Send + Sync + 'static,
	{
		self.points.insert(name.into(), Box::new(point));
	}

	/// Returns a point if it exists and holds values of type `V`.
	pub fn get<V: 'static>(&self, name: &str) -> Option<&ExtensionPoint<V>> {
		self.points
			.get(name)
			.and_then(|point| point.as_any().downcast_ref::<ExtensionPoint<V>>())
	}

	/// True if a point named `name` is declared.
	pub fn contains(&self, name: &str) -> bool {
		self.points.contains_key(name)
	}

	/// Declared point names.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.points.keys().map(String::as_str)
	}

	/// Keys currently present in the named point.
	pub fn keys_of(&self, name: &str) -> Option<Vec<String>> {
		self.points.get(name).map(|point| point.key_list())
	}

	/// Number of declared points.
	pub fn len(&self) -> usize {
		self.points.len()
	}

	/// True if no point is declared.
	pub fn is_empty(&self) -> bool {
		self.points.is_empty()
	}

	pub(crate) fn merge(&mut self, name: &str, entries: &dyn ErasedEntries) -> Result<usize, MergeError> {
		let point = self.points.get_mut(name).ok_or(MergeError::UnknownPoint)?;
		let expected = point.value_type();
		if entries.apply(point.as_mut()) {
			Ok(entries.len())
		} else {
			Err(MergeError::TypeMismatch {
				expected,
				found: entries.value_type(),
			})
		}
	}
}

impl Clone for ExtensionPoints {
	fn clone(&self) -> Self {
		Self {
			points: self
				.points
				.iter()
				.map(|(name, point)| (name.clone(), point.clone_box()))
				.collect(),
		}
	}
}

impl fmt::Debug for ExtensionPoints {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		for (name, point) in &self.points {
			map.entry(name, &point.key_list());
		}
		map.finish()
	}
}

/// Ordered entries destined for an extension point of type `V`.
#[derive(Clone)]
struct ExtensionEntries<V> {
	entries: Vec<(String, V)>,
}

pub(crate) trait ErasedEntries: Send + Sync {
	fn as_any(&self) -> &dyn Any;
	fn clone_box(&self) -> Box<dyn ErasedEntries>;
	fn value_type(&self) -> &'static str;
	fn len(&self) -> usize;
	fn key_list(&self) -> Vec<String>;
	/// Inserts every entry into `point`; false when the types differ.
	fn apply(&self, point: &mut dyn ErasedPoint) -> bool;
	/// Appends `other`'s entries after this set's; false when the types
	/// differ.
	fn absorb(&mut self, other: &dyn ErasedEntries) -> bool;
}

impl<V: Clone + Send + Sync + 'static> ErasedEntries for ExtensionEntries<V> {
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn clone_box(&self) -> Box<dyn ErasedEntries> {
		Box::new(self.clone())
	}

	fn value_type(&self) -> &'static str {
		type_name::<V>()
	}

	fn len(&self) -> usize {
		self.entries.len()
	}

	fn key_list(&self) -> Vec<String> {
		self.entries.iter().map(|(k, _)| k.clone()).collect()
	}

	fn apply(&self, point: &mut dyn ErasedPoint) -> bool {
		let Some(point) = point.as_any_mut().downcast_mut::<ExtensionPoint<V>>() else {
			return false;
		};
		for (key, value) in &self.entries {
			point.insert(key.clone(), value.clone());
		}
		true
	}

	fn absorb(&mut self, other: &dyn ErasedEntries) -> bool {
		match other.as_any().downcast_ref::<ExtensionEntries<V>>() {
			Some(other) => {
				self.entries.extend(other.entries.iter().cloned());
				true
			}
			None => false,
		}
	}
}

/// Entries one module contributes to another module's extension point.
pub struct Extension {
	target: String,
	point: String,
	entries: Box<dyn ErasedEntries>,
}

impl Extension {
	/// Creates an extension adding `entries` to `target`'s `point`.
	///
	/// Later entries with the same key override earlier ones and any default
	/// the target ships.
	pub fn new<K, V, I>(target: impl Into<String>, point: impl Into<String>, entries: I) -> Self
	where
		K: Into<String>,
		V: Clone + Send + Sync + 'static,
		I: IntoIterator<Item = (K, V)>,
	{
		Self {
			target: target.into(),
			point: point.into(),
			entries: Box::new(ExtensionEntries {
				entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
			}),
		}
	}

	/// Module receiving the entries.
	pub fn target(&self) -> &str {
		&self.target
	}

	/// Extension point receiving the entries.
	pub fn point(&self) -> &str {
		&self.point
	}

	/// Keys contributed by this extension, in order.
	pub fn keys(&self) -> Vec<String> {
		self.entries.key_list()
	}

	pub(crate) fn entries(&self) -> &dyn ErasedEntries {
		self.entries.as_ref()
	}

	pub(crate) fn into_parts(self) -> (String, String, Box<dyn ErasedEntries>) {
		(self.target, self.point, self.entries)
	}
}

impl Clone for Extension {
	fn clone(&self) -> Self {
		Self {
			target: self.target.clone(),
			point: self.point.clone(),
			entries: self.entries.clone_box(),
		}
	}
}

impl fmt::Debug for Extension {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Extension")
			.field("target", &self.target)
			.field("point", &self.point)
			.field("value_type", &self.entries.value_type())
			.field("keys", &self.entries.key_list())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn points() -> ExtensionPoints {
		let mut points = ExtensionPoints::new();
		points.declare(
			"formatters",
			ExtensionPoint::new().with("plain", "plain".to_string()).with("money", "money".to_string()),
		);
		points
	}

	#[rstest]
	fn test_merge_overrides_and_appends(mut points: ExtensionPoints) {
		let extension = Extension::new(
			"format",
			"formatters",
			[("money", "currency".to_string()), ("star", "star".to_string())],
		);

		let merged = points.merge("formatters", extension.entries());

		assert_eq!(merged, Ok(2));
		let point = points.get::<String>("formatters").unwrap();
		assert_eq!(point.keys().collect::<Vec<_>>(), vec!["plain", "money", "star"]);
		assert_eq!(point.get("money").map(String::as_str), Some("currency"));
	}

	#[rstest]
	fn test_merge_unknown_point(mut points: ExtensionPoints) {
		let extension = Extension::new("format", "missing", [("a", 1u32)]);
		assert_eq!(points.merge("missing", extension.entries()), Err(MergeError::UnknownPoint));
	}

	#[rstest]
	fn test_merge_type_mismatch_leaves_point_untouched(mut points: ExtensionPoints) {
		let extension = Extension::new("format", "formatters", [("count", 1u32)]);

		let result = points.merge("formatters", extension.entries());

		assert!(matches!(result, Err(MergeError::TypeMismatch { .. })));
		assert_eq!(points.keys_of("formatters").unwrap(), vec!["plain", "money"]);
	}

	#[rstest]
	fn test_get_with_wrong_type_is_none(points: ExtensionPoints) {
		assert!(points.get::<u32>("formatters").is_none());
		assert!(points.get::<String>("formatters").is_some());
	}

	#[rstest]
	fn test_absorb_keeps_order() {
		let first = Extension::new("t", "p", [("a", 1u8)]);
		let second = Extension::new("t", "p", [("b", 2u8), ("a", 3u8)]);
		let (_, _, mut queued) = first.into_parts();

		assert!(queued.absorb(second.entries()));
		assert_eq!(queued.key_list(), vec!["a", "b", "a"]);

		let mut point = ExtensionPoint::<u8>::new();
		assert!(queued.apply(&mut point));
		assert_eq!(point.get("a"), Some(&3));
		assert_eq!(point.len(), 2);
	}

	#[rstest]
	fn test_clone_is_independent(points: ExtensionPoints) {
		let mut copy = points.clone();
		let extension = Extension::new("format", "formatters", [("new", "new".to_string())]);
		copy.merge("formatters", extension.entries()).unwrap();

		assert_eq!(points.get::<String>("formatters").unwrap().len(), 2);
		assert_eq!(copy.get::<String>("formatters").unwrap().len(), 3);
	}
}
