//! Host elements and the CSS selectors used to find tables.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use scraper::Html;
use thiserror::Error;

static NEXT_ELEMENT: AtomicU64 = AtomicU64::new(1);

/// Attribute that marks the element under test in rendered markup.
const MARKER: &str = "data-tabula-uid";

#[derive(Debug)]
struct ElementData {
	uid: u64,
	tag: String,
	id: Option<String>,
	classes: Vec<String>,
	attributes: IndexMap<String, String>,
	parent: Option<Element>,
}

/// The host node a table is bound to.
///
/// Cheap to clone; clones compare equal, separately built elements never do.
#[derive(Clone)]
pub struct Element {
	data: Arc<ElementData>,
}

impl Element {
	/// Shorthand for an element with only a tag.
	pub fn new(tag: impl Into<String>) -> Self {
		Self::builder(tag).build()
	}

	/// # Examples
	///
	/// ```
	/// use tabula_core::Element;
	///
	/// let element = Element::builder("div").id("orders").class("grid").build();
	/// assert!(element.matches("div#orders.grid").unwrap());
	/// ```
	pub fn builder(tag: impl Into<String>) -> ElementBuilder {
		ElementBuilder {
			tag: tag.into().to_ascii_lowercase(),
			id: None,
			classes: Vec::new(),
			attributes: IndexMap::new(),
			parent: None,
		}
	}

	/// Lowercase tag name.
	pub fn tag(&self) -> &str {
		&self.data.tag
	}

	/// The `id` attribute, if set.
	pub fn id(&self) -> Option<&str> {
		self.data.id.as_deref()
	}

	/// Class names in the order they were added.
	pub fn classes(&self) -> &[String] {
		&self.data.classes
	}

	/// True if the element carries `class`.
	pub fn has_class(&self, class: &str) -> bool {
		self.data.classes.iter().any(|c| c == class)
	}

	/// An attribute value; `"id"` reads the element id.
	pub fn attribute(&self, name: &str) -> Option<&str> {
		match name {
			"id" => self.id(),
			_ => self.data.attributes.get(name).map(String::as_str),
		}
	}

	/// The element this one is nested in, if any.
	pub fn parent(&self) -> Option<&Element> {
		self.data.parent.as_ref()
	}

	/// Ancestors from the nearest outwards.
	pub fn ancestors(&self) -> impl Iterator<Item = &Element> {
		std::iter::successors(self.parent(), |&element| element.parent())
	}

	/// Parses `selector` and tests it against this element.
	pub fn matches(&self, selector: &str) -> Result<bool, SelectorError> {
		Ok(Selector::parse(selector)?.matches(self))
	}

	fn open_tag(&self, out: &mut String, marked: bool) -> fmt::Result {
		write!(out, "<{}", self.data.tag)?;
		if let Some(id) = &self.data.id {
			write!(out, " id=\"{}\"", escape(id))?;
		}
		if !self.data.classes.is_empty() {
			write!(out, " class=\"{}\"", escape(&self.data.classes.join(" ")))?;
		}
		for (name, value) in &self.data.attributes {
			write!(out, " {name}=\"{}\"", escape(value))?;
		}
		if marked {
			write!(out, " {MARKER}=\"{}\"", self.data.uid)?;
		}
		out.push('>');
		Ok(())
	}

	/// The element nested inside its ancestors as an HTML document, with
	/// this element marked.
	fn markup(&self) -> String {
		let mut chain: Vec<&Element> = self.ancestors().collect();
		chain.reverse();
		let mut out = String::from("<!DOCTYPE html>");
		for ancestor in &chain {
			let _ = ancestor.open_tag(&mut out, false);
		}
		let _ = self.open_tag(&mut out, true);
		let _ = write!(out, "</{}>", self.data.tag);
		for ancestor in chain.iter().rev() {
			let _ = write!(out, "</{}>", ancestor.data.tag);
		}
		out
	}
}

fn escape(value: &str) -> String {
	value.replace('&', "&amp;").replace('"', "&quot;")
}

impl PartialEq for Element {
	fn eq(&self, other: &Self) -> bool {
		self.data.uid == other.data.uid
	}
}

impl Eq for Element {}

impl std::hash::Hash for Element {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.data.uid.hash(state);
	}
}

impl fmt::Debug for Element {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut tag = String::new();
		self.open_tag(&mut tag, false)?;
		f.write_str(&tag)
	}
}

/// Builder for [`Element`].
#[derive(Debug, Clone)]
pub struct ElementBuilder {
	tag: String,
	id: Option<String>,
	classes: Vec<String>,
	attributes: IndexMap<String, String>,
	parent: Option<Element>,
}

impl ElementBuilder {
	/// Sets the element id.
	pub fn id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	/// Adds a class; duplicates are ignored.
	pub fn class(mut self, class: impl Into<String>) -> Self {
		let class = class.into();
		if !self.classes.contains(&class) {
			self.classes.push(class);
		}
		self
	}

	/// Sets an attribute, replacing any earlier value.
	pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	/// Nests the element inside `parent`.
	pub fn parent(mut self, parent: &Element) -> Self {
		self.parent = Some(parent.clone());
		self
	}

	/// Finishes the element with a fresh identity.
	pub fn build(self) -> Element {
		Element {
			data: Arc::new(ElementData {
				uid: NEXT_ELEMENT.fetch_add(1, Ordering::Relaxed),
				tag: self.tag,
				id: self.id,
				classes: self.classes,
				attributes: self.attributes,
				parent: self.parent,
			}),
		}
	}
}

/// A selector that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector '{selector}': {reason}")]
pub struct SelectorError {
	/// The selector as given.
	pub selector: String,
	/// What the parser rejected.
	pub reason: String,
}

/// A parsed CSS selector list.
///
/// Matching renders the element inside its ancestors, so descendant and
/// child combinators see the [`parent`](ElementBuilder::parent) chain.
/// Sibling combinators never match since elements know no siblings.
///
/// # Examples
///
/// ```
/// use tabula_core::{Element, Selector};
///
/// let panel = Element::builder("section").class("panel").build();
/// let grid = Element::builder("div").id("orders").parent(&panel).build();
///
/// assert!(Selector::parse(".panel > #orders").unwrap().matches(&grid));
/// assert!(!Selector::parse("article #orders").unwrap().matches(&grid));
/// ```
#[derive(Debug, Clone)]
pub struct Selector {
	source: String,
	inner: scraper::Selector,
}

impl Selector {
	/// Parses a selector list such as `"#orders, .grid > div"`.
	pub fn parse(selector: &str) -> Result<Self, SelectorError> {
		let inner = scraper::Selector::parse(selector).map_err(|error| SelectorError {
			selector: selector.to_string(),
			reason: error.to_string(),
		})?;
		Ok(Self {
			source: selector.to_string(),
			inner,
		})
	}

	/// The selector as written.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// True if any selector in the list matches `element`.
	pub fn matches(&self, element: &Element) -> bool {
		let document = Html::parse_document(&element.markup());
		let uid = element.data.uid.to_string();
		document
			.select(&self.inner)
			.any(|node| node.value().attr(MARKER) == Some(uid.as_str()))
	}
}

impl std::str::FromStr for Selector {
	type Err = SelectorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
