//! Module descriptors: the registrable description of a module.

use std::fmt;
use std::sync::Arc;

use crate::context::ModuleContext;
use crate::extension::{Extension, ExtensionPoint, ExtensionPoints};
use crate::module::Module;
use crate::order::InitOrder;

/// Builds one module instance for a table.
///
/// Receives the module's extension points as merged at bind time and a
/// context for registering options, functions and pipeline handlers.
pub type ModuleFactory =
	Arc<dyn Fn(&ExtensionPoints, &mut ModuleContext<'_>) -> Box<dyn Module> + Send + Sync>;

/// Everything the registry knows about a module kind.
#[derive(Clone)]
pub struct ModuleDescriptor {
	name: String,
	core: bool,
	init_order: InitOrder,
	extension_points: ExtensionPoints,
	extensions: Vec<Extension>,
	factory: ModuleFactory,
}

impl ModuleDescriptor {
	/// Creates a descriptor whose instances are built by `factory`.
	///
	/// # Examples
	///
	/// ```
	/// use tabula_core::{InitOrder, Module, ModuleContext, ModuleDescriptor, ModuleResult};
	///
	/// struct Noop;
	///
	/// impl Module for Noop {
	///     fn initialize(&mut self, _ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
	///         Ok(())
	///     }
	/// }
	///
	/// let descriptor = ModuleDescriptor::new("noop", |_points, _ctx| Noop)
	///     .with_init_order(-10);
	/// assert_eq!(descriptor.name(), "noop");
	/// assert_eq!(descriptor.init_order(), InitOrder::Early(-10));
	/// ```
	pub fn new<M, F>(name: impl Into<String>, factory: F) -> Self
	where
		M: Module,
		F: Fn(&ExtensionPoints, &mut ModuleContext<'_>) -> M + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			core: false,
			init_order: InitOrder::Default,
			extension_points: ExtensionPoints::new(),
			extensions: Vec::new(),
			factory: Arc::new(move |points, ctx| Box::new(factory(points, ctx)) as Box<dyn Module>),
		}
	}

	/// Marks the descriptor as a core module.
	pub fn as_core(mut self) -> Self {
		self.core = true;
		self
	}

	/// Sets where the module initializes relative to others.
	pub fn with_init_order(mut self, order: impl Into<InitOrder>) -> Self {
		self.init_order = order.into();
		self
	}

	/// Declares an extension point other modules can add entries to.
	pub fn with_extension_point<V>(mut self, name: impl Into<String>, point: ExtensionPoint<V>) -> Self
	where
		V: Clone + Send + Sync + 'static,
	{
		self.extension_points.declare(name, point);
		self
	}

	/// Contributes entries to another module's extension point.
	pub fn with_extension(mut self, extension: Extension) -> Self {
		self.extensions.push(extension);
		self
	}

	/// Registered name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// True for modules registered as core.
	pub fn is_core(&self) -> bool {
		self.core
	}

	/// Initialization order key.
	pub fn init_order(&self) -> InitOrder {
		self.init_order
	}

	/// Points this module exposes, with merged extensions.
	pub fn extension_points(&self) -> &ExtensionPoints {
		&self.extension_points
	}

	/// Outgoing extensions not yet handed to a registry.
	pub fn extensions(&self) -> &[Extension] {
		&self.extensions
	}

	pub(crate) fn set_core(&mut self, core: bool) {
		self.core = core;
	}

	pub(crate) fn extension_points_mut(&mut self) -> &mut ExtensionPoints {
		&mut self.extension_points
	}

	pub(crate) fn take_extensions(&mut self) -> Vec<Extension> {
		std::mem::take(&mut self.extensions)
	}

	pub(crate) fn instantiate(&self, ctx: &mut ModuleContext<'_>) -> Box<dyn Module> {
		(self.factory)(&self.extension_points, ctx)
	}
}

impl fmt::Debug for ModuleDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleDescriptor")
			.field("name", &self.name)
			.field("core", &self.core)
			.field("init_order", &self.init_order)
			.field("extension_points", &self.extension_points)
			.field("extensions", &self.extensions)
			.finish_non_exhaustive()
	}
}
