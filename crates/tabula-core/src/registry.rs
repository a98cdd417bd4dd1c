//! Global module registry.

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::descriptor::ModuleDescriptor;
use crate::error::RegistryError;
use crate::extension::{ErasedEntries, Extension, ExtensionPoint, MergeError};

type PendingEntries = IndexMap<String, Vec<Box<dyn ErasedEntries>>>;

#[derive(Default)]
struct RegistryState {
	modules: IndexMap<String, ModuleDescriptor>,
	/// Extensions whose target is not registered yet, by target then point.
	pending: IndexMap<String, PendingEntries>,
	initialized: bool,
}

/// Every module kind available to tables, keyed by name.
///
/// Registration is normally done once at startup through
/// [`initialize`](Self::initialize). Tables snapshot the registry when they
/// bind, so registering later only affects tables built afterwards.
///
/// # Examples
///
/// ```
/// use tabula_core::{ExtensionPoint, Module, ModuleContext, ModuleDescriptor, ModuleRegistry, ModuleResult};
///
/// struct Format;
///
/// impl Module for Format {
///     fn initialize(&mut self, _ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
///         Ok(())
///     }
/// }
///
/// let registry = ModuleRegistry::new();
/// registry.extend("format", "formatters", [("money", 2u8)]).unwrap_err();
///
/// let format = ModuleDescriptor::new("format", |_points, _ctx| Format)
///     .with_extension_point("formatters", ExtensionPoint::<u8>::new());
/// let report = registry.initialize([format], []);
/// assert!(report.is_empty());
///
/// registry.extend("format", "formatters", [("money", 2u8)]).unwrap();
/// let point = registry.extension_point::<u8>("format", "formatters").unwrap();
/// assert_eq!(point.get("money"), Some(&2));
/// ```
#[derive(Default)]
pub struct ModuleRegistry {
	state: RwLock<RegistryState>,
}

impl ModuleRegistry {
	/// Creates an empty, uninitialized registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers the core set, then `extra`, exactly once.
	///
	/// Later calls do nothing and return an empty report.
	pub fn initialize<C, E>(&self, core: C, extra: E) -> Vec<RegistryError>
	where
		C: IntoIterator<Item = ModuleDescriptor>,
		E: IntoIterator<Item = ModuleDescriptor>,
	{
		let mut state = self.state.write();
		if state.initialized {
			tracing::debug!("module registry already initialized");
			return Vec::new();
		}
		state.initialized = true;

		let mut report = register_into(&mut state, core, true);
		report.extend(register_into(&mut state, extra, false));
		tracing::debug!(
			modules = state.modules.len(),
			pending = state.pending.len(),
			diagnostics = report.len(),
			"module registry initialized"
		);
		report
	}

	/// Registers descriptors, marking them core when `as_core` is set.
	///
	/// Descriptors without a name are skipped. A descriptor whose name is
	/// already registered replaces the earlier one.
	pub fn register_modules<I>(&self, descriptors: I, as_core: bool) -> Vec<RegistryError>
	where
		I: IntoIterator<Item = ModuleDescriptor>,
	{
		register_into(&mut self.state.write(), descriptors, as_core)
	}

	/// Registers a single non-core descriptor.
	pub fn register_module(&self, descriptor: ModuleDescriptor) -> Vec<RegistryError> {
		self.register_modules([descriptor], false)
	}

	/// Adds entries to a registered module's extension point.
	///
	/// Unlike extensions carried by descriptors, a direct call is not
	/// queued: the target must already be registered.
	pub fn extend<K, V, I>(&self, target: &str, point: &str, entries: I) -> Result<(), RegistryError>
	where
		K: Into<String>,
		V: Clone + Send + Sync + 'static,
		I: IntoIterator<Item = (K, V)>,
	{
		self.apply_extension(Extension::new(target, point, entries))
	}

	/// Applies a prepared [`Extension`] to its registered target.
	pub fn apply_extension(&self, extension: Extension) -> Result<(), RegistryError> {
		let mut state = self.state.write();
		let result = apply(&mut state, extension.target(), extension.point(), extension.entries());
		if let Err(error) = &result {
			tracing::warn!(%error, "extension rejected");
		}
		result
	}

	/// True once [`initialize`](Self::initialize) has run.
	pub fn is_initialized(&self) -> bool {
		self.state.read().initialized
	}

	/// True if a module named `name` is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.state.read().modules.contains_key(name)
	}

	/// True if `name` is registered as a core module.
	pub fn is_core(&self, name: &str) -> bool {
		self.state
			.read()
			.modules
			.get(name)
			.is_some_and(ModuleDescriptor::is_core)
	}

	/// Number of registered modules.
	pub fn len(&self) -> usize {
		self.state.read().modules.len()
	}

	/// True if no module is registered.
	pub fn is_empty(&self) -> bool {
		self.state.read().modules.is_empty()
	}

	/// Registered names in registration order.
	pub fn names(&self) -> Vec<String> {
		self.state.read().modules.keys().cloned().collect()
	}

	/// A copy of the descriptor registered as `name`.
	pub fn descriptor(&self, name: &str) -> Option<ModuleDescriptor> {
		self.state.read().modules.get(name).cloned()
	}

	/// A copy of every registered descriptor, in registration order.
	pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
		self.state.read().modules.values().cloned().collect()
	}

	/// A copy of a registered module's extension point.
	pub fn extension_point<V>(&self, module: &str, point: &str) -> Option<ExtensionPoint<V>>
	where
		V: Clone + 'static,
	{
		self.state
			.read()
			.modules
			.get(module)
			.and_then(|descriptor| descriptor.extension_points().get::<V>(point))
			.cloned()
	}

	/// Extension points of `target` that have queued entries waiting for it
	/// to register.
	pub fn pending_extensions(&self, target: &str) -> Vec<String> {
		self.state
			.read()
			.pending
			.get(target)
			.map(|points| points.keys().cloned().collect())
			.unwrap_or_default()
	}
}

impl std::fmt::Debug for ModuleRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.read();
		f.debug_struct("ModuleRegistry")
			.field("modules", &state.modules.keys().collect::<Vec<_>>())
			.field("pending", &state.pending.keys().collect::<Vec<_>>())
			.field("initialized", &state.initialized)
			.finish()
	}
}

fn register_into<I>(state: &mut RegistryState, descriptors: I, as_core: bool) -> Vec<RegistryError>
where
	I: IntoIterator<Item = ModuleDescriptor>,
{
	let mut report = Vec::new();
	for mut descriptor in descriptors {
		if descriptor.name().is_empty() {
			let error = RegistryError::MissingName;
			tracing::error!(%error, "skipping module descriptor");
			report.push(error);
			continue;
		}
		if as_core {
			descriptor.set_core(true);
		}

		let name = descriptor.name().to_string();
		let outgoing = descriptor.take_extensions();
		if state.modules.insert(name.clone(), descriptor).is_some() {
			let error = RegistryError::Replaced(name.clone());
			tracing::warn!(%error, "module replaced");
			report.push(error);
		}
		tracing::debug!(module = %name, core = as_core, "module registered");

		for extension in outgoing {
			let (target, point, entries) = extension.into_parts();
			if state.modules.contains_key(&target) {
				if let Err(error) = apply(state, &target, &point, entries.as_ref()) {
					tracing::warn!(%error, source = %name, "extension rejected");
					report.push(error);
				}
			} else {
				queue(state, target, point, entries);
			}
		}

		if let Some(incoming) = state.pending.shift_remove(&name) {
			for (point, queued) in incoming {
				for entries in queued {
					if let Err(error) = apply(state, &name, &point, entries.as_ref()) {
						tracing::warn!(%error, "queued extension rejected");
						report.push(error);
					}
				}
			}
		}
	}
	report
}

fn queue(state: &mut RegistryState, target: String, point: String, entries: Box<dyn ErasedEntries>) {
	tracing::debug!(%target, %point, "queueing extension until target registers");
	let queued = state.pending.entry(target).or_default().entry(point).or_default();
	if let Some(last) = queued.last_mut() {
		if last.absorb(entries.as_ref()) {
			return;
		}
	}
	queued.push(entries);
}

fn apply(
	state: &mut RegistryState,
	target: &str,
	point: &str,
	entries: &dyn ErasedEntries,
) -> Result<(), RegistryError> {
	let descriptor = state
		.modules
		.get_mut(target)
		.ok_or_else(|| RegistryError::UnknownModule {
			target: target.to_string(),
		})?;
	descriptor
		.extension_points_mut()
		.merge(point, entries)
		.map(|merged| tracing::trace!(%target, %point, merged, "extension merged"))
		.map_err(|error| match error {
			MergeError::UnknownPoint => RegistryError::UnknownExtensionPoint {
				target: target.to_string(),
				point: point.to_string(),
			},
			MergeError::TypeMismatch { expected, found } => RegistryError::ExtensionTypeMismatch {
				target: target.to_string(),
				point: point.to_string(),
				expected,
				found,
			},
		})
}
