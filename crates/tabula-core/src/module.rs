//! The contract every module implements.

use std::any::Any;

use serde_json::Value;

use crate::context::ModuleContext;
use crate::element::Element;
use crate::error::ModuleResult;

/// Downcasting support for module trait objects.
///
/// Implemented for every `'static` type; modules never implement it by hand.
pub trait AsAnyModule: Any {
	fn as_any(&self) -> &dyn Any;
	fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAnyModule for T {
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

/// A feature unit installed into tables.
///
/// One instance is constructed per table by the descriptor's factory; the
/// factory is the place to register options, since user configuration is
/// validated only after every module has been constructed and initialized.
/// All interaction with the owning table goes through the
/// [`ModuleContext`] passed to each hook.
///
/// # Examples
///
/// ```
/// use tabula_core::{Module, ModuleContext, ModuleResult};
///
/// struct Footer {
///     visible: bool,
/// }
///
/// impl Module for Footer {
///     fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
///         self.visible = ctx.option("footerElement").is_some_and(|v| !v.is_null());
///         Ok(())
///     }
/// }
/// ```
pub trait Module: AsAnyModule + Send {
	/// Called exactly once per table, in the binder's initialization order.
	fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()>;

	/// Handles an inter-table message addressed to this module.
	///
	/// The default implementation ignores the message.
	fn comms_received(
		&mut self,
		ctx: &mut ModuleContext<'_>,
		sender: &Element,
		action: &str,
		data: &Value,
	) -> ModuleResult<Option<Value>> {
		let _ = (sender, data);
		tracing::debug!(
			module = ctx.module_name(),
			action,
			"module does not handle inter-table messages"
		);
		Ok(None)
	}

	/// Releases table resources; called in reverse initialization order.
	fn destroy(&mut self, ctx: &mut ModuleContext<'_>) {
		let _ = ctx;
	}
}
