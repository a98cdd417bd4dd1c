//! The `layout` module: column sizing strategies.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_core::{ExtensionPoint, Module, ModuleContext, ModuleDescriptor, ModuleResult, TableContext};

/// Module name.
pub const NAME: &str = "layout";

const DEFAULT_MODE: &str = "fitData";

/// Computes final column widths from the columns' sizing data and the width
/// available to the table.
pub type LayoutMode = Arc<dyn Fn(&[ColumnLayout], f64) -> Vec<f64> + Send + Sync>;

/// Sizing data for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
	/// Width the column needs for its content.
	pub width: f64,
	/// Relative share of spare width the column takes.
	pub width_grow: f64,
	/// Relative share of missing width the column gives up.
	pub width_shrink: f64,
}

impl ColumnLayout {
	/// A column with natural `width` that neither grows nor shrinks.
	pub fn new(width: f64) -> Self {
		Self {
			width,
			width_grow: 1.0,
			width_shrink: 0.0,
		}
	}

	/// Sets the grow weight.
	pub fn with_grow(mut self, grow: f64) -> Self {
		self.width_grow = grow;
		self
	}

	/// Sets the shrink weight.
	pub fn with_shrink(mut self, shrink: f64) -> Self {
		self.width_shrink = shrink;
		self
	}
}

fn natural(columns: &[ColumnLayout]) -> Vec<f64> {
	columns.iter().map(|c| c.width).collect()
}

fn fit_data_stretch(columns: &[ColumnLayout], available: f64) -> Vec<f64> {
	let mut widths = natural(columns);
	let total: f64 = widths.iter().sum();
	if let Some(last) = widths.last_mut() {
		if total < available {
			*last += available - total;
		}
	}
	widths
}

fn fit_columns(columns: &[ColumnLayout], available: f64) -> Vec<f64> {
	let total: f64 = columns.iter().map(|c| c.width).sum();
	let growing = total < available;
	let weight = |c: &ColumnLayout| if growing { c.width_grow } else { c.width_shrink };
	let delta = available - total;
	let weights: f64 = columns.iter().map(weight).sum();
	if weights <= 0.0 {
		return natural(columns);
	}
	columns
		.iter()
		.map(|c| (c.width + delta * weight(c) / weights).max(0.0))
		.collect()
}

/// The layout modes shipped with the module.
pub fn default_modes() -> ExtensionPoint<LayoutMode> {
	let fit_data: LayoutMode = Arc::new(|columns: &[ColumnLayout], _: f64| natural(columns));
	ExtensionPoint::new()
		.with("fitData", Arc::clone(&fit_data))
		.with("fitDataFill", fit_data)
		.with("fitDataStretch", Arc::new(fit_data_stretch) as LayoutMode)
		.with("fitColumns", Arc::new(fit_columns) as LayoutMode)
}

/// The active layout of one table, published as the `layout` capability.
pub struct Layout {
	mode: String,
	apply: LayoutMode,
	columns_on_new_data: bool,
}

impl Layout {
	/// The active mode name.
	pub fn mode(&self) -> &str {
		&self.mode
	}

	/// Whether columns should be re-laid out whenever new data is loaded.
	pub fn layout_columns_on_new_data(&self) -> bool {
		self.columns_on_new_data
	}

	/// Computes widths for `columns` within `available_width`.
	pub fn layout(&self, columns: &[ColumnLayout], available_width: f64) -> Vec<f64> {
		(self.apply)(columns, available_width)
	}

	/// Sizing data for the table's configured columns, given the content
	/// width each one needs. `widthGrow` and `widthShrink` come from the
	/// column definitions.
	pub fn column_layouts(table: &TableContext, content_widths: &[f64]) -> Vec<ColumnLayout> {
		content_widths
			.iter()
			.enumerate()
			.map(|(index, width)| {
				let number = |key: &str| table.column_option(index, key).and_then(Value::as_f64);
				let mut column = ColumnLayout::new(*width);
				if let Some(grow) = number("widthGrow") {
					column = column.with_grow(grow);
				}
				if let Some(shrink) = number("widthShrink") {
					column = column.with_shrink(shrink);
				}
				column
			})
			.collect()
	}
}

impl std::fmt::Debug for Layout {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Layout")
			.field("mode", &self.mode)
			.field("columns_on_new_data", &self.columns_on_new_data)
			.finish_non_exhaustive()
	}
}

struct LayoutModule {
	modes: ExtensionPoint<LayoutMode>,
}

impl Module for LayoutModule {
	fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
		// non-string values fall through to the unknown mode warning
		let requested = match ctx.option("layout") {
			None | Some(Value::Null) => DEFAULT_MODE.to_string(),
			Some(Value::String(mode)) => mode.clone(),
			Some(other) => other.to_string(),
		};
		let (mode, apply) = match self.modes.get(&requested) {
			Some(apply) => (requested, Arc::clone(apply)),
			None => {
				tracing::warn!(
					mode = %requested,
					"Layout Error - invalid mode set, defaulting to '{DEFAULT_MODE}' : {requested}"
				);
				let apply = self.modes.get(DEFAULT_MODE).cloned().unwrap_or_else(|| {
					Arc::new(|columns: &[ColumnLayout], _: f64| natural(columns)) as LayoutMode
				});
				(DEFAULT_MODE.to_string(), apply)
			}
		};
		let columns_on_new_data = ctx.table().options().flag("layoutColumnsOnNewData");
		tracing::debug!(table = %ctx.table().id(), %mode, "layout mode selected");

		ctx.publish(Arc::new(Layout {
			mode,
			apply,
			columns_on_new_data,
		}));
		ctx.register_table_function("getLayout", |ctx: &mut ModuleContext<'_>, _args: &[Value]| {
			let mode = ctx
				.capability::<Layout>(NAME)
				.map(|layout| layout.mode().to_string());
			Ok(mode.map(Value::String).unwrap_or(Value::Null))
		});
		Ok(())
	}
}

/// Descriptor of the `layout` module.
pub fn descriptor() -> ModuleDescriptor {
	ModuleDescriptor::new(NAME, |points, ctx| {
		ctx.register_table_option("layout", DEFAULT_MODE);
		ctx.register_table_option("layoutColumnsOnNewData", false);
		ctx.register_column_option("widthGrow", Value::Null);
		ctx.register_column_option("widthShrink", Value::Null);
		LayoutModule {
			modes: points.get::<LayoutMode>("modes").cloned().unwrap_or_default(),
		}
	})
	.with_extension_point("modes", default_modes())
}
