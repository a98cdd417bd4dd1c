//! End-to-end composition through the `Tabula` environment.

use std::sync::Arc;

use parking_lot::Mutex;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tabula::prelude::*;
use tabula::{ModuleRegistry, PipelineError, RegistryError, RowManager};

type Journal = Arc<Mutex<Vec<String>>>;

struct Named {
	journal: Journal,
}

impl Module for Named {
	fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
		self.journal.lock().push(ctx.module_name().to_string());
		Ok(())
	}
}

fn named(journal: &Journal, name: &str, order: Option<i32>) -> ModuleDescriptor {
	let journal = Arc::clone(journal);
	ModuleDescriptor::new(name, move |_points, _ctx| Named {
		journal: Arc::clone(&journal),
	})
	.with_init_order(order)
}

#[fixture]
fn journal() -> Journal {
	Arc::new(Mutex::new(Vec::new()))
}

fn options(value: Value) -> TableOptions {
	TableOptions::from_value(value).unwrap()
}

#[rstest]
fn test_option_defaults_first_registration_wins() {
	struct Register(&'static str, i64);

	impl Module for Register {
		fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
			ctx.register_table_option(self.0, self.1);
			Ok(())
		}
	}

	let tabula = Tabula::new();
	tabula.initialize([
		ModuleDescriptor::new("a", |_points, _ctx| Register("pageSize", 10)),
		ModuleDescriptor::new("b", |_points, _ctx| Register("pageSize", 20)),
	]);

	let table = tabula.build_table(Element::new("div"), TableOptions::default()).unwrap();
	let configured = tabula
		.build_table(Element::new("div"), options(json!({"pageSize": 5})))
		.unwrap();

	assert_eq!(table.lock().options().get("pageSize"), Some(&json!(10)));
	assert_eq!(configured.lock().options().get("pageSize"), Some(&json!(5)));
}

#[rstest]
fn test_core_modules_before_regular(journal: Journal) {
	let tabula = Tabula::new();
	tabula.initialize([named(&journal, "x", Some(-100))]);
	tabula.register_module(named(&journal, "y", None));

	let table = tabula.build_table(Element::new("div"), TableOptions::default()).unwrap();

	assert_eq!(table.lock().init_sequence(), ["layout", "localize", "comms", "x", "y"]);
	assert_eq!(*journal.lock(), vec!["x", "y"]);
}

#[rstest]
fn test_init_order_partitions(journal: Journal) {
	let tabula = Tabula::new();
	tabula.initialize([
		named(&journal, "late3", Some(3)),
		named(&journal, "early5", Some(-5)),
		named(&journal, "plainA", None),
		named(&journal, "late1", Some(1)),
		named(&journal, "early1", Some(-1)),
		named(&journal, "plainB", None),
	]);

	tabula.build_table(Element::new("div"), TableOptions::default()).unwrap();

	assert_eq!(
		*journal.lock(),
		vec!["early5", "early1", "plainA", "plainB", "late1", "late3"]
	);
}

fn host(journal: &Journal) -> ModuleDescriptor {
	let journal = Arc::clone(journal);
	ModuleDescriptor::new("format", move |points, _ctx| {
		let keys: Vec<String> = points
			.get::<String>("formatters")
			.map(|point| point.keys().map(str::to_string).collect())
			.unwrap_or_default();
		journal.lock().push(keys.join(","));
		Named {
			journal: Arc::new(Mutex::new(Vec::new())),
		}
	})
	.with_extension_point("formatters", ExtensionPoint::new().with("plain", "plain".to_string()))
}

fn contributor(journal: &Journal) -> ModuleDescriptor {
	named(journal, "money", None).with_extension(Extension::new(
		"format",
		"formatters",
		[("money", "money".to_string())],
	))
}

#[rstest]
#[case::target_registered_later(false)]
#[case::target_registered_first(true)]
fn test_extensions_reach_target(journal: Journal, #[case] target_first: bool) {
	let modules = ModuleRegistry::new();
	if target_first {
		modules.register_modules([host(&journal), contributor(&journal)], false);
	} else {
		modules.register_modules([contributor(&journal), host(&journal)], false);
		assert!(modules.pending_extensions("format").is_empty());
	}

	Table::bind(&modules, Element::new("div"), TableOptions::default()).unwrap();

	assert!(journal.lock().contains(&"plain,money".to_string()));
}

#[rstest]
fn test_registry_initialize_is_idempotent(journal: Journal) {
	let tabula = Tabula::new();

	assert!(tabula.initialize([named(&journal, "once", None)]).is_empty());
	assert!(tabula.initialize([named(&journal, "twice", None)]).is_empty());

	assert_eq!(tabula.modules().names(), vec!["layout", "localize", "comms", "once"]);
}

#[rstest]
fn test_pipeline_priority_order() {
	let ran = Arc::new(Mutex::new(Vec::new()));
	let mut manager = RowManager::new();
	for priority in [10, 1, 5] {
		let ran = Arc::clone(&ran);
		manager.register_data_handler("test", priority, move |rows, _| {
			ran.lock().push(priority);
			Ok(rows)
		});
	}

	manager.set_data([json!({"a": 1}).as_object().cloned().unwrap()]).unwrap();

	assert_eq!(*ran.lock(), vec![1, 5, 10]);
}

struct Inspector {
	seen: Arc<Mutex<Option<usize>>>,
}

impl Module for Inspector {
	fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
		let seen = Arc::clone(&self.seen);
		ctx.register_table_function("inspect", move |ctx: &mut ModuleContext<'_>, _args: &[Value]| {
			let count = ctx.current_display_rows(-1).len();
			*seen.lock() = Some(count);
			Ok(Value::from(count))
		});
		Ok(())
	}
}

#[rstest]
fn test_own_stage_lookup_falls_back_to_active_rows() {
	let seen = Arc::new(Mutex::new(None));
	let inspector_seen = Arc::clone(&seen);
	let tabula = Tabula::new();
	tabula.initialize([ModuleDescriptor::new("inspect", move |_points, _ctx| Inspector {
		seen: Arc::clone(&inspector_seen),
	})]);

	let table = tabula
		.build_table(Element::new("div"), options(json!({"data": [{"a": 1}, {"a": 2}, {"a": 3}]})))
		.unwrap();

	assert_eq!(table.lock().call("inspect", &[]).unwrap(), json!(3));
	assert_eq!(*seen.lock(), Some(3));
}

#[rstest]
fn test_table_lookup_by_element_and_selector() {
	let tabula = Tabula::new();
	let element = Element::builder("div").id("orders").class("grid").build();
	let orders = tabula.build_table(element.clone(), TableOptions::default()).unwrap();
	tabula
		.build_table(Element::builder("div").id("stock").class("grid").build(), TableOptions::default())
		.unwrap();

	let by_element = tabula.lookup_table(&element, false);
	let by_selector = tabula.lookup_table("div#orders", false);

	assert_eq!(by_element.len(), 1);
	assert!(Arc::ptr_eq(&by_element[0], &orders));
	assert!(Arc::ptr_eq(&by_selector[0], &orders));
	assert_eq!(tabula.lookup_table(".grid", false).len(), 2);
	assert_eq!(tabula.lookup_value(&json!(["#orders", "#stock"]), false).len(), 2);
}

#[rstest]
fn test_missing_name_registration_is_not_fatal(journal: Journal) {
	let tabula = Tabula::new();

	let report = tabula.initialize([named(&journal, "", None), named(&journal, "kept", None)]);

	assert_eq!(report, vec![RegistryError::MissingName]);
	assert!(tabula.modules().contains("kept"));
	assert!(tabula.build_table(Element::new("div"), TableOptions::default()).is_ok());
}

#[rstest]
fn test_destroy_table_deregisters() {
	let tabula = Tabula::new();
	let handle = tabula
		.build_table(Element::builder("div").id("gone").build(), TableOptions::default())
		.unwrap();

	tabula.destroy_table(&handle);

	assert!(handle.lock().is_destroyed());
	assert!(tabula.lookup_table("#gone", true).is_empty());
	assert!(tabula.lookup_table(handle.clone(), true).is_empty());
}

#[rstest]
fn test_failing_handler_surfaces_from_set_data() {
	struct Strict;

	impl Module for Strict {
		fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
			ctx.register_data_handler(
				|rows: Vec<Row>, _: &StageContext| {
					if rows.len() > 2 {
						return Err("too many rows".into());
					}
					Ok(rows)
				},
				0,
			);
			Ok(())
		}
	}

	let tabula = Tabula::new();
	tabula.initialize([ModuleDescriptor::new("strict", |_points, _ctx| Strict)]);
	let handle = tabula.build_table(Element::new("div"), TableOptions::default()).unwrap();
	let row = || json!({"a": 1}).as_object().cloned().unwrap();

	let result = handle.lock().set_data([row(), row(), row()]);

	assert!(matches!(
		result,
		Err(TableError::Pipeline(PipelineError::HandlerFailed { ref owner, .. })) if owner == "strict"
	));
}
