//! Binding modules to tables through the registry.

use std::sync::Arc;

use parking_lot::Mutex;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tabula_core::{
	ComponentKind, ComponentRef, Element, Extension, ExtensionPoint, InitOrder, Module, ModuleContext,
	ModuleDescriptor, ModuleRegistry, ModuleResult, Table, TableError,
};
use tabula_options::TableOptions;
use tabula_pipeline::Row;

type Journal = Arc<Mutex<Vec<String>>>;

/// Records its lifecycle hooks into a shared journal.
struct Recorder {
	journal: Journal,
	fail: bool,
}

impl Module for Recorder {
	fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
		if self.fail {
			return Err(format!("{} refused to start", ctx.module_name()).into());
		}
		self.journal.lock().push(format!("init:{}", ctx.module_name()));
		Ok(())
	}

	fn comms_received(
		&mut self,
		ctx: &mut ModuleContext<'_>,
		sender: &Element,
		action: &str,
		data: &Value,
	) -> ModuleResult<Option<Value>> {
		self.journal
			.lock()
			.push(format!("comms:{}:{}:{}", ctx.module_name(), sender.tag(), action));
		Ok(Some(data.clone()))
	}

	fn destroy(&mut self, ctx: &mut ModuleContext<'_>) {
		self.journal.lock().push(format!("destroy:{}", ctx.module_name()));
	}
}

fn recorder(journal: &Journal, name: &str) -> ModuleDescriptor {
	let journal = Arc::clone(journal);
	ModuleDescriptor::new(name, move |_points, _ctx| Recorder {
		journal: Arc::clone(&journal),
		fail: false,
	})
}

fn failing(journal: &Journal, name: &str) -> ModuleDescriptor {
	let journal = Arc::clone(journal);
	ModuleDescriptor::new(name, move |_points, _ctx| Recorder {
		journal: Arc::clone(&journal),
		fail: true,
	})
}

#[fixture]
fn journal() -> Journal {
	Arc::new(Mutex::new(Vec::new()))
}

fn inits(journal: &Journal) -> Vec<String> {
	journal
		.lock()
		.iter()
		.filter_map(|entry| entry.strip_prefix("init:").map(str::to_string))
		.collect()
}

fn options(value: Value) -> TableOptions {
	TableOptions::from_value(value).unwrap()
}

#[rstest]
fn test_initialization_order(journal: Journal) {
	let registry = ModuleRegistry::new();
	registry.initialize(
		[recorder(&journal, "layout"), recorder(&journal, "localize")],
		[
			recorder(&journal, "late").with_init_order(InitOrder::Late(1)),
			recorder(&journal, "plain"),
			recorder(&journal, "early").with_init_order(-1),
		],
	);

	let table = Table::bind(&registry, Element::new("div"), TableOptions::default()).unwrap();

	assert_eq!(inits(&journal), vec!["layout", "localize", "early", "plain", "late"]);
	assert_eq!(table.init_sequence(), ["layout", "localize", "early", "plain", "late"]);
}

#[rstest]
fn test_initialize_failure_aborts_build(journal: Journal) {
	let registry = ModuleRegistry::new();
	registry.register_modules(
		[
			recorder(&journal, "first"),
			failing(&journal, "broken"),
			recorder(&journal, "never"),
		],
		false,
	);

	let error = Table::bind(&registry, Element::new("div"), TableOptions::default()).unwrap_err();

	assert!(matches!(&error, TableError::ModuleInit { module, .. } if module == "broken"));
	assert_eq!(inits(&journal), vec!["first"]);
}

#[rstest]
fn test_destroy_runs_in_reverse_order(journal: Journal) {
	let registry = ModuleRegistry::new();
	registry.initialize(
		[recorder(&journal, "core")],
		[recorder(&journal, "a"), recorder(&journal, "b")],
	);
	let destroyed = Arc::new(Mutex::new(false));
	let flag = Arc::clone(&destroyed);
	let mut table = Table::builder(Element::new("div"))
		.on("tableDestroyed", move |_| *flag.lock() = true)
		.build(&registry)
		.unwrap();

	table.destroy();
	table.destroy();

	let destroys: Vec<String> = journal
		.lock()
		.iter()
		.filter(|entry| entry.starts_with("destroy:"))
		.cloned()
		.collect();
	assert_eq!(destroys, vec!["destroy:b", "destroy:a", "destroy:core"]);
	assert!(*destroyed.lock());
	assert!(matches!(table.call("anything", &[]), Err(TableError::Destroyed(_))));
}

#[rstest]
fn test_table_built_dispatched_after_data_load() {
	let registry = ModuleRegistry::new();
	let seen = Arc::new(Mutex::new(Vec::new()));
	let built = Arc::clone(&seen);
	let processed = Arc::clone(&seen);

	let table = Table::builder(Element::new("div"))
		.options(options(json!({"data": [{"a": 1}, {"a": 2}]})))
		.on("dataProcessed", move |payload| processed.lock().push(format!("data:{payload}")))
		.on("tableBuilt", move |_| built.lock().push("built".to_string()))
		.build(&registry)
		.unwrap();

	assert!(table.is_initialized());
	assert_eq!(*seen.lock(), vec!["data:2", "built"]);
}

#[rstest]
fn test_unknown_options_do_not_fail_build() {
	let registry = ModuleRegistry::new();
	let table = Table::bind(
		&registry,
		Element::new("div"),
		options(json!({"notAnOption": 1, "columns": [{"title": "Name", "field": "name", "bogus": true}]})),
	)
	.unwrap();

	assert_eq!(table.context().columns().len(), 1);
	assert_eq!(table.options().get("notAnOption"), Some(&json!(1)));
}

struct Paging {
	size: usize,
	built_with: Vec<String>,
}

impl Module for Paging {
	fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
		self.size = ctx.option_as::<usize>("paginationSize")?.unwrap_or(1);
		let size = self.size;
		ctx.register_display_handler(move |rows: Vec<Row>, _| Ok(rows.into_iter().take(size).collect()), 50);
		ctx.register_table_function("getPageSize", |ctx: &mut ModuleContext<'_>, _args: &[Value]| {
			Ok(ctx.option("paginationSize").cloned().unwrap_or(Value::Null))
		});
		ctx.register_component_function(
			ComponentKind::Row,
			"pageOf",
			|_ctx: &mut ModuleContext<'_>, component: &ComponentRef, _args: &[Value]| match component {
				ComponentRef::Row(id) => Ok(json!(id.0)),
				_ => Err("rows only".into()),
			},
		);
		Ok(())
	}
}

fn paging() -> ModuleDescriptor {
	ModuleDescriptor::new("page", |points, ctx| {
		ctx.register_table_option("paginationSize", 2);
		let built_with = points
			.get::<String>("modes")
			.map(|point| point.keys().map(str::to_string).collect())
			.unwrap_or_default();
		Paging { size: 0, built_with }
	})
	.with_extension_point("modes", ExtensionPoint::new().with("local", "local".to_string()))
}

#[rstest]
fn test_module_functions_and_pipeline() {
	let registry = ModuleRegistry::new();
	registry.register_module(paging());
	registry.register_module(
		ModuleDescriptor::new("remote", |_points, _ctx| Paging {
			size: 0,
			built_with: Vec::new(),
		})
		.with_extension(Extension::new("page", "modes", [("remote", "remote".to_string())])),
	);

	let mut table = Table::bind(
		&registry,
		Element::new("div"),
		options(json!({"paginationSize": 1, "data": [{"a": 1}, {"a": 2}]})),
	)
	.unwrap();

	assert_eq!(table.display_rows().len(), 1);
	assert_eq!(table.active_rows().len(), 2);
	assert_eq!(table.call("getPageSize", &[]).unwrap(), json!(1));
	assert!(matches!(
		table.call("missing", &[]),
		Err(TableError::UnknownFunction(name)) if name == "missing"
	));

	let first = table.rows()[0].id();
	assert_eq!(
		table.call_component(&ComponentRef::Row(first), "pageOf", &[]).unwrap(),
		json!(first.0)
	);
	assert!(matches!(
		table.call_component(&ComponentRef::Column("a".into()), "pageOf", &[]),
		Err(TableError::UnknownComponentFunction { kind: ComponentKind::Column, .. })
	));

	let (page, _ctx) = table.module::<Paging>("page").unwrap();
	assert_eq!(page.size, 1);
	assert_eq!(page.built_with, vec!["local", "remote"]);
	assert!(table.module::<Paging>("missing").is_none());
}

#[rstest]
fn test_receive_comms(journal: Journal) {
	let registry = ModuleRegistry::new();
	registry.register_module(recorder(&journal, "filter"));
	let mut table = Table::bind(&registry, Element::new("div"), TableOptions::default()).unwrap();
	let sender = Element::new("section");

	let reply = table
		.receive_comms(&sender, "filter", "refresh", &json!({"x": 1}))
		.unwrap();
	let missing = table.receive_comms(&sender, "sort", "refresh", &Value::Null).unwrap();

	assert_eq!(reply, Some(json!({"x": 1})));
	assert_eq!(missing, None);
	assert!(journal.lock().contains(&"comms:filter:section:refresh".to_string()));
}

struct Caller {
	answer: Option<Value>,
}

impl Module for Caller {
	fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
		self.answer = Some(ctx.call("getPageSize", &[])?);
		Ok(())
	}
}

#[rstest]
fn test_table_function_callable_during_initialization() {
	let registry = ModuleRegistry::new();
	registry.register_modules(
		[
			paging(),
			ModuleDescriptor::new("caller", |_points, _ctx| Caller { answer: None }).with_init_order(1),
		],
		false,
	);

	let mut table = Table::bind(&registry, Element::new("div"), TableOptions::default()).unwrap();

	let (caller, _ctx) = table.module::<Caller>("caller").unwrap();
	assert_eq!(caller.answer, Some(json!(2)));
}

#[rstest]
fn test_snapshot_isolates_built_tables(journal: Journal) {
	let registry = ModuleRegistry::new();
	registry.register_module(recorder(&journal, "a"));
	let table = Table::bind(&registry, Element::new("div"), TableOptions::default()).unwrap();

	registry.register_module(recorder(&journal, "b"));
	let later = Table::bind(&registry, Element::new("div"), TableOptions::default()).unwrap();

	assert!(!table.mod_exists("b"));
	assert!(later.mod_exists("b"));
	assert_ne!(table.id(), later.id());
}
