//! Table lookup through the registry.

use rstest::{fixture, rstest};
use serde_json::json;
use tabula_core::{Element, ModuleRegistry, Table, TableHandle};
use tabula_registry::{TableQuery, TableRegistry};

struct Fixture {
	tables: TableRegistry,
	orders: TableHandle,
	customers: TableHandle,
	orders_element: Element,
}

fn table(modules: &ModuleRegistry, element: &Element) -> TableHandle {
	Table::builder(element.clone())
		.build(modules)
		.unwrap()
		.into_handle()
}

#[fixture]
fn registry() -> Fixture {
	let modules = ModuleRegistry::new();
	let tables = TableRegistry::new();
	let orders_element = Element::builder("div").id("orders").class("grid").build();
	let customers_element = Element::builder("div")
		.id("customers")
		.class("grid")
		.attribute("data-kind", "people")
		.build();

	let orders = table(&modules, &orders_element);
	let customers = table(&modules, &customers_element);
	tables.register(&orders);
	tables.register(&customers);

	Fixture {
		tables,
		orders,
		customers,
		orders_element,
	}
}

fn ids(handles: &[TableHandle]) -> Vec<u64> {
	handles.iter().map(|h| h.lock().id().as_u64()).collect()
}

fn id(handle: &TableHandle) -> u64 {
	handle.lock().id().as_u64()
}

#[rstest]
fn test_lookup_by_selector(registry: Fixture) {
	let found = registry.tables.lookup_table("#orders", false);
	assert_eq!(ids(&found), vec![id(&registry.orders)]);

	let grids = registry.tables.lookup_table(".grid", false);
	assert_eq!(ids(&grids), vec![id(&registry.orders), id(&registry.customers)]);

	let people = registry.tables.lookup_table("[data-kind=people]", false);
	assert_eq!(ids(&people), vec![id(&registry.customers)]);
}

#[rstest]
fn test_lookup_by_element(registry: Fixture) {
	let found = registry.tables.lookup_table(&registry.orders_element, false);
	assert_eq!(ids(&found), vec![id(&registry.orders)]);

	let stranger = Element::builder("div").id("orders").build();
	assert!(registry.tables.lookup_table(stranger, true).is_empty());
}

#[rstest]
fn test_lookup_handle_and_many(registry: Fixture) {
	let customers_id = registry.customers.lock().id();
	let query = TableQuery::Many(vec![
		TableQuery::Table(registry.orders.clone()),
		TableQuery::Id(customers_id),
		TableQuery::from("#missing"),
	]);

	let found = registry.tables.lookup_table(query, true);

	assert_eq!(ids(&found), vec![id(&registry.orders), id(&registry.customers)]);
}

#[rstest]
fn test_lookup_value(registry: Fixture) {
	let found = registry.tables.lookup_value(&json!(["#orders", "#customers"]), false);
	assert_eq!(found.len(), 2);

	assert!(registry.tables.lookup_value(&json!({"bad": true}), true).is_empty());
}

#[rstest]
fn test_lookup_unregistered_handles_yield_nothing(registry: Fixture) {
	let orders_id = registry.orders.lock().id();
	registry.tables.deregister(orders_id);
	assert!(registry.tables.lookup_table(registry.orders.clone(), false).is_empty());

	let modules = ModuleRegistry::new();
	let stranger = table(&modules, &Element::builder("div").id("stranger").build());
	assert!(registry.tables.lookup_table(stranger.clone(), false).is_empty());

	let query = TableQuery::Many(vec![
		TableQuery::Table(stranger),
		TableQuery::Table(registry.customers.clone()),
	]);
	assert_eq!(ids(&registry.tables.lookup_table(query, true)), vec![id(&registry.customers)]);
}

#[rstest]
fn test_lookup_by_nested_selector() {
	let modules = ModuleRegistry::new();
	let tables = TableRegistry::new();
	let sidebar = Element::builder("aside").id("sidebar").build();
	let content = Element::builder("main").build();
	let nested = table(&modules, &Element::builder("div").class("grid").parent(&sidebar).build());
	let other = table(&modules, &Element::builder("div").class("grid").parent(&content).build());
	tables.register(&nested);
	tables.register(&other);

	assert_eq!(ids(&tables.lookup_table("#sidebar .grid", false)), vec![id(&nested)]);
	assert_eq!(ids(&tables.lookup_table("main > div", false)), vec![id(&other)]);
	assert_eq!(tables.lookup_table("body .grid", false).len(), 2);
}

#[rstest]
#[case("div >")]
#[case("div.")]
#[case("span")]
#[case("")]
fn test_invalid_or_unmatched_selectors_yield_nothing(registry: Fixture, #[case] selector: &str) {
	assert!(registry.tables.lookup_table(selector, false).is_empty());
}

#[rstest]
fn test_register_is_idempotent_and_deregister(registry: Fixture) {
	registry.tables.register(&registry.orders);
	assert_eq!(registry.tables.len(), 2);

	let orders_id = registry.orders.lock().id();
	assert!(registry.tables.deregister(orders_id));
	assert!(!registry.tables.deregister(orders_id));
	assert!(!registry.tables.contains(orders_id));
	assert!(registry.tables.lookup_table("#orders", true).is_empty());
}

#[rstest]
fn test_dropped_tables_disappear() {
	let modules = ModuleRegistry::new();
	let tables = TableRegistry::new();
	let element = Element::builder("div").id("temp").build();
	let handle = table(&modules, &element);
	tables.register(&handle);
	assert_eq!(tables.len(), 1);

	drop(handle);

	assert!(tables.is_empty());
	assert!(tables.lookup_table("#temp", true).is_empty());
	assert!(tables.tables().is_empty());
}

#[rstest]
fn test_lookup_excluding_skips_self_without_locking(registry: Fixture) {
	let orders_id = registry.orders.lock().id();
	let guard = registry.orders.lock();

	let found = registry.tables.lookup_excluding(".grid", orders_id, false);
	let by_handle = registry
		.tables
		.lookup_excluding(TableQuery::Table(registry.orders.clone()), orders_id, false);
	drop(guard);

	assert_eq!(ids(&found), vec![id(&registry.customers)]);
	assert!(by_handle.is_empty());
}
