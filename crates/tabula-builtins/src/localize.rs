//! The `localize` module: language packs and locale selection.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tabula_core::{ExtensionPoint, Module, ModuleContext, ModuleDescriptor, ModuleResult};

use crate::error::BuiltinError;

/// Module name.
pub const NAME: &str = "localize";

/// Key of the fallback language.
pub const DEFAULT_LOCALE: &str = "default";

/// Dispatched after the locale changes through `setLocale`.
pub const LOCALIZED: &str = "localized";

/// The built-in fallback language.
pub fn default_lang() -> Value {
	json!({
		"groups": {
			"item": "item",
			"items": "items",
		},
		"columns": {},
		"data": {
			"loading": "Loading",
			"error": "Error",
		},
		"pagination": {
			"page_size": "Page Size",
			"page_title": "Show Page",
			"first": "First",
			"first_title": "First Page",
			"last": "Last",
			"last_title": "Last Page",
			"prev": "Prev",
			"prev_title": "Prev Page",
			"next": "Next",
			"next_title": "Next Page",
			"all": "All",
			"counter": {
				"showing": "Showing",
				"of": "of",
				"rows": "rows",
				"pages": "pages",
			},
		},
		"headerFilters": {
			"default": "filter column...",
			"columns": {},
		},
	})
}

/// Fills keys missing from `target` with the values in `defaults`,
/// recursing into nested objects.
fn fill_missing(target: &mut Value, defaults: &Value) {
	let (Value::Object(target), Value::Object(defaults)) = (target, defaults) else {
		return;
	};
	for (key, default) in defaults {
		match target.get_mut(key) {
			Some(existing) => fill_missing(existing, default),
			None => {
				target.insert(key.clone(), default.clone());
			}
		}
	}
}

/// Overlays `overrides` onto `target`, recursing into nested objects.
fn overlay(target: &mut Value, overrides: &Value) {
	match (target, overrides) {
		(Value::Object(target), Value::Object(overrides)) => {
			for (key, value) in overrides {
				match target.get_mut(key) {
					Some(existing) => overlay(existing, value),
					None => {
						target.insert(key.clone(), value.clone());
					}
				}
			}
		}
		(target, overrides) => *target = overrides.clone(),
	}
}

/// Locale from the process environment, e.g. `en_GB.UTF-8` as `en-gb`.
fn system_locale() -> String {
	["LC_ALL", "LC_MESSAGES", "LANG"]
		.iter()
		.filter_map(|key| std::env::var(key).ok())
		.filter_map(|raw| raw.split('.').next().map(|l| l.replace('_', "-").to_ascii_lowercase()))
		.find(|locale| !locale.is_empty() && locale != "c" && locale != "posix")
		.unwrap_or_else(|| DEFAULT_LOCALE.to_string())
}

#[derive(Debug)]
struct Active {
	locale: String,
	lang: Value,
}

/// Installed languages and the active locale of one table, published as
/// the `localize` capability.
#[derive(Debug)]
pub struct Localizer {
	langs: IndexMap<String, Value>,
	active: RwLock<Active>,
}

impl Localizer {
	/// Creates a localizer on the default locale. Locale keys are matched
	/// case-insensitively.
	pub fn new(langs: impl IntoIterator<Item = (String, Value)>) -> Self {
		let mut installed: IndexMap<String, Value> = IndexMap::new();
		for (locale, lang) in langs {
			let locale = locale.to_ascii_lowercase();
			match installed.get_mut(&locale) {
				Some(existing) => overlay(existing, &lang),
				None => {
					installed.insert(locale, lang);
				}
			}
		}
		installed.entry(DEFAULT_LOCALE.to_string()).or_insert_with(default_lang);

		let lang = installed.get(DEFAULT_LOCALE).cloned().unwrap_or_else(default_lang);
		Self {
			langs: installed,
			active: RwLock::new(Active {
				locale: DEFAULT_LOCALE.to_string(),
				lang,
			}),
		}
	}

	/// The active locale.
	pub fn locale(&self) -> String {
		self.active.read().locale.clone()
	}

	/// The active language, completed from the default language.
	pub fn lang(&self) -> Value {
		self.active.read().lang.clone()
	}

	/// Installed locales, in installation order.
	pub fn locales(&self) -> Vec<String> {
		self.langs.keys().cloned().collect()
	}

	/// The locale `desired` resolves to: an exact match, else its language
	/// prefix, else the default.
	pub fn resolve(&self, desired: &str) -> String {
		let desired = desired.to_ascii_lowercase();
		if self.langs.contains_key(&desired) {
			return desired;
		}
		let prefix = desired.split('-').next().unwrap_or_default();
		if self.langs.contains_key(prefix) {
			tracing::warn!(
				locale = %desired,
				using = prefix,
				"Localization Error - Exact matching locale not found, using closest match: {prefix}"
			);
			return prefix.to_string();
		}
		tracing::warn!(
			locale = %desired,
			"Localization Error - Matching locale not found, using default: {DEFAULT_LOCALE}"
		);
		DEFAULT_LOCALE.to_string()
	}

	/// The language for an installed locale, completed from the default.
	pub fn lang_for(&self, locale: &str) -> Option<Value> {
		let mut lang = self.langs.get(&locale.to_ascii_lowercase())?.clone();
		if let Some(default) = self.langs.get(DEFAULT_LOCALE) {
			fill_missing(&mut lang, default);
		}
		Some(lang)
	}

	/// Switches locale and returns the locale actually selected.
	pub fn set_locale(&self, desired: &str) -> String {
		let locale = self.resolve(desired);
		let lang = self.lang_for(&locale).unwrap_or_else(default_lang);
		tracing::debug!(%locale, "locale set");
		*self.active.write() = Active {
			locale: locale.clone(),
			lang,
		};
		locale
	}

	/// Looks up a `|`-separated path in the active language.
	///
	/// ```
	/// use tabula_builtins::localize::Localizer;
	///
	/// let localizer = Localizer::new([]);
	/// assert_eq!(localizer.text("pagination|counter|of").as_deref(), Some("of"));
	/// assert_eq!(localizer.text("pagination|missing"), None);
	/// ```
	pub fn text(&self, path: &str) -> Option<String> {
		let active = self.active.read();
		path.split('|')
			.try_fold(&active.lang, |node, key| node.get(key))
			.and_then(Value::as_str)
			.map(str::to_string)
	}
}

fn string_arg(args: &[Value], function: &'static str) -> Result<String, BuiltinError> {
	args.first()
		.and_then(Value::as_str)
		.map(str::to_string)
		.ok_or(BuiltinError::InvalidArgument {
			function,
			expected: "a locale string",
		})
}

struct Localize {
	langs: ExtensionPoint<Value>,
}

impl Module for Localize {
	fn initialize(&mut self, ctx: &mut ModuleContext<'_>) -> ModuleResult<()> {
		let mut langs: Vec<(String, Value)> = self
			.langs
			.iter()
			.map(|(locale, lang)| (locale.to_string(), lang.clone()))
			.collect();
		if let Some(Value::Object(configured)) = ctx.option("langs") {
			langs.extend(configured.iter().map(|(locale, lang)| (locale.clone(), lang.clone())));
		}
		let localizer = Arc::new(Localizer::new(langs));

		match ctx.option("locale").cloned() {
			Some(Value::String(locale)) => {
				localizer.set_locale(&locale);
			}
			Some(Value::Bool(true)) => {
				localizer.set_locale(&system_locale());
			}
			_ => {}
		}
		ctx.publish(Arc::clone(&localizer));

		let setter = Arc::clone(&localizer);
		ctx.register_table_function("setLocale", move |ctx: &mut ModuleContext<'_>, args: &[Value]| {
			let locale = setter.set_locale(&string_arg(args, "setLocale")?);
			ctx.dispatch(LOCALIZED, &json!({"locale": locale, "lang": setter.lang()}));
			Ok(Value::Null)
		});
		let getter = Arc::clone(&localizer);
		ctx.register_table_function("getLocale", move |_ctx: &mut ModuleContext<'_>, _args: &[Value]| {
			Ok(Value::String(getter.locale()))
		});
		ctx.register_table_function("getLang", move |_ctx: &mut ModuleContext<'_>, args: &[Value]| {
			match args.first().and_then(Value::as_str) {
				Some(locale) => Ok(localizer.lang_for(locale).unwrap_or(Value::Null)),
				None => Ok(localizer.lang()),
			}
		});
		Ok(())
	}
}

/// Descriptor of the `localize` module.
pub fn descriptor() -> ModuleDescriptor {
	ModuleDescriptor::new(NAME, |points, ctx| {
		ctx.register_table_option("locale", false);
		ctx.register_table_option("langs", Value::Object(Default::default()));
		Localize {
			langs: points.get::<Value>("langs").cloned().unwrap_or_default(),
		}
	})
	.with_extension_point(
		"langs",
		ExtensionPoint::new().with(DEFAULT_LOCALE, default_lang()),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn localizer() -> Localizer {
		Localizer::new([
			("fr".to_string(), json!({"data": {"loading": "Chargement"}})),
			("de-DE".to_string(), json!({"data": {"loading": "Laden", "error": "Fehler"}})),
		])
	}

	#[rstest]
	#[case("de-de", "de-de")]
	#[case("DE-de", "de-de")]
	#[case("fr-ca", "fr")]
	#[case("es", "default")]
	fn test_resolve(localizer: Localizer, #[case] desired: &str, #[case] expected: &str) {
		assert_eq!(localizer.resolve(desired), expected);
	}

	#[rstest]
	fn test_missing_keys_fall_back_to_default(localizer: Localizer) {
		assert_eq!(localizer.set_locale("fr-be"), "fr");

		assert_eq!(localizer.text("data|loading").as_deref(), Some("Chargement"));
		assert_eq!(localizer.text("data|error").as_deref(), Some("Error"));
		assert_eq!(localizer.text("pagination|first").as_deref(), Some("First"));
	}

	#[rstest]
	fn test_starts_on_default(localizer: Localizer) {
		assert_eq!(localizer.locale(), "default");
		assert_eq!(localizer.locales(), vec!["fr", "de-de", "default"]);
	}

	#[rstest]
	fn test_same_locale_installs_merge() {
		let localizer = Localizer::new([
			("fr".to_string(), json!({"data": {"loading": "Chargement"}})),
			("fr".to_string(), json!({"data": {"error": "Erreur"}})),
		]);

		let lang = localizer.lang_for("fr").unwrap();

		assert_eq!(lang["data"]["loading"], "Chargement");
		assert_eq!(lang["data"]["error"], "Erreur");
	}

	#[rstest]
	fn test_string_arg() {
		assert_eq!(string_arg(&[json!("fr")], "setLocale").unwrap(), "fr");
		assert!(string_arg(&[json!(1)], "setLocale").is_err());
		assert!(string_arg(&[], "setLocale").is_err());
	}
}
