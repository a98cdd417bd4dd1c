//! # Tabula Options
//!
//! Table-level and column-level option registries.
//!
//! Every module declares the configuration keys it understands together with
//! a default value. Registration is first-writer-wins, and the effective value
//! of a key is the caller's configured value when present, else the
//! registered default.
//!
//! ```rust
//! use serde_json::json;
//! use tabula_options::TableOptions;
//!
//! let mut options = TableOptions::from_json(r#"{"layout": "fitColumns"}"#).unwrap();
//! options.register("layout", json!("fitData"));
//! options.register("height", json!(false));
//!
//! assert_eq!(options.get("layout"), Some(&json!("fitColumns")));
//! assert_eq!(options.get("height"), Some(&json!(false)));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod list;
pub mod table;

pub use error::{OptionError, OptionResult};
pub use list::{GeneratedOptions, OptionScope, OptionsList};
pub use table::TableOptions;

/// Column definitions are plain JSON objects.
pub type ColumnDefinition = serde_json::Map<String, serde_json::Value>;
