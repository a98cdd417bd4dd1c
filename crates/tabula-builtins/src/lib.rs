//! # Tabula Builtins
//!
//! The core modules every table gets: [`layout`] sizes columns,
//! [`localize`] manages language packs and [`comms`] lets tables message
//! each other. Each publishes a capability under its module name so other
//! modules can use it:
//!
//! | Module | Capability |
//! |--------|------------|
//! | `layout` | [`layout::Layout`] |
//! | `localize` | [`localize::Localizer`] |
//! | `comms` | [`comms::Comms`] |

pub mod comms;
mod error;
pub mod layout;
pub mod localize;

use std::sync::Arc;

use tabula_core::ModuleDescriptor;
use tabula_registry::TableRegistry;

pub use error::BuiltinError;

/// The core module set, in registration order.
pub fn core_modules(tables: Arc<TableRegistry>) -> Vec<ModuleDescriptor> {
	vec![layout::descriptor(), localize::descriptor(), comms::descriptor(tables)]
}
