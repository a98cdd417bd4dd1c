//! Initialization ordering for the modules bound to a table.

use crate::order::InitOrder;

/// Orders modules for initialization.
///
/// Core modules come first in the order given. Then come `Early` modules by
/// ascending value, then unordered modules in the order given, then `Late`
/// modules by ascending value. Equal values keep the order given, so the
/// result is deterministic for a given registration order.
///
/// # Examples
///
/// ```
/// use tabula_core::{InitOrder, resolve_init_order};
///
/// let order = resolve_init_order([
///     ("late", false, InitOrder::Late(1)),
///     ("plain", false, InitOrder::Default),
///     ("layout", true, InitOrder::Default),
///     ("early", false, InitOrder::Early(-1)),
/// ]);
/// assert_eq!(order, ["layout", "early", "plain", "late"]);
/// ```
pub fn resolve_init_order<'a, I>(modules: I) -> Vec<&'a str>
where
	I: IntoIterator<Item = (&'a str, bool, InitOrder)>,
{
	let mut core = Vec::new();
	let mut early = Vec::new();
	let mut unordered = Vec::new();
	let mut late = Vec::new();

	for (name, is_core, order) in modules {
		if is_core {
			core.push(name);
			continue;
		}
		match order {
			InitOrder::Early(value) => early.push((value, name)),
			InitOrder::Default => unordered.push(name),
			InitOrder::Late(value) => late.push((value, name)),
		}
	}

	early.sort_by_key(|(value, _)| *value);
	late.sort_by_key(|(value, _)| *value);

	core.into_iter()
		.chain(early.into_iter().map(|(_, name)| name))
		.chain(unordered)
		.chain(late.into_iter().map(|(_, name)| name))
		.collect()
}
