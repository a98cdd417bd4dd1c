//! Initialization ordering hints.

/// When a non-core module is initialized relative to the others.
///
/// Core modules ignore this and always run first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InitOrder {
	/// Before every unordered module; lower values first.
	Early(i32),
	/// No preference; runs between the early and late groups in
	/// registration order.
	#[default]
	Default,
	/// After every unordered module; lower values first.
	Late(i32),
}

impl From<i32> for InitOrder {
	/// Signed-integer convention: negative is early, positive is late, zero
	/// is no preference.
	fn from(value: i32) -> Self {
		match value {
			v if v < 0 => Self::Early(v),
			0 => Self::Default,
			v => Self::Late(v),
		}
	}
}

impl From<Option<i32>> for InitOrder {
	fn from(value: Option<i32>) -> Self {
		value.map(Self::from).unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(-5, InitOrder::Early(-5))]
	#[case(0, InitOrder::Default)]
	#[case(3, InitOrder::Late(3))]
	fn test_from_signed_integer(#[case] value: i32, #[case] expected: InitOrder) {
		assert_eq!(InitOrder::from(value), expected);
	}

	#[rstest]
	fn test_absent_is_default() {
		assert_eq!(InitOrder::from(None), InitOrder::Default);
		assert_eq!(InitOrder::from(Some(-1)), InitOrder::Early(-1));
	}
}
