/// Render settings for a [`Root`](`crate::Root`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
	/// How deeply descriptors may nest before rendering fails with [`ComponentError::DepthLimit`](`crate::ComponentError::DepthLimit`).
	///
	/// Components, fragments and Suspense boundaries count as levels, too.
	pub depth_limit: usize,
}

impl Options {
	pub const DEFAULT_DEPTH_LIMIT: usize = 256;

	#[must_use]
	pub fn with_depth_limit(self, depth_limit: usize) -> Self {
		Self { depth_limit, ..self }
	}
}

impl Default for Options {
	fn default() -> Self {
		Self {
			depth_limit: Self::DEFAULT_DEPTH_LIMIT,
		}
	}
}
