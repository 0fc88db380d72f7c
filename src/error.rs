//! Errors raised by components and by render calls.

use core::fmt::Display;
use std::rc::Rc;
use thiserror::Error;

/// Diagnostic carried by [`ComponentError::MissingBoundary`].
pub const MISSING_SUSPENSE: &str = "Missing Suspense";

/// A value thrown by a component's render code, or a pending value that settled to failure.
///
/// Cheap to clone, since the same failure may be observed by each component that waits on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComponentError {
	/// A component suspended without any enclosing Suspense boundary.
	#[error("{}", MISSING_SUSPENSE)]
	MissingBoundary,

	/// The walk exceeded [`Options::depth_limit`](`crate::Options::depth_limit`).
	#[error("Depth limit of {limit} reached")]
	DepthLimit { limit: usize },

	/// Anything else, identified by its message.
	#[error("{message}")]
	Failed { message: Rc<str> },
}

impl ComponentError {
	/// Creates a [`ComponentError::Failed`] from anything displayable.
	pub fn new(message: impl Display) -> Self {
		Self::Failed {
			message: message.to_string().into(),
		}
	}

	#[must_use]
	pub fn message(&self) -> String {
		self.to_string()
	}
}

/// Returned by [`Root`](`crate::Root`) calls that failed as a whole.
///
/// The previously committed output is left untouched in that case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
	/// A component error escaped every error boundary.
	#[error("Unrecoverable render error: {0}")]
	Unrecoverable(#[source] ComponentError),

	/// [`Root::rerender`](`crate::Root::rerender`) was called before anything was rendered.
	#[error("Nothing has been rendered into this root yet")]
	NotMounted,
}

impl RenderError {
	/// The component error that escaped, if any.
	#[must_use]
	pub fn component_error(&self) -> Option<&ComponentError> {
		match self {
			Self::Unrecoverable(error) => Some(error),
			Self::NotMounted => None,
		}
	}
}
