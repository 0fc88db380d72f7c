//! The interface component authors implement.

use crate::{
	descriptor::{self, Descriptor, Props},
	error::ComponentError,
	signal::PendingSignal,
};
use core::{
	any::{type_name, Any, TypeId},
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;
use tracing::warn;

/// What a render function may throw instead of returning a [`Descriptor`].
#[derive(Debug, Clone)]
pub enum Thrown {
	/// Not ready yet. Caught by the nearest Suspense boundary.
	Suspend(PendingSignal),
	/// Failed. Caught by the nearest error boundary.
	Error(ComponentError),
}

impl From<ComponentError> for Thrown {
	fn from(error: ComponentError) -> Self {
		Self::Error(error)
	}
}

impl From<PendingSignal> for Thrown {
	fn from(signal: PendingSignal) -> Self {
		Self::Suspend(signal)
	}
}

pub type Render = Result<Descriptor, Thrown>;

/// A component kind. Its properties arrive through the [`RenderContext`], its per-instance state through [`State`].
///
/// Instances are matched across renders by position and concrete type.
pub trait Component: Any {
	fn name(&self) -> &'static str {
		type_name::<Self>()
	}

	/// Identifies the concrete component type, to match instances across renders.
	#[doc(hidden)]
	fn instance_type(&self) -> TypeId {
		TypeId::of::<Self>()
	}

	/// # Errors
	///
	/// See [`Thrown`].
	fn render(&self, cx: &mut RenderContext<'_>) -> Render;

	/// Opts instances of this component into error boundary routing.
	fn catches_errors(&self) -> bool {
		false
	}

	/// Called with a descendant's error before this (error boundary) instance is rendered again.
	///
	/// The original children are not committed. Record what the next [`Component::render`] should show in `state`.
	fn did_catch(&self, state: &mut State, error: &ComponentError) {
		let _ = state;
		warn!("{} was routed an error but does not handle it: {}", self.name(), error);
	}
}

/// Per-instance component state. Empty until first requested.
///
/// Error boundaries also find the last error they caught here, until it is cleared.
#[derive(Default)]
pub struct State {
	value: Option<Box<dyn Any>>,
	captured: Option<ComponentError>,
}

impl State {
	#[must_use]
	pub fn get<S: Any>(&self) -> Option<&S> {
		self.value.as_ref().and_then(|state| state.downcast_ref())
	}

	pub fn get_or_default<S: Any + Default>(&mut self) -> &mut S {
		if !matches!(&self.value, Some(state) if state.is::<S>()) {
			if self.value.is_some() {
				warn!("Replacing instance state with a `{}`.", type_name::<S>());
			}
			self.value = Some(Box::new(S::default()));
		}
		match self.value.as_mut().and_then(|state| state.downcast_mut()) {
			Some(state) => state,
			None => unreachable!("state was just set"),
		}
	}

	pub fn set<S: Any>(&mut self, state: S) {
		self.value = Some(Box::new(state))
	}

	/// Resets the instance state, including any captured error.
	pub fn clear(&mut self) {
		self.value = None;
		self.captured = None;
	}

	#[must_use]
	pub fn captured_error(&self) -> Option<&ComponentError> {
		self.captured.as_ref()
	}

	pub(crate) fn capture(&mut self, error: ComponentError) {
		self.captured = Some(error)
	}

	/// Forgets the captured error, so that the boundary may show its children again.
	pub fn clear_captured_error(&mut self) -> Option<ComponentError> {
		self.captured.take()
	}
}

impl Debug for State {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("State")
			.field("value", &self.value.is_some())
			.field("captured", &self.captured)
			.finish()
	}
}

/// Everything a render function sees of its instance.
pub struct RenderContext<'a> {
	props: &'a Props,
	children: &'a Rc<[Descriptor]>,
	state: &'a mut State,
}

impl<'a> RenderContext<'a> {
	pub(crate) fn new(props: &'a Props, children: &'a Rc<[Descriptor]>, state: &'a mut State) -> Self {
		Self { props, children, state }
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		self.props
	}

	/// The descriptor's children, as a fragment.
	#[must_use]
	pub fn children(&self) -> Descriptor {
		descriptor::fragment(self.children.iter().cloned())
	}

	#[must_use]
	pub fn children_rc(&self) -> &Rc<[Descriptor]> {
		self.children
	}

	pub fn state(&mut self) -> &mut State {
		self.state
	}

	/// The last error this instance caught as an error boundary, unless cleared since.
	#[must_use]
	pub fn captured_error(&self) -> Option<&ComponentError> {
		self.state.captured_error()
	}

	/// See [`State::clear_captured_error`].
	pub fn clear_captured_error(&mut self) -> Option<ComponentError> {
		self.state.clear_captured_error()
	}
}

impl Debug for RenderContext<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderContext")
			.field("props", self.props)
			.field("children", &self.children.len())
			.field("state", &*self.state)
			.finish()
	}
}
