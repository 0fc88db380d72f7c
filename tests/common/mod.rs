#![allow(dead_code)]

use cambium::{element, text, Component, ComponentError, PendingSignal, Render, RenderContext, Settler, State};
use std::{cell::Cell, rc::Rc};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().try_init();
}

/// Renders a greeting once its signal resolved. A failed signal is raised as error.
pub struct CustomSuspense {
	pub name: &'static str,
	pub signal: PendingSignal,
	pub renders: Rc<Cell<usize>>,
}

impl CustomSuspense {
	pub fn new(name: &'static str) -> (Self, Settler) {
		let (signal, settler) = cambium::pending();
		(
			Self {
				name,
				signal,
				renders: Rc::default(),
			},
			settler,
		)
	}

	pub fn counted(name: &'static str, renders: &Rc<Cell<usize>>) -> (Self, Settler) {
		let (mut this, settler) = Self::new(name);
		this.renders = renders.clone();
		(this, settler)
	}
}

impl Component for CustomSuspense {
	fn render(&self, _: &mut RenderContext<'_>) -> Render {
		self.renders.set(self.renders.get() + 1);
		self.signal.check()?;
		Ok(element("div", vec![text(format!("Hello from CustomSuspense {}", self.name))]))
	}
}

/// Like [`CustomSuspense`], but only waits for settlement and never looks at how it went.
pub struct Oblivious(pub PendingSignal);

impl Component for Oblivious {
	fn render(&self, _: &mut RenderContext<'_>) -> Render {
		if !self.0.is_settled() {
			return Err(self.0.clone().into());
		}
		Ok(element("div", vec![text("Oblivious")]))
	}
}

/// Shows its children until it catches an error, then shows the error's message.
pub struct Catcher;

impl Component for Catcher {
	fn render(&self, cx: &mut RenderContext<'_>) -> Render {
		if let Some(message) = cx.state().get::<String>() {
			return Ok(element("div", vec![text(format!("Catcher did catch: {}", message))]));
		}
		Ok(cx.children())
	}

	fn catches_errors(&self) -> bool {
		true
	}

	fn did_catch(&self, state: &mut State, error: &ComponentError) {
		state.set(error.message())
	}
}

pub struct WrapperOne;

impl Component for WrapperOne {
	fn render(&self, cx: &mut RenderContext<'_>) -> Render {
		Ok(cx.children())
	}
}

pub struct Thrower(pub &'static str);

impl Component for Thrower {
	fn render(&self, _: &mut RenderContext<'_>) -> Render {
		Err(ComponentError::new(self.0).into())
	}
}

/// Counts up in its instance state on every render.
pub struct Counter;

impl Component for Counter {
	fn render(&self, cx: &mut RenderContext<'_>) -> Render {
		let count = cx.state().get_or_default::<usize>();
		*count += 1;
		Ok(text(format!("render #{}", count)))
	}
}

pub fn suspended() -> cambium::Descriptor {
	element("div", vec![text("Suspended...")])
}

/// An error boundary that shows what it caught until it is rendered with `reset`.
pub struct Resettable {
	pub reset: bool,
}

impl Component for Resettable {
	fn render(&self, cx: &mut RenderContext<'_>) -> Render {
		if self.reset {
			cx.clear_captured_error();
		}
		if let Some(error) = cx.captured_error() {
			return Ok(text(format!("Recovered from: {}", error)));
		}
		Ok(cx.children())
	}

	fn catches_errors(&self) -> bool {
		true
	}

	fn did_catch(&self, _: &mut State, _: &ComponentError) {}
}

/// Waits for `first`, then for `second`.
pub struct TwoStep {
	pub first: PendingSignal,
	pub second: PendingSignal,
}

impl Component for TwoStep {
	fn render(&self, _: &mut RenderContext<'_>) -> Render {
		self.first.check()?;
		self.second.check()?;
		Ok(element("div", vec![text("both")]))
	}
}
