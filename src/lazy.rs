//! Components whose implementation arrives later.

use crate::{
	component::{Component, Render, RenderContext},
	descriptor::{Descriptor, Props},
	error::ComponentError,
	signal::{deferred, Deferred},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;
use tracing::{trace, warn};

/// What a [`Lazy`] loader eventually provides.
#[derive(Clone)]
pub struct Module {
	pub default: Rc<dyn Component>,
}

impl Debug for Module {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Module").field("default", &self.default.name()).finish()
	}
}

type Loader = Box<dyn FnOnce() -> Deferred<Module>>;

/// A component that starts loading its [`Module`] when first rendered and suspends until it is available.
///
/// The loader runs at most once per [`Lazy`]. Once loaded, the module's default component is rendered
/// with this component's properties and children.
pub struct Lazy {
	loader: RefCell<Option<Loader>>,
	loaded: RefCell<Option<Deferred<Module>>>,
}

#[must_use]
pub fn lazy(loader: impl FnOnce() -> Deferred<Module> + 'static) -> Rc<Lazy> {
	Rc::new(Lazy::new(loader))
}

impl Lazy {
	#[must_use]
	pub fn new(loader: impl FnOnce() -> Deferred<Module> + 'static) -> Self {
		Self {
			loader: RefCell::new(Some(Box::new(loader))),
			loaded: RefCell::default(),
		}
	}

	#[must_use]
	pub fn descriptor(self: &Rc<Self>, props: Props, children: impl IntoIterator<Item = Descriptor>) -> Descriptor {
		Descriptor::from_component(self.clone(), props, children.into_iter().collect::<Vec<_>>().into())
	}

	fn module(&self) -> Deferred<Module> {
		let mut loaded = self.loaded.borrow_mut();
		if let Some(module) = &*loaded {
			return module.clone();
		}

		let loader = self.loader.borrow_mut().take();
		// Stands in for the result until the loader returns, so a panicking loader leaves a failure behind.
		let (failed, resolver) = deferred();
		resolver.reject(ComponentError::new("`Lazy` loader did not return"));
		*loaded = Some(failed.clone());

		let module = match loader {
			Some(loader) => {
				trace!("Starting to load.");
				loader()
			}
			None => {
				warn!("Loader already consumed.");
				failed
			}
		};
		*loaded = Some(module.clone());
		module
	}
}

impl Component for Lazy {
	fn name(&self) -> &'static str {
		"Lazy"
	}

	fn render(&self, cx: &mut RenderContext<'_>) -> Render {
		let Module { default } = self.module().get()?;
		Ok(Descriptor::from_component(default, cx.props().clone(), cx.children_rc().clone()))
	}
}

impl Debug for Lazy {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lazy").field("loaded", &self.loaded.borrow()).finish()
	}
}
