//! Immutable descriptions of UI nodes, the input of every render attempt.

use crate::component::Component;
use core::{
	any::Any,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::{borrow::Cow, rc::Rc};

pub type Key = Cow<'static, str>;

/// A property mapping. Cloning is cheap; [`Props::with`] copies on write.
#[derive(Clone, Default)]
pub struct Props(Rc<HashMap<Cow<'static, str>, Rc<dyn Any>>>);

impl Props {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Any) -> Self {
		Rc::make_mut(&mut self.0).insert(name.into(), Rc::new(value));
		self
	}

	#[must_use]
	pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
		self.0.get(name).and_then(|value| value.downcast_ref())
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// The string-valued properties, sorted by name. These become an element's attributes.
	#[must_use]
	pub fn attributes(&self) -> Vec<(Cow<'static, str>, Rc<str>)> {
		let mut attributes: Vec<_> = self
			.0
			.iter()
			.filter_map(|(name, value)| {
				let value: Rc<str> = if let Some(value) = value.downcast_ref::<Rc<str>>() {
					value.clone()
				} else if let Some(value) = value.downcast_ref::<&'static str>() {
					(*value).into()
				} else if let Some(value) = value.downcast_ref::<String>() {
					value.as_str().into()
				} else {
					return None;
				};
				Some((name.clone(), value))
			})
			.collect();
		attributes.sort_by(|(a, _), (b, _)| a.cmp(b));
		attributes
	}
}

impl Debug for Props {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let mut names: Vec<_> = self.0.keys().collect();
		names.sort();
		f.debug_set().entries(names).finish()
	}
}

/// The two alternative subtrees of a Suspense boundary.
#[derive(Debug, Clone)]
pub struct SuspenseOptions {
	pub primary: Descriptor,
	pub fallback: Descriptor,
}

#[derive(Clone)]
pub enum Tag {
	Element(Cow<'static, str>),
	Text(Rc<str>),
	Fragment,
	Component(Rc<dyn Component>),
	Suspense(Rc<SuspenseOptions>),
}

impl Debug for Tag {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Element(name) => f.debug_tuple("Element").field(name).finish(),
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Fragment => f.write_str("Fragment"),
			Self::Component(component) => f.debug_tuple("Component").field(&component.name()).finish(),
			Self::Suspense(_) => f.write_str("Suspense"),
		}
	}
}

/// One UI node and its children.
///
/// Descriptors have no identity beyond their position among their siblings and their optional [`Key`].
#[derive(Debug, Clone)]
pub struct Descriptor {
	tag: Tag,
	props: Props,
	children: Rc<[Descriptor]>,
	key: Option<Key>,
}

impl Descriptor {
	#[must_use]
	pub fn new(tag: Tag, props: Props, children: Rc<[Descriptor]>) -> Self {
		Self {
			tag,
			props,
			children,
			key: None,
		}
	}

	/// Describes `component` with explicit `props`, e.g. to forward a wrapper's properties.
	#[must_use]
	pub fn from_component(component: Rc<dyn Component>, props: Props, children: Rc<[Descriptor]>) -> Self {
		Self::new(Tag::Component(component), props, children)
	}

	#[must_use]
	pub fn with_key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn with_prop(mut self, name: impl Into<Cow<'static, str>>, value: impl Any) -> Self {
		self.props = self.props.with(name, value);
		self
	}

	#[must_use]
	pub fn with_attribute(self, name: impl Into<Cow<'static, str>>, value: impl Into<Rc<str>>) -> Self {
		self.with_prop(name, value.into())
	}

	#[must_use]
	pub fn tag(&self) -> &Tag {
		&self.tag
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		&self.props
	}

	#[must_use]
	pub fn children(&self) -> &[Descriptor] {
		&self.children
	}

	#[must_use]
	pub fn children_rc(&self) -> &Rc<[Descriptor]> {
		&self.children
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		self.key.as_ref()
	}
}

impl From<&'static str> for Descriptor {
	fn from(text: &'static str) -> Self {
		self::text(text)
	}
}

impl From<String> for Descriptor {
	fn from(text: String) -> Self {
		self::text(text)
	}
}

fn empty() -> Rc<[Descriptor]> {
	Rc::new([])
}

fn collect(children: impl IntoIterator<Item = Descriptor>) -> Rc<[Descriptor]> {
	children.into_iter().collect::<Vec<_>>().into()
}

#[must_use]
pub fn element(name: impl Into<Cow<'static, str>>, children: impl IntoIterator<Item = Descriptor>) -> Descriptor {
	Descriptor::new(Tag::Element(name.into()), Props::new(), collect(children))
}

#[must_use]
pub fn text(text: impl Into<Rc<str>>) -> Descriptor {
	Descriptor::new(Tag::Text(text.into()), Props::new(), empty())
}

#[must_use]
pub fn fragment(children: impl IntoIterator<Item = Descriptor>) -> Descriptor {
	Descriptor::new(Tag::Fragment, Props::new(), collect(children))
}

#[must_use]
pub fn component(component: impl Component, children: impl IntoIterator<Item = Descriptor>) -> Descriptor {
	Descriptor::from_component(Rc::new(component), Props::new(), collect(children))
}

/// A Suspense boundary showing `fallback` while anything in `primary` waits on a pending value.
#[must_use]
pub fn suspense(primary: Descriptor, fallback: Descriptor) -> Descriptor {
	Descriptor::new(Tag::Suspense(Rc::new(SuspenseOptions { primary, fallback })), Props::new(), empty())
}
