use crate::output::Node;
use std::{borrow::Cow, rc::Rc};
use tracing::warn;
use wasm_bindgen::JsCast;
use web_sys::{Attr, Element, NamedNodeMap, NodeList, Text};

/// Reads existing DOM content back as output [`Node`]s. Nodes other than elements and text are skipped.
#[must_use]
pub fn load_child_nodes(child_nodes: &NodeList) -> Vec<Node> {
	(0..child_nodes.length())
		.filter_map(|i| child_nodes.item(i))
		.filter_map(|child| {
			if let Some(element) = child.dyn_ref::<Element>() {
				Some(load_element(element))
			} else if let Some(text) = child.dyn_ref::<Text>() {
				Some(Node::Text(text.data().into()))
			} else {
				warn!("Skipping unrecognised child node: {:?}", child);
				None
			}
		})
		.collect()
}

#[must_use]
pub fn load_element(element: &Element) -> Node {
	let node: &web_sys::Node = element.as_ref();
	Node::Element {
		name: element.local_name().into(),
		attributes: load_attributes(&element.attributes()),
		children: load_child_nodes(&node.child_nodes()),
	}
}

/// Sorted by name, like rendered attributes.
#[must_use]
pub fn load_attributes(attributes: &NamedNodeMap) -> Vec<(Cow<'static, str>, Rc<str>)> {
	let mut loaded: Vec<_> = (0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| load_attribute(&attribute)).collect();
	loaded.sort_by(|(a, _), (b, _)| a.cmp(b));
	loaded
}

fn load_attribute(attribute: &Attr) -> (Cow<'static, str>, Rc<str>) {
	(attribute.local_name().into(), attribute.value().into())
}
