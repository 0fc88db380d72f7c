use super::load::load_child_nodes;
use crate::{
	options::Options,
	output::{Node, Surface},
};
use std::{borrow::Cow, rc::Rc};
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};
use wasm_bindgen::JsCast;

/// Attached to a specific [`web_sys::Element`], this [`Surface`] patches its [***childNodes***](https://developer.mozilla.org/en-US/docs/Web/API/Node/childNodes).
///
/// Note that this does not include the [***Element***](https://developer.mozilla.org/en-US/docs/Web/API/element)
/// it is attached to itself, and also does not include the [***Attr***](https://developer.mozilla.org/en-US/docs/Web/API/Attr)ibutes of that element.
///
/// Unexpected DOM content is logged and repaired where possible.
#[derive(Debug)]
pub struct DomSurface {
	element: web_sys::Element,
	depth_limit: usize,
}

impl DomSurface {
	#[must_use]
	#[instrument]
	pub fn new_for_element_child_nodes(element: web_sys::Element) -> Self {
		Self {
			element,
			depth_limit: Options::default().depth_limit,
		}
	}

	/// How deeply nested output may be patched. Deeper content is left as is.
	#[must_use]
	pub fn with_depth_limit(self, depth_limit: usize) -> Self {
		Self { depth_limit, ..self }
	}

	#[must_use]
	pub fn element(&self) -> &web_sys::Element {
		&self.element
	}

	/// If `next` is empty, the node at `i` (the next sibling) is guaranteed unused.
	#[allow(clippy::too_many_arguments)]
	#[instrument(skip(previous, next))]
	fn diff_splice_node_list(&self, document: &web_sys::Document, mut previous: &[Node], mut next: &[Node], parent_element: &web_sys::Element, dom_slice: &web_sys::NodeList, i: &mut u32, depth_limit: usize) {
		if depth_limit == 0 {
			return error!("Depth limit reached");
		}

		#[allow(clippy::never_loop)] // Inner `loop`.
		while !previous.is_empty() && !next.is_empty() {
			*i += 'item: loop {
				break 'item match (&previous[0], &next[0]) {
					(Node::Element { name: n_1, .. }, Node::Element { name: n_2, .. }) if n_1 == n_2 => {
						let span = trace_span!("Diffing element", tag = %n_1);
						let _enter = span.enter();
						let node = match dom_slice.get(*i) {
							Some(node) => node,
							None => {
								error!("Expected <{}> beyond end of `web_sys::NodeList`. Switching to insertions.", n_1);
								return self.diff_splice_node_list(document, &[], next, parent_element, dom_slice, i, depth_limit);
							}
						};

						let element = match node.dyn_ref::<web_sys::Element>() {
							Some(element) if element.local_name().eq_ignore_ascii_case(n_1) => element,
							_ => {
								error!("Expected to update <{}> but found {:?}; Recreating the node.", n_1, node);
								self.diff_splice_node_list(document, &previous[..1], &[], parent_element, dom_slice, i, depth_limit);
								self.diff_splice_node_list(document, &[], &next[..1], parent_element, dom_slice, i, depth_limit);
								break 'item 0;
							}
						};

						self.update_element(document, &previous[0], &next[0], element, depth_limit);
						1
					}

					(Node::Text(t_1), Node::Text(t_2)) => {
						let span = trace_span!("Diffing text node", t_1 = &**t_1, t_2 = &**t_2);
						let _enter = span.enter();
						let node = match dom_slice.get(*i) {
							Some(node) => node,
							None => {
								error!("Expected text beyond end of `web_sys::NodeList`. Switching to insertions.");
								return self.diff_splice_node_list(document, &[], next, parent_element, dom_slice, i, depth_limit);
							}
						};

						let text = match node.dyn_ref::<web_sys::Text>() {
							Some(text) => text,
							None => {
								error!("Expected to update `web_sys::Text` but found {:?}; Recreating the node.", node);
								self.diff_splice_node_list(document, &previous[..1], &[], parent_element, dom_slice, i, depth_limit);
								self.diff_splice_node_list(document, &[], &next[..1], parent_element, dom_slice, i, depth_limit);
								break 'item 0;
							}
						};

						if text.data() != **t_1 {
							error!("Unexpected text data: Expected {:?} but found {:?}. Overwriting.", t_1, text.data());
							text.set_data(t_2)
						} else if t_1 != t_2 {
							text.set_data(t_2)
						}
						1
					}

					// Mismatching nodes: Destroy and rebuild.
					(n_1, n_2) => {
						let span = trace_span!("Replace mismatching");
						let _enter = span.enter();

						if STATIC_MAX_LEVEL >= Level::WARN {
							if let (Node::Element { name: e_1, .. }, Node::Element { name: e_2, .. }) = (n_1, n_2) {
								if e_1.eq_ignore_ascii_case(e_2) {
									warn!("Recreating element due to different tag name casing: {:?} -> {:?}", e_1, e_2)
								}
							}
						}

						self.diff_splice_node_list(document, &previous[..1], &[], parent_element, dom_slice, i, depth_limit);
						self.diff_splice_node_list(document, &[], &next[..1], parent_element, dom_slice, i, depth_limit);
						0
					}
				};
			};

			previous = &previous[1..];
			next = &next[1..];
		}

		for removed in previous {
			let node = match dom_slice.get(*i) {
				Some(node) => node,
				None => {
					error!("Expected to remove {:?} beyond end of `web_sys::NodeList`. Skipping further deletions here.", removed);
					break;
				}
			};

			match removed {
				Node::Element { name, .. } => {
					let span = trace_span!("Removing element", tag = %name);
					let _enter = span.enter();
					match node.dyn_ref::<web_sys::Element>() {
						Some(element) if element.local_name().eq_ignore_ascii_case(name) => (),
						Some(element) => error!("Expected to remove <{}> but found <{}>; Removing anyway.", name, element.local_name()),
						None => error!("Expected to remove <{}> but found {:?}; Removing anyway.", name, node),
					}
				}

				Node::Text(text) => {
					let span = trace_span!("Removing text node", text = &**text);
					let _enter = span.enter();
					match node.dyn_ref::<web_sys::Text>() {
						Some(dom_text) => {
							if STATIC_MAX_LEVEL >= Level::ERROR && dom_text.data() != **text {
								error!("Unexpected removed text data: {:?}", dom_text.data())
							}
						}
						None => error!("Expected to remove `web_sys::Text` but found {:?}; Removing anyway.", node),
					}
				}
			}

			if let Err(error) = parent_element.remove_child(&node) {
				error!("Failed to remove the node: {:?}", error)
			}
		}

		let next_sibling = dom_slice.get(*i);
		let next_sibling = next_sibling.as_ref();
		for added in next {
			*i += match added {
				Node::Element { name, .. } => {
					let span = trace_span!("Creating element", %name);
					let _enter = span.enter();

					let dom_element = match document.create_element(name) {
						Ok(element) => element,
						Err(error) => {
							error!("Failed to create element: {:?}", error);
							continue;
						}
					};

					if let Err(error) = parent_element.insert_before(dom_element.as_ref(), next_sibling) {
						error!("Failed to insert element: {:?}", error);
						continue;
					}

					let blank = Node::Element {
						name: name.clone(),
						attributes: Vec::new(),
						children: Vec::new(),
					};
					self.update_element(document, &blank, added, &dom_element, depth_limit);
					1
				}

				Node::Text(text) => {
					let span = trace_span!("Creating text node", text = &**text);
					let _enter = span.enter();
					let dom_text = document.create_text_node(text);
					if let Err(error) = parent_element.insert_before(dom_text.as_ref(), next_sibling) {
						error!("Failed to insert text: {:?}", error);
						continue;
					}
					1
				}
			};
		}
	}

	fn update_element(&self, document: &web_sys::Document, previous: &Node, next: &Node, element: &web_sys::Element, depth_limit: usize) {
		let (n_1, mut a_1, c_1, n_2, mut a_2, c_2) = match (previous, next) {
			(
				Node::Element {
					name: n_1,
					attributes: a_1,
					children: c_1,
				},
				Node::Element {
					name: n_2,
					attributes: a_2,
					children: c_2,
				},
			) => (n_1, a_1.as_slice(), c_1, n_2, a_2.as_slice(), c_2),
			_ => unreachable!("`update_element` called on non-elements"),
		};
		debug_assert_eq!(n_1, n_2);

		#[instrument]
		fn remove_attribute(attributes: &web_sys::NamedNodeMap, (name, value): &(Cow<'static, str>, Rc<str>)) {
			match attributes.remove_named_item(name) {
				Err(error) => warn!("Could not remove attribute with name {:?}, value {:?}: {:?}", name, value, error),
				Ok(removed) => {
					if STATIC_MAX_LEVEL >= Level::WARN && removed.value() != **value {
						warn!("Unexpected value of removed attribute {:?}: Expected {:?} but found {:?}", name, value, removed.value());
					}
				}
			}
		}

		#[instrument]
		fn add_attribute(document: &web_sys::Document, attributes: &web_sys::NamedNodeMap, (name, value): &(Cow<'static, str>, Rc<str>)) {
			let attribute = match document.create_attribute(name) {
				Ok(attribute) => attribute,
				Err(error) => return error!("Could not create attribute {:?}: {:?}", name, error),
			};
			if !value.is_empty() {
				attribute.set_value(value)
			}
			match attributes.set_named_item(&attribute) {
				Ok(None) => (),
				Err(error) => error!("Could not add attribute {:?}={:?}: {:?}", name, value, error),
				Ok(Some(replaced)) => trace!("Replaced attribute {:?}, which was {:?}, with {:?}.", name, replaced.value(), value),
			}
		}

		while !a_1.is_empty() && a_1.first() == a_2.first() {
			a_1 = &a_1[1..];
			a_2 = &a_2[1..];
		}
		while !a_1.is_empty() && a_1.last() == a_2.last() {
			a_1 = &a_1[..a_1.len() - 1];
			a_2 = &a_2[..a_2.len() - 1];
		}
		if !a_1.is_empty() || !a_2.is_empty() {
			let attributes = element.attributes();
			for removed in a_1 {
				// Changed values are set below instead.
				if !a_2.iter().any(|(name, _)| *name == removed.0) {
					remove_attribute(&attributes, removed)
				}
			}

			for added in a_2 {
				add_attribute(document, &attributes, added)
			}
		}

		let node: &web_sys::Node = element.as_ref();
		self.diff_splice_node_list(document, c_1, c_2, element, &node.child_nodes(), &mut 0, depth_limit - 1);
	}
}

impl Surface for DomSurface {
	#[instrument(skip(previous, next))]
	fn commit(&mut self, previous: &[Node], next: &[Node]) {
		let node: &web_sys::Node = self.element.as_ref();
		let child_nodes = node.child_nodes();
		let owner_document = match node.owner_document() {
			Some(document) => document,
			None => return error!("No owner document found for root element."),
		};
		let mut i = 0;
		self.diff_splice_node_list(&owner_document, previous, next, &self.element, &child_nodes, &mut i, self.depth_limit);
		debug_assert_eq!(i as usize, next.len());
		info!("Patched {} top-level DOM node(s).", i);
	}

	fn current(&self) -> Vec<Node> {
		let node: &web_sys::Node = self.element.as_ref();
		load_child_nodes(&node.child_nodes())
	}
}
