//! Committed output and the surfaces it is committed to.

use core::fmt::{self, Display, Formatter, Write as _};
use std::{borrow::Cow, rc::Rc};
use tracing::{instrument, trace, warn};

/// A flattened, visible output node. Components, fragments and Suspense boundaries dissolve into their content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
	Element {
		name: Cow<'static, str>,
		/// Sorted by name.
		attributes: Vec<(Cow<'static, str>, Rc<str>)>,
		children: Vec<Node>,
	},
	Text(Rc<str>),
}

impl Node {
	/// The number of surface nodes this node occupies, including descendants.
	#[must_use]
	pub fn dom_len(&self) -> usize {
		match self {
			Self::Element { children, .. } => 1 + children.iter().map(Self::dom_len).sum::<usize>(),
			Self::Text(_) => 1,
		}
	}
}

impl Display for Node {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Element { name, attributes, children } => {
				write!(f, "<{}", name)?;
				for (name, value) in attributes {
					write!(f, " {}=\"{}\"", name, Escaped(value, true))?;
				}
				f.write_char('>')?;
				for child in children {
					child.fmt(f)?;
				}
				write!(f, "</{}>", name)
			}
			Self::Text(text) => Escaped(text, false).fmt(f),
		}
	}
}

struct Escaped<'a>(&'a str, bool);
impl Display for Escaped<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let &Escaped(text, in_attribute) = self;
		for c in text.chars() {
			match c {
				'&' => f.write_str("&amp;")?,
				'<' => f.write_str("&lt;")?,
				'>' => f.write_str("&gt;")?,
				'"' if in_attribute => f.write_str("&quot;")?,
				c => f.write_char(c)?,
			}
		}
		Ok(())
	}
}

/// Where committed output goes.
///
/// Each commit hands over the previously committed node list along with the new one,
/// so that a surface may patch itself instead of rebuilding.
pub trait Surface {
	fn commit(&mut self, previous: &[Node], next: &[Node]);

	/// Output already present before the first commit, if the surface can tell.
	fn current(&self) -> Vec<Node> {
		Vec::new()
	}
}

/// An in-memory [`Surface`], for tests and server-side rendering.
#[derive(Debug, Default, Clone)]
pub struct Scratch {
	nodes: Vec<Node>,
	commits: usize,
}

impl Scratch {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// How many times output was committed to this surface.
	#[must_use]
	pub fn commits(&self) -> usize {
		self.commits
	}

	/// The committed output as HTML, with text and attribute values escaped.
	#[must_use]
	pub fn inner_html(&self) -> String {
		let mut html = String::new();
		for node in &self.nodes {
			// Writing into a `String` doesn't fail.
			let _ = write!(html, "{}", node);
		}
		html
	}
}

impl Surface for Scratch {
	#[instrument(skip(self, previous, next), fields(previous = previous.len(), next = next.len()))]
	fn commit(&mut self, previous: &[Node], next: &[Node]) {
		if previous != self.nodes.as_slice() {
			warn!("Scratch surface content was not what the previous commit left. Overwriting.");
		}
		self.nodes = next.to_vec();
		self.commits += 1;
		trace!("Commit #{}.", self.commits);
	}

	fn current(&self) -> Vec<Node> {
		self.nodes.clone()
	}
}
