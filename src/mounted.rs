//! The committed instance tree.
//!
//! A [`Mounted`] tree is what a render attempt produces from a [`Descriptor`] tree.
//! Component state lives in shared [`Instance`]s, so an attempt can reuse the previous tree's instances
//! without consuming it: abandoning a work-in-progress subtree simply drops it, along with any instances
//! it created.

use crate::{
	component::{Component, State},
	descriptor::{Descriptor, Key, SuspenseOptions, Tag},
	error::ComponentError,
	output::Node,
	registry::{BoundaryKind, BoundaryRegistry},
	signal::{PendingSignal, Settlement},
};
use core::{
	any::TypeId,
	cell::{RefCell, RefMut},
	sync::atomic::{AtomicU64, Ordering},
};
use hashbrown::HashSet;
use std::{borrow::Cow, rc::Rc};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

/// Decides whether the walk pushes a registry entry for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
	Plain,
	SuspenseBoundary,
	ErrorBoundary,
}

#[derive(Debug)]
pub(crate) struct Instance {
	id: InstanceId,
	kind: InstanceKind,
	type_id: Option<TypeId>,
	state: RefCell<State>,
}

impl Instance {
	fn new(kind: InstanceKind, type_id: Option<TypeId>) -> Self {
		Self {
			id: InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)),
			kind,
			type_id,
			state: RefCell::default(),
		}
	}

	pub fn for_component(component: &dyn Component) -> Self {
		let kind = if component.catches_errors() {
			InstanceKind::ErrorBoundary
		} else {
			InstanceKind::Plain
		};
		Self::new(kind, Some(component.instance_type()))
	}

	pub fn for_suspense() -> Self {
		Self::new(InstanceKind::SuspenseBoundary, None)
	}

	pub fn id(&self) -> InstanceId {
		self.id
	}

	pub fn kind(&self) -> InstanceKind {
		self.kind
	}

	pub fn is_instance_of(&self, component: &dyn Component) -> bool {
		self.type_id == Some(component.instance_type())
	}

	pub fn state_mut(&self) -> RefMut<'_, State> {
		self.state.borrow_mut()
	}

	pub fn capture(&self, error: ComponentError) {
		self.state.borrow_mut().capture(error)
	}
}

/// Which of its two subtrees a Suspense boundary shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
	Primary,
	Fallback,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SuspenseState {
	pending: Vec<PendingSignal>,
	generation: u64,
	has_primary: bool,
	needs_arming: bool,
	/// A retry of the settled pending set has started.
	settled: bool,
}

impl SuspenseState {
	pub fn variant(&self) -> Variant {
		if self.pending.is_empty() && self.has_primary {
			Variant::Primary
		} else {
			Variant::Fallback
		}
	}

	/// Whether the current pending set is still unsettled.
	///
	/// A fully settled set no longer waits, whether or not its resume was drained yet.
	pub fn is_waiting(&self) -> bool {
		!self.pending.is_empty() && !self.settled && !self.pending.iter().all(PendingSignal::is_settled)
	}

	pub fn mark_settled(&mut self) {
		self.settled = true
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn pending(&self) -> &[PendingSignal] {
		&self.pending
	}

	#[must_use]
	pub fn committed_primary(mut self) -> Self {
		self.pending.clear();
		self.has_primary = true;
		self.needs_arming = false;
		self.settled = false;
		self
	}

	/// Replaces the pending set, superseding any earlier one.
	#[must_use]
	pub fn armed(mut self, pending: Vec<PendingSignal>) -> Self {
		debug_assert!(!pending.is_empty());
		self.pending = pending;
		self.generation += 1;
		self.needs_arming = true;
		self.settled = false;
		self
	}

	/// A rejection in the pending set that nothing raised again.
	pub fn unobserved_failure(&self) -> Option<ComponentError> {
		self.pending.iter().find_map(|signal| match signal.settlement() {
			Settlement::Rejected(error) if !signal.is_observed() => {
				signal.mark_observed();
				Some(error)
			}
			_ => None,
		})
	}
}

#[derive(Debug, Clone)]
pub(crate) struct ComponentNode {
	pub instance: Rc<Instance>,
	pub descriptor: Descriptor,
	pub rendered: Box<Mounted>,
}

impl ComponentNode {
	pub fn component(&self) -> Option<&Rc<dyn Component>> {
		match self.descriptor.tag() {
			Tag::Component(component) => Some(component),
			_ => None,
		}
	}
}

#[derive(Debug, Clone)]
pub(crate) struct SuspenseNode {
	pub instance: Rc<Instance>,
	pub descriptor: Descriptor,
	pub state: SuspenseState,
	/// The last committed primary subtree. Kept (detached) while the fallback shows.
	pub primary: Option<Box<Mounted>>,
	pub fallback: Option<Box<Mounted>>,
}

impl SuspenseNode {
	pub fn options(&self) -> Option<&Rc<SuspenseOptions>> {
		match self.descriptor.tag() {
			Tag::Suspense(options) => Some(options),
			_ => None,
		}
	}
}

#[derive(Debug, Clone)]
pub(crate) enum Mounted {
	Element {
		name: Cow<'static, str>,
		attributes: Vec<(Cow<'static, str>, Rc<str>)>,
		key: Option<Key>,
		children: Vec<Mounted>,
	},
	Text {
		text: Rc<str>,
		key: Option<Key>,
	},
	Fragment {
		key: Option<Key>,
		children: Vec<Mounted>,
	},
	Component(ComponentNode),
	Suspense(SuspenseNode),
}

/// Child slot of a Suspense node's primary subtree. The fallback is in slot 1.
const PRIMARY_SLOT: usize = 0;

impl Mounted {
	pub fn key(&self) -> Option<&Key> {
		match self {
			Self::Element { key, .. } | Self::Text { key, .. } | Self::Fragment { key, .. } => key.as_ref(),
			Self::Component(node) => node.descriptor.key(),
			Self::Suspense(node) => node.descriptor.key(),
		}
	}

	pub fn instance_id(&self) -> Option<InstanceId> {
		match self {
			Self::Component(node) => Some(node.instance.id()),
			Self::Suspense(node) => Some(node.instance.id()),
			Self::Element { .. } | Self::Text { .. } | Self::Fragment { .. } => None,
		}
	}

	pub fn descriptor(&self) -> Option<&Descriptor> {
		match self {
			Self::Component(node) => Some(&node.descriptor),
			Self::Suspense(node) => Some(&node.descriptor),
			Self::Element { .. } | Self::Text { .. } | Self::Fragment { .. } => None,
		}
	}

	/// Children by slot. Suspense nodes have their primary subtree in slot 0 and their fallback in slot 1.
	fn slots(&self) -> Vec<(usize, &Mounted)> {
		match self {
			Self::Element { children, .. } | Self::Fragment { children, .. } => children.iter().enumerate().collect(),
			Self::Text { .. } => Vec::new(),
			Self::Component(node) => vec![(0, &*node.rendered)],
			Self::Suspense(node) => node.primary.iter().map(|primary| (PRIMARY_SLOT, &**primary)).chain(node.fallback.iter().map(|fallback| (1, &**fallback))).collect(),
		}
	}

	fn slot_mut(&mut self, slot: usize) -> Option<&mut Mounted> {
		match self {
			Self::Element { children, .. } | Self::Fragment { children, .. } => children.get_mut(slot),
			Self::Text { .. } => None,
			Self::Component(node) => Some(&mut *node.rendered).filter(|_| slot == 0),
			Self::Suspense(node) => match slot {
				PRIMARY_SLOT => node.primary.as_deref_mut(),
				1 => node.fallback.as_deref_mut(),
				_ => None,
			},
		}
	}

	fn slot(&self, slot: usize) -> Option<&Mounted> {
		self.slots().into_iter().find(|&(index, _)| index == slot).map(|(_, child)| child)
	}

	pub fn at(&self, path: &[usize]) -> Option<&Mounted> {
		path.iter().try_fold(self, |node, &slot| node.slot(slot))
	}

	pub fn at_mut(&mut self, path: &[usize]) -> Option<&mut Mounted> {
		path.iter().try_fold(self, |node, &slot| node.slot_mut(slot))
	}

	/// Appends this subtree's visible output.
	pub fn output(&self, out: &mut Vec<Node>) {
		match self {
			Self::Element { name, attributes, children, .. } => {
				let mut content = Vec::with_capacity(children.len());
				for child in children {
					child.output(&mut content)
				}
				out.push(Node::Element {
					name: name.clone(),
					attributes: attributes.clone(),
					children: content,
				})
			}
			Self::Text { text, .. } => out.push(Node::Text(text.clone())),
			Self::Fragment { children, .. } => {
				for child in children {
					child.output(out)
				}
			}
			Self::Component(node) => node.rendered.output(out),
			Self::Suspense(node) => {
				let visible = match node.state.variant() {
					Variant::Primary => &node.primary,
					Variant::Fallback => &node.fallback,
				};
				if let Some(visible) = visible {
					visible.output(out)
				}
			}
		}
	}

	/// Collects Suspense boundaries that entered a new pending set since the last commit, and marks them armed.
	pub fn take_arming(&mut self, arming: &mut Vec<(InstanceId, u64, Vec<PendingSignal>)>) {
		if let Self::Suspense(node) = self {
			if node.state.needs_arming {
				node.state.needs_arming = false;
				arming.push((node.instance.id(), node.state.generation, node.state.pending.clone()));
			}
		}
		let slots: Vec<usize> = self.slots().into_iter().map(|(slot, _)| slot).collect();
		for slot in slots {
			if let Some(child) = self.slot_mut(slot) {
				child.take_arming(arming)
			}
		}
	}

	/// Collects every Suspense boundary in this subtree that holds a pending set, hidden ones included.
	pub fn pending_sets(&self, sets: &mut HashSet<(InstanceId, u64)>) {
		if let Self::Suspense(node) = self {
			if !node.state.pending.is_empty() {
				sets.insert((node.instance.id(), node.state.generation));
			}
		}
		for (_, child) in self.slots() {
			child.pending_sets(sets)
		}
	}

	pub fn pending_signal_count(&self) -> usize {
		let own = match self {
			Self::Suspense(node) => node.state.pending.len(),
			_ => 0,
		};
		own + self.slots().into_iter().map(|(_, child)| child.pending_signal_count()).sum::<usize>()
	}
}

/// Where an instance sits in a [`Mounted`] tree, and the boundaries that enclose it.
#[derive(Debug, Default)]
pub(crate) struct Location {
	pub path: Vec<usize>,
	/// Enclosing boundaries, outermost first, with the length of the path to each.
	entries: Vec<(InstanceId, BoundaryKind, usize)>,
}

impl Location {
	/// The registry in effect at this location.
	pub fn registry(&self) -> BoundaryRegistry {
		self.registry_prefix(self.entries.len())
	}

	/// The registry in effect at the boundary `depth` entries down.
	pub fn registry_prefix(&self, depth: usize) -> BoundaryRegistry {
		BoundaryRegistry::from_entries(self.entries[..depth].iter().map(|&(instance, kind, _)| (instance, kind)))
	}

	pub fn boundary_path(&self, depth: usize) -> Option<&[usize]> {
		self.entries.get(depth).map(|&(_, _, len)| &self.path[..len])
	}
}

pub(crate) fn locate(root: &Mounted, id: InstanceId) -> Option<Location> {
	let mut location = Location::default();
	if seek(root, id, &mut location) {
		Some(location)
	} else {
		None
	}
}

fn seek(node: &Mounted, id: InstanceId, location: &mut Location) -> bool {
	if node.instance_id() == Some(id) {
		return true;
	}

	for (slot, child) in node.slots() {
		// A fallback renders outside of its own boundary.
		let entry = match node {
			Mounted::Component(node) if node.instance.kind() == InstanceKind::ErrorBoundary => Some((node.instance.id(), BoundaryKind::Error)),
			Mounted::Suspense(node) if slot == PRIMARY_SLOT => Some((node.instance.id(), BoundaryKind::Suspense)),
			_ => None,
		};
		if let Some((instance, kind)) = entry {
			location.entries.push((instance, kind, location.path.len()));
		}
		location.path.push(slot);

		if seek(child, id, location) {
			return true;
		}

		location.path.pop();
		if entry.is_some() {
			location.entries.pop();
		}
	}
	false
}
