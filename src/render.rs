//! One synchronous render attempt: a depth-first walk from [`Descriptor`]s to a [`Mounted`] tree.
//!
//! Every step returns `Result<Mounted, Unwind>`. Boundaries push themselves onto the attempt's
//! [`BoundaryRegistry`] before rendering their children and pop themselves on the way back out,
//! whether the children succeeded or not. A boundary that finds itself targeted by an [`Unwind`]
//! recovers in place: Suspense boundaries render their fallback, error boundaries run their handler
//! and render again. Anything else keeps propagating.

use crate::{
	component::{Component, RenderContext, Thrown},
	descriptor::{Descriptor, SuspenseOptions, Tag},
	error::ComponentError,
	mounted::{ComponentNode, Instance, InstanceKind, Mounted, SuspenseNode, SuspenseState},
	options::Options,
	registry::{BoundaryKind, BoundaryRegistry, Unwind},
	signal::{PendingSignal, Settlement},
};
use core::ops::AddAssign;
use std::rc::Rc;
use tracing::{error, trace, trace_span, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Stats {
	pub components: usize,
	pub suspended: usize,
	pub caught: usize,
	pub fallbacks: usize,
}

impl AddAssign for Stats {
	fn add_assign(&mut self, other: Self) {
		self.components += other.components;
		self.suspended += other.suspended;
		self.caught += other.caught;
		self.fallbacks += other.fallbacks;
	}
}

#[derive(Debug)]
pub(crate) struct Attempt<'a> {
	registry: BoundaryRegistry,
	options: &'a Options,
	depth: usize,
	stats: Stats,
}

impl<'a> Attempt<'a> {
	/// `depth` is how deep in the tree the attempt starts.
	pub fn new(options: &'a Options, registry: BoundaryRegistry, depth: usize) -> Self {
		Self {
			registry,
			options,
			depth,
			stats: Stats::default(),
		}
	}

	pub fn stats(&self) -> Stats {
		self.stats
	}

	pub fn render(&mut self, descriptor: &Descriptor, prev: Option<&Mounted>) -> Result<Mounted, Unwind> {
		if self.depth >= self.options.depth_limit {
			error!("Depth limit reached");
			return Err(self.registry.route_error(ComponentError::DepthLimit { limit: self.options.depth_limit }));
		}

		self.depth += 1;
		let result = self.render_unchecked(descriptor, prev);
		self.depth -= 1;
		result
	}

	fn render_unchecked(&mut self, descriptor: &Descriptor, prev: Option<&Mounted>) -> Result<Mounted, Unwind> {
		let key = descriptor.key().cloned();
		match descriptor.tag() {
			Tag::Text(text) => Ok(Mounted::Text { text: text.clone(), key }),

			Tag::Element(name) => {
				let span = trace_span!("Rendering element", %name);
				let _enter = span.enter();
				let prev_children: &[Mounted] = match prev {
					Some(Mounted::Element { name: prev_name, children, .. }) if prev_name == name => children.as_slice(),
					_ => &[],
				};
				let children = self.render_children(descriptor.children(), prev_children)?;
				Ok(Mounted::Element {
					name: name.clone(),
					attributes: descriptor.props().attributes(),
					key,
					children,
				})
			}

			Tag::Fragment => {
				let prev_children: &[Mounted] = match prev {
					Some(Mounted::Fragment { children, .. }) => children.as_slice(),
					_ => &[],
				};
				let children = self.render_children(descriptor.children(), prev_children)?;
				Ok(Mounted::Fragment { key, children })
			}

			Tag::Component(component) => {
				let prev = match prev {
					Some(Mounted::Component(prev)) => Some(prev),
					_ => None,
				};
				self.render_component(descriptor, component, prev)
			}

			Tag::Suspense(options) => {
				let prev = match prev {
					Some(Mounted::Suspense(prev)) => Some(prev),
					_ => None,
				};
				self.render_suspense(descriptor, options, prev)
			}
		}
	}

	/// Renders siblings in order.
	///
	/// A suspended sibling does not stop its later siblings from rendering, so that every signal in reach
	/// of the same Suspense boundary is collected in one pass. Failures stop the walk right away.
	fn render_children(&mut self, descriptors: &[Descriptor], prev: &[Mounted]) -> Result<Vec<Mounted>, Unwind> {
		let mut children = Vec::with_capacity(descriptors.len());
		let mut unwound: Option<Unwind> = None;
		for (i, descriptor) in descriptors.iter().enumerate() {
			let prev_child = match descriptor.key() {
				Some(key) => prev.iter().find(|prev| prev.key() == Some(key)),
				None => prev.get(i).filter(|prev| prev.key().is_none()),
			};

			match self.render(descriptor, prev_child) {
				Ok(child) => children.push(child),
				Err(unwind) => {
					let unwind = Unwind::merge(unwound.take(), unwind);
					if !unwind.is_suspend() {
						return Err(unwind);
					}
					unwound = Some(unwind)
				}
			}
		}

		match unwound {
			Some(unwind) => Err(unwind),
			None => Ok(children),
		}
	}

	fn render_component(&mut self, descriptor: &Descriptor, component: &Rc<dyn Component>, prev: Option<&ComponentNode>) -> Result<Mounted, Unwind> {
		let span = trace_span!("Rendering component", name = component.name());
		let _enter = span.enter();

		let (instance, prev_rendered) = match prev {
			Some(prev) if prev.instance.is_instance_of(&**component) => (prev.instance.clone(), Some(&*prev.rendered)),
			_ => {
				trace!("Mounting new instance.");
				(Rc::new(Instance::for_component(&**component)), None)
			}
		};

		let own_depth = match instance.kind() {
			InstanceKind::ErrorBoundary => Some(self.registry.push(instance.id(), BoundaryKind::Error)),
			InstanceKind::Plain | InstanceKind::SuspenseBoundary => None,
		};
		let result = self.render_body(descriptor, component, &instance, prev_rendered);
		if let Some(depth) = own_depth {
			self.registry.pop(depth);
		}

		let rendered = match result {
			Ok(rendered) => rendered,
			Err(Unwind::Fail { depth: Some(depth), error }) if Some(depth) == own_depth => self.recover(descriptor, component, &instance, prev_rendered, error)?,
			Err(unwind) => return Err(unwind),
		};
		Ok(Mounted::Component(ComponentNode {
			instance,
			descriptor: descriptor.clone(),
			rendered: Box::new(rendered),
		}))
	}

	/// Lets an error boundary record `error`, then renders it once more, this time outside of its own reach.
	fn recover(&mut self, descriptor: &Descriptor, component: &Rc<dyn Component>, instance: &Rc<Instance>, prev_rendered: Option<&Mounted>, error: ComponentError) -> Result<Mounted, Unwind> {
		trace!("{} caught: {}", component.name(), error);
		self.stats.caught += 1;
		component.did_catch(&mut instance.state_mut(), &error);
		instance.capture(error);
		self.render_body(descriptor, component, instance, prev_rendered)
	}

	/// [`Attempt::recover`] for an error boundary that is already mounted, when `error` reached it from a later attempt.
	pub fn recover_node(&mut self, node: &ComponentNode, error: ComponentError) -> Result<Mounted, Unwind> {
		let component = match node.component() {
			Some(component) => component,
			None => unreachable!("component node without component descriptor"),
		};
		let rendered = self.recover(&node.descriptor, component, &node.instance, Some(&node.rendered), error)?;
		Ok(Mounted::Component(ComponentNode {
			instance: node.instance.clone(),
			descriptor: node.descriptor.clone(),
			rendered: Box::new(rendered),
		}))
	}

	fn render_body(&mut self, descriptor: &Descriptor, component: &Rc<dyn Component>, instance: &Rc<Instance>, prev_rendered: Option<&Mounted>) -> Result<Mounted, Unwind> {
		self.stats.components += 1;
		let rendered = {
			let mut state = instance.state_mut();
			let mut cx = RenderContext::new(descriptor.props(), descriptor.children_rc(), &mut state);
			component.render(&mut cx)
		};

		match rendered {
			Ok(rendered) => self.render(&rendered, prev_rendered),
			Err(Thrown::Suspend(signal)) => Err(self.route_signal(signal)),
			Err(Thrown::Error(error)) => Err(self.registry.route_error(error)),
		}
	}

	fn route_signal(&mut self, signal: PendingSignal) -> Unwind {
		if let Settlement::Rejected(error) = signal.settlement() {
			trace!("{:?} was thrown after it failed. Raising its error instead.", signal.id());
			signal.mark_observed();
			return self.registry.route_error(error);
		}

		#[cfg(feature = "log-paths")]
		trace!("Routing {:?} through {}", signal.id(), self.registry.describe());

		match self.registry.route_signal(signal) {
			Ok(unwind) => {
				self.stats.suspended += 1;
				unwind
			}
			Err(signal) => {
				warn!("{:?} was thrown without an enclosing Suspense boundary.", signal.id());
				self.registry.route_error(ComponentError::MissingBoundary)
			}
		}
	}

	fn render_suspense(&mut self, descriptor: &Descriptor, options: &SuspenseOptions, prev: Option<&SuspenseNode>) -> Result<Mounted, Unwind> {
		let span = trace_span!("Rendering Suspense boundary");
		let _enter = span.enter();

		let (instance, state, prev_primary, prev_fallback) = match prev {
			Some(prev) => (prev.instance.clone(), prev.state.clone(), prev.primary.as_deref(), prev.fallback.as_deref()),
			None => (Rc::new(Instance::for_suspense()), SuspenseState::default(), None, None),
		};

		if state.is_waiting() {
			trace!("Waiting on {} pending value(s); keeping the fallback.", state.pending().len());
			let fallback = self.render(&options.fallback, prev_fallback)?;
			return Ok(Mounted::Suspense(SuspenseNode {
				instance,
				descriptor: descriptor.clone(),
				state,
				primary: prev_primary.cloned().map(Box::new),
				fallback: Some(Box::new(fallback)),
			}));
		}

		self.attempt_primary(instance, descriptor, options, state, prev_primary, prev_fallback)
	}

	fn attempt_primary(
		&mut self,
		instance: Rc<Instance>,
		descriptor: &Descriptor,
		options: &SuspenseOptions,
		state: SuspenseState,
		prev_primary: Option<&Mounted>,
		prev_fallback: Option<&Mounted>,
	) -> Result<Mounted, Unwind> {
		let depth = self.registry.push(instance.id(), BoundaryKind::Suspense);
		let result = self.render(&options.primary, prev_primary);
		let entry = self.registry.pop(depth);

		match result {
			Ok(primary) => {
				if let Some(error) = state.unobserved_failure() {
					trace!("Nothing raised a failed pending value again. Raising it at the boundary.");
					return Err(self.registry.route_error(error));
				}
				Ok(Mounted::Suspense(SuspenseNode {
					instance,
					descriptor: descriptor.clone(),
					state: state.committed_primary(),
					primary: Some(Box::new(primary)),
					fallback: None,
				}))
			}

			Err(Unwind::Suspend { depth: target }) if target == depth => {
				trace!("Suspended on {} pending value(s).", entry.collected.len());
				let state = state.armed(entry.collected);
				self.stats.fallbacks += 1;
				// Outside of this boundary's own reach.
				let fallback = self.render(&options.fallback, prev_fallback)?;
				Ok(Mounted::Suspense(SuspenseNode {
					instance,
					descriptor: descriptor.clone(),
					state,
					primary: prev_primary.cloned().map(Box::new),
					fallback: Some(Box::new(fallback)),
				}))
			}

			Err(unwind) => Err(unwind),
		}
	}

	/// Attempts a settled boundary's primary subtree again.
	///
	/// Expects the registry to hold exactly the boundaries enclosing `node`.
	pub fn resume(&mut self, node: &SuspenseNode) -> Result<Mounted, Unwind> {
		let span = trace_span!("Resuming Suspense boundary", instance = ?node.instance.id());
		let _enter = span.enter();

		let options = match node.options() {
			Some(options) => options,
			None => unreachable!("Suspense node without Suspense descriptor"),
		};
		self.attempt_primary(node.instance.clone(), &node.descriptor, options, node.state.clone(), node.primary.as_deref(), node.fallback.as_deref())
	}

	/// Renders a mounted component or Suspense node again from its own descriptor.
	pub fn rerender_node(&mut self, node: &Mounted) -> Result<Mounted, Unwind> {
		match node.descriptor() {
			Some(descriptor) => self.render(descriptor, Some(node)),
			None => unreachable!("only component and Suspense nodes are re-rendered on their own"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		component::Render,
		descriptor::{component, element, suspense, text},
		mounted::{locate, Variant},
		signal::pending,
	};

	struct Waits(PendingSignal);
	impl Component for Waits {
		fn render(&self, _: &mut RenderContext<'_>) -> Render {
			self.0.check()?;
			Ok(text("done"))
		}
	}

	#[test]
	fn fallback_is_rendered_in_the_same_attempt() {
		let (signal, _settler) = pending();
		let options = Options::default();
		let mut attempt = Attempt::new(&options, BoundaryRegistry::default(), 0);
		let tree = attempt
			.render(&element("main", vec![suspense(component(Waits(signal), None), text("waiting"))]), None)
			.unwrap();
		assert_eq!(attempt.stats().fallbacks, 1);
		assert_eq!(attempt.stats().suspended, 1);

		let boundary = match tree.at(&[0]) {
			Some(Mounted::Suspense(node)) => node,
			other => panic!("expected a Suspense node, found {:?}", other),
		};
		assert_eq!(boundary.state.variant(), Variant::Fallback);
		assert_eq!(boundary.state.pending().len(), 1);
		assert!(boundary.primary.is_none());

		let location = locate(&tree, boundary.instance.id()).unwrap();
		assert_eq!(location.path, vec![0]);
		assert_eq!(tree.pending_signal_count(), 1);
	}

	#[test]
	fn suspended_siblings_are_all_visited() {
		let (first, _first_settler) = pending();
		let (second, _second_settler) = pending();
		let options = Options::default();
		let mut attempt = Attempt::new(&options, BoundaryRegistry::default(), 0);
		let tree = attempt
			.render(
				&suspense(
					element("div", vec![component(Waits(first), None), text("between"), component(Waits(second), None)]),
					text("waiting"),
				),
				None,
			)
			.unwrap();
		assert_eq!(attempt.stats().components, 2);

		let mut arming = Vec::new();
		let mut tree = tree;
		tree.take_arming(&mut arming);
		assert_eq!(arming.len(), 1);
		assert_eq!(arming[0].2.len(), 2);

		arming.clear();
		tree.take_arming(&mut arming);
		assert!(arming.is_empty());
	}
}
