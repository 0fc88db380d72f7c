use crate::{
	coordinator::{Ready, ResumeCoordinator, SharedCoordinator},
	descriptor::Descriptor,
	error::RenderError,
	mounted::{locate, Location, Mounted},
	options::Options,
	output::{Node, Surface},
	registry::{BoundaryRegistry, Unwind},
	render::{Attempt, Stats},
};
use hashbrown::HashSet;
use tracing::{error, info, instrument, trace};

/// Owns a rendered tree and the [`Surface`] it is committed to.
///
/// [`Root::render`] renders a whole descriptor tree. Suspense boundaries that showed their fallback are then
/// awaited in the background, and [`Root::rerender`] retries those whose pending values have all settled.
#[derive(Debug)]
pub struct Root<S: Surface> {
	surface: S,
	options: Options,
	tree: Option<Mounted>,
	output: Vec<Node>,
	coordinator: SharedCoordinator,
}

impl<S: Surface> Root<S> {
	#[must_use]
	pub fn new(surface: S) -> Self {
		Self::with_options(surface, Options::default())
	}

	#[must_use]
	pub fn with_options(surface: S, options: Options) -> Self {
		let output = surface.current();
		Self {
			surface,
			options,
			tree: None,
			output,
			coordinator: ResumeCoordinator::new_shared(),
		}
	}

	/// Renders `descriptor` in full, reusing instances of the previous tree where they match, and commits the result.
	///
	/// # Errors
	///
	/// Iff an error escapes all error boundaries, in which case nothing is committed.
	#[instrument(skip(self, descriptor))]
	pub fn render(&mut self, descriptor: &Descriptor) -> Result<(), RenderError> {
		let mut attempt = Attempt::new(&self.options, BoundaryRegistry::default(), 0);
		match attempt.render(descriptor, self.tree.as_ref()) {
			Ok(tree) => {
				let stats = attempt.stats();
				self.commit(tree, stats);
				Ok(())
			}
			Err(unwind) => {
				let error = unwind.escaped();
				error!("Render failed: {}", error);
				Err(RenderError::Unrecoverable(error))
			}
		}
	}

	/// Retries each Suspense boundary whose pending set has settled since the last call, then commits once.
	///
	/// Returns how many boundaries were retried.
	///
	/// # Errors
	///
	/// [`RenderError::NotMounted`] before the first successful [`Root::render`].
	///
	/// [`RenderError::Unrecoverable`] with the first error that escaped all error boundaries during a retry.
	/// The other ready boundaries are still retried, and those that completed are committed.
	#[instrument(skip(self))]
	pub fn rerender(&mut self) -> Result<usize, RenderError> {
		let mut tree = self.tree.take().ok_or(RenderError::NotMounted)?;

		let ready = self.coordinator.borrow_mut().take_ready();
		let mut stats = Stats::default();
		let mut resumed = 0;
		let mut failure = None;
		for ready in ready {
			match resume(&mut tree, ready, &self.options) {
				Ok(Some(attempt)) => {
					stats += attempt;
					resumed += 1;
				}
				Ok(None) => (),
				Err(error) => {
					error!("Resume failed: {}", error);
					failure.get_or_insert(error);
				}
			}
		}

		if resumed > 0 {
			self.commit(tree, stats);
		} else {
			self.tree = Some(tree);
		}
		failure.map_or(Ok(resumed), Err)
	}

	fn commit(&mut self, mut tree: Mounted, stats: Stats) {
		let mut next = Vec::new();
		tree.output(&mut next);
		self.surface.commit(&self.output, &next);
		self.output = next;

		let mut arming = Vec::new();
		tree.take_arming(&mut arming);
		for (boundary, generation, signals) in &arming {
			ResumeCoordinator::await_set(&self.coordinator, *boundary, *generation, signals);
		}
		let mut mounted = HashSet::new();
		tree.pending_sets(&mut mounted);
		self.coordinator.borrow_mut().retain_mounted(&mounted);

		info!(
			components = stats.components,
			suspended = stats.suspended,
			caught = stats.caught,
			fallbacks = stats.fallbacks,
			armed = arming.len(),
			"Committed {} top-level node(s).",
			self.output.len()
		);
		self.tree = Some(tree);
	}

	#[must_use]
	pub fn surface(&self) -> &S {
		&self.surface
	}

	pub fn surface_mut(&mut self) -> &mut S {
		&mut self.surface
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.options
	}

	/// How many Suspense boundaries are waiting for their pending values to settle.
	#[must_use]
	pub fn pending_boundaries(&self) -> usize {
		self.coordinator.borrow().waiting()
	}

	/// How many pending values the committed Suspense boundaries hold in total.
	#[must_use]
	pub fn pending_signal_count(&self) -> usize {
		self.tree.as_ref().map_or(0, Mounted::pending_signal_count)
	}
}

/// Retries one ready boundary in place. Returns `None` if it is gone or has moved on to another pending set.
fn resume(tree: &mut Mounted, ready: Ready, options: &Options) -> Result<Option<Stats>, RenderError> {
	let location = match locate(tree, ready.boundary) {
		Some(location) => location,
		None => {
			trace!("{:?} is no longer mounted.", ready.boundary);
			return Ok(None);
		}
	};

	match tree.at_mut(&location.path) {
		Some(Mounted::Suspense(node)) if node.state.generation() == ready.generation && !node.state.pending().is_empty() => node.state.mark_settled(),
		_ => {
			trace!("{:?} is no longer waiting on pending set {}.", ready.boundary, ready.generation);
			return Ok(None);
		}
	}
	if ready.failed > 0 {
		trace!("{} pending value(s) of {:?} failed.", ready.failed, ready.boundary);
	}

	let mut stats = Stats::default();
	let mut target = location.path.clone();
	let mut result = {
		let mut attempt = Attempt::new(options, location.registry(), location.path.len() + 1);
		let result = match tree.at(&location.path) {
			Some(Mounted::Suspense(node)) => attempt.resume(node),
			_ => unreachable!("located Suspense node vanished"),
		};
		stats += attempt.stats();
		result
	};

	loop {
		match result {
			Ok(mounted) => {
				match tree.at_mut(&target) {
					Some(slot) => *slot = mounted,
					None => unreachable!("escalation target vanished"),
				}
				return Ok(Some(stats));
			}

			Err(Unwind::Fail { depth: None, error }) => return Err(RenderError::Unrecoverable(error)),

			Err(unwind) => {
				let depth = match unwind {
					Unwind::Suspend { depth } | Unwind::Fail { depth: Some(depth), .. } => depth,
					Unwind::Fail { depth: None, .. } => unreachable!(),
				};
				let path = escalation_path(&location, depth)?;
				trace!("Escalating to the boundary at {:?}.", path);

				let node = tree.at(path).ok_or(RenderError::NotMounted)?;
				result = match (unwind, node) {
					(Unwind::Fail { error, .. }, Mounted::Component(node)) => {
						let mut attempt = Attempt::new(options, location.registry_prefix(depth), path.len() + 1);
						let result = attempt.recover_node(node, error);
						stats += attempt.stats();
						result
					}
					(_, node) => {
						let mut attempt = Attempt::new(options, location.registry_prefix(depth), path.len());
						let result = attempt.rerender_node(node);
						stats += attempt.stats();
						result
					}
				};
				target = path.to_vec();
			}
		}
	}
}

fn escalation_path(location: &Location, depth: usize) -> Result<&[usize], RenderError> {
	match location.boundary_path(depth) {
		Some(path) => Ok(path),
		None => {
			debug_assert!(false, "Unwind targeted a boundary outside of its location");
			Err(RenderError::NotMounted)
		}
	}
}
