//! The attempt-local stack of boundaries enclosing the node currently being rendered.
//!
//! Thrown values are routed through it: pending signals to the innermost Suspense boundary,
//! errors to the innermost error boundary. The result is an [`Unwind`] that names its target by depth,
//! which is then propagated upwards by ordinary control flow until that boundary is reached.

use crate::{error::ComponentError, mounted::InstanceId, signal::PendingSignal};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
	Suspense,
	Error,
}

#[derive(Debug)]
pub(crate) struct Entry {
	pub instance: InstanceId,
	pub kind: BoundaryKind,
	/// Signals routed to this (Suspense) entry during the current attempt, in arrival order.
	pub collected: Vec<PendingSignal>,
}

#[derive(Debug, Default)]
pub(crate) struct BoundaryRegistry {
	entries: Vec<Entry>,
}

/// Why a render step did not produce output.
#[derive(Debug, Clone)]
pub(crate) enum Unwind {
	/// The Suspense boundary at `depth` collected a signal.
	Suspend { depth: usize },
	/// `error` is on its way to the error boundary at `depth`, or escapes the attempt if there is none.
	Fail { depth: Option<usize>, error: ComponentError },
}

impl Unwind {
	/// Lower is further out. An escaping failure is outermost.
	fn reach(&self) -> usize {
		match *self {
			Self::Suspend { depth } | Self::Fail { depth: Some(depth), .. } => depth + 1,
			Self::Fail { depth: None, .. } => 0,
		}
	}

	/// Combines the unwinds of two siblings. The outer target abandons the inner one's whole subtree, so it wins.
	pub fn merge(earlier: Option<Self>, later: Self) -> Self {
		match earlier {
			Some(earlier) if earlier.reach() <= later.reach() => earlier,
			_ => later,
		}
	}

	pub fn is_suspend(&self) -> bool {
		matches!(self, Self::Suspend { .. })
	}

	/// The error carried out of a registry that was empty to begin with.
	pub fn escaped(self) -> ComponentError {
		match self {
			Self::Fail { depth: None, error } => error,
			Self::Fail { depth: Some(depth), error } => {
				debug_assert!(false, "Unwind targeting depth {} escaped its registry", depth);
				error
			}
			Self::Suspend { depth } => {
				debug_assert!(false, "Suspension targeting depth {} escaped its registry", depth);
				ComponentError::MissingBoundary
			}
		}
	}
}

impl BoundaryRegistry {
	pub fn from_entries(entries: impl IntoIterator<Item = (InstanceId, BoundaryKind)>) -> Self {
		Self {
			entries: entries
				.into_iter()
				.map(|(instance, kind)| Entry {
					instance,
					kind,
					collected: Vec::new(),
				})
				.collect(),
		}
	}

	/// Returns the new entry's depth.
	pub fn push(&mut self, instance: InstanceId, kind: BoundaryKind) -> usize {
		self.entries.push(Entry {
			instance,
			kind,
			collected: Vec::new(),
		});
		self.entries.len() - 1
	}

	pub fn pop(&mut self, depth: usize) -> Entry {
		debug_assert_eq!(depth + 1, self.entries.len(), "Boundary registry pushes and pops are unbalanced");
		self.entries.truncate(depth + 1);
		match self.entries.pop() {
			Some(entry) => entry,
			None => unreachable!("popped an empty boundary registry"),
		}
	}

	fn nearest(&self, kind: BoundaryKind) -> Option<usize> {
		self.entries.iter().rposition(|entry| entry.kind == kind)
	}

	/// Registers `signal` with the innermost Suspense boundary, or returns it if there is none.
	pub fn route_signal(&mut self, signal: PendingSignal) -> Result<Unwind, PendingSignal> {
		let depth = match self.nearest(BoundaryKind::Suspense) {
			Some(depth) => depth,
			None => return Err(signal),
		};
		let entry = &mut self.entries[depth];
		if entry.collected.iter().any(|collected| collected.id() == signal.id()) {
			trace!("{:?} was already collected by {:?}.", signal.id(), entry.instance);
		} else {
			trace!("{:?} collected {:?}.", entry.instance, signal.id());
			entry.collected.push(signal);
		}
		Ok(Unwind::Suspend { depth })
	}

	pub fn route_error(&self, error: ComponentError) -> Unwind {
		let depth = self.nearest(BoundaryKind::Error);
		match depth {
			Some(depth) => trace!("Routing {:?} to {:?}.", error, self.entries[depth].instance),
			None => trace!("{:?} has no enclosing error boundary.", error),
		}
		Unwind::Fail { depth, error }
	}

	#[cfg(feature = "log-paths")]
	pub fn describe(&self) -> String {
		self.entries
			.iter()
			.map(|entry| format!("{:?}:{:?}", entry.kind, entry.instance))
			.collect::<Vec<_>>()
			.join(" > ")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{mounted::Instance, signal::pending};

	fn registry(kinds: &[BoundaryKind]) -> BoundaryRegistry {
		BoundaryRegistry::from_entries(kinds.iter().map(|&kind| (Instance::for_suspense().id(), kind)))
	}

	#[test]
	fn signals_go_to_the_innermost_suspense() {
		let mut registry = registry(&[BoundaryKind::Suspense, BoundaryKind::Suspense, BoundaryKind::Error]);
		let (signal, _settler) = pending();
		assert!(matches!(registry.route_signal(signal.clone()), Ok(Unwind::Suspend { depth: 1 })));
		assert!(matches!(registry.route_signal(signal), Ok(Unwind::Suspend { depth: 1 })));
		assert_eq!(registry.pop(2).collected.len(), 0);
		assert_eq!(registry.pop(1).collected.len(), 1);
	}

	#[test]
	fn signals_without_suspense_are_returned() {
		let mut registry = registry(&[BoundaryKind::Error]);
		let (signal, _settler) = pending();
		assert!(registry.route_signal(signal).is_err());
	}

	#[test]
	fn errors_go_to_the_innermost_error_boundary() {
		let registry = registry(&[BoundaryKind::Error, BoundaryKind::Suspense]);
		assert!(matches!(registry.route_error(ComponentError::new("x")), Unwind::Fail { depth: Some(0), .. }));
		assert!(matches!(
			BoundaryRegistry::default().route_error(ComponentError::new("x")),
			Unwind::Fail { depth: None, .. }
		));
	}

	#[test]
	fn outer_unwinds_win() {
		let inner = Unwind::Suspend { depth: 2 };
		let outer = Unwind::Fail {
			depth: Some(0),
			error: ComponentError::new("x"),
		};
		assert!(matches!(Unwind::merge(Some(inner.clone()), outer.clone()), Unwind::Fail { depth: Some(0), .. }));
		assert!(matches!(Unwind::merge(Some(outer), inner.clone()), Unwind::Fail { .. }));
		assert!(matches!(Unwind::merge(None, inner), Unwind::Suspend { depth: 2 }));

		let escaping = Unwind::Fail {
			depth: None,
			error: ComponentError::MissingBoundary,
		};
		assert!(matches!(Unwind::merge(Some(Unwind::Suspend { depth: 0 }), escaping), Unwind::Fail { depth: None, .. }));
	}
}
