//! Joins the settlement of each suspended boundary's pending set.
//!
//! A boundary is ready once every signal of the pending set it was armed with has settled.
//! Settlements only count down; readiness is checked when [`ResumeCoordinator::take_ready`] drains,
//! so any number of settlements in the same tick still yield a single resume.

use crate::{
	countdown::CountdownMap,
	mounted::InstanceId,
	signal::{PendingSignal, Settlement},
};
use core::cell::RefCell;
use hashbrown::HashSet;
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, warn};

#[derive(Debug)]
struct Wait {
	generation: u64,
	failed: usize,
}

/// A boundary whose pending set has fully settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
	pub boundary: InstanceId,
	/// Distinguishes successive pending sets of the same boundary.
	pub generation: u64,
	/// How many signals of the set settled to failure.
	pub failed: usize,
}

#[derive(Debug, Default)]
pub struct ResumeCoordinator {
	waits: CountdownMap<InstanceId, u32, Wait>,
}

pub type SharedCoordinator = Rc<RefCell<ResumeCoordinator>>;

impl ResumeCoordinator {
	#[must_use]
	pub fn new_shared() -> SharedCoordinator {
		Rc::new(RefCell::new(Self::default()))
	}

	/// Subscribes to every signal in `signals` once, on behalf of `boundary`'s pending set number `generation`.
	///
	/// Any earlier pending set of the same boundary is superseded; its settlements are ignored from now on.
	#[instrument(skip(this, signals), fields(signals = signals.len()))]
	pub fn await_set(this: &SharedCoordinator, boundary: InstanceId, generation: u64, signals: &[PendingSignal]) {
		{
			let mut coordinator = this.borrow_mut();
			if let Some(superseded) = coordinator.waits.arm(boundary, Wait { generation, failed: 0 }) {
				trace!("Superseded pending set {} of {:?}.", superseded.generation, boundary);
			}
			for _ in signals {
				if coordinator.waits.increment(&boundary).is_err() {
					error!("Too many pending signals for {:?}.", boundary);
				}
			}
		}

		// Already settled signals call back right away, so the count must be complete first.
		for signal in signals {
			let coordinator: Weak<RefCell<Self>> = Rc::downgrade(this);
			signal.subscribe(move |settlement| match coordinator.upgrade() {
				Some(coordinator) => coordinator.borrow_mut().settle(boundary, generation, settlement),
				None => trace!("Settlement for {:?} arrived after its root was dropped.", boundary),
			})
		}
	}

	fn settle(&mut self, boundary: InstanceId, generation: u64, settlement: &Settlement) {
		match self.waits.get_mut(&boundary) {
			Some(wait) if wait.generation == generation => {
				if let Settlement::Rejected(error) = settlement {
					trace!("A pending value of {:?} failed: {}", boundary, error);
					wait.failed += 1;
				}
			}
			Some(wait) => {
				return warn!(
					"Ignoring settlement for superseded pending set {} of {:?} (now waiting on set {}).",
					generation, boundary, wait.generation
				)
			}
			None => return warn!("Ignoring settlement for {:?}, which is not waiting.", boundary),
		}

		if self.waits.decrement(&boundary).is_err() {
			error!("More settlements than pending signals for {:?}.", boundary)
		}
	}

	/// Drains the boundaries whose pending sets have fully settled, in mount order.
	pub fn take_ready(&mut self) -> Vec<Ready> {
		if self.waits.is_empty() {
			return Vec::new();
		}

		let mut ready: Vec<_> = self
			.waits
			.drain_elapsed()
			.map(|(boundary, wait)| Ready {
				boundary,
				generation: wait.generation,
				failed: wait.failed,
			})
			.collect();
		ready.sort_by_key(|ready| ready.boundary);
		trace!(
			"{} boundary/ies ready, {} still waiting (cached capacity {}).",
			ready.len(),
			self.waits.len(),
			self.waits.capacity()
		);
		ready
	}

	/// Forgets the pending sets of boundaries that were unmounted or moved on to another set.
	pub fn retain_mounted(&mut self, mounted: &HashSet<(InstanceId, u64)>) {
		let before = self.waits.len();
		self.waits.retain(|&boundary, wait| mounted.contains(&(boundary, wait.generation)));
		let dropped = before - self.waits.len();
		if dropped > 0 {
			trace!("Dropped {} pending set(s) that are no longer mounted.", dropped);
		}
	}

	/// The number of boundaries with an outstanding pending set.
	#[must_use]
	pub fn waiting(&self) -> usize {
		self.waits.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{error::ComponentError, mounted::Instance, signal::pending};

	#[test]
	fn waits_for_the_whole_set() {
		let coordinator = ResumeCoordinator::new_shared();
		let boundary = Instance::for_suspense().id();
		let (first, first_settler) = pending();
		let (second, second_settler) = pending();
		ResumeCoordinator::await_set(&coordinator, boundary, 1, &[first, second]);

		second_settler.reject(ComponentError::new("no"));
		assert!(coordinator.borrow_mut().take_ready().is_empty());

		first_settler.resolve();
		assert_eq!(
			coordinator.borrow_mut().take_ready(),
			vec![Ready {
				boundary,
				generation: 1,
				failed: 1
			}]
		);
		assert_eq!(coordinator.borrow().waiting(), 0);
	}

	#[test]
	fn ignores_superseded_sets() {
		let coordinator = ResumeCoordinator::new_shared();
		let boundary = Instance::for_suspense().id();
		let (stale, stale_settler) = pending();
		let (fresh, fresh_settler) = pending();
		ResumeCoordinator::await_set(&coordinator, boundary, 1, &[stale]);
		ResumeCoordinator::await_set(&coordinator, boundary, 2, &[fresh]);

		stale_settler.resolve();
		assert!(coordinator.borrow_mut().take_ready().is_empty());

		fresh_settler.resolve();
		let ready = coordinator.borrow_mut().take_ready();
		assert_eq!(ready.len(), 1);
		assert_eq!(ready[0].generation, 2);
	}

	#[test]
	fn unmounted_sets_are_forgotten() {
		let coordinator = ResumeCoordinator::new_shared();
		let kept = Instance::for_suspense().id();
		let gone = Instance::for_suspense().id();
		let (first, _first_settler) = pending();
		let (second, second_settler) = pending();
		ResumeCoordinator::await_set(&coordinator, kept, 1, &[first]);
		ResumeCoordinator::await_set(&coordinator, gone, 1, &[second]);

		let mounted: HashSet<_> = vec![(kept, 1)].into_iter().collect();
		coordinator.borrow_mut().retain_mounted(&mounted);
		assert_eq!(coordinator.borrow().waiting(), 1);

		second_settler.resolve();
		assert!(coordinator.borrow_mut().take_ready().is_empty());
	}

	#[test]
	fn already_settled_signals_count_immediately() {
		let coordinator = ResumeCoordinator::new_shared();
		let boundary = Instance::for_suspense().id();
		let (signal, settler) = pending();
		settler.resolve();
		ResumeCoordinator::await_set(&coordinator, boundary, 1, &[signal]);
		assert_eq!(coordinator.borrow_mut().take_ready().len(), 1);
	}
}
