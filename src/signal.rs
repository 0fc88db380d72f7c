//! Pending values that components raise while they are not ready to render.
//!
//! A [`PendingSignal`] is settled exactly once through its [`Settler`].
//! Settlement runs subscriber callbacks synchronously, which is how the
//! [`ResumeCoordinator`](`crate::coordinator::ResumeCoordinator`) observes it.

use crate::{component::Thrown, error::ComponentError};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	sync::atomic::{AtomicU64, Ordering},
};
use std::rc::Rc;
use tracing::{trace, warn};

static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies a [`PendingSignal`] for as long as any handle to it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u64);

/// The state of a [`PendingSignal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
	Pending,
	Resolved,
	Rejected(ComponentError),
}

impl Settlement {
	#[must_use]
	pub fn is_settled(&self) -> bool {
		!matches!(self, Self::Pending)
	}
}

type Subscriber = Box<dyn FnOnce(&Settlement)>;

struct Inner {
	id: SignalId,
	settlement: RefCell<Settlement>,
	subscribers: RefCell<Vec<Subscriber>>,
	observed: Cell<bool>,
}

/// A shared handle to a not-yet-settled (or settled) value.
///
/// Components raise it with [`PendingSignal::check`] or by returning [`Thrown::Suspend`].
#[derive(Clone)]
pub struct PendingSignal(Rc<Inner>);

/// The write end of a [`PendingSignal`]. Consumed by settling.
pub struct Settler(Rc<Inner>);

/// Creates a new pending signal and the handle that settles it.
#[must_use]
pub fn pending() -> (PendingSignal, Settler) {
	let inner = Rc::new(Inner {
		id: SignalId(NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed)),
		settlement: RefCell::new(Settlement::Pending),
		subscribers: RefCell::default(),
		observed: Cell::new(false),
	});
	(PendingSignal(inner.clone()), Settler(inner))
}

impl PendingSignal {
	#[must_use]
	pub fn id(&self) -> SignalId {
		self.0.id
	}

	#[must_use]
	pub fn settlement(&self) -> Settlement {
		self.0.settlement.borrow().clone()
	}

	#[must_use]
	pub fn is_settled(&self) -> bool {
		self.0.settlement.borrow().is_settled()
	}

	/// Suspends while pending, raises the failure once rejected and passes once resolved.
	///
	/// # Errors
	///
	/// [`Thrown::Suspend`] while pending, [`Thrown::Error`] once rejected.
	pub fn check(&self) -> Result<(), Thrown> {
		match self.settlement() {
			Settlement::Pending => Err(Thrown::Suspend(self.clone())),
			Settlement::Resolved => Ok(()),
			Settlement::Rejected(error) => {
				self.mark_observed();
				Err(Thrown::Error(error))
			}
		}
	}

	/// Whether a rejection of this signal was raised to the render walk since it settled.
	#[must_use]
	pub fn is_observed(&self) -> bool {
		self.0.observed.get()
	}

	pub(crate) fn mark_observed(&self) {
		self.0.observed.set(true)
	}

	/// Runs `callback` once this signal settles, or right away if it already has.
	pub fn subscribe(&self, callback: impl FnOnce(&Settlement) + 'static) {
		let settlement = self.settlement();
		if settlement.is_settled() {
			callback(&settlement)
		} else {
			self.0.subscribers.borrow_mut().push(Box::new(callback))
		}
	}
}

impl Debug for PendingSignal {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingSignal")
			.field("id", &self.0.id)
			.field("settlement", &*self.0.settlement.borrow())
			.finish()
	}
}

impl Settler {
	#[must_use]
	pub fn signal(&self) -> PendingSignal {
		PendingSignal(self.0.clone())
	}

	pub fn resolve(self) {
		self.settle(Settlement::Resolved)
	}

	pub fn reject(self, error: ComponentError) {
		self.settle(Settlement::Rejected(error))
	}

	fn settle(self, settlement: Settlement) {
		{
			let mut current = self.0.settlement.borrow_mut();
			if current.is_settled() {
				return warn!("Ignoring repeated settlement of {:?}.", self.0.id);
			}
			*current = settlement.clone();
		}

		// Subscribers may subscribe again while being notified.
		let subscribers = self.0.subscribers.take();
		trace!("Settled {:?} as {:?}, notifying {} subscriber(s).", self.0.id, settlement, subscribers.len());
		for subscriber in subscribers {
			subscriber(&settlement)
		}
	}
}

impl Debug for Settler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Settler").field(&self.0.id).finish()
	}
}

/// A [`PendingSignal`] that carries a value once resolved.
pub struct Deferred<T> {
	signal: PendingSignal,
	value: Rc<RefCell<Option<T>>>,
}

/// The write end of a [`Deferred`].
pub struct Resolver<T> {
	settler: Settler,
	value: Rc<RefCell<Option<T>>>,
}

#[must_use]
pub fn deferred<T>() -> (Deferred<T>, Resolver<T>) {
	let (signal, settler) = pending();
	let value = Rc::new(RefCell::new(None));
	(
		Deferred {
			signal,
			value: value.clone(),
		},
		Resolver { settler, value },
	)
}

impl<T> Deferred<T> {
	#[must_use]
	pub fn signal(&self) -> &PendingSignal {
		&self.signal
	}

	/// The resolved value.
	///
	/// # Errors
	///
	/// Like [`PendingSignal::check`].
	pub fn get(&self) -> Result<T, Thrown>
	where
		T: Clone,
	{
		self.signal.check()?;
		match &*self.value.borrow() {
			Some(value) => Ok(value.clone()),
			None => Err(Thrown::Error(ComponentError::new("Deferred value resolved without a value"))),
		}
	}
}

impl<T> Clone for Deferred<T> {
	fn clone(&self) -> Self {
		Self {
			signal: self.signal.clone(),
			value: self.value.clone(),
		}
	}
}

impl<T> Debug for Deferred<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Deferred").field(&self.signal).finish()
	}
}

impl<T> Resolver<T> {
	pub fn resolve(self, value: T) {
		*self.value.borrow_mut() = Some(value);
		self.settler.resolve()
	}

	pub fn reject(self, error: ComponentError) {
		self.settler.reject(error)
	}
}

impl<T> Debug for Resolver<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Resolver").field(&self.settler).finish()
	}
}
