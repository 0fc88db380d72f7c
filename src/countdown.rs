use core::{
	borrow::Borrow,
	fmt::{self, Debug, Formatter},
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, DrainFilter},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

/// A map of countdowns. Each value waits for its count to reach zero and is then drained as elapsed.
///
/// Draining is separate from counting down, so that several decrements can be applied before checking.
pub struct CountdownMap<K, C, V, S = DefaultHashBuilder>(HashMap<K, (C, V), S>)
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher;
impl<K, C, V, S> Default for CountdownMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, C, V, S> Debug for CountdownMap<K, C, V, S>
where
	K: Hash + Eq + Debug,
	C: CheckedAdd + CheckedSub + One + Zero + Debug,
	V: Debug,
	S: BuildHasher,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter()).finish()
	}
}
impl<K, C, V, S> CountdownMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	/// Starts a countdown at zero, replacing (and returning) any previous value for `k`.
	pub fn arm(&mut self, k: K, v: V) -> Option<V> {
		self.0.insert(k, (C::zero(), v)).map(|(_, v)| v)
	}

	pub fn increment<Q: ?Sized>(&mut self, k: &Q) -> Result<Option<&mut V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	pub fn decrement<Q: ?Sized>(&mut self, k: &Q) -> Result<Option<&mut V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_sub(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	pub fn get_mut<Q: ?Sized>(&mut self, k: &Q) -> Option<&mut V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		self.0.get_mut(k).map(|(_, v)| v)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}

	/// Drops every countdown for which `f` returns `false`, elapsed or not.
	pub fn retain(&mut self, mut f: impl FnMut(&K, &V) -> bool) {
		self.0.retain(|k, (_, v)| f(k, &*v))
	}

	pub fn drain_elapsed(&mut self) -> DrainElapsed<'_, K, C, V> {
		DrainElapsed(self.0.drain_filter(DrainElapsed::elapsed_filter))
	}
}

pub struct DrainElapsed<'a, K, C, V>(DrainFilter<'a, K, (C, V), fn(&K, &mut (C, V)) -> bool>);
impl<'a, K, C, V> DrainElapsed<'a, K, C, V>
where
	C: Zero,
{
	fn elapsed_filter(_: &K, (c, _): &mut (C, V)) -> bool {
		c.is_zero()
	}
}
impl<'a, K, C, V> Iterator for DrainElapsed<'a, K, C, V> {
	type Item = (K, V);

	fn next(&mut self) -> Option<Self::Item> {
		self.0.next().map(|(k, (_, v))| (k, v))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.0.size_hint()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSaturatedError;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn drains_only_elapsed() {
		let mut map = CountdownMap::<&str, u8, usize>::new();
		assert!(map.arm("a", 1).is_none());
		map.arm("b", 2);
		map.increment("a").unwrap();
		map.increment("a").unwrap();
		map.increment("b").unwrap();
		map.decrement("a").unwrap();
		map.decrement("b").unwrap();

		let drained: Vec<_> = map.drain_elapsed().collect();
		assert_eq!(drained, vec![("b", 2)]);
		assert_eq!(map.len(), 1);
		assert_eq!(map.decrement("b"), Ok(None));
	}

	#[test]
	fn saturation_is_an_error() {
		let mut map = CountdownMap::<(), u8, ()>::new();
		map.arm((), ());
		assert_eq!(map.decrement(&()), Err(CountSaturatedError));
		for _ in 0..u8::MAX {
			map.increment(&()).unwrap();
		}
		assert_eq!(map.increment(&()), Err(CountSaturatedError));
	}

	#[test]
	fn arming_again_restarts() {
		let mut map = CountdownMap::<u32, u32, &str>::new();
		map.arm(1, "old");
		map.increment(&1).unwrap();
		assert_eq!(map.arm(1, "new"), Some("old"));
		assert_eq!(map.drain_elapsed().collect::<Vec<_>>(), vec![(1, "new")]);
	}
}
