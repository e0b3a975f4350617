use lru::LruCache;
use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Anything the cache can charge against its byte budget.
pub trait ByteSized {
	fn byte_size(&self) -> usize;
}

/// A cache that evicts least-recently-used entries to stay under a total byte budget (e.g.
/// 4 GiB), rather than under a fixed entry count.
///
/// Internally backed by the `lru` crate's `LruCache` sized generously (entry count has no
/// natural bound here, since entries vary in size), with an explicit running byte total that is
/// the actual eviction trigger.
pub struct ByteLimitedCache<K, V> {
	cache: LruCache<K, V>,
	budget_bytes: usize,
	used_bytes: usize,
	hits: u64,
	misses: u64,
	evictions: u64,
}

impl<K, V> ByteLimitedCache<K, V>
where
	K: Clone + Debug + Eq + Hash,
	V: Clone + ByteSized,
{
	/// Creates a cache with the given byte budget. The backing `LruCache` capacity is set to
	/// `usize::MAX` (unbounded by count) since byte accounting is what actually governs
	/// eviction.
	#[must_use]
	pub fn with_budget(budget_bytes: usize) -> Self {
		Self {
			cache: LruCache::new(NonZeroUsize::new(usize::MAX).unwrap()),
			budget_bytes,
			used_bytes: 0,
			hits: 0,
			misses: 0,
			evictions: 0,
		}
	}

	/// Looks up `key`, promoting it to most-recently-used on a hit. Records hit/miss stats.
	pub fn get(&mut self, key: &K) -> Option<V> {
		match self.cache.get(key) {
			Some(v) => {
				self.hits += 1;
				Some(v.clone())
			}
			None => {
				self.misses += 1;
				None
			}
		}
	}

	/// Looks up `key` without affecting LRU order or stats — used by callers that just want to
	/// check presence (e.g. deciding whether a background preload is redundant).
	pub fn peek(&self, key: &K) -> Option<&V> {
		self.cache.peek(key)
	}

	pub fn contains(&self, key: &K) -> bool {
		self.cache.contains(key)
	}

	/// Inserts `value` under `key`, evicting least-recently-used entries until the cache is back
	/// under budget. A single oversized entry (bigger than the whole budget) is still accepted —
	/// it simply becomes the sole resident, evicting everything else — rather than being
	/// silently rejected, since refusing it would just cause the caller to recompute it every
	/// time (a worse outcome for a DEM whose byte size is simply large).
	pub fn insert(&mut self, key: K, value: V) {
		if let Some(old) = self.cache.put(key, value.clone()) {
			self.used_bytes = self.used_bytes.saturating_sub(old.byte_size());
		}
		self.used_bytes += value.byte_size();

		while self.used_bytes > self.budget_bytes {
			match self.cache.pop_lru() {
				Some((_, evicted)) => {
					self.used_bytes = self.used_bytes.saturating_sub(evicted.byte_size());
					self.evictions += 1;
				}
				None => break,
			}
		}
	}

	pub fn len(&self) -> usize {
		self.cache.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cache.is_empty()
	}

	pub fn used_bytes(&self) -> usize {
		self.used_bytes
	}

	pub fn budget_bytes(&self) -> usize {
		self.budget_bytes
	}

	pub fn clear(&mut self) {
		self.cache.clear();
		self.used_bytes = 0;
	}

	pub fn stats(&self) -> ByteCacheStats {
		ByteCacheStats {
			hits: self.hits,
			misses: self.misses,
			evictions: self.evictions,
			entries: self.cache.len(),
			used_bytes: self.used_bytes,
			budget_bytes: self.budget_bytes,
		}
	}
}

/// A snapshot of cache counters, exposed by the decompressed-array cache's `stats()` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteCacheStats {
	pub hits: u64,
	pub misses: u64,
	pub evictions: u64,
	pub entries: usize,
	pub used_bytes: usize,
	pub budget_bytes: usize,
}
