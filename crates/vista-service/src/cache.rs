use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use uuid::Uuid;
use vista_providers::vlm::VlmVerdict;

const SHARD_COUNT: usize = 16;

type Key = [u8; 32];

/// Verdict cache for Stage B: TTL + LRU, sharded so concurrent batches only
/// contend on their own shard's mutex. A hit fully replaces the VLM call for
/// that image.
pub struct VerdictCache {
	shards: Vec<Mutex<Shard>>,
	ttl: Duration,
	capacity_per_shard: usize,
}

#[derive(Default)]
struct Shard {
	entries: HashMap<Key, Entry>,
	order: VecDeque<Key>,
}

struct Entry {
	verdict: VlmVerdict,
	inserted_at: Instant,
}

impl VerdictCache {
	pub fn new(ttl_days: u32, max_entries: usize) -> Self {
		let shards = (0..SHARD_COUNT).map(|_| Mutex::new(Shard::default())).collect();
		Self {
			shards,
			ttl: Duration::from_secs(ttl_days as u64 * 24 * 60 * 60),
			capacity_per_shard: (max_entries / SHARD_COUNT).max(1),
		}
	}

	/// Cache key: SHA-256 over (normalized query, model id, image id, image
	/// content hash).
	pub fn key(normalized_query: &str, model_id: &str, image_id: Uuid, content_hash: u64) -> Key {
		let mut hasher = Sha256::new();
		hasher.update(normalized_query.as_bytes());
		hasher.update([0]);
		hasher.update(model_id.as_bytes());
		hasher.update([0]);
		hasher.update(image_id.as_bytes());
		hasher.update(content_hash.to_be_bytes());
		hasher.finalize().into()
	}

	pub fn get(&self, key: &Key) -> Option<VlmVerdict> {
		let mut shard = self.shards[shard_index(key)].lock();
		let hit = match shard.entries.get(key) {
			Some(entry) if entry.inserted_at.elapsed() < self.ttl =>
				Some(entry.verdict.clone()),
			Some(_) => None,
			None => return None,
		};
		match hit {
			Some(verdict) => {
				// Refresh recency.
				shard.order.retain(|k| k != key);
				shard.order.push_back(*key);
				Some(verdict)
			},
			None => {
				shard.entries.remove(key);
				shard.order.retain(|k| k != key);
				None
			},
		}
	}

	pub fn put(&self, key: Key, verdict: VlmVerdict) {
		let mut shard = self.shards[shard_index(&key)].lock();
		if shard.entries.insert(key, Entry { verdict, inserted_at: Instant::now() }).is_none() {
			shard.order.push_back(key);
		} else {
			shard.order.retain(|k| *k != key);
			shard.order.push_back(key);
		}
		while shard.entries.len() > self.capacity_per_shard {
			let Some(oldest) = shard.order.pop_front() else {
				break;
			};
			shard.entries.remove(&oldest);
		}
	}

	pub fn len(&self) -> usize {
		self.shards.iter().map(|shard| shard.lock().entries.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

fn shard_index(key: &Key) -> usize {
	key[0] as usize % SHARD_COUNT
}

#[cfg(test)]
mod tests {
	use super::*;
	use vista_providers::vlm::VlmEvidence;

	fn verdict(image_id: &str, confidence: f32) -> VlmVerdict {
		VlmVerdict {
			image_id: image_id.to_string(),
			matches: true,
			confidence,
			room: None,
			evidence: VlmEvidence::default(),
			notes: String::new(),
		}
	}

	#[test]
	fn round_trips_a_verdict() {
		let cache = VerdictCache::new(7, 1_000);
		let key = VerdictCache::key("kitchen", "gpt-4o-mini", Uuid::new_v4(), 42);
		assert!(cache.get(&key).is_none());
		cache.put(key, verdict("a", 0.9));
		let hit = cache.get(&key).expect("expected a hit");
		assert_eq!(hit.image_id, "a");
	}

	#[test]
	fn key_depends_on_every_component() {
		let image = Uuid::new_v4();
		let base = VerdictCache::key("q", "m", image, 1);
		assert_ne!(base, VerdictCache::key("q2", "m", image, 1));
		assert_ne!(base, VerdictCache::key("q", "m2", image, 1));
		assert_ne!(base, VerdictCache::key("q", "m", Uuid::new_v4(), 1));
		assert_ne!(base, VerdictCache::key("q", "m", image, 2));
	}

	#[test]
	fn zero_ttl_expires_immediately() {
		let cache = VerdictCache::new(0, 1_000);
		let key = VerdictCache::key("q", "m", Uuid::new_v4(), 1);
		cache.put(key, verdict("a", 0.5));
		assert!(cache.get(&key).is_none());
		assert!(cache.is_empty());
	}

	#[test]
	fn evicts_least_recently_used_beyond_capacity() {
		// One entry per shard; the second insert into a shard evicts.
		let cache = VerdictCache::new(7, SHARD_COUNT);
		let mut keys = Vec::new();
		for i in 0..64u64 {
			let key = VerdictCache::key("q", "m", Uuid::new_v4(), i);
			cache.put(key, verdict(&i.to_string(), 0.5));
			keys.push(key);
		}
		assert!(cache.len() <= SHARD_COUNT);
	}
}
