use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Micro-tokens per whole token; refills are computed in these units so the
/// atomics never lose fractional progress.
const MICRO: u64 = 1_000_000;

/// Process-global token bucket protecting the VLM quota. Lock-free: token
/// balance and the refill watermark are atomic counters.
pub struct TokenBucket {
	capacity_micro: u64,
	refill_micro_per_sec: u64,
	available_micro: AtomicU64,
	last_refill_nanos: AtomicU64,
	origin: Instant,
}

impl TokenBucket {
	/// A bucket refilling at `per_minute` tokens, starting full with a burst
	/// capacity of one minute's worth.
	pub fn new(per_minute: u32) -> Self {
		let capacity_micro = per_minute.max(1) as u64 * MICRO;
		Self {
			capacity_micro,
			refill_micro_per_sec: capacity_micro / 60,
			available_micro: AtomicU64::new(capacity_micro),
			last_refill_nanos: AtomicU64::new(0),
			origin: Instant::now(),
		}
	}

	pub fn try_acquire(&self) -> bool {
		self.refill();
		self.available_micro
			.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
				if current >= MICRO { Some(current - MICRO) } else { None }
			})
			.is_ok()
	}

	/// Wait until a token is available.
	pub async fn acquire(&self) {
		loop {
			if self.try_acquire() {
				return;
			}
			tokio::time::sleep(Duration::from_millis(50)).await;
		}
	}

	fn refill(&self) {
		let now = self.origin.elapsed().as_nanos() as u64;
		let last = self.last_refill_nanos.load(Ordering::Acquire);
		if now <= last {
			return;
		}
		let added =
			(now - last) as u128 * self.refill_micro_per_sec as u128 / 1_000_000_000u128;
		if added == 0 {
			return;
		}
		if self
			.last_refill_nanos
			.compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
		{
			let _ = self.available_micro.fetch_update(
				Ordering::AcqRel,
				Ordering::Acquire,
				|current| Some((current + added as u64).min(self.capacity_micro)),
			);
		}
	}
}
