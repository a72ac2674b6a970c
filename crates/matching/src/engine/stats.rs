// Copyright 2025 The Ferrox Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

/// Lock-free engine counters
///
/// Updated from the matching thread, read from anywhere. Min/max use
/// compare-and-swap retry loops; everything else is a plain atomic add.
/// Throughput and averages are derived at read time.
#[derive(Debug)]
pub struct EngineStatistics {
	orders_processed: AtomicU64,
	trades_executed: AtomicU64,
	orders_rejected: AtomicU64,
	/// Cumulative traded quantity
	total_volume: AtomicU64,
	/// Cumulative traded value in integer cents
	total_value_cents: AtomicU64,
	min_processing_ns: AtomicU64,
	max_processing_ns: AtomicU64,
	total_processing_ns: AtomicU64,
	started_at: Mutex<Instant>,
}

impl Default for EngineStatistics {
	fn default() -> Self {
		Self {
			orders_processed: AtomicU64::new(0),
			trades_executed: AtomicU64::new(0),
			orders_rejected: AtomicU64::new(0),
			total_volume: AtomicU64::new(0),
			total_value_cents: AtomicU64::new(0),
			min_processing_ns: AtomicU64::new(u64::MAX),
			max_processing_ns: AtomicU64::new(0),
			total_processing_ns: AtomicU64::new(0),
			started_at: Mutex::new(Instant::now()),
		}
	}
}

impl EngineStatistics {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record one processed command and its wall time.
	pub fn record_command(&self, processing_ns: u64) {
		self.orders_processed.fetch_add(1, Ordering::Relaxed);
		self.total_processing_ns
			.fetch_add(processing_ns, Ordering::Relaxed);
		update_min(&self.min_processing_ns, processing_ns);
		update_max(&self.max_processing_ns, processing_ns);
	}

	pub fn record_trade(&self, quantity: u64, value_cents: u64) {
		self.trades_executed.fetch_add(1, Ordering::Relaxed);
		self.total_volume.fetch_add(quantity, Ordering::Relaxed);
		self.total_value_cents
			.fetch_add(value_cents, Ordering::Relaxed);
	}

	pub fn record_reject(&self) {
		self.orders_rejected.fetch_add(1, Ordering::Relaxed);
	}

	pub fn snapshot(&self) -> StatsSnapshot {
		let orders_processed = self.orders_processed.load(Ordering::Relaxed);
		let total_ns = self.total_processing_ns.load(Ordering::Relaxed);
		let min_ns = self.min_processing_ns.load(Ordering::Relaxed);
		let elapsed = self.started_at.lock().unwrap().elapsed();

		StatsSnapshot {
			orders_processed,
			trades_executed: self.trades_executed.load(Ordering::Relaxed),
			orders_rejected: self.orders_rejected.load(Ordering::Relaxed),
			total_volume: self.total_volume.load(Ordering::Relaxed),
			total_value_cents: self.total_value_cents.load(Ordering::Relaxed),
			min_processing_ns: if min_ns == u64::MAX { 0 } else { min_ns },
			max_processing_ns: self.max_processing_ns.load(Ordering::Relaxed),
			avg_processing_us: if orders_processed == 0 {
				0.0
			} else {
				total_ns as f64 / orders_processed as f64 / 1_000.0
			},
			throughput_per_sec: if elapsed.as_secs_f64() > 0.0 {
				orders_processed as f64 / elapsed.as_secs_f64()
			} else {
				0.0
			},
		}
	}

	pub fn reset(&self) {
		self.orders_processed.store(0, Ordering::Relaxed);
		self.trades_executed.store(0, Ordering::Relaxed);
		self.orders_rejected.store(0, Ordering::Relaxed);
		self.total_volume.store(0, Ordering::Relaxed);
		self.total_value_cents.store(0, Ordering::Relaxed);
		self.min_processing_ns.store(u64::MAX, Ordering::Relaxed);
		self.max_processing_ns.store(0, Ordering::Relaxed);
		self.total_processing_ns.store(0, Ordering::Relaxed);
		*self.started_at.lock().unwrap() = Instant::now();
	}
}

fn update_min(slot: &AtomicU64, value: u64) {
	let mut current = slot.load(Ordering::Relaxed);
	while value < current {
		match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
			Ok(_) => break,
			Err(observed) => current = observed,
		}
	}
}

fn update_max(slot: &AtomicU64, value: u64) {
	let mut current = slot.load(Ordering::Relaxed);
	while value > current {
		match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
			Ok(_) => break,
			Err(observed) => current = observed,
		}
	}
}

/// Point-in-time view of the engine counters
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
	pub orders_processed: u64,
	pub trades_executed: u64,
	pub orders_rejected: u64,
	pub total_volume: u64,
	pub total_value_cents: u64,
	pub min_processing_ns: u64,
	pub max_processing_ns: u64,
	pub avg_processing_us: f64,
	pub throughput_per_sec: f64,
}

impl fmt::Display for StatsSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"orders={} trades={} rejects={} volume={} value_cents={} avg_us={:.2} max_ns={} throughput={:.0}/s",
			self.orders_processed,
			self.trades_executed,
			self.orders_rejected,
			self.total_volume,
			self.total_value_cents,
			self.avg_processing_us,
			self.max_processing_ns,
			self.throughput_per_sec,
		)
	}
}
