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

/// Gateway-level counters, updated from connection tasks and the report
/// routing path.
#[derive(Debug, Default)]
pub struct GatewayStats {
	pub total_connections: AtomicU64,
	pub current_connections: AtomicU64,
	pub connections_rejected: AtomicU64,
	pub messages_received: AtomicU64,
	pub messages_sent: AtomicU64,
	pub protocol_errors: AtomicU64,
	/// Reports addressed to a connection that no longer exists
	pub orphaned_reports: AtomicU64,
}

impl GatewayStats {
	pub fn new() -> Self {
		Self::default()
	}
}

impl fmt::Display for GatewayStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"connections={}/{} rejected={} rx={} tx={} protocol_errors={} orphaned_reports={}",
			self.current_connections.load(Ordering::Relaxed),
			self.total_connections.load(Ordering::Relaxed),
			self.connections_rejected.load(Ordering::Relaxed),
			self.messages_received.load(Ordering::Relaxed),
			self.messages_sent.load(Ordering::Relaxed),
			self.protocol_errors.load(Ordering::Relaxed),
			self.orphaned_reports.load(Ordering::Relaxed),
		)
	}
}
