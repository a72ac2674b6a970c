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

use std::collections::HashMap;
use std::sync::Mutex;

use ferrox_sdk::{OrderId, Symbol};

/// Transport-level connection identifier, assigned by the accept loop.
pub type ConnectionId = u64;

#[derive(Debug, Clone)]
struct RouteEntry {
	connection_id: ConnectionId,
	cl_ord_id: String,
	#[allow(dead_code)]
	symbol: Symbol,
	/// The owning connection went away; reports are dropped and counted
	orphaned: bool,
}

/// Where an execution report should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
	/// Deliver to this connection, echoing this ClOrdID
	Deliver {
		connection_id: ConnectionId,
		cl_ord_id: String,
	},
	/// The order's connection disconnected; drop and count
	Orphaned,
	/// No mapping for this order id
	Unknown,
}

/// Report-routing state owned by the gateway
///
/// Maps engine order ids to the originating connection and ClOrdID, plus
/// the reverse `(connection, ClOrdID)` index used by cancel requests.
/// Entries are removed when the order reaches a terminal state; orders
/// survive a disconnect, but their entries are marked orphaned so late
/// reports are dropped rather than misdelivered.
///
/// Both maps live under one mutex, held only for map operations.
#[derive(Debug, Default)]
pub struct RouteTable {
	inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	entries: HashMap<OrderId, RouteEntry>,
	reverse: HashMap<(ConnectionId, String), OrderId>,
}

impl RouteTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record routing for a newly admitted order.
	pub fn insert(
		&self,
		order_id: OrderId,
		connection_id: ConnectionId,
		cl_ord_id: impl Into<String>,
		symbol: impl Into<Symbol>,
	) {
		let cl_ord_id = cl_ord_id.into();
		let mut inner = self.inner.lock().unwrap();
		inner
			.reverse
			.insert((connection_id, cl_ord_id.clone()), order_id);
		inner.entries.insert(
			order_id,
			RouteEntry {
				connection_id,
				cl_ord_id,
				symbol: symbol.into(),
				orphaned: false,
			},
		);
	}

	/// Resolve a cancel request's OrigClOrdID to the engine order id.
	pub fn resolve(&self, connection_id: ConnectionId, cl_ord_id: &str) -> Option<OrderId> {
		self.inner
			.lock()
			.unwrap()
			.reverse
			.get(&(connection_id, cl_ord_id.to_string()))
			.copied()
	}

	/// Route a report for `order_id`; `terminal` removes the entry after
	/// routing.
	pub fn route(&self, order_id: OrderId, terminal: bool) -> RouteDecision {
		let mut inner = self.inner.lock().unwrap();
		let Some(entry) = inner.entries.get(&order_id).cloned() else {
			return RouteDecision::Unknown;
		};
		if terminal {
			inner.entries.remove(&order_id);
			inner
				.reverse
				.remove(&(entry.connection_id, entry.cl_ord_id.clone()));
		}
		if entry.orphaned {
			RouteDecision::Orphaned
		} else {
			RouteDecision::Deliver {
				connection_id: entry.connection_id,
				cl_ord_id: entry.cl_ord_id,
			}
		}
	}

	/// Drop an entry outright (admission to the engine failed after the
	/// route was recorded).
	pub fn remove(&self, order_id: OrderId) {
		let mut inner = self.inner.lock().unwrap();
		if let Some(entry) = inner.entries.remove(&order_id) {
			inner
				.reverse
				.remove(&(entry.connection_id, entry.cl_ord_id));
		}
	}

	/// Mark every entry of a disconnected connection as orphaned and drop
	/// its reverse index. The orders themselves keep resting.
	pub fn orphan_connection(&self, connection_id: ConnectionId) {
		let mut inner = self.inner.lock().unwrap();
		inner.reverse.retain(|(conn, _), _| *conn != connection_id);
		for entry in inner.entries.values_mut() {
			if entry.connection_id == connection_id {
				entry.orphaned = true;
			}
		}
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
