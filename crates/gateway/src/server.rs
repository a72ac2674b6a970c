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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use ferrox_matching::{ExecutionReport, MatchingEngine};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::connection;
use crate::routing::{ConnectionId, RouteDecision, RouteTable};
use crate::stats::GatewayStats;

/// Per-connection handle kept by the accept loop; the engine's execution
/// callback pushes reports through `report_tx` into the connection task.
pub(crate) struct ConnectionHandle {
	pub(crate) report_tx: mpsc::Sender<(String, ExecutionReport)>,
}

/// State shared between the accept loop, connection tasks and the engine
/// callback.
pub(crate) struct GatewayShared {
	pub(crate) config: GatewayConfig,
	pub(crate) engine: Arc<MatchingEngine>,
	pub(crate) routes: RouteTable,
	pub(crate) connections: DashMap<ConnectionId, ConnectionHandle>,
	pub(crate) stats: GatewayStats,
	next_connection_id: AtomicU64,
}

impl GatewayShared {
	/// Route one engine report to its originating connection.
	///
	/// Runs on the matching thread; it only does map lookups and a
	/// non-blocking channel send.
	pub(crate) fn route_report(&self, report: ExecutionReport) {
		let terminal = report.is_terminal();
		match self.routes.route(report.order_id, terminal) {
			RouteDecision::Deliver {
				connection_id,
				cl_ord_id,
			} => {
				let delivered = self
					.connections
					.get(&connection_id)
					.map(|handle| handle.report_tx.try_send((cl_ord_id, report)).is_ok())
					.unwrap_or(false);
				if !delivered {
					self.stats.orphaned_reports.fetch_add(1, Ordering::Relaxed);
					debug!(connection_id, "dropped report for unreachable connection");
				}
			}
			RouteDecision::Orphaned => {
				self.stats.orphaned_reports.fetch_add(1, Ordering::Relaxed);
			}
			RouteDecision::Unknown => {
				// Cancels of unknown ids produce reports with no route
				debug!(order_id = report.order_id, "report without routing entry");
			}
		}
	}

	pub(crate) fn remove_connection(&self, connection_id: ConnectionId) {
		self.connections.remove(&connection_id);
		self.routes.orphan_connection(connection_id);
		self.stats
			.current_connections
			.fetch_sub(1, Ordering::Relaxed);
	}
}

/// The FIX acceptor: binds the listen port, enforces the connection cap
/// and spawns one task per client connection.
pub struct GatewayServer {
	shared: Arc<GatewayShared>,
}

impl GatewayServer {
	pub fn new(config: GatewayConfig, engine: Arc<MatchingEngine>) -> Self {
		let shared = Arc::new(GatewayShared {
			config,
			engine,
			routes: RouteTable::new(),
			connections: DashMap::new(),
			stats: GatewayStats::new(),
			next_connection_id: AtomicU64::new(1),
		});

		let router = shared.clone();
		shared
			.engine
			.set_execution_callback(Arc::new(move |report| router.route_report(report)));
		shared
			.engine
			.set_error_callback(Arc::new(|message| warn!(%message, "engine error")));

		Self { shared }
	}

	pub fn stats(&self) -> &GatewayStats {
		&self.shared.stats
	}

	pub fn engine(&self) -> &Arc<MatchingEngine> {
		&self.shared.engine
	}

	pub fn connection_count(&self) -> usize {
		self.shared.connections.len()
	}

	/// Bind the configured port and serve forever.
	pub async fn serve(&self) -> Result<()> {
		let addr = ("0.0.0.0", self.shared.config.listen_port);
		let listener = TcpListener::bind(addr)
			.await
			.with_context(|| format!("failed to bind port {}", self.shared.config.listen_port))?;
		self.serve_on(listener).await
	}

	/// Serve on an already-bound listener (tests use an ephemeral port).
	pub async fn serve_on(&self, listener: TcpListener) -> Result<()> {
		info!(
			addr = %listener.local_addr()?,
			comp_id = %self.shared.config.local_comp_id,
			"gateway listening"
		);

		loop {
			let (stream, addr) = listener.accept().await.context("accept failed")?;

			if self.shared.connections.len() >= self.shared.config.max_connections {
				self.shared
					.stats
					.connections_rejected
					.fetch_add(1, Ordering::Relaxed);
				warn!(%addr, "connection limit reached, refusing client");
				drop(stream);
				continue;
			}

			let connection_id = self
				.shared
				.next_connection_id
				.fetch_add(1, Ordering::Relaxed);
			let (report_tx, report_rx) =
				mpsc::channel(self.shared.config.report_queue_capacity);
			self.shared
				.connections
				.insert(connection_id, ConnectionHandle { report_tx });
			self.shared
				.stats
				.total_connections
				.fetch_add(1, Ordering::Relaxed);
			self.shared
				.stats
				.current_connections
				.fetch_add(1, Ordering::Relaxed);
			info!(connection_id, %addr, "client connected");

			let shared = self.shared.clone();
			tokio::spawn(connection::run_connection(
				shared,
				connection_id,
				stream,
				report_rx,
			));
		}
	}
}
