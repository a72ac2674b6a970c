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

//! Per-connection task: owns the socket, the framing buffer and the FIX
//! session. Everything that mutates the session happens here, so no locks
//! guard it; engine reports arrive over a channel and heartbeats come from
//! a local timer.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ferrox_fix::tags::msg_type;
use ferrox_fix::{
	FixDecoder, FixMessage, FixSession, MessageBuilder, SessionConfig, SessionOutput,
};
use ferrox_matching::ExecutionReport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::routing::ConnectionId;
use crate::server::GatewayShared;
use crate::translate;

/// How often the session's liveness deadlines are polled.
const TICK_PERIOD: Duration = Duration::from_secs(1);

pub(crate) async fn run_connection(
	shared: Arc<GatewayShared>,
	connection_id: ConnectionId,
	stream: TcpStream,
	mut report_rx: mpsc::Receiver<(String, ExecutionReport)>,
) {
	let (mut reader, mut writer) = stream.into_split();
	let mut decoder = FixDecoder::new(shared.config.max_frame_bytes);
	let session_config = SessionConfig::acceptor(shared.config.local_comp_id.clone())
		.with_heartbeat(shared.config.heartbeat_interval());
	let mut session = FixSession::new(session_config, Instant::now());

	let mut tick = tokio::time::interval(TICK_PERIOD);
	tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
	let mut read_buf = vec![0u8; 8 * 1024];
	let mut open = true;

	while open {
		tokio::select! {
			result = reader.read(&mut read_buf) => {
				match result {
					Ok(0) => {
						debug!(connection_id, "peer closed the connection");
						break;
					}
					Ok(n) => {
						decoder.feed(&read_buf[..n]);
						open = drain_messages(
							&shared,
							connection_id,
							&mut decoder,
							&mut session,
							&mut writer,
						)
						.await;
					}
					Err(e) => {
						warn!(connection_id, error = %e, "read failed");
						break;
					}
				}
			}
			maybe_report = report_rx.recv() => {
				if let Some((cl_ord_id, report)) = maybe_report {
					open = deliver_report(
						&shared,
						&mut session,
						&mut writer,
						&cl_ord_id,
						&report,
					)
					.await;
				}
			}
			_ = tick.tick() => {
				let outputs = session.on_tick(Instant::now());
				open = handle_outputs(
					&shared,
					connection_id,
					&mut session,
					&mut writer,
					outputs,
				)
				.await;
			}
		}
	}

	shared.remove_connection(connection_id);
	let session_stats = session.stats(Instant::now());
	info!(
		connection_id,
		peer = session.peer_comp_id().unwrap_or("?"),
		state = %session.state(),
		sent = session_stats.messages_sent,
		received = session_stats.messages_received,
		uptime_secs = session_stats.uptime.as_secs(),
		"connection closed"
	);
}

/// Extract every complete frame currently buffered and feed it through the
/// session. Returns whether the connection stays open.
async fn drain_messages(
	shared: &GatewayShared,
	connection_id: ConnectionId,
	decoder: &mut FixDecoder,
	session: &mut FixSession,
	writer: &mut OwnedWriteHalf,
) -> bool {
	loop {
		match decoder.next_message() {
			Ok(Some(msg)) => {
				shared.stats.messages_received.fetch_add(1, Ordering::Relaxed);
				let outputs = session.on_message(msg, Instant::now());
				if !handle_outputs(shared, connection_id, session, writer, outputs).await {
					return false;
				}
			}
			Ok(None) => return true,
			Err(e) => {
				shared.stats.protocol_errors.fetch_add(1, Ordering::Relaxed);
				warn!(connection_id, error = %e, "protocol error, disconnecting");
				return false;
			}
		}
	}
}

/// Act on session outputs in order; sends go out before any disconnect.
async fn handle_outputs(
	shared: &GatewayShared,
	connection_id: ConnectionId,
	session: &mut FixSession,
	writer: &mut OwnedWriteHalf,
	outputs: Vec<SessionOutput>,
) -> bool {
	for output in outputs {
		match output {
			SessionOutput::Send(msg) => {
				if !write_frame(shared, writer, &msg).await {
					return false;
				}
			}
			SessionOutput::Application(msg) => {
				if !handle_application(shared, connection_id, session, writer, msg).await {
					return false;
				}
			}
			SessionOutput::Disconnect(reason) => {
				info!(connection_id, %reason, "session disconnect");
				return false;
			}
		}
	}
	true
}

/// Dispatch one application message to the engine.
async fn handle_application(
	shared: &GatewayShared,
	connection_id: ConnectionId,
	session: &mut FixSession,
	writer: &mut OwnedWriteHalf,
	msg: FixMessage,
) -> bool {
	match msg.msg_type() {
		Some(msg_type::NEW_ORDER_SINGLE) => {
			let client_id = session.peer_comp_id().unwrap_or_default().to_string();
			match translate::parse_new_order_single(&msg, &client_id) {
				Ok(order) => {
					let symbol = order.request.symbol.clone();
					// Record routing before the engine can possibly report
					// on this id, then submit.
					let order_id = shared.engine.allocate_order_id();
					shared.routes.insert(
						order_id,
						connection_id,
						order.cl_ord_id.clone(),
						symbol.clone(),
					);
					match shared.engine.submit_order_with_id(order_id, order.request) {
						Ok(()) => true,
						Err(e) => {
							shared.routes.remove(order_id);
							send_app_reject(
								shared,
								session,
								writer,
								&order.cl_ord_id,
								Some(&symbol),
								&e.to_string(),
							)
							.await
						}
					}
				}
				Err(e) => {
					let cl_ord_id = msg.get(ferrox_fix::tags::CL_ORD_ID).unwrap_or("");
					let symbol = msg.get(ferrox_fix::tags::SYMBOL);
					send_app_reject(shared, session, writer, cl_ord_id, symbol, &e.to_string())
						.await
				}
			}
		}
		Some(msg_type::ORDER_CANCEL_REQUEST) => match translate::parse_cancel_request(&msg) {
			Ok(cancel) => {
				match shared.routes.resolve(connection_id, &cancel.orig_cl_ord_id) {
					Some(order_id) => {
						match shared.engine.cancel_order(order_id, "client cancel request") {
							Ok(()) => true,
							Err(e) => {
								send_app_reject(
									shared,
									session,
									writer,
									&cancel.cl_ord_id,
									Some(&cancel.symbol),
									&e.to_string(),
								)
								.await
							}
						}
					}
					None => {
						send_app_reject(
							shared,
							session,
							writer,
							&cancel.cl_ord_id,
							Some(&cancel.symbol),
							&format!("unknown original order {}", cancel.orig_cl_ord_id),
						)
						.await
					}
				}
			}
			Err(e) => {
				let cl_ord_id = msg.get(ferrox_fix::tags::CL_ORD_ID).unwrap_or("");
				send_app_reject(shared, session, writer, cl_ord_id, None, &e.to_string()).await
			}
		},
		other => {
			// Inbound application type this venue does not accept
			let seq = msg.get_u64(ferrox_fix::tags::MSG_SEQ_NUM).unwrap_or(0);
			let reason = format!("unsupported message type {}", other.unwrap_or("?"));
			debug!(connection_id, %reason, "rejecting message");
			let reject = MessageBuilder::reject(seq, &reason);
			match session.send_application(reject, Instant::now()) {
				Ok(stamped) => write_frame(shared, writer, &stamped).await,
				Err(_) => true,
			}
		}
	}
}

/// Stamp and send an engine execution report through this session.
async fn deliver_report(
	shared: &GatewayShared,
	session: &mut FixSession,
	writer: &mut OwnedWriteHalf,
	cl_ord_id: &str,
	report: &ExecutionReport,
) -> bool {
	let exec_id = uuid::Uuid::new_v4().to_string();
	let msg = translate::execution_report_to_fix(report, cl_ord_id, &exec_id);
	match session.send_application(msg, Instant::now()) {
		Ok(stamped) => write_frame(shared, writer, &stamped).await,
		Err(_) => {
			// Session is winding down; the report has nowhere to go
			shared.stats.orphaned_reports.fetch_add(1, Ordering::Relaxed);
			true
		}
	}
}

/// Application-level reject (ExecutionReport with OrdStatus=8).
async fn send_app_reject(
	shared: &GatewayShared,
	session: &mut FixSession,
	writer: &mut OwnedWriteHalf,
	cl_ord_id: &str,
	symbol: Option<&str>,
	reason: &str,
) -> bool {
	let exec_id = uuid::Uuid::new_v4().to_string();
	let msg = translate::application_reject(cl_ord_id, symbol, &exec_id, reason);
	match session.send_application(msg, Instant::now()) {
		Ok(stamped) => write_frame(shared, writer, &stamped).await,
		Err(_) => true,
	}
}

async fn write_frame(shared: &GatewayShared, writer: &mut OwnedWriteHalf, msg: &FixMessage) -> bool {
	match writer.write_all(&msg.serialize()).await {
		Ok(()) => {
			shared.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
			true
		}
		Err(e) => {
			warn!(error = %e, "write failed");
			false
		}
	}
}
