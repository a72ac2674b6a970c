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
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::builder::{utc_timestamp_now, MessageBuilder};
use crate::message::FixMessage;
use crate::tags::{self, msg_type};

/// Default heartbeat interval when the peer does not negotiate one.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

/// Tolerance multiplier before a silent peer is probed with a TestRequest.
const LIVENESS_TOLERANCE: f64 = 1.2;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Disconnected,
	PendingLogon,
	LoggedIn,
	PendingLogout,
	LoggedOut,
	Error,
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			SessionState::Disconnected => "Disconnected",
			SessionState::PendingLogon => "PendingLogon",
			SessionState::LoggedIn => "LoggedIn",
			SessionState::PendingLogout => "PendingLogout",
			SessionState::LoggedOut => "LoggedOut",
			SessionState::Error => "Error",
		};
		f.write_str(s)
	}
}

/// Session construction parameters
#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Our CompID (tag 49 on outbound, tag 56 expected inbound)
	pub local_comp_id: String,
	/// Peer CompID; `None` adopts the sender of the first inbound Logon
	pub peer_comp_id: Option<String>,
	pub heartbeat_interval: Duration,
}

impl SessionConfig {
	pub fn acceptor(local_comp_id: impl Into<String>) -> Self {
		Self {
			local_comp_id: local_comp_id.into(),
			peer_comp_id: None,
			heartbeat_interval: DEFAULT_HEARTBEAT,
		}
	}

	pub fn initiator(local_comp_id: impl Into<String>, peer_comp_id: impl Into<String>) -> Self {
		Self {
			local_comp_id: local_comp_id.into(),
			peer_comp_id: Some(peer_comp_id.into()),
			heartbeat_interval: DEFAULT_HEARTBEAT,
		}
	}

	pub fn with_heartbeat(mut self, interval: Duration) -> Self {
		self.heartbeat_interval = interval;
		self
	}
}

/// What the caller must do after feeding the session a message or a tick
///
/// Outputs are collected while the session mutates itself and acted on
/// afterwards, so no I/O ever happens inside the state machine.
#[derive(Debug)]
pub enum SessionOutput {
	/// Serialize and write this fully-stamped frame to the transport
	Send(FixMessage),
	/// Dispatch this application payload upward (already sequence-checked)
	Application(FixMessage),
	/// Close the transport; the session is finished
	Disconnect(String),
}

/// Error types for caller-initiated session operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
	#[error("not logged in")]
	NotLoggedIn,
	#[error("cannot {action} in state {state}")]
	InvalidState {
		action: &'static str,
		state: SessionState,
	},
}

/// Point-in-time session counters for the operator log
#[derive(Debug, Clone, Copy)]
pub struct SessionStats {
	pub messages_sent: u64,
	pub messages_received: u64,
	pub uptime: Duration,
}

/// FIX 4.2 session state machine, transport-free.
///
/// One session per authenticated connection, identified by the
/// `(local_comp_id, peer_comp_id)` pair. The caller feeds parsed inbound
/// messages via [`on_message`](Self::on_message) and the clock via
/// [`on_tick`](Self::on_tick); both return the frames to send and payloads
/// to dispatch. All timing decisions use the caller-supplied monotonic
/// `Instant`; wall-clock time appears only in SendingTime stamps.
pub struct FixSession {
	local_comp_id: String,
	peer_comp_id: Option<String>,
	state: SessionState,
	heartbeat_interval: Duration,
	/// Next MsgSeqNum to stamp on an outbound message
	outgoing_seq: u64,
	/// Next MsgSeqNum expected inbound
	expected_incoming: u64,
	last_sent: Instant,
	last_received: Instant,
	/// Set when a TestRequest is outstanding; answered by any inbound frame
	pending_test_req: Option<Instant>,
	pending_logout_at: Option<Instant>,
	test_req_counter: u64,
	messages_sent: u64,
	messages_received: u64,
	started_at: Instant,
}

impl FixSession {
	pub fn new(config: SessionConfig, now: Instant) -> Self {
		Self {
			local_comp_id: config.local_comp_id,
			peer_comp_id: config.peer_comp_id,
			state: SessionState::Disconnected,
			heartbeat_interval: config.heartbeat_interval,
			outgoing_seq: 1,
			expected_incoming: 1,
			last_sent: now,
			last_received: now,
			pending_test_req: None,
			pending_logout_at: None,
			test_req_counter: 0,
			messages_sent: 0,
			messages_received: 0,
			started_at: now,
		}
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn is_logged_in(&self) -> bool {
		self.state == SessionState::LoggedIn
	}

	pub fn local_comp_id(&self) -> &str {
		&self.local_comp_id
	}

	pub fn peer_comp_id(&self) -> Option<&str> {
		self.peer_comp_id.as_deref()
	}

	pub fn heartbeat_interval(&self) -> Duration {
		self.heartbeat_interval
	}

	pub fn next_outgoing_seq(&self) -> u64 {
		self.outgoing_seq
	}

	pub fn expected_incoming_seq(&self) -> u64 {
		self.expected_incoming
	}

	pub fn stats(&self, now: Instant) -> SessionStats {
		SessionStats {
			messages_sent: self.messages_sent,
			messages_received: self.messages_received,
			uptime: now.duration_since(self.started_at),
		}
	}

	/// Initiate a logon toward a configured peer (client-side use).
	pub fn initiate(&mut self, now: Instant) -> Result<Vec<SessionOutput>, SessionError> {
		if self.state != SessionState::Disconnected {
			return Err(SessionError::InvalidState {
				action: "initiate logon",
				state: self.state,
			});
		}
		if self.peer_comp_id.is_none() {
			return Err(SessionError::InvalidState {
				action: "initiate logon without peer CompID",
				state: self.state,
			});
		}
		self.state = SessionState::PendingLogon;
		let logon = MessageBuilder::logon(self.heartbeat_interval.as_secs());
		Ok(vec![SessionOutput::Send(self.stamp(logon, now))])
	}

	/// Begin a graceful logout.
	pub fn logout(
		&mut self,
		reason: Option<&str>,
		now: Instant,
	) -> Result<Vec<SessionOutput>, SessionError> {
		if self.state != SessionState::LoggedIn {
			return Err(SessionError::InvalidState {
				action: "logout",
				state: self.state,
			});
		}
		self.state = SessionState::PendingLogout;
		self.pending_logout_at = Some(now);
		let logout = MessageBuilder::logout(reason);
		Ok(vec![SessionOutput::Send(self.stamp(logout, now))])
	}

	/// Stamp and sequence an application message for transmission.
	pub fn send_application(
		&mut self,
		msg: FixMessage,
		now: Instant,
	) -> Result<FixMessage, SessionError> {
		if self.state != SessionState::LoggedIn {
			return Err(SessionError::NotLoggedIn);
		}
		Ok(self.stamp(msg, now))
	}

	/// Process one parsed inbound message.
	///
	/// Protocol errors never propagate as `Err`; they become Reject or
	/// Disconnect outputs, keeping the failure inside the session layer.
	pub fn on_message(&mut self, msg: FixMessage, now: Instant) -> Vec<SessionOutput> {
		self.messages_received += 1;
		self.last_received = now;
		// Any inbound frame satisfies an outstanding TestRequest.
		self.pending_test_req = None;

		let mut out = Vec::new();

		if let Err(e) = msg.validate_header() {
			warn!(session = %self.describe(), error = %e, "rejecting malformed message");
			if self.state == SessionState::LoggedIn {
				let ref_seq = msg.get_u64(tags::MSG_SEQ_NUM).unwrap_or(0);
				let reject = MessageBuilder::reject(ref_seq, &e.to_string());
				out.push(SessionOutput::Send(self.stamp(reject, now)));
			} else {
				out.push(SessionOutput::Disconnect(format!("malformed message: {}", e)));
			}
			return out;
		}

		// Header presence just validated
		let sender = msg.get(tags::SENDER_COMP_ID).unwrap_or_default().to_string();
		let target = msg.get(tags::TARGET_COMP_ID).unwrap_or_default().to_string();
		let msg_type = msg.msg_type().unwrap_or_default().to_string();

		if target != self.local_comp_id {
			out.push(SessionOutput::Disconnect(format!(
				"TargetCompID mismatch: expected {}, got {}",
				self.local_comp_id, target
			)));
			self.state = SessionState::Error;
			return out;
		}

		match &self.peer_comp_id {
			None => {
				// CompID binding: only a Logon may establish the peer.
				if msg_type != msg_type::LOGON {
					if tags::is_admin(&msg_type) {
						debug!(
							msg_type = %msg_type,
							"dropping admin message from unknown peer"
						);
					} else {
						out.push(SessionOutput::Disconnect(
							"application message before logon".to_string(),
						));
					}
					return out;
				}
				self.peer_comp_id = Some(sender.clone());
			}
			Some(peer) => {
				if *peer != sender {
					out.push(SessionOutput::Disconnect(format!(
						"SenderCompID mismatch: expected {}, got {}",
						peer, sender
					)));
					self.state = SessionState::Error;
					return out;
				}
			}
		}

		// Sequence-number discipline. The gapped message itself is still
		// processed after the ResendRequest goes out.
		let seq = msg.get_u64(tags::MSG_SEQ_NUM).unwrap_or(0);
		if seq < self.expected_incoming {
			if msg.get(tags::POSS_DUP_FLAG) == Some("Y") {
				debug!(seq, expected = self.expected_incoming, "ignoring possdup");
				return out;
			}
			out.push(SessionOutput::Disconnect(format!(
				"sequence number {} below expected {} without PossDupFlag",
				seq, self.expected_incoming
			)));
			self.state = SessionState::Error;
			return out;
		}
		if seq > self.expected_incoming {
			debug!(seq, expected = self.expected_incoming, "sequence gap");
			let req = MessageBuilder::resend_request(self.expected_incoming, seq - 1);
			out.push(SessionOutput::Send(self.stamp(req, now)));
		}
		self.expected_incoming = seq + 1;

		match msg_type.as_str() {
			msg_type::LOGON => self.handle_logon(&msg, now, &mut out),
			msg_type::LOGOUT => self.handle_logout(now, &mut out),
			msg_type::HEARTBEAT => {
				// Liveness already refreshed above.
			}
			msg_type::TEST_REQUEST => {
				let hb = MessageBuilder::heartbeat(msg.get(tags::TEST_REQ_ID));
				out.push(SessionOutput::Send(self.stamp(hb, now)));
			}
			msg_type::RESEND_REQUEST => self.handle_resend_request(&msg, now, &mut out),
			msg_type::SEQUENCE_RESET => self.handle_sequence_reset(&msg, now, &mut out),
			msg_type::REJECT => {
				warn!(
					session = %self.describe(),
					text = msg.get(tags::TEXT).unwrap_or(""),
					"peer rejected message"
				);
			}
			_ => {
				if self.state == SessionState::LoggedIn {
					out.push(SessionOutput::Application(msg));
				} else {
					let reject = MessageBuilder::reject(
						seq,
						&format!("application message in state {}", self.state),
					);
					out.push(SessionOutput::Send(self.stamp(reject, now)));
				}
			}
		}

		out
	}

	/// Drive heartbeat and liveness deadlines. Call periodically (a few
	/// times per heartbeat interval is plenty).
	pub fn on_tick(&mut self, now: Instant) -> Vec<SessionOutput> {
		let mut out = Vec::new();

		match self.state {
			SessionState::PendingLogout => {
				let since = self
					.pending_logout_at
					.map(|t| now.duration_since(t))
					.unwrap_or_default();
				if since >= self.heartbeat_interval {
					self.state = SessionState::LoggedOut;
					out.push(SessionOutput::Disconnect(
						"no logout response from peer".to_string(),
					));
				}
				return out;
			}
			SessionState::LoggedIn => {}
			_ => return out,
		}

		// Peer presumed dead: TestRequest outstanding for a full interval.
		if let Some(asked_at) = self.pending_test_req {
			if now.duration_since(asked_at) >= self.heartbeat_interval {
				self.state = SessionState::Error;
				out.push(SessionOutput::Disconnect(
					"heartbeat timeout: no response to TestRequest".to_string(),
				));
				return out;
			}
		} else if now.duration_since(self.last_received)
			>= self.heartbeat_interval.mul_f64(LIVENESS_TOLERANCE)
		{
			self.test_req_counter += 1;
			let id = format!("TR{}", self.test_req_counter);
			let req = MessageBuilder::test_request(&id);
			out.push(SessionOutput::Send(self.stamp(req, now)));
			self.pending_test_req = Some(now);
		}

		if now.duration_since(self.last_sent) >= self.heartbeat_interval {
			let hb = MessageBuilder::heartbeat(None);
			out.push(SessionOutput::Send(self.stamp(hb, now)));
		}

		out
	}

	fn handle_logon(&mut self, msg: &FixMessage, now: Instant, out: &mut Vec<SessionOutput>) {
		match self.state {
			SessionState::PendingLogon => {
				// Our initiated logon was answered.
				self.adopt_heartbeat(msg);
				self.state = SessionState::LoggedIn;
				self.started_at = now;
				debug!(session = %self.describe(), "logon confirmed");
			}
			SessionState::Disconnected => {
				// Peer-initiated logon: adopt interval, confirm.
				self.adopt_heartbeat(msg);
				self.state = SessionState::LoggedIn;
				self.started_at = now;
				let resp = MessageBuilder::logon(self.heartbeat_interval.as_secs());
				out.push(SessionOutput::Send(self.stamp(resp, now)));
				debug!(session = %self.describe(), "logon accepted");
			}
			_ => {
				let reason = format!("unexpected Logon in state {}", self.state);
				self.state = SessionState::Error;
				out.push(SessionOutput::Disconnect(reason));
			}
		}
	}

	fn handle_logout(&mut self, now: Instant, out: &mut Vec<SessionOutput>) {
		match self.state {
			SessionState::PendingLogout => {
				self.state = SessionState::LoggedOut;
				out.push(SessionOutput::Disconnect("logout complete".to_string()));
			}
			SessionState::LoggedIn => {
				let ack = MessageBuilder::logout(Some("logout acknowledged"));
				out.push(SessionOutput::Send(self.stamp(ack, now)));
				self.state = SessionState::LoggedOut;
				out.push(SessionOutput::Disconnect("peer logout".to_string()));
			}
			_ => {
				debug!(state = %self.state, "ignoring Logout");
			}
		}
	}

	/// Answer a ResendRequest with a gap-fill SequenceReset.
	///
	/// This venue keeps no outbound replay cache; the administrative
	/// stand-in advances the peer past everything it missed. The reset
	/// carries the first requested sequence number with PossDupFlag=Y, as
	/// a replayed message would.
	fn handle_resend_request(
		&mut self,
		msg: &FixMessage,
		now: Instant,
		out: &mut Vec<SessionOutput>,
	) {
		let begin = msg.get_u64(tags::BEGIN_SEQ_NO).unwrap_or(1);
		let mut reset = MessageBuilder::sequence_reset_gap_fill(self.outgoing_seq);
		reset.set(tags::SENDER_COMP_ID, self.local_comp_id.clone());
		reset.set(
			tags::TARGET_COMP_ID,
			self.peer_comp_id.clone().unwrap_or_default(),
		);
		reset.set(tags::MSG_SEQ_NUM, begin.to_string());
		reset.set(tags::POSS_DUP_FLAG, "Y");
		reset.set(tags::SENDING_TIME, utc_timestamp_now());
		self.last_sent = now;
		self.messages_sent += 1;
		out.push(SessionOutput::Send(reset));
	}

	fn handle_sequence_reset(
		&mut self,
		msg: &FixMessage,
		now: Instant,
		out: &mut Vec<SessionOutput>,
	) {
		match msg.get_u64(tags::NEW_SEQ_NO) {
			Some(new_seq) if new_seq >= self.expected_incoming => {
				debug!(new_seq, "applying SequenceReset");
				self.expected_incoming = new_seq;
			}
			Some(new_seq) => {
				let reject = MessageBuilder::reject(
					msg.get_u64(tags::MSG_SEQ_NUM).unwrap_or(0),
					&format!(
						"SequenceReset may not decrease expected {} to {}",
						self.expected_incoming, new_seq
					),
				);
				out.push(SessionOutput::Send(self.stamp(reject, now)));
			}
			None => {
				let reject = MessageBuilder::reject(
					msg.get_u64(tags::MSG_SEQ_NUM).unwrap_or(0),
					"SequenceReset missing NewSeqNo",
				);
				out.push(SessionOutput::Send(self.stamp(reject, now)));
			}
		}
	}

	fn adopt_heartbeat(&mut self, logon: &FixMessage) {
		if let Some(secs) = logon.get_u64(tags::HEART_BT_INT) {
			if secs > 0 {
				self.heartbeat_interval = Duration::from_secs(secs);
			}
		}
	}

	/// Stamp the session header onto an outbound message and take the next
	/// outgoing sequence number.
	fn stamp(&mut self, mut msg: FixMessage, now: Instant) -> FixMessage {
		msg.set(tags::SENDER_COMP_ID, self.local_comp_id.clone());
		msg.set(
			tags::TARGET_COMP_ID,
			self.peer_comp_id.clone().unwrap_or_default(),
		);
		msg.set(tags::MSG_SEQ_NUM, self.outgoing_seq.to_string());
		msg.set(tags::SENDING_TIME, utc_timestamp_now());
		self.outgoing_seq += 1;
		self.last_sent = now;
		self.messages_sent += 1;
		msg
	}

	fn describe(&self) -> String {
		format!(
			"{}<->{}",
			self.local_comp_id,
			self.peer_comp_id.as_deref().unwrap_or("?")
		)
	}
}
