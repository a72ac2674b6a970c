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

use chrono::{DateTime, Utc};

use crate::message::FixMessage;
use crate::tags::{self, msg_type};

/// Factories for the administrative messages this venue sends.
///
/// Builders fill message-specific fields only; the session stamps
/// SenderCompID, TargetCompID, MsgSeqNum and SendingTime when the message
/// is queued for transmission.
pub struct MessageBuilder;

impl MessageBuilder {
	/// Logon (35=A) with EncryptMethod=0 (none) and the negotiated
	/// heartbeat interval in seconds.
	pub fn logon(heartbeat_secs: u64) -> FixMessage {
		FixMessage::new(msg_type::LOGON)
			.with(tags::ENCRYPT_METHOD, "0")
			.with(tags::HEART_BT_INT, heartbeat_secs.to_string())
	}

	/// Logout (35=5) with an optional human-readable reason.
	pub fn logout(reason: Option<&str>) -> FixMessage {
		let msg = FixMessage::new(msg_type::LOGOUT);
		match reason {
			Some(text) => msg.with(tags::TEXT, text),
			None => msg,
		}
	}

	/// Heartbeat (35=0); echoes the TestReqID when answering a TestRequest.
	pub fn heartbeat(test_req_id: Option<&str>) -> FixMessage {
		let msg = FixMessage::new(msg_type::HEARTBEAT);
		match test_req_id {
			Some(id) => msg.with(tags::TEST_REQ_ID, id),
			None => msg,
		}
	}

	/// TestRequest (35=1) with a caller-supplied TestReqID.
	pub fn test_request(test_req_id: &str) -> FixMessage {
		FixMessage::new(msg_type::TEST_REQUEST).with(tags::TEST_REQ_ID, test_req_id)
	}

	/// ResendRequest (35=2) for the inclusive range `[begin, end]`.
	pub fn resend_request(begin_seq_no: u64, end_seq_no: u64) -> FixMessage {
		FixMessage::new(msg_type::RESEND_REQUEST)
			.with(tags::BEGIN_SEQ_NO, begin_seq_no.to_string())
			.with(tags::END_SEQ_NO, end_seq_no.to_string())
	}

	/// Gap-fill SequenceReset (35=4, 123=Y) advancing the peer to
	/// `new_seq_no`.
	pub fn sequence_reset_gap_fill(new_seq_no: u64) -> FixMessage {
		FixMessage::new(msg_type::SEQUENCE_RESET)
			.with(tags::GAP_FILL_FLAG, "Y")
			.with(tags::NEW_SEQ_NO, new_seq_no.to_string())
	}

	/// Session-level Reject (35=3) referencing the offending sequence
	/// number.
	pub fn reject(ref_seq_num: u64, reason: &str) -> FixMessage {
		FixMessage::new(msg_type::REJECT)
			.with(tags::REF_SEQ_NUM, ref_seq_num.to_string())
			.with(tags::TEXT, reason)
	}
}

/// Format a UTC instant as a FIX timestamp: `YYYYMMDD-HH:MM:SS.sss`.
pub fn format_timestamp(t: DateTime<Utc>) -> String {
	t.format("%Y%m%d-%H:%M:%S%.3f").to_string()
}

/// FIX SendingTime/TransactTime for the current wall-clock instant.
pub fn utc_timestamp_now() -> String {
	format_timestamp(Utc::now())
}
