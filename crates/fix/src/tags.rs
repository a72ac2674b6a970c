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

//! FIX 4.2 tag numbers and message type codes used by this venue.

// Standard header / trailer
pub const BEGIN_STRING: u32 = 8;
pub const BODY_LENGTH: u32 = 9;
pub const CHECKSUM: u32 = 10;
pub const MSG_TYPE: u32 = 35;
pub const MSG_SEQ_NUM: u32 = 34;
pub const SENDER_COMP_ID: u32 = 49;
pub const TARGET_COMP_ID: u32 = 56;
pub const SENDING_TIME: u32 = 52;
pub const POSS_DUP_FLAG: u32 = 43;

// Session administration
pub const BEGIN_SEQ_NO: u32 = 7;
pub const END_SEQ_NO: u32 = 16;
pub const NEW_SEQ_NO: u32 = 36;
pub const REF_SEQ_NUM: u32 = 45;
pub const ENCRYPT_METHOD: u32 = 98;
pub const HEART_BT_INT: u32 = 108;
pub const TEST_REQ_ID: u32 = 112;
pub const GAP_FILL_FLAG: u32 = 123;

// Order entry
pub const CL_ORD_ID: u32 = 11;
pub const ORIG_CL_ORD_ID: u32 = 41;
pub const ORDER_ID: u32 = 37;
pub const SYMBOL: u32 = 55;
pub const SIDE: u32 = 54;
pub const ORDER_QTY: u32 = 38;
pub const ORD_TYPE: u32 = 40;
pub const PRICE: u32 = 44;
pub const TIME_IN_FORCE: u32 = 59;
pub const TRANSACT_TIME: u32 = 60;

// Execution reports
pub const AVG_PX: u32 = 6;
pub const CUM_QTY: u32 = 14;
pub const EXEC_ID: u32 = 17;
pub const LAST_PX: u32 = 31;
pub const LAST_QTY: u32 = 32;
pub const ORD_STATUS: u32 = 39;
pub const TEXT: u32 = 58;
pub const EXEC_TYPE: u32 = 150;
pub const LEAVES_QTY: u32 = 151;

/// Message type codes (tag 35 values)
pub mod msg_type {
	pub const HEARTBEAT: &str = "0";
	pub const TEST_REQUEST: &str = "1";
	pub const RESEND_REQUEST: &str = "2";
	pub const REJECT: &str = "3";
	pub const SEQUENCE_RESET: &str = "4";
	pub const LOGOUT: &str = "5";
	pub const EXECUTION_REPORT: &str = "8";
	pub const LOGON: &str = "A";
	pub const NEW_ORDER_SINGLE: &str = "D";
	pub const ORDER_CANCEL_REQUEST: &str = "F";
}

/// Whether a message type is session administration (vs. application)
pub fn is_admin(msg_type: &str) -> bool {
	matches!(msg_type, "0" | "1" | "2" | "3" | "4" | "5" | "A")
}
